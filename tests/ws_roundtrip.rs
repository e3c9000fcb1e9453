//! End-to-end tests against the real router on an ephemeral port.

#![allow(missing_docs)]

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, bail};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use socketon::api;
use socketon::app_state::AppState;
use socketon::config::HubConfig;
use socketon::hub::{Hub, HubHandle};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(3);

async fn spawn_server() -> anyhow::Result<(SocketAddr, HubHandle)> {
    let hub = Hub::new(HubConfig::default());
    let handle = hub.handle();
    tokio::spawn(hub.start());

    let app = api::build_app(AppState::new(handle.clone()));
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((addr, handle))
}

async fn connect(addr: SocketAddr) -> anyhow::Result<Client> {
    let (ws, _response) = connect_async(format!("ws://{addr}/ws")).await?;
    Ok(ws)
}

async fn send(ws: &mut Client, action: &str, data: Value) -> anyhow::Result<()> {
    let frame = json!({"a": action, "d": data}).to_string();
    ws.send(WsMessage::text(frame)).await?;
    Ok(())
}

/// Next text frame, decoded as JSON. Control frames are skipped.
async fn recv(ws: &mut Client) -> anyhow::Result<Value> {
    loop {
        let msg = timeout(WAIT, ws.next())
            .await
            .context("timed out waiting for frame")?
            .context("socket closed")??;
        match msg {
            WsMessage::Text(text) => return Ok(serde_json::from_str(text.as_str())?),
            WsMessage::Close(_) => bail!("server closed the socket"),
            _ => {}
        }
    }
}

async fn whoami(ws: &mut Client) -> anyhow::Result<String> {
    send(ws, "whoami", Value::Null).await?;
    let reply = recv(ws).await?;
    reply["d"]
        .as_str()
        .map(str::to_owned)
        .context("whoami reply without id")
}

async fn wait_for_members(hub: &HubHandle, count: usize) -> anyhow::Result<()> {
    timeout(WAIT, async {
        while hub.members().await.map(|m| m.len()).unwrap_or_default() != count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .context("membership never reached expected size")
}

#[tokio::test]
async fn health_reports_healthy() -> anyhow::Result<()> {
    let (addr, _hub) = spawn_server().await?;

    let body: Value = reqwest::get(format!("http://{addr}/health"))
        .await?
        .json()
        .await?;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    Ok(())
}

#[tokio::test]
async fn echo_round_trips_over_websocket() -> anyhow::Result<()> {
    let (addr, _hub) = spawn_server().await?;
    let mut ws = connect(addr).await?;

    send(&mut ws, "echo", json!({"n": 1})).await?;
    assert_eq!(recv(&mut ws).await?, json!({"a": "echo", "d": {"n": 1}}));
    Ok(())
}

#[tokio::test]
async fn broadcast_and_whisper_between_clients() -> anyhow::Result<()> {
    let (addr, hub) = spawn_server().await?;
    let mut a = connect(addr).await?;
    let mut b = connect(addr).await?;
    let a_id = whoami(&mut a).await?;
    let b_id = whoami(&mut b).await?;
    wait_for_members(&hub, 2).await?;

    send(&mut b, "broadcast", json!("hi all")).await?;
    assert_eq!(
        recv(&mut a).await?,
        json!({"a": "broadcast", "d": {"from": b_id, "data": "hi all"}})
    );

    send(&mut a, "whisper", json!({"to": b_id, "data": "psst"})).await?;
    assert_eq!(
        recv(&mut b).await?,
        json!({"a": "whisper", "d": {"from": a_id, "data": "psst"}})
    );
    Ok(())
}

#[tokio::test]
async fn stats_track_connects_and_disconnects() -> anyhow::Result<()> {
    let (addr, hub) = spawn_server().await?;
    let stats_url = format!("http://{addr}/stats");

    let mut a = connect(addr).await?;
    let _b = connect(addr).await?;
    wait_for_members(&hub, 2).await?;

    let body: Value = reqwest::get(&stats_url).await?.json().await?;
    assert_eq!(body["connections"], 2);

    a.close(None).await?;
    wait_for_members(&hub, 1).await?;

    hub.stop().await?;
    let response = reqwest::get(&stats_url).await?;
    assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}

#[tokio::test]
async fn oversized_frame_disconnects_client() -> anyhow::Result<()> {
    let (addr, hub) = spawn_server().await?;
    let mut ws = connect(addr).await?;
    wait_for_members(&hub, 1).await?;

    send(&mut ws, "echo", json!("x".repeat(2048))).await?;
    wait_for_members(&hub, 0).await?;
    Ok(())
}
