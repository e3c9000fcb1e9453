//! Actions installed by the bundled host.
//!
//! | Action      | Payload                      | Effect                                   |
//! |-------------|------------------------------|------------------------------------------|
//! | `whoami`    | ignored                      | emits own id back as `whoami`            |
//! | `echo`      | any                          | emits the payload back as `echo`         |
//! | `broadcast` | any                          | broadcasts `{from, data}` as `broadcast` |
//! | `whisper`   | `{"to": "<id>", "data": …}`  | emits `{from, data}` to `to` as `whisper`|

use serde_json::{Value, json};

use crate::connection::Connection;
use crate::domain::{ConnectionId, Message};

/// Registers the demo actions on `conn`.
pub fn install(conn: &Connection) {
    conn.on("whoami", |conn: Connection, _data: Value| async move {
        let id = conn.id();
        conn.emit(id, &Message::new("whoami", id.to_string())).await;
    });

    conn.on("echo", |conn: Connection, data: Value| async move {
        conn.emit(conn.id(), &Message::new("echo", data)).await;
    });

    conn.on("broadcast", |conn: Connection, data: Value| async move {
        let message = Message::new("broadcast", json!({ "from": conn.id(), "data": data }));
        conn.broadcast(&message).await;
    });

    conn.on("whisper", |conn: Connection, data: Value| async move {
        let Some(to) = whisper_target(&data) else {
            tracing::debug!(connection_id = %conn.id(), "whisper without valid target");
            return;
        };
        let payload = data.get("data").cloned().unwrap_or(Value::Null);
        let message = Message::new("whisper", json!({ "from": conn.id(), "data": payload }));
        conn.emit(to, &message).await;
    });
}

fn whisper_target(data: &Value) -> Option<ConnectionId> {
    data.get("to")?.as_str()?.parse().ok()
}
