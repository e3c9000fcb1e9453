//! HTTP layer: system endpoints, OpenAPI document, and router composition.

pub mod handlers;

use axum::Router;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::error::{ErrorBody, ErrorResponse};
use crate::ws::handler::ws_handler;

/// OpenAPI description of the HTTP endpoints.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "socketon", description = "Real-time WebSocket messaging hub"),
    paths(handlers::system::health_handler, handlers::system::stats_handler),
    components(schemas(
        ErrorResponse,
        ErrorBody,
        handlers::system::HealthResponse,
        handlers::system::StatsResponse
    )),
    tags((name = "System", description = "Health and hub statistics"))
)]
pub struct ApiDoc;

/// Builds the HTTP router with the system endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new().merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}

/// Builds the complete application: HTTP endpoints, the `/ws` upgrade
/// route, and the tracing/CORS middleware stack.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(build_router())
        .route("/ws", get(ws_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_system_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/health"));
        assert!(doc.paths.paths.contains_key("/stats"));
    }
}
