//! HTTP layer: system endpoints, OpenAPI document, and router composition.

pub mod system;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::ws::handler::{sockjs_info_handler, sockjs_ws_handler, ws_handler};
use crate::ws::sockjs::SockJsInfo;

/// Path the OpenAPI document is served at.
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// OpenAPI document for the HTTP endpoints.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "greeting-gateway"),
    paths(system::health_handler, system::destinations_handler),
    components(schemas(
        system::HealthResponse,
        system::DestinationCatalog,
        system::RouteInfo,
        SockJsInfo
    )),
    tags((name = "System", description = "Health and routing catalog"))
)]
pub struct ApiDoc;

/// Builds the complete application: system routes, OpenAPI document, and
/// the STOMP WebSocket endpoint.
///
/// The endpoint is served three ways:
///
/// - `<endpoint>` and `<endpoint>/websocket`: raw WebSocket, one STOMP frame
///   per message.
/// - `<endpoint>/info`: SockJS server info.
/// - `<endpoint>/{server}/{session}/websocket`: SockJS WebSocket transport.
pub fn build_app(state: AppState) -> Router {
    let endpoint = state.config.ws_endpoint.clone();

    let router = Router::new()
        .merge(system::routes())
        .route(&endpoint, get(ws_handler))
        .route(&format!("{endpoint}/websocket"), get(ws_handler))
        .route(&format!("{endpoint}/info"), get(sockjs_info_handler))
        .route(
            &format!("{endpoint}/{{server}}/{{session}}/websocket"),
            get(sockjs_ws_handler),
        );

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui").url(OPENAPI_PATH, ApiDoc::openapi()),
    );
    #[cfg(not(feature = "swagger-ui"))]
    let router = router.route(
        OPENAPI_PATH,
        get(|| async { axum::Json(ApiDoc::openapi()) }),
    );

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
