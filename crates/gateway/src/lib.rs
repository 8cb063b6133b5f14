//! # Zoro Gateway Crate
//!
//! HTTP and WebSocket surface of the Zoro backend. Handlers authenticate the
//! caller, delegate to the `zoro-chats`, `zoro-suggestions` and
//! `zoro-orchestrator` services, and push realtime events to connected
//! sockets.
//!
//! ## Architecture
//!
//! - **REST**: JSON endpoints under `/api`, documented with OpenAPI
//! - **WebSocket**: `/ws` (chat), `/ws/code` (editor) and `/ws/coffee-break`
//! - **State**: services, connection registries and the coffee break matcher
//! - **Middleware**: request logging and CORS
//!
//! ## Usage
//!
//! ```rust,ignore
//! use zoro_gateway::{build_router, AppState};
//!
//! let state = AppState::new(&config, pool, cipher, orchestrator, suggestions);
//! let listener = tokio::net::TcpListener::bind(addr).await?;
//! axum::serve(listener, build_router(state)).await?;
//! ```

pub mod docs;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod websocket;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use extract::CurrentUser;
pub use state::{AppState, Realtime, Services};
pub use websocket::coffee::spawn_expiry_sweeper;

use axum::{middleware as axum_middleware, routing::get, Json, Router};
use utoipa::OpenApi;

use crate::docs::ApiDoc;
use crate::middleware::{cors_layer, logging_middleware};

/// Builds the full application router.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(state.cors_origins());

    Router::new()
        .merge(rest::create_rest_routes())
        .merge(websocket::create_websocket_routes())
        .route("/api-docs/openapi.json", get(openapi_json))
        .with_state(state)
        .layer(cors)
        .layer(axum_middleware::from_fn(logging_middleware))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
