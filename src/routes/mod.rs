use axum::Router;

use crate::state::SharedState;

/// Swagger UI and the OpenAPI document.
pub mod docs;
/// `/healthcheck`.
pub mod health;
/// `/public/*` read endpoints.
pub mod public;
/// `/ws` participant socket.
pub mod websocket;

/// Compose every route tree and bind it to the shared session state.
pub fn router(state: SharedState) -> Router<()> {
    Router::new()
        .merge(health::router())
        .merge(public::router())
        .merge(websocket::router())
        .merge(docs::router())
        .with_state(state)
}
