use axum::{
    Router,
    extract::{Query, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};

use crate::{
    dto::ws::ConnectQuery,
    error::AppError,
    services::websocket_service,
    state::{SharedState, registry::participant_identity},
};

#[utoipa::path(
    get,
    path = "/ws",
    tag = "participants",
    params(ConnectQuery),
    responses(
        (status = 101, description = "Switching protocols to WebSocket"),
        (status = 400, description = "Missing or invalid participant identity")
    )
)]
/// Upgrade the HTTP connection into a participant WebSocket session.
pub async fn ws_handler(
    State(state): State<SharedState>,
    Query(query): Query<ConnectQuery>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    let identity = participant_identity(query.username.as_deref())?;
    Ok(ws.on_upgrade(move |socket| websocket_service::handle_socket(state, socket, identity)))
}

/// Configure the WebSocket endpoint.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/ws", get(ws_handler))
}
