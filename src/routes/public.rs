use axum::{Json, Router, extract::State, routing::get};

use crate::{dto::public::LeaderboardResponse, services::public_service, state::SharedState};

/// Public read-only endpoints that expose the running session.
pub fn router() -> Router<SharedState> {
    Router::new().route("/public/leaderboard", get(get_leaderboard))
}

#[utoipa::path(
    get,
    path = "/public/leaderboard",
    tag = "public",
    responses((status = 200, description = "Current standings", body = LeaderboardResponse))
)]
/// Return the leaderboard of the running session.
pub async fn get_leaderboard(State(state): State<SharedState>) -> Json<LeaderboardResponse> {
    Json(public_service::get_leaderboard(&state).await)
}
