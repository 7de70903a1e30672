//! Service helpers that expose read-only public projections of the running session.

use crate::{dto::public::LeaderboardResponse, state::SharedState};

/// Return the current standings and how many participants are connected.
pub async fn get_leaderboard(state: &SharedState) -> LeaderboardResponse {
    let snapshot = state.leaderboard().snapshot().await;
    LeaderboardResponse::new(snapshot, state.registry().len())
}
