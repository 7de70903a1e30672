use serde::Serialize;
use utoipa::ToSchema;

use crate::state::leaderboard::LeaderboardSnapshot;

#[derive(Debug, Serialize, ToSchema)]
/// One row of the public leaderboard.
pub struct LeaderboardEntry {
    /// Participant identity.
    pub identity: String,
    /// Latest running total.
    pub score: u32,
}

#[derive(Debug, Serialize, ToSchema)]
/// Current standings and how many participants are still connected.
pub struct LeaderboardResponse {
    /// Rows ordered best first.
    pub leaderboard: Vec<LeaderboardEntry>,
    /// Live participants in the registry.
    pub participants: usize,
}

impl LeaderboardResponse {
    /// Project a snapshot into the public response.
    pub fn new(snapshot: LeaderboardSnapshot, participants: usize) -> Self {
        let leaderboard = snapshot
            .into_entries()
            .into_iter()
            .map(|(identity, score)| LeaderboardEntry { identity, score })
            .collect();
        Self {
            leaderboard,
            participants,
        }
    }
}
