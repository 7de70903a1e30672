//! Session-wide standings shared by every participant.

use std::collections::HashMap;

use tokio::sync::RwLock;

/// Ordered copy of the leaderboard, highest score first (ties broken by identity).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaderboardSnapshot {
    entries: Vec<(String, u32)>,
}

impl LeaderboardSnapshot {
    /// Score recorded for `identity` when the snapshot was taken.
    pub fn score_of(&self, identity: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == identity)
            .map(|(_, score)| *score)
    }

    /// Number of ranked participants.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nobody has been ranked yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the snapshot, yielding the ordered pairs.
    pub fn into_entries(self) -> Vec<(String, u32)> {
        self.entries
    }
}

/// Session-wide mapping from participant identity to running score.
#[derive(Debug, Default)]
pub struct Leaderboard {
    scores: RwLock<HashMap<String, u32>>,
}

impl Leaderboard {
    /// Create an empty leaderboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the score recorded for `identity` with its latest running total.
    pub async fn update(&self, identity: &str, score: u32) {
        self.scores.write().await.insert(identity.to_owned(), score);
    }

    /// Update `identity` and capture the resulting ordering in one critical section.
    pub async fn update_and_snapshot(&self, identity: &str, score: u32) -> LeaderboardSnapshot {
        let entries = {
            let mut scores = self.scores.write().await;
            scores.insert(identity.to_owned(), score);
            clone_entries(&scores)
        };
        ordered(entries)
    }

    /// Copy the current standings without holding the lock while they are used.
    pub async fn snapshot(&self) -> LeaderboardSnapshot {
        let entries = {
            let scores = self.scores.read().await;
            clone_entries(&scores)
        };
        ordered(entries)
    }

    /// Latest score recorded for `identity`.
    pub async fn score_of(&self, identity: &str) -> Option<u32> {
        self.scores.read().await.get(identity).copied()
    }
}

fn clone_entries(scores: &HashMap<String, u32>) -> Vec<(String, u32)> {
    scores
        .iter()
        .map(|(identity, score)| (identity.clone(), *score))
        .collect()
}

fn ordered(mut entries: Vec<(String, u32)>) -> LeaderboardSnapshot {
    entries.sort_by(|(left_id, left), (right_id, right)| {
        right.cmp(left).then_with(|| left_id.cmp(right_id))
    });
    LeaderboardSnapshot { entries }
}
