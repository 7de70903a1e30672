use serde::Serialize;
use utoipa::ToSchema;

/// Health payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Participants currently connected to the session.
    pub live_participants: usize,
}

impl HealthResponse {
    /// The question bank answered its health check.
    pub fn ok(live_participants: usize) -> Self {
        Self {
            status: "ok".to_string(),
            live_participants,
        }
    }

    /// The question bank is unreachable; new connections will be refused.
    pub fn degraded(live_participants: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            live_participants,
        }
    }
}
