use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Check the question bank and report the resulting health status.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.registry().question_bank().health_check().await {
        Ok(()) => state.update_degraded(false),
        Err(err) => {
            warn!(error = %err, "question bank health check failed");
            state.update_degraded(true);
        }
    }

    let live = state.registry().len();
    if state.is_degraded() {
        HealthResponse::degraded(live)
    } else {
        HealthResponse::ok(live)
    }
}
