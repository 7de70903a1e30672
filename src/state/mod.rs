//! Shared application state and the quiz engine behind it.

pub mod deadline;
pub mod leaderboard;
pub mod participant;
/// Question domain types.
pub mod quiz;
pub mod registry;
pub mod scoring;

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tracing::{info, warn};

use crate::{config::AppConfig, dao::question_bank::QuestionBank};

use self::{leaderboard::Leaderboard, registry::SessionRegistry};

/// Handle to the application state shared by every request.
pub type SharedState = Arc<AppState>;

/// Central application state: the quiz session and the question bank health.
pub struct AppState {
    registry: SessionRegistry,
    degraded: AtomicBool,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The question bank is an explicit parameter: each state serves exactly
    /// one session fed by that bank.
    pub fn new(config: &AppConfig, question_bank: Arc<dyn QuestionBank>) -> SharedState {
        let registry = SessionRegistry::new(
            question_bank,
            config.timing(),
            config.adapter_timeout(),
            Arc::new(Leaderboard::new()),
        );
        Arc::new(Self {
            registry,
            degraded: AtomicBool::new(false),
        })
    }

    /// Registry of live participants; the only way into the quiz engine.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Leaderboard of the running session.
    pub fn leaderboard(&self) -> &Arc<Leaderboard> {
        self.registry.leaderboard()
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    /// Record whether the question bank is reachable, logging transitions.
    pub fn update_degraded(&self, value: bool) {
        let previous = self.degraded.swap(value, Ordering::AcqRel);

        if previous != value {
            if value {
                warn!("question bank unreachable; entering degraded mode");
            } else {
                info!("question bank reachable; leaving degraded mode");
            }
        }
    }
}
