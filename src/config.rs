//! Application-level configuration loading: quiz timings and the question bank location.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationSeconds, serde_as};
use time::UtcOffset;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "LIVE_QUIZ_CONFIG_PATH";
/// Default catalog consulted by the file question bank.
const DEFAULT_QUESTION_BANK_PATH: &str = "config/quizzes.json";

/// Time a participant has to answer each question.
pub const DEFAULT_QUESTION_WINDOW: Duration = Duration::from_secs(60);
/// Pause between a `start` request and the first question.
pub const DEFAULT_START_DELAY: Duration = Duration::from_secs(2);
/// Upper bound on a single question bank fetch.
pub const DEFAULT_ADAPTER_TIMEOUT: Duration = Duration::from_secs(5);

/// Timings applied to every participant of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizTiming {
    /// Deadline armed for every dispatched question.
    pub question_window: Duration,
    /// Delay before the first question is dispatched.
    pub start_delay: Duration,
}

impl QuizTiming {
    /// Question window in whole seconds, as advertised to clients.
    pub fn time_limit_secs(&self) -> u64 {
        self.question_window.as_secs()
    }
}

impl Default for QuizTiming {
    fn default() -> Self {
        Self {
            question_window: DEFAULT_QUESTION_WINDOW,
            start_delay: DEFAULT_START_DELAY,
        }
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    timing: QuizTiming,
    adapter_timeout: Duration,
    question_bank_path: PathBuf,
    schedule_offset: UtcOffset,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json_str(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        question_window_secs = app_config.timing.question_window.as_secs(),
                        "loaded quiz configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a JSON configuration document; absent keys keep their defaults.
    pub fn from_json_str(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// Per-question window and start delay.
    pub fn timing(&self) -> QuizTiming {
        self.timing
    }

    /// Bound on question bank fetches.
    pub fn adapter_timeout(&self) -> Duration {
        self.adapter_timeout
    }

    /// Path of the quiz catalog read by the file question bank.
    pub fn question_bank_path(&self) -> &PathBuf {
        &self.question_bank_path
    }

    /// Offset the catalog's `date`/`time` schedules are written in.
    pub fn schedule_offset(&self) -> UtcOffset {
        self.schedule_offset
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timing: QuizTiming::default(),
            adapter_timeout: DEFAULT_ADAPTER_TIMEOUT,
            question_bank_path: PathBuf::from(DEFAULT_QUESTION_BANK_PATH),
            schedule_offset: UtcOffset::UTC,
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    #[serde(default)]
    question_window_secs: Option<Duration>,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    #[serde(default)]
    start_delay_secs: Option<Duration>,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    #[serde(default)]
    adapter_timeout_secs: Option<Duration>,
    #[serde(default)]
    question_bank_path: Option<PathBuf>,
    #[serde(default)]
    schedule_utc_offset_minutes: Option<i32>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();

        // A zero-length window would time every question out immediately.
        let question_window = match value.question_window_secs {
            Some(window) if window.is_zero() => {
                warn!("question window of 0s ignored; using default");
                DEFAULT_QUESTION_WINDOW
            }
            Some(window) => window,
            None => DEFAULT_QUESTION_WINDOW,
        };

        Self {
            timing: QuizTiming {
                question_window,
                start_delay: value.start_delay_secs.unwrap_or(DEFAULT_START_DELAY),
            },
            adapter_timeout: value
                .adapter_timeout_secs
                .unwrap_or(defaults.adapter_timeout),
            question_bank_path: value
                .question_bank_path
                .unwrap_or(defaults.question_bank_path),
            schedule_offset: value
                .schedule_utc_offset_minutes
                .map_or(defaults.schedule_offset, schedule_offset),
        }
    }
}

fn schedule_offset(minutes: i32) -> UtcOffset {
    minutes
        .checked_mul(60)
        .and_then(|seconds| UtcOffset::from_whole_seconds(seconds).ok())
        .unwrap_or_else(|| {
            warn!(minutes, "schedule offset out of range; using UTC");
            UtcOffset::UTC
        })
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
