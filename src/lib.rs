//! Library crate for live-quiz-back, exposing modules for binaries and integration tests.

pub mod config;
/// Question bank adapters and persisted models.
pub mod dao;
/// Wire payloads for WebSocket frames and HTTP responses.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// HTTP route trees.
pub mod routes;
/// Request handlers sitting between routes and state.
pub mod services;
pub mod state;
