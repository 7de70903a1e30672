/// Persisted quiz catalog model definitions.
pub mod models;
/// Question bank adapters feeding sessions with questions.
pub mod question_bank;
/// Storage error types shared by every adapter.
pub mod storage;
