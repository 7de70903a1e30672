/// JSON catalog on disk.
pub mod file;
/// Fixed in-process sequence.
pub mod memory;

use futures::future::BoxFuture;
use time::OffsetDateTime;

use crate::{dao::storage::StorageResult, state::quiz::Question};

pub use self::{file::FileQuestionBank, memory::MemoryQuestionBank};

/// Source of the questions served to newly connected participants.
///
/// Deciding which quizzes are eligible at a given instant belongs to the
/// adapter; an empty result means "nothing to play right now", not an error.
pub trait QuestionBank: Send + Sync {
    /// Ordered questions of every quiz eligible at `now`.
    fn fetch_eligible_questions(
        &self,
        now: OffsetDateTime,
    ) -> BoxFuture<'static, StorageResult<Vec<Question>>>;
    /// Cheap reachability check used by `/healthcheck`.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
