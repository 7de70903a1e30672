//! Question bank backed by a JSON catalog of scheduled quizzes on disk.

use std::{path::PathBuf, sync::Arc};

use futures::{FutureExt, future::BoxFuture};
use time::{OffsetDateTime, UtcOffset};
use tracing::{debug, warn};

use super::QuestionBank;
use crate::{
    dao::{
        models::QuizCatalogEntity,
        storage::{StorageError, StorageResult},
    },
    state::quiz::Question,
};

/// Reads the catalog on every fetch so schedule edits apply to the next connection.
#[derive(Debug, Clone)]
pub struct FileQuestionBank {
    path: Arc<PathBuf>,
    schedule_offset: UtcOffset,
}

impl FileQuestionBank {
    /// Serve questions from the catalog stored at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
            schedule_offset: UtcOffset::UTC,
        }
    }

    /// Read catalog schedules as local times in `offset` instead of UTC.
    pub fn with_schedule_offset(mut self, offset: UtcOffset) -> Self {
        self.schedule_offset = offset;
        self
    }

    async fn load_catalog(path: &PathBuf) -> StorageResult<QuizCatalogEntity> {
        let contents = tokio::fs::read_to_string(path).await.map_err(|err| {
            StorageError::unavailable(format!("failed to read `{}`", path.display()), err)
        })?;
        serde_json::from_str(&contents).map_err(|err| {
            StorageError::corrupted(format!("failed to parse `{}`", path.display()), err)
        })
    }
}

/// Concatenate the questions of every quiz open at `now`, in catalog order.
pub(crate) fn eligible_questions(
    catalog: QuizCatalogEntity,
    now: OffsetDateTime,
    offset: UtcOffset,
) -> Vec<Question> {
    catalog
        .quizzes
        .into_iter()
        .filter(|quiz| match quiz.is_open_at(now, offset) {
            Ok(open) => open,
            Err(err) => {
                warn!(quiz = %quiz.name, error = %err, "skipping quiz with unreadable schedule");
                false
            }
        })
        .inspect(|quiz| debug!(quiz = %quiz.name, count = quiz.questions.len(), "quiz is open"))
        .flat_map(|quiz| quiz.questions)
        .map(Question::from)
        .collect()
}

impl QuestionBank for FileQuestionBank {
    fn fetch_eligible_questions(
        &self,
        now: OffsetDateTime,
    ) -> BoxFuture<'static, StorageResult<Vec<Question>>> {
        let path = Arc::clone(&self.path);
        let offset = self.schedule_offset;
        async move {
            let catalog = Self::load_catalog(&path).await?;
            Ok(eligible_questions(catalog, now, offset))
        }
        .boxed()
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let path = Arc::clone(&self.path);
        async move {
            tokio::fs::metadata(path.as_ref()).await.map_err(|err| {
                StorageError::unavailable(format!("cannot access `{}`", path.display()), err)
            })?;
            Ok(())
        }
        .boxed()
    }
}
