use std::sync::Arc;

/// Immutable question served to every participant of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Prompt shown to the participant.
    pub text: String,
    /// Ordered answer options.
    pub options: Vec<String>,
    /// Value a submitted answer must equal to be considered correct.
    pub answer: String,
}

impl Question {
    /// Build a question from its prompt, options and correct answer.
    pub fn new(
        text: impl Into<String>,
        options: impl IntoIterator<Item = impl Into<String>>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            options: options.into_iter().map(Into::into).collect(),
            answer: answer.into(),
        }
    }

    /// Whether `candidate` matches the correct answer.
    pub fn is_correct(&self, candidate: &str) -> bool {
        self.answer == candidate
    }
}

/// Ordered question sequence shared read-only between a participant and its timers.
pub type QuestionSet = Arc<[Question]>;
