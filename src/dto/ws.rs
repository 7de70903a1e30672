//! Frames exchanged with participants over the `/ws` socket.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationErrors};

use crate::state::{leaderboard::LeaderboardSnapshot, quiz::Question};

/// Query string carried by the WebSocket upgrade request.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ConnectQuery {
    /// Participant identity, unique among live participants.
    pub username: Option<String>,
}

/// Reasons an inbound frame is rejected.
#[derive(Debug, Error)]
pub enum InboundMessageError {
    /// Not JSON, or not shaped like any known frame.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Well-formed frame whose fields fail validation.
    #[error("invalid message: {0}")]
    Invalid(#[from] ValidationErrors),
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
/// Messages accepted from participant WebSocket clients.
#[serde(tag = "type")]
pub enum ParticipantInboundMessage {
    /// Begin the quiz.
    #[serde(rename = "start")]
    Start,
    /// Answer the question on screen.
    #[serde(rename = "answer")]
    Answer(AnswerPayload),
    /// Any other `type`; ignored.
    #[serde(other)]
    Unknown,
}

impl ParticipantInboundMessage {
    /// Parse a text frame and validate its payload.
    pub fn from_json_str(text: &str) -> Result<Self, InboundMessageError> {
        let message: Self = serde_json::from_str(text)?;
        if let Self::Answer(payload) = &message {
            payload.validate()?;
        }
        Ok(message)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Answer submitted for the question currently on screen.
pub struct AnswerPayload {
    /// Chosen option, as text or as a bare JSON scalar.
    pub answer: AnswerValue,
    /// Seconds elapsed between the question being shown and the answer.
    #[validate(range(min = 0.0))]
    pub response_time: f64,
    /// Index of the question being answered, echoed from the question event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_index: Option<usize>,
}

/// Answer value as sent by the client.
///
/// Clients may send the option verbatim or as a JSON number or boolean;
/// [`AnswerValue::as_text`] gives the form compared against the stored answer.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
#[serde(untagged)]
pub enum AnswerValue {
    /// `"Paris"`
    Text(String),
    /// `4`
    Integer(i64),
    /// `2.5`
    Float(f64),
    /// `true`
    Flag(bool),
}

impl AnswerValue {
    /// Textual form of the answer. Whole floats lose their fraction (`4.0` is `"4"`).
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(text) => Cow::Borrowed(text),
            Self::Integer(value) => Cow::Owned(value.to_string()),
            Self::Float(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                Cow::Owned((*value as i64).to_string())
            }
            Self::Float(value) => Cow::Owned(value.to_string()),
            Self::Flag(value) => Cow::Owned(value.to_string()),
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
/// Messages pushed to a participant.
#[serde(tag = "type")]
pub enum ParticipantOutboundMessage {
    /// A new question is on screen.
    #[serde(rename = "question")]
    Question(QuestionEvent),
    /// A question was resolved.
    #[serde(rename = "score")]
    Score(ScoreEvent),
    /// No questions left.
    #[serde(rename = "finished")]
    Finished(FinishedEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Question dispatched when the participant enters a new question.
pub struct QuestionEvent {
    /// Prompt text.
    pub question: String,
    /// Options in display order.
    pub options: Vec<String>,
    /// Seconds available before the question times out.
    pub time_limit: u64,
    /// Position of the question in the participant's sequence.
    pub question_index: usize,
}

impl QuestionEvent {
    /// Build the event for the question at `question_index` with the configured window.
    pub fn new(question: &Question, question_index: usize, time_limit: u64) -> Self {
        Self {
            question: question.text.clone(),
            options: question.options.clone(),
            time_limit,
            question_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
/// Running total and standings emitted after every resolved question.
pub struct ScoreEvent {
    /// Participant's running total.
    pub score: u32,
    /// `[identity, score]` pairs, best first.
    #[schema(value_type = Vec<Vec<Object>>)]
    pub leaderboard: Vec<(String, u32)>,
}

impl ScoreEvent {
    /// Combine the participant's running total with a leaderboard snapshot.
    pub fn new(score: u32, snapshot: LeaderboardSnapshot) -> Self {
        Self {
            score,
            leaderboard: snapshot.into_entries(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
/// Sent once the participant has no questions left.
pub struct FinishedEvent {
    /// Final total.
    pub score: u32,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_start_and_answer() {
        assert!(matches!(
            ParticipantInboundMessage::from_json_str(r#"{"type":"start"}"#).unwrap(),
            ParticipantInboundMessage::Start
        ));

        let message = ParticipantInboundMessage::from_json_str(
            r#"{"type":"answer","answer":"Paris","responseTime":12.5}"#,
        )
        .unwrap();
        match message {
            ParticipantInboundMessage::Answer(payload) => {
                assert_eq!(payload.answer, AnswerValue::from("Paris"));
                assert_eq!(payload.response_time, 12.5);
                assert_eq!(payload.question_index, None);
            }
            other => panic!("expected answer, got {other:?}"),
        }
    }

    #[test]
    fn scalar_answers_are_accepted() {
        let message = ParticipantInboundMessage::from_json_str(
            r#"{"type":"answer","answer":4,"responseTime":3,"questionIndex":2}"#,
        )
        .unwrap();
        let ParticipantInboundMessage::Answer(payload) = message else {
            panic!("expected answer, got {message:?}");
        };
        assert_eq!(payload.answer, AnswerValue::Integer(4));
        assert_eq!(payload.answer.as_text(), "4");
        assert_eq!(payload.question_index, Some(2));

        let flag = ParticipantInboundMessage::from_json_str(
            r#"{"type":"answer","answer":true,"responseTime":3}"#,
        )
        .unwrap();
        assert!(matches!(
            flag,
            ParticipantInboundMessage::Answer(AnswerPayload { answer: AnswerValue::Flag(true), .. })
        ));

        assert_eq!(AnswerValue::Float(4.0).as_text(), "4");
        assert_eq!(AnswerValue::Float(2.5).as_text(), "2.5");
    }

    #[test]
    fn null_answer_is_malformed() {
        let err = ParticipantInboundMessage::from_json_str(
            r#"{"type":"answer","answer":null,"responseTime":3}"#,
        )
        .unwrap_err();
        assert!(matches!(err, InboundMessageError::Malformed(_)));
    }

    #[test]
    fn unknown_types_are_tolerated() {
        assert!(matches!(
            ParticipantInboundMessage::from_json_str(r#"{"type":"chat"}"#).unwrap(),
            ParticipantInboundMessage::Unknown
        ));
    }

    #[test]
    fn negative_response_time_is_rejected() {
        let err = ParticipantInboundMessage::from_json_str(
            r#"{"type":"answer","answer":"Paris","responseTime":-1}"#,
        )
        .unwrap_err();
        assert!(matches!(err, InboundMessageError::Invalid(_)));
    }

    #[test]
    fn missing_fields_are_malformed() {
        let err =
            ParticipantInboundMessage::from_json_str(r#"{"type":"answer","answer":"Paris"}"#)
                .unwrap_err();
        assert!(matches!(err, InboundMessageError::Malformed(_)));
    }

    #[test]
    fn outbound_wire_format() {
        let question = ParticipantOutboundMessage::Question(QuestionEvent {
            question: "Capital of France?".into(),
            options: vec!["Paris".into(), "Lyon".into(), "Nice".into()],
            time_limit: 60,
            question_index: 0,
        });
        assert_eq!(
            serde_json::to_value(&question).unwrap(),
            json!({
                "type": "question",
                "question": "Capital of France?",
                "options": ["Paris", "Lyon", "Nice"],
                "timeLimit": 60,
                "questionIndex": 0,
            })
        );

        let score = ParticipantOutboundMessage::Score(ScoreEvent {
            score: 25,
            leaderboard: vec![("alice".into(), 25)],
        });
        assert_eq!(
            serde_json::to_value(&score).unwrap(),
            json!({ "type": "score", "score": 25, "leaderboard": [["alice", 25]] })
        );
    }
}
