use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{
    Date, OffsetDateTime, Time, UtcOffset, format_description::BorrowedFormatItem, macros::format_description,
};

use crate::state::quiz::Question;

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const TIME_FORMAT_SECONDS: &[BorrowedFormatItem<'static>] =
    format_description!("[hour]:[minute]:[second]");
const TIME_FORMAT_MINUTES: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]");

/// Document holding every scheduled quiz known to the question bank.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizCatalogEntity {
    /// Quizzes in the order their questions should be served.
    #[serde(default)]
    pub quizzes: Vec<ScheduledQuizEntity>,
}

/// A quiz definition together with the slot it is scheduled for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduledQuizEntity {
    /// Human readable quiz name.
    pub name: String,
    /// First day the quiz may run (`YYYY-MM-DD`).
    pub date: String,
    /// Time of day the quiz opens (`HH:MM` or `HH:MM:SS`).
    pub time: String,
    /// Ordered questions of the quiz.
    #[serde(default)]
    pub questions: Vec<QuestionEntity>,
}

/// Question as persisted in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// Prompt shown to participants.
    pub question: String,
    /// Ordered answer options.
    pub options: Vec<String>,
    /// The correct answer value.
    pub answer: String,
}

impl From<QuestionEntity> for Question {
    fn from(value: QuestionEntity) -> Self {
        Self {
            text: value.question,
            options: value.options,
            answer: value.answer,
        }
    }
}

/// A schedule that cannot be interpreted.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// `date` is not `YYYY-MM-DD`.
    #[error("invalid schedule date `{value}`")]
    Date {
        /// Raw value from the catalog.
        value: String,
        /// Parser error.
        #[source]
        source: time::error::Parse,
    },
    /// `time` is neither `HH:MM` nor `HH:MM:SS`.
    #[error("invalid schedule time `{value}`")]
    Time {
        /// Raw value from the catalog.
        value: String,
        /// Parser error.
        #[source]
        source: time::error::Parse,
    },
}

impl ScheduledQuizEntity {
    /// Whether the quiz is open at `now`, reading its schedule in `offset`.
    ///
    /// A quiz is open on or after its scheduled day, during the minute that
    /// matches its scheduled hour and minute.
    pub fn is_open_at(
        &self,
        now: OffsetDateTime,
        offset: UtcOffset,
    ) -> Result<bool, ScheduleError> {
        let date = Date::parse(&self.date, DATE_FORMAT).map_err(|source| ScheduleError::Date {
            value: self.date.clone(),
            source,
        })?;
        let time = parse_time_of_day(&self.time)?;

        let now = now.to_offset(offset);
        let opens_on = date.midnight().assume_offset(offset);

        Ok(now >= opens_on && now.hour() == time.hour() && now.minute() == time.minute())
    }
}

fn parse_time_of_day(value: &str) -> Result<Time, ScheduleError> {
    Time::parse(value, TIME_FORMAT_SECONDS)
        .or_else(|_| Time::parse(value, TIME_FORMAT_MINUTES))
        .map_err(|source| ScheduleError::Time {
            value: value.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use time::macros::{datetime, offset};

    use super::*;

    fn quiz(date: &str, time: &str) -> ScheduledQuizEntity {
        ScheduledQuizEntity {
            name: "geography".into(),
            date: date.into(),
            time: time.into(),
            questions: Vec::new(),
        }
    }

    #[test]
    fn open_during_matching_minute() {
        let quiz = quiz("2024-05-01", "18:30");
        assert!(quiz.is_open_at(datetime!(2024-05-01 18:30:00 UTC), UtcOffset::UTC).unwrap());
        assert!(quiz.is_open_at(datetime!(2024-05-01 18:30:59 UTC), UtcOffset::UTC).unwrap());
        assert!(!quiz.is_open_at(datetime!(2024-05-01 18:31:00 UTC), UtcOffset::UTC).unwrap());
        assert!(!quiz.is_open_at(datetime!(2024-05-01 19:30:00 UTC), UtcOffset::UTC).unwrap());
    }

    #[test]
    fn reopens_on_later_days_but_not_before() {
        let quiz = quiz("2024-05-01", "08:05:00");
        assert!(quiz.is_open_at(datetime!(2024-06-12 08:05:10 UTC), UtcOffset::UTC).unwrap());
        assert!(!quiz.is_open_at(datetime!(2024-04-30 08:05:10 UTC), UtcOffset::UTC).unwrap());
    }

    #[test]
    fn offsets_are_normalised_to_utc() {
        let quiz = quiz("2024-05-01", "18:30");
        assert!(quiz.is_open_at(datetime!(2024-05-01 20:30:00 +02:00), UtcOffset::UTC).unwrap());
    }

    #[test]
    fn schedules_can_be_read_in_a_local_offset() {
        let quiz = quiz("2024-05-01", "18:30");
        let paris = offset!(+2);
        assert!(quiz.is_open_at(datetime!(2024-05-01 16:30:00 UTC), paris).unwrap());
        assert!(!quiz.is_open_at(datetime!(2024-05-01 18:30:00 UTC), paris).unwrap());
        // 23:30 local on the 30th is still before the scheduled day.
        let late = self::quiz("2024-05-01", "23:30");
        assert!(!late.is_open_at(datetime!(2024-04-30 21:30:00 UTC), paris).unwrap());
        assert!(late.is_open_at(datetime!(2024-05-01 21:30:00 UTC), paris).unwrap());
    }

    #[test]
    fn malformed_schedules_are_reported() {
        assert!(matches!(
            quiz("01/05/2024", "18:30").is_open_at(datetime!(2024-05-01 18:30 UTC), UtcOffset::UTC),
            Err(ScheduleError::Date { .. })
        ));
        assert!(matches!(
            quiz("2024-05-01", "half past six").is_open_at(datetime!(2024-05-01 18:30 UTC), UtcOffset::UTC),
            Err(ScheduleError::Time { .. })
        ));
    }
}
