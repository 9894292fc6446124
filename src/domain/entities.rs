//! Domain entities mirrored from persistent storage.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::error::DomainError;

pub type QuestionId = i32;
pub type AnswerId = i32;

pub const TITLE_MAX_CHARS: usize = 100;

/// A question merged with every answer posted to it.
///
/// Answers are kept in creation order. Once an aggregate is handed to the
/// question cache it is shared behind an `Arc` and never mutated; a change in
/// storage produces a new aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAggregate {
    pub question_id: QuestionId,
    pub title: String,
    pub content: String,
    pub user_id: String,
    pub user_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    pub answers: Vec<AnswerRecord>,
}

impl QuestionAggregate {
    pub fn is_authored_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    pub fn summary(&self) -> QuestionSummary {
        QuestionSummary {
            question_id: self.question_id,
            title: self.title.clone(),
            content: self.content.clone(),
            user_name: self.user_name.clone(),
            created: self.created,
            answers: Some(self.answers.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub answer_id: AnswerId,
    pub question_id: QuestionId,
    pub content: String,
    pub user_id: String,
    pub user_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
}

/// Row shape of the list and search endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSummary {
    pub question_id: QuestionId,
    pub title: String,
    pub content: String,
    pub user_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<AnswerRecord>>,
}

/// Validated title and body of a question about to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub title: String,
    pub content: String,
}

impl QuestionDraft {
    pub fn new(title: &str, content: &str) -> Result<Self, DomainError> {
        let title = title.trim();
        let content = content.trim();

        if title.is_empty() {
            return Err(DomainError::blank("title"));
        }
        if title.chars().count() > TITLE_MAX_CHARS {
            return Err(DomainError::too_long("title", TITLE_MAX_CHARS));
        }
        if content.is_empty() {
            return Err(DomainError::blank("content"));
        }

        Ok(Self {
            title: title.to_string(),
            content: content.to_string(),
        })
    }

    /// Apply a partial update: blank or absent fields fall back to `current`.
    pub fn merge(
        current: &QuestionAggregate,
        title: Option<&str>,
        content: Option<&str>,
    ) -> Result<Self, DomainError> {
        let pick = |candidate: Option<&str>, stored: &str| -> String {
            match candidate.map(str::trim) {
                Some(value) if !value.is_empty() => value.to_string(),
                _ => stored.to_string(),
            }
        };

        Self::new(
            &pick(title, &current.title),
            &pick(content, &current.content),
        )
    }
}
