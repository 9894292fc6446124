//! Contract for fanning out question change notices to real-time subscribers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use crate::cache::ChangeKind;
use crate::domain::entities::{QuestionAggregate, QuestionId};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to encode notice for `{topic}`: {message}")]
    Encode { topic: String, message: String },
    #[error("transport rejected notice for `{topic}`: {message}")]
    Transport { topic: String, message: String },
}

/// Topic carrying every change of one question.
pub fn question_topic(question_id: QuestionId) -> String {
    format!("question:{question_id}")
}

/// Payload delivered to subscribers of a question topic.
///
/// `question` is a best-effort snapshot taken after the write; it is absent for
/// deletions and when the snapshot could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionNotice {
    pub question_id: QuestionId,
    pub change: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionAggregate>,
    #[serde(with = "time::serde::rfc3339")]
    pub emitted_at: OffsetDateTime,
}

impl QuestionNotice {
    pub fn new(
        question_id: QuestionId,
        change: ChangeKind,
        question: Option<QuestionAggregate>,
    ) -> Self {
        Self {
            question_id,
            change,
            question,
            emitted_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Best-effort broadcast. Implementations must not block on slow subscribers.
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    async fn publish(&self, topic: &str, notice: QuestionNotice) -> Result<(), PublishError>;
}
