//! Mutation kinds that invalidate a cached question.

use serde::{Deserialize, Serialize};

/// The write that just committed for a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    QuestionUpdated,
    QuestionDeleted,
    AnswerAdded,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::QuestionUpdated => "question_updated",
            ChangeKind::QuestionDeleted => "question_deleted",
            ChangeKind::AnswerAdded => "answer_added",
        }
    }

    /// Whether the question still exists after the change.
    pub fn question_survives(&self) -> bool {
        !matches!(self, ChangeKind::QuestionDeleted)
    }
}
