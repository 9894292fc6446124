//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::entities::{AnswerRecord, QuestionId, QuestionSummary};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Header columns of a single question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionHeaderRow {
    pub question_id: QuestionId,
    pub title: String,
    pub content: String,
    pub user_id: String,
    pub user_name: String,
    pub created: OffsetDateTime,
}

/// Answer columns, keyed to their parent by `question_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRow {
    pub answer_id: i32,
    pub question_id: QuestionId,
    pub content: String,
    pub user_id: String,
    pub user_name: String,
    pub created: OffsetDateTime,
}

impl From<AnswerRow> for AnswerRecord {
    fn from(row: AnswerRow) -> Self {
        Self {
            answer_id: row.answer_id,
            question_id: row.question_id,
            content: row.content,
            user_id: row.user_id,
            user_name: row.user_name,
            created: row.created,
        }
    }
}

/// The two result sets behind one question read, taken from the same snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionRows {
    pub header: Option<QuestionHeaderRow>,
    pub answers: Vec<AnswerRow>,
}

/// One row of a combined question/answer stream. Questions without answers
/// appear once with `answer: None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionAnswerRow {
    pub header: QuestionHeaderRow,
    pub answer: Option<AnswerRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }
}

#[derive(Debug, Clone)]
pub struct CreateQuestionParams {
    pub title: String,
    pub content: String,
    pub user_id: String,
    pub user_name: String,
    pub created: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct UpdateQuestionParams {
    pub question_id: QuestionId,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct CreateAnswerParams {
    pub question_id: QuestionId,
    pub content: String,
    pub user_id: String,
    pub user_name: String,
    pub created: OffsetDateTime,
}

#[async_trait]
pub trait QuestionsRepo: Send + Sync {
    /// Header and answers of one question in a single round trip.
    async fn fetch_question_rows(&self, question_id: QuestionId)
    -> Result<QuestionRows, RepoError>;

    async fn question_exists(&self, question_id: QuestionId) -> Result<bool, RepoError>;

    async fn list_questions(&self) -> Result<Vec<QuestionSummary>, RepoError>;

    async fn list_questions_with_answers(&self) -> Result<Vec<QuestionAnswerRow>, RepoError>;

    async fn search_questions(
        &self,
        search: &str,
        page: PageRequest,
    ) -> Result<Vec<QuestionSummary>, RepoError>;

    async fn list_unanswered(&self) -> Result<Vec<QuestionSummary>, RepoError>;
}

/// Mutations. Each call returns only after the write is committed.
#[async_trait]
pub trait QuestionsWriteRepo: Send + Sync {
    async fn create_question(&self, params: CreateQuestionParams)
    -> Result<QuestionId, RepoError>;

    async fn update_question(&self, params: UpdateQuestionParams) -> Result<(), RepoError>;

    async fn delete_question(&self, question_id: QuestionId) -> Result<(), RepoError>;

    async fn create_answer(&self, params: CreateAnswerParams) -> Result<AnswerRecord, RepoError>;
}

/// Liveness probe for the backing store.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
