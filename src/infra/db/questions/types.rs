use time::OffsetDateTime;

use crate::application::repos::{AnswerRow, QuestionAnswerRow, QuestionHeaderRow};
use crate::domain::entities::{AnswerRecord, QuestionSummary};

#[derive(sqlx::FromRow)]
pub(crate) struct QuestionRow {
    pub(crate) question_id: i32,
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) user_id: String,
    pub(crate) user_name: String,
    pub(crate) created: OffsetDateTime,
}

impl From<QuestionRow> for QuestionHeaderRow {
    fn from(row: QuestionRow) -> Self {
        Self {
            question_id: row.question_id,
            title: row.title,
            content: row.content,
            user_id: row.user_id,
            user_name: row.user_name,
            created: row.created,
        }
    }
}

impl From<QuestionRow> for QuestionSummary {
    fn from(row: QuestionRow) -> Self {
        Self {
            question_id: row.question_id,
            title: row.title,
            content: row.content,
            user_name: row.user_name,
            created: row.created,
            answers: None,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct AnswerDbRow {
    pub(crate) answer_id: i32,
    pub(crate) question_id: i32,
    pub(crate) content: String,
    pub(crate) user_id: String,
    pub(crate) user_name: String,
    pub(crate) created: OffsetDateTime,
}

impl From<AnswerDbRow> for AnswerRow {
    fn from(row: AnswerDbRow) -> Self {
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

impl From<AnswerDbRow> for AnswerRecord {
    fn from(row: AnswerDbRow) -> Self {
        AnswerRow::from(row).into()
    }
}

/// One row of `questions LEFT JOIN answers`.
#[derive(sqlx::FromRow)]
pub(crate) struct QuestionAnswerDbRow {
    pub(crate) question_id: i32,
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) user_id: String,
    pub(crate) user_name: String,
    pub(crate) created: OffsetDateTime,
    pub(crate) answer_id: Option<i32>,
    pub(crate) answer_content: Option<String>,
    pub(crate) answer_user_id: Option<String>,
    pub(crate) answer_user_name: Option<String>,
    pub(crate) answer_created: Option<OffsetDateTime>,
}

impl From<QuestionAnswerDbRow> for QuestionAnswerRow {
    fn from(row: QuestionAnswerDbRow) -> Self {
        let answer = match (
            row.answer_id,
            row.answer_content,
            row.answer_user_id,
            row.answer_user_name,
            row.answer_created,
        ) {
            (Some(answer_id), Some(content), Some(user_id), Some(user_name), Some(created)) => {
                Some(AnswerRow {
                    answer_id,
                    question_id: row.question_id,
                    content,
                    user_id,
                    user_name,
                    created,
                })
            }
            _ => None,
        };

        Self {
            header: QuestionHeaderRow {
                question_id: row.question_id,
                title: row.title,
                content: row.content,
                user_id: row.user_id,
                user_name: row.user_name,
                created: row.created,
            },
            answer,
        }
    }
}
