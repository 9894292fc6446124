use async_trait::async_trait;

use crate::application::repos::{
    PageRequest, QuestionAnswerRow, QuestionRows, QuestionsRepo, RepoError,
};
use crate::domain::entities::{QuestionId, QuestionSummary};
use crate::infra::db::map_sqlx_error;

use super::PostgresRepositories;
use super::types::{AnswerDbRow, QuestionAnswerDbRow, QuestionRow};

const QUESTION_COLUMNS: &str =
    "q.question_id, q.title, q.content, q.user_id, q.user_name, q.created";
const NEWEST_FIRST: &str = "ORDER BY q.created DESC, q.question_id DESC";

#[async_trait]
impl QuestionsRepo for PostgresRepositories {
    async fn fetch_question_rows(
        &self,
        question_id: QuestionId,
    ) -> Result<QuestionRows, RepoError> {
        // Both result sets must come from one snapshot.
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let header = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions q WHERE q.question_id = $1"
        ))
        .bind(question_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let answers = sqlx::query_as::<_, AnswerDbRow>(
            "SELECT answer_id, question_id, content, user_id, user_name, created \
             FROM answers WHERE question_id = $1 ORDER BY created, answer_id",
        )
        .bind(question_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(QuestionRows {
            header: header.map(Into::into),
            answers: answers.into_iter().map(Into::into).collect(),
        })
    }

    async fn question_exists(&self, question_id: QuestionId) -> Result<bool, RepoError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM questions WHERE question_id = $1)",
        )
        .bind(question_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_questions(&self) -> Result<Vec<QuestionSummary>, RepoError> {
        let rows = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions q {NEWEST_FIRST}"
        ))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_questions_with_answers(&self) -> Result<Vec<QuestionAnswerRow>, RepoError> {
        let rows = sqlx::query_as::<_, QuestionAnswerDbRow>(&format!(
            "SELECT {QUESTION_COLUMNS}, \
                    a.answer_id, a.content AS answer_content, a.user_id AS answer_user_id, \
                    a.user_name AS answer_user_name, a.created AS answer_created \
             FROM questions q \
             LEFT JOIN answers a ON a.question_id = q.question_id \
             {NEWEST_FIRST}, a.created, a.answer_id"
        ))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn search_questions(
        &self,
        search: &str,
        page: PageRequest,
    ) -> Result<Vec<QuestionSummary>, RepoError> {
        let pattern = format!("%{}%", escape_like(search));
        let rows = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions q \
             WHERE q.title ILIKE $1 OR q.content ILIKE $1 \
             {NEWEST_FIRST} OFFSET $2 LIMIT $3"
        ))
        .bind(pattern)
        .bind(page.offset())
        .bind(page.limit())
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_unanswered(&self) -> Result<Vec<QuestionSummary>, RepoError> {
        let rows = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions q \
             WHERE NOT EXISTS (SELECT 1 FROM answers a WHERE a.question_id = q.question_id) \
             {NEWEST_FIRST}"
        ))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Escape `ILIKE` wildcards so the term matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
