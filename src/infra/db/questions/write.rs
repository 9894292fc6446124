use async_trait::async_trait;

use crate::application::repos::{
    CreateAnswerParams, CreateQuestionParams, QuestionsWriteRepo, RepoError,
    UpdateQuestionParams,
};
use crate::domain::entities::{AnswerRecord, QuestionId};
use crate::infra::db::map_sqlx_error;

use super::PostgresRepositories;
use super::types::AnswerDbRow;

#[async_trait]
impl QuestionsWriteRepo for PostgresRepositories {
    async fn create_question(
        &self,
        params: CreateQuestionParams,
    ) -> Result<QuestionId, RepoError> {
        let CreateQuestionParams {
            title,
            content,
            user_id,
            user_name,
            created,
        } = params;

        sqlx::query_scalar::<_, i32>(
            "INSERT INTO questions (title, content, user_id, user_name, created) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING question_id",
        )
        .bind(title)
        .bind(content)
        .bind(user_id)
        .bind(user_name)
        .bind(created)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn update_question(&self, params: UpdateQuestionParams) -> Result<(), RepoError> {
        let result = sqlx::query(
            "UPDATE questions SET title = $2, content = $3 WHERE question_id = $1",
        )
        .bind(params.question_id)
        .bind(params.title)
        .bind(params.content)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn delete_question(&self, question_id: QuestionId) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM questions WHERE question_id = $1")
            .bind(question_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn create_answer(&self, params: CreateAnswerParams) -> Result<AnswerRecord, RepoError> {
        let CreateAnswerParams {
            question_id,
            content,
            user_id,
            user_name,
            created,
        } = params;

        let row = sqlx::query_as::<_, AnswerDbRow>(
            "INSERT INTO answers (question_id, content, user_id, user_name, created) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING answer_id, question_id, content, user_id, user_name, created",
        )
        .bind(question_id)
        .bind(content)
        .bind(user_id)
        .bind(user_name)
        .bind(created)
        .fetch_one(self.pool())
        .await
        .map_err(|err| match map_sqlx_error(err) {
            // The question was deleted between the existence check and the insert.
            RepoError::InvalidInput { .. } => RepoError::NotFound,
            other => other,
        })?;

        Ok(row.into())
    }
}
