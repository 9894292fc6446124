//! Question reads and writes.
//!
//! Single-question reads go through the question cache; every committed write
//! is followed by [`InvalidationCoordinator::on_mutated`].

use std::sync::Arc;

use qanda_api_types::{
    AnswerCreateRequest, QuestionCreateRequest, QuestionListQuery, QuestionUpdateRequest,
};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::application::auth::{AuthError, Principal};
use crate::application::loader::{AggregationLoader, LoadError, assemble_listing};
use crate::application::repos::{
    CreateAnswerParams, CreateQuestionParams, PageRequest, QuestionsRepo, QuestionsWriteRepo,
    RepoError, UpdateQuestionParams,
};
use crate::cache::{ChangeKind, InvalidationCoordinator, QuestionCache};
use crate::domain::entities::{
    AnswerRecord, QuestionAggregate, QuestionDraft, QuestionId, QuestionSummary,
};
use crate::domain::error::DomainError;

#[derive(Debug, Error)]
pub enum QuestionError {
    #[error("question not found")]
    NotFound,
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error(transparent)]
    Repo(RepoError),
}

impl From<LoadError> for QuestionError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::NotFound => Self::NotFound,
            LoadError::StorageUnavailable(message) => Self::StorageUnavailable(message),
        }
    }
}

impl From<RepoError> for QuestionError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => Self::NotFound,
            other => Self::Repo(other),
        }
    }
}

#[derive(Clone)]
pub struct QuestionService {
    reader: Arc<dyn QuestionsRepo>,
    writer: Arc<dyn QuestionsWriteRepo>,
    loader: AggregationLoader,
    coordinator: Arc<InvalidationCoordinator>,
}

impl QuestionService {
    pub fn new(
        reader: Arc<dyn QuestionsRepo>,
        writer: Arc<dyn QuestionsWriteRepo>,
        loader: AggregationLoader,
        coordinator: Arc<InvalidationCoordinator>,
    ) -> Self {
        Self {
            reader,
            writer,
            loader,
            coordinator,
        }
    }

    fn cache(&self) -> Option<&Arc<QuestionCache>> {
        self.coordinator.cache()
    }

    pub async fn list_questions(
        &self,
        query: &QuestionListQuery,
    ) -> Result<Vec<QuestionSummary>, QuestionError> {
        if let Some(search) = query.search_term() {
            let page = PageRequest::new(query.page(), query.page_size());
            return Ok(self.reader.search_questions(search, page).await?);
        }

        if query.include_answers {
            let rows = self.reader.list_questions_with_answers().await?;
            return Ok(assemble_listing(rows)
                .iter()
                .map(QuestionAggregate::summary)
                .collect());
        }

        Ok(self.reader.list_questions().await?)
    }

    pub async fn list_unanswered(&self) -> Result<Vec<QuestionSummary>, QuestionError> {
        Ok(self.reader.list_unanswered().await?)
    }

    /// Cached single-question read.
    ///
    /// Misses are loaded and populated under a ticket taken before the load,
    /// so a write that commits while the load is in flight keeps its eviction.
    /// Absent questions are never cached.
    pub async fn get_question(
        &self,
        question_id: QuestionId,
    ) -> Result<Arc<QuestionAggregate>, QuestionError> {
        let Some(cache) = self.cache() else {
            return Ok(Arc::new(self.loader.load(question_id).await?));
        };

        if let Some(hit) = cache.get(question_id) {
            return Ok(hit);
        }

        let ticket = cache.ticket(question_id);
        let aggregate = Arc::new(self.loader.load(question_id).await?);
        if !cache.set_with_ticket(ticket, Arc::clone(&aggregate)) {
            debug!(question_id, "Question changed during load; result not cached");
        }
        Ok(aggregate)
    }

    pub async fn create_question(
        &self,
        principal: &Principal,
        request: QuestionCreateRequest,
    ) -> Result<QuestionAggregate, QuestionError> {
        let draft = QuestionDraft::new(&request.title, &request.content)?;

        let question_id = self
            .writer
            .create_question(CreateQuestionParams {
                title: draft.title,
                content: draft.content,
                user_id: principal.user_id.clone(),
                user_name: principal.user_name.clone(),
                created: OffsetDateTime::now_utc(),
            })
            .await?;
        info!(question_id, user_id = %principal.user_id, "Question created");

        Ok(self.loader.load(question_id).await?)
    }

    /// Author-only partial update. Blank fields keep the stored value.
    pub async fn update_question(
        &self,
        principal: &Principal,
        question_id: QuestionId,
        request: QuestionUpdateRequest,
    ) -> Result<QuestionAggregate, QuestionError> {
        let current = self.loader.load(question_id).await?;
        principal.require_author(&current)?;

        let draft = QuestionDraft::merge(
            &current,
            request.title.as_deref(),
            request.content.as_deref(),
        )?;

        self.writer
            .update_question(UpdateQuestionParams {
                question_id,
                title: draft.title.clone(),
                content: draft.content.clone(),
            })
            .await?;
        self.coordinator.on_mutated(question_id, ChangeKind::QuestionUpdated);
        info!(question_id, user_id = %principal.user_id, "Question updated");

        Ok(QuestionAggregate {
            title: draft.title,
            content: draft.content,
            ..current
        })
    }

    pub async fn delete_question(
        &self,
        principal: &Principal,
        question_id: QuestionId,
    ) -> Result<(), QuestionError> {
        let current = self.loader.load(question_id).await?;
        principal.require_author(&current)?;

        self.writer.delete_question(question_id).await?;
        self.coordinator.on_mutated(question_id, ChangeKind::QuestionDeleted);
        info!(question_id, user_id = %principal.user_id, "Question deleted");
        Ok(())
    }

    pub async fn post_answer(
        &self,
        principal: &Principal,
        request: AnswerCreateRequest,
    ) -> Result<AnswerRecord, QuestionError> {
        let question_id = request.question_id.ok_or(QuestionError::NotFound)?;
        let content = request.content.trim();
        if content.is_empty() {
            return Err(DomainError::blank("content").into());
        }
        if !self.reader.question_exists(question_id).await? {
            return Err(QuestionError::NotFound);
        }

        let answer = self
            .writer
            .create_answer(CreateAnswerParams {
                question_id,
                content: content.to_string(),
                user_id: principal.user_id.clone(),
                user_name: principal.user_name.clone(),
                created: OffsetDateTime::now_utc(),
            })
            .await?;
        self.coordinator.on_mutated(question_id, ChangeKind::AnswerAdded);
        info!(
            question_id,
            answer_id = answer.answer_id,
            user_id = %principal.user_id,
            "Answer posted"
        );
        Ok(answer)
    }
}
