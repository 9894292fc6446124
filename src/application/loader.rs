//! Builds question aggregates from storage rows.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::application::repos::{
    AnswerRow, QuestionAnswerRow, QuestionHeaderRow, QuestionRows, QuestionsRepo, RepoError,
};
use crate::domain::entities::{AnswerRecord, QuestionAggregate, QuestionId};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("question not found")]
    NotFound,
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl From<RepoError> for LoadError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => Self::NotFound,
            other => Self::StorageUnavailable(other.to_string()),
        }
    }
}

/// Read-only loader for single-question aggregates.
///
/// The loader never touches the question cache; placing its result there is
/// the caller's job.
#[derive(Clone)]
pub struct AggregationLoader {
    repo: Arc<dyn QuestionsRepo>,
    timeout: Duration,
}

impl AggregationLoader {
    pub fn new(repo: Arc<dyn QuestionsRepo>, timeout: Duration) -> Self {
        Self { repo, timeout }
    }

    pub async fn load(&self, question_id: QuestionId) -> Result<QuestionAggregate, LoadError> {
        let rows = tokio::time::timeout(self.timeout, self.repo.fetch_question_rows(question_id))
            .await
            .map_err(|_| {
                LoadError::StorageUnavailable(format!(
                    "question {question_id} load timed out after {}ms",
                    self.timeout.as_millis()
                ))
            })??;

        assemble(question_id, rows).ok_or(LoadError::NotFound)
    }
}

/// Merge the header and answer result sets of one question.
///
/// Returns `None` when the header is absent; answer rows are ignored then.
pub fn assemble(question_id: QuestionId, rows: QuestionRows) -> Option<QuestionAggregate> {
    let QuestionRows { header, answers } = rows;

    let Some(header) = header else {
        if !answers.is_empty() {
            warn!(
                question_id,
                stray_answers = answers.len(),
                "answers returned without a question header; discarding"
            );
        }
        return None;
    };

    if header.question_id != question_id {
        warn!(
            question_id,
            header_id = header.question_id,
            "storage returned a header for a different question"
        );
        return None;
    }

    let total = answers.len();
    let mut answers: Vec<AnswerRecord> = answers
        .into_iter()
        .filter(|answer| answer.question_id == question_id)
        .map(AnswerRecord::from)
        .collect();
    if answers.len() != total {
        debug!(
            question_id,
            dropped = total - answers.len(),
            "dropped answers belonging to other questions"
        );
    }
    sort_by_creation(&mut answers);

    Some(into_aggregate(header, answers))
}

/// Group a combined question/answer stream into aggregates.
///
/// Answers are matched to headers by identifier, so rows of one question may
/// be scattered through the stream. Questions keep their first-seen order.
pub fn assemble_listing(rows: Vec<QuestionAnswerRow>) -> Vec<QuestionAggregate> {
    let mut order: Vec<QuestionId> = Vec::new();
    let mut grouped: HashMap<QuestionId, (QuestionHeaderRow, Vec<AnswerRecord>)> = HashMap::new();

    for QuestionAnswerRow { header, answer } in rows {
        let question_id = header.question_id;
        let entry = grouped.entry(question_id).or_insert_with(|| {
            order.push(question_id);
            (header, Vec::new())
        });
        if let Some(answer) = answer.filter(|answer: &AnswerRow| answer.question_id == question_id)
        {
            let record = AnswerRecord::from(answer);
            if !entry.1.iter().any(|seen| seen.answer_id == record.answer_id) {
                entry.1.push(record);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|question_id| grouped.remove(&question_id))
        .map(|(header, mut answers)| {
            sort_by_creation(&mut answers);
            into_aggregate(header, answers)
        })
        .collect()
}

fn sort_by_creation(answers: &mut [AnswerRecord]) {
    answers.sort_by(|a, b| (a.created, a.answer_id).cmp(&(b.created, b.answer_id)));
}

fn into_aggregate(header: QuestionHeaderRow, answers: Vec<AnswerRecord>) -> QuestionAggregate {
    QuestionAggregate {
        question_id: header.question_id,
        title: header.title,
        content: header.content,
        user_id: header.user_id,
        user_name: header.user_name,
        created: header.created,
        answers,
    }
}
