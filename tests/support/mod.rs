#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::oneshot;

use qanda::application::auth::{StaticTokenProvider, TokenCredential};
use qanda::application::loader::AggregationLoader;
use qanda::application::questions::QuestionService;
use qanda::application::repos::{
    AnswerRow, CreateAnswerParams, CreateQuestionParams, HealthCheck, PageRequest,
    QuestionAnswerRow, QuestionHeaderRow, QuestionRows, QuestionsRepo, QuestionsWriteRepo,
    RepoError, UpdateQuestionParams,
};
use qanda::cache::{CacheConfig, InvalidationCoordinator, QuestionCache};
use qanda::domain::entities::{AnswerRecord, QuestionId, QuestionSummary};
use qanda::infra::http::ApiState;
use qanda::infra::hub::QuestionHub;

pub const ALICE_TOKEN: &str = "alice-token";
pub const BOB_TOKEN: &str = "bob-token";
pub const ALICE_ID: &str = "auth0|alice";
pub const BOB_ID: &str = "auth0|bob";

/// Pauses one `fetch_question_rows` call after it has read its snapshot.
pub struct FetchGate {
    reached: oneshot::Sender<()>,
    resume: oneshot::Receiver<()>,
}

#[derive(Default)]
struct StoreState {
    next_question: QuestionId,
    next_answer: i32,
    questions: BTreeMap<QuestionId, QuestionHeaderRow>,
    answers: Vec<AnswerRow>,
}

/// Question storage kept in memory. Each write is committed when the call returns.
#[derive(Default)]
pub struct InMemoryQuestions {
    state: Mutex<StoreState>,
    gate: Mutex<Option<FetchGate>>,
    offline: Mutex<bool>,
}

impl InMemoryQuestions {
    pub fn seed_question(&self, question_id: QuestionId, title: &str, user_id: &str) {
        let mut state = self.state.lock().expect("store lock");
        state.next_question = state.next_question.max(question_id);
        state.questions.insert(
            question_id,
            QuestionHeaderRow {
                question_id,
                title: title.to_string(),
                content: format!("{title} content"),
                user_id: user_id.to_string(),
                user_name: user_id.trim_start_matches("auth0|").to_string(),
                created: OffsetDateTime::UNIX_EPOCH,
            },
        );
    }

    /// Stores an answer row even when no question header exists for it.
    pub fn seed_answer(&self, question_id: QuestionId, content: &str, minutes: i64) -> i32 {
        let mut state = self.state.lock().expect("store lock");
        state.next_answer += 1;
        let answer_id = state.next_answer;
        state.answers.push(AnswerRow {
            answer_id,
            question_id,
            content: content.to_string(),
            user_id: BOB_ID.to_string(),
            user_name: "bob".to_string(),
            created: OffsetDateTime::UNIX_EPOCH + time::Duration::minutes(minutes),
        });
        answer_id
    }

    /// Arm the gate for the next fetch. Returns (reached, resume) handles.
    pub fn pause_next_fetch(&self) -> (oneshot::Receiver<()>, oneshot::Sender<()>) {
        let (reached_tx, reached_rx) = oneshot::channel();
        let (resume_tx, resume_rx) = oneshot::channel();
        *self.gate.lock().expect("gate lock") = Some(FetchGate {
            reached: reached_tx,
            resume: resume_rx,
        });
        (reached_rx, resume_tx)
    }

    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().expect("offline lock") = offline;
    }

    fn check_online(&self) -> Result<(), RepoError> {
        if *self.offline.lock().expect("offline lock") {
            return Err(RepoError::Persistence("connection refused".to_string()));
        }
        Ok(())
    }

    fn summaries<F>(&self, keep: F) -> Vec<QuestionSummary>
    where
        F: Fn(&QuestionHeaderRow, &[AnswerRow]) -> bool,
    {
        let state = self.state.lock().expect("store lock");
        state
            .questions
            .values()
            .rev()
            .filter(|header| keep(header, &state.answers))
            .map(|header| QuestionSummary {
                question_id: header.question_id,
                title: header.title.clone(),
                content: header.content.clone(),
                user_name: header.user_name.clone(),
                created: header.created,
                answers: None,
            })
            .collect()
    }
}

#[async_trait]
impl QuestionsRepo for InMemoryQuestions {
    async fn fetch_question_rows(
        &self,
        question_id: QuestionId,
    ) -> Result<QuestionRows, RepoError> {
        self.check_online()?;
        let rows = {
            let state = self.state.lock().expect("store lock");
            QuestionRows {
                header: state.questions.get(&question_id).cloned(),
                answers: state
                    .answers
                    .iter()
                    .filter(|answer| answer.question_id == question_id)
                    .cloned()
                    .collect(),
            }
        };

        let gate = self.gate.lock().expect("gate lock").take();
        if let Some(gate) = gate {
            let _ = gate.reached.send(());
            let _ = gate.resume.await;
        }
        Ok(rows)
    }

    async fn question_exists(&self, question_id: QuestionId) -> Result<bool, RepoError> {
        self.check_online()?;
        Ok(self
            .state
            .lock()
            .expect("store lock")
            .questions
            .contains_key(&question_id))
    }

    async fn list_questions(&self) -> Result<Vec<QuestionSummary>, RepoError> {
        self.check_online()?;
        Ok(self.summaries(|_, _| true))
    }

    async fn list_questions_with_answers(&self) -> Result<Vec<QuestionAnswerRow>, RepoError> {
        self.check_online()?;
        let state = self.state.lock().expect("store lock");
        let mut rows = Vec::new();
        for header in state.questions.values().rev() {
            let answers: Vec<_> = state
                .answers
                .iter()
                .filter(|answer| answer.question_id == header.question_id)
                .collect();
            if answers.is_empty() {
                rows.push(QuestionAnswerRow {
                    header: header.clone(),
                    answer: None,
                });
            }
            for answer in answers {
                rows.push(QuestionAnswerRow {
                    header: header.clone(),
                    answer: Some(answer.clone()),
                });
            }
        }
        Ok(rows)
    }

    async fn search_questions(
        &self,
        search: &str,
        page: PageRequest,
    ) -> Result<Vec<QuestionSummary>, RepoError> {
        self.check_online()?;
        let needle = search.to_lowercase();
        Ok(self
            .summaries(|header, _| {
                header.title.to_lowercase().contains(&needle)
                    || header.content.to_lowercase().contains(&needle)
            })
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect())
    }

    async fn list_unanswered(&self) -> Result<Vec<QuestionSummary>, RepoError> {
        self.check_online()?;
        Ok(self.summaries(|header, answers| {
            !answers
                .iter()
                .any(|answer| answer.question_id == header.question_id)
        }))
    }
}

#[async_trait]
impl QuestionsWriteRepo for InMemoryQuestions {
    async fn create_question(
        &self,
        params: CreateQuestionParams,
    ) -> Result<QuestionId, RepoError> {
        self.check_online()?;
        let mut state = self.state.lock().expect("store lock");
        state.next_question += 1;
        let question_id = state.next_question;
        state.questions.insert(
            question_id,
            QuestionHeaderRow {
                question_id,
                title: params.title,
                content: params.content,
                user_id: params.user_id,
                user_name: params.user_name,
                created: params.created,
            },
        );
        Ok(question_id)
    }

    async fn update_question(&self, params: UpdateQuestionParams) -> Result<(), RepoError> {
        self.check_online()?;
        let mut state = self.state.lock().expect("store lock");
        let header = state
            .questions
            .get_mut(&params.question_id)
            .ok_or(RepoError::NotFound)?;
        header.title = params.title;
        header.content = params.content;
        Ok(())
    }

    async fn delete_question(&self, question_id: QuestionId) -> Result<(), RepoError> {
        self.check_online()?;
        let mut state = self.state.lock().expect("store lock");
        state
            .questions
            .remove(&question_id)
            .ok_or(RepoError::NotFound)?;
        state.answers.retain(|answer| answer.question_id != question_id);
        Ok(())
    }

    async fn create_answer(&self, params: CreateAnswerParams) -> Result<AnswerRecord, RepoError> {
        self.check_online()?;
        let mut state = self.state.lock().expect("store lock");
        if !state.questions.contains_key(&params.question_id) {
            return Err(RepoError::NotFound);
        }
        state.next_answer += 1;
        let row = AnswerRow {
            answer_id: state.next_answer,
            question_id: params.question_id,
            content: params.content,
            user_id: params.user_id,
            user_name: params.user_name,
            created: params.created,
        };
        state.answers.push(row.clone());
        Ok(row.into())
    }
}

#[async_trait]
impl HealthCheck for InMemoryQuestions {
    async fn ping(&self) -> Result<(), RepoError> {
        self.check_online()
    }
}

pub struct Harness {
    pub store: Arc<InMemoryQuestions>,
    pub cache: Option<Arc<QuestionCache>>,
    pub hub: Arc<QuestionHub>,
    pub loader: AggregationLoader,
    pub service: Arc<QuestionService>,
}

impl Harness {
    pub fn new(cache: Option<CacheConfig>) -> Self {
        let store = Arc::new(InMemoryQuestions::default());
        let cache = cache.map(|config| Arc::new(QuestionCache::new(&config)));
        let hub = Arc::new(QuestionHub::default());
        let loader = AggregationLoader::new(store.clone(), Duration::from_secs(5));
        let coordinator = Arc::new(InvalidationCoordinator::new(
            cache.clone(),
            loader.clone(),
            hub.clone(),
        ));
        let service = Arc::new(QuestionService::new(
            store.clone(),
            store.clone(),
            loader.clone(),
            coordinator,
        ));

        Self {
            store,
            cache,
            hub,
            loader,
            service,
        }
    }

    pub fn cached() -> Self {
        Self::new(Some(CacheConfig::default()))
    }

    pub fn cache(&self) -> &QuestionCache {
        self.cache.as_deref().expect("cache enabled")
    }

    pub fn api_state(&self) -> ApiState {
        let identity = StaticTokenProvider::new(vec![
            TokenCredential {
                user_id: ALICE_ID.to_string(),
                user_name: "Alice".to_string(),
                token_sha256: StaticTokenProvider::hash_token(ALICE_TOKEN),
            },
            TokenCredential {
                user_id: BOB_ID.to_string(),
                user_name: "Bob".to_string(),
                token_sha256: StaticTokenProvider::hash_token(BOB_TOKEN),
            },
        ]);

        ApiState {
            questions: self.service.clone(),
            identity: Arc::new(identity),
            hub: self.hub.clone(),
            health: self.store.clone(),
        }
    }
}

pub fn principal(user_id: &str) -> qanda::application::auth::Principal {
    qanda::application::auth::Principal {
        user_id: user_id.to_string(),
        user_name: user_id.trim_start_matches("auth0|").to_string(),
    }
}
