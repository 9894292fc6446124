//! Invalidation coordinator.
//!
//! Called by write paths once storage has acknowledged a mutation. Evicts the
//! question from the cache and fans a notice out to subscribers.

use std::sync::Arc;

use metrics::counter;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::application::loader::AggregationLoader;
use crate::application::notify::{NotificationPublisher, QuestionNotice, question_topic};
use crate::domain::entities::{QuestionAggregate, QuestionId};

use super::events::ChangeKind;
use super::store::QuestionCache;

const METRIC_PUBLISH_FAILED: &str = "qanda_notification_publish_failed_total";
const METRIC_INVALIDATION: &str = "qanda_question_invalidation_total";

pub struct InvalidationCoordinator {
    cache: Option<Arc<QuestionCache>>,
    loader: AggregationLoader,
    publisher: Arc<dyn NotificationPublisher>,
}

impl InvalidationCoordinator {
    /// `cache` is `None` when the question cache is disabled; notices are
    /// still published.
    pub fn new(
        cache: Option<Arc<QuestionCache>>,
        loader: AggregationLoader,
        publisher: Arc<dyn NotificationPublisher>,
    ) -> Self {
        Self {
            cache,
            loader,
            publisher,
        }
    }

    /// Evict `question_id` and notify subscribers.
    ///
    /// Must only be called after the write was committed. Eviction happens
    /// before this returns; the notice snapshot and publish run on a spawned
    /// task so the writer never waits on them. A publish error is logged and
    /// counted inside that task.
    pub fn on_mutated(&self, question_id: QuestionId, change: ChangeKind) -> JoinHandle<()> {
        if let Some(cache) = &self.cache {
            cache.remove(question_id);
        }
        counter!(METRIC_INVALIDATION, "change" => change.as_str()).increment(1);
        debug!(question_id, change = change.as_str(), "Question invalidated");

        let loader = self.loader.clone();
        let publisher = Arc::clone(&self.publisher);
        tokio::spawn(async move {
            let snapshot = if change.question_survives() {
                load_snapshot(&loader, question_id, change).await
            } else {
                None
            };

            let topic = question_topic(question_id);
            let notice = QuestionNotice::new(question_id, change, snapshot);
            if let Err(err) = publisher.publish(&topic, notice).await {
                counter!(METRIC_PUBLISH_FAILED).increment(1);
                warn!(
                    question_id,
                    topic = %topic,
                    change = change.as_str(),
                    error = %err,
                    "Question notice publish failed"
                );
            }
        })
    }

    pub fn cache(&self) -> Option<&Arc<QuestionCache>> {
        self.cache.as_ref()
    }
}

async fn load_snapshot(
    loader: &AggregationLoader,
    question_id: QuestionId,
    change: ChangeKind,
) -> Option<QuestionAggregate> {
    match loader.load(question_id).await {
        Ok(question) => Some(question),
        Err(err) => {
            warn!(
                question_id,
                change = change.as_str(),
                error = %err,
                "Notice snapshot unavailable; publishing without question"
            );
            None
        }
    }
}
