//! In-process topic hub behind the SSE endpoint.
//!
//! Each topic owns a `broadcast` channel created on first subscription and
//! removed once its last [`Subscription`] is dropped. Notices are encoded
//! once per publish and shared between receivers.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tracing::trace;

use crate::application::notify::{NotificationPublisher, PublishError, QuestionNotice};

const DEFAULT_TOPIC_BUFFER: usize = 64;

type Topics = DashMap<String, broadcast::Sender<Arc<str>>>;

#[derive(Debug)]
pub struct QuestionHub {
    topics: Arc<Topics>,
    buffer: usize,
}

impl QuestionHub {
    pub fn new(buffer: usize) -> Self {
        Self {
            topics: Arc::new(DashMap::new()),
            buffer: buffer.max(1),
        }
    }

    /// Receive every notice published to `topic` from now on.
    pub fn subscribe(&self, topic: &str) -> Subscription {
        let receiver = self
            .topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.buffer).0)
            .subscribe();

        Subscription {
            topic: topic.to_string(),
            receiver: Some(receiver),
            topics: Arc::clone(&self.topics),
        }
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .get(topic)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}

impl Default for QuestionHub {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC_BUFFER)
    }
}

#[async_trait]
impl NotificationPublisher for QuestionHub {
    async fn publish(&self, topic: &str, notice: QuestionNotice) -> Result<(), PublishError> {
        let payload: Arc<str> = serde_json::to_string(&notice)
            .map_err(|err| PublishError::Encode {
                topic: topic.to_string(),
                message: err.to_string(),
            })?
            .into();

        let delivered = match self.topics.get(topic) {
            Some(sender) => sender.send(payload).unwrap_or(0),
            None => 0,
        };
        trace!(topic, delivered, "Question notice published");
        Ok(())
    }
}

/// A live subscription to one topic. Dropping the last subscription of a
/// topic removes the topic from the hub.
#[derive(Debug)]
pub struct Subscription {
    topic: String,
    // Always `Some` until drop.
    receiver: Option<broadcast::Receiver<Arc<str>>>,
    topics: Arc<Topics>,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub async fn recv(&mut self) -> Result<Arc<str>, RecvError> {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.recv().await,
            None => Err(RecvError::Closed),
        }
    }

    pub fn try_recv(&mut self) -> Result<Arc<str>, TryRecvError> {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.try_recv(),
            None => Err(TryRecvError::Closed),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        drop(self.receiver.take());
        // `subscribe` goes through the same map shard, so no receiver can be
        // added between the count check and the removal.
        let removed = self
            .topics
            .remove_if(&self.topic, |_, sender| sender.receiver_count() == 0)
            .is_some();
        if removed {
            trace!(topic = %self.topic, "Last subscriber left; topic removed");
        }
    }
}
