//! Server-sent change notices for one question.

use std::convert::Infallible;

use async_stream::stream;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::application::notify::question_topic;
use crate::domain::entities::QuestionId;

use super::question_to_api;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::state::ApiState;

const NOTICE_EVENT: &str = "question";
const LAGGED_EVENT: &str = "lagged";

pub async fn question_events(
    State(state): State<ApiState>,
    Path(id): Path<QuestionId>,
) -> Result<impl IntoResponse, ApiError> {
    let topic = question_topic(id);
    // Subscribe before the existence check so no notice slips in between.
    // The subscription owns the topic: a 404 or a client disconnect drops it.
    let mut subscription = state.hub.subscribe(&topic);
    state
        .questions
        .get_question(id)
        .await
        .map_err(question_to_api)?;

    let stream = stream! {
        loop {
            match subscription.recv().await {
                Ok(payload) => {
                    yield Ok::<Event, Infallible>(Event::default().event(NOTICE_EVENT).data(&*payload));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(topic = %topic, skipped, "Subscriber lagged; notices dropped");
                    yield Ok(Event::default().event(LAGGED_EVENT).data(skipped.to_string()));
                }
                Err(RecvError::Closed) => {
                    debug!(topic = %topic, "Topic closed");
                    break;
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
