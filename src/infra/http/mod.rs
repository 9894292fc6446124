pub mod api;
mod middleware;

pub use api::{ApiState, build_api_router};

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware as axum_middleware,
    routing::get,
};

use crate::application::error::AppError;
use crate::infra::error::InfraError;

use middleware::{log_responses, set_request_context};

/// Full application router: the question API plus the health probe.
pub fn build_router(state: ApiState) -> Router {
    let health = Router::new()
        .route("/health", get(health))
        .with_state(state.clone());

    health
        .merge(build_api_router(state))
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn health(State(state): State<ApiState>) -> Result<StatusCode, AppError> {
    state
        .health
        .ping()
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
    Ok(StatusCode::NO_CONTENT)
}
