pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;

pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

pub fn build_api_router(state: ApiState) -> Router {
    let auth_state = state.clone();

    Router::new()
        .route(
            "/api/questions",
            get(handlers::list_questions).post(handlers::create_question),
        )
        .route(
            "/api/questions/unanswered",
            get(handlers::list_unanswered),
        )
        .route("/api/questions/answer", post(handlers::post_answer))
        .route(
            "/api/questions/{id}",
            get(handlers::get_question)
                .put(handlers::update_question)
                .delete(handlers::delete_question),
        )
        .route(
            "/api/questions/{id}/events",
            get(handlers::question_events),
        )
        .with_state(state)
        .layer(axum_middleware::from_fn_with_state(
            auth_state,
            middleware::api_auth,
        ))
}
