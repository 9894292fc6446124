//! Question and answer handlers

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use qanda_api_types::{
    AnswerCreateRequest, QuestionCreateRequest, QuestionListQuery, QuestionUpdateRequest,
};

use crate::domain::entities::QuestionId;

use super::question_to_api;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::middleware::RequirePrincipal;
use crate::infra::http::api::state::ApiState;

pub async fn list_questions(
    State(state): State<ApiState>,
    Query(query): Query<QuestionListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let questions = state
        .questions
        .list_questions(&query)
        .await
        .map_err(question_to_api)?;

    Ok(Json(questions))
}

pub async fn list_unanswered(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let questions = state
        .questions
        .list_unanswered()
        .await
        .map_err(question_to_api)?;

    Ok(Json(questions))
}

pub async fn get_question(
    State(state): State<ApiState>,
    Path(id): Path<QuestionId>,
) -> Result<impl IntoResponse, ApiError> {
    let question = state
        .questions
        .get_question(id)
        .await
        .map_err(question_to_api)?;

    Ok(Json(question))
}

pub async fn create_question(
    State(state): State<ApiState>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(payload): Json<QuestionCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let question = state
        .questions
        .create_question(&principal, payload)
        .await
        .map_err(question_to_api)?;

    let location = format!("/api/questions/{}", question.question_id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(question),
    ))
}

pub async fn update_question(
    State(state): State<ApiState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<QuestionId>,
    Json(payload): Json<QuestionUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let question = state
        .questions
        .update_question(&principal, id, payload)
        .await
        .map_err(question_to_api)?;

    Ok(Json(question))
}

pub async fn delete_question(
    State(state): State<ApiState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<QuestionId>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .questions
        .delete_question(&principal, id)
        .await
        .map_err(question_to_api)?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn post_answer(
    State(state): State<ApiState>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(payload): Json<AnswerCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let answer = state
        .questions
        .post_answer(&principal, payload)
        .await
        .map_err(question_to_api)?;

    Ok((StatusCode::CREATED, Json(answer)))
}
