//! API handlers organized by resource type.
//!
//! Error conversion helpers are defined here and shared across modules.

mod events;
mod questions;

pub use events::*;
pub use questions::*;

use axum::http::StatusCode;

use crate::application::auth::AuthError;
use crate::application::questions::QuestionError;
use crate::application::repos::RepoError;

use super::error::{ApiError, codes};

pub(crate) fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::NotFound => ApiError::not_found("resource not found"),
        RepoError::InvalidInput { message } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid input",
            Some(message),
        ),
        RepoError::Integrity { message } => ApiError::new(
            StatusCode::CONFLICT,
            codes::INTEGRITY,
            "Integrity constraint violated",
            Some(message),
        ),
        RepoError::Timeout => ApiError::unavailable(codes::DB_TIMEOUT).with_detail("database timeout"),
        RepoError::Persistence(message) => {
            ApiError::unavailable(codes::STORAGE_UNAVAILABLE).with_detail(message)
        }
    }
}

pub(crate) fn question_to_api(err: QuestionError) -> ApiError {
    match err {
        QuestionError::NotFound => ApiError::not_found("question not found"),
        QuestionError::Validation(err) => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid question",
            Some(err.to_string()),
        ),
        QuestionError::Auth(AuthError::NotAuthor { .. }) => {
            ApiError::forbidden("Only the author may change this question")
        }
        QuestionError::Auth(AuthError::Missing | AuthError::Invalid) => ApiError::unauthorized(),
        QuestionError::StorageUnavailable(message) => {
            ApiError::unavailable(codes::STORAGE_UNAVAILABLE).with_detail(message)
        }
        QuestionError::Repo(repo) => repo_to_api(repo),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::DomainError;

    #[test]
    fn storage_failures_are_service_unavailable() {
        let err = question_to_api(QuestionError::StorageUnavailable("timed out".to_string()));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);

        let err = question_to_api(QuestionError::Repo(RepoError::Persistence(
            "connection reset".to_string(),
        )));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code(), codes::STORAGE_UNAVAILABLE);
    }

    #[test]
    fn authorization_failures_map_to_401_and_403() {
        let err = question_to_api(QuestionError::Auth(AuthError::NotAuthor { question_id: 3 }));
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let err = question_to_api(QuestionError::Auth(AuthError::Invalid));
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn validation_failures_are_bad_requests() {
        let err = question_to_api(QuestionError::Validation(DomainError::blank("title")));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), codes::INVALID_INPUT);
    }
}
