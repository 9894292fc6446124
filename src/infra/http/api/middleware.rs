use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{HeaderValue, Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::application::auth::{AuthError, Principal};

use super::error::ApiError;
use super::state::ApiState;

/// Resolve an optional bearer token into a [`Principal`] request extension.
///
/// Anonymous requests pass through; a token that is present but unknown is
/// rejected outright.
pub async fn api_auth(
    State(state): State<ApiState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(header) = request.headers().get(header::AUTHORIZATION) else {
        return next.run(request).await;
    };

    let Some(token) = extract_token(header) else {
        return ApiError::unauthorized().into_response();
    };

    let principal = match state.identity.authenticate(&token).await {
        Ok(principal) => principal,
        Err(AuthError::Missing) | Err(AuthError::Invalid) | Err(AuthError::NotAuthor { .. }) => {
            return ApiError::unauthorized().into_response();
        }
    };

    request.extensions_mut().insert(principal.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(principal);
    response
}

fn extract_token(header: &HeaderValue) -> Option<String> {
    let raw = header.to_str().ok()?;
    let bearer = raw.strip_prefix("Bearer ")?.trim();
    (!bearer.is_empty()).then(|| bearer.to_string())
}

/// Extractor for handlers that require an authenticated caller.
#[derive(Debug, Clone)]
pub struct RequirePrincipal(pub Principal);

impl<S> FromRequestParts<S> for RequirePrincipal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(RequirePrincipal)
            .ok_or_else(ApiError::unauthorized)
    }
}
