//! Request extractor for the authenticated user.
use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use gamenight_common::UserId;

use crate::error::AppError;
use crate::storage::Storage;
use crate::AppState;

/// The caller, resolved from an `Authorization: Bearer <token>` header
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
    pub token: String,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl<S> FromRequestParts<Arc<AppState<S>>> for AuthUser
where
    S: Storage + Clone + 'static,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Auth("Missing bearer token".to_string()))?;
        let session = state
            .sessions
            .get(token)
            .await
            .ok_or_else(|| AppError::Auth("Invalid or expired token".to_string()))?;

        Ok(AuthUser {
            user_id: session.user_id,
            token: token.to_string(),
        })
    }
}
