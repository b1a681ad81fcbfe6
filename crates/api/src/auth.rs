//! Request authentication
//!
//! REST calls carry the session token in `Authorization`, either bare or as
//! `Bearer <token>`. Browsers cannot set headers on a socket handshake, so the
//! WebSocket route takes it from the `token` query parameter instead.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use eventsync_core::{Error, UserId};

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller of a request
#[derive(Debug, Clone)]
pub struct Actor(pub UserId);

/// Extract the token from an `Authorization` header value
pub fn bearer_token(value: &str) -> &str {
    let value = value.trim();
    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
        _ => value,
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = match parts.headers.get(AUTHORIZATION) {
            Some(value) => Some(
                value
                    .to_str()
                    .map(bearer_token)
                    .map_err(|_| ApiError::from(Error::Unauthenticated))?,
            ),
            None => None,
        };
        let user = state.engine.authenticate(token)?;
        Ok(Actor(user))
    }
}
