//! Session middleware: turns `Authorization: Bearer <token>` into a [`CurrentUser`].

use crate::{api::AppState, core::identity, errors::Error};
use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};

/// Identity of the caller, inserted into request extensions by [`require_session`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    /// Trusted user id handed to the services
    pub id: String,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Rejects the request with `UNAUTHORIZED` unless it carries a live session token.
pub async fn require_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, Error> {
    let token = bearer_token(&headers).ok_or(Error::Unauthorized)?;
    let user = identity::resolve_session_user(&state.db, token)
        .await?
        .ok_or(Error::Unauthorized)?;

    request.extensions_mut().insert(CurrentUser { id: user.id });
    Ok(next.run(request).await)
}
