use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use super::state::ServerState;
use crate::account::AuthTokenValue;
use crate::error::TrackerError;

pub const COOKIE_SESSION_TOKEN_KEY: &str = "session_token";
pub const HEADER_SESSION_TOKEN_KEY: &str = "Authorization";

/// The authenticated account behind a request.
#[derive(Debug)]
pub struct Session {
    pub account_id: i64,
    pub token: String,
}

async fn extract_session_token_from_cookies(
    parts: &mut Parts,
    ctx: &ServerState,
) -> Option<String> {
    let jar = match CookieJar::from_request_parts(parts, ctx).await {
        Ok(jar) => jar,
        Err(never) => match never {},
    };
    jar.get(COOKIE_SESSION_TOKEN_KEY)
        .map(|cookie| cookie.value().to_string())
}

/// Accepts both a bare token and the `Bearer <token>` form.
fn extract_session_token_from_headers(parts: &Parts) -> Option<String> {
    let raw = parts.headers.get(HEADER_SESSION_TOKEN_KEY)?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
    (!token.is_empty()).then(|| token.to_string())
}

async fn extract_session_from_request_parts(
    parts: &mut Parts,
    ctx: &ServerState,
) -> Result<Session, TrackerError> {
    let token = match extract_session_token_from_cookies(parts, ctx)
        .await
        .or_else(|| extract_session_token_from_headers(parts))
    {
        Some(token) => token,
        None => {
            debug!("No token in cookies nor headers.");
            return Err(TrackerError::auth("Sign in to access your collection"));
        }
    };

    let auth_token = ctx
        .account_manager
        .authenticate(&AuthTokenValue(token))?;
    debug!("Resolved session of account {}", auth_token.account_id);
    Ok(Session {
        account_id: auth_token.account_id,
        token: auth_token.value.0,
    })
}

impl FromRequestParts<ServerState> for Session {
    type Rejection = TrackerError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        extract_session_from_request_parts(parts, ctx).await
    }
}
