use std::time::{Duration, Instant};

/// Tokens are refreshed once they get this close to their expiry.
pub const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Bearer token obtained through a client-credentials exchange, reused
/// until shortly before it expires.
#[derive(Debug, Default)]
pub struct TokenCache {
    token: Option<CachedToken>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached token, unless it is missing or expires within
    /// [`TOKEN_REFRESH_MARGIN`] of `now`.
    pub fn valid_token(&self, now: Instant) -> Option<&str> {
        let token = self.token.as_ref()?;
        match now.checked_add(TOKEN_REFRESH_MARGIN) {
            Some(deadline) if deadline < token.expires_at => Some(token.value.as_str()),
            _ => None,
        }
    }

    pub fn store(&mut self, value: String, expires_in: Duration, now: Instant) {
        let expires_at = now.checked_add(expires_in).unwrap_or(now);
        self.token = Some(CachedToken { value, expires_at });
    }

    pub fn clear(&mut self) {
        self.token = None;
    }
}
