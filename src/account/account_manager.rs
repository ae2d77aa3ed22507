use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, info};

use super::auth::{Account, AuthToken, AuthTokenValue, HashedPassword};
use super::AccountStore;
use crate::error::{TrackerError, TrackerResult};

pub const MIN_PASSWORD_LENGTH: usize = 6;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Registration, sign in and session resolution on top of an [`AccountStore`].
pub struct AccountManager {
    store: Arc<dyn AccountStore>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl AccountManager {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        AccountManager { store }
    }

    pub fn register(
        &self,
        email: &str,
        password: &str,
        username: Option<&str>,
    ) -> TrackerResult<i64> {
        let email = normalize_email(email);
        if !email.contains('@') {
            return Err(TrackerError::validation("A valid email address is required"));
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(TrackerError::validation(format!(
                "The password must be at least {} characters long",
                MIN_PASSWORD_LENGTH
            )));
        }
        if self.store.find_account_id(&email)?.is_some() {
            return Err(TrackerError::validation(
                "An account with this email already exists",
            ));
        }

        let username = username.map(str::trim).filter(|u| !u.is_empty());
        let hashed = HashedPassword::create(password)?;
        let account_id = self.store.create_account(&email, username, &hashed)?;
        info!("Registered account {} ({})", account_id, email);
        Ok(account_id)
    }

    /// Checks the credentials and opens a new session.
    pub fn login(&self, email: &str, password: &str) -> TrackerResult<(AuthToken, Account)> {
        let email = normalize_email(email);
        let account_id = self
            .store
            .find_account_id(&email)?
            .ok_or_else(|| TrackerError::auth(INVALID_CREDENTIALS))?;
        let credentials = self
            .store
            .get_password_credentials(account_id)?
            .ok_or_else(|| TrackerError::auth(INVALID_CREDENTIALS))?;
        if !credentials.password.matches(password)? {
            debug!("Wrong password for account {}", account_id);
            return Err(TrackerError::auth(INVALID_CREDENTIALS));
        }
        self.store.touch_password_credentials(account_id)?;

        let token = AuthToken {
            account_id,
            value: AuthTokenValue::generate(),
            created: SystemTime::now(),
            last_used: None,
        };
        self.store.add_auth_token(&token)?;
        let account = self.get_account(account_id)?;
        Ok((token, account))
    }

    /// Invalidates a session token. Unknown tokens are reported as `NotFound`.
    pub fn logout(&self, value: &AuthTokenValue) -> TrackerResult<()> {
        match self.store.delete_auth_token(value)? {
            Some(token) => {
                debug!("Closed session of account {}", token.account_id);
                Ok(())
            }
            None => Err(TrackerError::not_found("session")),
        }
    }

    /// Resolves a token to its session, refreshing its last used timestamp.
    pub fn authenticate(&self, value: &AuthTokenValue) -> TrackerResult<AuthToken> {
        let token = self
            .store
            .get_auth_token(value)?
            .ok_or_else(|| TrackerError::auth("Invalid or expired session"))?;
        self.store.touch_auth_token(value)?;
        Ok(token)
    }

    pub fn get_account(&self, account_id: i64) -> TrackerResult<Account> {
        self.store
            .get_account(account_id)?
            .ok_or_else(|| TrackerError::not_found(format!("account {}", account_id)))
    }
}
