use super::auth::{Account, AuthToken, AuthTokenValue, HashedPassword, PasswordCredentials};
use anyhow::Result;

pub trait AccountAuthTokenStore: Send + Sync {
    /// Returns the token with the given value.
    /// Returns Ok(None) if the token does not exist.
    fn get_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>>;

    /// Adds a new auth token.
    fn add_auth_token(&self, token: &AuthToken) -> Result<()>;

    /// Deletes an auth token, returning it.
    /// Returns Ok(None) if the token does not exist.
    fn delete_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>>;

    /// Updates the last used timestamp of a token.
    fn touch_auth_token(&self, value: &AuthTokenValue) -> Result<()>;
}

pub trait AccountCredentialsStore: Send + Sync {
    /// Returns the password credentials of an account.
    /// Returns Ok(None) if the account does not exist.
    fn get_password_credentials(&self, account_id: i64) -> Result<Option<PasswordCredentials>>;

    /// Records a successful sign in with the password.
    fn touch_password_credentials(&self, account_id: i64) -> Result<()>;
}

pub trait AccountStore: AccountAuthTokenStore + AccountCredentialsStore + Send + Sync {
    /// Creates an account together with its password credentials and
    /// returns the new account id. Fails if the email is already taken.
    fn create_account(
        &self,
        email: &str,
        username: Option<&str>,
        password: &HashedPassword,
    ) -> Result<i64>;

    /// Returns Ok(None) if the account does not exist.
    fn get_account(&self, account_id: i64) -> Result<Option<Account>>;

    /// Returns Ok(None) if no account has this email.
    fn find_account_id(&self, email: &str) -> Result<Option<i64>>;
}
