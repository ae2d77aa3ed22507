pub mod auth;
mod account_manager;
mod account_store;

pub use account_manager::{AccountManager, MIN_PASSWORD_LENGTH};
pub use account_store::{AccountAuthTokenStore, AccountCredentialsStore, AccountStore};
pub use auth::{Account, AuthToken, AuthTokenValue, HashedPassword, PasswordCredentials};
