use std::sync::Arc;
use std::time::Instant;

use axum::extract::FromRef;

use super::ServerConfig;
use crate::account::AccountManager;
use crate::backend_store::MediaStore;

pub type GuardedAccountManager = Arc<AccountManager>;
pub type GuardedMediaStore = Arc<dyn MediaStore>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub account_manager: GuardedAccountManager,
    pub media_store: GuardedMediaStore,
}

impl FromRef<ServerState> for GuardedAccountManager {
    fn from_ref(input: &ServerState) -> Self {
        input.account_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedMediaStore {
    fn from_ref(input: &ServerState) -> Self {
        input.media_store.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
