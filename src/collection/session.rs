//! Which collection the client is working on: none, the guest one, or an account's.

use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::backend_client::BackendClient;
use super::guest_store::GuestStore;
use super::local_storage::LocalStorage;
use crate::error::{TrackerError, TrackerResult};
use crate::server::{LoginSuccessResponse, SessionView};

pub const GUEST_MODE_KEY: &str = "media-tracker-guest-mode";
pub const AUTH_SESSION_KEY: &str = "media-tracker-auth-session";

/// Backend session persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub account_id: i64,
    pub email: String,
    #[serde(default)]
    pub username: Option<String>,
}

impl From<LoginSuccessResponse> for AuthSession {
    fn from(login: LoginSuccessResponse) -> Self {
        AuthSession {
            token: login.token,
            account_id: login.account_id,
            email: login.email,
            username: login.username,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMode {
    SignedOut,
    Guest,
    Authenticated(AuthSession),
}

impl SessionMode {
    pub fn name(&self) -> &'static str {
        match self {
            SessionMode::SignedOut => "signed out",
            SessionMode::Guest => "guest",
            SessionMode::Authenticated(_) => "authenticated",
        }
    }
}

pub struct SessionController {
    storage: Arc<dyn LocalStorage>,
    guest_store: Arc<GuestStore>,
    client: Arc<BackendClient>,
}

impl SessionController {
    pub fn new(
        storage: Arc<dyn LocalStorage>,
        guest_store: Arc<GuestStore>,
        client: Arc<BackendClient>,
    ) -> Self {
        SessionController {
            storage,
            guest_store,
            client,
        }
    }

    /// Current mode, read from local storage on every call.
    pub fn mode(&self) -> TrackerResult<SessionMode> {
        if let Some(raw) = self.storage.get_item(AUTH_SESSION_KEY)? {
            match serde_json::from_str::<AuthSession>(&raw) {
                Ok(session) => return Ok(SessionMode::Authenticated(session)),
                Err(err) => warn!("Ignoring unreadable persisted session: {}", err),
            }
        }
        let guest = self.storage.get_item(GUEST_MODE_KEY)?;
        if guest.as_deref() == Some("true") {
            Ok(SessionMode::Guest)
        } else {
            Ok(SessionMode::SignedOut)
        }
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        username: Option<&str>,
    ) -> TrackerResult<i64> {
        let response = self.client.register(email, password, username).await?;
        info!("Registered account {}", response.account_id);
        Ok(response.account_id)
    }

    /// Signs in and switches to the account's collection. Any guest
    /// collection is discarded, it is never migrated to the account.
    pub async fn sign_in(&self, email: &str, password: &str) -> TrackerResult<AuthSession> {
        let session = AuthSession::from(self.client.login(email, password).await?);
        let raw = serde_json::to_string(&session).context("Failed to encode session")?;
        self.storage.set_item(AUTH_SESSION_KEY, &raw)?;
        self.storage.set_item(GUEST_MODE_KEY, "false")?;
        self.guest_store.clear()?;
        info!("Signed in as account {}", session.account_id);
        Ok(session)
    }

    /// Forgets the persisted session. Invalidating the token on the backend
    /// is best effort.
    pub async fn sign_out(&self) -> TrackerResult<()> {
        let session = match self.mode()? {
            SessionMode::Authenticated(session) => session,
            _ => return Err(TrackerError::auth("Not signed in")),
        };
        if let Err(err) = self.client.logout(&session.token).await {
            warn!("Could not invalidate the session on the backend: {}", err);
        }
        self.storage.remove_item(AUTH_SESSION_KEY)?;
        info!("Signed out account {}", session.account_id);
        Ok(())
    }

    pub fn enter_guest_mode(&self) -> TrackerResult<()> {
        if let SessionMode::Authenticated(_) = self.mode()? {
            return Err(TrackerError::validation(
                "Sign out before continuing as guest",
            ));
        }
        self.storage.set_item(GUEST_MODE_KEY, "true")?;
        Ok(())
    }

    /// Leaves guest mode, discarding the guest collection.
    pub fn leave_guest_mode(&self) -> TrackerResult<()> {
        if self.mode()? != SessionMode::Guest {
            return Err(TrackerError::validation("Not in guest mode"));
        }
        self.storage.set_item(GUEST_MODE_KEY, "false")?;
        self.guest_store.clear()?;
        Ok(())
    }

    /// Account behind the persisted session, as the backend sees it.
    pub async fn verify(&self) -> TrackerResult<SessionView> {
        match self.mode()? {
            SessionMode::Authenticated(session) => self.client.session(&session.token).await,
            _ => Err(TrackerError::auth("Not signed in")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::guest_store::GUEST_DATA_KEY;
    use crate::collection::local_storage::MemoryLocalStorage;
    use crate::collection::CollectionStore;
    use crate::media::{MediaDraft, MediaKind};

    fn controller() -> (Arc<MemoryLocalStorage>, Arc<GuestStore>, SessionController) {
        let storage = Arc::new(MemoryLocalStorage::new());
        let guest = Arc::new(GuestStore::new(storage.clone()));
        let client = Arc::new(BackendClient::new("http://127.0.0.1:9").unwrap());
        let controller = SessionController::new(storage.clone(), guest.clone(), client);
        (storage, guest, controller)
    }

    fn persisted_session() -> AuthSession {
        AuthSession {
            token: "abc".to_string(),
            account_id: 7,
            email: "me@example.com".to_string(),
            username: Some("me".to_string()),
        }
    }

    #[test]
    fn starts_signed_out() {
        let (_, _, controller) = controller();
        assert_eq!(controller.mode().unwrap(), SessionMode::SignedOut);
    }

    #[tokio::test]
    async fn guest_mode_round_trip_discards_collection() {
        let (storage, guest, controller) = controller();
        controller.enter_guest_mode().unwrap();
        assert_eq!(controller.mode().unwrap(), SessionMode::Guest);
        assert_eq!(storage.get_item(GUEST_MODE_KEY).unwrap().as_deref(), Some("true"));

        guest
            .create(&MediaDraft::new(MediaKind::Movie, "Arrival"))
            .await
            .unwrap();
        assert!(storage.get_item(GUEST_DATA_KEY).unwrap().is_some());

        controller.leave_guest_mode().unwrap();
        assert_eq!(controller.mode().unwrap(), SessionMode::SignedOut);
        assert_eq!(storage.get_item(GUEST_DATA_KEY).unwrap(), None);
        assert!(controller.leave_guest_mode().is_err());
    }

    #[test]
    fn mode_is_read_fresh_from_storage() {
        let (storage, _, controller) = controller();
        let raw = serde_json::to_string(&persisted_session()).unwrap();
        storage.set_item(AUTH_SESSION_KEY, &raw).unwrap();
        assert_eq!(
            controller.mode().unwrap(),
            SessionMode::Authenticated(persisted_session())
        );

        storage.remove_item(AUTH_SESSION_KEY).unwrap();
        assert_eq!(controller.mode().unwrap(), SessionMode::SignedOut);
    }

    #[test]
    fn unreadable_session_counts_as_signed_out() {
        let (storage, _, controller) = controller();
        storage.set_item(AUTH_SESSION_KEY, "{garbage").unwrap();
        assert_eq!(controller.mode().unwrap(), SessionMode::SignedOut);
    }

    #[test]
    fn guest_mode_requires_signing_out_first() {
        let (storage, _, controller) = controller();
        let raw = serde_json::to_string(&persisted_session()).unwrap();
        storage.set_item(AUTH_SESSION_KEY, &raw).unwrap();
        assert!(matches!(
            controller.enter_guest_mode(),
            Err(TrackerError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn sign_out_forgets_session_even_if_backend_is_down() {
        let (storage, _, controller) = controller();
        let raw = serde_json::to_string(&persisted_session()).unwrap();
        storage.set_item(AUTH_SESSION_KEY, &raw).unwrap();

        controller.sign_out().await.unwrap();
        assert_eq!(storage.get_item(AUTH_SESSION_KEY).unwrap(), None);
        assert!(matches!(
            controller.sign_out().await,
            Err(TrackerError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn failed_sign_in_leaves_guest_state_alone() {
        let (storage, guest, controller) = controller();
        controller.enter_guest_mode().unwrap();
        guest
            .create(&MediaDraft::new(MediaKind::Book, "Emma"))
            .await
            .unwrap();

        assert!(controller.sign_in("me@example.com", "secret").await.is_err());
        assert_eq!(controller.mode().unwrap(), SessionMode::Guest);
        assert!(storage.get_item(GUEST_DATA_KEY).unwrap().is_some());
    }
}
