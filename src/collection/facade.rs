use std::sync::Arc;

use tracing::debug;

use super::backend_client::BackendClient;
use super::guest_store::GuestStore;
use super::local_storage::{FileLocalStorage, LocalStorage};
use super::remote_store::RemoteStore;
use super::session::{SessionController, SessionMode};
use super::store::{CollectionStore, StoreCapabilities};
use crate::config::ClientConfig;
use crate::error::{TrackerError, TrackerResult};
use crate::media::{
    CollectionFilter, MediaDraft, MediaEntry, MediaKind, MediaUpdate, Season, SeasonUpdate,
    SeriesProgress,
};

/// One collection contract over the guest and the remote store.
///
/// The session mode is looked up on every call, so signing in or out takes
/// effect on the very next operation.
pub struct Collection {
    session: SessionController,
    guest: Arc<GuestStore>,
    client: Arc<BackendClient>,
}

impl Collection {
    pub fn new(storage: Arc<dyn LocalStorage>, client: Arc<BackendClient>) -> Self {
        let guest = Arc::new(GuestStore::new(storage.clone()));
        let session = SessionController::new(storage, guest.clone(), client.clone());
        Collection {
            session,
            guest,
            client,
        }
    }

    pub fn open(config: &ClientConfig) -> anyhow::Result<Self> {
        let storage = Arc::new(FileLocalStorage::new(config.local_storage_path()));
        let client = Arc::new(BackendClient::new(&config.backend_url)?);
        Ok(Self::new(storage, client))
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    /// Store serving the current session mode.
    pub fn store(&self) -> TrackerResult<Arc<dyn CollectionStore>> {
        match self.session.mode()? {
            SessionMode::Guest => Ok(self.guest.clone()),
            SessionMode::Authenticated(session) => {
                Ok(Arc::new(RemoteStore::new(self.client.clone(), session)))
            }
            SessionMode::SignedOut => Err(TrackerError::auth(
                "Sign in or continue as guest to use the collection",
            )),
        }
    }

    pub fn capabilities(&self) -> TrackerResult<StoreCapabilities> {
        Ok(self.store()?.capabilities())
    }

    pub async fn list(&self, filter: &CollectionFilter) -> TrackerResult<Vec<MediaEntry>> {
        let store = self.store()?;
        debug!("Listing {} entries from {} store", filter, store.capabilities().backend);
        store.list(filter).await
    }

    pub async fn get(&self, id: &str) -> TrackerResult<MediaEntry> {
        self.store()?.get(id).await
    }

    pub async fn create(&self, draft: &MediaDraft) -> TrackerResult<MediaEntry> {
        self.store()?.create(draft).await
    }

    pub async fn update(&self, id: &str, update: &MediaUpdate) -> TrackerResult<MediaEntry> {
        if update.is_empty() {
            return Err(TrackerError::validation("Nothing to update"));
        }
        self.store()?.update(id, update).await
    }

    pub async fn delete(&self, id: &str) -> TrackerResult<()> {
        self.store()?.delete(id).await
    }

    pub async fn increment_episodes(&self, season_id: &str) -> TrackerResult<Season> {
        self.store()?.increment_episodes(season_id).await
    }

    pub async fn decrement_episodes(&self, season_id: &str) -> TrackerResult<Season> {
        self.store()?.decrement_episodes(season_id).await
    }

    pub async fn adjust_episodes(&self, season_id: &str, delta: i32) -> TrackerResult<Season> {
        self.store()?.adjust_episodes(season_id, delta).await
    }

    pub async fn update_season(
        &self,
        season_id: &str,
        update: &SeasonUpdate,
    ) -> TrackerResult<Season> {
        self.store()?.update_season(season_id, update).await
    }

    /// Aggregated season progress of a series entry.
    pub async fn series_progress(&self, id: &str) -> TrackerResult<SeriesProgress> {
        let entry = self.get(id).await?;
        if entry.kind != MediaKind::Series {
            return Err(TrackerError::validation(format!(
                "{} is a {}, not a series",
                entry.title, entry.kind
            )));
        }
        Ok(SeriesProgress::of(&entry.seasons))
    }
}
