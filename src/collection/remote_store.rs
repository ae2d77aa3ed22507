use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::backend_client::BackendClient;
use super::session::AuthSession;
use super::store::{CollectionStore, StoreBackend, StoreCapabilities};
use crate::error::TrackerResult;
use crate::media::{
    validate_draft, validate_season_update, validate_update, CollectionFilter, MediaDraft,
    MediaEntry, MediaUpdate, Season, SeasonUpdate,
};

/// Collection of an authenticated account, stored on the backend.
///
/// Input is validated before any request goes out. Ownership is enforced by
/// the backend, which scopes every row to the account behind the token.
pub struct RemoteStore {
    client: Arc<BackendClient>,
    session: AuthSession,
}

impl RemoteStore {
    pub fn new(client: Arc<BackendClient>, session: AuthSession) -> Self {
        RemoteStore { client, session }
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    fn token(&self) -> &str {
        &self.session.token
    }
}

#[async_trait]
impl CollectionStore for RemoteStore {
    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities {
            backend: StoreBackend::Remote,
            season_progress: true,
        }
    }

    async fn list(&self, filter: &CollectionFilter) -> TrackerResult<Vec<MediaEntry>> {
        self.client.list_entries(self.token(), filter).await
    }

    async fn get(&self, id: &str) -> TrackerResult<MediaEntry> {
        self.client.get_entry(self.token(), id).await
    }

    async fn create(&self, draft: &MediaDraft) -> TrackerResult<MediaEntry> {
        validate_draft(draft)?;
        let entry = self.client.create_entry(self.token(), draft).await?;
        debug!(
            "Created remote entry {} with {} seasons",
            entry.id,
            entry.seasons.len()
        );
        Ok(entry)
    }

    async fn update(&self, id: &str, update: &MediaUpdate) -> TrackerResult<MediaEntry> {
        validate_update(update)?;
        self.client.update_entry(self.token(), id, update).await
    }

    async fn delete(&self, id: &str) -> TrackerResult<()> {
        self.client.delete_entry(self.token(), id).await
    }

    async fn adjust_episodes(&self, season_id: &str, delta: i32) -> TrackerResult<Season> {
        self.client.adjust_season(self.token(), season_id, delta).await
    }

    async fn update_season(
        &self,
        season_id: &str,
        update: &SeasonUpdate,
    ) -> TrackerResult<Season> {
        validate_season_update(update)?;
        self.client.update_season(self.token(), season_id, update).await
    }
}
