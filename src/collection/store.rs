use async_trait::async_trait;
use serde::Serialize;

use crate::error::TrackerResult;
use crate::media::{CollectionFilter, MediaDraft, MediaEntry, MediaUpdate, Season, SeasonUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Guest,
    Remote,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Guest => write!(f, "guest"),
            StoreBackend::Remote => write!(f, "remote"),
        }
    }
}

/// What a store can do, checked by callers before offering an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreCapabilities {
    pub backend: StoreBackend,
    pub season_progress: bool,
}

/// The collection contract shared by the guest and the remote store.
///
/// Both implementations list newest first, report unknown ids as
/// `NotFound` (delete included) and validate input before writing anything.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    fn capabilities(&self) -> StoreCapabilities;

    async fn list(&self, filter: &CollectionFilter) -> TrackerResult<Vec<MediaEntry>>;

    async fn get(&self, id: &str) -> TrackerResult<MediaEntry>;

    async fn create(&self, draft: &MediaDraft) -> TrackerResult<MediaEntry>;

    async fn update(&self, id: &str, update: &MediaUpdate) -> TrackerResult<MediaEntry>;

    async fn delete(&self, id: &str) -> TrackerResult<()>;

    /// Moves the watched count by `delta` in a single operation, clamped to
    /// `[0, total_episodes]`.
    async fn adjust_episodes(&self, season_id: &str, delta: i32) -> TrackerResult<Season>;

    async fn update_season(&self, season_id: &str, update: &SeasonUpdate)
        -> TrackerResult<Season>;

    /// Saturating: a completed season is returned unchanged.
    async fn increment_episodes(&self, season_id: &str) -> TrackerResult<Season> {
        self.adjust_episodes(season_id, 1).await
    }

    /// Saturating at zero watched episodes.
    async fn decrement_episodes(&self, season_id: &str) -> TrackerResult<Season> {
        self.adjust_episodes(season_id, -1).await
    }
}
