//! Collection kept entirely on this machine, for sessions without an account.

use std::sync::{Arc, Mutex};

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use rand_distr::Alphanumeric;
use tracing::debug;

use super::local_storage::LocalStorage;
use super::store::{CollectionStore, StoreBackend, StoreCapabilities};
use crate::error::{TrackerError, TrackerResult};
use crate::media::{
    resolve_season_progress, validate_draft, validate_update, CollectionFilter, EpisodeProgress,
    MediaDraft, MediaEntry, MediaUpdate, OwnerRef, Season, SeasonUpdate,
};

pub const GUEST_DATA_KEY: &str = "media-tracker-guest-data";

/// Server-issued ids are UUIDs, so this prefix never collides with them.
pub const GUEST_ID_PREFIX: &str = "guest-";

const ID_SUFFIX_LENGTH: usize = 8;

pub fn is_guest_id(id: &str) -> bool {
    id.starts_with(GUEST_ID_PREFIX)
}

fn generate_guest_id(now: DateTime<Utc>) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ID_SUFFIX_LENGTH)
        .map(char::from)
        .collect();
    format!(
        "{}{}-{}",
        GUEST_ID_PREFIX,
        now.timestamp_millis(),
        suffix.to_lowercase()
    )
}

/// Guest collection mirrored to local storage on every mutation.
///
/// Entries are kept in an append-only list (creation order) and served
/// newest first. Season progress is tracked exactly like the remote store.
pub struct GuestStore {
    storage: Arc<dyn LocalStorage>,
    entries: Mutex<Option<Vec<MediaEntry>>>,
}

impl GuestStore {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        GuestStore {
            storage,
            entries: Mutex::new(None),
        }
    }

    fn load(&self) -> TrackerResult<Vec<MediaEntry>> {
        let raw = match self.storage.get_item(GUEST_DATA_KEY)? {
            Some(raw) => raw,
            None => return Ok(vec![]),
        };
        let entries: Vec<MediaEntry> =
            serde_json::from_str(&raw).context("Failed to parse guest collection")?;
        debug!("Loaded {} guest entries", entries.len());
        Ok(entries)
    }

    fn persist(&self, entries: &[MediaEntry]) -> TrackerResult<()> {
        let raw = serde_json::to_string(entries).context("Failed to encode guest collection")?;
        self.storage.set_item(GUEST_DATA_KEY, &raw)?;
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&[MediaEntry]) -> TrackerResult<T>) -> TrackerResult<T> {
        let mut cache = self.entries.lock().unwrap();
        if cache.is_none() {
            *cache = Some(self.load()?);
        }
        f(cache.as_deref().unwrap_or_default())
    }

    /// Runs `f` on a working copy which replaces the cached collection only
    /// once it has been written to local storage.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut Vec<MediaEntry>) -> TrackerResult<T>,
    ) -> TrackerResult<T> {
        self.mutate_if_changed(|entries| f(entries).map(|result| (result, true)))
    }

    /// Like [`Self::mutate`], but local storage is left untouched when `f`
    /// reports that nothing changed.
    fn mutate_if_changed<T>(
        &self,
        f: impl FnOnce(&mut Vec<MediaEntry>) -> TrackerResult<(T, bool)>,
    ) -> TrackerResult<T> {
        let mut cache = self.entries.lock().unwrap();
        let mut working = match cache.as_ref() {
            Some(entries) => entries.clone(),
            None => self.load()?,
        };
        let (result, changed) = f(&mut working)?;
        if changed {
            self.persist(&working)?;
            *cache = Some(working);
        } else if cache.is_none() {
            *cache = Some(working);
        }
        Ok(result)
    }

    /// Drops the whole guest collection, in memory and on disk.
    pub fn clear(&self) -> TrackerResult<()> {
        let mut cache = self.entries.lock().unwrap();
        self.storage.remove_item(GUEST_DATA_KEY)?;
        *cache = None;
        debug!("Guest collection cleared");
        Ok(())
    }

    fn adjust_season<F>(&self, season_id: &str, change: F) -> TrackerResult<Season>
    where
        F: FnOnce(EpisodeProgress, &mut Season) -> TrackerResult<EpisodeProgress>,
    {
        self.mutate_if_changed(|entries| {
            let season = entries
                .iter_mut()
                .flat_map(|entry| entry.seasons.iter_mut())
                .find(|season| season.id == season_id)
                .ok_or_else(|| TrackerError::not_found(format!("Season {}", season_id)))?;
            let before = season.clone();
            let current = EpisodeProgress::new(season.episodes_watched, season.total_episodes)?;
            let progress = change(current, season)?;
            season.episodes_watched = progress.watched();
            season.total_episodes = progress.total();
            season.is_completed = progress.is_completed();
            if *season == before {
                return Ok((before, false));
            }
            season.updated_at = Utc::now();
            Ok((season.clone(), true))
        })
    }
}

fn entry_not_found(id: &str) -> TrackerError {
    TrackerError::not_found(format!("Media entry {}", id))
}

#[async_trait]
impl CollectionStore for GuestStore {
    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities {
            backend: StoreBackend::Guest,
            season_progress: true,
        }
    }

    async fn list(&self, filter: &CollectionFilter) -> TrackerResult<Vec<MediaEntry>> {
        self.read(|entries| Ok(filter.apply(entries.iter().rev())))
    }

    async fn get(&self, id: &str) -> TrackerResult<MediaEntry> {
        self.read(|entries| {
            entries
                .iter()
                .find(|e| e.id == id)
                .cloned()
                .ok_or_else(|| entry_not_found(id))
        })
    }

    async fn create(&self, draft: &MediaDraft) -> TrackerResult<MediaEntry> {
        validate_draft(draft)?;
        let now = Utc::now();
        let mut entry = MediaEntry::from_draft(generate_guest_id(now), OwnerRef::Guest, draft, now);

        let mut season_drafts = draft.seasons.clone();
        season_drafts.sort_by_key(|s| s.season_number);
        for season_draft in season_drafts {
            let progress =
                EpisodeProgress::new(season_draft.episodes_watched, season_draft.total_episodes)?;
            entry.seasons.push(Season {
                id: generate_guest_id(now),
                media_id: entry.id.clone(),
                season_number: season_draft.season_number,
                episodes_watched: progress.watched(),
                total_episodes: progress.total(),
                is_completed: progress.is_completed(),
                rating: None,
                created_at: now,
                updated_at: now,
            });
        }

        self.mutate(|entries| {
            entries.push(entry.clone());
            Ok(())
        })?;
        debug!("Created guest entry {} ({})", entry.id, entry.kind);
        Ok(entry)
    }

    async fn update(&self, id: &str, update: &MediaUpdate) -> TrackerResult<MediaEntry> {
        validate_update(update)?;
        self.mutate(|entries| {
            let entry = entries
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or_else(|| entry_not_found(id))?;
            entry.apply_update(update, Utc::now());
            Ok(entry.clone())
        })
    }

    async fn delete(&self, id: &str) -> TrackerResult<()> {
        self.mutate(|entries| {
            let position = entries
                .iter()
                .position(|e| e.id == id)
                .ok_or_else(|| entry_not_found(id))?;
            entries.remove(position);
            Ok(())
        })
    }

    async fn adjust_episodes(&self, season_id: &str, delta: i32) -> TrackerResult<Season> {
        self.adjust_season(season_id, |current, _| Ok(current.adjust(delta)))
    }

    async fn update_season(
        &self,
        season_id: &str,
        update: &SeasonUpdate,
    ) -> TrackerResult<Season> {
        self.adjust_season(season_id, |current, season| {
            let progress = resolve_season_progress(current, update)?;
            if let Some(rating) = update.rating {
                season.rating = rating;
            }
            Ok(progress)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::local_storage::{FileLocalStorage, MemoryLocalStorage};
    use crate::media::{MediaKind, MediaStatus, SeasonDraft};
    use tempfile::TempDir;

    fn memory_store() -> (Arc<MemoryLocalStorage>, GuestStore) {
        let storage = Arc::new(MemoryLocalStorage::new());
        let store = GuestStore::new(storage.clone());
        (storage, store)
    }

    fn series_draft(title: &str, totals: &[u32]) -> MediaDraft {
        let mut draft = MediaDraft::new(MediaKind::Series, title);
        draft.seasons = totals
            .iter()
            .enumerate()
            .map(|(i, total)| SeasonDraft::new(i as u32 + 1, *total))
            .collect();
        draft
    }

    #[test]
    fn guest_ids_are_prefixed_and_unique() {
        let now = Utc::now();
        let a = generate_guest_id(now);
        let b = generate_guest_id(now);
        assert!(is_guest_id(&a));
        assert!(!is_guest_id("6f1c2d3e-0000-4000-8000-000000000000"));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn create_then_get_returns_draft_fields() {
        let (_, store) = memory_store();
        let mut draft = MediaDraft::new(MediaKind::Book, "  Dune ");
        draft.status = MediaStatus::InProgress;
        draft.rating = Some(9);
        draft.genres.insert("Science Fiction".to_string());

        let created = store.create(&draft).await.unwrap();
        let fetched = store.get(&created.id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.title, "Dune");
        assert_eq!(fetched.owner_id, OwnerRef::Guest);
        assert_eq!(fetched.status, MediaStatus::InProgress);
        assert_eq!(fetched.rating, Some(9));
        assert!(fetched.genres.contains("Science Fiction"));
    }

    #[tokio::test]
    async fn invalid_drafts_touch_nothing() {
        let (storage, store) = memory_store();

        let blank = store.create(&MediaDraft::new(MediaKind::Movie, "  ")).await;
        assert!(matches!(blank, Err(TrackerError::Validation(_))));
        let seasonless = store.create(&MediaDraft::new(MediaKind::Series, "Lost")).await;
        assert!(matches!(seasonless, Err(TrackerError::Validation(_))));

        assert_eq!(storage.get_item(GUEST_DATA_KEY).unwrap(), None);
        assert!(store.list(&CollectionFilter::All).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lists_newest_first() {
        let (_, store) = memory_store();
        let first = store.create(&MediaDraft::new(MediaKind::Movie, "First")).await.unwrap();
        let second = store.create(&MediaDraft::new(MediaKind::Movie, "Second")).await.unwrap();
        let third = store.create(&MediaDraft::new(MediaKind::Comic, "Third")).await.unwrap();

        let ids: Vec<String> = store
            .list(&CollectionFilter::All)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![third.id, second.id.clone(), first.id.clone()]);

        let movies = store
            .list(&CollectionFilter::ByKind(MediaKind::Movie))
            .await
            .unwrap();
        assert_eq!(
            movies.into_iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );
    }

    #[tokio::test]
    async fn pending_filter_matches_kind_and_plan_only() {
        let (_, store) = memory_store();
        let planned = store.create(&MediaDraft::new(MediaKind::Movie, "Planned")).await.unwrap();
        let mut done = MediaDraft::new(MediaKind::Movie, "Done");
        done.status = MediaStatus::Completed;
        store.create(&done).await.unwrap();
        store.create(&series_draft("Planned show", &[3])).await.unwrap();

        let pending = store
            .list(&CollectionFilter::PendingByKind(MediaKind::Movie))
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, planned.id);
    }

    #[tokio::test]
    async fn collection_survives_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("local_storage.json");

        let store = GuestStore::new(Arc::new(FileLocalStorage::new(&path)));
        let created = store.create(&series_draft("Dark", &[10, 8])).await.unwrap();
        let season_id = created.seasons[0].id.clone();
        store.adjust_episodes(&season_id, 4).await.unwrap();

        let reloaded = GuestStore::new(Arc::new(FileLocalStorage::new(&path)));
        let entry = reloaded.get(&created.id).await.unwrap();
        assert_eq!(entry.seasons.len(), 2);
        assert_eq!(entry.season(&season_id).unwrap().episodes_watched, 4);
    }

    #[tokio::test]
    async fn update_changes_only_supplied_fields() {
        let (_, store) = memory_store();
        let mut draft = MediaDraft::new(MediaKind::Videogame, "Hades");
        draft.poster_url = Some("https://img/hades.jpg".to_string());
        let created = store.create(&draft).await.unwrap();

        let update = MediaUpdate {
            status: Some(MediaStatus::Completed),
            review: Some(Some("Great loop".to_string())),
            ..Default::default()
        };
        let updated = store.update(&created.id, &update).await.unwrap();
        assert_eq!(updated.status, MediaStatus::Completed);
        assert_eq!(updated.review.as_deref(), Some("Great loop"));
        assert_eq!(updated.poster_url, created.poster_url);
        assert_eq!(updated.title, "Hades");
        assert!(updated.updated_at >= created.updated_at);

        let reviews = store.list(&CollectionFilter::CompletedWithReview).await.unwrap();
        assert_eq!(reviews.len(), 1);

        let bad = MediaUpdate {
            rating: Some(Some(11)),
            ..Default::default()
        };
        assert!(matches!(
            store.update(&created.id, &bad).await,
            Err(TrackerError::Validation(_))
        ));
        assert!(matches!(
            store.update("guest-0-missing", &update).await,
            Err(TrackerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_unknown_is_not_found() {
        let (_, store) = memory_store();
        let created = store.create(&MediaDraft::new(MediaKind::Movie, "Heat")).await.unwrap();

        store.delete(&created.id).await.unwrap();
        assert!(matches!(
            store.delete(&created.id).await,
            Err(TrackerError::NotFound(_))
        ));
        assert!(matches!(
            store.get(&created.id).await,
            Err(TrackerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn season_progress_saturates() {
        let (_, store) = memory_store();
        let created = store.create(&series_draft("Severance", &[10, 6])).await.unwrap();
        let first = created.seasons[0].id.clone();

        for _ in 0..10 {
            store.increment_episodes(&first).await.unwrap();
        }
        let season = store.increment_episodes(&first).await.unwrap();
        assert_eq!(season.episodes_watched, 10);
        assert!(season.is_completed);

        let second = created.seasons[1].id.clone();
        let season = store.decrement_episodes(&second).await.unwrap();
        assert_eq!(season.episodes_watched, 0);
        assert!(!season.is_completed);

        let season = store.adjust_episodes(&second, 100).await.unwrap();
        assert_eq!(season.episodes_watched, 6);
        let season = store.adjust_episodes(&second, -100).await.unwrap();
        assert_eq!(season.episodes_watched, 0);

        assert!(matches!(
            store.adjust_episodes("guest-0-missing", 1).await,
            Err(TrackerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn saturated_adjustments_write_nothing() {
        let (storage, store) = memory_store();
        let created = store.create(&series_draft("Severance", &[2])).await.unwrap();
        let season_id = created.seasons[0].id.clone();
        let finished = store.adjust_episodes(&season_id, 2).await.unwrap();
        let stored = storage.get_item(GUEST_DATA_KEY).unwrap();

        let season = store.increment_episodes(&season_id).await.unwrap();
        assert_eq!(season, finished);
        assert_eq!(storage.get_item(GUEST_DATA_KEY).unwrap(), stored);

        let unchanged = SeasonUpdate {
            total_episodes: Some(2),
            ..Default::default()
        };
        let season = store.update_season(&season_id, &unchanged).await.unwrap();
        assert_eq!(season, finished);
        assert_eq!(storage.get_item(GUEST_DATA_KEY).unwrap(), stored);

        let emptied = store.adjust_episodes(&season_id, -5).await.unwrap();
        let stored = storage.get_item(GUEST_DATA_KEY).unwrap();
        let season = store.decrement_episodes(&season_id).await.unwrap();
        assert_eq!(season, emptied);
        assert_eq!(storage.get_item(GUEST_DATA_KEY).unwrap(), stored);
    }

    #[tokio::test]
    async fn season_update_clamps_and_rates() {
        let (_, store) = memory_store();
        let created = store.create(&series_draft("Fargo", &[10])).await.unwrap();
        let season_id = created.seasons[0].id.clone();
        store.adjust_episodes(&season_id, 8).await.unwrap();

        let update = SeasonUpdate {
            total_episodes: Some(5),
            rating: Some(Some(7)),
            ..Default::default()
        };
        let season = store.update_season(&season_id, &update).await.unwrap();
        assert_eq!(season.total_episodes, 5);
        assert_eq!(season.episodes_watched, 5);
        assert!(season.is_completed);
        assert_eq!(season.rating, Some(7));

        let invalid = SeasonUpdate {
            episodes_watched: Some(6),
            ..Default::default()
        };
        assert!(matches!(
            store.update_season(&season_id, &invalid).await,
            Err(TrackerError::Validation(_))
        ));
        let entry = store.get(&created.id).await.unwrap();
        assert_eq!(entry.seasons[0].episodes_watched, 5);
    }

    #[tokio::test]
    async fn clear_removes_the_storage_key() {
        let (storage, store) = memory_store();
        store.create(&MediaDraft::new(MediaKind::Movie, "Up")).await.unwrap();
        assert!(storage.get_item(GUEST_DATA_KEY).unwrap().is_some());

        store.clear().unwrap();
        assert_eq!(storage.get_item(GUEST_DATA_KEY).unwrap(), None);
        assert!(store.list(&CollectionFilter::All).await.unwrap().is_empty());
    }
}
