use crate::error::TrackerResult;
use crate::media::{CollectionFilter, MediaDraft, MediaEntry, MediaUpdate, Season, SeasonUpdate};

/// Owner-scoped persistence of media entries and their seasons.
///
/// Every operation takes the id of the account acting on the data; rows
/// belonging to anybody else behave exactly like rows that do not exist.
pub trait MediaStore: Send + Sync {
    /// Entries matching `filter`, newest first.
    fn list_entries(&self, owner_id: i64, filter: &CollectionFilter) -> TrackerResult<Vec<MediaEntry>>;

    fn get_entry(&self, owner_id: i64, entry_id: &str) -> TrackerResult<MediaEntry>;

    /// Inserts the entry and all of its seasons, or nothing at all.
    fn create_entry(&self, owner_id: i64, draft: &MediaDraft) -> TrackerResult<MediaEntry>;

    fn update_entry(
        &self,
        owner_id: i64,
        entry_id: &str,
        update: &MediaUpdate,
    ) -> TrackerResult<MediaEntry>;

    /// Removes the entry and its seasons.
    fn delete_entry(&self, owner_id: i64, entry_id: &str) -> TrackerResult<()>;

    /// Moves the watched count of a season by `delta`, clamped to the season size.
    fn adjust_season_episodes(&self, owner_id: i64, season_id: &str, delta: i32)
        -> TrackerResult<Season>;

    fn update_season(
        &self,
        owner_id: i64,
        season_id: &str,
        update: &SeasonUpdate,
    ) -> TrackerResult<Season>;
}
