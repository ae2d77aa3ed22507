mod filter;
mod models;
mod season_progress;
mod validation;

pub use filter::{CollectionFilter, FilterName, FilterQuery};
pub use models::{
    ExternalRef, MediaDraft, MediaEntry, MediaKind, MediaStatus, MediaUpdate, MetadataSource,
    OwnerRef, Season, SeasonDraft, SeasonUpdate, GUEST_OWNER,
};
pub use season_progress::{EpisodeProgress, SeasonProgressState};
pub use validation::{
    resolve_season_progress, validate_draft, validate_rating, validate_season_update,
    validate_title, validate_update, MAX_RATING, MIN_RATING,
};

use serde::{Deserialize, Serialize};

/// Aggregated progress of a series across all of its seasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesProgress {
    pub total_seasons: u32,
    pub completed_seasons: u32,
    pub episodes_watched: u64,
    pub total_episodes: u64,
    pub percentage: u8,
}

impl SeriesProgress {
    pub fn of(seasons: &[Season]) -> Self {
        let total_seasons = seasons.len() as u32;
        let completed_seasons = seasons.iter().filter(|s| s.is_completed).count() as u32;
        let episodes_watched: u64 = seasons.iter().map(|s| u64::from(s.episodes_watched)).sum();
        let total_episodes: u64 = seasons.iter().map(|s| u64::from(s.total_episodes)).sum();
        let percentage = if total_episodes == 0 {
            0
        } else {
            ((episodes_watched as f64 / total_episodes as f64) * 100.0).round() as u8
        };
        SeriesProgress {
            total_seasons,
            completed_seasons,
            episodes_watched,
            total_episodes,
            percentage,
        }
    }
}
