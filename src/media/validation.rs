//! Input checks shared by the guest store, the remote store and the backend.

use std::collections::HashSet;

use super::models::{MediaDraft, MediaKind, MediaUpdate, SeasonDraft, SeasonUpdate};
use super::season_progress::EpisodeProgress;
use crate::error::{TrackerError, TrackerResult};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 10;

pub fn validate_rating(rating: Option<u8>) -> TrackerResult<()> {
    match rating {
        Some(r) if !(MIN_RATING..=MAX_RATING).contains(&r) => Err(TrackerError::validation(
            format!("Rating must be between {} and {}, got {}", MIN_RATING, MAX_RATING, r),
        )),
        _ => Ok(()),
    }
}

pub fn validate_title(title: &str) -> TrackerResult<()> {
    if title.trim().is_empty() {
        return Err(TrackerError::validation("Title cannot be empty"));
    }
    Ok(())
}

fn validate_seasons(seasons: &[SeasonDraft]) -> TrackerResult<()> {
    if seasons.is_empty() {
        return Err(TrackerError::validation(
            "A series needs at least one season",
        ));
    }
    let mut numbers = HashSet::new();
    for season in seasons {
        if season.season_number == 0 {
            return Err(TrackerError::validation("Season numbers start at 1"));
        }
        if !numbers.insert(season.season_number) {
            return Err(TrackerError::validation(format!(
                "Season {} is listed twice",
                season.season_number
            )));
        }
        EpisodeProgress::new(season.episodes_watched, season.total_episodes).map_err(|e| {
            TrackerError::validation(format!("Season {}: {}", season.season_number, e.message()))
        })?;
    }
    Ok(())
}

pub fn validate_draft(draft: &MediaDraft) -> TrackerResult<()> {
    validate_title(&draft.title)?;
    validate_rating(draft.rating)?;
    match draft.kind {
        MediaKind::Series => validate_seasons(&draft.seasons),
        _ if !draft.seasons.is_empty() => Err(TrackerError::validation(format!(
            "Only series can have seasons, not a {}",
            draft.kind
        ))),
        _ => Ok(()),
    }
}

pub fn validate_update(update: &MediaUpdate) -> TrackerResult<()> {
    if let Some(title) = &update.title {
        validate_title(title)?;
    }
    if let Some(rating) = update.rating {
        validate_rating(rating)?;
    }
    Ok(())
}

pub fn validate_season_update(update: &SeasonUpdate) -> TrackerResult<()> {
    if update.total_episodes == Some(0) {
        return Err(TrackerError::validation(
            "A season needs at least one episode",
        ));
    }
    if let Some(rating) = update.rating {
        validate_rating(rating)?;
    }
    Ok(())
}

/// Progress after applying `update` to a season currently at `current`.
///
/// A new total is applied first so an explicit watched count is checked
/// against the resulting size.
pub fn resolve_season_progress(
    current: EpisodeProgress,
    update: &SeasonUpdate,
) -> TrackerResult<EpisodeProgress> {
    validate_season_update(update)?;
    let mut progress = current;
    if let Some(total) = update.total_episodes {
        progress = progress.with_total(total)?;
    }
    if let Some(watched) = update.episodes_watched {
        progress = progress.with_watched(watched)?;
    }
    Ok(progress)
}
