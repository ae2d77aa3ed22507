//! Episode progress of a single season.
//!
//! Both stores run every season mutation through [`EpisodeProgress`], so the
//! guest and the backend can never disagree on clamping or completion.

use serde::{Deserialize, Serialize};

use crate::error::{TrackerError, TrackerResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonProgressState {
    NotStarted,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeProgress {
    watched: u32,
    total: u32,
}

impl EpisodeProgress {
    pub fn new(watched: u32, total: u32) -> TrackerResult<Self> {
        if total == 0 {
            return Err(TrackerError::validation(
                "A season needs at least one episode",
            ));
        }
        if watched > total {
            return Err(TrackerError::validation(format!(
                "Watched episodes ({}) exceed the season total ({})",
                watched, total
            )));
        }
        Ok(EpisodeProgress { watched, total })
    }

    pub fn watched(&self) -> u32 {
        self.watched
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn state(&self) -> SeasonProgressState {
        if self.watched == 0 {
            SeasonProgressState::NotStarted
        } else if self.watched >= self.total {
            SeasonProgressState::Completed
        } else {
            SeasonProgressState::InProgress
        }
    }

    pub fn is_completed(&self) -> bool {
        self.state() == SeasonProgressState::Completed
    }

    /// One more episode watched. A completed season stays as it is.
    pub fn increment(self) -> Self {
        self.adjust(1)
    }

    /// One episode less. A season at zero stays at zero.
    pub fn decrement(self) -> Self {
        self.adjust(-1)
    }

    /// Moves the watched count by `delta`, clamped into `0..=total`.
    pub fn adjust(self, delta: i32) -> Self {
        let watched = (self.watched as i64 + delta as i64).clamp(0, self.total as i64);
        EpisodeProgress {
            watched: watched as u32,
            total: self.total,
        }
    }

    /// Sets the watched count directly. Values above the total are rejected.
    pub fn with_watched(self, watched: u32) -> TrackerResult<Self> {
        EpisodeProgress::new(watched, self.total)
    }

    /// Changes the season size. Lowering it below the watched count pulls
    /// the watched count down with it.
    pub fn with_total(self, total: u32) -> TrackerResult<Self> {
        EpisodeProgress::new(self.watched.min(total), total)
    }
}
