use std::fmt;

use serde::{Deserialize, Serialize};

use super::models::{MediaEntry, MediaKind, MediaStatus};
use crate::error::{TrackerError, TrackerResult};

/// Read-only projections over a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectionFilter {
    #[default]
    All,
    ByKind(MediaKind),
    /// Completed entries carrying a non-blank review.
    CompletedWithReview,
    /// Entries of a kind still in the `plan` status.
    PendingByKind(MediaKind),
}

impl CollectionFilter {
    pub fn matches(&self, entry: &MediaEntry) -> bool {
        match self {
            CollectionFilter::All => true,
            CollectionFilter::ByKind(kind) => entry.kind == *kind,
            CollectionFilter::CompletedWithReview => {
                entry.status == MediaStatus::Completed && entry.has_review()
            }
            CollectionFilter::PendingByKind(kind) => {
                entry.kind == *kind && entry.status == MediaStatus::Plan
            }
        }
    }

    pub fn apply<'a, I>(&self, entries: I) -> Vec<MediaEntry>
    where
        I: IntoIterator<Item = &'a MediaEntry>,
    {
        entries
            .into_iter()
            .filter(|e| self.matches(e))
            .cloned()
            .collect()
    }

    pub fn to_query(&self) -> FilterQuery {
        match self {
            CollectionFilter::All => FilterQuery {
                filter: Some(FilterName::All),
                kind: None,
            },
            CollectionFilter::ByKind(kind) => FilterQuery {
                filter: Some(FilterName::Kind),
                kind: Some(*kind),
            },
            CollectionFilter::CompletedWithReview => FilterQuery {
                filter: Some(FilterName::Reviews),
                kind: None,
            },
            CollectionFilter::PendingByKind(kind) => FilterQuery {
                filter: Some(FilterName::Pending),
                kind: Some(*kind),
            },
        }
    }
}

impl fmt::Display for CollectionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionFilter::All => write!(f, "all"),
            CollectionFilter::ByKind(kind) => write!(f, "kind:{}", kind),
            CollectionFilter::CompletedWithReview => write!(f, "reviews"),
            CollectionFilter::PendingByKind(kind) => write!(f, "pending:{}", kind),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FilterName {
    All,
    Kind,
    Reviews,
    Pending,
}

/// Query string form of a [`CollectionFilter`], as sent to `GET /v1/entries`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<MediaKind>,
}

impl TryFrom<FilterQuery> for CollectionFilter {
    type Error = TrackerError;

    fn try_from(query: FilterQuery) -> TrackerResult<Self> {
        let require_kind = |name: &str| {
            query.kind.ok_or_else(|| {
                TrackerError::validation(format!("The {} filter needs a kind", name))
            })
        };
        match query.filter.unwrap_or(FilterName::All) {
            FilterName::All => Ok(CollectionFilter::All),
            FilterName::Kind => Ok(CollectionFilter::ByKind(require_kind("kind")?)),
            FilterName::Reviews => Ok(CollectionFilter::CompletedWithReview),
            FilterName::Pending => Ok(CollectionFilter::PendingByKind(require_kind("pending")?)),
        }
    }
}
