//! Media collection data models

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Movie,
    Series,
    Book,
    Videogame,
    Comic,
}

impl MediaKind {
    pub const ALL: [MediaKind; 5] = [
        MediaKind::Movie,
        MediaKind::Series,
        MediaKind::Book,
        MediaKind::Videogame,
        MediaKind::Comic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Series => "series",
            MediaKind::Book => "book",
            MediaKind::Videogame => "videogame",
            MediaKind::Comic => "comic",
        }
    }

    /// Genres offered for quick selection when adding an entry of this kind.
    pub fn suggested_genres(&self) -> &'static [&'static str] {
        match self {
            MediaKind::Movie => &[
                "Action", "Adventure", "Animation", "Biography", "Comedy", "Crime",
                "Documentary", "Drama", "Family", "Fantasy", "History", "Horror", "Musical",
                "Mystery", "Romance", "Science Fiction", "Thriller", "War", "Western",
            ],
            MediaKind::Series => &[
                "Action & Adventure", "Animation", "Comedy", "Crime", "Documentary", "Drama",
                "Family", "Kids", "Mystery", "News", "Reality", "Sci-Fi & Fantasy", "Soap",
                "Talk Show", "War & Politics", "Western",
            ],
            MediaKind::Book => &[
                "Fiction", "Non-Fiction", "Science Fiction", "Fantasy", "Mystery", "Thriller",
                "Romance", "Horror", "Historical", "Biography", "Self-Help", "Poetry", "Drama",
                "Adventure", "Young Adult",
            ],
            MediaKind::Videogame => &[
                "Action", "Adventure", "RPG", "Strategy", "Shooter", "Sports", "Racing",
                "Simulation", "Puzzle", "Horror", "Platformer", "Fighting", "MMORPG", "Indie",
                "Sandbox",
            ],
            MediaKind::Comic => &[
                "Superheroes", "Manga", "Science Fiction", "Fantasy", "Horror", "Adventure",
                "Humor", "Drama", "Action", "Romance", "Mystery", "Slice of Life", "Historical",
                "Thriller", "Seinen",
            ],
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "movie" => Ok(MediaKind::Movie),
            "series" => Ok(MediaKind::Series),
            "book" => Ok(MediaKind::Book),
            "videogame" => Ok(MediaKind::Videogame),
            "comic" => Ok(MediaKind::Comic),
            _ => bail!("Unknown media kind {}", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum MediaStatus {
    #[default]
    Plan,
    InProgress,
    Completed,
    Dropped,
}

impl MediaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaStatus::Plan => "plan",
            MediaStatus::InProgress => "in_progress",
            MediaStatus::Completed => "completed",
            MediaStatus::Dropped => "dropped",
        }
    }
}

impl fmt::Display for MediaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "plan" => Ok(MediaStatus::Plan),
            "in_progress" => Ok(MediaStatus::InProgress),
            "completed" => Ok(MediaStatus::Completed),
            "dropped" => Ok(MediaStatus::Dropped),
            _ => bail!("Unknown media status {}", s),
        }
    }
}

pub const GUEST_OWNER: &str = "guest";

/// Who owns an entry: a backend account, or the local guest session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum OwnerRef {
    Account(i64),
    Guest,
}

impl From<OwnerRef> for String {
    fn from(owner: OwnerRef) -> String {
        match owner {
            OwnerRef::Account(id) => id.to_string(),
            OwnerRef::Guest => GUEST_OWNER.to_string(),
        }
    }
}

impl TryFrom<String> for OwnerRef {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == GUEST_OWNER {
            return Ok(OwnerRef::Guest);
        }
        value
            .parse::<i64>()
            .map(OwnerRef::Account)
            .map_err(|_| format!("Invalid owner reference {}", value))
    }
}

/// Third-party catalog an entry was pre-filled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataSource {
    Tmdb,
    Igdb,
    ComicVine,
}

impl MetadataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataSource::Tmdb => "tmdb",
            MetadataSource::Igdb => "igdb",
            MetadataSource::ComicVine => "comic_vine",
        }
    }
}

impl fmt::Display for MetadataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetadataSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "tmdb" => Ok(MetadataSource::Tmdb),
            "igdb" => Ok(MetadataSource::Igdb),
            "comic_vine" => Ok(MetadataSource::ComicVine),
            _ => bail!("Unknown metadata source {}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRef {
    pub source: MetadataSource,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub id: String,
    pub media_id: String,
    pub season_number: u32,
    pub episodes_watched: u32,
    pub total_episodes: u32,
    pub is_completed: bool,
    #[serde(default)]
    pub rating: Option<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaEntry {
    pub id: String,
    pub owner_id: OwnerRef,
    pub kind: MediaKind,
    pub status: MediaStatus,
    #[serde(default)]
    pub rating: Option<u8>,
    pub title: String,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub backdrop_url: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub review: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f32>,
    #[serde(default)]
    pub genres: BTreeSet<String>,
    #[serde(default)]
    pub external_ref: Option<ExternalRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub seasons: Vec<Season>,
}

impl MediaEntry {
    /// Builds a fresh entry out of an already validated draft.
    /// Seasons are attached separately by the owning store.
    pub fn from_draft(id: String, owner_id: OwnerRef, draft: &MediaDraft, now: DateTime<Utc>) -> Self {
        MediaEntry {
            id,
            owner_id,
            kind: draft.kind,
            status: draft.status,
            rating: draft.rating,
            title: draft.title.trim().to_string(),
            poster_url: draft.poster_url.clone(),
            backdrop_url: draft.backdrop_url.clone(),
            overview: draft.overview.clone(),
            notes: draft.notes.clone(),
            review: draft.review.clone(),
            release_date: draft.release_date.clone(),
            original_language: draft.original_language.clone(),
            vote_average: draft.vote_average,
            genres: draft.genres.clone(),
            external_ref: draft.external_ref.clone(),
            created_at: now,
            updated_at: now,
            seasons: vec![],
        }
    }

    /// Applies an already validated partial update.
    pub fn apply_update(&mut self, update: &MediaUpdate, now: DateTime<Utc>) {
        if let Some(title) = &update.title {
            self.title = title.trim().to_string();
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(rating) = update.rating {
            self.rating = rating;
        }
        if let Some(poster_url) = &update.poster_url {
            self.poster_url = poster_url.clone();
        }
        if let Some(review) = &update.review {
            self.review = review.clone();
        }
        if let Some(notes) = &update.notes {
            self.notes = notes.clone();
        }
        self.updated_at = now;
    }

    pub fn has_review(&self) -> bool {
        self.review
            .as_deref()
            .map(|r| !r.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn season(&self, season_id: &str) -> Option<&Season> {
        self.seasons.iter().find(|s| s.id == season_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonDraft {
    pub season_number: u32,
    pub total_episodes: u32,
    #[serde(default)]
    pub episodes_watched: u32,
}

impl SeasonDraft {
    pub fn new(season_number: u32, total_episodes: u32) -> Self {
        SeasonDraft {
            season_number,
            total_episodes,
            episodes_watched: 0,
        }
    }
}

/// Input of the create operation: an entry minus everything the store assigns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaDraft {
    pub title: String,
    pub kind: MediaKind,
    #[serde(default)]
    pub status: MediaStatus,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub backdrop_url: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub review: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f32>,
    #[serde(default)]
    pub genres: BTreeSet<String>,
    #[serde(default)]
    pub external_ref: Option<ExternalRef>,
    #[serde(default)]
    pub seasons: Vec<SeasonDraft>,
}

impl Default for MediaKind {
    fn default() -> Self {
        MediaKind::Movie
    }
}

impl MediaDraft {
    pub fn new<S: Into<String>>(kind: MediaKind, title: S) -> Self {
        MediaDraft {
            title: title.into(),
            kind,
            ..Default::default()
        }
    }
}

/// Partial update of an entry. `None` leaves a field untouched,
/// `Some(None)` clears a nullable one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MediaStatus>,
    #[serde(
        default,
        deserialize_with = "double_option::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub rating: Option<Option<u8>>,
    #[serde(
        default,
        deserialize_with = "double_option::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub poster_url: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub review: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<Option<String>>,
}

impl MediaUpdate {
    pub fn is_empty(&self) -> bool {
        self == &MediaUpdate::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeasonUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_episodes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episodes_watched: Option<u32>,
    #[serde(
        default,
        deserialize_with = "double_option::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub rating: Option<Option<u8>>,
}

/// Distinguishes an absent field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_ref_serializes_as_plain_string() {
        assert_eq!(serde_json::to_string(&OwnerRef::Guest).unwrap(), "\"guest\"");
        assert_eq!(
            serde_json::to_string(&OwnerRef::Account(42)).unwrap(),
            "\"42\""
        );
        let parsed: OwnerRef = serde_json::from_str("\"7\"").unwrap();
        assert_eq!(parsed, OwnerRef::Account(7));
        assert!(serde_json::from_str::<OwnerRef>("\"someone\"").is_err());
    }

    #[test]
    fn media_update_distinguishes_clear_from_absent() {
        let update: MediaUpdate = serde_json::from_str(r#"{"rating": null}"#).unwrap();
        assert_eq!(update.rating, Some(None));
        assert_eq!(update.review, None);

        let update: MediaUpdate = serde_json::from_str(r#"{"rating": 8}"#).unwrap();
        assert_eq!(update.rating, Some(Some(8)));

        let update: MediaUpdate = serde_json::from_str("{}").unwrap();
        assert!(update.is_empty());
    }

    #[test]
    fn cleared_fields_survive_serialization() {
        let update = MediaUpdate {
            review: Some(None),
            ..Default::default()
        };
        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(json, r#"{"review":null}"#);
        let back: MediaUpdate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, update);
    }

    #[test]
    fn apply_update_only_touches_supplied_fields() {
        let now = Utc::now();
        let mut draft = MediaDraft::new(MediaKind::Book, "Dune");
        draft.rating = Some(6);
        draft.notes = Some("reread".to_string());
        let mut entry = MediaEntry::from_draft("id".to_string(), OwnerRef::Guest, &draft, now);

        let later = now + chrono::Duration::seconds(5);
        entry.apply_update(
            &MediaUpdate {
                status: Some(MediaStatus::Completed),
                rating: Some(None),
                ..Default::default()
            },
            later,
        );

        assert_eq!(entry.status, MediaStatus::Completed);
        assert_eq!(entry.rating, None);
        assert_eq!(entry.title, "Dune");
        assert_eq!(entry.notes.as_deref(), Some("reread"));
        assert_eq!(entry.created_at, now);
        assert_eq!(entry.updated_at, later);
    }

    #[test]
    fn kind_and_status_parse_their_own_names() {
        for kind in MediaKind::ALL {
            assert_eq!(kind.as_str().parse::<MediaKind>().unwrap(), kind);
            assert!(!kind.suggested_genres().is_empty());
        }
        assert_eq!(
            "in_progress".parse::<MediaStatus>().unwrap(),
            MediaStatus::InProgress
        );
        assert!("watching".parse::<MediaStatus>().is_err());
    }

    #[test]
    fn whitespace_review_is_not_a_review() {
        let mut draft = MediaDraft::new(MediaKind::Movie, "Heat");
        draft.review = Some("   ".to_string());
        let entry = MediaEntry::from_draft("id".to_string(), OwnerRef::Guest, &draft, Utc::now());
        assert!(!entry.has_review());
    }
}
