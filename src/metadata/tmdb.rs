//! The Movie Database client, used for movies and series.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::provider::{credential_is_set, non_blank, LookupCandidate, MetadataProvider};
use crate::media::{MediaKind, MetadataSource, SeasonDraft};

pub const TMDB_API_URL: &str = "https://api.themoviedb.org/3";
pub const TMDB_IMAGE_URL: &str = "https://image.tmdb.org/t/p";

const PLACEHOLDER_API_KEY: &str = "your_tmdb_api_key_here";
const POSTER_SIZE: &str = "w342";
const BACKDROP_SIZE: &str = "w780";

/// Genre ids used by TMDB search results, movies and tv merged.
const GENRES: &[(u32, &str)] = &[
    (12, "Adventure"),
    (14, "Fantasy"),
    (16, "Animation"),
    (18, "Drama"),
    (27, "Horror"),
    (28, "Action"),
    (35, "Comedy"),
    (36, "History"),
    (37, "Western"),
    (53, "Thriller"),
    (80, "Crime"),
    (99, "Documentary"),
    (878, "Science Fiction"),
    (9648, "Mystery"),
    (10402, "Music"),
    (10749, "Romance"),
    (10751, "Family"),
    (10752, "War"),
    (10759, "Action & Adventure"),
    (10762, "Kids"),
    (10763, "News"),
    (10764, "Reality"),
    (10765, "Sci-Fi & Fantasy"),
    (10766, "Soap"),
    (10767, "Talk"),
    (10768, "War & Politics"),
    (10770, "TV Movie"),
];

fn genre_name(id: u32) -> Option<&'static str> {
    GENRES
        .binary_search_by_key(&id, |(genre_id, _)| *genre_id)
        .ok()
        .map(|index| GENRES[index].1)
}

pub fn image_url(path: Option<&str>, size: &str) -> Option<String> {
    let path = path.filter(|p| !p.is_empty())?;
    Some(format!("{}/{}{}", TMDB_IMAGE_URL, size, path))
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

/// A movie (`title`, `release_date`) or a tv show (`name`, `first_air_date`).
#[derive(Debug, Deserialize)]
struct SearchResult {
    id: u64,
    title: Option<String>,
    name: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    vote_average: Option<f32>,
    original_language: Option<String>,
    #[serde(default)]
    genre_ids: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct TvDetails {
    #[serde(default)]
    seasons: Vec<TvSeason>,
}

#[derive(Debug, Deserialize)]
struct TvSeason {
    season_number: u32,
    #[serde(default)]
    episode_count: u32,
}

fn candidate_from_result(result: SearchResult) -> LookupCandidate {
    let name = result.title.or(result.name).unwrap_or_default();
    let mut candidate = LookupCandidate::new(MetadataSource::Tmdb, result.id.to_string(), name);
    candidate.description = non_blank(result.overview);
    candidate.cover_url = image_url(result.poster_path.as_deref(), POSTER_SIZE);
    candidate.backdrop_url = image_url(result.backdrop_path.as_deref(), BACKDROP_SIZE);
    candidate.release_date = non_blank(result.release_date.or(result.first_air_date));
    candidate.release_year = candidate
        .release_date
        .as_deref()
        .and_then(|date| date.get(..4))
        .and_then(|year| year.parse().ok());
    candidate.rating = result.vote_average;
    candidate.original_language = non_blank(result.original_language);
    candidate.genres = result
        .genre_ids
        .iter()
        .filter_map(|id| genre_name(*id))
        .map(str::to_string)
        .collect();
    candidate
}

/// Regular seasons with at least one episode; specials (season 0) are skipped.
fn outline_from_details(details: TvDetails) -> Vec<SeasonDraft> {
    let mut seasons: Vec<SeasonDraft> = details
        .seasons
        .into_iter()
        .filter(|s| s.season_number > 0 && s.episode_count > 0)
        .map(|s| SeasonDraft::new(s.season_number, s.episode_count))
        .collect();
    seasons.sort_by_key(|s| s.season_number);
    seasons.dedup_by_key(|s| s.season_number);
    seasons
}

pub struct TmdbClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    language: String,
}

impl TmdbClient {
    pub fn new(http: reqwest::Client, api_key: Option<String>, language: String) -> Self {
        TmdbClient {
            http,
            base_url: TMDB_API_URL.to_string(),
            api_key,
            language,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T> {
        let api_key = match self.api_key.as_deref() {
            Some(key) if self.is_configured() => key,
            _ => bail!("TMDB API key is not configured"),
        };
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .query(&[("api_key", api_key), ("language", self.language.as_str())])
            .query(params)
            .send()
            .await
            .context("Failed to reach TMDB")?;

        if !response.status().is_success() {
            bail!("TMDB API error: status {}", response.status());
        }
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse TMDB response of {}", path))
    }

    /// Season list of a tv show, ready to be used as create-draft seasons.
    pub async fn season_outline(&self, tv_id: &str) -> Result<Vec<SeasonDraft>> {
        let details: TvDetails = self.get(&format!("/tv/{}", tv_id), &[]).await?;
        Ok(outline_from_details(details))
    }
}

#[async_trait]
impl MetadataProvider for TmdbClient {
    fn source(&self) -> MetadataSource {
        MetadataSource::Tmdb
    }

    fn supports(&self, kind: MediaKind) -> bool {
        matches!(kind, MediaKind::Movie | MediaKind::Series)
    }

    fn is_configured(&self) -> bool {
        credential_is_set(self.api_key.as_deref(), PLACEHOLDER_API_KEY)
    }

    async fn search(
        &self,
        kind: MediaKind,
        query: &str,
        limit: usize,
    ) -> Result<Vec<LookupCandidate>> {
        let path = match kind {
            MediaKind::Movie => "/search/movie",
            MediaKind::Series => "/search/tv",
            other => bail!("TMDB does not catalog {}", other),
        };
        let response: SearchResponse = self.get(path, &[("query", query), ("page", "1")]).await?;
        debug!("TMDB returned {} results for {:?}", response.results.len(), query);
        Ok(response
            .results
            .into_iter()
            .take(limit)
            .map(candidate_from_result)
            .collect())
    }
}
