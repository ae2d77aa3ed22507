use async_trait::async_trait;
use serde::Serialize;

use crate::media::{ExternalRef, MediaDraft, MediaKind, MetadataSource};

/// One search hit of a metadata provider, normalized across providers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupCandidate {
    pub source: MetadataSource,
    pub provider_id: String,
    pub name: String,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub backdrop_url: Option<String>,
    /// `YYYY-MM-DD` when the provider knows the exact day.
    pub release_date: Option<String>,
    pub release_year: Option<i32>,
    pub genres: Vec<String>,
    pub platforms: Vec<String>,
    pub developer: Option<String>,
    pub publisher: Option<String>,
    pub issue_count: Option<u32>,
    /// Aggregate rating on a 0-10 scale.
    pub rating: Option<f32>,
    pub original_language: Option<String>,
}

impl LookupCandidate {
    pub fn new<I: Into<String>, N: Into<String>>(source: MetadataSource, provider_id: I, name: N) -> Self {
        LookupCandidate {
            source,
            provider_id: provider_id.into(),
            name: name.into(),
            description: None,
            cover_url: None,
            backdrop_url: None,
            release_date: None,
            release_year: None,
            genres: vec![],
            platforms: vec![],
            developer: None,
            publisher: None,
            issue_count: None,
            rating: None,
            original_language: None,
        }
    }

    /// Pre-filled create draft. Seasons are left to the caller.
    pub fn to_draft(&self, kind: MediaKind) -> MediaDraft {
        let release_date = self
            .release_date
            .clone()
            .or_else(|| self.release_year.map(|year| year.to_string()));
        MediaDraft {
            title: self.name.clone(),
            kind,
            poster_url: self.cover_url.clone(),
            backdrop_url: self.backdrop_url.clone(),
            overview: self.description.clone(),
            release_date,
            original_language: self.original_language.clone(),
            vote_average: self.rating,
            genres: self.genres.iter().cloned().collect(),
            external_ref: Some(ExternalRef {
                source: self.source,
                id: self.provider_id.clone(),
            }),
            ..Default::default()
        }
    }
}

/// Read-only lookup service of one third-party catalog.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    fn source(&self) -> MetadataSource;

    fn supports(&self, kind: MediaKind) -> bool;

    /// True only when every credential is present and not a placeholder.
    fn is_configured(&self) -> bool;

    async fn search(
        &self,
        kind: MediaKind,
        query: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<LookupCandidate>>;
}

pub(crate) fn credential_is_set(value: Option<&str>, placeholder: &str) -> bool {
    match value.map(str::trim) {
        Some(value) => !value.is_empty() && value != placeholder,
        None => false,
    }
}

/// Empty strings sent by providers mean "unknown".
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
