use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, warn};

use super::comicvine::ComicVineClient;
use super::igdb::IgdbClient;
use super::provider::{LookupCandidate, MetadataProvider};
use super::tmdb::TmdbClient;
use crate::config::MetadataConfig;
use crate::media::{MediaKind, MetadataSource, SeasonDraft};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_LOOKUP_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderStatus {
    pub source: MetadataSource,
    pub kinds: Vec<MediaKind>,
    pub configured: bool,
}

/// Routes lookups to the provider cataloging each media kind.
///
/// Lookups never fail: a missing or failing provider just yields no
/// candidates, so entries can always be added by hand.
pub struct MetadataCatalog {
    providers: Vec<Arc<dyn MetadataProvider>>,
    tmdb: Option<Arc<TmdbClient>>,
}

impl MetadataCatalog {
    pub fn new(providers: Vec<Arc<dyn MetadataProvider>>) -> Self {
        MetadataCatalog {
            providers,
            tmdb: None,
        }
    }

    pub fn from_config(config: &MetadataConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        let tmdb = Arc::new(TmdbClient::new(
            http.clone(),
            config.tmdb_api_key.clone(),
            config.tmdb_language.clone(),
        ));
        let igdb = Arc::new(IgdbClient::new(
            http.clone(),
            config.igdb_client_id.clone(),
            config.igdb_client_secret.clone(),
        ));
        let comicvine = Arc::new(ComicVineClient::new(http, config.comicvine_api_key.clone()));

        let providers: Vec<Arc<dyn MetadataProvider>> = vec![tmdb.clone(), igdb, comicvine];
        Ok(MetadataCatalog {
            providers,
            tmdb: Some(tmdb),
        })
    }

    fn provider_for(&self, kind: MediaKind) -> Option<&Arc<dyn MetadataProvider>> {
        self.providers
            .iter()
            .find(|p| p.supports(kind) && p.is_configured())
    }

    /// Whether lookups for `kind` can return anything at all.
    pub fn is_available(&self, kind: MediaKind) -> bool {
        self.provider_for(kind).is_some()
    }

    pub fn statuses(&self) -> Vec<ProviderStatus> {
        self.providers
            .iter()
            .map(|p| ProviderStatus {
                source: p.source(),
                kinds: MediaKind::ALL
                    .iter()
                    .copied()
                    .filter(|kind| p.supports(*kind))
                    .collect(),
                configured: p.is_configured(),
            })
            .collect()
    }

    pub async fn lookup(&self, kind: MediaKind, query: &str, limit: usize) -> Vec<LookupCandidate> {
        let query = query.trim();
        if query.is_empty() {
            return vec![];
        }
        let provider = match self.provider_for(kind) {
            Some(provider) => provider,
            None => {
                debug!("No configured metadata provider for {}", kind);
                return vec![];
            }
        };
        match provider.search(kind, query, limit).await {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!("{} lookup of {:?} failed: {:#}", provider.source(), query, err);
                vec![]
            }
        }
    }

    /// Seasons of a TMDB tv show, empty when unavailable.
    pub async fn season_outline(&self, candidate: &LookupCandidate) -> Vec<SeasonDraft> {
        let tmdb = match &self.tmdb {
            Some(tmdb) if candidate.source == MetadataSource::Tmdb && tmdb.is_configured() => tmdb,
            _ => return vec![],
        };
        match tmdb.season_outline(&candidate.provider_id).await {
            Ok(seasons) => seasons,
            Err(err) => {
                warn!(
                    "Season outline of tv show {} failed: {:#}",
                    candidate.provider_id, err
                );
                vec![]
            }
        }
    }
}
