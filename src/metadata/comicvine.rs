//! ComicVine client, used for comics. Searches volumes (whole runs).

use std::sync::LazyLock;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use super::provider::{credential_is_set, non_blank, LookupCandidate, MetadataProvider};
use crate::media::{MediaKind, MetadataSource};

pub const COMICVINE_API_URL: &str = "https://comicvine.gamespot.com/api";

const PLACEHOLDER_API_KEY: &str = "your_comicvine_api_key_here";
const VOLUME_FIELDS: &str = "id,name,description,image,start_year,publisher,count_of_issues";
const USER_AGENT: &str = concat!("media-tracker/", env!("CARGO_PKG_VERSION"));

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

/// Plain text out of ComicVine's HTML descriptions.
pub fn clean_html(html: &str) -> String {
    HTML_TAG
        .replace_all(html, "")
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    error: String,
    #[serde(default)]
    results: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
struct Image {
    medium_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Publisher {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Volume {
    id: u64,
    name: Option<String>,
    description: Option<String>,
    image: Option<Image>,
    start_year: Option<String>,
    publisher: Option<Publisher>,
    count_of_issues: Option<u32>,
}

fn candidate_from_volume(volume: Volume) -> LookupCandidate {
    let mut candidate = LookupCandidate::new(
        MetadataSource::ComicVine,
        volume.id.to_string(),
        volume.name.unwrap_or_default(),
    );
    candidate.description = non_blank(volume.description.as_deref().map(clean_html));
    candidate.cover_url = non_blank(volume.image.and_then(|image| image.medium_url));
    candidate.release_year = volume
        .start_year
        .as_deref()
        .and_then(|year| year.trim().parse().ok());
    candidate.publisher = non_blank(volume.publisher.and_then(|p| p.name));
    candidate.issue_count = volume.count_of_issues;
    candidate
}

fn candidates_from_response(response: VolumesResponse) -> Result<Vec<LookupCandidate>> {
    if response.error != "OK" {
        bail!("ComicVine API error: {}", response.error);
    }
    Ok(response
        .results
        .into_iter()
        .map(candidate_from_volume)
        .collect())
}

pub struct ComicVineClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ComicVineClient {
    pub fn new(http: reqwest::Client, api_key: Option<String>) -> Self {
        ComicVineClient {
            http,
            base_url: COMICVINE_API_URL.to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl MetadataProvider for ComicVineClient {
    fn source(&self) -> MetadataSource {
        MetadataSource::ComicVine
    }

    fn supports(&self, kind: MediaKind) -> bool {
        kind == MediaKind::Comic
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
        if !self.supports(kind) {
            bail!("ComicVine does not catalog {}", kind);
        }
        let api_key = match self.api_key.as_deref() {
            Some(key) if self.is_configured() => key,
            _ => bail!("ComicVine API key is not configured"),
        };
        let filter = format!("name:{}", query);
        let limit = limit.to_string();

        let response = self
            .http
            .get(format!("{}/volumes/", self.base_url))
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .query(&[
                ("api_key", api_key),
                ("format", "json"),
                ("filter", filter.as_str()),
                ("limit", limit.as_str()),
                ("field_list", VOLUME_FIELDS),
            ])
            .send()
            .await
            .context("Failed to reach ComicVine")?;
        if !response.status().is_success() {
            bail!("ComicVine API error: status {}", response.status());
        }
        let volumes: VolumesResponse = response
            .json()
            .await
            .context("Failed to parse ComicVine volumes")?;
        debug!("ComicVine returned {} volumes for {:?}", volumes.results.len(), query);
        candidates_from_response(volumes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_entities() {
        assert_eq!(
            clean_html("<p>Batman &amp; Robin&nbsp;<em>return</em></p> &lt;3 &quot;x&quot;"),
            "Batman & Robin return <3 \"x\""
        );
        assert_eq!(clean_html("  <br/>  "), "");
        assert_eq!(clean_html("&amp;lt;"), "&lt;");
    }

    #[test]
    fn maps_volumes() {
        let json = r#"{"error":"OK","limit":10,"offset":0,"number_of_page_results":1,
            "number_of_total_results":1,"status_code":1,"results":[{"id":796,
            "name":"Saga","description":"<p>Space opera.</p>",
            "image":{"medium_url":"https://cv/saga.jpg","thumb_url":"https://cv/t.jpg"},
            "start_year":"2012","publisher":{"id":1,"name":"Image"},"count_of_issues":66}]}"#;
        let response: VolumesResponse = serde_json::from_str(json).unwrap();
        let candidates = candidates_from_response(response).unwrap();
        assert_eq!(candidates.len(), 1);

        let saga = &candidates[0];
        assert_eq!(saga.source, MetadataSource::ComicVine);
        assert_eq!(saga.provider_id, "796");
        assert_eq!(saga.name, "Saga");
        assert_eq!(saga.description.as_deref(), Some("Space opera."));
        assert_eq!(saga.cover_url.as_deref(), Some("https://cv/saga.jpg"));
        assert_eq!(saga.release_year, Some(2012));
        assert_eq!(saga.publisher.as_deref(), Some("Image"));
        assert_eq!(saga.issue_count, Some(66));
    }

    #[test]
    fn error_status_in_body_is_a_failure() {
        let json = r#"{"error":"Invalid API Key","results":[]}"#;
        let response: VolumesResponse = serde_json::from_str(json).unwrap();
        let err = candidates_from_response(response).unwrap_err();
        assert!(err.to_string().contains("Invalid API Key"));
    }

    #[test]
    fn configuration_rejects_placeholder() {
        let http = reqwest::Client::new();
        assert!(!ComicVineClient::new(http.clone(), None).is_configured());
        assert!(
            !ComicVineClient::new(http.clone(), Some("your_comicvine_api_key_here".to_string()))
                .is_configured()
        );
        assert!(ComicVineClient::new(http, Some("k".to_string())).is_configured());
    }
}
