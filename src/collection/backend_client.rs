//! HTTP client of the media-tracker backend.

use anyhow::{bail, Context};
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{ErrorBody, TrackerError, TrackerResult};
use crate::media::{CollectionFilter, MediaDraft, MediaEntry, MediaUpdate, Season, SeasonUpdate};
use crate::server::{
    AdjustEpisodesBody, LoginBody, LoginSuccessResponse, RegisterBody, RegisterResponse,
    SessionView,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Thin typed wrapper over the backend's JSON API.
///
/// Every failure comes back as a `TrackerError`: error bodies sent by the
/// backend keep their kind, anything else becomes `Remote`.
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    api_root: Url,
}

impl BackendClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;
        let base_url = base_url.trim_end_matches('/').to_string();
        let api_root = Url::parse(&format!("{}/v1", base_url))
            .with_context(|| format!("Invalid backend URL: {}", base_url))?;
        if api_root.cannot_be_a_base() {
            bail!("Invalid backend URL: {}", base_url);
        }
        Ok(Self {
            client,
            base_url,
            api_root,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1{}", self.base_url, path)
    }

    /// API URL for a resource addressed by ids. Each segment is
    /// percent-encoded, so an id can never leave its own path segment.
    /// Dot segments would be dropped by the URL parser and are refused.
    fn resource_url(&self, segments: &[&str]) -> TrackerResult<Url> {
        if let Some(bad) = segments
            .iter()
            .find(|segment| matches!(**segment, "" | "." | ".."))
        {
            return Err(TrackerError::not_found(format!("No resource with id {:?}", bad)));
        }
        let mut url = self.api_root.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    async fn execute(&self, request: RequestBuilder) -> TrackerResult<reqwest::Response> {
        let response = request.send().await.map_err(|err| {
            warn!("Backend request failed: {}", err);
            TrackerError::Remote(format!("Could not reach the backend: {}", err))
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        debug!("Backend responded with status {}", status);
        match response.json::<ErrorBody>().await {
            Ok(body) => Err(TrackerError::from_kind(body.kind, body.message)),
            Err(_) if status == StatusCode::UNAUTHORIZED => {
                Err(TrackerError::auth("Session rejected by the backend"))
            }
            Err(_) => Err(TrackerError::Remote(format!(
                "Backend responded with status {}",
                status
            ))),
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> TrackerResult<T> {
        let response = self.execute(request).await?;
        response.json::<T>().await.map_err(|err| {
            TrackerError::Remote(format!("Unexpected response from the backend: {}", err))
        })
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        username: Option<&str>,
    ) -> TrackerResult<RegisterResponse> {
        let body = RegisterBody {
            email: email.to_string(),
            password: password.to_string(),
            username: username.map(str::to_string),
        };
        self.send_json(self.client.post(self.url("/auth/register")).json(&body))
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> TrackerResult<LoginSuccessResponse> {
        let body = LoginBody {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.send_json(self.client.post(self.url("/auth/login")).json(&body))
            .await
    }

    pub async fn logout(&self, token: &str) -> TrackerResult<()> {
        self.execute(self.client.get(self.url("/auth/logout")).bearer_auth(token))
            .await?;
        Ok(())
    }

    pub async fn session(&self, token: &str) -> TrackerResult<SessionView> {
        self.send_json(self.client.get(self.url("/auth/session")).bearer_auth(token))
            .await
    }

    pub async fn list_entries(
        &self,
        token: &str,
        filter: &CollectionFilter,
    ) -> TrackerResult<Vec<MediaEntry>> {
        let request = self
            .client
            .get(self.url("/entries"))
            .bearer_auth(token)
            .query(&filter.to_query());
        self.send_json(request).await
    }

    pub async fn get_entry(&self, token: &str, id: &str) -> TrackerResult<MediaEntry> {
        let request = self
            .client
            .get(self.resource_url(&["entries", id])?)
            .bearer_auth(token);
        self.send_json(request).await
    }

    pub async fn create_entry(&self, token: &str, draft: &MediaDraft) -> TrackerResult<MediaEntry> {
        let request = self
            .client
            .post(self.url("/entries"))
            .bearer_auth(token)
            .json(draft);
        self.send_json(request).await
    }

    pub async fn update_entry(
        &self,
        token: &str,
        id: &str,
        update: &MediaUpdate,
    ) -> TrackerResult<MediaEntry> {
        let request = self
            .client
            .patch(self.resource_url(&["entries", id])?)
            .bearer_auth(token)
            .json(update);
        self.send_json(request).await
    }

    pub async fn delete_entry(&self, token: &str, id: &str) -> TrackerResult<()> {
        let request = self
            .client
            .delete(self.resource_url(&["entries", id])?)
            .bearer_auth(token);
        self.execute(request).await?;
        Ok(())
    }

    pub async fn adjust_season(
        &self,
        token: &str,
        season_id: &str,
        delta: i32,
    ) -> TrackerResult<Season> {
        let request = self
            .client
            .post(self.resource_url(&["seasons", season_id, "adjust"])?)
            .bearer_auth(token)
            .json(&AdjustEpisodesBody { delta });
        self.send_json(request).await
    }

    pub async fn update_season(
        &self,
        token: &str,
        season_id: &str,
        update: &SeasonUpdate,
    ) -> TrackerResult<Season> {
        let request = self
            .client
            .patch(self.resource_url(&["seasons", season_id])?)
            .bearer_auth(token)
            .json(update);
        self.send_json(request).await
    }
}
