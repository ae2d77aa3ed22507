//! IGDB client, used for videogames. Authenticates with a Twitch app token.

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::provider::{credential_is_set, non_blank, LookupCandidate, MetadataProvider};
use super::token_cache::TokenCache;
use crate::media::{MediaKind, MetadataSource};

pub const IGDB_API_URL: &str = "https://api.igdb.com/v4";
pub const TWITCH_TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";

const PLACEHOLDER_CLIENT_ID: &str = "your_igdb_client_id_here";
const PLACEHOLDER_CLIENT_SECRET: &str = "your_igdb_client_secret_here";
const GAME_FIELDS: &str = "name, summary, cover.url, cover.image_id, first_release_date, genres.name, rating, platforms.name, involved_companies.company.name, involved_companies.developer";

pub fn cover_url(image_id: &str) -> String {
    format!(
        "https://images.igdb.com/igdb/image/upload/t_cover_big/{}.jpg",
        image_id
    )
}

/// Apicalypse query searching games by name, main versions only.
fn search_body(query: &str, limit: usize) -> String {
    let query = query.replace('\\', "\\\\").replace('"', "\\\"");
    format!(
        "search \"{}\"; fields {}; limit {}; where version_parent = null;",
        query, GAME_FIELDS, limit
    )
}

fn timestamp_to_date(seconds: i64) -> Option<String> {
    DateTime::from_timestamp(seconds, 0).map(|date| date.format("%Y-%m-%d").to_string())
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Cover {
    image_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InvolvedCompany {
    company: Option<Named>,
    #[serde(default)]
    developer: bool,
}

#[derive(Debug, Deserialize)]
struct Game {
    id: u64,
    name: String,
    summary: Option<String>,
    cover: Option<Cover>,
    first_release_date: Option<i64>,
    #[serde(default)]
    genres: Vec<Named>,
    /// 0-100.
    rating: Option<f64>,
    #[serde(default)]
    platforms: Vec<Named>,
    #[serde(default)]
    involved_companies: Vec<InvolvedCompany>,
}

fn candidate_from_game(game: Game) -> LookupCandidate {
    let mut candidate = LookupCandidate::new(MetadataSource::Igdb, game.id.to_string(), game.name);
    candidate.description = non_blank(game.summary);
    candidate.cover_url = game
        .cover
        .and_then(|cover| cover.image_id)
        .filter(|id| !id.is_empty())
        .map(|id| cover_url(&id));
    candidate.release_date = game.first_release_date.and_then(timestamp_to_date);
    candidate.release_year = candidate
        .release_date
        .as_deref()
        .and_then(|date| date.get(..4))
        .and_then(|year| year.parse().ok());
    candidate.rating = game
        .rating
        .filter(|r| *r > 0.0)
        .map(|r| (r.round() / 10.0) as f32);
    candidate.genres = game.genres.into_iter().map(|g| g.name).collect();
    candidate.platforms = game.platforms.into_iter().map(|p| p.name).collect();
    candidate.developer = game
        .involved_companies
        .into_iter()
        .find(|ic| ic.developer)
        .and_then(|ic| ic.company)
        .map(|company| company.name);
    candidate
}

pub struct IgdbClient {
    http: reqwest::Client,
    api_url: String,
    token_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    token_cache: Mutex<TokenCache>,
}

impl IgdbClient {
    pub fn new(
        http: reqwest::Client,
        client_id: Option<String>,
        client_secret: Option<String>,
    ) -> Self {
        IgdbClient {
            http,
            api_url: IGDB_API_URL.to_string(),
            token_url: TWITCH_TOKEN_URL.to_string(),
            client_id,
            client_secret,
            token_cache: Mutex::new(TokenCache::new()),
        }
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) if self.is_configured() => Ok((id, secret)),
            _ => bail!("IGDB credentials are not configured"),
        }
    }

    async fn post_games(&self, token: &str, body: &str) -> Result<reqwest::Response> {
        let (client_id, _) = self.credentials()?;
        self.http
            .post(format!("{}/games", self.api_url))
            .header("Client-ID", client_id)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(body.to_string())
            .send()
            .await
            .context("Failed to reach IGDB")
    }

    /// A valid bearer token, exchanging the client credentials when the
    /// cached one is missing or about to expire.
    async fn access_token(&self) -> Result<String> {
        let mut cache = self.token_cache.lock().await;
        if let Some(token) = cache.valid_token(Instant::now()) {
            return Ok(token.to_string());
        }

        let (client_id, client_secret) = self.credentials()?;
        let response = self
            .http
            .post(&self.token_url)
            .query(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .context("Failed to reach the Twitch token endpoint")?;
        if !response.status().is_success() {
            bail!("Failed to obtain IGDB access token: status {}", response.status());
        }
        let token: TokenResponse = response
            .json()
            .await
            .context("Failed to parse IGDB token response")?;

        info!("Obtained IGDB access token valid for {}s", token.expires_in);
        cache.store(
            token.access_token.clone(),
            Duration::from_secs(token.expires_in),
            Instant::now(),
        );
        Ok(token.access_token)
    }
}

#[async_trait]
impl MetadataProvider for IgdbClient {
    fn source(&self) -> MetadataSource {
        MetadataSource::Igdb
    }

    fn supports(&self, kind: MediaKind) -> bool {
        kind == MediaKind::Videogame
    }

    fn is_configured(&self) -> bool {
        credential_is_set(self.client_id.as_deref(), PLACEHOLDER_CLIENT_ID)
            && credential_is_set(self.client_secret.as_deref(), PLACEHOLDER_CLIENT_SECRET)
    }

    async fn search(
        &self,
        kind: MediaKind,
        query: &str,
        limit: usize,
    ) -> Result<Vec<LookupCandidate>> {
        if !self.supports(kind) {
            bail!("IGDB does not catalog {}", kind);
        }
        let body = search_body(query, limit);
        let token = self.access_token().await?;
        let mut response = self.post_games(&token, &body).await?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            warn!("IGDB rejected the cached access token, exchanging a new one");
            self.token_cache.lock().await.clear();
            let token = self.access_token().await?;
            response = self.post_games(&token, &body).await?;
        }
        if !response.status().is_success() {
            bail!("IGDB API error: status {}", response.status());
        }
        let games: Vec<Game> = response
            .json()
            .await
            .context("Failed to parse IGDB games")?;
        debug!("IGDB returned {} games for {:?}", games.len(), query);
        Ok(games.into_iter().map(candidate_from_game).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Reads one request off the stream, body included, and returns its head.
    async fn read_request_head(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let head_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed mid-request");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&buf[..head_end]).to_ascii_lowercase();
        let content_length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while buf.len() < head_end + content_length {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        head
    }

    fn http_reply(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
    }

    struct FakeIgdb {
        base_url: String,
        token_exchanges: Arc<AtomicUsize>,
        game_requests: Arc<AtomicUsize>,
    }

    /// Serves the token and games endpoints. The games endpoint answers 401
    /// unless the bearer is `fresh` and `accept_fresh` is set.
    async fn spawn_fake_igdb(accept_fresh: bool) -> FakeIgdb {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let token_exchanges = Arc::new(AtomicUsize::new(0));
        let game_requests = Arc::new(AtomicUsize::new(0));
        let (exchanges, games) = (token_exchanges.clone(), game_requests.clone());
        tokio::spawn(async move {
            loop {
                let (mut stream, _) = listener.accept().await.unwrap();
                let head = read_request_head(&mut stream).await;
                let reply = if head.starts_with("post /token") {
                    exchanges.fetch_add(1, Ordering::SeqCst);
                    http_reply("200 OK", r#"{"access_token":"fresh","expires_in":3600}"#)
                } else {
                    games.fetch_add(1, Ordering::SeqCst);
                    if accept_fresh && head.contains("authorization: bearer fresh") {
                        http_reply("200 OK", r#"[{"id":7,"name":"Obscure"}]"#)
                    } else {
                        http_reply("401 Unauthorized", "{}")
                    }
                };
                stream.write_all(reply.as_bytes()).await.unwrap();
                let _ = stream.shutdown().await;
            }
        });
        FakeIgdb {
            base_url,
            token_exchanges,
            game_requests,
        }
    }

    async fn client_with_stale_token(fake: &FakeIgdb) -> IgdbClient {
        let mut client = IgdbClient::new(
            reqwest::Client::new(),
            Some("id".to_string()),
            Some("secret".to_string()),
        );
        client.api_url = fake.base_url.clone();
        client.token_url = format!("{}/token", fake.base_url);
        client
            .token_cache
            .lock()
            .await
            .store("stale".to_string(), Duration::from_secs(3600), Instant::now());
        client
    }

    #[test]
    fn builds_search_body() {
        assert_eq!(
            search_body("zelda", 5),
            format!(
                "search \"zelda\"; fields {}; limit 5; where version_parent = null;",
                GAME_FIELDS
            )
        );
        assert!(search_body("say \"hi\"", 1).starts_with("search \"say \\\"hi\\\"\";"));
    }

    #[test]
    fn formats_release_timestamps() {
        assert_eq!(timestamp_to_date(0).as_deref(), Some("1970-01-01"));
        assert_eq!(timestamp_to_date(1431993600).as_deref(), Some("2015-05-19"));
    }

    #[test]
    fn maps_games() {
        let json = r#"[{"id":1942,"name":"The Witcher 3: Wild Hunt","summary":"Geralt.",
            "cover":{"id":1,"url":"//img","image_id":"co1wyy"},
            "first_release_date":1431993600,"genres":[{"id":12,"name":"Role-playing (RPG)"}],
            "rating":92.64,"platforms":[{"id":6,"name":"PC"},{"id":48,"name":"PlayStation 4"}],
            "involved_companies":[{"id":1,"company":{"id":2,"name":"Bandai"},"developer":false},
                                  {"id":3,"company":{"id":4,"name":"CD Projekt RED"},"developer":true}]}]"#;
        let games: Vec<Game> = serde_json::from_str(json).unwrap();
        let candidate = candidate_from_game(games.into_iter().next().unwrap());

        assert_eq!(candidate.source, MetadataSource::Igdb);
        assert_eq!(candidate.provider_id, "1942");
        assert_eq!(
            candidate.cover_url.as_deref(),
            Some("https://images.igdb.com/igdb/image/upload/t_cover_big/co1wyy.jpg")
        );
        assert_eq!(candidate.release_date.as_deref(), Some("2015-05-19"));
        assert_eq!(candidate.release_year, Some(2015));
        assert_eq!(candidate.rating, Some(9.3));
        assert_eq!(candidate.genres, vec!["Role-playing (RPG)"]);
        assert_eq!(candidate.platforms, vec!["PC", "PlayStation 4"]);
        assert_eq!(candidate.developer.as_deref(), Some("CD Projekt RED"));
    }

    #[test]
    fn maps_sparse_games() {
        let games: Vec<Game> = serde_json::from_str(r#"[{"id":7,"name":"Obscure"}]"#).unwrap();
        let candidate = candidate_from_game(games.into_iter().next().unwrap());
        assert_eq!(candidate.cover_url, None);
        assert_eq!(candidate.release_date, None);
        assert_eq!(candidate.rating, None);
        assert_eq!(candidate.developer, None);
    }

    #[test]
    fn configuration_requires_both_credentials() {
        let http = reqwest::Client::new();
        let id_only = IgdbClient::new(http.clone(), Some("id".to_string()), None);
        let placeholders = IgdbClient::new(
            http.clone(),
            Some("your_igdb_client_id_here".to_string()),
            Some("your_igdb_client_secret_here".to_string()),
        );
        let real = IgdbClient::new(http, Some("id".to_string()), Some("secret".to_string()));

        assert!(!id_only.is_configured());
        assert!(!placeholders.is_configured());
        assert!(real.is_configured());
        assert!(real.supports(MediaKind::Videogame));
        assert!(!real.supports(MediaKind::Comic));
    }

    #[tokio::test]
    async fn cached_token_skips_the_exchange() {
        // The token endpoint is unreachable, so success proves the cache was used.
        let mut client = IgdbClient::new(
            reqwest::Client::new(),
            Some("id".to_string()),
            Some("secret".to_string()),
        );
        client.token_url = "http://127.0.0.1:9/token".to_string();
        client
            .token_cache
            .lock()
            .await
            .store("cached".to_string(), Duration::from_secs(3600), Instant::now());

        assert_eq!(client.access_token().await.unwrap(), "cached");

        client.token_cache.lock().await.clear();
        assert!(client.access_token().await.is_err());
    }

    #[tokio::test]
    async fn rejected_token_is_exchanged_and_retried_once() {
        let fake = spawn_fake_igdb(true).await;
        let client = client_with_stale_token(&fake).await;

        let candidates = client
            .search(MediaKind::Videogame, "obscure", 5)
            .await
            .unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].provider_id, "7");
        assert_eq!(fake.token_exchanges.load(Ordering::SeqCst), 1);
        assert_eq!(fake.game_requests.load(Ordering::SeqCst), 2);
        assert_eq!(
            client.token_cache.lock().await.valid_token(Instant::now()),
            Some("fresh")
        );
    }

    #[tokio::test]
    async fn repeated_rejection_is_not_retried_forever() {
        let fake = spawn_fake_igdb(false).await;
        let client = client_with_stale_token(&fake).await;

        let err = client
            .search(MediaKind::Videogame, "obscure", 5)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("401"));
        assert_eq!(fake.token_exchanges.load(Ordering::SeqCst), 1);
        assert_eq!(fake.game_requests.load(Ordering::SeqCst), 2);
    }
}
