use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;

/// TOML file read by the backend server.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub db_path: Option<String>,
    pub port: Option<u16>,
    pub logging_level: Option<String>,
    pub frontend_dir_path: Option<String>,
}

/// TOML file read by the `media-tracker` client.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ClientFileConfig {
    pub data_dir: Option<String>,
    pub backend_url: Option<String>,

    pub metadata: Option<MetadataFileConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct MetadataFileConfig {
    pub tmdb_api_key: Option<String>,
    /// Language tag passed to TMDB, e.g. "es-ES".
    pub tmdb_language: Option<String>,
    pub igdb_client_id: Option<String>,
    pub igdb_client_secret: Option<String>,
    pub comicvine_api_key: Option<String>,
}

fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        load_toml(path)
    }
}

impl ClientFileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        load_toml(path)
    }
}
