use super::file_config::ClientFileConfig;
use anyhow::{bail, Result};
use std::path::PathBuf;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:3001";
pub const DEFAULT_TMDB_LANGUAGE: &str = "es-ES";

const DATA_DIR_NAME: &str = ".media-tracker";
const LOCAL_STORAGE_FILE_NAME: &str = "local_storage.json";

/// CLI arguments of the `media-tracker` client that the TOML file may override.
#[derive(Debug, Clone, Default)]
pub struct ClientCliConfig {
    pub data_dir: Option<PathBuf>,
    pub backend_url: Option<String>,
    pub tmdb_api_key: Option<String>,
    pub tmdb_language: Option<String>,
    pub igdb_client_id: Option<String>,
    pub igdb_client_secret: Option<String>,
    pub comicvine_api_key: Option<String>,
}

/// Credentials and options of the metadata providers. Missing credentials
/// leave the matching provider unconfigured.
#[derive(Debug, Clone)]
pub struct MetadataConfig {
    pub tmdb_api_key: Option<String>,
    pub tmdb_language: String,
    pub igdb_client_id: Option<String>,
    pub igdb_client_secret: Option<String>,
    pub comicvine_api_key: Option<String>,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        MetadataConfig {
            tmdb_api_key: None,
            tmdb_language: DEFAULT_TMDB_LANGUAGE.to_string(),
            igdb_client_id: None,
            igdb_client_secret: None,
            comicvine_api_key: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub data_dir: PathBuf,
    pub backend_url: String,
    pub metadata: MetadataConfig,
}

impl ClientConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &ClientCliConfig, file_config: Option<ClientFileConfig>) -> Result<Self> {
        let home = std::env::var_os("HOME").map(PathBuf::from);
        Self::resolve_with_home(cli, file_config, home)
    }

    fn resolve_with_home(
        cli: &ClientCliConfig,
        file_config: Option<ClientFileConfig>,
        home: Option<PathBuf>,
    ) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let data_dir = match file
            .data_dir
            .map(PathBuf::from)
            .or_else(|| cli.data_dir.clone())
        {
            Some(dir) => dir,
            None => match home {
                Some(home) => home.join(DATA_DIR_NAME),
                None => bail!("data_dir must be specified via --data-dir or in config file"),
            },
        };
        if data_dir.exists() && !data_dir.is_dir() {
            bail!("data_dir is not a directory: {:?}", data_dir);
        }

        let backend_url = file
            .backend_url
            .or_else(|| cli.backend_url.clone())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        let backend_url = backend_url.trim().trim_end_matches('/').to_string();
        if !backend_url.starts_with("http://") && !backend_url.starts_with("https://") {
            bail!("backend_url must be an http(s) URL: {}", backend_url);
        }

        let meta_file = file.metadata.unwrap_or_default();
        let metadata = MetadataConfig {
            tmdb_api_key: meta_file
                .tmdb_api_key
                .or_else(|| cli.tmdb_api_key.clone()),
            tmdb_language: meta_file
                .tmdb_language
                .or_else(|| cli.tmdb_language.clone())
                .unwrap_or_else(|| DEFAULT_TMDB_LANGUAGE.to_string()),
            igdb_client_id: meta_file
                .igdb_client_id
                .or_else(|| cli.igdb_client_id.clone()),
            igdb_client_secret: meta_file
                .igdb_client_secret
                .or_else(|| cli.igdb_client_secret.clone()),
            comicvine_api_key: meta_file
                .comicvine_api_key
                .or_else(|| cli.comicvine_api_key.clone()),
        };

        Ok(ClientConfig {
            data_dir,
            backend_url,
            metadata,
        })
    }

    pub fn local_storage_path(&self) -> PathBuf {
        self.data_dir.join(LOCAL_STORAGE_FILE_NAME)
    }
}
