mod client_config;
mod file_config;

pub use client_config::{
    ClientCliConfig, ClientConfig, MetadataConfig, DEFAULT_BACKEND_URL, DEFAULT_TMDB_LANGUAGE,
};
pub use file_config::{ClientFileConfig, FileConfig, MetadataFileConfig};

use crate::server::{RequestsLoggingLevel, ServerConfig};
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

/// CLI arguments of the backend server that the TOML file may override.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_path must be specified via --db-path or in config file")
            })?;

        if db_path.is_dir() {
            bail!("db_path is a directory: {:?}", db_path);
        }
        // The database file itself is created on first start, its directory is not.
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                bail!("Database directory does not exist: {:?}", parent);
            }
        }

        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or(cli.logging_level);

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        Ok(AppConfig {
            db_path,
            port,
            logging_level,
            frontend_dir_path,
        })
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            requests_logging_level: self.logging_level,
            port: self.port,
            frontend_dir_path: self.frontend_dir_path.clone(),
        }
    }
}

fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_logging_level() {
        assert_eq!(parse_logging_level("none"), Some(RequestsLoggingLevel::None));
        assert_eq!(parse_logging_level("PATH"), Some(RequestsLoggingLevel::Path));
        assert_eq!(
            parse_logging_level("headers"),
            Some(RequestsLoggingLevel::Headers)
        );
        assert_eq!(parse_logging_level("body"), Some(RequestsLoggingLevel::Body));
        assert_eq!(parse_logging_level("loud"), None);
    }

    #[test]
    fn test_resolve_cli_only() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            db_path: Some(temp_dir.path().join("tracker.db")),
            port: 3005,
            logging_level: RequestsLoggingLevel::Headers,
            frontend_dir_path: None,
        };

        let config = AppConfig::resolve(&cli, None).unwrap();
        assert_eq!(config.db_path, temp_dir.path().join("tracker.db"));
        assert_eq!(config.port, 3005);
        assert_eq!(config.logging_level, RequestsLoggingLevel::Headers);
        assert!(config.frontend_dir_path.is_none());

        let server_config = config.server_config();
        assert_eq!(server_config.port, 3005);
        assert_eq!(
            server_config.requests_logging_level,
            RequestsLoggingLevel::Headers
        );
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            db_path: Some(temp_dir.path().join("cli.db")),
            port: 3001,
            logging_level: RequestsLoggingLevel::Path,
            frontend_dir_path: Some("/cli/frontend".to_string()),
        };
        let file = FileConfig {
            db_path: Some(temp_dir.path().join("file.db").to_string_lossy().into_owned()),
            port: Some(4000),
            logging_level: Some("body".to_string()),
            frontend_dir_path: None,
        };

        let config = AppConfig::resolve(&cli, Some(file)).unwrap();
        assert_eq!(config.db_path, temp_dir.path().join("file.db"));
        assert_eq!(config.port, 4000);
        assert_eq!(config.logging_level, RequestsLoggingLevel::Body);
        assert_eq!(config.frontend_dir_path.as_deref(), Some("/cli/frontend"));
    }

    #[test]
    fn test_unknown_toml_logging_level_falls_back_to_cli() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            db_path: Some(temp_dir.path().join("tracker.db")),
            logging_level: RequestsLoggingLevel::None,
            ..Default::default()
        };
        let file = FileConfig {
            logging_level: Some("verbose".to_string()),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file)).unwrap();
        assert_eq!(config.logging_level, RequestsLoggingLevel::None);
    }

    #[test]
    fn test_resolve_missing_db_path_errors() {
        let cli = CliConfig::default();
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("db_path"));
    }

    #[test]
    fn test_resolve_nonexistent_db_dir_errors() {
        let cli = CliConfig {
            db_path: Some(PathBuf::from("/nonexistent/path/tracker.db")),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("does not exist"));
    }

    #[test]
    fn test_resolve_db_path_is_directory_errors() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            db_path: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("is a directory"));
    }
}
