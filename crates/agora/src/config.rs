//! Application configuration.
//!
//! Values come from built-in defaults, then `config.toml` in the XDG config
//! directory, then `AGORA__SECTION__KEY` environment variables.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::config::{Config, Environment, File, FileFormat};
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::auth::AuthConfig;
use crate::chat::ChatConfig;
use crate::chatbot::ChatbotConfig;
use crate::generation::GenerationConfig;

pub const APP_NAME: &str = "agora";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub chatbot: ChatbotConfig,
    pub generation: GenerationConfig,
    pub chat: ChatConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Listening address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file. Defaults to `agora.db` in the data directory.
    /// `~` and environment variables are expanded.
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset and no verbosity flag is given.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Resolve the database file location.
    pub fn database_path(&self, data_dir: &Path) -> Result<PathBuf> {
        match &self.database.path {
            Some(path) => expand_str_path(path),
            None => Ok(data_dir.join(format!("{APP_NAME}.db"))),
        }
    }
}

/// Where configuration and data live on disk.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
}

impl AppPaths {
    /// Locate the config file (honouring an override path or directory) and
    /// the data directory.
    pub fn discover(override_path: Option<PathBuf>) -> Result<Self> {
        let config_file = match override_path {
            Some(path) => {
                let expanded = expand_path(path)?;
                if expanded.is_dir() {
                    expanded.join("config.toml")
                } else {
                    expanded
                }
            }
            None => default_config_dir()?.join("config.toml"),
        };

        if config_file.parent().is_none() {
            return Err(anyhow!("invalid config file path: {config_file:?}"));
        }

        Ok(Self {
            config_file,
            data_dir: default_data_dir()?,
        })
    }
}

/// Load configuration, writing a default file first if none exists and
/// `create_missing` is set.
pub fn load_or_init_config(config_file: &Path, create_missing: bool) -> Result<AppConfig> {
    if create_missing && !config_file.exists() {
        write_default_config(config_file)?;
    }

    let env_prefix = env_prefix();
    let built = Config::builder()
        .add_source(
            File::from(config_file)
                .format(FileFormat::Toml)
                .required(false),
        )
        .add_source(Environment::with_prefix(env_prefix.as_str()).separator("__"))
        .build()
        .context("loading configuration")?;

    built
        .try_deserialize()
        .context("parsing configuration")
}

/// Write the default configuration to `path`, creating parent directories.
pub fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {parent:?}"))?;
    }

    let config = AppConfig::default();
    let toml = toml::to_string_pretty(&config).context("serializing default config to TOML")?;
    let mut body = format!("# Configuration for {APP_NAME}\n# File: {}\n\n", path.display());
    body.push_str(&toml);
    fs::write(path, body).with_context(|| format!("writing config file to {}", path.display()))
}

fn expand_path(path: PathBuf) -> Result<PathBuf> {
    if let Some(text) = path.to_str() {
        expand_str_path(text)
    } else {
        Ok(path)
    }
}

fn expand_str_path(text: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(text).context("expanding path")?;
    Ok(PathBuf::from(expanded.to_string()))
}

pub fn default_config_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir).join(APP_NAME));
    }

    if let Some(dir) = dirs::config_dir() {
        return Ok(dir.join(APP_NAME));
    }

    dirs::home_dir()
        .map(|home| home.join(".config").join(APP_NAME))
        .ok_or_else(|| anyhow!("unable to determine configuration directory"))
}

pub fn default_data_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os("XDG_DATA_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir).join(APP_NAME));
    }

    if let Some(dir) = dirs::data_dir() {
        return Ok(dir.join(APP_NAME));
    }

    dirs::home_dir()
        .map(|home| home.join(".local").join("share").join(APP_NAME))
        .ok_or_else(|| anyhow!("unable to determine data directory"))
}

/// Environment variable prefix, e.g. `AGORA` for `AGORA__SERVER__PORT`.
pub fn env_prefix() -> String {
    APP_NAME
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.generation.model, "tinyllama");
        assert_eq!(config.generation.base_url, "http://localhost:11434");
        assert_eq!(config.chat.history_capacity, 100);
        assert!(!config.chatbot.strict_identity);
        assert!(config.auth.jwt_secret.is_none());
    }

    #[test]
    fn test_write_then_load_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = load_or_init_config(&path, true).unwrap();
        assert!(path.exists());
        assert_eq!(config.server.port, 8080);

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# Configuration for agora"));
        assert!(written.contains("[generation]"));
    }

    #[test]
    fn test_file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[server]
port = 9090

[chatbot]
strict_identity = true

[generation]
model = "llama3"
stream = true
"#,
        )
        .unwrap();

        let config = load_or_init_config(&path, false).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(config.chatbot.strict_identity);
        assert_eq!(config.generation.model, "llama3");
        assert!(config.generation.stream);
        assert_eq!(config.generation.timeout_secs, 120);
    }

    #[test]
    fn test_missing_file_without_create_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = load_or_init_config(&path, false).unwrap();
        assert!(!path.exists());
        assert_eq!(config.chat.connection_buffer, 64);
    }

    #[test]
    fn test_database_path() {
        let data_dir = PathBuf::from("/var/lib/agora");
        let mut config = AppConfig::default();
        assert_eq!(
            config.database_path(&data_dir).unwrap(),
            PathBuf::from("/var/lib/agora/agora.db")
        );

        config.database.path = Some("/tmp/custom.db".to_string());
        assert_eq!(
            config.database_path(&data_dir).unwrap(),
            PathBuf::from("/tmp/custom.db")
        );
    }

    #[test]
    fn test_env_prefix() {
        assert_eq!(env_prefix(), "AGORA");
    }

    #[test]
    fn test_discover_with_directory_override() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::discover(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(paths.config_file, dir.path().join("config.toml"));
    }
}
