//! Layered configuration: defaults, optional TOML file, `LEXCHAT__*` env.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "lexchat";

/// Default model identifier when nothing else is configured.
pub const DEFAULT_MODEL: &str = "gemma3n:e4b";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub inference: InferenceConfig,
    pub client: ClientConfig,
    pub pdf: PdfConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Allowed CORS origins; empty allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

/// LLM runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Base URL of the Ollama-compatible runtime.
    pub base_url: String,
    pub model: String,
    pub connect_timeout_secs: u64,
    /// Messages kept by the agent mode, most recent first.
    pub agent_history_window: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: DEFAULT_MODEL.to_string(),
            connect_timeout_secs: 10,
            agent_history_window: 10,
        }
    }
}

impl InferenceConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Settings for the command-line client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of a lexchat server.
    pub api_url: String,
    pub health_interval_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            health_interval_secs: 30,
        }
    }
}

impl ClientConfig {
    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_interval_secs.max(1))
    }
}

/// Upload settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Maximum upload size in bytes.
    pub max_upload_size: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            max_upload_size: 50 * 1024 * 1024, // 50 MB
        }
    }
}

/// `$XDG_CONFIG_HOME/lexchat/config.toml`, if a config dir exists.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME).join("config.toml"))
}

impl AppConfig {
    /// Load configuration.
    ///
    /// An explicit `path` must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(
                    File::from(path)
                        .format(FileFormat::Toml)
                        .required(true),
                );
            }
            None => {
                if let Some(default_path) = default_config_path() {
                    builder = builder.add_source(
                        File::from(default_path.as_path())
                            .format(FileFormat::Toml)
                            .required(false),
                    );
                }
            }
        }

        let built = builder
            .add_source(
                Environment::with_prefix("LEXCHAT")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .context("building configuration")?;

        built
            .try_deserialize()
            .context("deserializing configuration")
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("serializing configuration to TOML")
    }
}
