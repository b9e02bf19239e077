use moodfinance_core::DEFAULT_INSIGHT_THRESHOLD;
use moodfinance_vision::ReceiptParserConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SERVICE_NAME: &str = "MoodFinance AI Server";

/// Environment variable naming an optional TOML config file.
pub const CONFIG_PATH_ENV: &str = "MOODFINANCE_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value '{value}' for {var}")]
    InvalidEnv { var: &'static str, value: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub receipt: ReceiptParserConfig,
    pub insight: InsightConfig,
    pub ocr: OcrConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Prefix every API route is mounted under.
    pub api_prefix: String,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            api_prefix: "/api/v1".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// `api_prefix` as a route path: one leading `/`, no trailing `/`.
    /// Empty (or just `/`) mounts the API at the root.
    pub fn route_prefix(&self) -> String {
        let trimmed = self.api_prefix.trim().trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("data/moodfinance.db") }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    /// Mean spend per emotion above which an insight is reported.
    pub threshold: Decimal,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self { threshold: DEFAULT_INSIGHT_THRESHOLD }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Tesseract `tessdata` directory; the engine default when unset.
    pub tessdata_path: Option<String>,
    /// Hangul item names with Latin brand names mixed in.
    pub lang: String,
    /// Tesseract page segmentation mode; 6 reads the receipt as one block of lines.
    pub page_seg_mode: u8,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self { tessdata_path: None, lang: "kor+eng".to_string(), page_seg_mode: 6 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" | "bunyan" => Ok(LogFormat::Json),
            other => Err(format!("Unknown log format: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    /// `EnvFilter` directives, used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: "info,moodfinance=debug,tower_http=info".to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults, then the file named by `MOODFINANCE_CONFIG` (if set), then
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `SERVER_HOST`, `SERVER_PORT`, `DATABASE_PATH` and `LOG_FORMAT`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(host) = lookup("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("SERVER_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { var: "SERVER_PORT", value: port })?;
        }
        if let Some(path) = lookup("DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.log.format = format
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { var: "LOG_FORMAT", value: format })?;
        }
        Ok(())
    }
}
