use config::{Config, ConfigError};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub source: SourceConfig,
    #[serde(default)]
    pub warehouse: WarehouseConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Csv,
    Parquet,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub path: String,
    #[serde(default = "default_source_format")]
    pub format: SourceFormat,
    #[serde(default = "default_has_header")]
    pub has_header: bool,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WarehouseConfig {
    /// Directory receiving one Parquet generation per rebuild. Unset keeps
    /// snapshots in memory only.
    #[serde(default)]
    pub output_dir: Option<String>,
    /// Generation directories kept under `output_dir`, the current one included.
    #[serde(default = "default_keep_generations")]
    pub keep_generations: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            keep_generations: default_keep_generations(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_source_format() -> SourceFormat {
    SourceFormat::Csv
}

fn default_has_header() -> bool {
    true
}

fn default_delimiter() -> char {
    ','
}

fn default_api_host() -> String {
    "127.0.0.1".to_string()
}

fn default_keep_generations() -> usize {
    3
}

fn default_api_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        let config = builder.build()?;
        let settings: Settings = config.try_deserialize()?;

        debug!(
            source = %settings.source.path,
            format = ?settings.source.format,
            output_dir = ?settings.warehouse.output_dir,
            "Loaded warehouse settings"
        );

        Ok(settings)
    }
}
