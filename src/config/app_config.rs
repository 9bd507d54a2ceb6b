use serde::Deserialize;

use crate::domain::conversion::DocumentFormat;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageSettings,
    pub logging: LoggingConfig,
}

/// Where and how conversion documents are stored
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// `memory` or `s3`
    pub backend: String,
    pub bucket: String,
    pub prefix: String,
    pub format: DocumentFormat,
    pub s3: S3Settings,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct S3Settings {
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible services
    pub endpoint_url: Option<String>,
    /// Enables SSE-KMS on uploads
    pub kms_key_id: Option<String>,
    pub force_path_style: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            bucket: "conversions".to_string(),
            prefix: "documents".to_string(),
            format: DocumentFormat::default(),
            s3: S3Settings::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("CONVERTER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
