use protocol_extract::GenerationConfig;

use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured JSON lines for production.
    Json,
    /// Human-readable output for development.
    Pretty,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub log_format: LogFormat,
    pub max_upload_bytes: usize,
    pub generation: GenerationConfig,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let generation = GenerationConfig::from_lookup(&lookup)?;

        let port = match lookup("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                name: "PORT",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        let max_upload_bytes = match lookup("MAX_UPLOAD_BYTES") {
            Some(raw) => raw.parse::<usize>().map_err(|_| ConfigError::InvalidValue {
                name: "MAX_UPLOAD_BYTES",
                value: raw,
            })?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            port,
            log_format: log_format(lookup("LOG_FORMAT").as_deref()),
            max_upload_bytes,
            generation,
        })
    }
}

/// Anything other than `pretty` selects JSON.
pub fn log_format(raw: Option<&str>) -> LogFormat {
    match raw {
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::Json,
    }
}
