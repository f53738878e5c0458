//! Hub configuration from environment variables
//!
//! | Variable              | Default  | Meaning                         |
//! |-----------------------|----------|---------------------------------|
//! | `KESKUS_LOG_LEVEL`    | `info`   | tracing filter directive        |
//! | `KESKUS_LOG_FORMAT`   | `pretty` | `pretty` or `json`              |
//! | `KESKUS_PIPES_BUCKET` | `pipes`  | bucket name for pipe records    |

use crate::error::HubError;
use crate::store::PIPES_BUCKET;
use std::env;
use std::str::FromStr;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured JSON lines, for log shippers
    Json,
    /// Human-readable output, for terminals
    Pretty,
}

impl FromStr for LogFormat {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(HubError::Config(format!(
                "KESKUS_LOG_FORMAT must be 'json' or 'pretty', got '{other}'"
            ))),
        }
    }
}

/// Runtime configuration, loaded once at process start
#[derive(Debug, Clone)]
pub struct Config {
    /// tracing filter directive used when `RUST_LOG` is unset
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
    /// Bucket name for pipe records
    pub pipes_bucket: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            pipes_bucket: PIPES_BUCKET.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `KESKUS_*` environment variables
    pub fn from_env() -> Result<Self, HubError> {
        let mut config = Self::default();

        if let Ok(level) = env::var("KESKUS_LOG_LEVEL") {
            config.log_level = level;
        }
        if let Ok(format) = env::var("KESKUS_LOG_FORMAT") {
            config.log_format = format.parse()?;
        }
        if let Ok(bucket) = env::var("KESKUS_PIPES_BUCKET") {
            if bucket.is_empty() {
                return Err(HubError::Config(
                    "KESKUS_PIPES_BUCKET must not be empty".to_string(),
                ));
            }
            config.pipes_bucket = bucket;
        }

        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.pipes_bucket, "pipes");
    }

    #[test]
    fn log_format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("yaml".parse::<LogFormat>().is_err());
    }
}
