//! Error types for the Grid shell.
//!
//! Errors are grouped the way the resolution engine recovers from them:
//! configuration problems reject a single descriptor, source and cache problems
//! degrade to an empty or fallback result, and everything else is propagated.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the Grid crates.
#[derive(Debug, Error)]
pub enum GridError {
    // Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Request timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Rate limited by {service}, retry after {retry_after_secs:?} seconds")]
    RateLimited {
        service: String,
        retry_after_secs: Option<u64>,
    },

    #[error("Source unavailable ({source_name}): {message}")]
    SourceUnavailable { source_name: String, message: String },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Platform {platform} is not supported by {client}")]
    UnsupportedPlatform { client: String, platform: String },

    #[error("Client not found: {name}")]
    ClientNotFound { name: String },

    #[error("Client {client} has no setting named {key}")]
    SettingNotFound { client: String, key: String },

    #[error("Invalid value {value:?} for setting {key}")]
    InvalidSettingValue { key: String, value: String },

    // Package cache and download errors
    #[error("Package cache corrupt at {path}: {message}")]
    CacheCorrupt { path: PathBuf, message: String },

    #[error("Download of {url} did not complete: {message}")]
    DownloadIncomplete { url: String, message: String },

    #[error("Download cancelled")]
    Cancelled,

    #[error("No asset matching prefix {prefix:?} in release {tag}")]
    NoMatchingAsset { prefix: String, tag: String },

    #[error("GitHub API error: {message}")]
    GitHubApi { message: String, status_code: Option<u16> },

    // Host errors
    #[error("Window host error: {message}")]
    WindowHost { message: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Grid operations.
pub type Result<T> = std::result::Result<T, GridError>;

impl From<std::io::Error> for GridError {
    fn from(err: std::io::Error) -> Self {
        GridError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for GridError {
    fn from(err: serde_json::Error) -> Self {
        GridError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for GridError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GridError::Timeout(std::time::Duration::from_secs(0))
        } else {
            GridError::Network {
                message: err.to_string(),
                source: Some(err),
            }
        }
    }
}

impl GridError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        GridError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        GridError::Configuration {
            message: message.into(),
        }
    }

    /// Check if this error should trigger a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GridError::Network { .. } | GridError::Timeout(_) | GridError::RateLimited { .. }
        )
    }

    /// Whether the error only rejects one descriptor rather than the whole registry.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            GridError::Configuration { .. } | GridError::UnsupportedPlatform { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GridError::ClientNotFound {
            name: "geth".into(),
        };
        assert_eq!(err.to_string(), "Client not found: geth");

        let err = GridError::NoMatchingAsset {
            prefix: "linux".into(),
            tag: "v1.0.0".into(),
        };
        assert_eq!(
            err.to_string(),
            "No asset matching prefix \"linux\" in release v1.0.0"
        );
    }

    #[test]
    fn test_retryable_errors() {
        assert!(GridError::Timeout(std::time::Duration::from_secs(5)).is_retryable());
        assert!(!GridError::Cancelled.is_retryable());
        assert!(!GridError::config("bad").is_retryable());
    }

    #[test]
    fn test_configuration_errors() {
        assert!(GridError::config("bad").is_configuration());
        assert!(GridError::UnsupportedPlatform {
            client: "parity".into(),
            platform: "linux".into(),
        }
        .is_configuration());
        assert!(!GridError::Cancelled.is_configuration());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: GridError = io.into();
        assert!(matches!(err, GridError::Io { path: None, .. }));
    }
}
