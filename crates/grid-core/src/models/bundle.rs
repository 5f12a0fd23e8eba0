//! Package cache entries and resolved UI bundle locations.

use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A committed package version in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageEntry {
    pub identity: String,
    pub version: Version,
    pub location: PathBuf,
    #[serde(default)]
    pub downloaded_at: Option<DateTime<Utc>>,
    /// Entry lives in a read-only search path rather than the cache root.
    #[serde(default)]
    pub shipped: bool,
}

/// Why the hot-load URL was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HotLoadReason {
    NotCached,
    CacheUnavailable,
}

/// Where the UI bundle should be loaded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ResolvedBundleLocation {
    DevServerUrl { url: String },
    HotLoadUrl { url: String, reason: HotLoadReason },
    CachedPath { version: Version, path: PathBuf },
}

impl ResolvedBundleLocation {
    /// URL a window host can load.
    pub fn to_url(&self) -> String {
        match self {
            Self::DevServerUrl { url } | Self::HotLoadUrl { url, .. } => url.clone(),
            Self::CachedPath { path, .. } => {
                let index = path.join("index.html");
                let display = index.to_string_lossy().replace('\\', "/");
                if display.starts_with('/') {
                    format!("file://{}", display)
                } else {
                    format!("file:///{}", display)
                }
            }
        }
    }
}

impl fmt::Display for ResolvedBundleLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DevServerUrl { url } => write!(f, "dev server {}", url),
            Self::HotLoadUrl { url, reason } => write!(f, "hot-load {} ({:?})", url, reason),
            Self::CachedPath { version, path } => {
                write!(f, "cached {} at {}", version, path.display())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_path_url() {
        let location = ResolvedBundleLocation::CachedPath {
            version: Version::new(1, 2, 0),
            path: PathBuf::from("/cache/grid-ui/1.2.0"),
        };
        assert_eq!(location.to_url(), "file:///cache/grid-ui/1.2.0/index.html");
    }

    #[test]
    fn test_hot_load_url_passthrough() {
        let location = ResolvedBundleLocation::HotLoadUrl {
            url: "package://github.com/ethereum/grid-ui".into(),
            reason: HotLoadReason::NotCached,
        };
        assert_eq!(location.to_url(), "package://github.com/ethereum/grid-ui");
        let json = serde_json::to_value(&location).unwrap();
        assert_eq!(json["kind"], "hotLoadUrl");
        assert_eq!(json["reason"], "notCached");
    }
}
