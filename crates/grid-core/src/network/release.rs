//! Remote release sources.
//!
//! A [`ReleaseSource`] lists versioned releases of a repository and fetches
//! their assets. [`GitHubReleaseSource`] implements it against the GitHub
//! releases API with a short-lived in-memory cache of listings.

use crate::cancel::CancellationToken;
use crate::config::NetworkConfig;
use crate::network::client::{is_transient_status, HttpClient};
use crate::network::download::{DownloadProgress, Downloader};
use crate::network::retry::{retry_async, RetryPolicy};
use crate::platform::Platform;
use crate::{GridError, Result};
use async_trait::async_trait;
use mini_moka::sync::Cache;
use reqwest::StatusCode;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Where releases of a package or client are published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseBinding {
    /// Repository reference in `owner/name` form.
    pub repository: String,
    /// Asset name prefix selecting the right binary. `None` means the
    /// platform's own prefix (`linux`, `darwin`, `win32`).
    #[serde(default)]
    pub asset_filter_prefix: Option<String>,
}

impl ReleaseBinding {
    pub fn new(repository: impl Into<String>, asset_filter_prefix: Option<String>) -> Self {
        Self {
            repository: repository.into(),
            asset_filter_prefix,
        }
    }

    /// Effective asset prefix on `platform`.
    pub fn prefix_for(&self, platform: Platform) -> String {
        self.asset_filter_prefix
            .clone()
            .unwrap_or_else(|| platform.asset_prefix().to_string())
    }
}

/// A downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub size: u64,
    pub download_url: String,
}

/// A release with a semver version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub tag: String,
    pub version: Version,
    pub prerelease: bool,
    #[serde(default)]
    pub published_at: Option<String>,
    pub assets: Vec<ReleaseAsset>,
}

impl Release {
    /// Pick the asset whose name starts with `prefix` (case-insensitive).
    ///
    /// Checksum and signature files are never selected; among the remaining
    /// matches archives are preferred, then declaration order.
    pub fn select_asset(&self, prefix: &str) -> Option<&ReleaseAsset> {
        let prefix = prefix.to_lowercase();
        self.assets
            .iter()
            .filter(|a| {
                let name = a.name.to_lowercase();
                name.starts_with(&prefix) && !is_metadata_file(&name)
            })
            .min_by_key(|a| !is_archive(&a.name))
    }
}

const METADATA_SUFFIXES: &[&str] = &[".sha256", ".sha512", ".md5", ".asc", ".sig"];

fn is_metadata_file(name: &str) -> bool {
    METADATA_SUFFIXES.iter().any(|s| name.ends_with(s))
}

/// Whether `name` is an archive the package cache knows how to unpack.
pub fn is_archive(name: &str) -> bool {
    let name = name.to_lowercase();
    name.ends_with(".zip") || name.ends_with(".tar.gz") || name.ends_with(".tgz")
}

/// Parse a release tag (`v1.2.0`, `1.2.0`) into a version.
pub fn parse_tag(tag: &str) -> Option<Version> {
    Version::parse(tag.trim().trim_start_matches('v')).ok()
}

/// The newest release, optionally skipping pre-releases.
pub fn newest_release(releases: &[Release], include_prereleases: bool) -> Option<&Release> {
    releases
        .iter()
        .filter(|r| include_prereleases || !r.prerelease)
        .max_by(|a, b| a.version.cmp(&b.version))
}

/// Remote location that can list and fetch versioned releases.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// List all releases of `binding.repository` with a parseable version.
    async fn list_releases(&self, binding: &ReleaseBinding) -> Result<Vec<Release>>;

    /// Download `asset` to `destination`. Returns the number of bytes written.
    async fn fetch_asset(
        &self,
        asset: &ReleaseAsset,
        destination: &Path,
        cancel: &CancellationToken,
    ) -> Result<u64>;
}

/// Raw release entry from the GitHub API.
#[derive(Debug, Deserialize)]
struct GitHubRelease {
    tag_name: String,
    #[serde(default)]
    prerelease: bool,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    assets: Vec<GitHubAsset>,
}

#[derive(Debug, Deserialize)]
struct GitHubAsset {
    name: String,
    #[serde(default)]
    size: u64,
    browser_download_url: String,
}

impl GitHubRelease {
    fn into_release(self) -> Option<Release> {
        if self.draft {
            return None;
        }
        let version = match parse_tag(&self.tag_name) {
            Some(v) => v,
            None => {
                debug!("Skipping release with non-semver tag {}", self.tag_name);
                return None;
            }
        };
        Some(Release {
            tag: self.tag_name,
            version,
            prerelease: self.prerelease,
            published_at: self.published_at,
            assets: self
                .assets
                .into_iter()
                .map(|a| ReleaseAsset {
                    name: a.name,
                    size: a.size,
                    download_url: a.browser_download_url,
                })
                .collect(),
        })
    }
}

/// GitHub releases API client.
pub struct GitHubReleaseSource {
    http: Arc<HttpClient>,
    downloader: Downloader,
    api_base: String,
    listings: Cache<String, Vec<Release>>,
    progress: Option<mpsc::Sender<DownloadProgress>>,
}

impl GitHubReleaseSource {
    /// Create a source against the public GitHub API.
    pub fn new() -> Result<Self> {
        Self::with_api_base(NetworkConfig::GITHUB_API_BASE, NetworkConfig::GITHUB_RELEASES_TTL)
    }

    /// Create a source against another API base (GitHub Enterprise, mirrors).
    pub fn with_api_base(api_base: impl Into<String>, ttl: Duration) -> Result<Self> {
        let http = Arc::new(HttpClient::new()?);
        let download_http = Arc::new(HttpClient::with_timeout(
            NetworkConfig::DOWNLOAD_REQUEST_TIMEOUT,
        )?);
        Ok(Self {
            http,
            downloader: Downloader::new(download_http),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            listings: Cache::builder().time_to_live(ttl).max_capacity(16).build(),
            progress: None,
        })
    }

    /// Report asset download progress on `tx`.
    pub fn with_progress(mut self, tx: mpsc::Sender<DownloadProgress>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Drop the cached listing for `repository`.
    pub fn invalidate(&self, repository: &str) {
        self.listings.invalidate(&repository.to_string());
    }

    async fn fetch_page(&self, url: &str) -> Result<Vec<GitHubRelease>> {
        let policy = RetryPolicy::new()
            .with_max_attempts(NetworkConfig::DOWNLOAD_RETRY_ATTEMPTS)
            .with_base_delay(Duration::from_secs(2));

        let (result, attempts) = retry_async(
            &policy,
            || async {
                let response = self
                    .http
                    .get_accepting(url, "application/vnd.github.v3+json")
                    .await?;
                let status = response.status();
                if status == StatusCode::FORBIDDEN {
                    return Err(GridError::RateLimited {
                        service: "GitHub".to_string(),
                        retry_after_secs: None,
                    });
                }
                if is_transient_status(status) {
                    return Err(GridError::Network {
                        message: format!("GitHub API returned {}", status),
                        source: None,
                    });
                }
                if !status.is_success() {
                    return Err(GridError::GitHubApi {
                        message: format!("GitHub API returned {}", status),
                        status_code: Some(status.as_u16()),
                    });
                }
                response
                    .json::<Vec<GitHubRelease>>()
                    .await
                    .map_err(|e| GridError::Json {
                        message: format!("Failed to parse GitHub releases: {}", e),
                        source: None,
                    })
            },
            // A 403 rate limit will not clear within the retry window.
            |e: &GridError| e.is_retryable() && !matches!(e, GridError::RateLimited { .. }),
        )
        .await;

        if attempts > 1 {
            debug!("GitHub API request took {} attempts", attempts);
        }
        result
    }
}

#[async_trait]
impl ReleaseSource for GitHubReleaseSource {
    async fn list_releases(&self, binding: &ReleaseBinding) -> Result<Vec<Release>> {
        let repo = binding.repository.clone();
        if let Some(cached) = self.listings.get(&repo) {
            debug!("Release listing cache hit for {}", repo);
            return Ok(cached);
        }

        let per_page = NetworkConfig::GITHUB_RELEASES_PER_PAGE;
        let mut releases = Vec::new();
        for page in 1..=NetworkConfig::GITHUB_RELEASES_MAX_PAGES {
            let url = format!(
                "{}/repos/{}/releases?per_page={}&page={}",
                self.api_base, repo, per_page, page
            );
            let batch = self.fetch_page(&url).await.map_err(|e| {
                warn!("Listing releases of {} failed: {}", repo, e);
                GridError::SourceUnavailable {
                    source_name: repo.clone(),
                    message: e.to_string(),
                }
            })?;
            let count = batch.len();
            releases.extend(batch.into_iter().filter_map(GitHubRelease::into_release));
            if count < per_page as usize {
                break;
            }
        }

        info!("Fetched {} releases for {}", releases.len(), repo);
        self.listings.insert(repo, releases.clone());
        Ok(releases)
    }

    async fn fetch_asset(
        &self,
        asset: &ReleaseAsset,
        destination: &Path,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        self.downloader
            .download(&asset.download_url, destination, cancel, self.progress.clone())
            .await
    }
}
