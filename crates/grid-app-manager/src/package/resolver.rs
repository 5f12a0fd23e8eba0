//! Resolution of the UI bundle location and background package updates.
//!
//! [`PackageResolver::resolve`] decides where a package should be loaded
//! from right now (dev server, cached version or hot-load URL) and never
//! fails. [`PackageResolver::check_for_update`] fetches a newer version into
//! the [`PackageCache`] when one is published.

use super::cache::{PackageCache, StagingArea};
use super::unpack::{unpack_archive, ArchiveKind};
use chrono::{DateTime, Utc};
use grid_core::config::{GridUiConfig, NetworkConfig, UpdateConfig};
use grid_core::network::newest_release;
use grid_core::{
    CancellationToken, GridError, HotLoadReason, LivenessProbe, PackageEntry, Platform,
    ReleaseAsset, ReleaseBinding, ReleaseSource, ResolvedBundleLocation, Result, TcpProbe,
};
use semver::Version;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Identities with a download in flight. Shared by every resolver that
/// writes to the same cache.
#[derive(Debug, Clone, Default)]
pub struct DownloadSlots {
    active: Arc<Mutex<HashSet<String>>>,
}

impl DownloadSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot for `identity`, or `None` if it is taken.
    pub fn try_acquire(&self, identity: &str) -> Option<DownloadSlot> {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(identity.to_string()) {
            return None;
        }
        Some(DownloadSlot {
            identity: identity.to_string(),
            active: Arc::clone(&self.active),
        })
    }

    pub fn is_active(&self, identity: &str) -> bool {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(identity)
    }
}

/// Held while a download runs; releases the slot on drop.
#[derive(Debug)]
pub struct DownloadSlot {
    identity: String,
    active: Arc<Mutex<HashSet<String>>>,
}

impl Drop for DownloadSlot {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.identity);
    }
}

/// Result of an update check.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// Another check for the same identity is running.
    AlreadyInProgress,
    /// Nothing newer than the cached version is published.
    UpToDate { cached: Option<Version> },
    /// A new version was downloaded and committed.
    Downloaded(PackageEntry),
}

/// Published after a new version is committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateNotice {
    pub identity: String,
    pub version: Version,
    pub location: PathBuf,
}

/// Timing of the background update loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateSchedule {
    pub first_delay: Duration,
    pub interval: Duration,
}

impl Default for UpdateSchedule {
    fn default() -> Self {
        Self {
            first_delay: UpdateConfig::FIRST_CHECK_DELAY,
            interval: UpdateConfig::CHECK_INTERVAL,
        }
    }
}

struct DevServer {
    probe: Arc<dyn LivenessProbe>,
    url: String,
}

/// Resolves and updates one package identity.
pub struct PackageResolver {
    identity: String,
    binding: ReleaseBinding,
    hot_load_url: String,
    platform: Option<Platform>,
    include_prereleases: bool,
    dev_server: Option<DevServer>,
    probe_timeout: Duration,
    cache: PackageCache,
    source: Arc<dyn ReleaseSource>,
    slots: DownloadSlots,
    last_checked_at: Mutex<Option<DateTime<Utc>>>,
    notices: watch::Sender<Option<UpdateNotice>>,
}

impl PackageResolver {
    pub fn new(
        identity: impl Into<String>,
        binding: ReleaseBinding,
        hot_load_url: impl Into<String>,
        cache: PackageCache,
        source: Arc<dyn ReleaseSource>,
    ) -> Self {
        let (notices, _) = watch::channel(None);
        let platform = Platform::current()
            .inspect_err(|e| warn!("Package updates disabled: {}", e))
            .ok();
        Self {
            identity: identity.into(),
            binding,
            hot_load_url: hot_load_url.into(),
            platform,
            include_prereleases: false,
            dev_server: None,
            probe_timeout: NetworkConfig::PROBE_TIMEOUT,
            cache,
            source,
            slots: DownloadSlots::new(),
            last_checked_at: Mutex::new(None),
            notices,
        }
    }

    /// Resolver for the Grid UI bundle.
    pub fn grid_ui(cache: PackageCache, source: Arc<dyn ReleaseSource>) -> Self {
        Self::new(
            GridUiConfig::PACKAGE_NAME,
            ReleaseBinding::new(GridUiConfig::REPOSITORY, Some(String::new())),
            GridUiConfig::HOT_LOAD_URL,
            cache,
            source,
        )
    }

    /// Prefer `url` whenever `probe` reports the dev server is up.
    pub fn with_dev_server(mut self, probe: Arc<dyn LivenessProbe>, url: impl Into<String>) -> Self {
        self.dev_server = Some(DevServer {
            probe,
            url: url.into(),
        });
        self
    }

    /// Probe the default Grid UI dev server (`localhost:3080`).
    pub fn with_default_dev_server(self) -> Self {
        let probe = Arc::new(TcpProbe::new(GridUiConfig::DEV_HOST, GridUiConfig::DEV_PORT));
        self.with_dev_server(probe, GridUiConfig::dev_url())
    }

    pub fn with_prereleases(mut self, include: bool) -> Self {
        self.include_prereleases = include;
        self
    }

    /// Select assets for `platform` instead of the running one.
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Upper bound on the dev server check in [`resolve`](Self::resolve),
    /// whatever the probe itself allows.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Share download slots with other resolvers on the same cache.
    pub fn with_download_slots(mut self, slots: DownloadSlots) -> Self {
        self.slots = slots;
        self
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn cache(&self) -> &PackageCache {
        &self.cache
    }

    pub fn last_checked_at(&self) -> Option<DateTime<Utc>> {
        *self.last_checked_at.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Receive a value every time a new version is committed. A receiver
    /// created later still sees the most recent notice.
    pub fn subscribe(&self) -> watch::Receiver<Option<UpdateNotice>> {
        self.notices.subscribe()
    }

    /// Most recent version downloaded by this resolver.
    pub fn latest_downloaded(&self) -> Option<UpdateNotice> {
        self.notices.borrow().clone()
    }

    /// Decide where to load the package from. Re-evaluated on every call.
    pub async fn resolve(&self) -> ResolvedBundleLocation {
        if let Some(dev) = &self.dev_server {
            let alive = tokio::time::timeout(self.probe_timeout, dev.probe.is_alive())
                .await
                .unwrap_or_else(|_| {
                    debug!(
                        "Dev server check {} gave no answer within {:?}",
                        dev.probe.target(),
                        self.probe_timeout
                    );
                    false
                });
            if alive {
                debug!("Dev server {} is up", dev.probe.target());
                return ResolvedBundleLocation::DevServerUrl {
                    url: dev.url.clone(),
                };
            }
            warn!(
                "Dev server {} not running, falling back to packaged {}",
                dev.probe.target(),
                self.identity
            );
        }

        match self.cache.latest(&self.identity) {
            Ok(Some(entry)) => {
                info!("Using cached {} {}", self.identity, entry.version);
                ResolvedBundleLocation::CachedPath {
                    version: entry.version,
                    path: entry.location,
                }
            }
            Ok(None) => {
                warn!("No cached {} found, falling back to hot-loading", self.identity);
                self.hot_load(HotLoadReason::NotCached)
            }
            Err(e) => {
                error!("Package cache unavailable for {}: {}", self.identity, e);
                self.hot_load(HotLoadReason::CacheUnavailable)
            }
        }
    }

    fn hot_load(&self, reason: HotLoadReason) -> ResolvedBundleLocation {
        ResolvedBundleLocation::HotLoadUrl {
            url: self.hot_load_url.clone(),
            reason,
        }
    }

    /// Download the newest published version if it is newer than the cache.
    ///
    /// At most one check per identity runs at a time; a concurrent call
    /// returns [`UpdateOutcome::AlreadyInProgress`] without doing anything.
    pub async fn check_for_update(&self, cancel: &CancellationToken) -> Result<UpdateOutcome> {
        let _slot = match self.slots.try_acquire(&self.identity) {
            Some(slot) => slot,
            None => {
                debug!("Update check for {} already running", self.identity);
                return Ok(UpdateOutcome::AlreadyInProgress);
            }
        };
        *self.last_checked_at.lock().unwrap_or_else(|e| e.into_inner()) = Some(Utc::now());

        let releases = self.source.list_releases(&self.binding).await?;
        let cached = self.cache.latest(&self.identity)?.map(|e| e.version);
        let release = match newest_release(&releases, self.include_prereleases) {
            Some(release) => release,
            None => {
                info!("No releases published for {}", self.binding.repository);
                return Ok(UpdateOutcome::UpToDate { cached });
            }
        };
        if cached.as_ref().is_some_and(|c| *c >= release.version) {
            debug!("{} is up to date", self.identity);
            return Ok(UpdateOutcome::UpToDate { cached });
        }

        let platform = self.platform.ok_or_else(|| GridError::UnsupportedPlatform {
            client: self.identity.clone(),
            platform: std::env::consts::OS.to_string(),
        })?;
        let prefix = self.binding.prefix_for(platform);
        let asset = release
            .select_asset(&prefix)
            .ok_or_else(|| GridError::NoMatchingAsset {
                prefix: prefix.clone(),
                tag: release.tag.clone(),
            })?
            .clone();

        info!(
            "Downloading {} {} ({})",
            self.identity, release.version, asset.name
        );
        let staging = self.cache.stage(&self.identity)?;
        let entry = self
            .install(staging, &asset, &release.version, cancel)
            .await
            .map_err(|e| match e {
                GridError::Cancelled | GridError::DownloadIncomplete { .. } => e,
                other => GridError::DownloadIncomplete {
                    url: asset.download_url.clone(),
                    message: other.to_string(),
                },
            })?;

        self.notices.send_replace(Some(UpdateNotice {
            identity: self.identity.clone(),
            version: entry.version.clone(),
            location: entry.location.clone(),
        }));
        info!("New {} version downloaded: {}", self.identity, entry.version);
        Ok(UpdateOutcome::Downloaded(entry))
    }

    async fn install(
        &self,
        staging: StagingArea,
        asset: &ReleaseAsset,
        version: &Version,
        cancel: &CancellationToken,
    ) -> Result<PackageEntry> {
        let file_name = std::path::Path::new(&asset.name)
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| GridError::config(format!("Bad asset name {:?}", asset.name)))?;
        let download_path = staging.path().join(&file_name);
        self.source.fetch_asset(asset, &download_path, cancel).await?;
        cancel.check()?;

        let cache = self.cache.clone();
        let version = version.clone();
        let asset_name = asset.name.clone();
        tokio::task::spawn_blocking(move || {
            let content = staging.content_dir();
            match ArchiveKind::from_name(&asset_name) {
                Some(kind) => unpack_archive(&download_path, kind, &content)?,
                None => {
                    let target = content.join(&file_name);
                    std::fs::rename(&download_path, &target)
                        .map_err(|e| GridError::io_with_path(e, &target))?;
                }
            }
            cache.commit(staging, &version, Some(&asset_name))
        })
        .await
        .map_err(|e| GridError::Other(format!("Install task failed: {}", e)))?
    }

    /// Check for updates after `schedule.first_delay`, then every
    /// `schedule.interval`, until `cancel` fires. Failures are logged.
    pub fn spawn_update_loop(
        self: Arc<Self>,
        schedule: UpdateSchedule,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut delay = schedule.first_delay;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
                match self.check_for_update(&cancel).await {
                    Ok(UpdateOutcome::Downloaded(entry)) => {
                        info!("Background update fetched {} {}", entry.identity, entry.version)
                    }
                    Ok(outcome) => debug!("Background update check: {:?}", outcome),
                    Err(GridError::Cancelled) => break,
                    Err(e) => warn!("Background update check for {} failed: {}", self.identity, e),
                }
                delay = schedule.interval;
            }
            debug!("Update loop for {} stopped", self.identity);
        })
    }
}
