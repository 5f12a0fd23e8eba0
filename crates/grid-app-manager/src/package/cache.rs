//! On-disk cache of downloaded package versions.
//!
//! Layout: `<root>/<identity>/<version>/` holds one committed version, with a
//! marker file describing it. The directory tree is the index; there is no
//! separate database to keep in sync.
//!
//! New versions are assembled in a hidden staging directory under `<root>`
//! and committed by a single rename, so a reader sees either the previous
//! set of versions or the new one. Staging directories are removed when
//! dropped and purged on open if a previous process died mid-download.

use chrono::{DateTime, Utc};
use grid_core::config::PathsConfig;
use grid_core::storage::{atomic_read_json, atomic_write_json};
use grid_core::{GridError, PackageEntry, Result};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

const CONTENT_DIR: &str = "package";

/// Marker written into every committed version directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageMarker {
    identity: String,
    version: Version,
    downloaded_at: DateTime<Utc>,
    #[serde(default)]
    asset: Option<String>,
}

/// A version being assembled. Removed from disk when dropped uncommitted.
#[derive(Debug)]
pub struct StagingArea {
    identity: String,
    dir: TempDir,
}

impl StagingArea {
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Scratch space for downloads.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Directory whose contents become the committed version.
    pub fn content_dir(&self) -> PathBuf {
        self.dir.path().join(CONTENT_DIR)
    }
}

/// Package cache rooted at one directory, plus optional read-only search paths.
#[derive(Debug, Clone)]
pub struct PackageCache {
    root: PathBuf,
    search_paths: Vec<PathBuf>,
}

impl PackageCache {
    /// Open (creating if needed) the cache at `root`, purging stale staging
    /// directories.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| GridError::io_with_path(e, &root))?;
        let cache = Self {
            root,
            search_paths: Vec::new(),
        };
        cache.purge_staging()?;
        Ok(cache)
    }

    /// Also consider packages under `paths` (e.g. shipped with the installer).
    /// They use the same `<identity>/<version>/` layout and are never written.
    pub fn with_search_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.search_paths = paths;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    fn purge_staging(&self) -> Result<()> {
        let entries = std::fs::read_dir(&self.root).map_err(|e| GridError::io_with_path(e, &self.root))?;
        for entry in entries.filter_map(|e| e.ok()) {
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(PathsConfig::STAGING_PREFIX) {
                let path = entry.path();
                match std::fs::remove_dir_all(&path) {
                    Ok(()) => info!("Removed stale staging directory {}", path.display()),
                    Err(e) => warn!("Failed to remove stale staging directory {}: {}", path.display(), e),
                }
            }
        }
        Ok(())
    }

    fn check_identity(identity: &str) -> Result<()> {
        if identity.is_empty() || identity.starts_with('.') || identity.contains(['/', '\\']) {
            return Err(GridError::config(format!(
                "Invalid package identity {:?}",
                identity
            )));
        }
        Ok(())
    }

    /// Directory holding all versions of `identity`.
    pub fn identity_dir(&self, identity: &str) -> PathBuf {
        self.root.join(identity)
    }

    /// All versions of `identity`, oldest first. Never touches the network.
    pub fn list(&self, identity: &str) -> Result<Vec<PackageEntry>> {
        Self::check_identity(identity)?;
        if !self.root.is_dir() {
            return Err(GridError::CacheCorrupt {
                path: self.root.clone(),
                message: "cache root is missing".to_string(),
            });
        }

        let mut entries = scan_versions(&self.identity_dir(identity), identity, false)?;
        for search_path in &self.search_paths {
            match scan_versions(&search_path.join(identity), identity, true) {
                Ok(found) => entries.extend(found),
                Err(e) => warn!("Skipping search path {}: {}", search_path.display(), e),
            }
        }
        // Cached copies sort after shipped ones of the same version.
        entries.sort_by(|a, b| a.version.cmp(&b.version).then(b.shipped.cmp(&a.shipped)));
        Ok(entries)
    }

    /// Highest committed version of `identity`.
    pub fn latest(&self, identity: &str) -> Result<Option<PackageEntry>> {
        Ok(self.list(identity)?.pop())
    }

    /// Create a staging area for a new version of `identity`.
    pub fn stage(&self, identity: &str) -> Result<StagingArea> {
        Self::check_identity(identity)?;
        let dir = tempfile::Builder::new()
            .prefix(PathsConfig::STAGING_PREFIX)
            .tempdir_in(&self.root)
            .map_err(|e| GridError::io_with_path(e, &self.root))?;
        let content = dir.path().join(CONTENT_DIR);
        std::fs::create_dir_all(&content).map_err(|e| GridError::io_with_path(e, &content))?;
        debug!("Staging {} in {}", identity, dir.path().display());
        Ok(StagingArea {
            identity: identity.to_string(),
            dir,
        })
    }

    /// Commit the staged content as `version`.
    ///
    /// If the version is already committed the staged copy is discarded and
    /// the existing entry returned.
    pub fn commit(
        &self,
        staging: StagingArea,
        version: &Version,
        asset: Option<&str>,
    ) -> Result<PackageEntry> {
        let identity_dir = self.identity_dir(&staging.identity);
        let target = identity_dir.join(version.to_string());
        std::fs::create_dir_all(&identity_dir).map_err(|e| GridError::io_with_path(e, &identity_dir))?;

        if let Some(existing) = read_entry(&target, &staging.identity, false) {
            debug!("{} {} is already cached", staging.identity, version);
            return Ok(existing);
        }

        let downloaded_at = Utc::now();
        let marker = PackageMarker {
            identity: staging.identity.clone(),
            version: version.clone(),
            downloaded_at,
            asset: asset.map(String::from),
        };
        let content = staging.content_dir();
        atomic_write_json(&content.join(PathsConfig::PACKAGE_MARKER_FILENAME), &marker)?;

        std::fs::rename(&content, &target).map_err(|e| GridError::io_with_path(e, &target))?;
        info!("Committed {} {} to {}", staging.identity, version, target.display());

        Ok(PackageEntry {
            identity: staging.identity.clone(),
            version: version.clone(),
            location: target,
            downloaded_at: Some(downloaded_at),
            shipped: false,
        })
    }
}

fn scan_versions(dir: &Path, identity: &str, shipped: bool) -> Result<Vec<PackageEntry>> {
    let read = match std::fs::read_dir(dir) {
        Ok(read) => read,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(GridError::io_with_path(e, dir)),
    };
    Ok(read
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| read_entry(&e.path(), identity, shipped))
        .collect())
}

/// Read one version directory. Committed directories need a valid marker;
/// shipped ones only need a semver directory name.
fn read_entry(path: &Path, identity: &str, shipped: bool) -> Option<PackageEntry> {
    let name = path.file_name()?.to_string_lossy().into_owned();
    let version = match Version::parse(&name) {
        Ok(v) => v,
        Err(_) => {
            debug!("Ignoring non-version directory {}", path.display());
            return None;
        }
    };

    let marker_path = path.join(PathsConfig::PACKAGE_MARKER_FILENAME);
    let marker = match atomic_read_json::<PackageMarker>(&marker_path) {
        Ok(marker) => marker,
        Err(e) => {
            warn!("Ignoring {}: {}", path.display(), e);
            return None;
        }
    };
    if marker.is_none() && !shipped {
        debug!("Ignoring uncommitted directory {}", path.display());
        return None;
    }
    if let Some(marker) = &marker {
        if marker.version != version {
            warn!(
                "Ignoring {}: marker says {} but directory says {}",
                path.display(),
                marker.version,
                version
            );
            return None;
        }
    }

    Some(PackageEntry {
        identity: identity.to_string(),
        version,
        location: path.to_path_buf(),
        downloaded_at: marker.map(|m| m.downloaded_at),
        shipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit_version(cache: &PackageCache, identity: &str, version: &str) -> PackageEntry {
        let staging = cache.stage(identity).unwrap();
        std::fs::write(staging.content_dir().join("index.html"), version).unwrap();
        cache
            .commit(staging, &Version::parse(version).unwrap(), None)
            .unwrap()
    }

    #[test]
    fn test_empty_cache() {
        let temp_dir = TempDir::new().unwrap();
        let cache = PackageCache::open(temp_dir.path()).unwrap();
        assert!(cache.latest("grid-ui").unwrap().is_none());
        assert!(cache.list("grid-ui").unwrap().is_empty());
    }

    #[test]
    fn test_commit_and_latest() {
        let temp_dir = TempDir::new().unwrap();
        let cache = PackageCache::open(temp_dir.path()).unwrap();
        commit_version(&cache, "grid-ui", "1.0.0");
        commit_version(&cache, "grid-ui", "1.10.0");
        commit_version(&cache, "grid-ui", "1.2.0");

        let latest = cache.latest("grid-ui").unwrap().unwrap();
        assert_eq!(latest.version, Version::new(1, 10, 0));
        assert!(latest.location.join("index.html").exists());
        assert!(latest.downloaded_at.is_some());
        assert_eq!(cache.list("grid-ui").unwrap().len(), 3);
    }

    #[test]
    fn test_dropped_staging_leaves_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let cache = PackageCache::open(temp_dir.path()).unwrap();
        {
            let staging = cache.stage("grid-ui").unwrap();
            std::fs::write(staging.content_dir().join("index.html"), "x").unwrap();
        }
        assert!(cache.latest("grid-ui").unwrap().is_none());
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_open_purges_stale_staging() {
        let temp_dir = TempDir::new().unwrap();
        let stale = temp_dir.path().join(".staging-abc123");
        std::fs::create_dir_all(stale.join("package")).unwrap();
        PackageCache::open(temp_dir.path()).unwrap();
        assert!(!stale.exists());
    }

    #[test]
    fn test_directories_without_marker_are_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let cache = PackageCache::open(temp_dir.path()).unwrap();
        std::fs::create_dir_all(cache.identity_dir("grid-ui").join("9.9.9")).unwrap();
        std::fs::create_dir_all(cache.identity_dir("grid-ui").join("not-a-version")).unwrap();
        assert!(cache.latest("grid-ui").unwrap().is_none());
    }

    #[test]
    fn test_recommit_returns_existing() {
        let temp_dir = TempDir::new().unwrap();
        let cache = PackageCache::open(temp_dir.path()).unwrap();
        let first = commit_version(&cache, "grid-ui", "1.0.0");
        let second = commit_version(&cache, "grid-ui", "1.0.0");
        assert_eq!(first.location, second.location);
        assert_eq!(cache.list("grid-ui").unwrap().len(), 1);
    }

    #[test]
    fn test_shipped_search_path() {
        let temp_dir = TempDir::new().unwrap();
        let shipped = temp_dir.path().join("shipped");
        std::fs::create_dir_all(shipped.join("grid-ui").join("1.1.0")).unwrap();

        let cache = PackageCache::open(temp_dir.path().join("cache"))
            .unwrap()
            .with_search_paths(vec![shipped]);
        let latest = cache.latest("grid-ui").unwrap().unwrap();
        assert!(latest.shipped);
        assert_eq!(latest.version, Version::new(1, 1, 0));

        commit_version(&cache, "grid-ui", "1.1.0");
        assert!(!cache.latest("grid-ui").unwrap().unwrap().shipped);
    }

    #[test]
    fn test_invalid_identity() {
        let temp_dir = TempDir::new().unwrap();
        let cache = PackageCache::open(temp_dir.path()).unwrap();
        assert!(cache.list("../etc").unwrap_err().is_configuration());
        assert!(cache.stage(".staging-x").is_err());
    }
}
