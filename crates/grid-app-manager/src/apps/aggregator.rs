//! Merging launchable apps from every source.
//!
//! Order is fixed: the manifest bundled with the shell, then apps the user
//! added to their config, then each configured registry in configuration
//! order. A source that fails contributes nothing; the others are unaffected.
//! Entries are not deduplicated.

use super::registry_client::RegistryClient;
use futures::future::join_all;
use grid_core::config::UserConfigKeys;
use grid_core::user_config::read_list;
use grid_core::{AppEntry, AppSource, GridError, Result, UserConfig};
use std::sync::Arc;
use tracing::{debug, warn};

/// Apps compiled into the shell.
pub const BUNDLED_APPS: &str = include_str!("../../assets/apps.json");

/// A source that contributed nothing because it failed.
#[derive(Debug)]
pub struct SourceFailure {
    pub stage: AppSource,
    /// Registry URL or config key.
    pub origin: String,
    pub error: GridError,
}

/// Result of [`AppAggregator::list_all_with_report`].
#[derive(Debug, Default)]
pub struct AppListing {
    pub apps: Vec<AppEntry>,
    pub failures: Vec<SourceFailure>,
}

pub struct AppAggregator {
    bundled_manifest: String,
    user_config: Arc<dyn UserConfig>,
    registries: Arc<dyn RegistryClient>,
}

impl AppAggregator {
    pub fn new(user_config: Arc<dyn UserConfig>, registries: Arc<dyn RegistryClient>) -> Self {
        Self {
            bundled_manifest: BUNDLED_APPS.to_string(),
            user_config,
            registries,
        }
    }

    /// Replace the bundled manifest (a JSON array of apps).
    pub fn with_bundled_manifest(mut self, manifest: impl Into<String>) -> Self {
        self.bundled_manifest = manifest.into();
        self
    }

    pub fn bundled_apps(&self) -> Result<Vec<AppEntry>> {
        let apps: Vec<AppEntry> = serde_json::from_str(&self.bundled_manifest)?;
        Ok(stamp(apps, AppSource::Bundled))
    }

    pub fn user_apps(&self) -> Result<Vec<AppEntry>> {
        let apps = read_list(self.user_config.as_ref(), UserConfigKeys::APPS)?;
        Ok(stamp(apps, AppSource::UserConfig))
    }

    /// Configured registry URLs.
    pub fn registry_urls(&self) -> Result<Vec<String>> {
        read_list(self.user_config.as_ref(), UserConfigKeys::REGISTRIES)
    }

    /// Every app from every source. Never fails.
    pub async fn list_all(&self) -> Vec<AppEntry> {
        self.list_all_with_report().await.apps
    }

    /// Every app, plus the sources that failed.
    pub async fn list_all_with_report(&self) -> AppListing {
        let mut listing = AppListing::default();

        match self.bundled_apps() {
            Ok(apps) => listing.apps.extend(apps),
            Err(error) => listing.record(AppSource::Bundled, "apps.json", error),
        }
        match self.user_apps() {
            Ok(apps) => listing.apps.extend(apps),
            Err(error) => listing.record(AppSource::UserConfig, UserConfigKeys::APPS, error),
        }

        let urls = match self.registry_urls() {
            Ok(urls) => urls,
            Err(error) => {
                listing.record(AppSource::Registry, UserConfigKeys::REGISTRIES, error);
                Vec::new()
            }
        };
        let fetches = urls.iter().map(|url| self.registries.fetch(url));
        for (url, result) in urls.iter().zip(join_all(fetches).await) {
            match result {
                Ok(document) => {
                    debug!("Registry {} listed {} apps", url, document.apps.len());
                    listing.apps.extend(stamp(document.apps, AppSource::Registry));
                }
                Err(error) => listing.record(AppSource::Registry, url, error),
            }
        }

        listing
    }
}

impl AppListing {
    fn record(&mut self, stage: AppSource, origin: &str, error: GridError) {
        warn!("Could not load apps from {}: {}", origin, error);
        self.failures.push(SourceFailure {
            stage,
            origin: origin.to_string(),
            error,
        });
    }
}

fn stamp(apps: Vec<AppEntry>, source: AppSource) -> Vec<AppEntry> {
    apps.into_iter().map(|a| a.with_source(source)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use grid_core::{MemoryConfig, RegistryDocument};
    use serde_json::json;

    struct NoRegistries;

    #[async_trait]
    impl RegistryClient for NoRegistries {
        async fn fetch(&self, url: &str) -> Result<RegistryDocument> {
            Err(GridError::SourceUnavailable {
                source_name: url.to_string(),
                message: "offline".to_string(),
            })
        }
    }

    #[test]
    fn test_bundled_manifest_parses() {
        let aggregator = AppAggregator::new(Arc::new(MemoryConfig::new()), Arc::new(NoRegistries));
        let apps = aggregator.bundled_apps().unwrap();
        assert_eq!(apps[0].name, "grid-ui");
        assert!(apps.iter().all(|a| a.source == AppSource::Bundled));
    }

    #[tokio::test]
    async fn test_broken_bundled_manifest_degrades() {
        let config = MemoryConfig::new().with_item("apps", json!([{"name": "mine"}]));
        let aggregator = AppAggregator::new(Arc::new(config), Arc::new(NoRegistries))
            .with_bundled_manifest("not json");
        let listing = aggregator.list_all_with_report().await;
        let names: Vec<&str> = listing.apps.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["mine"]);
        assert_eq!(listing.failures.len(), 1);
        assert_eq!(listing.failures[0].stage, AppSource::Bundled);
    }

    #[tokio::test]
    async fn test_malformed_user_config_degrades() {
        let config = MemoryConfig::new()
            .with_item("apps", json!("oops"))
            .with_item("registries", json!(42));
        let aggregator = AppAggregator::new(Arc::new(config), Arc::new(NoRegistries));
        let listing = aggregator.list_all_with_report().await;
        assert_eq!(listing.apps.len(), 1);
        assert_eq!(listing.failures.len(), 2);
    }
}
