//! Explicit wiring of the shell's components.
//!
//! There is no process-wide manager: build a [`GridContext`] once and pass it
//! (or the pieces it holds) to whoever needs them.

use crate::apps::{AppAggregator, AppLauncher, HttpRegistryClient, RegistryClient};
use crate::host::WindowHost;
use crate::package::{PackageCache, PackageResolver};
use grid_core::config::PathsConfig;
use grid_core::platform::grid_data_dir;
use grid_core::{
    ClientPluginRegistry, GitHubReleaseSource, JsonFileConfig, PlatformEnv, ReleaseSource, Result,
    UserConfig,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Everything the shell needs, built by [`GridContextBuilder`].
pub struct GridContext {
    data_dir: PathBuf,
    env: PlatformEnv,
    clients: Arc<ClientPluginRegistry>,
    user_config: Arc<dyn UserConfig>,
    resolver: Arc<PackageResolver>,
    aggregator: AppAggregator,
}

impl GridContext {
    pub fn builder(data_dir: impl Into<PathBuf>) -> GridContextBuilder {
        GridContextBuilder::new(data_dir)
    }

    /// Builder rooted at the platform data directory.
    pub fn default_builder() -> Result<GridContextBuilder> {
        Ok(GridContextBuilder::new(grid_data_dir()?))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn env(&self) -> &PlatformEnv {
        &self.env
    }

    pub fn clients(&self) -> &Arc<ClientPluginRegistry> {
        &self.clients
    }

    pub fn user_config(&self) -> &Arc<dyn UserConfig> {
        &self.user_config
    }

    /// Resolver for the Grid UI bundle.
    pub fn resolver(&self) -> &Arc<PackageResolver> {
        &self.resolver
    }

    pub fn aggregator(&self) -> &AppAggregator {
        &self.aggregator
    }

    /// Launcher opening windows on `host`.
    pub fn launcher(&self, host: Arc<dyn WindowHost>) -> AppLauncher {
        AppLauncher::new(host, Arc::clone(&self.resolver), Arc::clone(&self.clients))
    }
}

/// Builder for [`GridContext`].
///
/// # Example
///
/// ```rust,ignore
/// use grid_app_manager::GridContext;
///
/// let context = GridContext::builder("/tmp/grid")
///     .with_dev_server(true)
///     .build()?;
/// let location = context.resolver().resolve().await;
/// ```
pub struct GridContextBuilder {
    data_dir: PathBuf,
    env: Option<PlatformEnv>,
    search_paths: Vec<PathBuf>,
    user_config: Option<Arc<dyn UserConfig>>,
    release_source: Option<Arc<dyn ReleaseSource>>,
    registry_client: Option<Arc<dyn RegistryClient>>,
    dev_server: bool,
    include_prereleases: bool,
}

impl GridContextBuilder {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            env: None,
            search_paths: Vec::new(),
            user_config: None,
            release_source: None,
            registry_client: None,
            dev_server: false,
            include_prereleases: false,
        }
    }

    /// Platform snapshot used for client paths. Default: detected.
    pub fn with_env(mut self, env: PlatformEnv) -> Self {
        self.env = Some(env);
        self
    }

    /// Read-only directories with packages shipped alongside the shell.
    pub fn with_search_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.search_paths = paths;
        self
    }

    /// Default: `config.json` in the data directory.
    pub fn with_user_config(mut self, config: Arc<dyn UserConfig>) -> Self {
        self.user_config = Some(config);
        self
    }

    /// Default: GitHub releases.
    pub fn with_release_source(mut self, source: Arc<dyn ReleaseSource>) -> Self {
        self.release_source = Some(source);
        self
    }

    /// Default: HTTP.
    pub fn with_registry_client(mut self, client: Arc<dyn RegistryClient>) -> Self {
        self.registry_client = Some(client);
        self
    }

    /// Prefer a running Grid UI dev server. Default: `false`.
    pub fn with_dev_server(mut self, enable: bool) -> Self {
        self.dev_server = enable;
        self
    }

    pub fn with_prereleases(mut self, include: bool) -> Self {
        self.include_prereleases = include;
        self
    }

    pub fn build(self) -> Result<GridContext> {
        let env = match self.env {
            Some(env) => env,
            None => PlatformEnv::detect()?,
        };

        let mut clients = ClientPluginRegistry::with_builtin();
        let clients_dir = self.data_dir.join(PathsConfig::CLIENTS_DIR_NAME);
        if clients_dir.is_dir() {
            clients.load_dir(&clients_dir)?;
        }

        let user_config = match self.user_config {
            Some(config) => config,
            None => Arc::new(JsonFileConfig::new(
                self.data_dir.join(PathsConfig::USER_CONFIG_FILENAME),
            )),
        };
        let release_source = match self.release_source {
            Some(source) => source,
            None => Arc::new(GitHubReleaseSource::new()?),
        };
        let registry_client = match self.registry_client {
            Some(client) => client,
            None => Arc::new(HttpRegistryClient::new()?),
        };

        let cache = PackageCache::open(self.data_dir.join(PathsConfig::CACHE_DIR_NAME))?
            .with_search_paths(self.search_paths);
        let mut resolver = PackageResolver::grid_ui(cache, release_source)
            .with_platform(env.platform)
            .with_prereleases(self.include_prereleases);
        if self.dev_server {
            resolver = resolver.with_default_dev_server();
        }

        info!(
            "Grid context ready at {} ({} clients)",
            self.data_dir.display(),
            clients.list_all().len()
        );
        Ok(GridContext {
            data_dir: self.data_dir,
            env,
            clients: Arc::new(clients),
            aggregator: AppAggregator::new(Arc::clone(&user_config), registry_client),
            user_config,
            resolver: Arc::new(resolver),
        })
    }
}
