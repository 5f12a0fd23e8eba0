//! Centralized configuration constants for the Grid shell.
//!
//! Runtime, user-editable settings live behind [`crate::user_config::UserConfig`];
//! this module only holds the fixed defaults the engine is built around.

use std::time::Duration;

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const APP_NAME: &'static str = "Grid";
    pub const USER_AGENT: &'static str = "Grid-Shell/0.1";
}

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
    pub const DOWNLOAD_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
    pub const DOWNLOAD_PROGRESS_INTERVAL: Duration = Duration::from_millis(500);
    pub const DOWNLOAD_TEMP_SUFFIX: &'static str = ".part";
    pub const DOWNLOAD_RETRY_ATTEMPTS: u32 = 3;
    pub const GITHUB_API_BASE: &'static str = "https://api.github.com";
    pub const GITHUB_RELEASES_PER_PAGE: u32 = 100;
    pub const GITHUB_RELEASES_MAX_PAGES: u32 = 3;
    pub const GITHUB_RELEASES_TTL: Duration = Duration::from_secs(600);
    /// Upper bound for a liveness probe against a dev server.
    pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);
}

/// Background update schedule defaults.
pub struct UpdateConfig;

impl UpdateConfig {
    pub const FIRST_CHECK_DELAY: Duration = Duration::from_secs(60);
    pub const CHECK_INTERVAL: Duration = Duration::from_secs(60 * 60);
}

/// Directory and file names.
pub struct PathsConfig;

impl PathsConfig {
    pub const APP_DIR_NAME: &'static str = "grid";
    pub const CACHE_DIR_NAME: &'static str = "packages";
    pub const CLIENTS_DIR_NAME: &'static str = "clients";
    pub const USER_CONFIG_FILENAME: &'static str = "config.json";
    pub const PACKAGE_MARKER_FILENAME: &'static str = ".grid-package.json";
    pub const STAGING_PREFIX: &'static str = ".staging-";
}

/// The built-in UI package and its development/hot-load endpoints.
pub struct GridUiConfig;

impl GridUiConfig {
    pub const PACKAGE_NAME: &'static str = "grid-ui";
    pub const REPOSITORY: &'static str = "ethereum/grid-ui";
    pub const HOT_LOAD_URL: &'static str = "package://github.com/ethereum/grid-ui";
    pub const DEV_HOST: &'static str = "localhost";
    pub const DEV_PORT: u16 = 3080;
    pub const DEFAULT_APP_URL: &'static str = "http://localhost:3000";
    pub const TERMINAL_PAGE: &'static str = "ui/terminal.html";

    /// URL served by a locally running UI dev server.
    pub fn dev_url() -> String {
        format!("http://{}:{}/index.html", Self::DEV_HOST, Self::DEV_PORT)
    }
}

/// Keys read from the persisted user configuration.
pub struct UserConfigKeys;

impl UserConfigKeys {
    pub const REGISTRIES: &'static str = "registries";
    pub const APPS: &'static str = "apps";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_check_precedes_interval() {
        assert!(UpdateConfig::FIRST_CHECK_DELAY < UpdateConfig::CHECK_INTERVAL);
    }

    #[test]
    fn test_probe_timeout_is_short() {
        assert!(NetworkConfig::PROBE_TIMEOUT > Duration::ZERO);
        assert!(NetworkConfig::PROBE_TIMEOUT < Duration::from_secs(10));
    }

    #[test]
    fn test_dev_url() {
        assert_eq!(GridUiConfig::dev_url(), "http://localhost:3080/index.html");
    }
}
