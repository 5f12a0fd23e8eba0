//! Platform-specific path utilities.
//!
//! Client descriptors carry their data directories as small templates:
//!
//! - a leading `~` expands to the home directory (not on Windows, where the
//!   shell-reported home is not the profile directory clients write to),
//! - `{home}` expands to the home directory,
//! - `{env:NAME}` expands to the environment variable `NAME`.
//!
//! Expansion reads from a [`PlatformEnv`] snapshot instead of the live process
//! environment, so the same template resolves identically on repeated calls.

use super::Platform;
use crate::config::PathsConfig;
use crate::error::{GridError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Snapshot of the environment inputs path templates may depend on.
#[derive(Debug, Clone)]
pub struct PlatformEnv {
    pub platform: Platform,
    pub home: PathBuf,
    vars: HashMap<String, String>,
}

impl PlatformEnv {
    /// Create an environment for `platform` with an explicit home directory.
    pub fn new(platform: Platform, home: impl Into<PathBuf>) -> Self {
        Self {
            platform,
            home: home.into(),
            vars: HashMap::new(),
        }
    }

    /// Add an environment variable visible to `{env:NAME}` placeholders.
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Capture the running process's platform, home directory and environment.
    pub fn detect() -> Result<Self> {
        let platform = Platform::current()?;
        let home = dirs::home_dir()
            .ok_or_else(|| GridError::config("Could not determine home directory"))?;
        Ok(Self {
            platform,
            home,
            vars: std::env::vars().collect(),
        })
    }

    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }
}

/// A path with `~`, `{home}` and `{env:NAME}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathTemplate(String);

impl PathTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Expand all placeholders against `env`.
    ///
    /// A leading `~` is a configuration error on Windows; templates there
    /// must name `{env:USERPROFILE}` or `{env:APPDATA}`.
    pub fn expand(&self, env: &PlatformEnv) -> Result<PathBuf> {
        let home = env.home.to_string_lossy();
        let mut rest = self.0.as_str();
        let mut out = String::with_capacity(rest.len() + home.len());

        if rest.starts_with('~') && env.platform == Platform::Windows {
            return Err(GridError::config(format!(
                "{:?} uses ~, which is not supported on Windows; use {{env:USERPROFILE}}",
                self.0
            )));
        }
        if rest == "~" || rest.starts_with("~/") {
            out.push_str(&home);
            rest = &rest[1..];
        }

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let end = rest[start..].find('}').map(|i| start + i).ok_or_else(|| {
                GridError::config(format!("Unterminated placeholder in {:?}", self.0))
            })?;
            let token = &rest[start + 1..end];

            if token == "home" {
                out.push_str(&home);
            } else if let Some(name) = token.strip_prefix("env:") {
                let value = env.var(name).ok_or_else(|| {
                    GridError::config(format!(
                        "Environment variable {} is required by {:?} but not set",
                        name, self.0
                    ))
                })?;
                out.push_str(value);
            } else {
                return Err(GridError::config(format!(
                    "Unknown placeholder {{{}}} in {:?}",
                    token, self.0
                )));
            }
            rest = &rest[end + 1..];
        }
        out.push_str(rest);

        if out.is_empty() {
            return Err(GridError::config("Path template expanded to an empty path"));
        }
        Ok(PathBuf::from(out))
    }
}

impl From<&str> for PathTemplate {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Get Grid's own data directory.
///
/// # Platform Behavior
/// - **Linux**: `~/.local/share/grid`
/// - **Windows**: `%APPDATA%\grid`
/// - **macOS**: `~/Library/Application Support/grid`
pub fn grid_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| GridError::config("Could not determine platform data directory"))?;
    Ok(data_dir.join(PathsConfig::APP_DIR_NAME))
}
