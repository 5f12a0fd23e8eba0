//! Platform abstraction layer.
//!
//! All operating-system specific decisions of the engine go through
//! [`Platform`] and [`PlatformEnv`] so that descriptor resolution stays a pure
//! function of its inputs and can be exercised for every platform from any host.
//!
//! - `paths` - Path template expansion and Grid's own data directories

pub mod paths;

pub use paths::{grid_data_dir, PathTemplate, PlatformEnv};

use crate::error::{GridError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating systems the shell knows how to describe clients for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[serde(alias = "win32")]
    Windows,
    Linux,
    #[serde(alias = "darwin")]
    MacOs,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Windows, Platform::Linux, Platform::MacOs];

    /// Platform of the running process.
    ///
    /// An operating system outside [`Platform::ALL`] is a configuration error,
    /// never a silent default.
    pub fn current() -> Result<Self> {
        Self::parse(std::env::consts::OS)
    }

    /// Parse an OS identifier. Accepts both Rust (`windows`, `macos`) and
    /// Node-style (`win32`, `darwin`) spellings.
    pub fn parse(os: &str) -> Result<Self> {
        match os.to_lowercase().as_str() {
            "windows" | "win32" => Ok(Platform::Windows),
            "linux" => Ok(Platform::Linux),
            "macos" | "darwin" => Ok(Platform::MacOs),
            other => Err(GridError::config(format!(
                "Unrecognized platform: {}",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::Linux => "linux",
            Platform::MacOs => "macos",
        }
    }

    /// Identifier used in release asset names (`win32`, `linux`, `darwin`).
    pub fn asset_prefix(&self) -> &'static str {
        match self {
            Platform::Windows => "win32",
            Platform::Linux => "linux",
            Platform::MacOs => "darwin",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
