//! Grid Core - client descriptors, release sources and shared plumbing for the
//! Grid shell.
//!
//! This crate knows how Ethereum clients are configured (data directories,
//! control endpoints, command-line flags) and how versioned packages are
//! published remotely. Package caching, UI resolution and app launching live
//! in the `grid-app-manager` crate.
//!
//! # Example
//!
//! ```rust,ignore
//! use grid_core::{ClientPluginRegistry, PlatformEnv, SettingValues};
//!
//! let registry = ClientPluginRegistry::with_builtin();
//! let env = PlatformEnv::detect()?;
//!
//! let mut values = SettingValues::new();
//! values.insert("network".into(), "ropsten".into());
//! let flags = registry.render_flags("parity", &values)?;
//! println!("{:?}", flags.to_argv());
//! println!("{}", registry.control_endpoint("parity", &env, &values)?.display());
//! ```

pub mod cancel;
pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod network;
pub mod platform;
pub mod storage;
pub mod user_config;

pub use cancel::CancellationToken;
pub use clients::{
    ClientPluginDescriptor, ClientPluginRegistry, CliFlags, FlagFragment, RejectedDescriptor,
    SettingKind, SettingValues,
};
pub use error::{GridError, Result};
pub use models::{
    AppEntry, AppSource, HotLoadReason, PackageEntry, RegistryDocument, ResolvedBundleLocation,
};
pub use network::{
    GitHubReleaseSource, LivenessProbe, Release, ReleaseAsset, ReleaseBinding, ReleaseSource,
    TcpProbe,
};
pub use platform::{Platform, PlatformEnv};
pub use user_config::{JsonFileConfig, MemoryConfig, UserConfig};
