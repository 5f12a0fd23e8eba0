//! Grid App Manager - package cache, UI bundle resolution and app launching.
//!
//! Builds on `grid-core` to decide which UI bundle the shell opens, keep
//! the package cache current in the background and turn app entries into
//! windows on an injected host.
//!
//! # Modules
//!
//! - `package` - Package cache, archive unpacking and the bundle resolver
//! - `apps` - App discovery across sources and launching
//! - `host` - Window, dialog and notification capabilities
//! - `context` - Explicit wiring of all of the above

pub mod apps;
pub mod context;
pub mod host;
pub mod package;

// Re-export commonly used types
pub use apps::{
    AppAggregator, AppLauncher, AppListing, HttpRegistryClient, RegistryClient, SourceFailure,
};
pub use context::{GridContext, GridContextBuilder};
pub use host::{
    DialogOutcome, DialogRequest, LaunchContext, NotificationOutcome, PathKind, Placement,
    PlatformDialogs, PlatformNotifier, WindowHandle, WindowHost,
};
pub use package::{
    DownloadSlots, PackageCache, PackageResolver, UpdateNotice, UpdateOutcome, UpdateSchedule,
};

// Re-export grid-core types that are commonly needed with the app manager
pub use grid_core::error::{GridError, Result};
