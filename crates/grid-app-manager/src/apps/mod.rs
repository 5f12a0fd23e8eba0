//! Launchable applications: discovery and launching.

mod aggregator;
mod launcher;
mod registry_client;

pub use aggregator::{AppAggregator, AppListing, SourceFailure, BUNDLED_APPS};
pub use launcher::AppLauncher;
pub use registry_client::{HttpRegistryClient, RegistryClient};
