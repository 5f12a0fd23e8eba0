//! Blockchain client descriptors.
//!
//! Each supported client is described by static data: its data directory per
//! platform, the control endpoint inside it, its binary name and a settings
//! schema that renders to command-line flags. Descriptors come from code
//! ([`builtin`]) or from JSON files loaded into the [`ClientPluginRegistry`].

pub mod builtin;
mod flags;
mod registry;
mod schema;

pub use flags::{CliFlags, FlagFragment};
pub use registry::{ClientPluginRegistry, RejectedDescriptor};
pub use schema::{
    BinaryName, ClientPluginDescriptor, ClientSetting, SettingKind, SettingOption, SettingValues,
};
