//! Client descriptor registry.
//!
//! Holds every known [`ClientPluginDescriptor`] in listing order and renders
//! their platform paths and command lines. A descriptor that fails validation
//! is rejected on its own; the rest of the registry stays usable.

use super::builtin;
use super::flags::CliFlags;
use super::schema::{ClientPluginDescriptor, SettingValues};
use crate::error::{GridError, Result};
use crate::platform::{Platform, PlatformEnv};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A descriptor that could not be registered.
#[derive(Debug)]
pub struct RejectedDescriptor {
    /// File path or client name the descriptor came from.
    pub origin: String,
    pub error: GridError,
}

/// Registry of client descriptors.
#[derive(Debug, Default)]
pub struct ClientPluginRegistry {
    descriptors: Vec<ClientPluginDescriptor>,
    rejected: Vec<RejectedDescriptor>,
}

impl ClientPluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in descriptors.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for descriptor in builtin::all() {
            registry.register_or_reject(descriptor.name.clone(), descriptor);
        }
        registry
    }

    /// Validate and add a descriptor.
    ///
    /// Names are unique; a second descriptor with an existing name is rejected.
    pub fn register(&mut self, descriptor: ClientPluginDescriptor) -> Result<()> {
        descriptor.validate()?;
        if self.descriptors.iter().any(|d| d.name == descriptor.name) {
            return Err(GridError::config(format!(
                "Client '{}' is already registered",
                descriptor.name
            )));
        }

        debug!("Registered client {} ({})", descriptor.display_name, descriptor.name);
        self.descriptors.push(descriptor);
        self.descriptors
            .sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
        Ok(())
    }

    fn register_or_reject(&mut self, origin: String, descriptor: ClientPluginDescriptor) -> bool {
        match self.register(descriptor) {
            Ok(()) => true,
            Err(error) => {
                warn!("Rejected client descriptor from {}: {}", origin, error);
                self.rejected.push(RejectedDescriptor { origin, error });
                false
            }
        }
    }

    /// Load every `*.json` descriptor in `dir`.
    ///
    /// Unreadable, unparseable or invalid files are recorded in
    /// [`rejected`](Self::rejected). Returns the number of descriptors added.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| GridError::Io {
            message: format!("Failed to read clients directory: {}", e),
            path: Some(dir.to_path_buf()),
            source: Some(e),
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|e| e == "json").unwrap_or(false))
            .collect();
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            let origin = path.display().to_string();
            match Self::read_descriptor(&path) {
                Ok(descriptor) => {
                    if self.register_or_reject(origin, descriptor) {
                        loaded += 1;
                    }
                }
                Err(error) => {
                    warn!("Failed to load client descriptor {}: {}", origin, error);
                    self.rejected.push(RejectedDescriptor { origin, error });
                }
            }
        }

        info!("Loaded {} client descriptors from {}", loaded, dir.display());
        Ok(loaded)
    }

    fn read_descriptor(path: &Path) -> Result<ClientPluginDescriptor> {
        let content = std::fs::read_to_string(path).map_err(|e| GridError::io_with_path(e, path))?;
        serde_json::from_str(&content).map_err(|e| {
            GridError::config(format!(
                "Malformed client descriptor {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Look up a descriptor by name.
    pub fn describe(&self, name: &str) -> Result<&ClientPluginDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| GridError::ClientNotFound {
                name: name.to_string(),
            })
    }

    /// All descriptors, ordered by `order` then name.
    pub fn list_all(&self) -> &[ClientPluginDescriptor] {
        &self.descriptors
    }

    /// Descriptors rejected during construction.
    pub fn rejected(&self) -> &[RejectedDescriptor] {
        &self.rejected
    }

    /// Resolved control endpoint of `name` on the platform described by `env`.
    pub fn control_endpoint(
        &self,
        name: &str,
        env: &PlatformEnv,
        values: &SettingValues,
    ) -> Result<PathBuf> {
        self.describe(name)?.control_endpoint(env, values)
    }

    /// Binary file name of `name` on `platform`.
    pub fn binary_name(&self, name: &str, platform: Platform) -> Result<&str> {
        Ok(self.describe(name)?.binary_name(platform))
    }

    /// Flags for the supplied setting values, in schema order.
    pub fn render_flags(&self, name: &str, values: &SettingValues) -> Result<CliFlags> {
        self.describe(name)?.render_flags(values)
    }

    /// Flags for every setting of `name`, defaults filled in.
    pub fn render_flags_with_defaults(
        &self,
        name: &str,
        env: &PlatformEnv,
        values: &SettingValues,
    ) -> Result<CliFlags> {
        self.describe(name)?.render_flags_with_defaults(env, values)
    }
}
