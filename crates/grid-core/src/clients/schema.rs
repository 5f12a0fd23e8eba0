//! Client descriptor schema.
//!
//! Defines the static description of a blockchain client binary: where its
//! data lives on each platform, which binary to run and how its settings turn
//! into command-line flags. Descriptors can be built in code or loaded from
//! JSON files.

use super::flags::{CliFlags, FlagFragment};
use crate::error::{GridError, Result};
use crate::network::ReleaseBinding;
use crate::platform::{PathTemplate, Platform, PlatformEnv};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

/// User-chosen setting values, keyed by setting key.
pub type SettingValues = HashMap<String, String>;

/// One selectable value of an enumerated setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingOption {
    pub value: String,
    pub label: String,
    /// Command-line fragment emitted verbatim when this option is active.
    pub flag: String,
}

/// How a setting maps onto the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SettingKind {
    /// A fixed list of options, each owning exactly one flag.
    Enumerated { options: Vec<SettingOption> },
    /// A freeform value substituted into the first `%s` of `pattern`.
    Templated { pattern: String },
}

impl SettingKind {
    /// Render the flag fragment for `value`.
    pub fn render(&self, key: &str, value: &str) -> Result<FlagFragment> {
        match self {
            SettingKind::Enumerated { options } => options
                .iter()
                .find(|o| o.value == value)
                .map(|o| FlagFragment::Verbatim(o.flag.clone()))
                .ok_or_else(|| GridError::InvalidSettingValue {
                    key: key.to_string(),
                    value: value.to_string(),
                }),
            SettingKind::Templated { pattern } => Ok(FlagFragment::Templated {
                pattern: pattern.clone(),
                value: value.to_string(),
            }),
        }
    }
}

/// A single configurable client setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSetting {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(flatten)]
    pub kind: SettingKind,
}

/// Binary file name, optionally overridden per platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryName {
    pub default: String,
    #[serde(default)]
    pub overrides: BTreeMap<Platform, String>,
}

impl BinaryName {
    pub fn for_platform(&self, platform: Platform) -> &str {
        self.overrides
            .get(&platform)
            .map(String::as_str)
            .unwrap_or(&self.default)
    }
}

/// Complete static description of a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPluginDescriptor {
    /// Stable identifier (e.g., "parity").
    pub name: String,
    /// Label for the UI.
    pub display_name: String,
    /// Listing position (lower comes first).
    #[serde(default = "default_order")]
    pub order: i32,
    /// Where release binaries for this client are published.
    #[serde(default)]
    pub release: Option<ReleaseBinding>,
    /// Data directory template per platform.
    pub platform_base_path: BTreeMap<Platform, PathTemplate>,
    /// File name of the control endpoint inside the data directory.
    #[serde(default = "default_endpoint_file")]
    pub control_endpoint_file: String,
    /// Key of the setting that overrides the control endpoint.
    #[serde(default)]
    pub ipc_setting: Option<String>,
    pub binary_name: BinaryName,
    /// Settings in declaration order.
    #[serde(default)]
    pub settings: Vec<ClientSetting>,
}

fn default_order() -> i32 {
    100
}

fn default_endpoint_file() -> String {
    "jsonrpc.ipc".to_string()
}

impl ClientPluginDescriptor {
    /// Check the descriptor's internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(GridError::config("Client descriptor has an empty name"));
        }
        if self.display_name.trim().is_empty() {
            return Err(GridError::config(format!(
                "Client '{}' has an empty displayName",
                self.name
            )));
        }
        if self.platform_base_path.is_empty() {
            return Err(GridError::config(format!(
                "Client '{}' declares no platform base paths",
                self.name
            )));
        }
        if let Some(template) = self.platform_base_path.get(&Platform::Windows) {
            if template.as_str().starts_with('~') {
                return Err(GridError::config(format!(
                    "Client '{}' uses ~ in its Windows base path; use {{env:USERPROFILE}}",
                    self.name
                )));
            }
        }
        if self.binary_name.default.trim().is_empty() {
            return Err(GridError::config(format!(
                "Client '{}' has an empty binary name",
                self.name
            )));
        }
        if self.control_endpoint_file.trim().is_empty() {
            return Err(GridError::config(format!(
                "Client '{}' has an empty control endpoint file",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for setting in &self.settings {
            if setting.key.is_empty() || !seen.insert(setting.key.as_str()) {
                return Err(GridError::config(format!(
                    "Client '{}' has an empty or duplicate setting key {:?}",
                    self.name, setting.key
                )));
            }
            match &setting.kind {
                SettingKind::Enumerated { options } => {
                    if options.is_empty() {
                        return Err(GridError::config(format!(
                            "Setting '{}.{}' has no options",
                            self.name, setting.key
                        )));
                    }
                    if let Some(default) = &setting.default {
                        if !options.iter().any(|o| &o.value == default) {
                            return Err(GridError::config(format!(
                                "Default {:?} of '{}.{}' is not one of its options",
                                default, self.name, setting.key
                            )));
                        }
                    }
                }
                SettingKind::Templated { pattern } => {
                    if !pattern.contains("%s") {
                        return Err(GridError::config(format!(
                            "Pattern of '{}.{}' has no %s placeholder",
                            self.name, setting.key
                        )));
                    }
                }
            }
        }

        if let Some(key) = &self.ipc_setting {
            match self.setting(key).map(|s| &s.kind) {
                Some(SettingKind::Templated { .. }) => {}
                _ => {
                    return Err(GridError::config(format!(
                        "ipcSetting '{}' of '{}' must name a templated setting",
                        key, self.name
                    )))
                }
            }
        }

        Ok(())
    }

    /// Look up a setting by key.
    pub fn setting(&self, key: &str) -> Option<&ClientSetting> {
        self.settings.iter().find(|s| s.key == key)
    }

    /// Binary name on `platform`.
    pub fn binary_name(&self, platform: Platform) -> &str {
        self.binary_name.for_platform(platform)
    }

    /// Data directory on the platform described by `env`.
    pub fn base_path(&self, env: &PlatformEnv) -> Result<PathBuf> {
        self.platform_base_path
            .get(&env.platform)
            .ok_or_else(|| GridError::UnsupportedPlatform {
                client: self.name.clone(),
                platform: env.platform.to_string(),
            })?
            .expand(env)
    }

    /// Resolve the control endpoint path.
    ///
    /// A value for the ipc setting wins; otherwise the endpoint file inside the
    /// platform data directory is used.
    pub fn control_endpoint(&self, env: &PlatformEnv, values: &SettingValues) -> Result<PathBuf> {
        if let Some(custom) = self
            .ipc_setting
            .as_ref()
            .and_then(|key| values.get(key))
            .filter(|v| !v.trim().is_empty())
        {
            return Ok(PathBuf::from(custom));
        }
        Ok(self.base_path(env)?.join(&self.control_endpoint_file))
    }

    /// Render flags for the supplied values only, in declaration order.
    pub fn render_flags(&self, values: &SettingValues) -> Result<CliFlags> {
        self.check_keys(values)?;
        let mut flags = CliFlags::default();
        for setting in &self.settings {
            if let Some(value) = values.get(&setting.key) {
                flags.push(setting.kind.render(&setting.key, value)?);
            }
        }
        Ok(flags)
    }

    /// Render flags for every setting, falling back to defaults.
    ///
    /// The ipc setting defaults to the resolved control endpoint.
    pub fn render_flags_with_defaults(
        &self,
        env: &PlatformEnv,
        values: &SettingValues,
    ) -> Result<CliFlags> {
        self.check_keys(values)?;
        let mut flags = CliFlags::default();
        for setting in &self.settings {
            let value = match values.get(&setting.key) {
                Some(v) => v.clone(),
                None if self.ipc_setting.as_deref() == Some(setting.key.as_str()) => self
                    .control_endpoint(env, values)?
                    .to_string_lossy()
                    .into_owned(),
                None => match &setting.default {
                    Some(d) => d.clone(),
                    None => continue,
                },
            };
            flags.push(setting.kind.render(&setting.key, &value)?);
        }
        Ok(flags)
    }

    fn check_keys(&self, values: &SettingValues) -> Result<()> {
        for key in values.keys() {
            if self.setting(key).is_none() {
                return Err(GridError::SettingNotFound {
                    client: self.name.clone(),
                    key: key.clone(),
                });
            }
        }
        Ok(())
    }
}
