//! Descriptors compiled into the shell.

use super::schema::{BinaryName, ClientPluginDescriptor, ClientSetting, SettingKind, SettingOption};
use crate::network::ReleaseBinding;
use crate::platform::{PathTemplate, Platform};
use std::collections::BTreeMap;

fn option(value: &str, label: &str, flag: &str) -> SettingOption {
    SettingOption {
        value: value.to_string(),
        label: label.to_string(),
        flag: flag.to_string(),
    }
}

/// Parity Ethereum.
///
/// On Windows the data directory is derived from `USERPROFILE`; the home
/// shorthand does not point at the roaming profile there. On macOS the
/// expanded home directory is used instead of a literal `~/Library`.
pub fn parity() -> ClientPluginDescriptor {
    let platform_base_path = BTreeMap::from([
        (
            Platform::Windows,
            PathTemplate::new("{env:USERPROFILE}/AppData/Roaming/Parity/Ethereum"),
        ),
        (
            Platform::Linux,
            PathTemplate::new("~/.local/share/io.parity.ethereum"),
        ),
        (
            Platform::MacOs,
            PathTemplate::new("{home}/Library/Application Support/io.parity.ethereum"),
        ),
    ]);

    ClientPluginDescriptor {
        name: "parity".to_string(),
        display_name: "Parity".to_string(),
        order: 2,
        release: Some(ReleaseBinding {
            repository: "PhilippLgh/EthCapetownWorkshop".to_string(),
            asset_filter_prefix: None,
        }),
        platform_base_path,
        control_endpoint_file: "jsonrpc.ipc".to_string(),
        ipc_setting: Some("ipcPath".to_string()),
        binary_name: BinaryName {
            default: "parity".to_string(),
            overrides: BTreeMap::from([(Platform::Windows, "parity.exe".to_string())]),
        },
        settings: vec![
            ClientSetting {
                key: "network".to_string(),
                label: "Network".to_string(),
                default: Some("mainnet".to_string()),
                kind: SettingKind::Enumerated {
                    options: vec![
                        option("mainnet", "Main", "--chain main"),
                        option("ropsten", "Ropsten (testnet)", "--chain ropsten"),
                        option("kovan", "Kovan (testnet)", "--chain kovan"),
                        option("classic", "Ethereum Classic", "--chain classic"),
                    ],
                },
            },
            ClientSetting {
                key: "syncMode".to_string(),
                label: "Sync Mode".to_string(),
                default: Some("warp".to_string()),
                kind: SettingKind::Enumerated {
                    options: vec![
                        option("warp", "Warp", "--warp"),
                        option("light", "Light", "--light"),
                        option("nowarp", "Full", "--no-warp"),
                    ],
                },
            },
            ClientSetting {
                key: "ipcPath".to_string(),
                label: "IPC Path".to_string(),
                default: None,
                kind: SettingKind::Templated {
                    pattern: "--ipc-path %s".to_string(),
                },
            },
        ],
    }
}

/// All descriptors shipped with the shell.
pub fn all() -> Vec<ClientPluginDescriptor> {
    vec![parity()]
}
