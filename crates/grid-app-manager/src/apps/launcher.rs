//! Opening apps in host windows.

use crate::host::{
    DialogOutcome, DialogRequest, LaunchContext, NotificationOutcome, Placement, PlatformDialogs,
    PlatformNotifier, WindowHandle, WindowHost,
};
use crate::package::{PackageResolver, UpdateNotice};
use grid_core::config::{AppConfig, GridUiConfig};
use grid_core::{AppEntry, CancellationToken, ClientPluginRegistry, GridError, Result};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const TERMINAL_BACKGROUND: &str = "#1E1E1E";
const DEFAULT_BACKGROUND: &str = "#ffffff";
const UI_WINDOW_POSITION: i32 = 400;

/// Turns [`AppEntry`]s into windows on a [`WindowHost`].
pub struct AppLauncher {
    host: Arc<dyn WindowHost>,
    resolver: Arc<PackageResolver>,
    clients: Arc<ClientPluginRegistry>,
    dialogs: Option<Arc<dyn PlatformDialogs>>,
    notifier: Option<Arc<dyn PlatformNotifier>>,
    resources_dir: PathBuf,
    ui_window: Mutex<Option<WindowHandle>>,
}

impl AppLauncher {
    pub fn new(
        host: Arc<dyn WindowHost>,
        resolver: Arc<PackageResolver>,
        clients: Arc<ClientPluginRegistry>,
    ) -> Self {
        Self {
            host,
            resolver,
            clients,
            dialogs: None,
            notifier: None,
            resources_dir: PathBuf::from("."),
            ui_window: Mutex::new(None),
        }
    }

    pub fn with_dialogs(mut self, dialogs: Arc<dyn PlatformDialogs>) -> Self {
        self.dialogs = Some(dialogs);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn PlatformNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Directory holding the shell's own pages (the terminal page).
    pub fn with_resources_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.resources_dir = dir.into();
        self
    }

    /// Open `entry`, or show its window if one is already open.
    pub async fn launch(&self, entry: &AppEntry) -> Result<WindowHandle> {
        info!("Launching {}", entry.name);

        if let Some(id) = &entry.id {
            if let Some(handle) = self.host.find_by_app_id(id) {
                debug!("{} already open as {}", id, handle);
                self.host.show(handle)?;
                return Ok(handle);
            }
        }

        if entry.name == GridUiConfig::PACKAGE_NAME {
            return self.launch_grid_ui(entry).await;
        }

        let url = entry
            .url
            .clone()
            .unwrap_or_else(|| GridUiConfig::DEFAULT_APP_URL.to_string());
        let context = LaunchContext {
            app_id: entry.id.clone(),
            payload: json!({
                "url": url,
                "isApp": true,
                "app": entry,
            }),
        };
        self.host
            .create(&self.host.main_url(), &Placement::default(), &context)
    }

    async fn launch_grid_ui(&self, entry: &AppEntry) -> Result<WindowHandle> {
        let scope = entry.scope().cloned().unwrap_or(Value::Null);
        let is_terminal = scope.get("component").and_then(Value::as_str) == Some("terminal");

        let url = if is_terminal {
            self.terminal_url()
        } else {
            let location = self.resolver.resolve().await;
            info!("Grid UI resolved to {}", location);
            location.to_url()
        };

        let placement = Placement {
            x: Some(UI_WINDOW_POSITION),
            y: Some(UI_WINDOW_POSITION),
            background_color: Some(
                if is_terminal {
                    TERMINAL_BACKGROUND
                } else {
                    DEFAULT_BACKGROUND
                }
                .to_string(),
            ),
        };
        let context = LaunchContext {
            app_id: entry.id.clone(),
            payload: json!({ "scope": scope }),
        };

        let handle = self.host.create(&url, &placement, &context)?;
        self.host.remove_menu(handle)?;
        let client = scope.get("client").and_then(Value::as_str);
        self.host.set_title(handle, &self.terminal_title(client))?;

        *self.ui_window.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
        Ok(handle)
    }

    fn terminal_url(&self) -> String {
        let page = self.resources_dir.join(GridUiConfig::TERMINAL_PAGE);
        let display = page.to_string_lossy().replace('\\', "/");
        if display.starts_with('/') {
            format!("file://{}", display)
        } else {
            format!("file:///{}", display)
        }
    }

    fn terminal_title(&self, client: Option<&str>) -> String {
        let name = match client {
            Some(name) => self
                .clients
                .describe(name)
                .map(|d| d.display_name.clone())
                .unwrap_or_else(|_| name.to_string()),
            None => AppConfig::APP_NAME.to_string(),
        };
        format!("Ethereum Grid Terminal for {}", name)
    }

    pub fn hide(&self, handle: WindowHandle) -> Result<()> {
        self.host.hide(handle)
    }

    /// Tell the user a new UI version is ready. Clicking the notification
    /// brings the UI window forward.
    pub async fn announce_update(&self, notice: &UpdateNotice) -> Result<NotificationOutcome> {
        let notifier = match &self.notifier {
            Some(notifier) => notifier,
            None => {
                info!("{} {} downloaded", notice.identity, notice.version);
                return Ok(NotificationOutcome::Dismissed);
            }
        };

        let outcome = notifier
            .notify(
                &format!("{} update downloaded", AppConfig::APP_NAME),
                &format!(
                    "{} {} is ready and will be used on next start.",
                    notice.identity, notice.version
                ),
            )
            .await?;

        if outcome == NotificationOutcome::Clicked {
            let window = *self.ui_window.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(handle) = window {
                self.host.show(handle)?;
            }
        }
        Ok(outcome)
    }

    /// Announce every update the resolver downloads until `cancel` fires.
    pub fn watch_updates(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let mut updates = self.resolver.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    changed = updates.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                let notice = updates.borrow_and_update().clone();
                if let Some(notice) = notice {
                    if let Err(e) = self.announce_update(&notice).await {
                        warn!("Failed to announce update: {}", e);
                    }
                }
            }
        })
    }

    /// Ask the user for one or more paths.
    pub async fn select_path(&self, request: &DialogRequest) -> Result<DialogOutcome> {
        let dialogs = self.dialogs.as_ref().ok_or_else(|| GridError::WindowHost {
            message: "no dialog provider configured".to_string(),
        })?;
        dialogs.open(request).await
    }
}
