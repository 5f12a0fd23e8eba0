//! Capabilities the launcher needs from the desktop environment.
//!
//! Windows, file dialogs and notifications are provided by whatever embeds
//! the shell. The launcher only talks to these traits.

use async_trait::async_trait;
use grid_core::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

/// Opaque identifier of a host window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowHandle(pub u64);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

/// Initial window geometry and appearance. `None` leaves the host default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub background_color: Option<String>,
}

/// Data handed to the content of a new window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchContext {
    /// App id the window is registered under, for later lookup.
    #[serde(default)]
    pub app_id: Option<String>,
    pub payload: Value,
}

/// Creates and controls application windows.
pub trait WindowHost: Send + Sync {
    /// Window previously created for `app_id`, if still open.
    fn find_by_app_id(&self, app_id: &str) -> Option<WindowHandle>;

    fn create(&self, url: &str, placement: &Placement, context: &LaunchContext)
        -> Result<WindowHandle>;

    fn show(&self, handle: WindowHandle) -> Result<()>;

    fn hide(&self, handle: WindowHandle) -> Result<()>;

    fn set_title(&self, handle: WindowHandle, title: &str) -> Result<()>;

    fn remove_menu(&self, handle: WindowHandle) -> Result<()>;

    /// URL of the shell's own app container page.
    fn main_url(&self) -> String;
}

/// What a path dialog should select.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PathKind {
    #[default]
    File,
    Directory,
}

/// Parameters for a path selection dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogRequest {
    pub kind: PathKind,
    pub multiple: bool,
    pub default_path: Option<PathBuf>,
    pub show_hidden: bool,
}

/// Result of a path dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogOutcome {
    Selected(Vec<PathBuf>),
    Cancelled,
}

#[async_trait]
pub trait PlatformDialogs: Send + Sync {
    /// Show a path selection dialog and wait for the user.
    async fn open(&self, request: &DialogRequest) -> Result<DialogOutcome>;
}

/// How the user reacted to a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationOutcome {
    Clicked,
    Dismissed,
}

#[async_trait]
pub trait PlatformNotifier: Send + Sync {
    /// Post a notification and wait until it is clicked or dismissed.
    async fn notify(&self, title: &str, body: &str) -> Result<NotificationOutcome>;
}
