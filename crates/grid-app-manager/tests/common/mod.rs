//! In-process fakes shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use grid_app_manager::{
    DialogOutcome, DialogRequest, LaunchContext, NotificationOutcome, Placement, PlatformDialogs,
    PlatformNotifier, RegistryClient, WindowHandle, WindowHost,
};
use grid_core::network::parse_tag;
use grid_core::{
    CancellationToken, GridError, RegistryDocument, Release, ReleaseAsset, ReleaseBinding,
    ReleaseSource, Result,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};

/// Build a gzipped tarball holding `files` under a single wrapper directory.
pub fn tar_gz(files: &[(&str, &str)]) -> Vec<u8> {
    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, body) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("bundle/{}", name), body.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

pub fn release(tag: &str, assets: &[&str]) -> Release {
    Release {
        tag: tag.to_string(),
        version: parse_tag(tag).unwrap(),
        prerelease: tag.contains('-'),
        published_at: None,
        assets: assets
            .iter()
            .map(|name| ReleaseAsset {
                name: name.to_string(),
                size: 0,
                download_url: format!("https://downloads.test/{}/{}", tag, name),
            })
            .collect(),
    }
}

/// Release source serving fixed releases and payloads.
#[derive(Default)]
pub struct FakeReleaseSource {
    pub releases: Vec<Release>,
    /// Payload per download URL.
    pub payloads: HashMap<String, Vec<u8>>,
    /// When set, downloads wait for a permit.
    pub gate: Option<Semaphore>,
    pub download_started: Notify,
    /// Downloads write half the payload and then fail.
    pub fail_downloads: bool,
    pub list_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
}

impl FakeReleaseSource {
    pub fn new(releases: Vec<Release>) -> Self {
        Self {
            releases,
            ..Default::default()
        }
    }

    /// Serve `payload` for every asset of every release.
    pub fn with_payload_for_all(mut self, payload: Vec<u8>) -> Self {
        for release in &self.releases {
            for asset in &release.assets {
                self.payloads
                    .insert(asset.download_url.clone(), payload.clone());
            }
        }
        self
    }

    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_downloads = true;
        self
    }

    pub fn open_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }
}

#[async_trait]
impl ReleaseSource for FakeReleaseSource {
    async fn list_releases(&self, _binding: &ReleaseBinding) -> Result<Vec<Release>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.releases.clone())
    }

    async fn fetch_asset(
        &self,
        asset: &ReleaseAsset,
        destination: &Path,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.download_started.notify_one();
        if let Some(gate) = &self.gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|e| GridError::Other(e.to_string()))?;
        }
        cancel.check()?;

        let payload = self
            .payloads
            .get(&asset.download_url)
            .cloned()
            .unwrap_or_else(|| b"binary".to_vec());
        if self.fail_downloads {
            std::fs::write(destination, &payload[..payload.len() / 2]).unwrap();
            return Err(GridError::DownloadIncomplete {
                url: asset.download_url.clone(),
                message: "connection reset".to_string(),
            });
        }
        std::fs::write(destination, &payload).unwrap();
        Ok(payload.len() as u64)
    }
}

/// Registry client answering from a fixed table, optionally after a delay.
#[derive(Default)]
pub struct FakeRegistryClient {
    pub documents: HashMap<String, (Duration, Option<RegistryDocument>)>,
}

impl FakeRegistryClient {
    pub fn serving(mut self, url: &str, delay: Duration, apps: &[&str]) -> Self {
        let document: RegistryDocument = serde_json::from_value(serde_json::json!({
            "apps": apps.iter().map(|name| serde_json::json!({ "name": name })).collect::<Vec<_>>()
        }))
        .unwrap();
        self.documents.insert(url.to_string(), (delay, Some(document)));
        self
    }

    pub fn failing(mut self, url: &str) -> Self {
        self.documents.insert(url.to_string(), (Duration::ZERO, None));
        self
    }
}

#[async_trait]
impl RegistryClient for FakeRegistryClient {
    async fn fetch(&self, url: &str) -> Result<RegistryDocument> {
        match self.documents.get(url) {
            Some((delay, Some(document))) => {
                tokio::time::sleep(*delay).await;
                Ok(document.clone())
            }
            _ => Err(GridError::SourceUnavailable {
                source_name: url.to_string(),
                message: "HTTP 500".to_string(),
            }),
        }
    }
}

/// Everything a [`FakeHost`] was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    Create {
        url: String,
        placement: Placement,
        context: LaunchContext,
    },
    Show(WindowHandle),
    Hide(WindowHandle),
    SetTitle(WindowHandle, String),
    RemoveMenu(WindowHandle),
}

#[derive(Default)]
pub struct FakeHost {
    next_id: AtomicU64,
    pub calls: Mutex<Vec<HostCall>>,
    windows: Mutex<HashMap<String, WindowHandle>>,
}

impl FakeHost {
    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn creates(&self) -> Vec<(String, Placement, LaunchContext)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                HostCall::Create {
                    url,
                    placement,
                    context,
                } => Some((url, placement, context)),
                _ => None,
            })
            .collect()
    }
}

impl WindowHost for FakeHost {
    fn find_by_app_id(&self, app_id: &str) -> Option<WindowHandle> {
        self.windows.lock().unwrap().get(app_id).copied()
    }

    fn create(
        &self,
        url: &str,
        placement: &Placement,
        context: &LaunchContext,
    ) -> Result<WindowHandle> {
        let handle = WindowHandle(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        if let Some(app_id) = &context.app_id {
            self.windows.lock().unwrap().insert(app_id.clone(), handle);
        }
        self.calls.lock().unwrap().push(HostCall::Create {
            url: url.to_string(),
            placement: placement.clone(),
            context: context.clone(),
        });
        Ok(handle)
    }

    fn show(&self, handle: WindowHandle) -> Result<()> {
        self.calls.lock().unwrap().push(HostCall::Show(handle));
        Ok(())
    }

    fn hide(&self, handle: WindowHandle) -> Result<()> {
        self.calls.lock().unwrap().push(HostCall::Hide(handle));
        Ok(())
    }

    fn set_title(&self, handle: WindowHandle, title: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(HostCall::SetTitle(handle, title.to_string()));
        Ok(())
    }

    fn remove_menu(&self, handle: WindowHandle) -> Result<()> {
        self.calls.lock().unwrap().push(HostCall::RemoveMenu(handle));
        Ok(())
    }

    fn main_url(&self) -> String {
        "file:///shell/index.html".to_string()
    }
}

pub struct FixedDialogs(pub DialogOutcome);

#[async_trait]
impl PlatformDialogs for FixedDialogs {
    async fn open(&self, _request: &DialogRequest) -> Result<DialogOutcome> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub outcome: Option<NotificationOutcome>,
    pub posted: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl PlatformNotifier for RecordingNotifier {
    async fn notify(&self, title: &str, body: &str) -> Result<NotificationOutcome> {
        self.posted
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        Ok(self.outcome.unwrap_or(NotificationOutcome::Dismissed))
    }
}
