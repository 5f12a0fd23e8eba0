//! Network plumbing: HTTP client, retries, downloads, release sources and
//! liveness probes.

mod client;
mod download;
mod probe;
mod release;
mod retry;

pub use client::{extract_domain, is_transient_status, HttpClient, RateLimitQuota};
pub use download::{DownloadProgress, Downloader};
pub use probe::{LivenessProbe, TcpProbe};
pub use release::{
    is_archive, newest_release, parse_tag, GitHubReleaseSource, Release, ReleaseAsset,
    ReleaseBinding, ReleaseSource,
};
pub use retry::{retry_async, RetryPolicy};
