//! Fetching app registries.

use async_trait::async_trait;
use grid_core::network::HttpClient;
use grid_core::{GridError, RegistryDocument, Result};
use std::sync::Arc;
use tracing::debug;

/// Fetches the document served at a registry URL.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Any failure, including an unparseable document, is
    /// [`GridError::SourceUnavailable`].
    async fn fetch(&self, url: &str) -> Result<RegistryDocument>;
}

/// Registry client over HTTP(S).
pub struct HttpRegistryClient {
    http: Arc<HttpClient>,
}

impl HttpRegistryClient {
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(Arc::new(HttpClient::new()?)))
    }

    pub fn with_client(http: Arc<HttpClient>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn fetch(&self, url: &str) -> Result<RegistryDocument> {
        debug!("Fetching app registry {}", url);
        self.http
            .get_json::<RegistryDocument>(url)
            .await
            .map_err(|e| match e {
                GridError::SourceUnavailable { .. } => e,
                other => GridError::SourceUnavailable {
                    source_name: url.to_string(),
                    message: other.to_string(),
                },
            })
    }
}
