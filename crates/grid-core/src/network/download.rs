//! Streaming downloads with progress reporting and cancellation.
//!
//! Bytes are written to `<destination>.part` and renamed into place only
//! after the stream has been fully written and flushed, so a failed or
//! cancelled download never leaves a file at `destination`.

use crate::cancel::CancellationToken;
use crate::config::NetworkConfig;
use crate::network::client::HttpClient;
use crate::{GridError, Result};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Progress of a running download.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadProgress {
    pub bytes_downloaded: u64,
    pub total_bytes: Option<u64>,
}

impl DownloadProgress {
    /// Percentage complete (0-100), if the total size is known.
    pub fn percent(&self) -> Option<f64> {
        self.total_bytes.map(|total| {
            if total > 0 {
                (self.bytes_downloaded as f64 / total as f64) * 100.0
            } else {
                0.0
            }
        })
    }
}

/// Downloads files over HTTP.
#[derive(Clone)]
pub struct Downloader {
    http: Arc<HttpClient>,
}

impl Downloader {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    /// Temp path used while `destination` is being written.
    pub fn temp_path(destination: &Path) -> PathBuf {
        PathBuf::from(format!(
            "{}{}",
            destination.display(),
            NetworkConfig::DOWNLOAD_TEMP_SUFFIX
        ))
    }

    /// Download `url` to `destination`. Returns the number of bytes written.
    pub async fn download(
        &self,
        url: &str,
        destination: &Path,
        cancel: &CancellationToken,
        progress_tx: Option<mpsc::Sender<DownloadProgress>>,
    ) -> Result<u64> {
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| GridError::io_with_path(e, parent))?;
        }

        let temp_path = Self::temp_path(destination);
        match self.stream_to(url, &temp_path, cancel, progress_tx).await {
            Ok(bytes) => {
                tokio::fs::rename(&temp_path, destination).await.map_err(|e| {
                    let _ = std::fs::remove_file(&temp_path);
                    GridError::io_with_path(e, destination)
                })?;
                info!("Downloaded {} bytes to {}", bytes, destination.display());
                Ok(bytes)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&temp_path).await;
                Err(e)
            }
        }
    }

    async fn stream_to(
        &self,
        url: &str,
        temp_path: &Path,
        cancel: &CancellationToken,
        progress_tx: Option<mpsc::Sender<DownloadProgress>>,
    ) -> Result<u64> {
        let response = self.http.get(url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GridError::DownloadIncomplete {
                url: url.to_string(),
                message: format!("HTTP {}", status),
            });
        }

        let total_bytes = response.content_length();
        let mut file = tokio::fs::File::create(temp_path)
            .await
            .map_err(|e| GridError::io_with_path(e, temp_path))?;

        let mut bytes_downloaded: u64 = 0;
        let mut last_report = Instant::now();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            cancel.check()?;
            let chunk = chunk.map_err(|e| GridError::DownloadIncomplete {
                url: url.to_string(),
                message: format!("Error reading download stream: {}", e),
            })?;
            file.write_all(&chunk)
                .await
                .map_err(|e| GridError::io_with_path(e, temp_path))?;
            bytes_downloaded += chunk.len() as u64;

            if last_report.elapsed() >= NetworkConfig::DOWNLOAD_PROGRESS_INTERVAL {
                if let Some(tx) = &progress_tx {
                    let _ = tx
                        .send(DownloadProgress {
                            bytes_downloaded,
                            total_bytes,
                        })
                        .await;
                }
                last_report = Instant::now();
            }
        }

        if let Some(total) = total_bytes {
            if bytes_downloaded < total {
                return Err(GridError::DownloadIncomplete {
                    url: url.to_string(),
                    message: format!("received {} of {} bytes", bytes_downloaded, total),
                });
            }
        }

        file.flush()
            .await
            .map_err(|e| GridError::io_with_path(e, temp_path))?;
        file.sync_all()
            .await
            .map_err(|e| GridError::io_with_path(e, temp_path))?;

        if let Some(tx) = &progress_tx {
            let _ = tx
                .send(DownloadProgress {
                    bytes_downloaded,
                    total_bytes,
                })
                .await;
        }
        debug!("Streamed {} bytes from {}", bytes_downloaded, url);
        Ok(bytes_downloaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    /// Serve `body` once over plain HTTP and return its URL.
    async fn serve_once(body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{}/grid-ui.tar.gz", address)
    }

    #[tokio::test]
    async fn test_download_reports_final_progress() {
        let url = serve_once(b"bundle bytes").await;
        let temp_dir = tempfile::TempDir::new().unwrap();
        let destination = temp_dir.path().join("grid-ui.tar.gz");
        let downloader = Downloader::new(Arc::new(HttpClient::new().unwrap()));
        let (tx, mut rx) = mpsc::channel(16);

        let bytes = downloader
            .download(&url, &destination, &CancellationToken::new(), Some(tx))
            .await
            .unwrap();
        assert_eq!(bytes, 12);
        assert_eq!(std::fs::read(&destination).unwrap(), b"bundle bytes");
        assert!(!Downloader::temp_path(&destination).exists());

        let mut last = None;
        while let Some(progress) = rx.recv().await {
            last = Some(progress);
        }
        let last = last.expect("at least one progress report");
        assert_eq!(last.bytes_downloaded, 12);
        assert_eq!(last.percent(), Some(100.0));
    }

    #[test]
    fn test_progress_percent() {
        let progress = DownloadProgress {
            bytes_downloaded: 50,
            total_bytes: Some(200),
        };
        assert_eq!(progress.percent(), Some(25.0));

        let unknown = DownloadProgress {
            bytes_downloaded: 50,
            total_bytes: None,
        };
        assert_eq!(unknown.percent(), None);
    }

    #[test]
    fn test_temp_path() {
        let path = Downloader::temp_path(Path::new("/tmp/grid-ui.zip"));
        assert_eq!(path, PathBuf::from("/tmp/grid-ui.zip.part"));
    }
}
