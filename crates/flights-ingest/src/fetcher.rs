//! Fetcher: streams the monthly archive into the invocation workspace
//!
//! The archive host negotiates TLS in a way strict verification rejects, so the
//! fetcher owns a dedicated HTTP client whose relaxed settings never reach any
//! other outbound call (storage and warehouse clients are built separately).

use crate::config::SourceConfig;
use crate::error::{IngestError, Result};
use futures::StreamExt;
use reqwest::{Client, Response};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

/// Downloads into `<name>.part` and renames once the byte count checks out
pub struct Fetcher {
    client: Client,
    relaxed_tls: bool,
}

impl Fetcher {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str());

        if config.relaxed_tls {
            builder = builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }

        let client = builder
            .build()
            .map_err(|e| IngestError::Config(format!("Failed to build source HTTP client: {}", e)))?;

        Ok(Self {
            client,
            relaxed_tls: config.relaxed_tls,
        })
    }

    /// Download `url` to `dest_dir/file_name`, returning the final path.
    ///
    /// On any failure no file is left at the final path.
    #[instrument(skip(self, dest_dir), fields(relaxed_tls = self.relaxed_tls))]
    pub async fn fetch(&self, url: &str, dest_dir: &Path, file_name: &str) -> Result<PathBuf> {
        let final_path = dest_dir.join(file_name);
        let part_path = dest_dir.join(format!("{}.part", file_name));

        info!("Downloading source archive");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| IngestError::fetch(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::fetch(url, format!("HTTP error: {}", status)));
        }

        let declared = response.content_length();
        debug!(declared_bytes = ?declared, "Source responded");

        let written = match write_body(response, &part_path).await {
            Ok(written) => written,
            Err(reason) => {
                discard(&part_path).await;
                return Err(IngestError::fetch(url, reason));
            },
        };

        if let Some(expected) = declared {
            if written != expected {
                discard(&part_path).await;
                return Err(IngestError::fetch(
                    url,
                    format!("incomplete body: received {} of {} bytes", written, expected),
                ));
            }
        }

        if written == 0 {
            discard(&part_path).await;
            return Err(IngestError::fetch(url, "empty response body"));
        }

        tokio::fs::rename(&part_path, &final_path).await?;

        info!(bytes = written, "Downloaded source archive ({} MB)", written / (1024 * 1024));

        Ok(final_path)
    }
}

async fn write_body(response: Response, path: &Path) -> std::result::Result<u64, String> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| format!("cannot create download file: {}", e))?;

    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| format!("body stream interrupted: {}", e))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| format!("write failed: {}", e))?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(|e| format!("flush failed: {}", e))?;
    file.sync_all().await.map_err(|e| format!("sync failed: {}", e))?;

    Ok(written)
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(error = %e, "Failed to remove partial download");
        }
    }
}
