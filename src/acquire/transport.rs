// src/acquire/transport.rs
//! Byte transport for downloads
//!
//! A [`Transport`] moves the bytes behind a URL into a local file. It does
//! not retry, verify or cache; the acquisition pipeline layers those on top.

use crate::error::{Error, Result};
use crate::events::{Event, EventSink};
use async_trait::async_trait;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Emit a progress event at most every this many bytes
const PROGRESS_INTERVAL: u64 = 256 * 1024;

/// Fetches a URL into a file
#[async_trait]
pub trait Transport: Send + Sync {
    /// Stream `url` into `dest`, replacing it; returns the number of bytes written
    async fn download(&self, url: &str, dest: &Path, events: &EventSink) -> Result<u64>;
}

/// HTTP(S) transport using reqwest
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("buckaroo/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::InitError(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn download(&self, url: &str, dest: &Path, events: &EventSink) -> Result<u64> {
        let parsed = url::Url::parse(url)
            .map_err(|e| Error::ParseError(format!("Invalid URL {}: {e}", url)))?;

        let mut response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| Error::DownloadError(format!("Failed to fetch {}: {e}", url)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFoundError(url.to_string()));
        }
        if !response.status().is_success() {
            return Err(Error::from_http_status(response.status().as_u16(), url));
        }

        let total = response.content_length();
        events.emit(Event::DownloadStarted {
            url: url.to_string(),
            target: dest.to_path_buf(),
            total,
        });

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| Error::IoError(format!("Failed to create {}: {e}", dest.display())))?;

        let mut received: u64 = 0;
        let mut last_reported: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::DownloadError(format!("Failed to read {}: {e}", url)))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::IoError(format!("Failed to write {}: {e}", dest.display())))?;
            received += chunk.len() as u64;

            if received - last_reported >= PROGRESS_INTERVAL {
                last_reported = received;
                events.emit(Event::DownloadProgress {
                    url: url.to_string(),
                    received,
                    total,
                });
            }
        }

        file.flush().await?;
        debug!("Received {} bytes from {}", received, url);
        Ok(received)
    }
}
