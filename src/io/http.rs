use std::time::Duration;

use async_trait::async_trait;
use log::info;
use reqwest::Client;

use super::ByteSource;
use crate::error::{Error, Result};

/// Build the HTTP client shared by archive downloads and registry lookups
pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Downloads archives over HTTP(S) with a single GET
pub struct HttpSource {
    client: Client,
    max_size: u64,
}

impl HttpSource {
    /// Create a source that refuses bodies announced larger than `max_size`
    pub fn new(client: Client, max_size: u64) -> Self {
        Self { client, max_size }
    }
}

#[async_trait]
impl ByteSource for HttpSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        info!("downloading {url}");

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::fetch(url, None, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::fetch(
                url,
                Some(status.as_u16()),
                format!("HTTP request failed with status: {status}"),
            ));
        }

        // Refuse before reading the body when the server announces the size
        if let Some(size) = resp.content_length()
            && size > self.max_size
        {
            return Err(Error::ArchiveTooLarge {
                size,
                limit: self.max_size,
            });
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::fetch(url, Some(status.as_u16()), e))?;
        info!("downloaded {} bytes from {url}", bytes.len());

        Ok(bytes.to_vec())
    }
}
