use async_trait::async_trait;
use log::debug;

use super::ByteSource;
use crate::error::{Error, Result};

/// Reads archives from the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSource;

#[async_trait]
impl ByteSource for LocalSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| Error::fetch(path, None, e))?;
        debug!("read {} bytes from {path}", data.len());
        Ok(data)
    }
}
