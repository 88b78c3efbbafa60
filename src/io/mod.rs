mod http;
mod local;

pub use http::{HttpSource, build_client};
pub use local::LocalSource;

use async_trait::async_trait;

use crate::error::Result;

/// Trait for retrieving a whole archive from a data source
#[async_trait]
pub trait ByteSource: Send + Sync {
    /// Fetch every byte at `location` (a URL or a path, depending on the source)
    async fn fetch(&self, location: &str) -> Result<Vec<u8>>;
}
