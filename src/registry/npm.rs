use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, Url};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::version::sort_newest_first;

use super::{PackageType, Registry, get_json, parse_base};

/// The subset of an npm packument this crate reads.
#[derive(Debug, Clone, Deserialize)]
struct Packument {
    #[serde(default)]
    versions: BTreeMap<String, VersionMeta>,
}

#[derive(Debug, Clone, Deserialize)]
struct VersionMeta {
    dist: Dist,
}

#[derive(Debug, Clone, Deserialize)]
struct Dist {
    tarball: String,
}

impl Packument {
    fn versions(&self) -> Vec<String> {
        let mut versions: Vec<String> = self.versions.keys().cloned().collect();
        sort_newest_first(&mut versions);
        versions
    }

    fn tarball(&self, version: &str) -> Option<&str> {
        self.versions.get(version).map(|v| v.dist.tarball.as_str())
    }
}

/// npm-compatible registry (`registry.npmjs.org` by default).
///
/// Package metadata is fetched once per name and kept for the lifetime of
/// the registry.
pub struct NpmRegistry {
    client: Client,
    base: String,
    cache: Mutex<HashMap<String, Arc<Packument>>>,
}

impl NpmRegistry {
    pub fn new(client: Client, base: &str) -> Self {
        Self {
            client,
            base: base.to_string(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// `{base}/{name}`, with the name as a single path segment so the slash
    /// of a scoped name is encoded.
    fn packument_url(&self, name: &str) -> Result<Url> {
        let mut url = parse_base(&self.base)?;
        url.path_segments_mut()
            .map_err(|_| Error::fetch(&self.base, None, "registry URL cannot be a base"))?
            .pop_if_empty()
            .push(name);
        Ok(url)
    }

    async fn packument(&self, name: &str) -> Result<Arc<Packument>> {
        let mut cache = self.cache.lock().await;
        if let Some(hit) = cache.get(name) {
            debug!("npm metadata cache hit for {name}");
            return Ok(hit.clone());
        }

        let url = self.packument_url(name)?;
        info!("fetching npm metadata from {url}");
        let packument = get_json::<Packument>(&self.client, url)
            .await?
            .ok_or_else(|| Error::PackageNotFound {
                registry: PackageType::Npm,
                name: name.to_string(),
            })?;

        let packument = Arc::new(packument);
        cache.insert(name.to_string(), packument.clone());
        Ok(packument)
    }
}

#[async_trait]
impl Registry for NpmRegistry {
    fn package_type(&self) -> PackageType {
        PackageType::Npm
    }

    async fn list_versions(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.packument(name).await?.versions())
    }

    async fn resolve_download_url(&self, name: &str, version: &str) -> Result<String> {
        let packument = self.packument(name).await?;
        match packument.tarball(version) {
            Some(url) => Ok(url.to_string()),
            None => Err(Error::VersionNotFound {
                name: name.to_string(),
                missing: vec![version.to_string()],
                available: packument.versions(),
            }),
        }
    }

    async fn is_valid_version(&self, name: &str, version: &str) -> Result<bool> {
        Ok(self.packument(name).await?.versions.contains_key(version))
    }
}
