use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, Url};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::version::sort_newest_first;

use super::{PackageType, Registry, get_json, parse_base};

/// Development head; listed by the API but never a release.
const TRUNK: &str = "trunk";

/// The subset of a `plugin_information` response this crate reads.
#[derive(Debug, Clone, Deserialize)]
struct PluginInfo {
    version: String,
    /// Version → zip URL. The API sends `[]` instead of `{}` when empty.
    #[serde(default, deserialize_with = "lenient_map")]
    versions: BTreeMap<String, String>,
}

fn lenient_map<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(map) => map
            .into_iter()
            .filter_map(|(k, v)| v.as_str().map(|url| (k, url.to_string())))
            .collect(),
        _ => BTreeMap::new(),
    })
}

impl PluginInfo {
    /// Decode an API response. `false` and `{"error": …}` both mean the
    /// slug does not exist.
    fn from_response(slug: &str, body: Value) -> Result<Self> {
        if body == Value::Bool(false) || body.get("error").is_some() {
            return Err(not_found(slug));
        }
        serde_json::from_value(body).map_err(|e| Error::fetch(slug, None, e))
    }

    fn versions(&self) -> Vec<String> {
        let mut versions: Vec<String> = self
            .versions
            .keys()
            .filter(|v| *v != TRUNK)
            .cloned()
            .collect();
        if versions.is_empty() {
            return vec![self.version.clone()];
        }
        sort_newest_first(&mut versions);
        versions
    }

    fn contains(&self, version: &str) -> bool {
        self.versions.contains_key(version) || version == self.version
    }
}

fn not_found(slug: &str) -> Error {
    Error::PackageNotFound {
        registry: PackageType::Wp,
        name: slug.to_string(),
    }
}

/// WordPress.org plugin directory.
pub struct WordPressRegistry {
    client: Client,
    api: String,
    downloads: String,
    cache: Mutex<HashMap<String, Arc<PluginInfo>>>,
}

impl WordPressRegistry {
    pub fn new(client: Client, api: &str, downloads: &str) -> Self {
        Self {
            client,
            api: api.to_string(),
            downloads: downloads.trim_end_matches('/').to_string(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn info_url(&self, slug: &str) -> Result<Url> {
        let mut url = parse_base(&self.api)?;
        url.query_pairs_mut()
            .append_pair("action", "plugin_information")
            .append_pair("request[slug]", slug);
        Ok(url)
    }

    /// Zip URL of the current release, which the `versions` map may omit.
    fn current_download_url(&self, slug: &str, version: &str) -> String {
        format!("{}/{slug}.{version}.zip", self.downloads)
    }

    async fn info(&self, slug: &str) -> Result<Arc<PluginInfo>> {
        let mut cache = self.cache.lock().await;
        if let Some(hit) = cache.get(slug) {
            debug!("plugin info cache hit for {slug}");
            return Ok(hit.clone());
        }

        let url = self.info_url(slug)?;
        info!("fetching plugin info from {url}");
        let body = get_json::<Value>(&self.client, url)
            .await?
            .ok_or_else(|| not_found(slug))?;

        let info = Arc::new(PluginInfo::from_response(slug, body)?);
        cache.insert(slug.to_string(), info.clone());
        Ok(info)
    }
}

#[async_trait]
impl Registry for WordPressRegistry {
    fn package_type(&self) -> PackageType {
        PackageType::Wp
    }

    async fn list_versions(&self, slug: &str) -> Result<Vec<String>> {
        Ok(self.info(slug).await?.versions())
    }

    async fn resolve_download_url(&self, slug: &str, version: &str) -> Result<String> {
        let info = self.info(slug).await?;
        if let Some(url) = info.versions.get(version) {
            return Ok(url.clone());
        }
        if version == info.version {
            return Ok(self.current_download_url(slug, version));
        }
        Err(Error::VersionNotFound {
            name: slug.to_string(),
            missing: vec![version.to_string()],
            available: info.versions(),
        })
    }

    async fn is_valid_version(&self, slug: &str, version: &str) -> Result<bool> {
        Ok(self.info(slug).await?.contains(version))
    }
}
