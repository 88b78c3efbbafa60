//! Package registries: from a package name to its published versions and
//! archive download URLs.

mod npm;
mod wordpress;

pub use npm::NpmRegistry;
pub use wordpress::WordPressRegistry;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::archive::ArchiveFormat;
use crate::config::Config;
use crate::error::{Error, Result};

/// Package ecosystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    Npm,
    /// WordPress.org plugin directory.
    Wp,
}

impl PackageType {
    /// Archive format the ecosystem publishes.
    pub fn archive_format(self) -> ArchiveFormat {
        match self {
            PackageType::Npm => ArchiveFormat::TarGzip,
            PackageType::Wp => ArchiveFormat::Zip,
        }
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PackageType::Npm => "npm",
            PackageType::Wp => "WordPress.org",
        })
    }
}

impl FromStr for PackageType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "npm" => Ok(PackageType::Npm),
            "wp" | "wordpress" => Ok(PackageType::Wp),
            other => Err(format!("unknown package type: {other}")),
        }
    }
}

/// Version listing and download URL resolution for one ecosystem.
#[async_trait]
pub trait Registry: Send + Sync {
    fn package_type(&self) -> PackageType;

    /// All published versions, newest first.
    async fn list_versions(&self, name: &str) -> Result<Vec<String>>;

    async fn resolve_download_url(&self, name: &str, version: &str) -> Result<String>;

    async fn is_valid_version(&self, name: &str, version: &str) -> Result<bool>;
}

/// Registry for `package_type`, using the base URLs in `config`.
pub fn registry_for(
    package_type: PackageType,
    config: &Config,
    client: Client,
) -> Box<dyn Registry> {
    match package_type {
        PackageType::Npm => Box::new(NpmRegistry::new(client, &config.npm_registry)),
        PackageType::Wp => Box::new(WordPressRegistry::new(
            client,
            &config.wp_api,
            &config.wp_downloads,
        )),
    }
}

/// GET `url` and decode the body as JSON. A 404 is returned as `Ok(None)` so
/// each registry can word its own not-found error.
async fn get_json<T: serde::de::DeserializeOwned>(client: &Client, url: Url) -> Result<Option<T>> {
    let shown = url.to_string();
    let resp = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| Error::fetch(&shown, None, e))?;

    let status = resp.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !status.is_success() {
        return Err(Error::fetch(
            &shown,
            Some(status.as_u16()),
            format!("HTTP request failed with status: {status}"),
        ));
    }

    let body = resp
        .json::<T>()
        .await
        .map_err(|e| Error::fetch(&shown, Some(status.as_u16()), e))?;
    Ok(Some(body))
}

fn parse_base(base: &str) -> Result<Url> {
    Url::parse(base).map_err(|e| Error::fetch(base, None, format!("invalid URL: {e}")))
}
