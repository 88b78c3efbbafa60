//! End-to-end comparison: registry lookup, download, extraction, diff.

use log::info;

use crate::archive::{ArchiveExtractor, ArchiveFormat, FileTree};
use crate::config::{DiffOptions, ExtractLimits};
use crate::diff::DiffResult;
use crate::diff::engine::DiffEngine;
use crate::error::{Error, Result};
use crate::io::ByteSource;
use crate::registry::{PackageType, Registry};

/// Compares two published versions of a package.
pub struct PackageComparer {
    registry: Box<dyn Registry>,
    source: Box<dyn ByteSource>,
    extractor: ArchiveExtractor,
    engine: DiffEngine,
}

impl PackageComparer {
    pub fn new(
        registry: Box<dyn Registry>,
        source: Box<dyn ByteSource>,
        limits: ExtractLimits,
        options: DiffOptions,
    ) -> Self {
        Self {
            registry,
            source,
            extractor: ArchiveExtractor::new(limits),
            engine: DiffEngine::new(options),
        }
    }

    /// Diff `from` against `to`.
    ///
    /// # Errors
    ///
    /// [`Error::PackageNotFound`] from the registry, [`Error::VersionNotFound`]
    /// listing every requested version that is not published, and any fetch
    /// or extraction error from either side.
    pub async fn compare(&self, name: &str, from: &str, to: &str) -> Result<DiffResult> {
        let available = self.registry.list_versions(name).await?;

        let mut missing = Vec::new();
        for version in [from, to] {
            if !self.registry.is_valid_version(name, version).await? {
                missing.push(version.to_string());
            }
        }
        if !missing.is_empty() {
            return Err(Error::VersionNotFound {
                name: name.to_string(),
                missing,
                available,
            });
        }

        let (from_url, to_url) = tokio::try_join!(
            self.registry.resolve_download_url(name, from),
            self.registry.resolve_download_url(name, to),
        )?;

        let format = self.registry.package_type().archive_format();
        let (old, new) = tokio::try_join!(
            self.fetch_tree(&from_url, format),
            self.fetch_tree(&to_url, format),
        )?;

        let result = self.engine.compute(
            &old,
            &new,
            self.registry.package_type(),
            name,
            from,
            to,
        );
        info!(
            "{name} {from}...{to}: {} files changed, {} insertions, {} deletions",
            result.stats.files, result.stats.insertions, result.stats.deletions
        );
        Ok(result)
    }

    async fn fetch_tree(&self, url: &str, format: ArchiveFormat) -> Result<FileTree> {
        let data = self.source.fetch(url).await?;
        self.extractor.extract(&data, format)
    }
}

/// Diff two in-memory archives of the same format.
#[allow(clippy::too_many_arguments)]
pub fn compare_archives(
    old: &[u8],
    new: &[u8],
    format: ArchiveFormat,
    package_type: PackageType,
    package_name: &str,
    from_version: &str,
    to_version: &str,
    limits: ExtractLimits,
    options: DiffOptions,
) -> Result<DiffResult> {
    let extractor = ArchiveExtractor::new(limits);
    let old = extractor.extract(old, format)?;
    let new = extractor.extract(new, format)?;
    Ok(DiffEngine::new(options).compute(
        &old,
        &new,
        package_type,
        package_name,
        from_version,
        to_version,
    ))
}
