//! Package archives as filtered, size-bounded in-memory file trees.
//!
//! [`ArchiveExtractor::extract`] is the single entry point: it checks the raw
//! size against [`ExtractLimits::max_archive_size`], then dispatches on
//! [`ArchiveFormat`] to the tar+gzip walker ([`crate::tar`]) or the zip
//! central-directory reader ([`crate::zip`]). Both strategies share
//! `FileTreeBuilder`, which owns the per-call counters and applies the
//! content filter.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::ExtractLimits;
use crate::error::{Error, Result};
use crate::filter::{self, PathClass};

/// Container format of a package archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    /// gzip-compressed tar, as published to npm.
    #[serde(rename = "tgz")]
    TarGzip,
    Zip,
}

/// One accepted archive member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub path: String,
    /// `None` whenever `is_binary` is set.
    pub content: Option<String>,
    pub is_binary: bool,
    pub is_minified: bool,
    /// Original byte length.
    pub size: u64,
}

impl FileEntry {
    pub fn text(path: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            path: path.into(),
            size: content.len() as u64,
            content: Some(content),
            is_binary: false,
            is_minified: false,
        }
    }

    pub fn binary(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            content: None,
            is_binary: true,
            is_minified: false,
            size,
        }
    }

    /// Build an entry from raw member bytes. Binary status is the OR of the
    /// path classification and content sniffing.
    fn from_bytes(path: &str, data: &[u8], class: PathClass, size: u64) -> Self {
        let is_binary = class.is_binary || filter::is_binary_content(data);
        Self {
            path: path.to_string(),
            content: (!is_binary).then(|| decode_text(data)),
            is_binary,
            is_minified: class.is_minified,
            size,
        }
    }
}

/// Lossy UTF-8 decoding with a leading byte-order mark dropped.
fn decode_text(data: &[u8]) -> String {
    let text = String::from_utf8_lossy(data);
    match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text.into_owned(),
    }
}

/// Drop the first path component (the folder most packagers wrap their
/// contents in). Paths without a slash, or starting with one, are unchanged.
pub(crate) fn strip_root_component(path: &str) -> &str {
    match path.split_once('/') {
        Some((root, rest)) if !root.is_empty() => rest,
        _ => path,
    }
}

/// Normalized path → entry. Keys are unique; iteration is in path order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTree {
    files: BTreeMap<String, FileEntry>,
}

impl FileTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, replacing any previous entry at the same path.
    pub fn insert(&mut self, entry: FileEntry) {
        self.files.insert(entry.path.clone(), entry);
    }

    pub fn get(&self, path: &str) -> Option<&FileEntry> {
        self.files.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = &FileEntry> {
        self.files.values()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FromIterator<FileEntry> for FileTree {
    fn from_iter<I: IntoIterator<Item = FileEntry>>(iter: I) -> Self {
        let mut tree = FileTree::new();
        for entry in iter {
            tree.insert(entry);
        }
        tree
    }
}

/// Accumulates accepted entries for one extraction call and enforces the
/// per-file and file-count caps.
pub(crate) struct FileTreeBuilder {
    limits: ExtractLimits,
    tree: FileTree,
    decompressed: u64,
}

impl FileTreeBuilder {
    pub(crate) fn new(limits: ExtractLimits) -> Self {
        Self {
            limits,
            tree: FileTree::new(),
            decompressed: 0,
        }
    }

    pub(crate) fn is_full(&self) -> bool {
        self.tree.len() >= self.limits.max_files
    }

    /// Decide whether a member with this normalized path and size should be
    /// read at all. Returns the path classification when it should.
    pub(crate) fn admit(&self, path: &str, size: u64) -> Option<PathClass> {
        if path.is_empty() || path.ends_with('/') {
            return None;
        }
        if size > self.limits.max_file_size {
            debug!("skipping {path}: {size} bytes exceeds per-file limit");
            return None;
        }
        let class = filter::classify_path(path);
        if !class.include {
            debug!("skipping {path}: excluded by filter");
            return None;
        }
        Some(class)
    }

    /// Charge `bytes` of decompressor output against the archive-wide budget.
    pub(crate) fn charge(&mut self, bytes: u64) -> Result<()> {
        self.decompressed = self.decompressed.saturating_add(bytes);
        if self.decompressed > self.limits.max_decompressed_size {
            return Err(Error::DecompressionTooLarge {
                limit: self.limits.max_decompressed_size,
            });
        }
        Ok(())
    }

    pub(crate) fn accept(&mut self, path: &str, data: &[u8], class: PathClass, size: u64) {
        self.tree
            .insert(FileEntry::from_bytes(path, data, class, size));
    }

    pub(crate) fn finish(self) -> FileTree {
        self.tree
    }
}

/// Turns raw archive bytes into a [`FileTree`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveExtractor {
    limits: ExtractLimits,
}

impl ArchiveExtractor {
    pub fn new(limits: ExtractLimits) -> Self {
        Self { limits }
    }

    /// Extract `data` in the given format.
    ///
    /// # Errors
    ///
    /// - [`Error::ArchiveTooLarge`] if `data` exceeds the raw size ceiling
    ///   (checked before any decompression).
    /// - [`Error::DecompressionTooLarge`] if decompression outgrows its bound.
    /// - [`Error::MalformedArchive`] on container corruption.
    pub fn extract(&self, data: &[u8], format: ArchiveFormat) -> Result<FileTree> {
        let size = data.len() as u64;
        if size > self.limits.max_archive_size {
            return Err(Error::ArchiveTooLarge {
                size,
                limit: self.limits.max_archive_size,
            });
        }

        let tree = match format {
            ArchiveFormat::TarGzip => crate::tar::extract(data, self.limits)?,
            ArchiveFormat::Zip => crate::zip::extract(data, self.limits)?,
        };
        debug!("extracted {} files from {format:?} archive", tree.len());
        Ok(tree)
    }
}
