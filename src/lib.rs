//! # pkgdiff
//!
//! Compare two published versions of an npm package or a WordPress.org plugin.
//!
//! This library turns package archives into filtered, size-bounded in-memory file
//! trees and computes a structured diff between two such trees: per-file status,
//! git-style hunks with three lines of context, and word-level highlighting of
//! changed lines. Archives are treated as untrusted input, so every extraction
//! step runs under explicit resource caps.
//!
//! ## Features
//!
//! - Extract npm tarballs (tar+gzip) and WordPress plugin zips (including ZIP64)
//! - Skip vendored directories, lockfiles and OS artifacts; flag binary and minified files
//! - Guard against oversized archives and decompression bombs
//! - Line-level hunks with intraline word diffs
//! - Resolve versions and download URLs from the npm registry and WordPress.org
//!
//! ## Example
//!
//! ```no_run
//! use pkgdiff::{Config, HttpSource, PackageComparer, PackageType, build_client, registry_for};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let client = build_client(config.fetch_timeout)?;
//!
//!     let comparer = PackageComparer::new(
//!         registry_for(PackageType::Npm, &config, client.clone()),
//!         Box::new(HttpSource::new(client, config.limits.max_archive_size)),
//!         config.limits,
//!         config.diff,
//!     );
//!
//!     let diff = comparer.compare("left-pad", "1.1.0", "1.3.0").await?;
//!     for file in &diff.files {
//!         println!("{:?} {}", file.status, file.path);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod cli;
pub mod compare;
pub mod config;
pub mod diff;
pub mod error;
pub mod filter;
pub mod io;
pub mod registry;
pub mod tar;
pub mod version;
pub mod zip;

pub use archive::{ArchiveExtractor, ArchiveFormat, FileEntry, FileTree};
pub use cli::{Cli, Command};
pub use compare::{PackageComparer, compare_archives};
pub use config::{Config, DiffOptions, ExtractLimits};
pub use diff::engine::DiffEngine;
pub use diff::{
    ChangeKind, DiffFile, DiffHunk, DiffLine, DiffResult, DiffStats, FileStatus, LineKind,
    WordChange, compute_diff, diff_words, has_significant_changes,
};
pub use error::{Error, ErrorKind, Result};
pub use filter::{PathClass, classify_path, is_binary_content};
pub use io::{ByteSource, HttpSource, LocalSource, build_client};
pub use registry::{NpmRegistry, PackageType, Registry, WordPressRegistry, registry_for};
