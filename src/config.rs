//! Tunable resource caps and options.

use std::time::Duration;

pub const DEFAULT_NPM_REGISTRY: &str = "https://registry.npmjs.org";
pub const DEFAULT_WP_API: &str = "https://api.wordpress.org/plugins/info/1.2/";
pub const DEFAULT_WP_DOWNLOADS: &str = "https://downloads.wordpress.org/plugin";

const KB: u64 = 1024;
const MB: u64 = KB * 1024;

/// Caps that bound CPU and memory spent on one (untrusted) archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractLimits {
    /// Raw archive size, checked before any decompression.
    pub max_archive_size: u64,
    /// Extraction stops once this many files have been accepted.
    pub max_files: usize,
    /// Larger entries are skipped, never truncated.
    pub max_file_size: u64,
    /// Total bytes the decompressor may produce for one archive.
    pub max_decompressed_size: u64,
}

impl Default for ExtractLimits {
    fn default() -> Self {
        Self {
            max_archive_size: 15 * MB,
            max_files: 500,
            max_file_size: 500 * KB,
            max_decompressed_size: 256 * MB,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffOptions {
    /// Unchanged lines kept on each side of a change run.
    pub context_lines: usize,
    /// Upper bound on the time spent searching for a minimal diff.
    pub timeout: Duration,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            context_lines: 3,
            timeout: Duration::from_secs(1),
        }
    }
}

/// Everything needed to go from a package name and two versions to a diff.
#[derive(Debug, Clone)]
pub struct Config {
    pub limits: ExtractLimits,
    pub diff: DiffOptions,
    pub fetch_timeout: Duration,
    pub npm_registry: String,
    pub wp_api: String,
    pub wp_downloads: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            limits: ExtractLimits::default(),
            diff: DiffOptions::default(),
            fetch_timeout: Duration::from_secs(30),
            npm_registry: DEFAULT_NPM_REGISTRY.to_string(),
            wp_api: DEFAULT_WP_API.to_string(),
            wp_downloads: DEFAULT_WP_DOWNLOADS.to_string(),
        }
    }
}
