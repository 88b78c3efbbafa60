use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::archive::ArchiveFormat;
use crate::config::{
    Config, DEFAULT_NPM_REGISTRY, DEFAULT_WP_API, DEFAULT_WP_DOWNLOADS, DiffOptions,
    ExtractLimits,
};
use crate::registry::PackageType;
use crate::version::parse_version_range;

#[derive(Parser, Debug)]
#[command(name = "pkgdiff")]
#[command(version)]
#[command(about = "Compare two published versions of an npm package or WordPress plugin", long_about = None)]
#[command(after_help = "Examples:\n  \
  pkgdiff npm left-pad 1.1.0...1.3.0     diff two npm releases\n  \
  pkgdiff wp akismet 5.0 5.1 --stat      summarize a plugin update\n  \
  pkgdiff versions npm @babel/core       list published versions\n  \
  pkgdiff local old.zip new.zip --format zip --json")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Print the diff as JSON
    #[arg(long, global = true, conflicts_with = "stat")]
    pub json: bool,

    /// Print only per-file status and totals
    #[arg(long, global = true)]
    pub stat: bool,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short = 'q', global = true)]
    pub quiet: bool,

    #[command(flatten)]
    pub limits: LimitArgs,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Diff two versions of an npm package
    Npm(PackageArgs),

    /// Diff two versions of a WordPress.org plugin
    Wp(PackageArgs),

    /// List the published versions of a package, newest first
    Versions {
        /// Registry: npm or wp
        #[arg(value_name = "REGISTRY")]
        registry: PackageType,

        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Diff two archives on disk
    Local {
        #[arg(value_name = "OLD")]
        old: String,

        #[arg(value_name = "NEW")]
        new: String,

        /// Archive format of both files
        #[arg(long, value_enum, default_value_t = FormatArg::Tgz)]
        format: FormatArg,
    },
}

#[derive(Args, Debug)]
pub struct PackageArgs {
    /// Package name or plugin slug
    #[arg(value_name = "NAME")]
    pub name: String,

    /// `FROM...TO`, or just `FROM` when TO is given separately
    #[arg(value_name = "FROM...TO")]
    pub range: String,

    #[arg(value_name = "TO")]
    pub to: Option<String>,
}

impl PackageArgs {
    /// The two versions to compare.
    pub fn versions(&self) -> Result<(String, String), String> {
        match &self.to {
            Some(to) => Ok((self.range.clone(), to.clone())),
            None => parse_version_range(&self.range)
                .ok_or_else(|| format!("expected FROM...TO, got {:?}", self.range)),
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
    /// gzip-compressed tar (npm)
    Tgz,
    /// zip (WordPress)
    Zip,
}

impl From<FormatArg> for ArchiveFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Tgz => ArchiveFormat::TarGzip,
            FormatArg::Zip => ArchiveFormat::Zip,
        }
    }
}

/// Resource caps, timeouts and endpoints.
#[derive(Args, Debug)]
pub struct LimitArgs {
    /// Largest archive accepted, in bytes
    #[arg(long, global = true, env = "PKGDIFF_MAX_ARCHIVE_SIZE", default_value_t = ExtractLimits::default().max_archive_size)]
    pub max_archive_size: u64,

    /// Stop after this many files per archive
    #[arg(long, global = true, env = "PKGDIFF_MAX_FILES", default_value_t = ExtractLimits::default().max_files)]
    pub max_files: usize,

    /// Skip files larger than this, in bytes
    #[arg(long, global = true, env = "PKGDIFF_MAX_FILE_SIZE", default_value_t = ExtractLimits::default().max_file_size)]
    pub max_file_size: u64,

    /// Total decompressed bytes allowed per archive
    #[arg(long, global = true, env = "PKGDIFF_MAX_DECOMPRESSED_SIZE", default_value_t = ExtractLimits::default().max_decompressed_size)]
    pub max_decompressed_size: u64,

    /// Unchanged lines shown around each change
    #[arg(short = 'U', long, global = true, env = "PKGDIFF_CONTEXT", default_value_t = DiffOptions::default().context_lines)]
    pub context: usize,

    /// Time budget for each diff, in milliseconds
    #[arg(long, global = true, env = "PKGDIFF_DIFF_TIMEOUT_MS", default_value_t = 1000)]
    pub diff_timeout_ms: u64,

    /// HTTP timeout, in seconds
    #[arg(long, global = true, env = "PKGDIFF_FETCH_TIMEOUT", default_value_t = 30)]
    pub fetch_timeout: u64,

    #[arg(long, global = true, env = "PKGDIFF_NPM_REGISTRY", default_value = DEFAULT_NPM_REGISTRY)]
    pub npm_registry: String,

    #[arg(long, global = true, env = "PKGDIFF_WP_API", default_value = DEFAULT_WP_API)]
    pub wp_api: String,

    #[arg(long, global = true, env = "PKGDIFF_WP_DOWNLOADS", default_value = DEFAULT_WP_DOWNLOADS)]
    pub wp_downloads: String,
}

impl Cli {
    pub fn config(&self) -> Config {
        let args = &self.limits;
        Config {
            limits: ExtractLimits {
                max_archive_size: args.max_archive_size,
                max_files: args.max_files,
                max_file_size: args.max_file_size,
                max_decompressed_size: args.max_decompressed_size,
            },
            diff: DiffOptions {
                context_lines: args.context,
                timeout: Duration::from_millis(args.diff_timeout_ms),
            },
            fetch_timeout: Duration::from_secs(args.fetch_timeout),
            npm_registry: args.npm_registry.clone(),
            wp_api: args.wp_api.clone(),
            wp_downloads: args.wp_downloads.clone(),
        }
    }

    /// Default log filter for the verbosity flags.
    pub fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            return log::LevelFilter::Error;
        }
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}
