//! Error taxonomy shared by extraction, diffing, fetching and registry lookups.
//!
//! Every failure a caller can see carries a machine-readable [`ErrorKind`]
//! alongside a human message, so front ends can render a specific state
//! ("package too large", "version not found") instead of a generic failure.

use thiserror::Error;

use crate::registry::PackageType;

/// Errors produced by this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The raw archive exceeded the configured ceiling before decompression.
    #[error(
        "Package too large ({}MB). Maximum supported size is {}MB.",
        megabytes(.size),
        megabytes(.limit)
    )]
    ArchiveTooLarge { size: u64, limit: u64 },

    /// Decompressed output grew past the configured bound.
    #[error("Package exceeds extraction limits (expands beyond {} bytes)", .limit)]
    DecompressionTooLarge { limit: u64 },

    /// The archive (or registry metadata) could not be retrieved.
    #[error("Failed to fetch {url}: {reason}")]
    FetchFailed {
        url: String,
        status: Option<u16>,
        reason: String,
    },

    #[error("Package \"{name}\" not found on {registry}")]
    PackageNotFound { registry: PackageType, name: String },

    /// One or both requested versions are not published.
    #[error("{}", crate::version::format_invalid_versions(.missing))]
    VersionNotFound {
        name: String,
        missing: Vec<String>,
        available: Vec<String>,
    },

    /// Header or central-directory corruption not otherwise categorized.
    #[error("Malformed archive: {0}")]
    MalformedArchive(String),
}

/// Fieldless discriminant of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ArchiveTooLarge,
    DecompressionTooLarge,
    FetchFailed,
    PackageNotFound,
    VersionNotFound,
    MalformedArchive,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ArchiveTooLarge { .. } => ErrorKind::ArchiveTooLarge,
            Error::DecompressionTooLarge { .. } => ErrorKind::DecompressionTooLarge,
            Error::FetchFailed { .. } => ErrorKind::FetchFailed,
            Error::PackageNotFound { .. } => ErrorKind::PackageNotFound,
            Error::VersionNotFound { .. } => ErrorKind::VersionNotFound,
            Error::MalformedArchive(_) => ErrorKind::MalformedArchive,
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedArchive(message.into())
    }

    pub(crate) fn fetch(url: &str, status: Option<u16>, reason: impl ToString) -> Self {
        Error::FetchFailed {
            url: url.to_string(),
            status,
            reason: reason.to_string(),
        }
    }
}

/// Archive parsing reads from in-memory buffers, so the only I/O failure it
/// can hit is running off the end of the data.
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::MalformedArchive(err.to_string())
    }
}

fn megabytes(bytes: &u64) -> u64 {
    (*bytes as f64 / 1024.0 / 1024.0).round() as u64
}

pub type Result<T> = std::result::Result<T, Error>;
