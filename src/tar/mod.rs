//! gzip-compressed tar archives (npm tarballs).
//!
//! The whole stream is gunzipped into memory (bounded by
//! [`ExtractLimits::max_decompressed_size`]) and then walked header by
//! header:
//!
//! 1. Each member starts with a 512-byte header block ([`TarHeader`]).
//! 2. Its data follows, padded to a multiple of 512 bytes.
//! 3. A block of zeroes ends the archive. The format asks for two; the first
//!    one is enough here.
//!
//! Only regular files are read. Every other member type is stepped over
//! using its size field, which keeps the walk aligned on the next header
//! whether or not the member was accepted.
//!
//! Member names are normalized by dropping a leading `package/` (the npm
//! convention) and then one more leading component.

mod structures;

pub use structures::{BLOCK_SIZE, TarHeader};

use std::io::Read;

use flate2::read::GzDecoder;
use log::debug;

use crate::archive::{FileTree, FileTreeBuilder, strip_root_component};
use crate::config::ExtractLimits;
use crate::error::{Error, Result};

pub(crate) fn extract(data: &[u8], limits: ExtractLimits) -> Result<FileTree> {
    let tar = gunzip(data, limits.max_decompressed_size)?;
    let mut builder = FileTreeBuilder::new(limits);
    walk(&tar, &mut builder);
    Ok(builder.finish())
}

/// Decompress a gzip stream, refusing to produce more than `limit` bytes.
pub fn gunzip(data: &[u8], limit: u64) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(data)
        .take(limit.saturating_add(1))
        .read_to_end(&mut out)
        .map_err(|e| Error::malformed(format!("gzip stream: {e}")))?;

    if out.len() as u64 > limit {
        return Err(Error::DecompressionTooLarge { limit });
    }
    Ok(out)
}

/// Map a raw member name to its tree path.
pub fn normalize_path(raw: &str) -> &str {
    let path = raw.strip_prefix("package/").unwrap_or(raw);
    strip_root_component(path)
}

fn walk(tar: &[u8], builder: &mut FileTreeBuilder) {
    let mut offset = 0usize;

    while offset + BLOCK_SIZE <= tar.len() {
        if builder.is_full() {
            debug!("file limit reached, stopping at offset {offset}");
            break;
        }

        let block = &tar[offset..offset + BLOCK_SIZE];
        if TarHeader::is_end_marker(block) {
            break;
        }

        let header = TarHeader::from_block(block);
        offset += BLOCK_SIZE;

        if header.is_regular_file() {
            let raw = header.path();
            let path = normalize_path(&raw);
            if let Some(class) = builder.admit(path, header.size) {
                // Truncated archives yield whatever data is present.
                let end = offset.saturating_add(header.size as usize).min(tar.len());
                builder.accept(path, &tar[offset..end], class, header.size);
            }
        } else {
            debug!(
                "skipping {} (type flag {:#04x})",
                header.path(),
                header.type_flag
            );
        }

        let Some(advance) = header
            .padded_size()
            .and_then(|size| usize::try_from(size).ok())
        else {
            debug!("size field of {} overflows, ending walk", header.path());
            break;
        };
        offset = offset.saturating_add(advance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("package/index.js", "index.js")]
    #[case("package/lib/util.js", "util.js")]
    #[case("mypkg-1.0.0/README.md", "README.md")]
    #[case("mypkg-1.0.0/node_modules/foo/index.js", "node_modules/foo/index.js")]
    #[case("index.js", "index.js")]
    fn normalizes_member_names(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_path(raw), expected);
    }

    #[test]
    fn garbage_is_malformed() {
        let err = gunzip(b"definitely not gzip", 1024).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::MalformedArchive);
    }
}
