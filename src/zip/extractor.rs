use std::io::Read;

use flate2::Crc;
use flate2::read::DeflateDecoder;
use log::{debug, warn};

use crate::archive::{FileTree, FileTreeBuilder, strip_root_component};
use crate::config::ExtractLimits;
use crate::error::{Error, Result};

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

/// ZIP file extractor
pub struct ZipExtractor<'a> {
    parser: ZipParser<'a>,
}

impl<'a> ZipExtractor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            parser: ZipParser::new(data),
        }
    }

    /// List all entries in the archive
    pub fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        self.parser.list_files()
    }

    /// Decompress one entry, producing at most its declared size.
    ///
    /// # Errors
    ///
    /// [`Error::DecompressionTooLarge`] if the data inflates past the size the
    /// central directory declared. [`Error::MalformedArchive`] for
    /// out-of-bounds data, corrupt deflate streams and unsupported methods.
    pub fn extract_to_memory(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        let raw = self.parser.entry_data(entry)?;
        let declared = entry.uncompressed_size;

        match entry.compression_method {
            CompressionMethod::Stored => {
                if raw.len() as u64 != declared {
                    return Err(Error::malformed(format!(
                        "stored entry {} has mismatched sizes",
                        entry.file_name
                    )));
                }
                Ok(raw.to_vec())
            }
            CompressionMethod::Deflate => {
                let capacity = usize::try_from(declared).unwrap_or(0).min(raw.len() * 4);
                let mut out = Vec::with_capacity(capacity);
                DeflateDecoder::new(raw)
                    .take(declared.saturating_add(1))
                    .read_to_end(&mut out)?;
                if out.len() as u64 > declared {
                    return Err(Error::DecompressionTooLarge { limit: declared });
                }
                Ok(out)
            }
            method @ CompressionMethod::Unknown(_) => Err(Error::malformed(format!(
                "unsupported compression ({method}) for {}",
                entry.file_name
            ))),
        }
    }

    /// Build a filtered tree from the archive.
    ///
    /// Entries are judged on their central directory record (name and
    /// declared size) before any of their data is touched, so oversized or
    /// excluded members are never inflated.
    pub fn extract_tree(&self, limits: ExtractLimits) -> Result<FileTree> {
        let mut builder = FileTreeBuilder::new(limits);

        for entry in self.list_files()? {
            if builder.is_full() {
                debug!("file limit reached, stopping before {}", entry.file_name);
                break;
            }
            if entry.is_directory {
                continue;
            }

            let path = strip_root_component(&entry.file_name);
            let Some(class) = builder.admit(path, entry.uncompressed_size) else {
                continue;
            };

            if entry.is_encrypted() {
                warn!("skipping encrypted entry {}", entry.file_name);
                continue;
            }

            let data = match self.extract_to_memory(&entry) {
                Ok(data) => data,
                Err(err @ Error::DecompressionTooLarge { .. }) => return Err(err),
                Err(err) => {
                    warn!("skipping {}: {err}", entry.file_name);
                    continue;
                }
            };
            builder.charge(data.len() as u64)?;

            let mut crc = Crc::new();
            crc.update(&data);
            if crc.sum() != entry.crc32 {
                warn!("skipping {}: CRC-32 mismatch", entry.file_name);
                continue;
            }

            builder.accept(path, &data, class, data.len() as u64);
        }

        Ok(builder.finish())
    }
}
