//! WordPress plugin downloads: ZIP parsing and bounded extraction.
//!
//! - [`structures`]: fixed-layout records (EOCD, ZIP64 EOCD and locator) and
//!   the per-entry view of a central directory record
//! - [`parser`]: walks those records over the downloaded bytes, checking
//!   every offset before use
//! - [`extractor`]: filters entries and inflates the survivors into a
//!   [`FileTree`]
//!
//! Only the central directory decides what gets inflated. An entry whose
//! path is excluded or whose declared size is over the per-file cap is never
//! decompressed, and inflation stops one byte past the declared size.
//!
//! STORED and DEFLATE entries are read, ZIP64 sizes and offsets included.
//! Encrypted entries and other compression methods are skipped with a
//! warning. Split (multi-disk) archives are rejected.

mod extractor;
mod parser;
mod structures;

pub use extractor::ZipExtractor;
pub use parser::ZipParser;
pub use structures::*;

use crate::archive::FileTree;
use crate::config::ExtractLimits;
use crate::error::Result;

pub(crate) fn extract(data: &[u8], limits: ExtractLimits) -> Result<FileTree> {
    ZipExtractor::new(data).extract_tree(limits)
}
