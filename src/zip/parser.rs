//! Low-level ZIP archive parser.
//!
//! ZIP files are read from the end:
//! 1. Find the End of Central Directory (EOCD) at the file's end
//! 2. If ZIP64, follow the locator to the ZIP64 EOCD for the real counts
//! 3. Read the Central Directory to get metadata for all files
//! 4. For extraction, read each file's Local File Header and data
//!
//! Every offset and length read from the archive is checked against the
//! buffer before it is used; the archive is untrusted.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

use crate::error::{Error, Result};

use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: usize = 65535;

/// Location and size of the central directory.
struct CentralDirectory {
    offset: u64,
    size: u64,
    entries: u64,
}

/// ZIP parser over an in-memory archive.
///
/// Typically used through [`ZipExtractor`](super::ZipExtractor)
/// rather than directly.
pub struct ZipParser<'a> {
    data: &'a [u8],
}

impl<'a> ZipParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Bounds-checked view of `len` bytes at `offset`.
    fn slice(&self, offset: u64, len: u64, what: &str) -> Result<&'a [u8]> {
        let start = usize::try_from(offset).ok();
        let end = offset
            .checked_add(len)
            .and_then(|end| usize::try_from(end).ok());
        match (start, end) {
            (Some(start), Some(end)) if end <= self.data.len() => Ok(&self.data[start..end]),
            _ => Err(Error::malformed(format!(
                "{what} at offset {offset} runs past end of archive"
            ))),
        }
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// Returns the record and its offset in the archive.
    pub fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64)> {
        let size = self.data.len();
        if size < EndOfCentralDirectory::SIZE {
            return Err(Error::malformed("not a valid ZIP file"));
        }

        // Common case first: no comment, EOCD is the last 22 bytes.
        let offset = size - EndOfCentralDirectory::SIZE;
        let tail = &self.data[offset..];
        if tail.starts_with(EndOfCentralDirectory::SIGNATURE) && tail[20..22] == [0, 0] {
            return Ok((EndOfCentralDirectory::from_bytes(tail)?, offset as u64));
        }

        // Otherwise scan backwards through the largest possible comment. A
        // candidate only counts if its comment length reaches exactly to the
        // end of the file.
        let window_start = size - (MAX_COMMENT_SIZE + EndOfCentralDirectory::SIZE).min(size);
        let window = &self.data[window_start..];
        (0..=window.len() - EndOfCentralDirectory::SIZE)
            .rev()
            .filter(|&i| window[i..].starts_with(EndOfCentralDirectory::SIGNATURE))
            .find(|&i| {
                let comment_len = u16::from_le_bytes([window[i + 20], window[i + 21]]) as usize;
                comment_len == window.len() - i - EndOfCentralDirectory::SIZE
            })
            .map(|i| {
                let record = &window[i..i + EndOfCentralDirectory::SIZE];
                Ok((
                    EndOfCentralDirectory::from_bytes(record)?,
                    (window_start + i) as u64,
                ))
            })
            .unwrap_or_else(|| Err(Error::malformed("not a valid ZIP file")))
    }

    /// Read the ZIP64 End of Central Directory record via the locator that
    /// sits immediately before the regular EOCD.
    pub fn read_zip64_eocd(&self, eocd_offset: u64) -> Result<Zip64EOCD> {
        let locator_offset = eocd_offset
            .checked_sub(Zip64EOCDLocator::SIZE as u64)
            .ok_or_else(|| Error::malformed("missing ZIP64 locator"))?;
        let locator = Zip64EOCDLocator::from_bytes(self.slice(
            locator_offset,
            Zip64EOCDLocator::SIZE as u64,
            "ZIP64 locator",
        )?)?;

        Zip64EOCD::from_bytes(self.slice(
            locator.eocd64_offset,
            Zip64EOCD::MIN_SIZE as u64,
            "ZIP64 end of central directory",
        )?)
    }

    fn central_directory(&self) -> Result<CentralDirectory> {
        let (eocd, eocd_offset) = self.find_eocd()?;
        if eocd.is_multi_disk() {
            return Err(Error::malformed("multi-disk archives are not supported"));
        }

        if eocd.is_zip64() {
            let eocd64 = self.read_zip64_eocd(eocd_offset)?;
            return Ok(CentralDirectory {
                offset: eocd64.cd_offset,
                size: eocd64.cd_size,
                entries: eocd64.total_entries,
            });
        }

        Ok(CentralDirectory {
            offset: u64::from(eocd.cd_offset),
            size: u64::from(eocd.cd_size),
            entries: u64::from(eocd.total_entries),
        })
    }

    /// List all entries in the ZIP archive, in central directory order.
    pub fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        let cd = self.central_directory()?;
        let records = self.slice(cd.offset, cd.size, "central directory")?;

        // A forged entry count cannot make us allocate more than the
        // directory could possibly hold.
        let capacity = cd.entries.min(cd.size / CDFH_MIN_SIZE as u64 + 1);
        let mut entries = Vec::with_capacity(capacity as usize);
        let mut cursor = Cursor::new(records);
        for _ in 0..cd.entries {
            entries.push(Self::parse_cdfh(&mut cursor)?);
        }

        Ok(entries)
    }

    /// Parse one Central Directory File Header at the cursor, leaving the
    /// cursor on the next header.
    fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> Result<ZipFileEntry> {
        let mut sig = [0u8; 4];
        cursor.read_exact(&mut sig)?;
        if sig != CDFH_SIGNATURE {
            return Err(Error::malformed("invalid central directory file header"));
        }

        // Version made by, version needed.
        cursor.set_position(cursor.position() + 4);
        let flags = cursor.read_u16::<LittleEndian>()?;
        let method = cursor.read_u16::<LittleEndian>()?;
        // Modification time and date.
        cursor.set_position(cursor.position() + 4);
        let crc32 = cursor.read_u32::<LittleEndian>()?;
        let compressed_size = cursor.read_u32::<LittleEndian>()?;
        let uncompressed_size = cursor.read_u32::<LittleEndian>()?;
        let name_len = cursor.read_u16::<LittleEndian>()? as usize;
        let extra_len = cursor.read_u16::<LittleEndian>()? as usize;
        let comment_len = cursor.read_u16::<LittleEndian>()? as u64;
        // Disk number start, internal and external attributes.
        cursor.set_position(cursor.position() + 8);
        let lfh_offset = cursor.read_u32::<LittleEndian>()?;

        let mut name = vec![0u8; name_len];
        cursor.read_exact(&mut name)?;
        let file_name = String::from_utf8_lossy(&name).into_owned();

        let mut extra = vec![0u8; extra_len];
        cursor.read_exact(&mut extra)?;
        cursor.set_position(cursor.position() + comment_len);

        let mut sizes = Zip64Sizes {
            uncompressed: u64::from(uncompressed_size),
            compressed: u64::from(compressed_size),
            lfh_offset: u64::from(lfh_offset),
        };
        sizes.apply_extra(&extra)?;

        Ok(ZipFileEntry {
            is_directory: file_name.ends_with('/'),
            file_name,
            flags,
            compression_method: CompressionMethod::from_u16(method),
            compressed_size: sizes.compressed,
            uncompressed_size: sizes.uncompressed,
            crc32,
            lfh_offset: sizes.lfh_offset,
        })
    }

    /// Offset of the entry's data, found by reading the variable-length
    /// fields of its Local File Header (they may differ from the central
    /// directory copy).
    pub fn get_data_offset(&self, entry: &ZipFileEntry) -> Result<u64> {
        let lfh = self.slice(entry.lfh_offset, LFH_SIZE as u64, "local file header")?;
        if !lfh.starts_with(LFH_SIGNATURE) {
            return Err(Error::malformed(format!(
                "invalid local file header for {}",
                entry.file_name
            )));
        }

        let mut cursor = Cursor::new(&lfh[26..]);
        let name_len = cursor.read_u16::<LittleEndian>()? as u64;
        let extra_len = cursor.read_u16::<LittleEndian>()? as u64;

        Ok(entry.lfh_offset + LFH_SIZE as u64 + name_len + extra_len)
    }

    /// The entry's raw (possibly compressed) data.
    pub fn entry_data(&self, entry: &ZipFileEntry) -> Result<&'a [u8]> {
        let offset = self.get_data_offset(entry)?;
        self.slice(offset, entry.compressed_size, "entry data")
    }
}

/// The three central directory values ZIP64 may widen.
struct Zip64Sizes {
    uncompressed: u64,
    compressed: u64,
    lfh_offset: u64,
}

impl Zip64Sizes {
    /// Replace saturated 32-bit values with the 64-bit ones from the ZIP64
    /// extra field. The extra field only carries the saturated values, in
    /// this fixed order.
    fn apply_extra(&mut self, extra: &[u8]) -> Result<()> {
        let mut cursor = Cursor::new(extra);
        while cursor.position() + 4 <= extra.len() as u64 {
            let id = cursor.read_u16::<LittleEndian>()?;
            let len = cursor.read_u16::<LittleEndian>()? as u64;
            let end = cursor.position() + len;
            if id != ZIP64_EXTRA_ID {
                cursor.set_position(end);
                continue;
            }

            for field in [
                &mut self.uncompressed,
                &mut self.compressed,
                &mut self.lfh_offset,
            ] {
                if *field == u64::from(u32::MAX) && cursor.position() + 8 <= end {
                    *field = cursor.read_u64::<LittleEndian>()?;
                }
            }
            break;
        }
        Ok(())
    }
}
