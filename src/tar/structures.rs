/// Tar archives are a sequence of 512-byte blocks.
pub const BLOCK_SIZE: usize = 512;

const NAME: std::ops::Range<usize> = 0..100;
const SIZE: std::ops::Range<usize> = 124..136;
const TYPE_FLAG: usize = 156;
const PREFIX: std::ops::Range<usize> = 345..500;

/// The fields of a ustar header block this crate cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TarHeader {
    pub name: String,
    /// ustar long-name prefix, joined to `name` with a slash.
    pub prefix: String,
    /// Member data length. Unparseable size fields read as 0.
    pub size: u64,
    pub type_flag: u8,
}

impl TarHeader {
    /// Parse a header block. `block` must hold at least [`BLOCK_SIZE`] bytes.
    pub fn from_block(block: &[u8]) -> Self {
        Self {
            name: nul_terminated(&block[NAME]),
            prefix: nul_terminated(&block[PREFIX]),
            size: parse_size(&block[SIZE]),
            type_flag: block[TYPE_FLAG],
        }
    }

    /// A block of all zeroes marks the end of the archive.
    pub fn is_end_marker(block: &[u8]) -> bool {
        block.iter().all(|&b| b == 0)
    }

    pub fn path(&self) -> String {
        if self.prefix.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.prefix, self.name)
        }
    }

    /// Old tar writers use NUL, ustar uses ASCII `'0'`. Directories, links and
    /// PAX/GNU extension headers all use other flags.
    pub fn is_regular_file(&self) -> bool {
        self.type_flag == 0 || self.type_flag == b'0'
    }

    /// Bytes occupied by the member data, rounded up to whole blocks.
    /// `None` when the size field is too large to address.
    pub fn padded_size(&self) -> Option<u64> {
        self.size
            .div_ceil(BLOCK_SIZE as u64)
            .checked_mul(BLOCK_SIZE as u64)
    }
}

fn nul_terminated(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Octal ASCII, optionally space-padded and NUL/space-terminated. GNU tar
/// switches to big-endian base-256 (high bit of the first byte set) for
/// sizes that do not fit in 11 octal digits.
fn parse_size(field: &[u8]) -> u64 {
    if field.first().is_some_and(|&b| b & 0x80 != 0) {
        return field[1..]
            .iter()
            .try_fold(u64::from(field[0] & 0x7f), |acc, &b| {
                acc.checked_mul(256).map(|v| v | u64::from(b))
            })
            .unwrap_or(0);
    }

    let text = String::from_utf8_lossy(field);
    let digits = text.trim_start();
    let end = digits
        .find(|c: char| !('0'..='7').contains(&c))
        .unwrap_or(digits.len());
    u64::from_str_radix(&digits[..end], 8).unwrap_or(0)
}
