use crate::error::{ArError, Result};

/// Global archive magic: `!<arch>\n`
pub const MAGIC: [u8; 8] = *b"!<arch>\n";

/// Member header size in bytes (common to every variant)
pub const HEADER_SIZE: usize = 60;

/// Header trailer string closing every member header
pub const TRAILER: [u8; 2] = *b"`\n";

/// Members start on 2-byte boundaries
pub const ALIGNMENT: u64 = 2;

/// Fill byte written after odd-sized data regions
pub const PAD_BYTE: u8 = b'\n';

/// Width of the name field
pub const NAME_WIDTH: usize = 16;

/// Largest data region the 10-digit decimal size field can hold
pub const MAX_DATA_SIZE: u64 = 9_999_999_999;

// Field layout: (start, width)
const NAME_FIELD: (usize, usize) = (0, NAME_WIDTH);
const MTIME_FIELD: (usize, usize) = (16, 12);
const UID_FIELD: (usize, usize) = (28, 6);
const GID_FIELD: (usize, usize) = (34, 6);
const MODE_FIELD: (usize, usize) = (40, 8);
const SIZE_FIELD: (usize, usize) = (48, 10);
const TRAILER_OFFSET: usize = 58;

/// Number of fill bytes needed after `size` bytes of data to reach the next
/// multiple of `alignment`.
pub fn padding_bytes(size: u64, alignment: u64) -> u64 {
    (alignment - size % alignment) % alignment
}

/// Builds a raw member header from already-formatted field values.
///
/// Every field is right-padded with spaces to its fixed width. Values wider
/// than their field are truncated, the name included; this is lossy and not
/// reported.
pub fn build_header(
    name: &str,
    mtime: &str,
    uid: &str,
    gid: &str,
    mode: &str,
    size: &str,
) -> [u8; HEADER_SIZE] {
    let mut raw = [b' '; HEADER_SIZE];
    write_field(&mut raw, NAME_FIELD, name);
    write_field(&mut raw, MTIME_FIELD, mtime);
    write_field(&mut raw, UID_FIELD, uid);
    write_field(&mut raw, GID_FIELD, gid);
    write_field(&mut raw, MODE_FIELD, mode);
    write_field(&mut raw, SIZE_FIELD, size);
    raw[TRAILER_OFFSET..].copy_from_slice(&TRAILER);
    raw
}

fn write_field(raw: &mut [u8; HEADER_SIZE], (start, width): (usize, usize), value: &str) {
    let bytes = value.as_bytes();
    let len = bytes.len().min(width);
    raw[start..start + len].copy_from_slice(&bytes[..len]);
}

/// Decoded common member header.
///
/// `name` is the whitespace-trimmed content of the name field; it has not been
/// resolved against any name variant yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub mtime: u64,
    pub uid: u32,
    pub gid: u32,
    pub mode: u32,
    pub size: u64,
}

impl Header {
    /// Decode a 60-byte header located at archive offset `offset`.
    ///
    /// The offset is only used for error reporting.
    pub fn parse(raw: &[u8; HEADER_SIZE], offset: u64) -> Result<Self> {
        if raw[TRAILER_OFFSET..] != TRAILER {
            return Err(ArError::malformed(
                offset,
                format!(
                    "missing header trailer string, found {:?}",
                    String::from_utf8_lossy(&raw[TRAILER_OFFSET..])
                ),
            ));
        }

        let name = String::from_utf8_lossy(field(raw, NAME_FIELD))
            .trim()
            .to_string();

        let parse = |range, radix, what: &str| {
            parse_numeric_field(field(raw, range), radix)
                .ok_or_else(|| ArError::malformed(offset, format!("non-numeric {} field", what)))
        };

        let mtime = parse(MTIME_FIELD, 10, "timestamp")?;
        let uid = parse(UID_FIELD, 10, "uid")?;
        let gid = parse(GID_FIELD, 10, "gid")?;
        let mode = parse(MODE_FIELD, 8, "mode")?;
        let size = parse(SIZE_FIELD, 10, "size")?;

        Ok(Self {
            name,
            mtime,
            uid: narrow(uid, offset, "uid")?,
            gid: narrow(gid, offset, "gid")?,
            mode: narrow(mode, offset, "mode")?,
            size,
        })
    }

    /// Encode this header, mode as octal and everything else as decimal.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        build_header(
            &self.name,
            &self.mtime.to_string(),
            &self.uid.to_string(),
            &self.gid.to_string(),
            &format!("{:o}", self.mode),
            &self.size.to_string(),
        )
    }
}

fn field(raw: &[u8; HEADER_SIZE], (start, width): (usize, usize)) -> &[u8] {
    &raw[start..start + width]
}

fn narrow(value: u64, offset: u64, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| ArError::malformed(offset, format!("{} field out of range", what)))
}

/// Parses a space-padded ASCII number. A blank field reads as zero, which is
/// how the `//` name table leaves its metadata fields.
pub(crate) fn parse_numeric_field(digits: &[u8], radix: u32) -> Option<u64> {
    let text = std::str::from_utf8(digits).ok()?.trim();
    if text.is_empty() {
        return Some(0);
    }
    let mut result: u64 = 0;
    for c in text.chars() {
        let x = c.to_digit(radix)?;
        result = result
            .checked_mul(u64::from(radix))?
            .checked_add(u64::from(x))?;
    }
    Some(result)
}
