//! Member name variants and their resolution.
//!
//! The 16-byte name field is interpreted in one of three ways:
//! - common: the name itself, usually terminated by `/`
//! - BSD (`#1/<n>`): the real name is stored in the first `n` bytes of the
//!   data region
//! - GNU (`/<offset>`): the real name lives in the `//` name table member at
//!   the given byte offset

use crate::archive::format::parse_numeric_field;
use crate::error::{ArError, Result};
use std::collections::HashMap;

/// Name of the GNU extended name table pseudo-member
pub const NAME_TABLE_NAME: &str = "//";

/// Prefix of BSD extended names
pub const BSD_PREFIX: &str = "#1/";

/// Terminator of every GNU name table entry
const TABLE_ENTRY_END: &[u8] = b"/\n";

/// How a member's name field must be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameVariant {
    Common,
    Bsd { name_len: u64 },
    GnuShort { offset: u64 },
    /// The `//` pseudo-member itself
    NameTable,
}

impl NameVariant {
    /// Classify a trimmed name field. `offset` is only used for errors.
    pub fn classify(raw_name: &str, offset: u64) -> Result<Self> {
        if raw_name == NAME_TABLE_NAME {
            return Ok(NameVariant::NameTable);
        }

        if let Some(len) = raw_name.strip_prefix(BSD_PREFIX) {
            return parse_decimal(len)
                .map(|name_len| NameVariant::Bsd { name_len })
                .ok_or_else(|| {
                    ArError::malformed(offset, format!("invalid BSD name length in {:?}", raw_name))
                });
        }

        if let Some(digits) = raw_name.strip_prefix('/') {
            if let Some(table_offset) = parse_decimal(digits) {
                return Ok(NameVariant::GnuShort {
                    offset: table_offset,
                });
            }
        }

        Ok(NameVariant::Common)
    }

    /// Bytes of the data region taken up by an embedded BSD name
    pub fn embedded_name_len(&self) -> u64 {
        match self {
            NameVariant::Bsd { name_len } => *name_len,
            _ => 0,
        }
    }
}

fn parse_decimal(digits: &str) -> Option<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    parse_numeric_field(digits.as_bytes(), 10)
}

/// Outcome of resolving a member name.
///
/// Resolution never fails: a name that cannot be resolved degrades to its raw
/// token, tagged as such.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameResolution {
    Resolved(String),
    Unresolved(String),
}

impl NameResolution {
    pub fn name(&self) -> &str {
        match self {
            NameResolution::Resolved(name) | NameResolution::Unresolved(name) => name,
        }
    }

    pub fn into_name(self) -> String {
        match self {
            NameResolution::Resolved(name) | NameResolution::Unresolved(name) => name,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, NameResolution::Resolved(_))
    }
}

/// GNU extended name table: a concatenation of `name/\n` entries
#[derive(Debug, Clone, Default)]
pub struct GnuNameTable {
    data: Vec<u8>,
    offsets: HashMap<String, u64>,
}

impl GnuNameTable {
    /// Empty table, to be filled with [`GnuNameTable::insert`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap the data region of a `//` member
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            data,
            offsets: HashMap::new(),
        }
    }

    /// Append `name` to the table and return its offset. A name that was
    /// already inserted keeps its first offset.
    pub fn insert(&mut self, name: &str) -> u64 {
        if let Some(&offset) = self.offsets.get(name) {
            return offset;
        }
        let offset = self.data.len() as u64;
        self.data.extend_from_slice(name.as_bytes());
        self.data.extend_from_slice(TABLE_ENTRY_END);
        self.offsets.insert(name.to_string(), offset);
        offset
    }

    /// Offset previously assigned to `name` by [`GnuNameTable::insert`]
    pub fn offset_of(&self, name: &str) -> Option<u64> {
        self.offsets.get(name).copied()
    }

    /// Look up the entry starting at `offset`.
    ///
    /// The entry runs up to the next line feed; its trailing `/` is dropped.
    pub fn lookup(&self, offset: u64) -> Option<String> {
        let start = usize::try_from(offset).ok()?;
        let rest = self.data.get(start..)?;
        if rest.is_empty() {
            return None;
        }
        let entry = match rest.iter().position(|&b| b == b'\n') {
            Some(end) => &rest[..end],
            None => rest,
        };
        let entry = entry.strip_suffix(b"/").unwrap_or(entry);
        Some(String::from_utf8_lossy(entry).into_owned())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Archive-scoped state needed to resolve member names.
///
/// Owned by whoever walks or builds the archive; holds the GNU name table once
/// it has been read in full.
#[derive(Debug, Clone, Default)]
pub struct DecodingContext {
    name_table: Option<GnuNameTable>,
}

impl DecodingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name_table(table: GnuNameTable) -> Self {
        Self {
            name_table: Some(table),
        }
    }

    /// Install the name table. Returns `false` if one was already present,
    /// in which case the existing table is kept.
    pub fn set_name_table(&mut self, table: GnuNameTable) -> bool {
        if self.name_table.is_some() {
            return false;
        }
        self.name_table = Some(table);
        true
    }

    pub fn name_table(&self) -> Option<&GnuNameTable> {
        self.name_table.as_ref()
    }

    pub fn has_name_table(&self) -> bool {
        self.name_table.is_some()
    }

    /// Resolve a member's name according to its variant.
    ///
    /// `embedded` holds the bytes that follow the header of a BSD member.
    pub fn resolve(
        &self,
        raw_name: &str,
        variant: NameVariant,
        embedded: Option<&[u8]>,
    ) -> NameResolution {
        match variant {
            NameVariant::NameTable => NameResolution::Resolved(raw_name.to_string()),
            NameVariant::Common => NameResolution::Resolved(strip_common(raw_name).to_string()),
            NameVariant::Bsd { .. } => match embedded {
                Some(bytes) => {
                    let end = bytes
                        .iter()
                        .rposition(|&b| b != 0)
                        .map_or(0, |last| last + 1);
                    let bytes = &bytes[..end];
                    let bytes = bytes.strip_suffix(b"/").unwrap_or(bytes);
                    NameResolution::Resolved(String::from_utf8_lossy(bytes).into_owned())
                }
                None => NameResolution::Unresolved(raw_name.to_string()),
            },
            NameVariant::GnuShort { offset } => {
                match self.name_table.as_ref().and_then(|table| table.lookup(offset)) {
                    Some(name) => NameResolution::Resolved(name),
                    None => {
                        tracing::warn!(
                            "Unresolved GNU member name {:?} (name table {})",
                            raw_name,
                            if self.has_name_table() { "has no such entry" } else { "not read" }
                        );
                        NameResolution::Unresolved(raw_name.to_string())
                    }
                }
            }
        }
    }
}

/// Drops a single trailing `/` terminator from a common name
fn strip_common(raw_name: &str) -> &str {
    raw_name.strip_suffix('/').unwrap_or(raw_name)
}
