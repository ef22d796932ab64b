use crate::archive::format::{padding_bytes, Header, ALIGNMENT, HEADER_SIZE};
use crate::archive::names::{DecodingContext, NameResolution, NameVariant};

/// Names under which symbol tables are stored. They are surfaced as ordinary
/// members; their contents are not interpreted.
const SYMBOL_TABLE_NAMES: &[&str] = &["/", "/SYM64/", "__.SYMDEF", "__.SYMDEF SORTED"];

/// A decoded archive member: header, name variant and resolved name, and the
/// member's position in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    header: Header,
    variant: NameVariant,
    name: NameResolution,
    offset: u64,
}

impl Member {
    /// Assemble a member from its decoded header.
    ///
    /// `embedded_name` carries the name bytes of a BSD member; `offset` is the
    /// archive offset of the header.
    pub fn new(
        header: Header,
        variant: NameVariant,
        embedded_name: Option<&[u8]>,
        context: &DecodingContext,
        offset: u64,
    ) -> Self {
        let name = context.resolve(&header.name, variant, embedded_name);
        Self {
            header,
            variant,
            name,
            offset,
        }
    }

    /// Resolved file name, or the raw token if it could not be resolved
    pub fn name(&self) -> &str {
        self.name.name()
    }

    /// Trimmed content of the header's name field
    pub fn raw_name(&self) -> &str {
        &self.header.name
    }

    pub fn name_resolution(&self) -> &NameResolution {
        &self.name
    }

    pub fn is_name_resolved(&self) -> bool {
        self.name.is_resolved()
    }

    pub fn variant(&self) -> NameVariant {
        self.variant
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn is_symbol_table(&self) -> bool {
        SYMBOL_TABLE_NAMES.contains(&self.raw_name())
    }

    /// Modification time in seconds since the epoch
    pub fn mtime(&self) -> u64 {
        self.header.mtime
    }

    pub fn uid(&self) -> u32 {
        self.header.uid
    }

    pub fn gid(&self) -> u32 {
        self.header.gid
    }

    pub fn mode(&self) -> u32 {
        self.header.mode
    }

    /// Size of the data region, embedded BSD name included, padding excluded
    pub fn data_size(&self) -> u64 {
        self.header.size
    }

    /// Size of the file content alone
    pub fn file_size(&self) -> u64 {
        self.data_size()
            .saturating_sub(self.variant.embedded_name_len())
    }

    pub fn padding(&self) -> u64 {
        padding_bytes(self.data_size(), ALIGNMENT)
    }

    /// Footprint of the member in the archive: header, data and padding
    pub fn total_size(&self) -> u64 {
        HEADER_SIZE as u64 + self.data_size() + self.padding()
    }

    /// Archive offset of the member header
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Archive offset of the first byte of file content
    pub fn data_offset(&self) -> u64 {
        self.offset + HEADER_SIZE as u64 + self.variant.embedded_name_len()
    }

    /// Archive offset at which the following member starts
    pub fn next_offset(&self) -> u64 {
        self.offset + self.total_size()
    }
}
