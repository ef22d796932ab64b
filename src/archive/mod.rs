mod format;
mod member;
mod names;
mod reader;
mod writer;

pub use format::{
    build_header, padding_bytes, Header, ALIGNMENT, HEADER_SIZE, MAGIC, MAX_DATA_SIZE, NAME_WIDTH,
    PAD_BYTE, TRAILER,
};
pub use member::Member;
pub use names::{
    DecodingContext, GnuNameTable, NameResolution, NameVariant, BSD_PREFIX, NAME_TABLE_NAME,
};
pub use reader::{ArchiveReader, MemberData};
pub use writer::{write_archive, ArchiveWriter, MemberMeta};
