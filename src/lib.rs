//! arstream: streaming reader and writer for Unix `ar` archives
//!
//! This library reads and writes the `ar` container used for static
//! libraries, including:
//! - the common header layout with 2-byte member alignment
//! - BSD long names (`#1/<len>`, embedded in the member data)
//! - GNU long names (`/<offset>` into the `//` name table)
//! - lazy, seek-based member data streams
//!
//! # Example
//!
//! ```no_run
//! use arstream::{write_archive, ArchiveReader, Variant, WriteOptions};
//!
//! // Create an archive
//! let options = WriteOptions::new().with_variant(Variant::Gnu);
//! write_archive("libexample.a", &["build/a_rather_long_object_name.o"], &options)?;
//!
//! // Read it back
//! let mut reader = ArchiveReader::open("libexample.a")?;
//! while let Some(member) = reader.next_entry()? {
//!     let data = reader.read_member_data()?;
//!     println!("{}: {} bytes", member.name(), data.len());
//! }
//! # Ok::<(), arstream::ArError>(())
//! ```

// Core modules
pub mod archive;
pub mod error;
pub mod options;

// Re-export commonly used types
pub use archive::{
    padding_bytes, write_archive, ArchiveReader, ArchiveWriter, DecodingContext, GnuNameTable,
    Header, Member, MemberData, MemberMeta, NameResolution, NameVariant, HEADER_SIZE, MAGIC,
};
pub use error::{ArError, Result};
pub use options::{Variant, WriteOptions};
