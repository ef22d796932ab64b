use crate::archive::format::{Header, HEADER_SIZE, MAGIC};
use crate::archive::member::Member;
use crate::archive::names::{DecodingContext, GnuNameTable, NameVariant};
use crate::error::{ArError, Result};
use std::fs::File;
use std::io::{self, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

/// Where the sequential walk currently stands
#[derive(Debug)]
enum ReadState {
    ReadingHeader {
        offset: u64,
    },
    ReadingBsdName {
        offset: u64,
        header: Header,
        name_len: u64,
    },
    ReadingGnuTable {
        offset: u64,
        header: Header,
    },
    /// A member has been handed out; its data may be read until `resume`
    StreamingData {
        member: Member,
    },
    Done,
    Failed,
}

/// Sequential, pull-based ar archive reader.
///
/// Members are decoded one header at a time. After [`ArchiveReader::next_entry`]
/// returns a member, the reader stays on it until the caller asks for the next
/// one (or calls [`ArchiveReader::resume`]), so the file content can be
/// streamed through [`ArchiveReader::member_data`] without buffering it.
///
/// ```no_run
/// use arstream::ArchiveReader;
/// use std::io::Read;
///
/// let mut reader = ArchiveReader::open("libfoo.a")?;
/// while let Some(member) = reader.next_entry()? {
///     let mut data = Vec::new();
///     reader.member_data()?.read_to_end(&mut data)?;
///     println!("{} ({} bytes)", member.name(), data.len());
/// }
/// # Ok::<(), arstream::ArError>(())
/// ```
pub struct ArchiveReader<R: Read + Seek = File> {
    inner: Option<R>,
    context: DecodingContext,
    state: ReadState,
}

impl ArchiveReader<File> {
    /// Open an archive file for reading
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(file)
    }
}

impl<R: Read + Seek> ArchiveReader<R> {
    /// Start reading an archive from any seekable byte source.
    ///
    /// Fails with [`ArError::InvalidMagic`] if the source does not start with
    /// the global archive magic.
    pub fn new(mut inner: R) -> Result<Self> {
        inner.seek(SeekFrom::Start(0))?;
        let mut magic = [0u8; 8];
        let read = read_full(&mut inner, &mut magic)?;
        if read != MAGIC.len() || magic != MAGIC {
            return Err(ArError::InvalidMagic);
        }

        tracing::debug!("Opened ar archive");

        Ok(Self {
            inner: Some(inner),
            context: DecodingContext::new(),
            state: ReadState::ReadingHeader {
                offset: MAGIC.len() as u64,
            },
        })
    }

    /// Advance to the next member.
    ///
    /// Returns `Ok(None)` once the archive is exhausted. The GNU name table is
    /// consumed here and never returned. Any error ends the traversal: later
    /// calls return `Ok(None)`.
    pub fn next_entry(&mut self) -> Result<Option<Member>> {
        self.resume();

        loop {
            match &self.state {
                ReadState::StreamingData { member } => return Ok(Some(member.clone())),
                ReadState::Done | ReadState::Failed => return Ok(None),
                _ => {}
            }

            let state = std::mem::replace(&mut self.state, ReadState::Failed);
            match self.step(state) {
                Ok(next) => {
                    if let ReadState::Done = next {
                        tracing::debug!("End of ar archive");
                        self.release();
                    }
                    self.state = next;
                }
                Err(err) => {
                    tracing::debug!("Ar traversal failed: {}", err);
                    self.release();
                    return Err(err);
                }
            }
        }
    }

    /// Leave the current member so the next header read can happen.
    ///
    /// Calling this more than once for the same member has no further effect.
    pub fn resume(&mut self) {
        if let ReadState::StreamingData { member } = &self.state {
            self.state = ReadState::ReadingHeader {
                offset: member.next_offset(),
            };
        }
    }

    /// Lazy byte stream over the current member's file content.
    ///
    /// Nothing is read until the stream is. For BSD members the embedded name
    /// is not part of the stream.
    pub fn member_data(&mut self) -> Result<MemberData<'_, R>> {
        let (start, len) = match &self.state {
            ReadState::StreamingData { member } => (member.data_offset(), member.file_size()),
            _ => return Err(ArError::NoCurrentMember),
        };
        let inner = self.inner.as_mut().ok_or(ArError::NoCurrentMember)?;
        Ok(MemberData {
            inner,
            start,
            len,
            pos: 0,
            positioned: false,
        })
    }

    /// Read the current member's file content into memory
    pub fn read_member_data(&mut self) -> Result<Vec<u8>> {
        let mut data = self.member_data()?;
        let mut buf = Vec::with_capacity(data.len().min(1 << 20) as usize);
        data.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Member returned by the last `next_entry`, until the reader moves on
    pub fn current_member(&self) -> Option<&Member> {
        match &self.state {
            ReadState::StreamingData { member } => Some(member),
            _ => None,
        }
    }

    /// Name resolution context built so far
    pub fn context(&self) -> &DecodingContext {
        &self.context
    }

    /// Whether a GNU name table has been read
    pub fn is_gnu(&self) -> bool {
        self.context.has_name_table()
    }

    /// Whether traversal has ended, successfully or not
    pub fn is_finished(&self) -> bool {
        matches!(self.state, ReadState::Done | ReadState::Failed)
    }

    /// Stop reading and release the underlying source
    pub fn close(mut self) {
        self.state = ReadState::Done;
        self.release();
    }

    fn release(&mut self) {
        if self.inner.take().is_some() {
            tracing::debug!("Closed ar archive");
        }
    }

    fn step(&mut self, state: ReadState) -> Result<ReadState> {
        match state {
            ReadState::ReadingHeader { offset } => {
                let raw = match self.read_header(offset)? {
                    Some(raw) => raw,
                    None => return Ok(ReadState::Done),
                };
                let header = Header::parse(&raw, offset)?;
                let variant = NameVariant::classify(&header.name, offset)?;
                tracing::trace!("Member header {:?} at offset {}", header.name, offset);

                Ok(match variant {
                    NameVariant::NameTable => ReadState::ReadingGnuTable { offset, header },
                    NameVariant::Bsd { name_len } => ReadState::ReadingBsdName {
                        offset,
                        header,
                        name_len,
                    },
                    _ => ReadState::StreamingData {
                        member: self.entry(header, variant, None, offset),
                    },
                })
            }
            ReadState::ReadingBsdName {
                offset,
                header,
                name_len,
            } => {
                if name_len > header.size {
                    return Err(ArError::malformed(
                        offset,
                        format!(
                            "BSD name length {} exceeds member size {}",
                            name_len, header.size
                        ),
                    ));
                }
                let name = self.read_region(offset + HEADER_SIZE as u64, name_len)?;
                let variant = NameVariant::Bsd { name_len };
                Ok(ReadState::StreamingData {
                    member: self.entry(header, variant, Some(&name), offset),
                })
            }
            ReadState::ReadingGnuTable { offset, header } => {
                if self.context.has_name_table() {
                    return Err(ArError::malformed(offset, "duplicate GNU name table"));
                }
                let table =
                    Member::new(header, NameVariant::NameTable, None, &self.context, offset);
                let data = self.read_region(table.data_offset(), table.data_size())?;
                tracing::debug!("Read GNU name table ({} bytes)", data.len());
                self.context.set_name_table(GnuNameTable::from_bytes(data));
                Ok(ReadState::ReadingHeader {
                    offset: table.next_offset(),
                })
            }
            other => Ok(other),
        }
    }

    fn entry(
        &self,
        header: Header,
        variant: NameVariant,
        embedded_name: Option<&[u8]>,
        offset: u64,
    ) -> Member {
        let member = Member::new(header, variant, embedded_name, &self.context, offset);
        tracing::debug!(
            "Entry {:?} at offset {} ({} bytes)",
            member.name(),
            offset,
            member.file_size()
        );
        member
    }

    fn inner(&mut self) -> Result<&mut R> {
        self.inner.as_mut().ok_or_else(|| {
            ArError::Io(io::Error::new(
                ErrorKind::Other,
                "archive source already released",
            ))
        })
    }

    /// Read the 60-byte header at `offset`, or `None` at end of archive
    fn read_header(&mut self, offset: u64) -> Result<Option<[u8; HEADER_SIZE]>> {
        let inner = self.inner()?;
        inner.seek(SeekFrom::Start(offset))?;
        let mut raw = [0u8; HEADER_SIZE];
        match read_full(inner, &mut raw)? {
            0 => Ok(None),
            HEADER_SIZE => Ok(Some(raw)),
            partial => {
                tracing::warn!(
                    "Ignoring {} trailing bytes at offset {} (shorter than a member header)",
                    partial,
                    offset
                );
                Ok(None)
            }
        }
    }

    /// Read exactly `len` bytes at `offset`.
    ///
    /// Memory grows with the bytes actually present, so a corrupt size field
    /// cannot force a huge allocation.
    fn read_region(&mut self, offset: u64, len: u64) -> Result<Vec<u8>> {
        let inner = self.inner()?;
        inner.seek(SeekFrom::Start(offset))?;
        let mut buf = Vec::new();
        inner.by_ref().take(len).read_to_end(&mut buf)?;
        if buf.len() as u64 != len {
            return Err(ArError::Io(io::Error::new(
                ErrorKind::UnexpectedEof,
                format!(
                    "archive truncated: expected {} bytes at offset {}, found {}",
                    len,
                    offset,
                    buf.len()
                ),
            )));
        }
        Ok(buf)
    }
}

impl<R: Read + Seek> std::fmt::Debug for ArchiveReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveReader")
            .field("state", &self.state)
            .field("context", &self.context)
            .field("open", &self.inner.is_some())
            .finish()
    }
}

/// Fill `buf` as far as the source allows; returns the number of bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Lazy reader over one member's file content.
///
/// Borrows the archive reader, so traversal cannot advance while the stream
/// is alive.
pub struct MemberData<'a, R: Read + Seek> {
    inner: &'a mut R,
    start: u64,
    len: u64,
    pos: u64,
    positioned: bool,
}

impl<'a, R: Read + Seek> MemberData<'a, R> {
    /// Total number of content bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Content bytes not yet read
    pub fn remaining(&self) -> u64 {
        self.len - self.pos
    }
}

impl<'a, R: Read + Seek> Read for MemberData<'a, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.len || buf.is_empty() {
            return Ok(0);
        }
        if !self.positioned {
            self.inner.seek(SeekFrom::Start(self.start + self.pos))?;
            self.positioned = true;
        }
        let max = buf.len().min((self.len - self.pos).min(usize::MAX as u64) as usize);
        let n = self.inner.read(&mut buf[..max])?;
        if n == 0 {
            return Err(io::Error::new(
                ErrorKind::UnexpectedEof,
                format!(
                    "archive truncated: member data ends after {} of {} bytes",
                    self.pos, self.len
                ),
            ));
        }
        self.pos += n as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::format::build_header;
    use std::io::Cursor;

    fn member(name: &str, data: &[u8]) -> Vec<u8> {
        let mut out = build_header(name, "0", "0", "0", "644", &data.len().to_string()).to_vec();
        out.extend_from_slice(data);
        if data.len() % 2 == 1 {
            out.push(b'\n');
        }
        out
    }

    fn archive(members: &[Vec<u8>]) -> Cursor<Vec<u8>> {
        let mut out = MAGIC.to_vec();
        for m in members {
            out.extend_from_slice(m);
        }
        Cursor::new(out)
    }

    #[test]
    fn test_empty_archive() {
        let mut reader = ArchiveReader::new(archive(&[])).unwrap();
        assert!(reader.next_entry().unwrap().is_none());
        assert!(reader.is_finished());
        assert!(reader.next_entry().unwrap().is_none());
    }

    #[test]
    fn test_invalid_magic() {
        let result = ArchiveReader::new(Cursor::new(b"!<arch>".to_vec()));
        assert!(matches!(result, Err(ArError::InvalidMagic)));
        let result = ArchiveReader::new(Cursor::new(b"PK\x03\x04....".to_vec()));
        assert!(matches!(result, Err(ArError::InvalidMagic)));
    }

    #[test]
    fn test_common_members() {
        let mut reader =
            ArchiveReader::new(archive(&[member("a.txt/", b"abc"), member("b.txt/", b"")]))
                .unwrap();

        let first = reader.next_entry().unwrap().unwrap();
        assert_eq!(first.name(), "a.txt");
        assert_eq!(first.offset(), 8);
        assert_eq!(reader.read_member_data().unwrap(), b"abc");

        let second = reader.next_entry().unwrap().unwrap();
        assert_eq!(second.name(), "b.txt");
        assert_eq!(second.offset(), first.next_offset());
        assert_eq!(second.offset(), 8 + 60 + 3 + 1);
        assert!(reader.read_member_data().unwrap().is_empty());

        assert!(reader.next_entry().unwrap().is_none());
    }

    #[test]
    fn test_bsd_member() {
        let mut data = b"long_bsd_member_name".to_vec();
        data.extend_from_slice(b"payload!");
        let mut reader = ArchiveReader::new(archive(&[member("#1/20", &data)])).unwrap();

        let entry = reader.next_entry().unwrap().unwrap();
        assert_eq!(entry.name(), "long_bsd_member_name");
        assert_eq!(entry.file_size(), 8);
        assert_eq!(reader.read_member_data().unwrap(), b"payload!");
    }

    #[test]
    fn test_gnu_table_is_consumed() {
        let table = b"gnu_long_member_name.o/\n";
        let mut reader = ArchiveReader::new(archive(&[
            member("//", table),
            member("/0", b"obj"),
            member("short.o/", b"xy"),
        ]))
        .unwrap();

        let entry = reader.next_entry().unwrap().unwrap();
        assert!(reader.is_gnu());
        assert_eq!(entry.name(), "gnu_long_member_name.o");
        assert_eq!(entry.raw_name(), "/0");
        assert_eq!(reader.read_member_data().unwrap(), b"obj");

        let entry = reader.next_entry().unwrap().unwrap();
        assert_eq!(entry.name(), "short.o");
        assert!(reader.next_entry().unwrap().is_none());
    }

    #[test]
    fn test_gnu_name_without_table_degrades() {
        let mut reader = ArchiveReader::new(archive(&[member("/12", b"x")])).unwrap();
        let entry = reader.next_entry().unwrap().unwrap();
        assert_eq!(entry.name(), "/12");
        assert!(!entry.is_name_resolved());
    }

    #[test]
    fn test_resume_is_idempotent() {
        let mut reader = ArchiveReader::new(archive(&[
            member("one/", b"1"),
            member("two/", b"2"),
            member("three/", b"3"),
        ]))
        .unwrap();

        assert_eq!(reader.next_entry().unwrap().unwrap().name(), "one");
        reader.resume();
        reader.resume();
        assert!(reader.current_member().is_none());
        assert_eq!(reader.next_entry().unwrap().unwrap().name(), "two");
        assert_eq!(reader.next_entry().unwrap().unwrap().name(), "three");
    }

    #[test]
    fn test_member_data_requires_current_member() {
        let mut reader = ArchiveReader::new(archive(&[member("one/", b"1")])).unwrap();
        assert!(matches!(reader.member_data(), Err(ArError::NoCurrentMember)));
        reader.next_entry().unwrap();
        reader.resume();
        assert!(matches!(reader.member_data(), Err(ArError::NoCurrentMember)));
    }

    #[test]
    fn test_partial_member_data_then_advance() {
        let mut reader =
            ArchiveReader::new(archive(&[member("big/", &[7u8; 101]), member("next/", b"ok")]))
                .unwrap();
        reader.next_entry().unwrap();
        let mut buf = [0u8; 10];
        let mut data = reader.member_data().unwrap();
        data.read_exact(&mut buf).unwrap();
        assert_eq!(data.remaining(), 91);

        // Undrained data does not affect where the next header is read
        let next = reader.next_entry().unwrap().unwrap();
        assert_eq!(next.name(), "next");
        assert_eq!(reader.read_member_data().unwrap(), b"ok");
    }

    #[test]
    fn test_truncated_member_data_is_an_error() {
        let mut data = archive(&[member("short/", b"abcde")]).into_inner();
        data.truncate(8 + 60 + 2);
        let mut reader = ArchiveReader::new(Cursor::new(data)).unwrap();

        let entry = reader.next_entry().unwrap().unwrap();
        assert_eq!(entry.file_size(), 5);
        match reader.read_member_data() {
            Err(ArError::Io(e)) => assert_eq!(e.kind(), ErrorKind::UnexpectedEof),
            other => panic!("Expected truncation error, got: {:?}", other),
        }

        // Reads up to the cut still succeed
        let mut buf = [0u8; 2];
        reader.member_data().unwrap().read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ab");
    }

    #[test]
    fn test_duplicate_name_table() {
        let mut reader = ArchiveReader::new(archive(&[
            member("//", b"a/\n"),
            member("//", b"b/\n"),
        ]))
        .unwrap();
        let err = reader.next_entry().unwrap_err();
        assert!(err.to_string().contains("duplicate GNU name table"));
        assert!(reader.next_entry().unwrap().is_none());
    }
}
