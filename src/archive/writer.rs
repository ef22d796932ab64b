use crate::archive::format::{
    build_header, padding_bytes, Header, ALIGNMENT, MAGIC, MAX_DATA_SIZE, NAME_WIDTH, PAD_BYTE,
};
use crate::archive::member::Member;
use crate::archive::names::{DecodingContext, GnuNameTable, NameVariant, NAME_TABLE_NAME};
use crate::error::{ArError, Result};
use crate::options::{Variant, WriteOptions};
use std::fs::{self, File};
use std::io::{self, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Mode recorded when the platform has no Unix permission bits
#[cfg(not(unix))]
const DEFAULT_MODE: u32 = 0o100644;

/// Header metadata of a member being written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemberMeta {
    pub mtime: u64,
    pub uid: u32,
    pub gid: u32,
    pub mode: u32,
}

impl MemberMeta {
    /// Take timestamp, ownership and mode from file metadata
    pub fn from_metadata(metadata: &fs::Metadata) -> Self {
        let mtime = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |elapsed| elapsed.as_secs());

        #[cfg(unix)]
        let (uid, gid, mode) = {
            use std::os::unix::fs::MetadataExt;
            (metadata.uid(), metadata.gid(), metadata.mode())
        };
        #[cfg(not(unix))]
        let (uid, gid, mode) = (0, 0, DEFAULT_MODE);

        Self {
            mtime,
            uid,
            gid,
            mode,
        }
    }
}

/// Archive writer.
///
/// Members are written strictly in order; each one is streamed from its
/// source, so whole files are never held in memory.
pub struct ArchiveWriter<W: Write = BufWriter<File>> {
    writer: W,
    options: WriteOptions,
    context: DecodingContext,
    current_offset: u64,
    members: Vec<Member>,
}

impl ArchiveWriter<BufWriter<File>> {
    /// Create a new archive file, replacing any file already at `path`
    pub fn create<P: AsRef<Path>>(path: P, options: WriteOptions) -> Result<Self> {
        let path = path.as_ref();
        match fs::remove_file(path) {
            Ok(()) => tracing::debug!("Removed existing archive {:?}", path),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let file = File::create(path)?;
        Self::new(BufWriter::new(file), options)
    }
}

impl<W: Write> ArchiveWriter<W> {
    /// Start an archive on any byte sink; writes the global magic immediately
    pub fn new(mut writer: W, options: WriteOptions) -> Result<Self> {
        writer.write_all(&MAGIC)?;
        tracing::debug!("Opened ar archive for writing ({} variant)", options.variant);

        Ok(Self {
            writer,
            options,
            context: DecodingContext::new(),
            current_offset: MAGIC.len() as u64,
            members: Vec::new(),
        })
    }

    /// Write every file in `paths`, in order, then finish the archive.
    ///
    /// With the GNU variant, the name table for all oversized names is written
    /// first. Returns the written members.
    pub fn write_entries<P: AsRef<Path>>(mut self, paths: &[P]) -> Result<Vec<Member>> {
        if self.options.variant == Variant::Gnu {
            let names = paths
                .iter()
                .map(|path| base_name(path.as_ref()))
                .collect::<Result<Vec<_>>>()?;
            self.write_name_table(names.iter().map(String::as_str))?;
        }

        for path in paths {
            self.append_file(path)?;
        }

        let members = self.members.clone();
        self.finish()?;
        Ok(members)
    }

    /// Write the GNU name table for those `names` that do not fit the name
    /// field. Nothing is written when every name fits.
    ///
    /// Must come before any member.
    pub fn write_name_table<'a, I>(&mut self, names: I) -> Result<Option<Member>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        if self.current_offset != MAGIC.len() as u64 {
            return Err(ArError::Config(
                "the GNU name table must be written before any member".to_string(),
            ));
        }

        let mut table = GnuNameTable::new();
        for name in names {
            if !fits_name_field(name) {
                table.insert(name);
            }
        }
        if table.is_empty() {
            return Ok(None);
        }

        let size = table.len() as u64;
        let raw = build_header(NAME_TABLE_NAME, "", "", "", "", &size.to_string());
        let header = Header::parse(&raw, self.current_offset)?;
        let member = Member::new(
            header,
            NameVariant::NameTable,
            None,
            &self.context,
            self.current_offset,
        );

        self.writer.write_all(&raw)?;
        self.writer.write_all(table.as_bytes())?;
        self.write_padding(size)?;
        self.current_offset = member.next_offset();

        tracing::debug!("Wrote GNU name table ({} bytes)", size);
        self.context.set_name_table(table);
        Ok(Some(member))
    }

    /// Stat and stream one file into the archive under its base name
    pub fn append_file<P: AsRef<Path>>(&mut self, path: P) -> Result<Member> {
        let path = path.as_ref();
        let metadata = fs::metadata(path)?;
        let file_name = base_name(path)?;
        let file = File::open(path)?;
        let meta = MemberMeta::from_metadata(&metadata);

        self.append_member(&file_name, &meta, file, metadata.len(), path)
    }

    /// Stream `size` bytes from `data` into the archive as member `file_name`.
    ///
    /// `file_name` is stored according to the configured variant; ownership
    /// and mode overrides from the options replace the values in `meta`.
    pub fn append_data<R: Read>(
        &mut self,
        file_name: &str,
        meta: &MemberMeta,
        data: R,
        size: u64,
    ) -> Result<Member> {
        self.append_member(file_name, meta, data, size, Path::new(file_name))
    }

    fn append_member<R: Read>(
        &mut self,
        file_name: &str,
        meta: &MemberMeta,
        data: R,
        size: u64,
        source: &Path,
    ) -> Result<Member> {
        let offset = self.current_offset;
        let (name, variant) = self.archive_name(file_name);
        let embedded = match variant {
            NameVariant::Bsd { .. } => Some(file_name.as_bytes()),
            _ => None,
        };
        let data_size = size
            .checked_add(variant.embedded_name_len())
            .filter(|&total| total <= MAX_DATA_SIZE)
            .ok_or_else(|| ArError::MemberTooLarge {
                name: file_name.to_string(),
                size,
                max: MAX_DATA_SIZE,
            })?;

        let header = Header {
            name,
            mtime: meta.mtime,
            uid: self.options.uid.unwrap_or(meta.uid),
            gid: self.options.gid.unwrap_or(meta.gid),
            mode: self.options.mode.unwrap_or(meta.mode),
            size: data_size,
        };
        // Re-read what was encoded so the member reflects any truncated field
        let raw = header.to_bytes();
        let header = Header::parse(&raw, offset)?;
        self.writer.write_all(&raw)?;

        if let Some(name_bytes) = embedded {
            self.writer.write_all(name_bytes)?;
        }

        let copied = io::copy(&mut data.take(size), &mut self.writer)?;
        if copied != size {
            return Err(ArError::SourceChanged {
                path: PathBuf::from(source),
                expected: size,
                actual: copied,
            });
        }
        self.write_padding(data_size)?;

        let member = Member::new(header, variant, embedded, &self.context, offset);
        self.current_offset = member.next_offset();
        tracing::debug!(
            "Entry {:?} at offset {} ({} bytes)",
            member.name(),
            offset,
            size
        );
        self.members.push(member.clone());
        Ok(member)
    }

    /// Name field content and variant for `file_name`
    fn archive_name(&self, file_name: &str) -> (String, NameVariant) {
        if !fits_name_field(file_name) {
            match self.options.variant {
                Variant::Gnu => {
                    let offset = self
                        .context
                        .name_table()
                        .and_then(|table| table.offset_of(file_name));
                    if let Some(offset) = offset {
                        return (format!("/{}", offset), NameVariant::GnuShort { offset });
                    }
                }
                Variant::Bsd => {
                    let name_len = file_name.len() as u64;
                    return (format!("#1/{}", name_len), NameVariant::Bsd { name_len });
                }
                Variant::Common => {}
            }
            tracing::warn!(
                "Member name {:?} exceeds {} bytes and will be truncated",
                file_name,
                NAME_WIDTH
            );
        }
        (format!("{}/", file_name), NameVariant::Common)
    }

    fn write_padding(&mut self, data_size: u64) -> Result<()> {
        let pad = padding_bytes(data_size, ALIGNMENT) as usize;
        if pad > 0 {
            self.writer.write_all(&vec![PAD_BYTE; pad])?;
        }
        Ok(())
    }

    /// Members written so far
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Number of bytes written so far
    pub fn offset(&self) -> u64 {
        self.current_offset
    }

    pub fn context(&self) -> &DecodingContext {
        &self.context
    }

    /// Flush and return the underlying sink; dropping it closes the file
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        tracing::debug!(
            "Finished ar archive: {} members, {} bytes",
            self.members.len(),
            self.current_offset
        );
        Ok(self.writer)
    }
}

/// Whether `file_name` plus its `/` terminator fits the name field
fn fits_name_field(file_name: &str) -> bool {
    file_name.len() + 1 <= NAME_WIDTH
}

fn base_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| ArError::InvalidPath(path.display().to_string()))
}

/// Write `paths` into a new archive at `dest`, replacing any existing file
pub fn write_archive<D, P>(dest: D, paths: &[P], options: &WriteOptions) -> Result<Vec<Member>>
where
    D: AsRef<Path>,
    P: AsRef<Path>,
{
    ArchiveWriter::create(dest, options.clone())?.write_entries(paths)
}
