/// List the members of an ar archive, or build one first if none is given
///
/// Run with: cargo run --example list -- [ARCHIVE]
use anyhow::{Context, Result};
use arstream::{write_archive, ArchiveReader, Variant, WriteOptions};
use std::fs;
use std::path::PathBuf;

fn main() -> Result<()> {
    let path = match std::env::args_os().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => create_sample()?,
    };

    let mut reader = ArchiveReader::open(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    println!("{:<32} {:>10} {:>8} {:>6} {:>6}", "NAME", "SIZE", "MODE", "UID", "GID");
    let mut count = 0;
    while let Some(member) = reader.next_entry()? {
        let marker = if member.is_symbol_table() {
            " (symbol table)"
        } else if !member.is_name_resolved() {
            " (unresolved)"
        } else {
            ""
        };
        println!(
            "{:<32} {:>10} {:>8o} {:>6} {:>6}{}",
            member.name(),
            member.file_size(),
            member.mode(),
            member.uid(),
            member.gid(),
            marker
        );
        count += 1;
    }

    println!("\n{} members{}", count, if reader.is_gnu() { " (GNU names)" } else { "" });
    Ok(())
}

fn create_sample() -> Result<PathBuf> {
    let dir = std::env::temp_dir().join("arstream_list_demo");
    fs::create_dir_all(&dir)?;

    let mut sources = Vec::new();
    for (name, data) in [
        ("readme.txt", &b"An example member.\n"[..]),
        ("a_member_with_a_long_file_name.o", &[0x7f, b'E', b'L', b'F'][..]),
        ("odd", &b"123"[..]),
    ] {
        let source = dir.join(name);
        fs::write(&source, data)?;
        sources.push(source);
    }

    let archive = dir.join("example_list.a");
    let options = WriteOptions::new().with_variant(Variant::Gnu);
    write_archive(&archive, &sources, &options).context("failed to write sample archive")?;
    println!("Wrote sample archive {}\n", archive.display());
    Ok(archive)
}
