//! Generate seed corpus for fuzzing

use arstream::{ArchiveWriter, MemberMeta, Variant, WriteOptions};
use std::fs;

type BoxError = Box<dyn std::error::Error>;

fn write_seed(
    corpus_dir: &str,
    file_name: &str,
    variant: Variant,
    members: &[(&str, &[u8])],
) -> Result<(), BoxError> {
    let meta = MemberMeta {
        mtime: 1_700_000_000,
        uid: 1000,
        gid: 1000,
        mode: 0o100644,
    };
    let mut writer = ArchiveWriter::new(Vec::new(), WriteOptions::new().with_variant(variant))?;
    if variant == Variant::Gnu {
        writer.write_name_table(members.iter().map(|(name, _)| *name))?;
    }
    for (name, data) in members {
        writer.append_data(name, &meta, *data, data.len() as u64)?;
    }

    let path = format!("{}/{}", corpus_dir, file_name);
    fs::write(&path, writer.finish()?)?;
    println!("Generated: {}", path);
    Ok(())
}

fn main() -> Result<(), BoxError> {
    let corpus_dir = "fuzz/corpus/fuzz_archive_parse";
    fs::create_dir_all(corpus_dir)?;

    println!("Generating seed corpus...");

    let long_name = "a_member_name_longer_than_sixteen_bytes.o";

    write_seed(corpus_dir, "seed_empty.a", Variant::Common, &[])?;
    write_seed(
        corpus_dir,
        "seed_single.a",
        Variant::Common,
        &[("test.txt", b"Hello, World!")],
    )?;
    write_seed(
        corpus_dir,
        "seed_multi.a",
        Variant::Common,
        &[("odd.txt", b"odd"), ("even.txt", b"even"), ("empty", b"")],
    )?;
    write_seed(
        corpus_dir,
        "seed_bsd.a",
        Variant::Bsd,
        &[(long_name, b"bsd data"), ("short.o", b"x")],
    )?;
    write_seed(
        corpus_dir,
        "seed_gnu.a",
        Variant::Gnu,
        &[(long_name, b"gnu data"), ("short.o", b"y"), (long_name, b"again")],
    )?;

    let large = b"This is repeated test data. ".repeat(200);
    write_seed(corpus_dir, "seed_large.a", Variant::Common, &[("large.txt", &large[..])])?;
    write_seed(
        corpus_dir,
        "seed_binary.a",
        Variant::Common,
        &[("binary.bin", &[0u8, 1, 2, 3, 255, 254, 253, 10])],
    )?;

    println!("\nSeed corpus written to {}", corpus_dir);
    Ok(())
}
