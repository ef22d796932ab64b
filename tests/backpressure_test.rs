//! Traversal pacing
//!
//! The reader must not touch the next header until the caller moves on from
//! the current member. A recording byte source logs every read so the call
//! order can be checked.

use arstream::{ArchiveReader, ArchiveWriter, MemberMeta, Variant, WriteOptions};
use std::cell::RefCell;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Read { offset: u64, len: usize },
    Consumer(&'static str),
}

/// Byte source that records the offset of every read
struct RecordingSource {
    inner: Cursor<Vec<u8>>,
    log: Rc<RefCell<Vec<Event>>>,
}

impl Read for RecordingSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let offset = self.inner.position();
        let len = self.inner.read(buf)?;
        self.log.borrow_mut().push(Event::Read { offset, len });
        Ok(len)
    }
}

impl Seek for RecordingSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

/// Helper: Build an in-memory archive
fn build_archive(variant: Variant, members: &[(&str, &[u8])]) -> Vec<u8> {
    let options = WriteOptions::new().with_variant(variant);
    let mut writer = ArchiveWriter::new(Vec::new(), options).unwrap();
    if variant == Variant::Gnu {
        writer
            .write_name_table(members.iter().map(|(name, _)| *name))
            .unwrap();
    }
    for (name, data) in members {
        writer
            .append_data(name, &MemberMeta::default(), *data, data.len() as u64)
            .unwrap();
    }
    writer.finish().unwrap()
}

fn recording_reader(data: Vec<u8>) -> (ArchiveReader<RecordingSource>, Rc<RefCell<Vec<Event>>>) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let source = RecordingSource {
        inner: Cursor::new(data),
        log: Rc::clone(&log),
    };
    (ArchiveReader::new(source).unwrap(), log)
}

fn reads_at_or_after(log: &Rc<RefCell<Vec<Event>>>, offset: u64) -> usize {
    log.borrow()
        .iter()
        .filter(|event| matches!(event, Event::Read { offset: o, .. } if *o >= offset))
        .count()
}

#[test]
fn test_next_header_waits_for_consumer() {
    let data = build_archive(
        Variant::Common,
        &[("one", b"first"), ("two", b"second"), ("three", b"third")],
    );
    let (mut reader, log) = recording_reader(data);

    let first = reader.next_entry().unwrap().unwrap();
    let second_offset = first.next_offset();

    // Consumer reads the data, possibly several times; nothing beyond the
    // first member is touched
    log.borrow_mut().push(Event::Consumer("drain first"));
    assert_eq!(reader.read_member_data().unwrap(), b"first");
    assert_eq!(reader.read_member_data().unwrap(), b"first");
    assert_eq!(reads_at_or_after(&log, second_offset), 0);

    // Only moving on reads the second header
    log.borrow_mut().push(Event::Consumer("advance"));
    let second = reader.next_entry().unwrap().unwrap();
    assert_eq!(second.offset(), second_offset);

    let events = log.borrow();
    let advance = events
        .iter()
        .position(|event| *event == Event::Consumer("advance"))
        .unwrap();
    let first_read_of_second = events
        .iter()
        .position(|event| matches!(event, Event::Read { offset, .. } if *offset == second_offset))
        .unwrap();
    assert!(first_read_of_second > advance);
}

#[test]
fn test_member_data_is_lazy() {
    let data = build_archive(Variant::Common, &[("lazy.bin", &[9u8; 500])]);
    let (mut reader, log) = recording_reader(data);

    let member = reader.next_entry().unwrap().unwrap();
    let before = log.borrow().len();

    // Creating the stream reads nothing
    let stream = reader.member_data().unwrap();
    assert_eq!(stream.len(), 500);
    drop(stream);
    assert_eq!(log.borrow().len(), before);

    assert_eq!(reads_at_or_after(&log, member.data_offset()), 0);
    assert_eq!(reader.read_member_data().unwrap().len(), 500);
    assert!(reads_at_or_after(&log, member.data_offset()) > 0);
}

#[test]
fn test_gnu_table_read_eagerly_before_first_member() {
    let data = build_archive(
        Variant::Gnu,
        &[("a_long_member_name_number_1.o", b"x"), ("short.o", b"y")],
    );
    let (mut reader, log) = recording_reader(data);

    let member = reader.next_entry().unwrap().unwrap();
    assert!(reader.is_gnu());
    assert_eq!(member.name(), "a_long_member_name_number_1.o");

    // The table's data region (offset 68) was read before the member was returned
    let events = log.borrow();
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::Read { offset: 68, len } if *len > 0)));
    // ...but not the member's own data
    let data_offset = member.data_offset();
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::Read { offset, .. } if *offset == data_offset)));
}

#[test]
fn test_resume_twice_does_not_skip() {
    let data = build_archive(Variant::Common, &[("a", b"1"), ("b", b"2"), ("c", b"3")]);
    let (mut reader, _log) = recording_reader(data);

    assert_eq!(reader.next_entry().unwrap().unwrap().name(), "a");
    reader.resume();
    reader.resume();
    reader.resume();
    assert_eq!(reader.next_entry().unwrap().unwrap().name(), "b");
    assert_eq!(reader.read_member_data().unwrap(), b"2");
}
