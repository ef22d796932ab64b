#![no_main]

use arstream::ArchiveReader;
use libfuzzer_sys::fuzz_target;
use std::io::{Cursor, Read};

fuzz_target!(|data: &[u8]| {
    // Anything shorter than the magic is rejected up front
    if data.len() < 8 {
        return;
    }

    let mut reader = match ArchiveReader::new(Cursor::new(data)) {
        Ok(r) => r,
        Err(_) => return, // Expected for invalid data
    };

    // Walk every member and drain its data - should never panic
    let mut members = 0usize;
    loop {
        let member = match reader.next_entry() {
            Ok(Some(m)) => m,
            Ok(None) | Err(_) => break,
        };

        let _ = member.name();
        let _ = member.is_symbol_table();
        assert!(member.file_size() <= member.data_size());
        assert!(member.next_offset() > member.offset());

        if let Ok(mut stream) = reader.member_data() {
            let mut buf = [0u8; 4096];
            while let Ok(n) = stream.read(&mut buf) {
                if n == 0 {
                    break;
                }
            }
        }

        // Skip a member without reading it, exercising resume
        members += 1;
        if members % 2 == 0 {
            reader.resume();
        }
    }

    // Traversal stays finished once it ends
    assert!(reader.is_finished());
    assert!(matches!(reader.next_entry(), Ok(None)));
});
