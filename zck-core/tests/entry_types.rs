use zck_core::error::ChunkedError;
use zck_core::types::{get_type, ChunkType, EntryType};

#[test]
fn recognized_tar_types() {
    let cases = [
        (b'0', EntryType::Reg),
        (b'\0', EntryType::Reg),
        (b'1', EntryType::Hardlink),
        (b'2', EntryType::Symlink),
        (b'3', EntryType::Char),
        (b'4', EntryType::Block),
        (b'5', EntryType::Dir),
        (b'6', EntryType::Fifo),
    ];
    for (code, want) in cases {
        assert_eq!(get_type(code).unwrap(), want, "code {code}");
    }
}

#[test]
fn every_other_byte_is_unknown() {
    let known = [b'0', b'\0', b'1', b'2', b'3', b'4', b'5', b'6'];
    for code in 0..=u8::MAX {
        if known.contains(&code) {
            continue;
        }
        match EntryType::from_tar_type(code) {
            Err(ChunkedError::UnknownEntryType(b)) => assert_eq!(b, code),
            other => panic!("code {code}: unexpected {other:?}"),
        }
    }
    assert!(matches!(get_type(0xFF), Err(ChunkedError::UnknownEntryType(0xFF))));
}

#[test]
fn tags_serialize_lowercase() {
    assert_eq!(serde_json::to_string(&EntryType::Hardlink).unwrap(), "\"hardlink\"");
    assert_eq!(serde_json::to_string(&EntryType::Chunk).unwrap(), "\"chunk\"");
    assert_eq!(EntryType::Symlink.to_string(), "symlink");
}

#[test]
fn chunk_type_wire_names() {
    assert_eq!(serde_json::to_string(&ChunkType::Zeros).unwrap(), "\"zeros\"");
    assert_eq!(serde_json::to_string(&ChunkType::Data).unwrap(), "\"\"");
    let d: ChunkType = serde_json::from_str("\"data\"").unwrap();
    assert_eq!(d, ChunkType::Data);
}
