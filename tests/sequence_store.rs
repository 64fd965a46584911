use std::fs;

use gst_invoice::sequence::{KeyValueStore, MemoryStore, SEQUENCE_KEY, SequenceAllocator, TomlFileStore};

#[test]
fn three_calls_from_empty_store() {
    let mut alloc = SequenceAllocator::new(MemoryStore::new());
    let numbers: Vec<u64> = (0..3).map(|_| alloc.next_invoice_number()).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
}

#[test]
fn file_store_survives_sessions() {
    let dir = tempfile::tempdir().unwrap();

    for expected in 1..=3 {
        // a fresh allocator per session, as the CLI does
        let mut alloc = SequenceAllocator::new(TomlFileStore::in_dir(dir.path()));
        assert_eq!(alloc.next_invoice_number(), expected);
    }

    let store = TomlFileStore::in_dir(dir.path());
    assert_eq!(store.get(SEQUENCE_KEY).unwrap().as_deref(), Some("3"));
    assert_eq!(SequenceAllocator::new(store).current(), 3);
}

#[test]
fn file_store_keeps_other_keys() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = TomlFileStore::in_dir(dir.path());
    store.set("theme", "dark").unwrap();

    SequenceAllocator::new(&mut store).next_invoice_number();

    assert_eq!(store.get("theme").unwrap().as_deref(), Some("dark"));
    assert_eq!(store.get(SEQUENCE_KEY).unwrap().as_deref(), Some("1"));
}

#[test]
fn hand_edited_integer_is_honoured() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(TomlFileStore::FILE_NAME), "invoiceNo = 99\n").unwrap();

    let mut alloc = SequenceAllocator::new(TomlFileStore::in_dir(dir.path()));
    assert_eq!(alloc.next_invoice_number(), 100);
}

#[test]
fn corrupt_file_restarts_then_keeps_counting() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(TomlFileStore::FILE_NAME);
    fs::write(&path, "this is [not toml").unwrap();

    let numbers: Vec<u64> = (0..3)
        .map(|_| SequenceAllocator::new(TomlFileStore::new(&path)).next_invoice_number())
        .collect();
    assert_eq!(numbers, vec![1, 2, 3]);

    let content = fs::read_to_string(&path).unwrap();
    let table: toml::Table = toml::from_str(&content).unwrap();
    assert_eq!(table.get(SEQUENCE_KEY).and_then(|v| v.as_str()), Some("3"));
}

#[test]
fn missing_directory_is_created_on_write() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("a").join("b");
    let mut alloc = SequenceAllocator::new(TomlFileStore::in_dir(&nested));
    assert_eq!(alloc.next_invoice_number(), 1);
    assert!(nested.join(TomlFileStore::FILE_NAME).exists());
}
