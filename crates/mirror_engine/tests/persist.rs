use std::collections::BTreeMap;
use std::fs;

use mirror_core::{FailureEntry, Record};
use mirror_engine::{
    ensure_data_dir, AtomicFileWriter, MirrorError, PersistentLedger, RecordStore, LEDGER_FILENAME,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn sample_record() -> Record {
    Record {
        page_url: "https://site.example/foo/".to_string(),
        title: "Foo".to_string(),
        description: "A game about foo.\nWith ünïcode.".to_string(),
        screenshots: vec!["https://img.example/1.jpg".to_string()],
        requirements: BTreeMap::from([("OS".to_string(), "Windows 10".to_string())]),
        details: BTreeMap::from([("Size".to_string(), "2 GB".to_string())]),
        acquisition_links: vec!["https://cdn.example/foo.zip".to_string()],
        cover_image: Some("https://img.example/cover.jpg".to_string()),
    }
}

#[test]
fn creates_missing_data_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("data").join("clones");
    assert!(!new_dir.exists());
    ensure_data_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("foo.json", b"{}").unwrap();
    assert_eq!(first.file_name().unwrap(), "foo.json");
    let second = writer.write("foo.json", b"{\"title\":\"Foo\"}").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "{\"title\":\"Foo\"}");
}

#[test]
fn no_partial_file_when_dir_is_a_file() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.write("foo.json", b"{}").is_err());
    assert!(!file_path.with_file_name("foo.json").exists());
}

#[test]
fn record_round_trips_field_for_field() {
    let temp = TempDir::new().unwrap();
    let store = RecordStore::new(temp.path());
    let record = sample_record();

    let path = store.save("foo", &record).unwrap();
    assert_eq!(path, temp.path().join("foo.json"));
    assert_eq!(store.load("foo").unwrap(), record);
}

#[test]
fn placeholder_is_written_once() {
    let temp = TempDir::new().unwrap();
    let store = RecordStore::new(temp.path());

    assert!(store.ensure_placeholder("foo").unwrap());
    assert_eq!(fs::read_to_string(store.path_for("foo")).unwrap(), "{}");

    store.save("foo", &sample_record()).unwrap();
    assert!(!store.ensure_placeholder("foo").unwrap());
    assert_eq!(store.load("foo").unwrap().title, "Foo");
}

#[test]
fn scan_skips_ledger_and_reports_bad_json() {
    let temp = TempDir::new().unwrap();
    let store = RecordStore::new(temp.path());
    store.save("foo", &sample_record()).unwrap();
    fs::write(temp.path().join("broken.json"), "{not json").unwrap();
    fs::write(temp.path().join(LEDGER_FILENAME), "[]").unwrap();
    fs::write(temp.path().join("notes.txt"), "ignored").unwrap();

    let scanned = store.scan().unwrap();
    let slugs: Vec<&str> = scanned.iter().map(|s| s.slug.as_str()).collect();
    assert_eq!(slugs, vec!["broken", "foo"]);
    assert!(matches!(
        scanned[0].record,
        Err(MirrorError::Integrity { .. })
    ));
    assert!(scanned[1].record.is_ok());
}

#[test]
fn scan_of_missing_dir_is_empty() {
    let temp = TempDir::new().unwrap();
    let store = RecordStore::new(temp.path().join("absent"));
    assert!(store.scan().unwrap().is_empty());
    assert!(store.slugs().unwrap().is_empty());
}

#[test]
fn search_is_case_insensitive() {
    let temp = TempDir::new().unwrap();
    let store = RecordStore::new(temp.path());
    store.save("foo", &sample_record()).unwrap();
    let mut other = sample_record();
    other.title = "Bar Quest".to_string();
    store.save("bar-quest", &other).unwrap();
    store.ensure_placeholder("empty").unwrap();

    let hits = store.search("qUeSt").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Bar Quest");
}

#[test]
fn clean_removes_records_and_ledger() {
    let temp = TempDir::new().unwrap();
    let store = RecordStore::new(temp.path());
    store.save("foo", &sample_record()).unwrap();
    store.ensure_placeholder("bar").unwrap();
    fs::write(temp.path().join(LEDGER_FILENAME), "[]").unwrap();
    fs::write(temp.path().join("keep.txt"), "x").unwrap();

    assert_eq!(store.clean().unwrap(), 3);
    assert!(store.slugs().unwrap().is_empty());
    assert!(!temp.path().join(LEDGER_FILENAME).exists());
    assert!(temp.path().join("keep.txt").exists());
}

#[test]
fn remove_reports_whether_a_file_existed() {
    let temp = TempDir::new().unwrap();
    let store = RecordStore::new(temp.path());
    store.ensure_placeholder("foo").unwrap();
    assert!(store.remove("foo").unwrap());
    assert!(!store.remove("foo").unwrap());
}

#[test]
fn ledger_saves_and_reloads() {
    let temp = TempDir::new().unwrap();
    let mut ledger = PersistentLedger::new(temp.path());
    assert!(ledger.add("Foo Direct Download", "http://x/foo"));
    assert!(!ledger.add("Foo", "http://x/foo"));
    assert!(ledger.add("Bar", "http://x/bar"));
    ledger.save_all().unwrap();

    let reloaded = PersistentLedger::open(temp.path());
    assert_eq!(
        reloaded.entries(),
        &[
            FailureEntry::new("Foo Direct Download", "http://x/foo"),
            FailureEntry::new("Bar", "http://x/bar"),
        ]
    );
}

#[test]
fn malformed_ledger_loads_empty() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(LEDGER_FILENAME), "{\"oops\": true").unwrap();

    let mut ledger = PersistentLedger::new(temp.path());
    assert_eq!(ledger.load_all(), 0);
    assert!(ledger.is_empty());
}

#[test]
fn missing_ledger_loads_empty() {
    let temp = TempDir::new().unwrap();
    let ledger = PersistentLedger::open(temp.path());
    assert!(ledger.is_empty());
    assert_eq!(ledger.path(), temp.path().join(LEDGER_FILENAME));
}
