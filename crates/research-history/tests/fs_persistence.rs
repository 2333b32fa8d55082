//! HistoryStore over the filesystem backend: survives reopening.

use research_history::{
    FsKeyValueStore, HistoryConfig, HistoryStore, ResearchEntry, TextEntry, DEFAULT_STORAGE_KEY,
};

#[test]
fn collection_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let (first, second) = {
        let backend = FsKeyValueStore::new(dir.path()).unwrap();
        let mut store = HistoryStore::open(backend);
        let first = store.save(
            "How do tides work?",
            "The moon.",
            &[ResearchEntry::Question(TextEntry::new("tides"))],
        );
        let second = store.save("Why is the sky blue?", "Rayleigh scattering.", &[]);
        (first, second)
    };

    let backend = FsKeyValueStore::new(dir.path()).unwrap();
    let store = HistoryStore::open(backend);
    assert_eq!(store.len(), 2);
    assert_eq!(store.records()[0].id, second);
    assert_eq!(store.get_by_id(&first).unwrap().answer, "The moon.");
    assert!(dir.path().join(DEFAULT_STORAGE_KEY).exists());
}

#[test]
fn clear_removes_file() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FsKeyValueStore::new(dir.path()).unwrap();
    let mut store = HistoryStore::open(backend);
    store.save("q", "a", &[]);
    assert!(dir.path().join(DEFAULT_STORAGE_KEY).exists());

    store.clear();
    assert!(!dir.path().join(DEFAULT_STORAGE_KEY).exists());
}

#[test]
fn corrupt_file_is_discarded_on_open() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(DEFAULT_STORAGE_KEY), "\u{0}garbage").unwrap();

    let backend = FsKeyValueStore::new(dir.path()).unwrap();
    let store = HistoryStore::open(backend);
    assert!(store.is_empty());
    assert!(!dir.path().join(DEFAULT_STORAGE_KEY).exists());
}

#[test]
fn non_utf8_file_is_discarded_on_open() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(DEFAULT_STORAGE_KEY), [0xff, 0xfe, 0x00]).unwrap();

    let backend = FsKeyValueStore::new(dir.path()).unwrap();
    let mut store = HistoryStore::open(backend);
    assert!(store.is_empty());
    assert!(!dir.path().join(DEFAULT_STORAGE_KEY).exists());

    let id = store.save("q", "a", &[]);
    assert_eq!(
        store.last_outcome(),
        Some(research_history::PersistOutcome::Written)
    );
    assert!(store.get_by_id(&id).is_some());
}

#[test]
fn invalid_key_degrades_to_volatile() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FsKeyValueStore::new(dir.path()).unwrap();
    let config = HistoryConfig::default().with_storage_key("../outside");
    let mut store = HistoryStore::with_config(backend, config);

    let id = store.save("q", "a", &[]);
    assert!(store.get_by_id(&id).is_some());
    assert_eq!(
        store.last_outcome(),
        Some(research_history::PersistOutcome::Volatile)
    );
}
