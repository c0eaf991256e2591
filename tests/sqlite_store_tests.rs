//! Persistent store round-trips and agreement with the in-memory resolver.

use std::collections::BTreeSet;

use tempfile::tempdir;

use ddup::digest::{Digest, HashAlgorithm};
use ddup::index::{Device, Element, WhitelistEntry};
use ddup::store::{CreateMode, SqliteStore, StoreError};

fn sha1(hex_char: char) -> Digest {
    Digest::new(HashAlgorithm::Sha1, &hex_char.to_string().repeat(40)).unwrap()
}

fn md5(hex_char: char) -> Digest {
    Digest::new(HashAlgorithm::Md5, &hex_char.to_string().repeat(32)).unwrap()
}

#[test]
fn test_must_exist_fails_on_missing_database() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.sqlite");

    let err = SqliteStore::open(&path, CreateMode::MustExist).unwrap_err();
    assert!(matches!(err, StoreError::DatabaseMissing(_)));
    assert!(!path.exists());
}

#[test]
fn test_create_if_missing_then_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("case.sqlite");

    let mut store = SqliteStore::open(&path, CreateMode::CreateIfMissing).unwrap();
    store
        .insert_device(&Device::new(1, "incident-442", Some("laptop".into())).unwrap())
        .unwrap();
    store
        .append_element(&Element::new(Some(1), "/a").with_sha1(sha1('a')))
        .unwrap();
    store.close().unwrap();

    // Reopening must see the committed rows
    let mut reopened = SqliteStore::open(&path, CreateMode::MustExist).unwrap();
    let devices = reopened.devices().unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].metadata(), Some("laptop"));
    assert_eq!(reopened.canonical_rows(Some(HashAlgorithm::Sha1)).unwrap().len(), 1);
}

#[test]
fn test_force_recreate_wipes_existing_rows() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("case.sqlite");

    let mut store = SqliteStore::open(&path, CreateMode::CreateIfMissing).unwrap();
    store
        .append_element(&Element::new(Some(1), "/a").with_sha1(sha1('a')))
        .unwrap();
    store.close().unwrap();

    let mut recreated = SqliteStore::open(&path, CreateMode::ForceRecreate).unwrap();
    assert!(recreated.canonical_rows(None).unwrap().is_empty());
}

#[test]
fn test_abort_rolls_back_uncommitted_batch() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("case.sqlite");

    // Threshold higher than the insert count: nothing auto-commits
    let mut store = SqliteStore::open(&path, CreateMode::CreateIfMissing)
        .unwrap()
        .with_write_threshold(1000);
    for digit in ['a', 'b', 'c'] {
        store
            .append_element(&Element::new(Some(1), "/x").with_sha1(sha1(digit)))
            .unwrap();
    }
    store.abort().unwrap();

    let mut reopened = SqliteStore::open(&path, CreateMode::MustExist).unwrap();
    assert!(reopened.canonical_rows(Some(HashAlgorithm::Sha1)).unwrap().is_empty());
}

#[test]
fn test_write_threshold_commits_survive_unclean_drop() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("case.sqlite");

    let mut store = SqliteStore::open(&path, CreateMode::CreateIfMissing)
        .unwrap()
        .with_write_threshold(1);
    store
        .append_element(&Element::new(Some(1), "/a").with_sha1(sha1('a')))
        .unwrap();
    store
        .append_element(&Element::new(Some(1), "/b").with_sha1(sha1('b')))
        .unwrap();
    // Dropped without close: committed batches must still be on disk
    drop(store);

    let mut reopened = SqliteStore::open(&path, CreateMode::MustExist).unwrap();
    assert_eq!(reopened.canonical_rows(Some(HashAlgorithm::Sha1)).unwrap().len(), 2);
}

#[test]
fn test_views_agree_with_in_memory_resolver() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    store.insert_device(&Device::new(1, "c", None).unwrap()).unwrap();
    store.insert_device(&Device::new(2, "c", None).unwrap()).unwrap();

    // Mixed scenario: competing devices, a dangling reference, an
    // unknown-provenance row, a whitelisted group and partial digest sets
    let elements = [
        Element::new(Some(2), "/b").with_sha1(sha1('a')),
        Element::new(Some(1), "/a").with_sha1(sha1('a')),
        Element::new(Some(9), "/dangling").with_sha1(sha1('b')),
        Element::new(None, "/orphan").with_sha1(sha1('b')),
        Element::new(Some(1), "/wl").with_sha1(sha1('c')),
        Element::new(Some(2), "/partial").with_md5(md5('d')),
    ];
    for element in &elements {
        store.append_element(element).unwrap();
    }
    store
        .add_whitelist_entry(&WhitelistEntry {
            sha1: Some(sha1('c')),
            ..WhitelistEntry::default()
        })
        .unwrap();

    let index = store.load_index().unwrap();
    for algorithm in HashAlgorithm::ALL {
        let from_views: BTreeSet<(Option<i64>, String, bool)> = store
            .canonical_rows(Some(algorithm))
            .unwrap()
            .into_iter()
            .map(|row| (row.device_id, row.path, row.device_known))
            .collect();
        let from_memory: BTreeSet<(Option<i64>, String, bool)> = index
            .canonical_set(algorithm)
            .map(|row| (row.device_id, row.path, row.device_known))
            .collect();
        assert_eq!(from_views, from_memory, "disagreement under {algorithm}");
    }

    let union_from_view: BTreeSet<(Option<i64>, String)> = store
        .canonical_rows(None)
        .unwrap()
        .into_iter()
        .map(|row| (row.device_id, row.path))
        .collect();
    let union_from_memory: BTreeSet<(Option<i64>, String)> = index
        .merge()
        .into_iter()
        .map(|row| (row.device_id, row.path))
        .collect();
    assert_eq!(union_from_view, union_from_memory);
}

#[test]
fn test_load_index_preserves_tie_break_order() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    store.insert_device(&Device::new(1, "c", None).unwrap()).unwrap();
    store
        .append_element(&Element::new(Some(1), "/first").with_sha1(sha1('a')))
        .unwrap();
    store
        .append_element(&Element::new(Some(1), "/second").with_sha1(sha1('a')))
        .unwrap();

    // Both sides pick the earliest row for a same-device tie
    let from_view = store.canonical_rows(Some(HashAlgorithm::Sha1)).unwrap();
    assert_eq!(from_view[0].path, "/first");

    let index = store.load_index().unwrap();
    let from_memory: Vec<_> = index.canonical_set(HashAlgorithm::Sha1).collect();
    assert_eq!(from_memory[0].path, "/first");
}

#[test]
fn test_slack_blob_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("case.sqlite");

    let slack = vec![0u8, 1, 2, 0xff, 0x00, 0x7f];
    let mut store = SqliteStore::open(&path, CreateMode::CreateIfMissing).unwrap();
    store
        .append_element(
            &Element::new(Some(1), "/s")
                .with_sha1(sha1('a'))
                .with_file_slack(slack.clone()),
        )
        .unwrap();
    store.close().unwrap();

    let mut reopened = SqliteStore::open(&path, CreateMode::MustExist).unwrap();
    let rows = reopened.canonical_rows(Some(HashAlgorithm::Sha1)).unwrap();
    assert_eq!(rows[0].file_slack.as_deref(), Some(slack.as_slice()));

    let index = reopened.load_index().unwrap();
    let (_, element) = index.elements.iter().next().unwrap();
    assert_eq!(element.file_slack.as_deref(), Some(slack.as_slice()));
}

#[test]
fn test_whitelist_roundtrip_applies_on_load() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    store
        .append_element(&Element::new(Some(1), "/a").with_sha1(sha1('a')))
        .unwrap();
    store
        .add_whitelist_entry(&WhitelistEntry {
            sha1: Some(sha1('a')),
            note: Some("system file".into()),
            ..WhitelistEntry::default()
        })
        .unwrap();

    let index = store.load_index().unwrap();
    assert_eq!(index.whitelist.len(), 1);
    assert_eq!(index.canonical_set(HashAlgorithm::Sha1).count(), 0);
}
