//! Case configuration loading and application against a store.

use tempfile::tempdir;

use ddup::config::{CaseConfig, DeviceConfig, WhitelistConfig};
use ddup::digest::{Digest, HashAlgorithm};
use ddup::index::Element;
use ddup::store::SqliteStore;

fn sha1(hex_char: char) -> Digest {
    Digest::new(HashAlgorithm::Sha1, &hex_char.to_string().repeat(40)).unwrap()
}

fn sample_config() -> CaseConfig {
    CaseConfig {
        devices: vec![
            DeviceConfig {
                id: 1,
                case_cluster_id: "incident-442".into(),
                metadata: Some("reference image".into()),
            },
            DeviceConfig {
                id: 2,
                case_cluster_id: "incident-442".into(),
                metadata: None,
            },
        ],
        whitelist: vec![WhitelistConfig {
            sha1: Some("a".repeat(40)),
            note: Some("known benign".into()),
            ..WhitelistConfig::default()
        }],
    }
}

#[test]
fn test_save_load_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("case.json");

    sample_config().save(&path).unwrap();
    let loaded = CaseConfig::load(&path).unwrap();

    assert_eq!(loaded.devices.len(), 2);
    assert_eq!(loaded.devices[0].case_cluster_id, "incident-442");
    assert_eq!(loaded.whitelist.len(), 1);
}

#[test]
fn test_load_missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    assert!(CaseConfig::load(&dir.path().join("nope.json")).is_err());
}

#[test]
fn test_malformed_json_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ devices: oops").unwrap();

    assert!(CaseConfig::load(&path).is_err());
}

#[test]
fn test_applied_config_drives_resolution() {
    let config = sample_config();
    let mut store = SqliteStore::open_in_memory().unwrap();

    for device in config.devices().unwrap() {
        store.insert_device(&device).unwrap();
    }
    for entry in config.whitelist_entries().unwrap() {
        store.add_whitelist_entry(&entry).unwrap();
    }

    // One whitelisted observation, one interesting one
    store
        .append_element(&Element::new(Some(1), "/benign").with_sha1(sha1('a')))
        .unwrap();
    store
        .append_element(&Element::new(Some(2), "/evidence").with_sha1(sha1('b')))
        .unwrap();

    let rows = store.canonical_rows(Some(HashAlgorithm::Sha1)).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].path, "/evidence");
    assert!(rows[0].device_known);
}

#[test]
fn test_config_with_bad_digest_rejected_before_any_write() {
    let config = CaseConfig {
        devices: Vec::new(),
        whitelist: vec![WhitelistConfig {
            sha1: Some("tooshort".into()),
            ..WhitelistConfig::default()
        }],
    };
    assert!(config.whitelist_entries().is_err());
}
