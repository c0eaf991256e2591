//! Case configuration files.
//!
//! A case file describes the devices and whitelist entries for one
//! investigation as JSON, applied to a database in one pass before query
//! time. The whole file is validated before the first write so a typo in one
//! digest cannot leave a half-applied case behind.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::digest::{Digest, HashAlgorithm};
use crate::index::{Device, WhitelistEntry};

/// One device declaration in a case file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub id: i64,
    pub case_cluster_id: String,
    #[serde(default)]
    pub metadata: Option<String>,
}

/// One whitelist declaration in a case file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WhitelistConfig {
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub md5: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// A whole case file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseConfig {
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
    #[serde(default)]
    pub whitelist: Vec<WhitelistConfig>,
}

impl CaseConfig {
    /// Load a case file. A missing file is an error, not a default.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read case file {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("malformed case file {}", path.display()))?;
        log::debug!(
            "loaded case file {}: {} devices, {} whitelist entries",
            path.display(),
            config.devices.len(),
            config.whitelist.len()
        );
        Ok(config)
    }

    /// Save the case file as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("failed to write case file {}", path.display()))?;
        Ok(())
    }

    /// Validate every device declaration into registry rows.
    pub fn devices(&self) -> Result<Vec<Device>> {
        self.devices
            .iter()
            .map(|d| {
                Device::new(d.id, d.case_cluster_id.clone(), d.metadata.clone())
                    .with_context(|| format!("invalid device {} in case file", d.id))
            })
            .collect()
    }

    /// Validate every whitelist declaration into store entries.
    pub fn whitelist_entries(&self) -> Result<Vec<WhitelistEntry>> {
        self.whitelist
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let parse = |algorithm: HashAlgorithm, hex: &Option<String>| {
                    hex.as_deref()
                        .map(|h| Digest::new(algorithm, h))
                        .transpose()
                        .with_context(|| format!("invalid whitelist entry {i} in case file"))
                };
                Ok(WhitelistEntry {
                    sha1: parse(HashAlgorithm::Sha1, &w.sha1)?,
                    sha256: parse(HashAlgorithm::Sha256, &w.sha256)?,
                    md5: parse(HashAlgorithm::Md5, &w.md5)?,
                    note: w.note.clone(),
                })
            })
            .collect()
    }
}

/// Default database location under the platform data directory.
pub fn default_db_path() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("org", "ddup", "ddup")
        .ok_or_else(|| anyhow::anyhow!("failed to determine project directories"))?;
    Ok(project_dirs.data_dir().join("ddup.sqlite"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_devices_validated() {
        let config = CaseConfig {
            devices: vec![DeviceConfig {
                id: 1,
                case_cluster_id: "case-1".into(),
                metadata: Some("reference image".into()),
            }],
            whitelist: Vec::new(),
        };
        let devices = config.devices().unwrap();
        assert_eq!(devices[0].id(), 1);
        assert_eq!(devices[0].metadata(), Some("reference image"));
    }

    #[test]
    fn test_invalid_case_cluster_rejected() {
        let config = CaseConfig {
            devices: vec![DeviceConfig {
                id: 1,
                case_cluster_id: String::new(),
                metadata: None,
            }],
            whitelist: Vec::new(),
        };
        assert!(config.devices().is_err());
    }

    #[test]
    fn test_whitelist_digests_validated_and_normalized() {
        let config = CaseConfig {
            devices: Vec::new(),
            whitelist: vec![WhitelistConfig {
                sha1: Some("AB".repeat(20)),
                note: Some("known benign".into()),
                ..WhitelistConfig::default()
            }],
        };
        let entries = config.whitelist_entries().unwrap();
        assert_eq!(entries[0].sha1.as_ref().unwrap().as_hex(), "ab".repeat(20));
    }

    #[test]
    fn test_malformed_whitelist_digest_rejected() {
        let config = CaseConfig {
            devices: Vec::new(),
            whitelist: vec![WhitelistConfig {
                md5: Some("not-a-digest".into()),
                ..WhitelistConfig::default()
            }],
        };
        assert!(config.whitelist_entries().is_err());
    }

    #[test]
    fn test_empty_json_object_is_empty_config() {
        let config: CaseConfig = serde_json::from_str("{}").unwrap();
        assert!(config.devices.is_empty());
        assert!(config.whitelist.is_empty());
    }
}
