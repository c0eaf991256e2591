//! Acquisition device registry.
//!
//! One row per acquisition source (physical device or image), registered by
//! the configuration layer before any element referencing it is appended.
//! Registration is insert-or-fail: a colliding id never replaces the row
//! already present.

use std::collections::BTreeMap;

use thiserror::Error;

/// Longest accepted case cluster identifier.
pub const MAX_CASE_CLUSTER_LEN: usize = 60;

/// Errors from device construction and registration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A device with this id is already registered.
    #[error("device id {0} is already registered")]
    DuplicateDeviceId(i64),

    /// Case cluster id empty or longer than [`MAX_CASE_CLUSTER_LEN`].
    #[error("invalid case cluster id {0:?}: must be non-empty and at most 60 chars")]
    InvalidCaseCluster(String),
}

/// A known acquisition source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    id: i64,
    case_cluster_id: String,
    metadata: Option<String>,
}

impl Device {
    /// Create a device with a caller-assigned id.
    ///
    /// The case cluster id groups devices belonging to one investigation and
    /// must be non-empty and at most 60 characters.
    pub fn new(
        id: i64,
        case_cluster_id: impl Into<String>,
        metadata: Option<String>,
    ) -> Result<Self, RegistryError> {
        let case_cluster_id = case_cluster_id.into();
        if case_cluster_id.is_empty() || case_cluster_id.chars().count() > MAX_CASE_CLUSTER_LEN {
            return Err(RegistryError::InvalidCaseCluster(case_cluster_id));
        }
        Ok(Self {
            id,
            case_cluster_id,
            metadata,
        })
    }

    /// Caller-assigned stable identifier.
    #[must_use]
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Forensic case/cluster this device belongs to.
    #[must_use]
    pub fn case_cluster_id(&self) -> &str {
        &self.case_cluster_id
    }

    /// Free-form label, mount path or similar.
    #[must_use]
    pub fn metadata(&self) -> Option<&str> {
        self.metadata.as_deref()
    }
}

/// Registry of acquisition devices, keyed by caller-assigned id.
#[derive(Debug, Default, Clone)]
pub struct DeviceRegistry {
    devices: BTreeMap<i64, Device>,
}

impl DeviceRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device, failing if the id is already taken.
    ///
    /// On collision the existing row is left untouched.
    pub fn register(&mut self, device: Device) -> Result<(), RegistryError> {
        if self.devices.contains_key(&device.id) {
            return Err(RegistryError::DuplicateDeviceId(device.id));
        }
        log::debug!(
            "registered device {} (case cluster {:?})",
            device.id,
            device.case_cluster_id
        );
        self.devices.insert(device.id, device);
        Ok(())
    }

    /// Look up a device by id.
    #[must_use]
    pub fn lookup(&self, id: i64) -> Option<&Device> {
        self.devices.get(&id)
    }

    /// Whether a device with this id is registered.
    #[must_use]
    pub fn contains(&self, id: i64) -> bool {
        self.devices.contains_key(&id)
    }

    /// Replace a registered device's metadata. Returns false if the id is
    /// unknown. Metadata is the only field mutable after registration.
    pub fn set_metadata(&mut self, id: i64, metadata: Option<String>) -> bool {
        match self.devices.get_mut(&id) {
            Some(device) => {
                device.metadata = metadata;
                true
            }
            None => false,
        }
    }

    /// Number of registered devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Iterate devices in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }
}
