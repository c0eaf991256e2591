//! Canonical-representative resolution and the cross-algorithm merger.
//!
//! # Overview
//!
//! For one algorithm, resolution collapses every group of elements sharing a
//! digest value into a single canonical row:
//!
//! 1. Partition elements with a non-null digest by digest value (the store's
//!    per-algorithm index already holds this partition).
//! 2. Drop groups whose digest is whitelisted under that algorithm.
//! 3. Pick the representative with the minimum device id; unknown-device
//!    observations order after every known device.
//! 4. Remaining ties go to the lowest insertion sequence number, which makes
//!    repeated runs over the same stored data pick the same row.
//!
//! The merger resolves all three algorithms independently and unions the
//! results, deduplicating rows equal on all six exposed attributes. An
//! element missing some digests can surface more than once when different
//! algorithms elect different representatives for the same content; that
//! disagreement is intentionally kept visible.

use std::collections::HashSet;

use crate::digest::{Digest, HashAlgorithm};
use crate::index::device::DeviceRegistry;
use crate::index::element::{Element, ElementId, ElementStore};
use crate::index::whitelist::Whitelist;

/// The canonical row elected for one distinct, non-whitelisted digest value.
///
/// Carries the full attribute set of the chosen representative element plus
/// the `device_known` annotation: false when the element's device reference
/// is absent or matches no registered device. A dangling reference is a
/// warning on the row, never a resolution failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalElement {
    pub sha1: Option<Digest>,
    pub sha256: Option<Digest>,
    pub md5: Option<Digest>,
    pub device_id: Option<i64>,
    pub path: String,
    pub file_slack: Option<Vec<u8>>,
    /// Whether `device_id` resolves to a registered device.
    pub device_known: bool,
}

impl CanonicalElement {
    fn from_element(element: &Element, devices: &DeviceRegistry) -> Self {
        let device_known = element.device_id.is_some_and(|id| devices.contains(id));
        if !device_known {
            log::debug!(
                "canonical element {:?} has unknown provenance (device {:?})",
                element.path,
                element.device_id
            );
        }
        Self {
            sha1: element.sha1.clone(),
            sha256: element.sha256.clone(),
            md5: element.md5.clone(),
            device_id: element.device_id,
            path: element.path.clone(),
            file_slack: element.file_slack.clone(),
            device_known,
        }
    }

    /// The six attributes the merger compares. `device_known` is an
    /// annotation and deliberately excluded.
    fn merge_key(&self) -> MergeKey {
        (
            self.sha1.clone(),
            self.sha256.clone(),
            self.md5.clone(),
            self.device_id,
            self.path.clone(),
            self.file_slack.clone(),
        )
    }
}

type MergeKey = (
    Option<Digest>,
    Option<Digest>,
    Option<Digest>,
    Option<i64>,
    String,
    Option<Vec<u8>>,
);

/// Resolve the canonical set for one algorithm.
///
/// Lazy: groups are visited in ascending digest order as the iterator is
/// consumed. An empty store, or a store with no digests for this algorithm,
/// yields an empty sequence rather than an error.
pub fn canonical_set<'a>(
    elements: &'a ElementStore,
    whitelist: &'a Whitelist,
    devices: &'a DeviceRegistry,
    algorithm: HashAlgorithm,
) -> impl Iterator<Item = CanonicalElement> + 'a {
    elements
        .digest_groups(algorithm)
        .filter(move |(digest, _)| {
            if whitelist.is_whitelisted(algorithm, digest) {
                log::trace!("{algorithm} group {digest} excluded by whitelist");
                false
            } else {
                true
            }
        })
        .map(move |(_, ids)| {
            let representative = elect_representative(elements, ids);
            CanonicalElement::from_element(
                elements.get(representative).expect("indexed id in store"),
                devices,
            )
        })
}

/// Union of the three per-algorithm canonical sets.
///
/// Two rows are the same iff all six attributes match; the first occurrence
/// (sha1 set first, then sha256, then md5) is kept.
#[must_use]
pub fn merge(
    elements: &ElementStore,
    whitelist: &Whitelist,
    devices: &DeviceRegistry,
) -> Vec<CanonicalElement> {
    let mut seen: HashSet<MergeKey> = HashSet::new();
    let mut merged = Vec::new();
    for algorithm in HashAlgorithm::ALL {
        for canonical in canonical_set(elements, whitelist, devices, algorithm) {
            if seen.insert(canonical.merge_key()) {
                merged.push(canonical);
            }
        }
    }
    log::debug!("merged canonical sets: {} rows", merged.len());
    merged
}

/// Pick the group's representative: minimum device id, then lowest insertion
/// sequence number. Unknown provenance (no device id) never beats a known
/// device.
fn elect_representative(elements: &ElementStore, ids: &[ElementId]) -> ElementId {
    debug_assert!(!ids.is_empty(), "digest groups are never empty");
    *ids.iter()
        .min_by_key(|id| {
            let element = elements.get(**id).expect("indexed id in store");
            match element.device_id {
                Some(device_id) => (false, device_id, **id),
                None => (true, 0, **id),
            }
        })
        .expect("non-empty group")
}
