//! In-memory deduplication index.
//!
//! # Architecture
//!
//! The index is built from four pieces, leaves first:
//!
//! * [`device`]: registry of acquisition sources, insert-or-fail by id.
//! * [`element`]: append-only log of file observations with one digest index
//!   per algorithm.
//! * [`whitelist`]: known-benign digest filter, consulted per algorithm.
//! * [`resolver`]: collapses each digest group to one canonical row and
//!   unions the three per-algorithm views.
//!
//! # Concurrency
//!
//! Appends take `&mut self` and resolution takes `&self`, so the borrow
//! checker enforces the single-writer-multiple-reader discipline: a
//! resolution run always sees a frozen snapshot, including whitelist state as
//! of query start.

pub mod device;
pub mod element;
pub mod resolver;
pub mod whitelist;

pub use device::{Device, DeviceRegistry, RegistryError};
pub use element::{Element, ElementId, ElementStore};
pub use resolver::CanonicalElement;
pub use whitelist::{Whitelist, WhitelistEntry};

use crate::digest::HashAlgorithm;

/// The three stores plus resolution entry points, bundled for callers that
/// want one handle over a whole case.
#[derive(Debug, Default, Clone)]
pub struct DedupIndex {
    pub devices: DeviceRegistry,
    pub elements: ElementStore,
    pub whitelist: Whitelist,
}

impl DedupIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical set for one algorithm (see [`resolver::canonical_set`]).
    pub fn canonical_set(
        &self,
        algorithm: HashAlgorithm,
    ) -> impl Iterator<Item = CanonicalElement> + '_ {
        resolver::canonical_set(&self.elements, &self.whitelist, &self.devices, algorithm)
    }

    /// Union of all three canonical sets (see [`resolver::merge`]).
    #[must_use]
    pub fn merge(&self) -> Vec<CanonicalElement> {
        resolver::merge(&self.elements, &self.whitelist, &self.devices)
    }
}
