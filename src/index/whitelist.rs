//! Known-benign digest whitelist.
//!
//! Digests of known OS/application files. The whitelist is a standalone
//! set-membership filter consulted per algorithm at resolution time, not a
//! flag on elements, so entries can be added or removed independently of the
//! element lifecycle. A populated field excludes any element whose digest for
//! that algorithm matches; an absent field never matches anything.

use std::collections::HashSet;

use crate::digest::{Digest, HashAlgorithm};

/// One operator-supplied whitelist entry.
///
/// Typically populates a single algorithm's field, but any subset is allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhitelistEntry {
    pub sha1: Option<Digest>,
    pub sha256: Option<Digest>,
    pub md5: Option<Digest>,
    pub note: Option<String>,
}

impl WhitelistEntry {
    /// Entry field for the given algorithm.
    #[must_use]
    pub fn digest(&self, algorithm: HashAlgorithm) -> Option<&Digest> {
        match algorithm {
            HashAlgorithm::Sha1 => self.sha1.as_ref(),
            HashAlgorithm::Sha256 => self.sha256.as_ref(),
            HashAlgorithm::Md5 => self.md5.as_ref(),
        }
    }
}

/// Whitelist store with per-algorithm membership sets.
#[derive(Debug, Default, Clone)]
pub struct Whitelist {
    entries: Vec<WhitelistEntry>,
    sha1: HashSet<Digest>,
    sha256: HashSet<Digest>,
    md5: HashSet<Digest>,
}

impl Whitelist {
    /// Create an empty whitelist.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, indexing every populated digest field.
    pub fn add(&mut self, entry: WhitelistEntry) {
        if let Some(digest) = &entry.sha1 {
            self.sha1.insert(digest.clone());
        }
        if let Some(digest) = &entry.sha256 {
            self.sha256.insert(digest.clone());
        }
        if let Some(digest) = &entry.md5 {
            self.md5.insert(digest.clone());
        }
        self.entries.push(entry);
    }

    /// True iff at least one entry whitelists this digest under this
    /// algorithm. Digests for other algorithms never match.
    #[must_use]
    pub fn is_whitelisted(&self, algorithm: HashAlgorithm, digest: &Digest) -> bool {
        match algorithm {
            HashAlgorithm::Sha1 => self.sha1.contains(digest),
            HashAlgorithm::Sha256 => self.sha256.contains(digest),
            HashAlgorithm::Md5 => self.md5.contains(digest),
        }
    }

    /// Number of entries added.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the whitelist is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &WhitelistEntry> {
        self.entries.iter()
    }
}
