//! Append-only store of file observations.
//!
//! Each element records one observed file on one device: whichever digests
//! the acquisition computed, the owning device, the original path, and the
//! captured file slack. Identical digests across elements are expected (that
//! is the duplication being detected); uniqueness is a query-time concept
//! handled by the resolver, never a storage constraint.
//!
//! The store keeps one index per digest algorithm. The indexes are
//! independent because a query constrains on exactly one algorithm at a time
//! and an element may have any subset of digests present.

use std::collections::BTreeMap;

use crate::digest::{Digest, HashAlgorithm};

/// Insertion sequence number of an element.
///
/// Assigned by [`ElementStore::append`] in arrival order. Also serves as the
/// deterministic tie-break key when several observations share both digest
/// and device: the earliest appended observation wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(pub u64);

/// One observed file (or file-like object) on one device.
///
/// `device_id` is an unenforced reference: the resolver tolerates ids with no
/// matching registry row and treats them as unknown provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub sha1: Option<Digest>,
    pub sha256: Option<Digest>,
    pub md5: Option<Digest>,
    pub device_id: Option<i64>,
    pub path: String,
    pub file_slack: Option<Vec<u8>>,
}

impl Element {
    /// Create an element with no digests and no slack.
    #[must_use]
    pub fn new(device_id: Option<i64>, path: impl Into<String>) -> Self {
        Self {
            sha1: None,
            sha256: None,
            md5: None,
            device_id,
            path: path.into(),
            file_slack: None,
        }
    }

    /// Set the SHA-1 digest.
    #[must_use]
    pub fn with_sha1(mut self, digest: Digest) -> Self {
        debug_assert_eq!(digest.algorithm(), HashAlgorithm::Sha1);
        self.sha1 = Some(digest);
        self
    }

    /// Set the SHA-256 digest.
    #[must_use]
    pub fn with_sha256(mut self, digest: Digest) -> Self {
        debug_assert_eq!(digest.algorithm(), HashAlgorithm::Sha256);
        self.sha256 = Some(digest);
        self
    }

    /// Set the MD5 digest.
    #[must_use]
    pub fn with_md5(mut self, digest: Digest) -> Self {
        debug_assert_eq!(digest.algorithm(), HashAlgorithm::Md5);
        self.md5 = Some(digest);
        self
    }

    /// Set the captured file slack.
    #[must_use]
    pub fn with_file_slack(mut self, slack: Vec<u8>) -> Self {
        self.file_slack = Some(slack);
        self
    }

    /// This element's digest under the given algorithm, if computed.
    #[must_use]
    pub fn digest(&self, algorithm: HashAlgorithm) -> Option<&Digest> {
        match algorithm {
            HashAlgorithm::Sha1 => self.sha1.as_ref(),
            HashAlgorithm::Sha256 => self.sha256.as_ref(),
            HashAlgorithm::Md5 => self.md5.as_ref(),
        }
    }

    /// Whether any digest field is populated.
    ///
    /// An element with none is legal but invisible to every resolver.
    #[must_use]
    pub fn has_any_digest(&self) -> bool {
        self.sha1.is_some() || self.sha256.is_some() || self.md5.is_some()
    }
}

/// Append log of elements plus one digest index per algorithm.
#[derive(Debug, Default, Clone)]
pub struct ElementStore {
    elements: Vec<Element>,
    sha1_index: BTreeMap<Digest, Vec<ElementId>>,
    sha256_index: BTreeMap<Digest, Vec<ElementId>>,
    md5_index: BTreeMap<Digest, Vec<ElementId>>,
}

impl ElementStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observation, returning its insertion sequence number.
    ///
    /// The element is indexed under every digest it carries; ids within an
    /// index bucket stay in insertion order.
    pub fn append(&mut self, element: Element) -> ElementId {
        let id = ElementId(self.elements.len() as u64);
        if !element.has_any_digest() {
            log::warn!(
                "element {:?} has no digests and will be invisible to resolution: {}",
                id,
                element.path
            );
        }
        if let Some(digest) = &element.sha1 {
            self.sha1_index.entry(digest.clone()).or_default().push(id);
        }
        if let Some(digest) = &element.sha256 {
            self.sha256_index.entry(digest.clone()).or_default().push(id);
        }
        if let Some(digest) = &element.md5 {
            self.md5_index.entry(digest.clone()).or_default().push(id);
        }
        log::trace!("appended element {:?}: {}", id, element.path);
        self.elements.push(element);
        id
    }

    /// Fetch an element by id.
    #[must_use]
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.0 as usize)
    }

    /// Ids of all elements carrying this digest, in insertion order.
    #[must_use]
    pub fn lookup(&self, digest: &Digest) -> &[ElementId] {
        self.index(digest.algorithm())
            .get(digest)
            .map_or(&[], Vec::as_slice)
    }

    /// Iterate digest groups for one algorithm, ascending by digest value.
    pub fn digest_groups(
        &self,
        algorithm: HashAlgorithm,
    ) -> impl Iterator<Item = (&Digest, &[ElementId])> {
        self.index(algorithm)
            .iter()
            .map(|(digest, ids)| (digest, ids.as_slice()))
    }

    /// Number of distinct digest values observed under one algorithm.
    #[must_use]
    pub fn distinct_digests(&self, algorithm: HashAlgorithm) -> usize {
        self.index(algorithm).len()
    }

    /// Number of appended elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterate all elements with their ids, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &Element)> {
        self.elements
            .iter()
            .enumerate()
            .map(|(i, e)| (ElementId(i as u64), e))
    }

    fn index(&self, algorithm: HashAlgorithm) -> &BTreeMap<Digest, Vec<ElementId>> {
        match algorithm {
            HashAlgorithm::Sha1 => &self.sha1_index,
            HashAlgorithm::Sha256 => &self.sha256_index,
            HashAlgorithm::Md5 => &self.md5_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sha1(hex_char: char) -> Digest {
        Digest::new(HashAlgorithm::Sha1, &hex_char.to_string().repeat(40)).unwrap()
    }

    fn md5(hex_char: char) -> Digest {
        Digest::new(HashAlgorithm::Md5, &hex_char.to_string().repeat(32)).unwrap()
    }

    #[test]
    fn test_append_assigns_sequential_ids() {
        let mut store = ElementStore::new();
        let a = store.append(Element::new(Some(1), "/a").with_sha1(sha1('a')));
        let b = store.append(Element::new(Some(1), "/b").with_sha1(sha1('b')));
        assert_eq!(a, ElementId(0));
        assert_eq!(b, ElementId(1));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_lookup_preserves_insertion_order() {
        let mut store = ElementStore::new();
        let first = store.append(Element::new(Some(2), "/x").with_sha1(sha1('a')));
        store.append(Element::new(Some(1), "/y").with_sha1(sha1('b')));
        let third = store.append(Element::new(Some(1), "/z").with_sha1(sha1('a')));

        assert_eq!(store.lookup(&sha1('a')), &[first, third]);
    }

    #[test]
    fn test_indexes_are_independent_per_algorithm() {
        let mut store = ElementStore::new();
        store.append(
            Element::new(Some(1), "/both")
                .with_sha1(sha1('a'))
                .with_md5(md5('c')),
        );
        store.append(Element::new(Some(1), "/sha1-only").with_sha1(sha1('a')));

        assert_eq!(store.lookup(&sha1('a')).len(), 2);
        assert_eq!(store.lookup(&md5('c')).len(), 1);
        assert_eq!(store.distinct_digests(HashAlgorithm::Sha256), 0);
    }

    #[test]
    fn test_element_without_digests_is_stored_but_unindexed() {
        let mut store = ElementStore::new();
        let id = store.append(Element::new(Some(1), "/no-digests"));

        assert_eq!(store.len(), 1);
        assert!(store.get(id).is_some());
        for algorithm in HashAlgorithm::ALL {
            assert_eq!(store.distinct_digests(algorithm), 0);
        }
    }

    #[test]
    fn test_duplicate_digests_are_not_an_error() {
        let mut store = ElementStore::new();
        for i in 0..4 {
            store.append(Element::new(Some(i), format!("/copy{i}")).with_sha1(sha1('d')));
        }
        assert_eq!(store.lookup(&sha1('d')).len(), 4);
        assert_eq!(store.distinct_digests(HashAlgorithm::Sha1), 1);
    }

    #[test]
    fn test_digest_groups_sorted_by_digest() {
        let mut store = ElementStore::new();
        store.append(Element::new(Some(1), "/c").with_sha1(sha1('c')));
        store.append(Element::new(Some(1), "/a").with_sha1(sha1('a')));
        store.append(Element::new(Some(1), "/b").with_sha1(sha1('b')));

        let digests: Vec<String> = store
            .digest_groups(HashAlgorithm::Sha1)
            .map(|(d, _)| d.as_hex().to_string())
            .collect();
        assert_eq!(digests, vec!["a".repeat(40), "b".repeat(40), "c".repeat(40)]);
    }

    #[test]
    fn test_file_slack_payload_roundtrip() {
        let mut store = ElementStore::new();
        let id = store.append(
            Element::new(Some(1), "/slack")
                .with_sha1(sha1('e'))
                .with_file_slack(vec![0xde, 0xad, 0x00, 0xbe]),
        );
        let stored = store.get(id).unwrap();
        assert_eq!(stored.file_slack.as_deref(), Some(&[0xde, 0xad, 0x00, 0xbe][..]));
    }
}
