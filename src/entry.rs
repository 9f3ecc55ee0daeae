//! Entry wrappers stored in tree nodes.
//!
//! Set flavors store a bare key, map flavors a key/value pair. The tree core
//! only needs to extract the key for ordering; weight functions see the whole
//! entry so a map's weight may depend on the mapped value.

use std::ops::Deref;

/// Access to the ordering key of a stored entry.
pub trait TreeEntry {
    /// Key type the container orders by.
    type Key;
    /// The ordering key. Must not change for the lifetime of the entry.
    fn key(&self) -> &Self::Key;
}

/// Entries that additionally carry a mapped value (map flavors).
pub trait MappedEntry: TreeEntry {
    /// The mapped value type.
    type Value;
    /// Shared access to the mapped value.
    fn value(&self) -> &Self::Value;
    /// Exclusive access to the mapped value.
    ///
    /// Only the tree's update path may use this: changing a value without
    /// re-propagating subtree sums breaks the augmentation invariant, so no
    /// public API hands out `&mut` entries.
    fn value_mut(&mut self) -> &mut Self::Value;
}

/// A set entry: just the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SetEntry<K>(pub K);

impl<K> TreeEntry for SetEntry<K> {
    type Key = K;
    #[inline]
    fn key(&self) -> &K {
        &self.0
    }
}

impl<K> Deref for SetEntry<K> {
    type Target = K;
    #[inline]
    fn deref(&self) -> &K {
        &self.0
    }
}

/// A map entry: key plus mapped value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PairEntry<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
}

impl<K, V> PairEntry<K, V> {
    /// Create an entry from a key and value.
    #[inline]
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }

    /// The mapped value.
    #[inline]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Split into key and value.
    #[inline]
    pub fn into_pair(self) -> (K, V) {
        (self.key, self.value)
    }
}

impl<K, V> TreeEntry for PairEntry<K, V> {
    type Key = K;
    #[inline]
    fn key(&self) -> &K {
        &self.key
    }
}

impl<K, V> MappedEntry for PairEntry<K, V> {
    type Value = V;
    #[inline]
    fn value(&self) -> &V {
        &self.value
    }
    #[inline]
    fn value_mut(&mut self) -> &mut V {
        &mut self.value
    }
}
