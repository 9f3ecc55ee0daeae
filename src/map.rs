//! Map and multimap containers over the augmented tree.
//!
//! A map's weight function sees the whole key/value pair, so mapped values
//! may only change through [`MapBase::set_value`] / [`MapBase::update_value`]
//! (or a mutable cursor), which re-propagate subtree sums; iteration and
//! lookup expose values immutably.

use crate::entry::PairEntry;
use crate::error::TreeError;
use crate::order::{KeyOrder, NaturalOrder};
use crate::store::{BoxStore, CompactNode, CompactStore, NodeStore, TreeIndex};
use crate::tree::{Cursor, CursorMut, Tree};
use crate::vec::{SlotVec, StackedVec};
use crate::weight::{ScalarArity, SumBuf, UnitWeight, WeightFn, WeightScalar};

/// Ordered key/value container with weighted prefix-sum queries.
///
/// Use the aliases below; the map-only accessors (`at`, `get`,
/// `get_or_default`, `set_value`, `update_value`) exist on unique maps only,
/// matching the ambiguity of those operations under duplicate keys.
pub struct MapBase<S, F, O, const MULTI: bool>(Tree<S, F, O, MULTI>);

impl<K, V, S, F, O, const MULTI: bool> MapBase<S, F, O, MULTI>
where
    S: NodeStore<Entry = PairEntry<K, V>>,
    F: WeightFn<PairEntry<K, V>, Weight = S::Weight>,
    O: KeyOrder<K>,
{
    /// An empty map with default weight and order.
    pub fn new() -> Self
    where
        F: Default,
        O: Default,
    {
        Self(Tree::new(F::default(), O::default()))
    }

    /// An empty map with the given weight function.
    pub fn with_weight(weight: F) -> Self
    where
        O: Default,
    {
        Self(Tree::new(weight, O::default()))
    }

    /// An empty map with the given weight function and key order.
    pub fn with_weight_and_order(weight: F, order: O) -> Self {
        Self(Tree::new(weight, order))
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of weight components per entry.
    pub fn arity(&self) -> usize {
        self.0.arity()
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Insert a key/value pair (the entry is constructed in here, so this
    /// doubles as the emplace form).
    ///
    /// A unique map refuses an existing key and returns `false` leaving the
    /// old value in place; a multimap always inserts, after equal keys.
    pub fn insert(&mut self, key: K, value: V) -> Result<bool, TreeError> {
        self.0
            .insert_entry(PairEntry::new(key, value))
            .map(|(_, inserted)| inserted)
    }

    /// Whether any entry has key `k`.
    pub fn contains(&self, k: &K) -> bool {
        self.0.contains(k)
    }

    /// Number of entries with key equal to `k`.
    pub fn count(&self, k: &K) -> usize {
        self.0.count(k)
    }

    /// Erase every entry with key equal to `k`, returning how many.
    pub fn erase(&mut self, k: &K) -> Result<usize, TreeError> {
        self.0.erase_key(k)
    }

    /// Erase every entry with key in `[from, to)`, returning how many.
    pub fn erase_range(&mut self, from: &K, to: &K) -> Result<usize, TreeError> {
        self.0.erase_range(from, to)
    }

    /// Erase one entry with key equal to `k` (the first of an equal run).
    pub fn erase_one(&mut self, k: &K) -> Result<Option<(K, V)>, TreeError> {
        let n = self.0.lower_bound_node(k);
        if n == self.0.nil() || !self.0.key_equal(n, k) {
            return Ok(None);
        }
        let (_, entry) = self.0.erase_node(n)?;
        Ok(Some(entry.into_pair()))
    }

    /// Iterate over `(key, value)` in key order.
    pub fn iter<'a>(&'a self) -> impl Iterator<Item = (&'a K, &'a V)> + 'a
    where
        K: 'a,
        V: 'a,
    {
        self.0.iter().map(|e| (&e.key, &e.value))
    }

    /// Iterate over the run of entries with key equal to `k`.
    pub fn equal_range<'a>(&'a self, k: &K) -> impl Iterator<Item = (&'a K, &'a V)> + 'a
    where
        K: 'a,
        V: 'a,
    {
        self.0.equal_range(k).map(|e| (&e.key, &e.value))
    }

    /// The entry with the smallest key.
    pub fn first(&self) -> Option<(&K, &V)> {
        self.0.first().entry().map(|e| (&e.key, &e.value))
    }

    /// The entry with the largest key.
    pub fn last(&self) -> Option<(&K, &V)> {
        self.0.last().entry().map(|e| (&e.key, &e.value))
    }

    /// Cursor at the entry with the smallest key (end for an empty map).
    pub fn first_cursor(&self) -> Cursor<'_, S, F, O, MULTI> {
        self.0.first()
    }

    /// Cursor at any entry with key equal to `k`, end if absent.
    pub fn find(&self, k: &K) -> Cursor<'_, S, F, O, MULTI> {
        self.0.find(k)
    }

    /// Cursor at the first entry with key ≥ `k`, end if none.
    pub fn lower_bound(&self, k: &K) -> Cursor<'_, S, F, O, MULTI> {
        self.0.lower_bound(k)
    }

    /// Cursor at the first entry with key > `k`, end if none.
    pub fn upper_bound(&self, k: &K) -> Cursor<'_, S, F, O, MULTI> {
        self.0.upper_bound(k)
    }

    /// Exclusive cursor at any entry with key equal to `k`, end if absent.
    pub fn find_mut(&mut self, k: &K) -> CursorMut<'_, S, F, O, MULTI> {
        self.0.find_mut(k)
    }

    /// Exclusive cursor at the first entry with key ≥ `k`, end if none.
    pub fn lower_bound_mut(&mut self, k: &K) -> CursorMut<'_, S, F, O, MULTI> {
        self.0.lower_bound_mut(k)
    }

    /// Componentwise sum of the weights of all entries with key strictly
    /// less than `k`.
    pub fn sums_before(&self, k: &K) -> Result<SumBuf<S::Weight>, TreeError> {
        self.0.sums_before(k)
    }

    /// As [`MapBase::sums_before`], writing into a caller buffer.
    pub fn sums_before_into(&self, k: &K, out: &mut [S::Weight]) -> Result<(), TreeError> {
        self.0.sums_before_into(k, out)
    }

    /// Componentwise total over all entries.
    pub fn total_sums(&self) -> SumBuf<S::Weight> {
        self.0.total_sums()
    }

    /// Scalar prefix sum for arity-1 weights.
    pub fn sum_before(&self, k: &K) -> Result<S::Weight, TreeError>
    where
        F: ScalarArity,
    {
        Ok(self.0.sums_before(k)?[0])
    }

    /// Scalar total for arity-1 weights.
    pub fn total_sum(&self) -> S::Weight
    where
        F: ScalarArity,
    {
        self.total_sums()[0]
    }

    /// Verify every container invariant; see [`Tree::check`].
    pub fn check(&self, tolerance: Option<f64>) -> Result<(), TreeError> {
        self.0.check(tolerance)
    }
}

/// Map-only accessors; ambiguous under duplicate keys, so unique maps only.
impl<K, V, S, F, O> MapBase<S, F, O, false>
where
    S: NodeStore<Entry = PairEntry<K, V>>,
    F: WeightFn<PairEntry<K, V>, Weight = S::Weight>,
    O: KeyOrder<K>,
{
    /// The value for key `k`, if present.
    pub fn get<'a>(&'a self, k: &K) -> Option<&'a V>
    where
        K: 'a,
    {
        let n = self.0.find_node(k);
        if n == self.0.nil() {
            None
        } else {
            Some(self.0.store().entry(n).value())
        }
    }

    /// The value for key `k`; `KeyAbsent` when missing.
    pub fn at<'a>(&'a self, k: &K) -> Result<&'a V, TreeError>
    where
        K: 'a,
    {
        self.get(k).ok_or(TreeError::KeyAbsent)
    }

    /// The value for key `k`, inserting a default entry when missing.
    pub fn get_or_default<'a>(&'a mut self, k: K) -> Result<&'a V, TreeError>
    where
        V: Default,
        K: 'a,
    {
        let n = self.0.find_node(&k);
        let h = if n == self.0.nil() {
            self.0.insert_entry(PairEntry::new(k, V::default()))?.0
        } else {
            n
        };
        Ok(self.0.store().entry(h).value())
    }

    /// Set the value for `k`, inserting when missing. Returns whether a new
    /// entry was inserted. Sums are re-propagated either way.
    pub fn set_value(&mut self, k: K, v: V) -> Result<bool, TreeError> {
        let n = self.0.find_node(&k);
        if n == self.0.nil() {
            self.0.insert_entry(PairEntry::new(k, v))?;
            Ok(true)
        } else {
            self.0.update_value_at(n, v)?;
            Ok(false)
        }
    }

    /// Overwrite the value of an existing entry; `KeyAbsent` when missing.
    /// Sums are re-propagated from the entry to the root.
    pub fn update_value(&mut self, k: &K, v: V) -> Result<(), TreeError> {
        let n = self.0.find_node(k);
        if n == self.0.nil() {
            return Err(TreeError::KeyAbsent);
        }
        self.0.update_value_at(n, v)
    }
}

impl<K, V, S, F, O, const MULTI: bool> Default for MapBase<S, F, O, MULTI>
where
    S: NodeStore<Entry = PairEntry<K, V>>,
    F: WeightFn<PairEntry<K, V>, Weight = S::Weight> + Default,
    O: KeyOrder<K> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, W, I, B, F, O, const MULTI: bool>
    MapBase<CompactStore<PairEntry<K, V>, W, I, B>, F, O, MULTI>
where
    W: WeightScalar,
    I: TreeIndex,
    B: SlotVec<CompactNode<PairEntry<K, V>, I>>,
    F: WeightFn<PairEntry<K, V>, Weight = W>,
    O: KeyOrder<K>,
{
    /// Compact the arena; see the set counterpart for the contract.
    pub fn shrink_to_fit(&mut self) {
        self.0.store_mut().shrink_to_fit();
    }

    /// Pre-allocate arena room for `n` entries.
    pub fn reserve(&mut self, n: usize) -> bool {
        self.0.store_mut().reserve(n)
    }

    /// Arena slots currently backed by memory.
    pub fn slot_count(&self) -> usize {
        self.0.store().slot_count()
    }

    /// Freed arena slots awaiting reuse.
    pub fn deleted_count(&self) -> usize {
        self.0.store().deleted_count()
    }
}

/// Unique map, pointer-style storage.
pub type Map<K, V, F> = MapBase<
    BoxStore<PairEntry<K, V>, <F as WeightFn<PairEntry<K, V>>>::Weight>,
    F,
    NaturalOrder,
    false,
>;

/// Multimap, pointer-style storage.
pub type MultiMap<K, V, F> = MapBase<
    BoxStore<PairEntry<K, V>, <F as WeightFn<PairEntry<K, V>>>::Weight>,
    F,
    NaturalOrder,
    true,
>;

/// Unique map, compact storage with index type `I`.
pub type MapC<K, V, F, I = u32> = MapBase<
    CompactStore<PairEntry<K, V>, <F as WeightFn<PairEntry<K, V>>>::Weight, I>,
    F,
    NaturalOrder,
    false,
>;

/// Multimap, compact storage with index type `I`.
pub type MultiMapC<K, V, F, I = u32> = MapBase<
    CompactStore<PairEntry<K, V>, <F as WeightFn<PairEntry<K, V>>>::Weight, I>,
    F,
    NaturalOrder,
    true,
>;

/// Unique map, compact storage backed by the chunked vector.
pub type StackedMapC<K, V, F, I = u32> = MapBase<
    CompactStore<
        PairEntry<K, V>,
        <F as WeightFn<PairEntry<K, V>>>::Weight,
        I,
        StackedVec<CompactNode<PairEntry<K, V>, I>>,
    >,
    F,
    NaturalOrder,
    false,
>;

/// Order-statistic map: prefix sums are ranks.
pub type RankMap<K, V, W = u32> = Map<K, V, UnitWeight<W>>;

/// Order-statistic multimap.
pub type RankMultiMap<K, V, W = u32> = MultiMap<K, V, UnitWeight<W>>;

/// Order-statistic map, compact storage.
pub type RankMapC<K, V, W = u32, I = u32> = MapC<K, V, UnitWeight<W>, I>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weight::{ParamWeight, ScalarWeight};

    type KV = PairEntry<u32, u32>;

    #[test]
    fn keyed_weight_prefix_sums() {
        // w(k, v) = 2 * (k + v)
        let f: ScalarWeight<fn(&KV) -> u64> =
            ScalarWeight(|e: &KV| 2 * (e.key as u64 + e.value as u64));
        let mut m: MapC<u32, u32, _> = MapBase::with_weight(f);
        m.insert(1, 2).unwrap();
        m.insert(1000, 1234).unwrap();
        assert_eq!(m.sum_before(&1000).unwrap(), 6);
        assert_eq!(m.total_sum(), 6 + 2 * 2234);
        m.check(Some(0.0)).unwrap();
    }

    #[test]
    fn vector_weight_componentwise_sums() {
        // w((k, v), a) = a * k * v for three parameters at once.
        let f = ParamWeight::new(
            |e: &KV, a: &f64| *a * e.key as f64 * e.value as f64,
            vec![1.0, 2.5, 5.555555],
        );
        let mut m: MultiMap<u32, u32, _> = MapBase::with_weight(f);
        m.insert(1, 3).unwrap();
        m.insert(10, 1).unwrap();
        m.insert(5, 2).unwrap();
        let sums = m.sums_before(&10).unwrap();
        let expect = [13.0, 32.5, 72.222215];
        for (have, want) in sums.iter().zip(&expect) {
            assert!((have - want).abs() < 1e-9, "{have} != {want}");
        }
        m.check(Some(1e-9)).unwrap();
    }

    #[test]
    fn at_and_get_or_default() {
        let mut m: RankMapC<u32, String> = MapBase::new();
        m.insert(1, "one".into()).unwrap();
        assert_eq!(m.at(&1).unwrap(), "one");
        assert_eq!(m.at(&2).unwrap_err(), TreeError::KeyAbsent);
        assert_eq!(m.get_or_default(2).unwrap(), "");
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn update_value_repropagates_sums() {
        let f: ScalarWeight<fn(&KV) -> u64> = ScalarWeight(|e: &KV| e.value as u64);
        let mut m: MapC<u32, u32, _> = MapBase::with_weight(f);
        for k in 1..=5u32 {
            m.insert(k, 10).unwrap();
        }
        assert_eq!(m.sum_before(&4).unwrap(), 30);
        m.update_value(&2, 25).unwrap();
        // Entries before key 2 are unaffected, later prefix sums shift by 15.
        assert_eq!(m.sum_before(&2).unwrap(), 10);
        assert_eq!(m.sum_before(&4).unwrap(), 45);
        assert_eq!(m.total_sum(), 65);
        m.check(Some(0.0)).unwrap();
        assert_eq!(m.update_value(&9, 1).unwrap_err(), TreeError::KeyAbsent);
    }

    #[test]
    fn set_value_inserts_or_updates() {
        let f: ScalarWeight<fn(&KV) -> u64> = ScalarWeight(|e: &KV| e.value as u64);
        let mut m: Map<u32, u32, _> = MapBase::with_weight(f);
        assert!(m.set_value(7, 1).unwrap());
        assert!(!m.set_value(7, 9).unwrap());
        assert_eq!(m.get(&7), Some(&9));
        assert_eq!(m.total_sum(), 9);
    }

    #[test]
    fn multimap_keeps_duplicate_keys() {
        let mut m: RankMultiMap<u32, u32> = MapBase::new();
        m.insert(1, 10).unwrap();
        m.insert(1, 11).unwrap();
        m.insert(1, 12).unwrap();
        assert_eq!(m.count(&1), 3);
        // Stable: values iterate in insertion order.
        let values: Vec<u32> = m.equal_range(&1).map(|(_, v)| *v).collect();
        assert_eq!(values, vec![10, 11, 12]);
    }

    #[test]
    fn cursor_set_value_updates_in_place() {
        let f: ScalarWeight<fn(&KV) -> u64> = ScalarWeight(|e: &KV| e.value as u64);
        let mut m: MapC<u32, u32, _> = MapBase::with_weight(f);
        m.insert(3, 5).unwrap();
        let mut c = m.find_mut(&3);
        c.set_value(8).unwrap();
        drop(c);
        assert_eq!(m.get(&3), Some(&8));
        assert_eq!(m.total_sum(), 8);
        m.check(Some(0.0)).unwrap();
    }

    #[test]
    fn map_compaction_is_neutral() {
        let mut m: RankMapC<u32, u32> = MapBase::new();
        for k in 0..20u32 {
            m.insert(k, k * 2).unwrap();
        }
        for k in (0..20u32).step_by(3) {
            m.erase(&k).unwrap();
        }
        let before: Vec<(u32, u32)> = m.iter().map(|(k, v)| (*k, *v)).collect();
        m.shrink_to_fit();
        let after: Vec<(u32, u32)> = m.iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(before, after);
        assert_eq!(m.slot_count(), m.len() + 2);
        m.check(Some(0.0)).unwrap();
    }
}
