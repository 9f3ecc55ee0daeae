//! Set and multiset containers over the augmented tree.
//!
//! The flavor matrix mirrors the storage and weight choices: `Set`/`MultiSet`
//! allocate one record per node (stable addresses, unbounded capacity),
//! `SetC`/`MultiSetC` pack nodes into the compact index-addressed arena, and
//! the `Rank*` aliases fix the weight to the constant 1 so prefix sums are
//! element ranks.

use crate::entry::SetEntry;
use crate::error::TreeError;
use crate::order::{KeyOrder, NaturalOrder};
use crate::store::{BoxStore, CompactNode, CompactStore, NodeStore, TreeIndex};
use crate::tree::{Cursor, CursorMut, Tree};
use crate::vec::{SlotVec, StackedVec};
use crate::weight::{ScalarArity, SumBuf, UnitWeight, WeightFn, WeightScalar};

/// Ordered collection of keys with weighted prefix-sum queries.
///
/// Generic over the node store `S`, the weight function `F`, the key order
/// `O`, and the uniqueness policy; use the aliases below rather than naming
/// this type directly. No state beyond the underlying tree.
pub struct SetBase<S, F, O, const MULTI: bool>(Tree<S, F, O, MULTI>);

impl<K, S, F, O, const MULTI: bool> SetBase<S, F, O, MULTI>
where
    S: NodeStore<Entry = SetEntry<K>>,
    F: WeightFn<SetEntry<K>, Weight = S::Weight>,
    O: KeyOrder<K>,
{
    /// An empty set with default weight and order.
    pub fn new() -> Self
    where
        F: Default,
        O: Default,
    {
        Self(Tree::new(F::default(), O::default()))
    }

    /// An empty set with the given weight function.
    pub fn with_weight(weight: F) -> Self
    where
        O: Default,
    {
        Self(Tree::new(weight, O::default()))
    }

    /// An empty set with the given weight function and key order.
    pub fn with_weight_and_order(weight: F, order: O) -> Self {
        Self(Tree::new(weight, order))
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of weight components per key.
    pub fn arity(&self) -> usize {
        self.0.arity()
    }

    /// Remove every key.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Insert a key.
    ///
    /// A unique set refuses an existing key and returns `false`; a multiset
    /// always inserts, placing the new key after existing equal keys.
    pub fn insert(&mut self, key: K) -> Result<bool, TreeError> {
        self.0.insert_entry(SetEntry(key)).map(|(_, inserted)| inserted)
    }

    /// Whether `k` is present.
    pub fn contains(&self, k: &K) -> bool {
        self.0.contains(k)
    }

    /// Number of keys equal to `k`.
    pub fn count(&self, k: &K) -> usize {
        self.0.count(k)
    }

    /// Erase every key equal to `k`, returning how many were removed.
    pub fn erase(&mut self, k: &K) -> Result<usize, TreeError> {
        self.0.erase_key(k)
    }

    /// Erase every key in `[from, to)`, returning how many were removed.
    pub fn erase_range(&mut self, from: &K, to: &K) -> Result<usize, TreeError> {
        self.0.erase_range(from, to)
    }

    /// Erase one key equal to `k` (the first of an equal run), returning it.
    pub fn erase_one(&mut self, k: &K) -> Result<Option<K>, TreeError> {
        let n = self.0.lower_bound_node(k);
        if n == self.0.nil() || !self.0.key_equal(n, k) {
            return Ok(None);
        }
        let (_, entry) = self.0.erase_node(n)?;
        Ok(Some(entry.0))
    }

    /// Iterate over the keys in order.
    pub fn iter<'a>(&'a self) -> impl Iterator<Item = &'a K> + 'a
    where
        K: 'a,
    {
        self.0.iter().map(|e| &e.0)
    }

    /// Iterate over the run of keys equal to `k`.
    pub fn equal_range<'a>(&'a self, k: &K) -> impl Iterator<Item = &'a K> + 'a
    where
        K: 'a,
    {
        self.0.equal_range(k).map(|e| &e.0)
    }

    /// The smallest key.
    pub fn first(&self) -> Option<&K> {
        self.0.first().key()
    }

    /// The largest key.
    pub fn last(&self) -> Option<&K> {
        self.0.last().key()
    }

    /// Cursor at the smallest key (end for an empty set).
    pub fn first_cursor(&self) -> Cursor<'_, S, F, O, MULTI> {
        self.0.first()
    }

    /// Cursor at any key equal to `k`, end if absent.
    pub fn find(&self, k: &K) -> Cursor<'_, S, F, O, MULTI> {
        self.0.find(k)
    }

    /// Cursor at the first key ≥ `k`, end if none.
    pub fn lower_bound(&self, k: &K) -> Cursor<'_, S, F, O, MULTI> {
        self.0.lower_bound(k)
    }

    /// Cursor at the first key > `k`, end if none.
    pub fn upper_bound(&self, k: &K) -> Cursor<'_, S, F, O, MULTI> {
        self.0.upper_bound(k)
    }

    /// Exclusive cursor at the first key ≥ `k`, end if none.
    pub fn lower_bound_mut(&mut self, k: &K) -> CursorMut<'_, S, F, O, MULTI> {
        self.0.lower_bound_mut(k)
    }

    /// Exclusive cursor at any key equal to `k`, end if absent.
    pub fn find_mut(&mut self, k: &K) -> CursorMut<'_, S, F, O, MULTI> {
        self.0.find_mut(k)
    }

    /// Exclusive end cursor, usable as an append hint.
    pub fn end_mut(&mut self) -> CursorMut<'_, S, F, O, MULTI> {
        self.0.end_mut()
    }

    /// Componentwise sum of the weights of all keys strictly less than `k`.
    pub fn sums_before(&self, k: &K) -> Result<SumBuf<S::Weight>, TreeError> {
        self.0.sums_before(k)
    }

    /// As [`SetBase::sums_before`], writing into a caller buffer.
    pub fn sums_before_into(&self, k: &K, out: &mut [S::Weight]) -> Result<(), TreeError> {
        self.0.sums_before_into(k, out)
    }

    /// Componentwise total over all keys.
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

impl<K, S, F, O, const MULTI: bool> Default for SetBase<S, F, O, MULTI>
where
    S: NodeStore<Entry = SetEntry<K>>,
    F: WeightFn<SetEntry<K>, Weight = S::Weight> + Default,
    O: KeyOrder<K> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, W, I, B, F, O, const MULTI: bool>
    SetBase<CompactStore<SetEntry<K>, W, I, B>, F, O, MULTI>
where
    W: WeightScalar,
    I: TreeIndex,
    B: SlotVec<CompactNode<SetEntry<K>, I>>,
    F: WeightFn<SetEntry<K>, Weight = W>,
    O: KeyOrder<K>,
{
    /// Compact the arena: freed slots are returned to the system. The one
    /// operation that invalidates outstanding positions, hence `&mut`.
    pub fn shrink_to_fit(&mut self) {
        self.0.store_mut().shrink_to_fit();
    }

    /// Pre-allocate arena room for `n` keys.
    pub fn reserve(&mut self, n: usize) -> bool {
        self.0.store_mut().reserve(n)
    }

    /// Arena slots currently backed by memory (live + freed + sentinels).
    pub fn slot_count(&self) -> usize {
        self.0.store().slot_count()
    }

    /// Freed arena slots awaiting reuse.
    pub fn deleted_count(&self) -> usize {
        self.0.store().deleted_count()
    }
}

/// Unique set, pointer-style storage.
pub type Set<K, F> =
    SetBase<BoxStore<SetEntry<K>, <F as WeightFn<SetEntry<K>>>::Weight>, F, NaturalOrder, false>;

/// Multiset, pointer-style storage.
pub type MultiSet<K, F> =
    SetBase<BoxStore<SetEntry<K>, <F as WeightFn<SetEntry<K>>>::Weight>, F, NaturalOrder, true>;

/// Unique set, compact storage with index type `I`.
pub type SetC<K, F, I = u32> = SetBase<
    CompactStore<SetEntry<K>, <F as WeightFn<SetEntry<K>>>::Weight, I>,
    F,
    NaturalOrder,
    false,
>;

/// Multiset, compact storage with index type `I`.
pub type MultiSetC<K, F, I = u32> = SetBase<
    CompactStore<SetEntry<K>, <F as WeightFn<SetEntry<K>>>::Weight, I>,
    F,
    NaturalOrder,
    true,
>;

/// Unique set, compact storage backed by the chunked vector.
pub type StackedSetC<K, F, I = u32> = SetBase<
    CompactStore<
        SetEntry<K>,
        <F as WeightFn<SetEntry<K>>>::Weight,
        I,
        StackedVec<CompactNode<SetEntry<K>, I>>,
    >,
    F,
    NaturalOrder,
    false,
>;

/// Multiset, compact storage backed by the chunked vector.
pub type StackedMultiSetC<K, F, I = u32> = SetBase<
    CompactStore<
        SetEntry<K>,
        <F as WeightFn<SetEntry<K>>>::Weight,
        I,
        StackedVec<CompactNode<SetEntry<K>, I>>,
    >,
    F,
    NaturalOrder,
    true,
>;

/// Order-statistic set: prefix sums are ranks.
pub type RankSet<K, W = u32> = Set<K, UnitWeight<W>>;

/// Order-statistic multiset.
pub type RankMultiSet<K, W = u32> = MultiSet<K, UnitWeight<W>>;

/// Order-statistic set, compact storage.
pub type RankSetC<K, W = u32, I = u32> = SetC<K, UnitWeight<W>, I>;

/// Order-statistic multiset, compact storage.
pub type RankMultiSetC<K, W = u32, I = u32> = MultiSetC<K, UnitWeight<W>, I>;
