//! Cursors and iterators: a borrowed container reference plus a node handle.
//!
//! Handles are never exposed raw. A [`Cursor`] borrows the tree shared, a
//! [`CursorMut`] exclusively, so the borrow checker rules out every use of a
//! handle after an operation that could invalidate it (erase, clear,
//! compaction). The end position is representable: a cursor at end has no
//! entry, and stepping backwards from it lands on the last entry.

use super::{KeyOf, Tree};
use crate::entry::{MappedEntry, TreeEntry};
use crate::error::TreeError;
use crate::order::KeyOrder;
use crate::store::NodeStore;
use crate::weight::{SumBuf, ScalarArity, WeightFn};

/// Read-only position in a tree.
pub struct Cursor<'a, S, F, O, const MULTI: bool>
where
    S: NodeStore,
{
    tree: &'a Tree<S, F, O, MULTI>,
    node: S::Handle,
}

impl<'a, S, F, O, const MULTI: bool> Clone for Cursor<'a, S, F, O, MULTI>
where
    S: NodeStore,
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, S, F, O, const MULTI: bool> Copy for Cursor<'a, S, F, O, MULTI> where S: NodeStore {}

impl<'a, S, F, O, const MULTI: bool> Cursor<'a, S, F, O, MULTI>
where
    S: NodeStore,
    S::Entry: TreeEntry,
    F: WeightFn<S::Entry, Weight = S::Weight>,
    O: KeyOrder<KeyOf<S>>,
{
    pub(crate) fn new(tree: &'a Tree<S, F, O, MULTI>, node: S::Handle) -> Self {
        Self { tree, node }
    }

    /// True at the past-the-end position.
    #[inline]
    pub fn is_end(&self) -> bool {
        self.node == self.tree.nil()
    }

    /// The entry at this position, `None` at end.
    pub fn entry(&self) -> Option<&'a S::Entry> {
        if self.is_end() {
            None
        } else {
            Some(self.tree.store().entry(self.node))
        }
    }

    /// The key at this position, `None` at end.
    pub fn key(&self) -> Option<&'a KeyOf<S>> {
        self.entry().map(TreeEntry::key)
    }

    /// Advance to the in-order successor; at end this stays at end.
    pub fn move_next(&mut self) {
        self.node = self.tree.next_node(self.node);
    }

    /// Step to the in-order predecessor; from end this lands on the last
    /// entry.
    pub fn move_prev(&mut self) {
        self.node = self.tree.prev_node(self.node);
    }

    /// Componentwise sum of the weights of every entry before this
    /// position; at end this is the total sum.
    pub fn sums_before(&self) -> Result<SumBuf<S::Weight>, TreeError> {
        self.tree.sums_before_node(self.node)
    }

    /// Scalar form of [`Cursor::sums_before`] for arity-1 weights.
    pub fn sum_before(&self) -> Result<S::Weight, TreeError>
    where
        F: ScalarArity,
    {
        Ok(self.sums_before()?[0])
    }
}

/// Exclusive position in a tree, able to remove and update entries.
pub struct CursorMut<'a, S, F, O, const MULTI: bool>
where
    S: NodeStore,
{
    tree: &'a mut Tree<S, F, O, MULTI>,
    node: S::Handle,
}

impl<'a, S, F, O, const MULTI: bool> CursorMut<'a, S, F, O, MULTI>
where
    S: NodeStore,
    S::Entry: TreeEntry,
    F: WeightFn<S::Entry, Weight = S::Weight>,
    O: KeyOrder<KeyOf<S>>,
{
    pub(crate) fn new(tree: &'a mut Tree<S, F, O, MULTI>, node: S::Handle) -> Self {
        Self { tree, node }
    }

    /// True at the past-the-end position.
    #[inline]
    pub fn is_end(&self) -> bool {
        self.node == self.tree.nil()
    }

    /// The entry at this position, `None` at end.
    pub fn entry(&self) -> Option<&S::Entry> {
        if self.is_end() {
            None
        } else {
            Some(self.tree.store().entry(self.node))
        }
    }

    /// The key at this position, `None` at end.
    pub fn key(&self) -> Option<&KeyOf<S>> {
        self.entry().map(TreeEntry::key)
    }

    /// Advance to the in-order successor; at end this stays at end.
    pub fn move_next(&mut self) {
        self.node = self.tree.next_node(self.node);
    }

    /// Step to the in-order predecessor; from end this lands on the last
    /// entry.
    pub fn move_prev(&mut self) {
        self.node = self.tree.prev_node(self.node);
    }

    /// Componentwise sum of the weights of every entry before this
    /// position; at end this is the total sum.
    pub fn sums_before(&self) -> Result<SumBuf<S::Weight>, TreeError> {
        self.tree.sums_before_node(self.node)
    }

    /// Scalar form of [`CursorMut::sums_before`] for arity-1 weights.
    pub fn sum_before(&self) -> Result<S::Weight, TreeError>
    where
        F: ScalarArity,
    {
        Ok(self.sums_before()?[0])
    }

    /// Remove the entry at this position and advance to its in-order
    /// successor. Fails with `InvalidHandle` at end.
    pub fn remove(&mut self) -> Result<S::Entry, TreeError> {
        let (succ, entry) = self.tree.erase_node(self.node)?;
        self.node = succ;
        Ok(entry)
    }

    /// Insert an entry using this position as the hint, then reposition the
    /// cursor on the affected node. Returns whether a new entry was
    /// inserted (unique trees report an existing equal key as `false`).
    pub fn insert(&mut self, entry: S::Entry) -> Result<bool, TreeError> {
        let (node, inserted) = self.tree.insert_entry_hint(self.node, entry)?;
        self.node = node;
        Ok(inserted)
    }

    /// Overwrite the mapped value at this position, re-propagating subtree
    /// sums. Fails with `InvalidHandle` at end.
    pub fn set_value(&mut self, v: <S::Entry as MappedEntry>::Value) -> Result<(), TreeError>
    where
        S::Entry: MappedEntry,
    {
        self.tree.update_value_at(self.node, v)
    }
}

/// In-order iterator over entries, optionally bounded by an end position.
pub struct Iter<'a, S, F, O, const MULTI: bool>
where
    S: NodeStore,
{
    tree: &'a Tree<S, F, O, MULTI>,
    node: S::Handle,
    until: S::Handle,
}

impl<'a, S, F, O, const MULTI: bool> Iter<'a, S, F, O, MULTI>
where
    S: NodeStore,
    S::Entry: TreeEntry,
    F: WeightFn<S::Entry, Weight = S::Weight>,
    O: KeyOrder<KeyOf<S>>,
{
    pub(crate) fn new(
        tree: &'a Tree<S, F, O, MULTI>,
        node: S::Handle,
        until: S::Handle,
    ) -> Self {
        Self { tree, node, until }
    }
}

impl<'a, S, F, O, const MULTI: bool> Iterator for Iter<'a, S, F, O, MULTI>
where
    S: NodeStore,
    S::Entry: TreeEntry,
    F: WeightFn<S::Entry, Weight = S::Weight>,
    O: KeyOrder<KeyOf<S>>,
{
    type Item = &'a S::Entry;

    fn next(&mut self) -> Option<&'a S::Entry> {
        if self.node == self.until || self.node == self.tree.nil() {
            return None;
        }
        let item = self.tree.store().entry(self.node);
        self.node = self.tree.next_node(self.node);
        Some(item)
    }
}

impl<S, F, O, const MULTI: bool> Tree<S, F, O, MULTI>
where
    S: NodeStore,
    S::Entry: TreeEntry,
    F: WeightFn<S::Entry, Weight = S::Weight>,
    O: KeyOrder<KeyOf<S>>,
{
    /// Iterate over all entries in key order.
    pub fn iter(&self) -> Iter<'_, S, F, O, MULTI> {
        Iter::new(self, self.first_node(), self.nil())
    }

    /// Iterate over the run of entries with key equal to `k`.
    pub fn equal_range(&self, k: &KeyOf<S>) -> Iter<'_, S, F, O, MULTI> {
        Iter::new(self, self.lower_bound_node(k), self.upper_bound_node(k))
    }

    /// Cursor at the first entry (end for an empty tree).
    pub fn first(&self) -> Cursor<'_, S, F, O, MULTI> {
        Cursor::new(self, self.first_node())
    }

    /// Cursor at the last entry (end for an empty tree).
    pub fn last(&self) -> Cursor<'_, S, F, O, MULTI> {
        Cursor::new(self, self.last_node())
    }

    /// Cursor at the past-the-end position.
    pub fn end(&self) -> Cursor<'_, S, F, O, MULTI> {
        Cursor::new(self, self.nil())
    }

    /// Cursor at any entry with key equal to `k`, end if absent.
    pub fn find(&self, k: &KeyOf<S>) -> Cursor<'_, S, F, O, MULTI> {
        Cursor::new(self, self.find_node(k))
    }

    /// Cursor at the first entry with key ≥ `k`, end if none.
    pub fn lower_bound(&self, k: &KeyOf<S>) -> Cursor<'_, S, F, O, MULTI> {
        Cursor::new(self, self.lower_bound_node(k))
    }

    /// Cursor at the first entry with key > `k`, end if none.
    pub fn upper_bound(&self, k: &KeyOf<S>) -> Cursor<'_, S, F, O, MULTI> {
        Cursor::new(self, self.upper_bound_node(k))
    }

    /// Exclusive cursor at any entry with key equal to `k`, end if absent.
    pub fn find_mut(&mut self, k: &KeyOf<S>) -> CursorMut<'_, S, F, O, MULTI> {
        let n = self.find_node(k);
        CursorMut::new(self, n)
    }

    /// Exclusive cursor at the first entry with key ≥ `k`, end if none.
    pub fn lower_bound_mut(&mut self, k: &KeyOf<S>) -> CursorMut<'_, S, F, O, MULTI> {
        let n = self.lower_bound_node(k);
        CursorMut::new(self, n)
    }

    /// Exclusive cursor at the first entry with key > `k`, end if none.
    pub fn upper_bound_mut(&mut self, k: &KeyOf<S>) -> CursorMut<'_, S, F, O, MULTI> {
        let n = self.upper_bound_node(k);
        CursorMut::new(self, n)
    }

    /// Exclusive cursor at the past-the-end position (useful as an append
    /// hint).
    pub fn end_mut(&mut self) -> CursorMut<'_, S, F, O, MULTI> {
        let n = self.nil();
        CursorMut::new(self, n)
    }
}
