//! Red-black tree with subtree-sum augmentation.
//!
//! Every node stores the componentwise sum of the weight function over its
//! subtree. Insertion, deletion, rotations and value updates all maintain
//! that invariant, which is what makes the prefix-sum queries O(log n): a
//! query walks one root-to-node path and only ever adds whole-subtree sums.
//!
//! The tree is generic over the node store (pointer-style or compact), the
//! weight function, the key order, and the uniqueness policy. `MULTI = false`
//! rejects duplicate keys; `MULTI = true` admits them and always inserts a
//! new duplicate after the existing run, so insertion order is preserved
//! among equal keys.

mod check;
mod cursor;

pub use cursor::{Cursor, CursorMut, Iter};

use crate::entry::{MappedEntry, TreeEntry};
use crate::error::TreeError;
use crate::order::KeyOrder;
use crate::store::NodeStore;
use crate::weight::{add_assign, sub_assign, zeroed, SumBuf, WeightFn};

/// Key type of a store's entry.
pub(crate) type KeyOf<S> = <<S as NodeStore>::Entry as TreeEntry>::Key;

/// Where an insert descent ended up.
enum InsertPos<H> {
    /// Attach as the left/right child of `parent`.
    At { parent: H, left: bool },
    /// Unique tree: a node with an equal key already exists.
    Existing(H),
}

/// Augmented red-black tree. See the module docs; the public containers in
/// [`crate::set`] and [`crate::map`] wrap this type.
///
/// Two sentinels frame the structure: a header whose right child is the real
/// root, and a single black `nil` standing in for every external link.
pub struct Tree<S, F, O, const MULTI: bool> {
    store: S,
    weight: F,
    order: O,
    len: usize,
}

impl<S, F, O, const MULTI: bool> Tree<S, F, O, MULTI>
where
    S: NodeStore,
    S::Entry: TreeEntry,
    F: WeightFn<S::Entry, Weight = S::Weight>,
    O: KeyOrder<KeyOf<S>>,
{
    /// An empty tree using `weight` and `order`.
    ///
    /// The weight arity is sampled here and fixed for the tree's lifetime.
    pub fn new(weight: F, order: O) -> Self {
        assert!(weight.arity() >= 1, "weight arity must be at least 1");
        let store = S::with_arity(weight.arity());
        let mut tree = Self {
            store,
            weight,
            order,
            len: 0,
        };
        tree.init_sentinels();
        tree
    }

    fn init_sentinels(&mut self) {
        let head = self.store.head();
        let nil = self.store.nil();
        self.store.set_parent(head, nil);
        self.store.set_left(head, nil);
        self.store.set_right(head, nil);
        self.store.set_black(head);
        self.store.set_parent(nil, nil);
        self.store.set_left(nil, nil);
        self.store.set_right(nil, nil);
        self.store.set_black(nil);
    }

    /// Number of stored entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no entries are stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of weight components per entry.
    #[inline]
    pub fn arity(&self) -> usize {
        self.store.arity()
    }

    /// The weight function.
    #[inline]
    pub fn weight_fn(&self) -> &F {
        &self.weight
    }

    #[inline]
    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    #[inline]
    pub(crate) fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    #[inline]
    pub(crate) fn nil(&self) -> S::Handle {
        self.store.nil()
    }

    #[inline]
    fn head(&self) -> S::Handle {
        self.store.head()
    }

    /// The real root, or nil for an empty tree.
    #[inline]
    fn root(&self) -> S::Handle {
        self.store.right(self.store.head())
    }

    #[inline]
    pub(crate) fn key(&self, h: S::Handle) -> &KeyOf<S> {
        self.store.entry(h).key()
    }

    #[inline]
    fn less(&self, a: &KeyOf<S>, b: &KeyOf<S>) -> bool {
        self.order.less(a, b)
    }

    /// Strict-weak equality against a stored node's key.
    pub(crate) fn key_equal(&self, h: S::Handle, k: &KeyOf<S>) -> bool {
        let kh = self.key(h);
        !self.less(kh, k) && !self.less(k, kh)
    }

    // ----- navigation -------------------------------------------------

    /// Smallest node, or nil.
    pub(crate) fn first_node(&self) -> S::Handle {
        let nil = self.nil();
        let mut n = self.root();
        if n == nil {
            return nil;
        }
        while self.store.left(n) != nil {
            n = self.store.left(n);
        }
        n
    }

    /// Largest node, or nil.
    pub(crate) fn last_node(&self) -> S::Handle {
        let nil = self.nil();
        let mut n = self.root();
        if n == nil {
            return nil;
        }
        while self.store.right(n) != nil {
            n = self.store.right(n);
        }
        n
    }

    /// In-order successor; `next(nil) = nil`.
    pub(crate) fn next_node(&self, mut n: S::Handle) -> S::Handle {
        let nil = self.nil();
        if n == nil {
            return nil;
        }
        if self.store.right(n) != nil {
            n = self.store.right(n);
            while self.store.left(n) != nil {
                n = self.store.left(n);
            }
            return n;
        }
        let head = self.head();
        loop {
            let p = self.store.parent(n);
            if p == head {
                return nil;
            }
            if self.store.left(p) == n {
                return p;
            }
            n = p;
        }
    }

    /// In-order predecessor; `prev(nil) = last`, so an end position can step
    /// backwards.
    pub(crate) fn prev_node(&self, mut n: S::Handle) -> S::Handle {
        let nil = self.nil();
        if n == nil {
            return self.last_node();
        }
        if self.store.left(n) != nil {
            n = self.store.left(n);
            while self.store.right(n) != nil {
                n = self.store.right(n);
            }
            return n;
        }
        let head = self.head();
        loop {
            let p = self.store.parent(n);
            if p == head {
                return nil;
            }
            if self.store.right(p) == n {
                return p;
            }
            n = p;
        }
    }

    // ----- search -----------------------------------------------------

    /// Any node with an equal key, or nil.
    pub(crate) fn find_node(&self, k: &KeyOf<S>) -> S::Handle {
        let nil = self.nil();
        let mut n = self.root();
        while n != nil {
            let kn = self.key(n);
            if self.less(k, kn) {
                n = self.store.left(n);
            } else if self.less(kn, k) {
                n = self.store.right(n);
            } else {
                return n;
            }
        }
        nil
    }

    /// First node with key ≥ `k`, or nil.
    pub(crate) fn lower_bound_node(&self, k: &KeyOf<S>) -> S::Handle {
        let nil = self.nil();
        let mut best = nil;
        let mut n = self.root();
        while n != nil {
            if self.less(self.key(n), k) {
                n = self.store.right(n);
            } else {
                best = n;
                n = self.store.left(n);
            }
        }
        best
    }

    /// First node with key > `k`, or nil.
    pub(crate) fn upper_bound_node(&self, k: &KeyOf<S>) -> S::Handle {
        let nil = self.nil();
        let mut best = nil;
        let mut n = self.root();
        while n != nil {
            if self.less(k, self.key(n)) {
                best = n;
                n = self.store.left(n);
            } else {
                n = self.store.right(n);
            }
        }
        best
    }

    // ----- sums -------------------------------------------------------

    /// Recompute a single node's stored sum from its own weight plus its
    /// children's stored sums.
    fn update_sum(&mut self, h: S::Handle) -> Result<(), TreeError> {
        let d = self.store.arity();
        let nil = self.nil();
        let mut sum = zeroed::<S::Weight>(d);
        self.weight.eval(self.store.entry(h), &mut sum);
        let mut tmp = zeroed::<S::Weight>(d);
        let l = self.store.left(h);
        if l != nil {
            self.store.sum(l, &mut tmp);
            add_assign(&mut sum, &tmp)?;
        }
        let r = self.store.right(h);
        if r != nil {
            self.store.sum(r, &mut tmp);
            add_assign(&mut sum, &tmp)?;
        }
        self.store.set_sum(h, &sum);
        Ok(())
    }

    /// Recompute stored sums from `h` up to and including the real root.
    fn update_sum_to_root(&mut self, mut h: S::Handle) -> Result<(), TreeError> {
        let head = self.head();
        while h != head {
            self.update_sum(h)?;
            h = self.store.parent(h);
        }
        Ok(())
    }

    /// Total sum over all entries (zeroes for an empty tree).
    pub fn total_sums(&self) -> SumBuf<S::Weight> {
        let mut res = zeroed(self.store.arity());
        let r = self.root();
        if r != self.nil() {
            self.store.sum(r, &mut res);
        }
        res
    }

    /// Componentwise sum of the weights of all entries with key strictly
    /// less than `k`, written into `out` (`out.len()` must equal the arity).
    pub fn sums_before_into(&self, k: &KeyOf<S>, out: &mut [S::Weight]) -> Result<(), TreeError> {
        assert_eq!(out.len(), self.store.arity(), "output buffer arity mismatch");
        out.fill(Default::default());
        let nil = self.nil();
        let mut n = self.root();
        if n == nil {
            return Ok(());
        }
        let mut tmp = zeroed::<S::Weight>(self.store.arity());
        loop {
            if self.less(self.key(n), k) {
                // Everything under the left child and this node precede k.
                let l = self.store.left(n);
                if l != nil {
                    self.store.sum(l, &mut tmp);
                    add_assign(out, &tmp)?;
                }
                self.weight.eval(self.store.entry(n), &mut tmp);
                add_assign(out, &tmp)?;
                n = self.store.right(n);
            } else {
                n = self.store.left(n);
            }
            if n == nil {
                return Ok(());
            }
        }
    }

    /// Buffer-returning form of [`Tree::sums_before_into`].
    pub fn sums_before(&self, k: &KeyOf<S>) -> Result<SumBuf<S::Weight>, TreeError> {
        let mut out = zeroed(self.store.arity());
        self.sums_before_into(k, &mut out)?;
        Ok(out)
    }

    /// Sum of the weights of all entries that precede `x` in order. Nil
    /// (the end position) yields the total sum.
    pub(crate) fn sums_before_node(&self, x: S::Handle) -> Result<SumBuf<S::Weight>, TreeError> {
        let nil = self.nil();
        if x == nil {
            return Ok(self.total_sums());
        }
        if x == self.head() {
            return Err(TreeError::InvalidHandle);
        }
        let d = self.store.arity();
        let mut res = zeroed::<S::Weight>(d);
        let mut tmp = zeroed::<S::Weight>(d);
        // Start with everything under x's left child, then ascend: whenever
        // the current node is a right child, its parent and the parent's
        // left subtree precede it.
        let l = self.store.left(x);
        if l != nil {
            self.store.sum(l, &mut tmp);
            add_assign(&mut res, &tmp)?;
        }
        let head = self.head();
        let mut x = x;
        let mut p = self.store.parent(x);
        while p != head {
            if x == self.store.right(p) {
                let l = self.store.left(p);
                if l != nil {
                    self.store.sum(l, &mut tmp);
                    add_assign(&mut res, &tmp)?;
                }
                self.weight.eval(self.store.entry(p), &mut tmp);
                add_assign(&mut res, &tmp)?;
            }
            x = p;
            p = self.store.parent(x);
        }
        Ok(res)
    }

    // ----- rotations --------------------------------------------------

    /// Left rotation at `x`: x's right child y takes x's place, x becomes
    /// y's left child, y's old left subtree becomes x's right subtree.
    /// Re-derives the sums of exactly x then y; all other ancestors keep
    /// the same subtree contents.
    fn rotate_left(&mut self, x: S::Handle) -> Result<(), TreeError> {
        let nil = self.nil();
        let y = self.store.right(x);
        let yl = self.store.left(y);
        self.store.set_right(x, yl);
        if yl != nil {
            self.store.set_parent(yl, x);
        }
        let xp = self.store.parent(x);
        self.store.set_parent(y, xp);
        if self.store.right(xp) == x {
            self.store.set_right(xp, y);
        } else {
            self.store.set_left(xp, y);
        }
        self.store.set_left(y, x);
        self.store.set_parent(x, y);
        self.update_sum(x)?;
        self.update_sum(y)
    }

    /// Mirror of [`Tree::rotate_left`].
    fn rotate_right(&mut self, x: S::Handle) -> Result<(), TreeError> {
        let nil = self.nil();
        let y = self.store.left(x);
        let yr = self.store.right(y);
        self.store.set_left(x, yr);
        if yr != nil {
            self.store.set_parent(yr, x);
        }
        let xp = self.store.parent(x);
        self.store.set_parent(y, xp);
        if self.store.right(xp) == x {
            self.store.set_right(xp, y);
        } else {
            self.store.set_left(xp, y);
        }
        self.store.set_right(y, x);
        self.store.set_parent(x, y);
        self.update_sum(x)?;
        self.update_sum(y)
    }

    /// Rotate `n` into its parent's position.
    fn rotate_up(&mut self, n: S::Handle) -> Result<(), TreeError> {
        let p = self.store.parent(n);
        if self.store.left(p) == n {
            self.rotate_right(p)
        } else {
            self.rotate_left(p)
        }
    }

    #[inline]
    fn sibling(&self, n: S::Handle) -> S::Handle {
        let p = self.store.parent(n);
        if self.store.left(p) == n {
            self.store.right(p)
        } else {
            self.store.left(p)
        }
    }

    #[inline]
    fn is_left_child(&self, n: S::Handle) -> bool {
        self.store.left(self.store.parent(n)) == n
    }

    // ----- insertion --------------------------------------------------

    /// Descend to the attach point for `k`. Multi trees go right on equal
    /// keys so duplicates land after the existing run.
    fn locate_insert(&self, k: &KeyOf<S>) -> InsertPos<S::Handle> {
        let nil = self.nil();
        let mut n = self.root();
        if n == nil {
            return InsertPos::At {
                parent: self.head(),
                left: false,
            };
        }
        loop {
            let kn = self.key(n);
            if self.less(k, kn) {
                let l = self.store.left(n);
                if l == nil {
                    return InsertPos::At { parent: n, left: true };
                }
                n = l;
            } else {
                if !MULTI && !self.less(kn, k) {
                    return InsertPos::Existing(n);
                }
                let r = self.store.right(n);
                if r == nil {
                    return InsertPos::At {
                        parent: n,
                        left: false,
                    };
                }
                n = r;
            }
        }
    }

    /// Hinted variant of [`Tree::locate_insert`].
    ///
    /// Unique trees honor the hint only when the insertion point falls
    /// immediately before `hint` and immediately after its predecessor;
    /// otherwise the hint is ignored and a full descent runs. Multi trees
    /// insert immediately before an equal-keyed hint; a bad hint degrades
    /// to a `lower_bound` attach (or the last node when the key exceeds
    /// everything).
    fn locate_insert_hint(&self, hint: S::Handle, k: &KeyOf<S>) -> InsertPos<S::Handle> {
        let nil = self.nil();
        if hint == nil {
            // End hint: valid when k belongs after the last entry.
            let last = self.last_node();
            if last == nil {
                return self.locate_insert(k);
            }
            if self.less(self.key(last), k) || (MULTI && !self.less(k, self.key(last))) {
                return InsertPos::At {
                    parent: last,
                    left: false,
                };
            }
            return self.locate_insert(k);
        }
        if self.less(k, self.key(hint)) {
            let p = self.prev_node(hint);
            if p == nil {
                // Hint is the first node, so it has no left child.
                return InsertPos::At {
                    parent: hint,
                    left: true,
                };
            }
            if self.less(self.key(p), k) {
                // prev < k < hint: the hint is exact. One of the two slots
                // between them is free.
                if self.store.left(hint) == nil {
                    return InsertPos::At {
                        parent: hint,
                        left: true,
                    };
                }
                debug_assert!(self.store.right(p) == nil, "no slot between hint and prev");
                return InsertPos::At {
                    parent: p,
                    left: false,
                };
            }
            if !self.less(k, self.key(p)) {
                // k equals the predecessor's key.
                if !MULTI {
                    return InsertPos::Existing(p);
                }
                // After the equal run, before hint: same two slots as above.
                if self.store.left(hint) == nil {
                    return InsertPos::At {
                        parent: hint,
                        left: true,
                    };
                }
                return InsertPos::At {
                    parent: p,
                    left: false,
                };
            }
            return self.locate_insert(k);
        }
        if !self.less(self.key(hint), k) {
            // k equals the hint's key.
            if !MULTI {
                return InsertPos::Existing(hint);
            }
            if self.store.left(hint) == nil {
                return InsertPos::At {
                    parent: hint,
                    left: true,
                };
            }
            let p = self.prev_node(hint);
            debug_assert!(self.store.right(p) == nil, "no slot before hint");
            return InsertPos::At {
                parent: p,
                left: false,
            };
        }
        // k sorts after the hint.
        if !MULTI {
            return self.locate_insert(k);
        }
        let n = self.lower_bound_node(k);
        if n == nil {
            return InsertPos::At {
                parent: self.last_node(),
                left: false,
            };
        }
        if self.store.left(n) == nil {
            InsertPos::At { parent: n, left: true }
        } else {
            InsertPos::At {
                parent: self.prev_node(n),
                left: false,
            }
        }
    }

    /// Link the fresh node `n1` under `parent`, seed its sum with its own
    /// weight, bump every ancestor's sum, then run red-black fixup.
    fn link_new(
        &mut self,
        parent: S::Handle,
        n1: S::Handle,
        insert_left: bool,
    ) -> Result<(), TreeError> {
        let nil = self.nil();
        let head = self.head();
        if insert_left {
            self.store.set_left(parent, n1);
        } else {
            self.store.set_right(parent, n1);
        }
        self.store.set_parent(n1, parent);
        self.store.set_left(n1, nil);
        self.store.set_right(n1, nil);
        self.store.set_red(n1);

        let d = self.store.arity();
        let mut w = zeroed::<S::Weight>(d);
        self.weight.eval(self.store.entry(n1), &mut w);
        self.store.set_sum(n1, &w);
        let mut a = parent;
        while a != head {
            let mut s = zeroed::<S::Weight>(d);
            self.store.sum(a, &mut s);
            add_assign(&mut s, &w)?;
            self.store.set_sum(a, &s);
            a = self.store.parent(a);
        }

        // Fixup: n is the (possibly red) parent, n1 its red child.
        let mut n = parent;
        let mut n1 = n1;
        loop {
            if n == head {
                // First node of an empty tree.
                return Ok(());
            }
            if !self.store.is_red(n) {
                return Ok(());
            }
            if self.store.parent(n) == head {
                // n is the real root: blacken and done.
                self.store.set_black(n);
                return Ok(());
            }
            let sib = self.sibling(n);
            if self.store.is_red(sib) {
                // Red uncle: push the conflict two levels up.
                self.store.set_black(sib);
                self.store.set_black(n);
                let p = self.store.parent(n);
                self.store.set_red(p);
                n1 = p;
                n = self.store.parent(p);
            } else {
                if self.is_left_child(n1) != self.is_left_child(n) {
                    // Zig-zag: straighten around n first.
                    self.rotate_up(n1)?;
                    std::mem::swap(&mut n, &mut n1);
                }
                self.store.set_black(n);
                let p = self.store.parent(n);
                self.store.set_red(p);
                self.rotate_up(n)?;
                return Ok(());
            }
        }
    }

    /// The root is black; a lone first insert or a recoloring pass can
    /// leave it red.
    fn blacken_root(&mut self) {
        let r = self.root();
        if r != self.nil() {
            self.store.set_black(r);
        }
    }

    /// Insert an entry.
    ///
    /// Unique trees return the existing node and `false` on a key
    /// collision; multi trees always insert, after any equal keys. On
    /// `OutOfMemory` the tree is unchanged; on `Arithmetic` it is not.
    pub fn insert_entry(&mut self, entry: S::Entry) -> Result<(S::Handle, bool), TreeError> {
        match self.locate_insert(entry.key()) {
            InsertPos::Existing(h) => Ok((h, false)),
            InsertPos::At { parent, left } => {
                let n1 = self.store.try_new_node(entry)?;
                self.link_new(parent, n1, left)?;
                self.blacken_root();
                self.len += 1;
                Ok((n1, true))
            }
        }
    }

    /// Insert with a position hint (see [`Tree::locate_insert_hint`]).
    pub(crate) fn insert_entry_hint(
        &mut self,
        hint: S::Handle,
        entry: S::Entry,
    ) -> Result<(S::Handle, bool), TreeError> {
        match self.locate_insert_hint(hint, entry.key()) {
            InsertPos::Existing(h) => Ok((h, false)),
            InsertPos::At { parent, left } => {
                let n1 = self.store.try_new_node(entry)?;
                self.link_new(parent, n1, left)?;
                self.blacken_root();
                self.len += 1;
                Ok((n1, true))
            }
        }
    }

    // ----- deletion ---------------------------------------------------

    /// Remove node `n`, returning its in-order successor and the entry.
    ///
    /// When `n` has two children its successor is moved into `n`'s place by
    /// pointer rewiring, never by copying keys, so handles (cursors) to the
    /// successor stay valid.
    pub(crate) fn erase_node(
        &mut self,
        n: S::Handle,
    ) -> Result<(S::Handle, S::Entry), TreeError> {
        let nil = self.nil();
        let head = self.head();
        if n == nil || n == head {
            return Err(TreeError::InvalidHandle);
        }
        let x = self.next_node(n);
        // If n has two children, its successor has at most one; splice the
        // successor out and move it into n's place afterwards.
        let del = if self.store.left(n) != nil && self.store.right(n) != nil {
            x
        } else {
            n
        };

        let mut c = self.store.left(del);
        if c == nil {
            c = self.store.right(del);
        }
        let p = self.store.parent(del);
        if c != nil {
            self.store.set_parent(c, p);
        }
        if self.store.left(p) == del {
            self.store.set_left(p, c);
        } else {
            self.store.set_right(p, c);
        }

        // Subtract the spliced node's own weight along its ancestor chain.
        let d = self.store.arity();
        let mut wdel = zeroed::<S::Weight>(d);
        self.weight.eval(self.store.entry(del), &mut wdel);
        let mut a = p;
        while a != head {
            let mut s = zeroed::<S::Weight>(d);
            self.store.sum(a, &mut s);
            sub_assign(&mut s, &wdel)?;
            self.store.set_sum(a, &s);
            a = self.store.parent(a);
        }

        // Cutting out a black node unbalances black heights. A black root
        // with no child leaves an empty tree; nothing to fix then.
        if !self.store.is_red(del) {
            if c != nil {
                self.store.set_black(c);
            } else if p != head {
                let mut c = c;
                let mut p = p;
                loop {
                    let mut s = self.store.left(p);
                    if s == nil || s == c {
                        s = self.store.right(p);
                    }
                    assert!(s != nil && s != c, "black node without a sibling");

                    if self.store.is_red(s) {
                        // p is black; rotate the red sibling up and retry
                        // with the same p, now red with a black child.
                        self.store.set_red(p);
                        self.store.set_black(s);
                        self.rotate_up(s)?;
                        continue;
                    }
                    let sl = self.store.left(s);
                    let sr = self.store.right(s);
                    if !self.store.is_red(sl) && !self.store.is_red(sr) {
                        // Both of s's children black: recolor and move the
                        // deficit one level up.
                        self.store.set_red(s);
                        if self.store.is_red(p) {
                            self.store.set_black(p);
                            break;
                        }
                        c = p;
                        p = self.store.parent(p);
                        if p == head {
                            break;
                        }
                        continue;
                    }
                    if s == self.store.right(p) && !self.store.is_red(sr) {
                        // Red child on the far side: rotate it over s.
                        self.store.set_red(s);
                        self.store.set_black(sl);
                        self.rotate_right(s)?;
                        continue;
                    }
                    if s == self.store.left(p) && !self.store.is_red(sl) {
                        self.store.set_red(s);
                        self.store.set_black(sr);
                        self.rotate_left(s)?;
                        continue;
                    }
                    // s black with a same-side red child: rotating s into
                    // p's position restores every path.
                    if self.store.is_red(p) {
                        self.store.set_red(s);
                    }
                    self.store.set_black(p);
                    if s == self.store.right(p) {
                        self.store.set_black(sr);
                    } else {
                        self.store.set_black(sl);
                    }
                    self.rotate_up(s)?;
                    break;
                }
            }
        }

        if del != n {
            // Move the (spliced-out) successor into n's position, taking
            // n's links and color.
            let np = self.store.parent(n);
            let nl = self.store.left(n);
            let nr = self.store.right(n);
            self.store.set_left(x, nl);
            self.store.set_right(x, nr);
            self.store.set_parent(x, np);
            if self.store.is_red(n) {
                self.store.set_red(x);
            } else {
                self.store.set_black(x);
            }
            if self.store.left(np) == n {
                self.store.set_left(np, x);
            } else {
                debug_assert!(self.store.right(np) == n, "replaced node not linked");
                self.store.set_right(np, x);
            }
            let xl = self.store.left(x);
            if xl != nil {
                self.store.set_parent(xl, x);
            }
            let xr = self.store.right(x);
            if xr != nil {
                self.store.set_parent(xr, x);
            }
            self.update_sum_to_root(x)?;
        }

        let entry = self.store.free_node(n);
        debug_assert!(self.len > 0, "erase from empty tree");
        self.len -= 1;
        Ok((x, entry))
    }

    /// Erase every entry with key in `[from, to)`, returning how many.
    ///
    /// The stop position is resolved once up front; erasing never moves
    /// other nodes, so it stays valid while the range drains.
    pub fn erase_range(
        &mut self,
        from: &KeyOf<S>,
        to: &KeyOf<S>,
    ) -> Result<usize, TreeError> {
        let nil = self.nil();
        let stop = self.lower_bound_node(to);
        let mut n = self.lower_bound_node(from);
        let mut erased = 0;
        while n != stop && n != nil {
            let (succ, _) = self.erase_node(n)?;
            n = succ;
            erased += 1;
        }
        Ok(erased)
    }

    /// Erase every entry with key equal to `k`, returning how many.
    pub fn erase_key(&mut self, k: &KeyOf<S>) -> Result<usize, TreeError> {
        let nil = self.nil();
        let mut n = self.lower_bound_node(k);
        let mut erased = 0;
        while n != nil && self.key_equal(n, k) {
            let (succ, _) = self.erase_node(n)?;
            n = succ;
            erased += 1;
        }
        Ok(erased)
    }

    // ----- key-level queries -------------------------------------------

    /// Whether any entry has a key equal to `k`.
    pub fn contains(&self, k: &KeyOf<S>) -> bool {
        self.find_node(k) != self.nil()
    }

    /// Number of entries with key equal to `k`.
    pub fn count(&self, k: &KeyOf<S>) -> usize {
        let nil = self.nil();
        let mut n = self.lower_bound_node(k);
        let mut r = 0;
        while n != nil && self.key_equal(n, k) {
            r += 1;
            n = self.next_node(n);
        }
        r
    }

    // ----- value update ------------------------------------------------

    /// Overwrite the mapped value at `h` and re-propagate sums from `h` to
    /// the root (the weight may depend on the value).
    pub(crate) fn update_value_at(
        &mut self,
        h: S::Handle,
        v: <S::Entry as MappedEntry>::Value,
    ) -> Result<(), TreeError>
    where
        S::Entry: MappedEntry,
    {
        if h == self.nil() || h == self.head() {
            return Err(TreeError::InvalidHandle);
        }
        *self.store.entry_mut(h).value_mut() = v;
        self.update_sum_to_root(h)
    }

    // ----- bulk --------------------------------------------------------

    /// Remove every entry. Sentinels survive and the tree is reusable.
    pub fn clear(&mut self) {
        self.store.reset();
        self.init_sentinels();
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::SetEntry;
    use crate::order::NaturalOrder;
    use crate::store::{BoxStore, CompactStore};
    use crate::weight::{ScalarWeight, UnitWeight};

    type RankMulti =
        Tree<BoxStore<SetEntry<u32>, u32>, UnitWeight<u32>, NaturalOrder, true>;
    type RankUnique =
        Tree<CompactStore<SetEntry<u32>, u32, u32>, UnitWeight<u32>, NaturalOrder, false>;

    fn keys<S, F, O, const M: bool>(t: &Tree<S, F, O, M>) -> Vec<u32>
    where
        S: NodeStore<Entry = SetEntry<u32>>,
        F: WeightFn<SetEntry<u32>, Weight = S::Weight>,
        O: KeyOrder<u32>,
    {
        let mut out = Vec::new();
        let mut n = t.first_node();
        while n != t.nil() {
            out.push(*t.key(n));
            n = t.next_node(n);
        }
        out
    }

    #[test]
    fn insert_keeps_order_and_ranks() {
        let mut t = RankMulti::new(UnitWeight::new(), NaturalOrder);
        for k in [1u32, 2, 1000, 1234] {
            t.insert_entry(SetEntry(k)).unwrap();
        }
        assert_eq!(keys(&t), vec![1, 2, 1000, 1234]);
        assert_eq!(t.sums_before(&1000).unwrap()[0], 2);
        assert_eq!(t.total_sums()[0], 4);
        t.check(Some(0.0)).unwrap();
    }

    #[test]
    fn unique_rejects_duplicates() {
        let mut t = RankUnique::new(UnitWeight::new(), NaturalOrder);
        assert!(t.insert_entry(SetEntry(5)).unwrap().1);
        let (h, inserted) = t.insert_entry(SetEntry(5)).unwrap();
        assert!(!inserted);
        assert_eq!(*t.key(h), 5);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn multi_keeps_duplicates_in_insertion_order() {
        let mut t = RankMulti::new(UnitWeight::new(), NaturalOrder);
        for k in [5u32, 5, 5, 3, 7] {
            t.insert_entry(SetEntry(k)).unwrap();
        }
        assert_eq!(t.count(&5), 3);
        let lb = t.lower_bound_node(&5);
        let (succ, _) = t.erase_node(lb).unwrap();
        assert_eq!(*t.key(succ), 5);
        assert_eq!(t.count(&5), 2);
        assert_eq!(keys(&t), vec![3, 5, 5, 7]);
        t.check(Some(0.0)).unwrap();
    }

    #[test]
    fn erase_returns_successor_and_rebalances() {
        let mut t = RankMulti::new(UnitWeight::new(), NaturalOrder);
        for k in 0..64u32 {
            t.insert_entry(SetEntry(k)).unwrap();
        }
        // Erase evens; each call must return the next odd key.
        let mut n = t.first_node();
        while n != t.nil() {
            let k = *t.key(n);
            if k % 2 == 0 {
                let (succ, entry) = t.erase_node(n).unwrap();
                assert_eq!(entry.0, k);
                n = succ;
            } else {
                n = t.next_node(n);
            }
            t.check(Some(0.0)).unwrap();
        }
        assert_eq!(t.len(), 32);
        assert_eq!(keys(&t), (0..64).filter(|k| k % 2 == 1).collect::<Vec<_>>());
    }

    #[test]
    fn erase_inverse_reaches_empty() {
        let mut t = RankUnique::new(UnitWeight::new(), NaturalOrder);
        let ks = [9u32, 4, 13, 1, 6, 11, 16, 0, 2, 5, 8];
        for &k in &ks {
            t.insert_entry(SetEntry(k)).unwrap();
        }
        for &k in ks.iter().rev() {
            assert_eq!(t.erase_key(&k).unwrap(), 1);
            t.check(Some(0.0)).unwrap();
        }
        assert!(t.is_empty());
        assert_eq!(t.total_sums()[0], 0);
    }

    #[test]
    fn rank_matches_in_order_position() {
        let mut t = RankMulti::new(UnitWeight::new(), NaturalOrder);
        for k in [50u32, 20, 80, 10, 30, 70, 90, 30, 50] {
            t.insert_entry(SetEntry(k)).unwrap();
        }
        let mut n = t.first_node();
        let mut i = 0u32;
        while n != t.nil() {
            assert_eq!(t.sums_before_node(n).unwrap()[0], i);
            n = t.next_node(n);
            i += 1;
        }
        assert_eq!(i as usize, t.len());
        // End position yields the total.
        assert_eq!(t.sums_before_node(t.nil()).unwrap()[0], i);
    }

    #[test]
    fn prev_of_nil_is_last() {
        let mut t = RankMulti::new(UnitWeight::new(), NaturalOrder);
        for k in [2u32, 1, 3] {
            t.insert_entry(SetEntry(k)).unwrap();
        }
        let last = t.prev_node(t.nil());
        assert_eq!(*t.key(last), 3);
        assert_eq!(t.next_node(t.nil()), t.nil());
    }

    #[test]
    fn hinted_insert_exact_and_bad_hints() {
        let mut t = RankMulti::new(UnitWeight::new(), NaturalOrder);
        for k in [10u32, 20, 30] {
            t.insert_entry(SetEntry(k)).unwrap();
        }
        // Exact hint: 15 belongs right before 20.
        let h20 = t.find_node(&20);
        let (h15, inserted) = t.insert_entry_hint(h20, SetEntry(15)).unwrap();
        assert!(inserted);
        assert_eq!(*t.key(h15), 15);
        // Bad hint: 25 before 10's node still lands in order.
        let h10 = t.find_node(&10);
        t.insert_entry_hint(h10, SetEntry(25)).unwrap();
        // End hint appends.
        t.insert_entry_hint(t.nil(), SetEntry(99)).unwrap();
        assert_eq!(keys(&t), vec![10, 15, 20, 25, 30, 99]);
        t.check(Some(0.0)).unwrap();
    }

    #[test]
    fn hinted_insert_equal_key_goes_before_hint() {
        let mut t = RankMulti::new(UnitWeight::new(), NaturalOrder);
        for k in [5u32, 5, 9] {
            t.insert_entry(SetEntry(k)).unwrap();
        }
        let first5 = t.lower_bound_node(&5);
        let (h, _) = t.insert_entry_hint(first5, SetEntry(5)).unwrap();
        // The new 5 sits immediately before the old first 5.
        assert_eq!(t.next_node(h), first5);
        t.check(Some(0.0)).unwrap();
    }

    #[test]
    fn overflow_surfaces_arithmetic_error() {
        let mut t: Tree<BoxStore<SetEntry<u32>, u32>, ScalarWeight<fn(&SetEntry<u32>) -> u32>, NaturalOrder, true> =
            Tree::new(ScalarWeight(|e: &SetEntry<u32>| e.0), NaturalOrder);
        t.insert_entry(SetEntry(1 << 31)).unwrap();
        assert_eq!(
            t.insert_entry(SetEntry(1 << 31)).unwrap_err(),
            TreeError::Arithmetic
        );
    }

    #[test]
    fn clear_makes_tree_reusable() {
        let mut t = RankUnique::new(UnitWeight::new(), NaturalOrder);
        for k in 0..100u32 {
            t.insert_entry(SetEntry(k)).unwrap();
        }
        t.clear();
        assert!(t.is_empty());
        assert_eq!(t.total_sums()[0], 0);
        for k in 0..10u32 {
            t.insert_entry(SetEntry(k)).unwrap();
        }
        assert_eq!(t.len(), 10);
        t.check(Some(0.0)).unwrap();
    }

    #[test]
    fn large_random_workload_stays_consistent() {
        // Deterministic pseudo-random mix of inserts and erases.
        let mut t = RankMulti::new(UnitWeight::new(), NaturalOrder);
        let mut state = 0x9e3779b9u32;
        let mut live: Vec<u32> = Vec::new();
        for step in 0..2000 {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            let k = state % 256;
            if state % 3 == 0 && !live.is_empty() {
                let victim = live.swap_remove((state as usize / 7) % live.len());
                assert!(t.erase_key(&victim).unwrap() >= 1);
                // Keep the model in sync: erase_key removes every copy.
                live.retain(|&v| v != victim);
            } else {
                t.insert_entry(SetEntry(k)).unwrap();
                live.push(k);
            }
            if step % 113 == 0 {
                t.check(Some(0.0)).unwrap();
            }
        }
        t.check(Some(0.0)).unwrap();
        assert_eq!(t.len(), live.len());
    }
}
