//! Node storage strategies behind the tree.
//!
//! The tree manipulates nodes exclusively through the [`NodeStore`]
//! capability trait: opaque copyable handles, two permanent sentinels, field
//! accessors, and per-node subtree-sum slots. [`BoxStore`] allocates one
//! record per node and hands out stable pointers; [`CompactStore`] packs
//! nodes into a growable vector and hands out integer indices with the color
//! bit folded into the parent link.

mod boxed;
mod compact;

pub use boxed::{BoxStore, NodePtr};
pub use compact::{CompactNode, CompactStore, TreeIndex};

use crate::error::TreeError;
use crate::weight::WeightScalar;
use std::fmt::Debug;

/// Allocation and node-field access capability required by the tree.
///
/// Two sentinels always exist: `head`, whose right child is the real root,
/// and `nil`, a single black node standing in for every external link. The
/// tree initializes the sentinels' links itself and never asks for a
/// sentinel's entry; `entry`/`entry_mut`/`free_node` must only be called
/// with handles of live interior nodes.
pub trait NodeStore {
    /// Stored entry type (key, or key/value pair).
    type Entry;
    /// Weight scalar type of the subtree sums.
    type Weight: WeightScalar;
    /// Opaque copyable node reference.
    type Handle: Copy + Eq + Debug;

    /// A store holding only the two sentinels, with `arity` sum components
    /// per node. Panics if the initial allocation fails.
    fn with_arity(arity: usize) -> Self;

    /// Number of sum components per node.
    fn arity(&self) -> usize;

    /// The header sentinel ("root parent").
    fn head(&self) -> Self::Handle;

    /// The shared external sentinel.
    fn nil(&self) -> Self::Handle;

    /// Allocate a fresh node carrying `entry`, links set to sentinels and
    /// color black. Fails with `OutOfMemory` or (compact) `Capacity`; the
    /// store is unchanged on failure.
    fn try_new_node(&mut self, entry: Self::Entry) -> Result<Self::Handle, TreeError>;

    /// Release a node, returning its entry. The caller must have unlinked
    /// it from the tree.
    fn free_node(&mut self, h: Self::Handle) -> Self::Entry;

    /// Release every interior node, keeping the sentinels usable. Link
    /// fields of the sentinels are left for the tree to reinitialize.
    fn reset(&mut self);

    /// Entry stored in a live interior node.
    fn entry(&self, h: Self::Handle) -> &Self::Entry;

    /// Exclusive access to a live interior node's entry.
    fn entry_mut(&mut self, h: Self::Handle) -> &mut Self::Entry;

    /// Parent link.
    fn parent(&self, h: Self::Handle) -> Self::Handle;
    /// Left child link.
    fn left(&self, h: Self::Handle) -> Self::Handle;
    /// Right child link.
    fn right(&self, h: Self::Handle) -> Self::Handle;
    /// Set the parent link (color preserved).
    fn set_parent(&mut self, h: Self::Handle, p: Self::Handle);
    /// Set the left child link.
    fn set_left(&mut self, h: Self::Handle, l: Self::Handle);
    /// Set the right child link.
    fn set_right(&mut self, h: Self::Handle, r: Self::Handle);

    /// Color test.
    fn is_red(&self, h: Self::Handle) -> bool;
    /// Color the node red.
    fn set_red(&mut self, h: Self::Handle);
    /// Color the node black.
    fn set_black(&mut self, h: Self::Handle);

    /// Copy the node's stored subtree sum into `out` (`out.len() == arity`).
    fn sum(&self, h: Self::Handle, out: &mut [Self::Weight]);
    /// Overwrite the node's stored subtree sum.
    fn set_sum(&mut self, h: Self::Handle, s: &[Self::Weight]);

    /// Audit store-internal bookkeeping (free lists etc.). Diagnostic only.
    fn check_store(&self) -> Result<(), TreeError> {
        Ok(())
    }
}
