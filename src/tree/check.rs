//! Structural and sum-consistency verification.

use super::{KeyOf, Tree};
use crate::entry::TreeEntry;
use crate::error::TreeError;
use crate::order::KeyOrder;
use crate::store::NodeStore;
use crate::weight::{add_assign, zeroed, WeightFn, WeightScalar};

fn violated(reason: &'static str) -> TreeError {
    TreeError::InvariantViolated { reason }
}

impl<S, F, O, const MULTI: bool> Tree<S, F, O, MULTI>
where
    S: NodeStore,
    S::Entry: TreeEntry,
    F: WeightFn<S::Entry, Weight = S::Weight>,
    O: KeyOrder<KeyOf<S>>,
{
    /// Verify every container invariant.
    ///
    /// Checks the sentinel wiring, parent/child link consistency, BST key
    /// order (strict for unique trees, left-strict for multi), the
    /// red-black coloring rules, equal black heights on every path, the
    /// store's internal bookkeeping, and that the recorded size matches the
    /// number of reachable nodes.
    ///
    /// With `tolerance = Some(t)` each node's stored subtree sum is also
    /// recomputed and compared componentwise (exactly for integer weights,
    /// within `t` for floats). `None` skips the sum audit.
    ///
    /// Diagnostic only: the tree is never modified.
    pub fn check(&self, tolerance: Option<f64>) -> Result<(), TreeError> {
        self.store().check_store()?;
        let head = self.store().head();
        let nil = self.nil();
        if self.store().left(head) != nil || self.store().parent(head) != nil {
            return Err(violated("header links are not nil"));
        }
        if self.store().is_red(nil) {
            return Err(violated("nil sentinel is red"));
        }
        let root = self.store().right(head);
        if root == nil {
            if self.len() != 0 {
                return Err(violated("empty tree with nonzero size"));
            }
            return Ok(());
        }
        if self.store().parent(root) != head {
            return Err(violated("root parent is not the header"));
        }
        if self.store().is_red(root) {
            return Err(violated("root is red"));
        }
        let mut walk = Walk {
            expected_black: None,
            visited: 0,
        };
        self.check_node(tolerance, root, 0, &mut walk)?;
        if walk.visited != self.len() {
            return Err(violated("recorded size disagrees with node count"));
        }
        Ok(())
    }

    fn check_node(
        &self,
        tolerance: Option<f64>,
        x: S::Handle,
        mut black_count: usize,
        walk: &mut Walk,
    ) -> Result<(), TreeError> {
        let nil = self.nil();
        let l = self.store().left(x);
        let r = self.store().right(x);
        walk.visited += 1;

        if l != nil {
            if self.store().parent(l) != x {
                return Err(violated("left child does not point back to parent"));
            }
            if self.store().is_red(x) && self.store().is_red(l) {
                return Err(violated("red node with red left child"));
            }
            // Left keys must be ≤ x, strictly smaller for unique trees.
            if !self.order.less(self.key(l), self.key(x))
                && (!MULTI || self.order.less(self.key(x), self.key(l)))
            {
                return Err(violated("left subtree key out of order"));
            }
        }
        if r != nil {
            if self.store().parent(r) != x {
                return Err(violated("right child does not point back to parent"));
            }
            if self.store().is_red(x) && self.store().is_red(r) {
                return Err(violated("red node with red right child"));
            }
            if self.order.less(self.key(r), self.key(x)) {
                return Err(violated("right subtree key out of order"));
            }
            if !MULTI && !self.order.less(self.key(x), self.key(r)) {
                return Err(violated("duplicate key in unique tree"));
            }
        }

        if let Some(tol) = tolerance {
            let d = self.store().arity();
            let mut expect = zeroed::<S::Weight>(d);
            self.weight_fn().eval(self.store().entry(x), &mut expect);
            let mut tmp = zeroed::<S::Weight>(d);
            if l != nil {
                self.store().sum(l, &mut tmp);
                add_assign(&mut expect, &tmp)?;
            }
            if r != nil {
                self.store().sum(r, &mut tmp);
                add_assign(&mut expect, &tmp)?;
            }
            self.store().sum(x, &mut tmp);
            for (have, want) in tmp.iter().zip(&expect) {
                if !have.approx_eq(*want, tol) {
                    return Err(violated("stored subtree sum is inconsistent"));
                }
            }
        }

        if !self.store().is_red(x) {
            black_count += 1;
        }
        if l == nil || r == nil {
            // Reached an external position: black counts must agree.
            match walk.expected_black {
                None => walk.expected_black = Some(black_count),
                Some(expected) if expected != black_count => {
                    return Err(violated("black height differs between paths"));
                }
                _ => {}
            }
        }
        if l != nil {
            self.check_node(tolerance, l, black_count, walk)?;
        }
        if r != nil {
            self.check_node(tolerance, r, black_count, walk)?;
        }
        Ok(())
    }
}

struct Walk {
    expected_black: Option<usize>,
    visited: usize,
}
