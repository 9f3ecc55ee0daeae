//! # sumtree
//!
//! Ordered sets, multisets, maps and multimaps whose nodes carry the running
//! sum of a caller-supplied weight function, so that for any key `k` the
//! partial sum of `w` over all entries with key < `k` is an O(log n) query.
//! The classical order-statistic tree (rank queries) is the special case
//! `w ≡ 1`.
//!
//! ## Features
//!
//! - **Weighted prefix sums**: `w` may return one scalar or a fixed-length
//!   vector of scalars, e.g. to evaluate the same statistic under several
//!   parameters in a single pass.
//! - **Two storage back ends**: one heap record per node with stable
//!   addresses, or a compact arena with integer handles and the color bit
//!   packed into the parent index (three indices + entry per node).
//! - **Checked arithmetic**: integer weight overflow is detected on every
//!   sum update and surfaced as an error instead of wrapping.
//! - **Self-audit**: every container can verify its own structural and sum
//!   invariants, which the test suite leans on heavily.
//!
//! ## Example
//!
//! ```rust
//! use sumtree::RankMultiSetC;
//!
//! let mut set: RankMultiSetC<u32> = RankMultiSetC::new();
//! for key in [1, 2, 1000, 1234] {
//!     set.insert(key).unwrap();
//! }
//! // Two keys sort before 1000.
//! assert_eq!(set.sum_before(&1000).unwrap(), 2);
//! assert_eq!(set.total_sum(), 4);
//! ```
//!
//! Containers are single-threaded: there is no internal synchronization, and
//! concurrent mutation requires external locking.

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod entry;
pub mod error;
pub mod map;
pub mod order;
pub mod set;
pub mod store;
pub mod tree;
pub mod vec;
pub mod weight;

pub use entry::{PairEntry, SetEntry};
pub use error::TreeError;
pub use map::{
    Map, MapBase, MapC, MultiMap, MultiMapC, RankMap, RankMapC, RankMultiMap, StackedMapC,
};
pub use order::{KeyOrder, NaturalOrder, OrderBy};
pub use set::{
    MultiSet, MultiSetC, RankMultiSet, RankMultiSetC, RankSet, RankSetC, Set, SetBase, SetC,
    StackedMultiSetC, StackedSetC,
};
pub use weight::{ParamWeight, ScalarWeight, SumBuf, UnitWeight, WeightFn, WeightScalar};

#[cfg(test)]
mod proptests;
