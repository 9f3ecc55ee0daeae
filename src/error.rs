//! Error type shared by every fallible container operation.

use thiserror::Error;

/// Errors surfaced by tree, store and façade operations.
///
/// Unless a variant says otherwise, the container is left unchanged when an
/// error is returned. The one exception is [`TreeError::Arithmetic`]: a weight
/// overflow is detected mid-propagation, after some ancestor sums have already
/// been written, so the container must be treated as unusable (destroy and
/// rebuild). Keeping the hot path free of rollback bookkeeping is deliberate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TreeError {
    /// The host allocator refused an allocation. The tree is unchanged.
    #[error("allocation failed")]
    OutOfMemory,

    /// Adding or subtracting weights overflowed the weight type.
    /// The tree may be left with inconsistent subtree sums.
    #[error("weight arithmetic overflowed; container state is undefined")]
    Arithmetic,

    /// A sentinel or end cursor was passed where a live node was required.
    #[error("operation requires a live entry")]
    InvalidHandle,

    /// Map lookup (`at`, `update_value`) for a key that is not present.
    #[error("key not present")]
    KeyAbsent,

    /// Positional access beyond the container size.
    #[error("index out of range")]
    OutOfRange,

    /// `check` found a structural or sum inconsistency. Diagnostic only;
    /// the tree is not modified by checking.
    #[error("invariant violated: {reason}")]
    InvariantViolated {
        /// Which invariant failed.
        reason: &'static str,
    },

    /// The compact store ran out of index space for new nodes.
    #[error("node index space exhausted")]
    Capacity,
}
