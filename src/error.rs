//! Typed error taxonomy for the jump-aggregator core.
//!
//! `Configuration` and `Invariant` are fatal: a trajectory that hits
//! either should abort, never retry. `Exhaustion` is the one
//! recoverable variant (see [`crate::priority_time_table`]) and is
//! handled locally by calling `rebuild`.

use thiserror::Error;

/// Everything that can go wrong while building or stepping a jump problem.
#[derive(Debug, Error)]
pub enum JumpError {
    /// Structural misconfiguration: missing dependency graph for a system
    /// that needs one, a dependency graph with the wrong node count, or
    /// `lrate > urate` on construction.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A negative priority was inserted into a priority table.
    #[error("domain error: {0}")]
    Domain(String),

    /// The priority-time-table window has been exhausted; call `rebuild`.
    #[error("priority-time-table window exhausted, rebuild required")]
    Exhaustion,

    /// A bracket or rate-envelope invariant was violated at runtime.
    /// Per spec this "should be statistically impossible" given the
    /// bracket refresh policy; seeing it means the policy's assumptions
    /// were violated (e.g. a user rate closure that is not actually
    /// bounded by its own urate/lrate).
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// A user-supplied closure (`rate`, `affect!`, ...) itself failed.
    #[error("user callback error: {0}")]
    UserCallback(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, JumpError>;
