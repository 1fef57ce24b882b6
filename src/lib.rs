//! Jump aggregators for continuous-time Markov jump process (Gillespie
//! / stochastic simulation algorithm) trajectories.
//!
//! The crate is organized around a handful of small, composable pieces
//! rather than one big simulator object:
//!
//! - [`rate`] — the jump catalog: mass-action jumps (stoichiometry in,
//!   falling-factorial propensity out) and general jumps (arbitrary
//!   `rate`/`urate`/`lrate`/`affect!` closures, for time-varying rates
//!   an exact propensity can't capture).
//! - [`bracket`] — conservative `[lo, hi]` count envelopes, refreshed
//!   only when a true count escapes them.
//! - [`priority_table`] and [`priority_time_table`] — the two
//!   dynamic-range-tolerant sampling structures the rejection-based
//!   aggregators build on.
//! - [`dep_graph`] — which jumps need re-evaluating after which other
//!   jump fires.
//! - [`heap`] — the indexed min-heap Coevolve's Next-Reaction-style
//!   scheduling needs.
//! - [`aggregator`] — the four concrete schedulers (`direct`,
//!   `coevolve`, `rssacr`, `rssacr_direct`) behind one shared trait.
//! - [`integrator`] and [`stepper`] — the mutable record aggregators
//!   read/write through, and the loop that drives it.
//! - [`problem`] — bundles a jump catalog, initial state, and
//!   configuration into the one record a [`stepper::Stepper`] needs.
//!
//! `rand`/`rand_distr` are re-exported so callers wiring up a
//! `GeneralJump`'s closures don't need to pin compatible versions
//! themselves.

pub mod aggregator;
pub mod bracket;
pub mod config;
pub mod dep_graph;
pub mod error;
pub mod heap;
pub mod integrator;
pub mod priority_table;
pub mod priority_time_table;
pub mod problem;
pub mod rate;
pub mod state;
pub mod stepper;

pub use rand;
pub use rand_distr;

pub use error::{JumpError, Result};
