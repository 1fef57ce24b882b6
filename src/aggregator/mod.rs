//! The shared aggregator interface and a tagged-variant dispatcher over
//! the concrete implementations. Deliberately not an inheritance
//! hierarchy: each variant owns its own tables, and [`JumpAggregator`]
//! just forwards.

pub mod coevolve;
pub mod direct;
pub mod rssacr;
pub mod rssacr_direct;

use rand::rngs::SmallRng;

use crate::error::Result;
use crate::integrator::Integrator;

/// `{initialize, execute_jumps, generate_jumps, next_jump_time,
/// next_jump, end_time, save_positions, rng}`.
pub trait Aggregator<P> {
    /// Builds internal tables and schedules the first jump.
    fn initialize(&mut self, integrator: &mut Integrator<P>) -> Result<()>;

    /// Applies the currently scheduled jump, then refreshes whatever
    /// dependent rates/brackets the affect invalidated.
    fn execute_jumps(&mut self, integrator: &mut Integrator<P>) -> Result<()>;

    /// Publishes the next `(next_jump, next_jump_time)` pair and writes
    /// `integrator.tstop`. Never inserts into `integrator`'s `tstops`.
    fn generate_jumps(&mut self, integrator: &mut Integrator<P>) -> Result<()>;

    fn next_jump_time(&self) -> f64;
    fn next_jump(&self) -> usize;

    /// The end of the aggregator's own scheduling horizon (e.g. `tspan.1`).
    fn end_time(&self) -> f64;

    /// `(save_before_jump, save_after_jump)`, mirroring the usual
    /// discrete-callback convention: most aggregators only need the
    /// post-jump state saved.
    fn save_positions(&self) -> (bool, bool) {
        (false, true)
    }

    fn rng(&mut self) -> &mut SmallRng;
}

/// One arm per aggregator, sharing the `Aggregator<P>` contract. The
/// well-mixed bracketing aggregators (RSSACR, and Coevolve's mass-action
/// jumps) also happen to share bracket/rate-envelope fields, but that's
/// composition inside each variant, not a common base type.
/// `RssacrDirect` carries no `P`: the spatial aggregator's jump
/// catalog (site-local mass-action reactions plus hops) has no
/// parameter-dependent general jumps, unlike the other three variants.
pub enum JumpAggregator<P> {
    Direct(direct::DirectAggregator<P>),
    Coevolve(coevolve::CoevolveAggregator<P>),
    Rssacr(rssacr::RssacrAggregator<P>),
    RssacrDirect(rssacr_direct::RssacrDirectAggregator),
}

macro_rules! forward {
    ($self:ident, $method:ident $(, $arg:expr)*) => {
        match $self {
            JumpAggregator::Direct(a) => a.$method($($arg),*),
            JumpAggregator::Coevolve(a) => a.$method($($arg),*),
            JumpAggregator::Rssacr(a) => a.$method($($arg),*),
            JumpAggregator::RssacrDirect(a) => a.$method($($arg),*),
        }
    };
}

impl<P> Aggregator<P> for JumpAggregator<P> {
    fn initialize(&mut self, integrator: &mut Integrator<P>) -> Result<()> {
        forward!(self, initialize, integrator)
    }

    fn execute_jumps(&mut self, integrator: &mut Integrator<P>) -> Result<()> {
        forward!(self, execute_jumps, integrator)
    }

    fn generate_jumps(&mut self, integrator: &mut Integrator<P>) -> Result<()> {
        forward!(self, generate_jumps, integrator)
    }

    fn next_jump_time(&self) -> f64 {
        forward!(self, next_jump_time)
    }

    fn next_jump(&self) -> usize {
        forward!(self, next_jump)
    }

    fn end_time(&self) -> f64 {
        forward!(self, end_time)
    }

    fn save_positions(&self) -> (bool, bool) {
        forward!(self, save_positions)
    }

    fn rng(&mut self) -> &mut SmallRng {
        forward!(self, rng)
    }
}
