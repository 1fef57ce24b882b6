//! `JumpProblem`: everything needed to start a trajectory, bundled so
//! a caller builds it once and hands it to a `Stepper` rather than
//! threading five separate arguments.

use crate::config::AggregatorConfig;
use crate::dep_graph::DependencyGraph;
use crate::rate::JumpSet;
use crate::state::State;

pub struct JumpProblem<P> {
    pub u0: State,
    pub tspan: (f64, f64),
    pub p: P,
    pub jumps: JumpSet<P>,
    /// Required for Coevolve, unused by Direct/RSSACR (which derive
    /// their own dependency structure from brackets/stoichiometry
    /// directly). `None` is only valid for aggregators that don't need
    /// it; `Stepper` construction is where that's enforced.
    pub dep_graph: Option<DependencyGraph>,
    pub config: AggregatorConfig,
}

impl<P> JumpProblem<P> {
    pub fn new(u0: State, tspan: (f64, f64), p: P, jumps: JumpSet<P>, config: AggregatorConfig) -> Self {
        JumpProblem { u0, tspan, p, jumps, dep_graph: None, config }
    }

    pub fn with_dep_graph(mut self, dep_graph: DependencyGraph) -> Self {
        self.dep_graph = Some(dep_graph);
        self
    }
}
