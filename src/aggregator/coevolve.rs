//! The Coevolve aggregator: thinning-based next-time sampling with
//! per-jump upper/lower rate bounds, for time-varying rates.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::Exp1;
use tracing::{error, instrument};

use crate::aggregator::Aggregator;
use crate::config::AggregatorConfig;
use crate::dep_graph::DependencyGraph;
use crate::error::{JumpError, Result};
use crate::heap::IndexedMinHeap;
use crate::integrator::Integrator;
use crate::rate::JumpSet;

pub struct CoevolveAggregator<P> {
    jumps: JumpSet<P>,
    dep_graph: DependencyGraph,
    /// Last urate used for jump `k`; rescaled-wait thinning reuses this
    /// when the jump wasn't the one that just fired.
    cur_rates: Vec<f64>,
    heap: IndexedMinHeap,
    last_fired: Option<usize>,
    tend: f64,
    rng: SmallRng,
}

impl<P> CoevolveAggregator<P> {
    pub fn new(
        jumps: JumpSet<P>,
        dep_graph: DependencyGraph,
        tend: f64,
        config: &AggregatorConfig,
    ) -> Result<Self> {
        if dep_graph.len() != jumps.len() {
            return Err(JumpError::Configuration(format!(
                "dependency graph has {} nodes, jump set has {}",
                dep_graph.len(),
                jumps.len()
            )));
        }
        let n = jumps.len();
        Ok(CoevolveAggregator {
            jumps,
            dep_graph,
            cur_rates: vec![0.0; n],
            heap: IndexedMinHeap::from_keys(vec![f64::INFINITY; n]),
            last_fired: None,
            tend,
            rng: config.rng_seed.map(SmallRng::seed_from_u64).unwrap_or_else(SmallRng::from_entropy),
        })
    }

    /// Rescales the remaining wait against the new bound (or draws a
    /// fresh one), advances through rateinterval boundaries, then
    /// thins by accept/reject against the exact rate.
    fn next_time(&mut self, k: usize, u: &[i64], p: &P, now: f64, prev: Option<usize>) -> Result<(f64, f64)> {
        let mut now = now;
        let urate0 = self.jumps.urate(k, u, p, now);

        let mut s = if prev != Some(k) && self.cur_rates[k] > 0.0 && urate0 > 0.0 {
            let remaining = self.heap.key(k) - now;
            self.cur_rates[k] / urate0 * remaining
        } else if urate0 > 0.0 {
            self.rng.sample::<f64, _>(Exp1) / urate0
        } else {
            f64::INFINITY
        };

        loop {
            let interval = self.jumps.rateinterval(k, u, p, now);
            if !(s > interval) {
                break;
            }
            now += interval;
            let urate = self.jumps.urate(k, u, p, now);
            s = if urate > 0.0 { self.rng.sample::<f64, _>(Exp1) / urate } else { f64::INFINITY };
        }

        let mut t_candidate = now + s;
        loop {
            if !t_candidate.is_finite() {
                return Ok((f64::INFINITY, self.jumps.urate(k, u, p, now)));
            }
            let urate = self.jumps.urate(k, u, p, t_candidate);
            let lrate = self.jumps.lrate(k, u, p, t_candidate);
            if lrate > urate {
                error!(jump = k, lrate, urate, "lrate exceeds urate");
                return Err(JumpError::Invariant(format!(
                    "lrate {lrate} > urate {urate} for jump {k} at t={t_candidate}"
                )));
            }
            let v = self.rng.gen::<f64>() * urate;
            if v <= lrate {
                return Ok((t_candidate, urate));
            }
            let exact = self.jumps.rate(k, u, p, t_candidate);
            if v <= exact {
                return Ok((t_candidate, urate));
            }
            now = t_candidate;
            let s2 = if urate > 0.0 { self.rng.sample::<f64, _>(Exp1) / urate } else { f64::INFINITY };
            if !s2.is_finite() {
                return Ok((f64::INFINITY, urate));
            }
            t_candidate = now + s2;
        }
    }

    fn publish_top(&self, integrator: &mut Integrator<P>) {
        integrator.tstop = self.heap.peek().map(|(_, t)| t).unwrap_or(f64::INFINITY);
    }
}

impl<P> Aggregator<P> for CoevolveAggregator<P> {
    #[instrument(skip_all)]
    fn initialize(&mut self, integrator: &mut Integrator<P>) -> Result<()> {
        let n = self.jumps.len();
        let u = integrator.u.as_well_mixed().to_vec();
        let mut keys = vec![f64::INFINITY; n];
        for k in 0..n {
            let (t, urate) = self.next_time(k, &u, &integrator.p, integrator.t, None)?;
            keys[k] = t;
            self.cur_rates[k] = urate;
        }
        self.heap = IndexedMinHeap::from_keys(keys);
        self.publish_top(integrator);
        Ok(())
    }

    fn execute_jumps(&mut self, integrator: &mut Integrator<P>) -> Result<()> {
        if let Some((pid, _)) = self.heap.peek() {
            self.jumps.affect(pid, integrator);
            self.last_fired = Some(pid);
        }
        Ok(())
    }

    fn generate_jumps(&mut self, integrator: &mut Integrator<P>) -> Result<()> {
        let Some(k_last) = self.last_fired else {
            self.publish_top(integrator);
            return Ok(());
        };
        let u = integrator.u.as_well_mixed().to_vec();
        for &j in self.dep_graph.deps(k_last).to_vec().iter() {
            let (t_j, urate_j) = self.next_time(j, &u, &integrator.p, integrator.t, Some(k_last))?;
            self.heap.update(j, t_j);
            self.cur_rates[j] = urate_j;
        }
        self.publish_top(integrator);
        Ok(())
    }

    fn next_jump_time(&self) -> f64 {
        self.heap.peek().map(|(_, t)| t).unwrap_or(f64::INFINITY)
    }

    fn next_jump(&self) -> usize {
        self.heap.peek().map(|(pid, _)| pid).unwrap_or(usize::MAX)
    }

    fn end_time(&self) -> f64 {
        self.tend
    }

    fn rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate::{GeneralJump, MassActionJump};
    use crate::state::State;

    // N1 is a homogeneous Poisson(1) counter; N2 fires at rate
    // 1+sin(t) if N1 is even, else 1+cos(t), bounded by urate=2, lrate=1.
    fn seasonal_jumps() -> JumpSet<()> {
        let n1 = MassActionJump::new(1.0, vec![], vec![(0, 1)]);
        let n2: GeneralJump<()> = GeneralJump {
            rate: Box::new(|u, _p, t| if u[0] % 2 == 0 { 1.0 + t.sin() } else { 1.0 + t.cos() }),
            urate: Box::new(|_u, _p, _t| 2.0),
            lrate: Some(Box::new(|_u, _p, _t| 1.0)),
            rateinterval: Box::new(|_u, _p, _t| f64::INFINITY),
            affect: Box::new(|i| i.u.as_well_mixed_mut()[1] += 1),
            reads: vec![0],
            writes: vec![1],
        };
        JumpSet::new(vec![n1], vec![n2])
    }

    #[test]
    fn trajectory_is_monotone_nondecreasing_in_each_coordinate() {
        let jumps = seasonal_jumps();
        let dep_graph = DependencyGraph::build(&jumps).unwrap();
        let cfg = AggregatorConfig { rng_seed: Some(3), ..Default::default() };
        let mut agg = CoevolveAggregator::new(jumps, dep_graph, 10.0, &cfg).unwrap();
        let mut integrator = Integrator::new(State::well_mixed(vec![0, 0]), (), 0.0);
        agg.initialize(&mut integrator).unwrap();
        let mut prev = integrator.u.as_well_mixed().to_vec();
        for _ in 0..2000 {
            if !agg.next_jump_time().is_finite() || agg.next_jump_time() > 10.0 {
                break;
            }
            integrator.t = agg.next_jump_time();
            agg.execute_jumps(&mut integrator).unwrap();
            agg.generate_jumps(&mut integrator).unwrap();
            let now = integrator.u.as_well_mixed().to_vec();
            assert!(now[0] >= prev[0] && now[1] >= prev[1]);
            prev = now;
        }
    }

    #[test]
    fn lrate_greater_than_urate_is_a_fatal_error() {
        let bad: GeneralJump<()> = GeneralJump {
            rate: Box::new(|_u, _p, _t| 1.0),
            urate: Box::new(|_u, _p, _t| 0.5),
            lrate: Some(Box::new(|_u, _p, _t| 1.0)),
            rateinterval: Box::new(|_u, _p, _t| f64::INFINITY),
            affect: Box::new(|_i| {}),
            reads: vec![],
            writes: vec![],
        };
        let jumps: JumpSet<()> = JumpSet::new(vec![], vec![bad]);
        let dep_graph = DependencyGraph::build(&jumps).unwrap();
        let cfg = AggregatorConfig::default();
        let mut agg = CoevolveAggregator::new(jumps, dep_graph, 10.0, &cfg).unwrap();
        let mut integrator = Integrator::new(State::well_mixed(vec![]), (), 0.0);
        assert!(agg.initialize(&mut integrator).is_err());
    }
}
