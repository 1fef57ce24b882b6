//! The Direct method (`advance_until`/`make_cumrates`/
//! `choose_cumrate_for`), a plain cumulative-rate linear scan with no
//! bracketing or rejection sampling. Serves as the oracle cross-check
//! against RSSACR on a well-mixed system, and as the simplest
//! illustration of the shared `Aggregator` trait.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::Exp1;

use crate::aggregator::Aggregator;
use crate::error::Result;
use crate::integrator::Integrator;
use crate::rate::JumpSet;

pub struct DirectAggregator<P> {
    jumps: JumpSet<P>,
    cumrates: Vec<f64>,
    next_time: f64,
    next_jump: usize,
    tend: f64,
    rng: SmallRng,
}

impl<P> DirectAggregator<P> {
    pub fn new(jumps: JumpSet<P>, tend: f64, seed: Option<u64>) -> Self {
        let n = jumps.len();
        DirectAggregator {
            jumps,
            cumrates: vec![f64::NAN; n],
            next_time: f64::INFINITY,
            next_jump: usize::MAX,
            tend,
            rng: seed.map(SmallRng::seed_from_u64).unwrap_or_else(SmallRng::from_entropy),
        }
    }

    fn make_cumrates(&mut self, u: &[i64], p: &P, t: f64) -> f64 {
        let mut total = 0.0;
        for k in 0..self.jumps.len() {
            total += self.jumps.rate(k, u, p, t);
            self.cumrates[k] = total;
        }
        total
    }
}

impl<P> Aggregator<P> for DirectAggregator<P> {
    fn initialize(&mut self, integrator: &mut Integrator<P>) -> Result<()> {
        self.generate_jumps(integrator)
    }

    fn execute_jumps(&mut self, integrator: &mut Integrator<P>) -> Result<()> {
        if self.next_jump != usize::MAX {
            self.jumps.affect(self.next_jump, integrator);
        }
        Ok(())
    }

    fn generate_jumps(&mut self, integrator: &mut Integrator<P>) -> Result<()> {
        let u = integrator.u.as_well_mixed().to_vec();
        let total = self.make_cumrates(&u, &integrator.p, integrator.t);
        #[allow(clippy::neg_cmp_op_on_partial_ord)]
        if !(total > 0.0) {
            self.next_time = f64::INFINITY;
            self.next_jump = usize::MAX;
            integrator.tstop = f64::INFINITY;
            return Ok(());
        }
        let dt = self.rng.sample::<f64, _>(Exp1) / total;
        self.next_time = integrator.t + dt;
        let target = total * self.rng.gen::<f64>();
        self.next_jump =
            self.cumrates.iter().position(|&c| target < c).unwrap_or(self.jumps.len() - 1);
        integrator.tstop = self.next_time;
        Ok(())
    }

    fn next_jump_time(&self) -> f64 {
        self.next_time
    }

    fn next_jump(&self) -> usize {
        self.next_jump
    }

    fn end_time(&self) -> f64 {
        self.tend
    }

    fn rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }
}
