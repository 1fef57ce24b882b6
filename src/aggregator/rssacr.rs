//! RSSACR: rejection sampling over a bracketed rate envelope,
//! group-selected through the two-level priority table.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::Exp1;
use tracing::instrument;

use crate::aggregator::Aggregator;
use crate::bracket::BracketSet;
use crate::config::AggregatorConfig;
use crate::error::Result;
use crate::integrator::Integrator;
use crate::priority_table::PriorityTable;
use crate::rate::JumpSet;

pub struct RssacrAggregator<P> {
    jumps: JumpSet<P>,
    brackets: BracketSet,
    r_lo: Vec<f64>,
    r_hi: Vec<f64>,
    /// species -> reactions whose rate reads it, the reverse of each
    /// jump's read set.
    vartojumps: Vec<Vec<usize>>,
    pt: Option<PriorityTable>,
    next_time: f64,
    chosen: usize,
    tend: f64,
    rng: SmallRng,
}

fn minexp_for(r_hi: &[f64]) -> i32 {
    r_hi
        .iter()
        .filter(|&&r| r > 0.0)
        .map(|&r| r.log2().floor() as i32)
        .min()
        .unwrap_or(0)
        - 1
}

impl<P> RssacrAggregator<P> {
    /// `u0` is only used to size the bracket/priority tables; the
    /// actual first brackets and priorities are computed in
    /// `initialize` where `integrator.p`/`integrator.t` are available
    /// (general jumps' rates depend on both).
    pub fn new(jumps: JumpSet<P>, u0: &[i64], tend: f64, config: AggregatorConfig) -> Self {
        let n = jumps.len();
        let mut vartojumps = vec![Vec::new(); u0.len()];
        for k in 0..n {
            for s in jumps.read_set(k) {
                vartojumps[s].push(k);
            }
        }
        RssacrAggregator {
            jumps,
            brackets: BracketSet::new(u0, config.bracket),
            r_lo: vec![0.0; n],
            r_hi: vec![0.0; n],
            vartojumps,
            pt: None,
            next_time: f64::INFINITY,
            chosen: usize::MAX,
            tend,
            rng: config.rng_seed.map(SmallRng::seed_from_u64).unwrap_or_else(SmallRng::from_entropy),
        }
    }

    fn refresh_bracket(&mut self, k: usize, p: &P, t: f64) {
        let (lo, hi) = if self.jumps.is_mass_action(k) {
            // falling factorial is monotone nondecreasing in n>=0.
            (self.jumps.mass_action[k].rate(&self.brackets.u_lo), self.jumps.mass_action[k].rate(&self.brackets.u_hi))
        } else {
            let a = self.jumps.rate(k, &self.brackets.u_lo, p, t);
            let b = self.jumps.rate(k, &self.brackets.u_hi, p, t);
            (a.min(b), a.max(b))
        };
        self.r_lo[k] = lo;
        self.r_hi[k] = hi;
    }

    fn select_next(&mut self, u: &[i64], p: &P, t: f64) -> Result<()> {
        let pt = self.pt.as_ref().expect("priority table built in initialize");
        let gsum = pt.gsum();
        #[allow(clippy::neg_cmp_op_on_partial_ord)]
        if !(gsum > 0.0) {
            self.next_time = f64::INFINITY;
            self.chosen = usize::MAX;
            return Ok(());
        }
        let mut waiting_raw = 0.0;
        let chosen = loop {
            waiting_raw += self.rng.sample::<f64, _>(Exp1);
            let Some(k) = self.pt.as_ref().unwrap().sample(&mut self.rng) else {
                continue;
            };
            let v = self.rng.gen::<f64>() * self.r_hi[k];
            if v <= self.r_lo[k] {
                break k;
            }
            let exact = self.jumps.rate(k, u, p, t);
            if v <= exact {
                break k;
            }
        };
        let dt = waiting_raw / gsum;
        self.next_time = t + dt;
        self.chosen = chosen;
        Ok(())
    }
}

impl<P> Aggregator<P> for RssacrAggregator<P> {
    #[instrument(skip_all)]
    fn initialize(&mut self, integrator: &mut Integrator<P>) -> Result<()> {
        let n = self.jumps.len();
        for k in 0..n {
            self.refresh_bracket(k, &integrator.p, integrator.t);
        }
        let minexp = minexp_for(&self.r_hi);
        let mut pt = PriorityTable::new(minexp, n);
        for k in 0..n {
            let prio = if self.r_hi[k] > 0.0 { self.r_hi[k] } else { 0.0 };
            pt.insert(k, prio).expect("bracket-derived r_hi must be non-negative");
        }
        self.pt = Some(pt);
        let u = integrator.u.as_well_mixed().to_vec();
        self.select_next(&u, &integrator.p, integrator.t)?;
        integrator.tstop = self.next_time;
        Ok(())
    }

    fn execute_jumps(&mut self, integrator: &mut Integrator<P>) -> Result<()> {
        if self.chosen == usize::MAX {
            return Ok(());
        }
        let k = self.chosen;
        self.jumps.affect(k, integrator);
        let touched: Vec<usize> = self.jumps.write_set(k);
        let u = integrator.u.as_well_mixed().to_vec();
        for &s in &touched {
            if self.brackets.is_outside_brackets(s, u[s]) {
                self.brackets.update_species_bracket(s, u[s]);
                for j in self.vartojumps[s].clone() {
                    let old_hi = self.r_hi[j].max(0.0);
                    self.refresh_bracket(j, &integrator.p, integrator.t);
                    let new_hi = self.r_hi[j].max(0.0);
                    self.pt.as_mut().unwrap().update(j, old_hi, new_hi)?;
                }
            }
        }
        Ok(())
    }

    fn generate_jumps(&mut self, integrator: &mut Integrator<P>) -> Result<()> {
        let u = integrator.u.as_well_mixed().to_vec();
        self.select_next(&u, &integrator.p, integrator.t)?;
        integrator.tstop = self.next_time;
        Ok(())
    }

    fn next_jump_time(&self) -> f64 {
        self.next_time
    }

    fn next_jump(&self) -> usize {
        self.chosen
    }

    fn end_time(&self) -> f64 {
        self.tend
    }

    fn rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }
}
