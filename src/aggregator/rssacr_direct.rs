//! RSSACR-Direct: the spatial aggregator. Sites are selected via the
//! same rejection-sampled priority table as the well-mixed RSSACR
//! aggregator, keyed by per-site total rate; once a site is chosen,
//! the specific reaction or hop within it is picked by a plain
//! Direct-method draw over that site's local cumulative rates. No
//! monotonicity assumption is made on the site-level rate bounds
//! (same policy as the well-mixed aggregator's general-jump bracket
//! refresh).

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
use crate::rate::MassActionJump;
use crate::state::State;

/// Static neighbor adjacency for the lattice the spatial system lives
/// on. Undirected by convention (callers list both directions), but
/// nothing here assumes symmetry.
#[derive(Clone, Debug)]
pub struct Lattice {
    pub num_sites: usize,
    pub neighbors: Vec<Vec<usize>>,
}

impl Lattice {
    pub fn new(num_sites: usize, neighbors: Vec<Vec<usize>>) -> Self {
        assert_eq!(neighbors.len(), num_sites);
        Lattice { num_sites, neighbors }
    }
}

/// What happens when a `SpatialJump` fires: a local reaction, or a hop
/// of one molecule of `species` from `site` to `dst`.
#[derive(Clone, Copy, Debug)]
pub enum JumpKind {
    Reaction { rx_idx: usize },
    Hop { species: usize, dst: usize },
}

#[derive(Clone, Copy, Debug)]
pub struct SpatialJump {
    pub site: usize,
    pub kind: JumpKind,
}

pub struct RssacrDirectAggregator {
    lattice: Lattice,
    num_species: usize,
    /// Site-local mass-action reactions, shared across all sites (the
    /// same reaction network runs at every site against that site's
    /// local counts).
    reactions: Vec<MassActionJump>,
    /// Per-species hop rate constant; hopping rate for species `s` out
    /// of a site is `hop_rate[s] * count(s, site)`.
    hop_rate: Vec<f64>,
    brackets: BracketSet,
    site_lo: Vec<f64>,
    site_hi: Vec<f64>,
    pt: PriorityTable,
    next_time: f64,
    next_jump: Option<SpatialJump>,
    last_jump: Option<SpatialJump>,
    tend: f64,
    rng: SmallRng,
}

impl RssacrDirectAggregator {
    pub fn new(
        lattice: Lattice,
        num_species: usize,
        reactions: Vec<MassActionJump>,
        hop_rate: Vec<f64>,
        u0: &[i64],
        tend: f64,
        config: AggregatorConfig,
    ) -> Self {
        assert_eq!(hop_rate.len(), num_species);
        assert_eq!(u0.len(), num_species * lattice.num_sites);
        let num_sites = lattice.num_sites;
        let brackets = BracketSet::new(u0, config.bracket);
        let mut agg = RssacrDirectAggregator {
            lattice,
            num_species,
            reactions,
            hop_rate,
            brackets,
            site_lo: vec![0.0; num_sites],
            site_hi: vec![0.0; num_sites],
            pt: PriorityTable::new(-1, num_sites),
            next_time: f64::INFINITY,
            next_jump: None,
            last_jump: None,
            tend,
            rng: config.rng_seed.map(SmallRng::seed_from_u64).unwrap_or_else(SmallRng::from_entropy),
        };
        for site in 0..num_sites {
            let (lo, hi) = agg.site_bounds(site);
            agg.site_lo[site] = lo;
            agg.site_hi[site] = hi;
        }
        let minexp = agg
            .site_hi
            .iter()
            .filter(|&&r| r > 0.0)
            .map(|&r| r.log2().floor() as i32)
            .min()
            .unwrap_or(0)
            - 1;
        let mut pt = PriorityTable::new(minexp, num_sites);
        for site in 0..num_sites {
            pt.insert(site, agg.site_hi[site].max(0.0)).expect("bracket bound is never negative");
        }
        agg.pt = pt;
        agg
    }

    fn local_counts(&self, counts: &[i64], site: usize) -> Vec<i64> {
        (0..self.num_species)
            .map(|s| counts[State::spatial_index(self.lattice.num_sites, s, site)])
            .collect()
    }

    /// Sums reaction-rate and hop-rate bounds for a site, reading `lo`
    /// counts for the lower bound and `hi` counts for the upper one.
    fn site_bounds(&self, site: usize) -> (f64, f64) {
        let lo_counts = self.local_counts(&self.brackets.u_lo, site);
        let hi_counts = self.local_counts(&self.brackets.u_hi, site);
        let mut lo = 0.0;
        let mut hi = 0.0;
        for rx in &self.reactions {
            lo += rx.rate(&lo_counts);
            hi += rx.rate(&hi_counts);
        }
        for s in 0..self.num_species {
            lo += self.hop_rate[s] * lo_counts[s] as f64;
            hi += self.hop_rate[s] * hi_counts[s] as f64;
        }
        (lo, hi)
    }

    /// Site-local exact rate sum, used for the exact rejection test and
    /// the within-site Direct draw.
    fn exact_site_rate(&self, site: usize, counts: &[i64]) -> f64 {
        let local = self.local_counts(counts, site);
        let mut total = 0.0;
        for rx in &self.reactions {
            total += rx.rate(&local);
        }
        for s in 0..self.num_species {
            total += self.hop_rate[s] * local[s] as f64;
        }
        total
    }

    fn pick_within_site(&mut self, site: usize, counts: &[i64]) -> SpatialJump {
        let local = self.local_counts(counts, site);
        let mut cum = Vec::with_capacity(self.reactions.len() + self.num_species);
        let mut total = 0.0;
        for rx in &self.reactions {
            total += rx.rate(&local);
            cum.push(total);
        }
        for s in 0..self.num_species {
            total += self.hop_rate[s] * local[s] as f64;
            cum.push(total);
        }
        let target = self.rng.gen::<f64>() * total;
        let idx = cum.iter().position(|&c| target < c).unwrap_or(cum.len() - 1);
        if idx < self.reactions.len() {
            SpatialJump { site, kind: JumpKind::Reaction { rx_idx: idx } }
        } else {
            let species = idx - self.reactions.len();
            let neighbors = &self.lattice.neighbors[site];
            let dst = neighbors[self.rng.gen_range(0..neighbors.len())];
            SpatialJump { site, kind: JumpKind::Hop { species, dst } }
        }
    }

    fn select_next(&mut self, counts: &[i64], t: f64) {
        let gsum = self.pt.gsum();
        if !(gsum > 0.0) {
            self.next_time = f64::INFINITY;
            self.next_jump = None;
            return;
        }
        let mut waiting_raw = 0.0;
        let chosen = loop {
            waiting_raw += self.rng.sample::<f64, _>(Exp1);
            let Some(site) = self.pt.sample(&mut self.rng) else { continue };
            let v = self.rng.gen::<f64>() * self.site_hi[site];
            if v <= self.site_lo[site] {
                break self.pick_within_site(site, counts);
            }
            let exact = self.exact_site_rate(site, counts);
            if v <= exact {
                break self.pick_within_site(site, counts);
            }
        };
        self.next_time = t + waiting_raw / gsum;
        self.next_jump = Some(chosen);
    }

    /// Refreshes site `site`'s bracket/rate bound after any count at it
    /// has changed, but only if the change actually escaped the
    /// existing bracket.
    fn refresh_site_if_touched(&mut self, site: usize, counts: &[i64]) -> Result<()> {
        let n = self.lattice.num_sites;
        let mut escaped = false;
        for s in 0..self.num_species {
            let idx = State::spatial_index(n, s, site);
            if self.brackets.is_outside_brackets(idx, counts[idx]) {
                self.brackets.update_species_bracket(idx, counts[idx]);
                escaped = true;
            }
        }
        if !escaped {
            return Ok(());
        }
        let (lo, hi) = self.site_bounds(site);
        let old_hi = self.site_hi[site].max(0.0);
        self.site_lo[site] = lo;
        self.site_hi[site] = hi;
        self.pt.update(site, old_hi, hi.max(0.0))
    }
}

impl<P> Aggregator<P> for RssacrDirectAggregator {
    #[instrument(skip_all)]
    fn initialize(&mut self, integrator: &mut Integrator<P>) -> Result<()> {
        let (_, _, counts) = integrator.u.as_spatial();
        let counts = counts.to_vec();
        self.select_next(&counts, integrator.t);
        integrator.tstop = self.next_time;
        Ok(())
    }

    fn execute_jumps(&mut self, integrator: &mut Integrator<P>) -> Result<()> {
        let Some(job) = self.next_jump else { return Ok(()) };
        let n = self.lattice.num_sites;
        let (num_species, _, counts) = integrator.u.as_spatial_mut();
        let mut touched_sites = vec![job.site];
        match job.kind {
            JumpKind::Reaction { rx_idx } => {
                let mut local: Vec<i64> = (0..num_species)
                    .map(|s| counts[State::spatial_index(n, s, job.site)])
                    .collect();
                self.reactions[rx_idx].affect(&mut local);
                for s in 0..num_species {
                    counts[State::spatial_index(n, s, job.site)] = local[s];
                }
            }
            JumpKind::Hop { species, dst } => {
                counts[State::spatial_index(n, species, job.site)] -= 1;
                counts[State::spatial_index(n, species, dst)] += 1;
                touched_sites.push(dst);
            }
        }
        integrator.u_modified();
        self.last_jump = Some(job);
        let counts_now = integrator.u.as_spatial().2.to_vec();
        for site in touched_sites {
            self.refresh_site_if_touched(site, &counts_now)?;
        }
        Ok(())
    }

    fn generate_jumps(&mut self, integrator: &mut Integrator<P>) -> Result<()> {
        let (_, _, counts) = integrator.u.as_spatial();
        let counts = counts.to_vec();
        self.select_next(&counts, integrator.t);
        integrator.tstop = self.next_time;
        Ok(())
    }

    fn next_jump_time(&self) -> f64 {
        self.next_time
    }

    fn next_jump(&self) -> usize {
        // Spatial jumps aren't addressed by a flat jump index; use
        // `last_fired` for the fired jump's site/kind detail instead.
        usize::MAX
    }

    fn end_time(&self) -> f64 {
        self.tend
    }

    fn rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }
}

impl RssacrDirectAggregator {
    pub fn last_fired(&self) -> Option<SpatialJump> {
        self.last_jump
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_lattice(n: usize) -> Lattice {
        let neighbors = (0..n)
            .map(|i| {
                let mut v = Vec::new();
                if i > 0 {
                    v.push(i - 1);
                }
                if i + 1 < n {
                    v.push(i + 1);
                }
                v
            })
            .collect();
        Lattice::new(n, neighbors)
    }

    #[test]
    fn diffusion_conserves_total_molecule_count() {
        // A single species hopping on a 4-site line, no reactions.
        let lattice = line_lattice(4);
        let num_species = 1;
        let u0 = vec![10, 0, 0, 0];
        let cfg = AggregatorConfig { rng_seed: Some(77), ..Default::default() };
        let mut agg =
            RssacrDirectAggregator::new(lattice, num_species, vec![], vec![1.0], &u0, 50.0, cfg);
        let mut integrator: Integrator<()> = Integrator::new(State::spatial(1, 4, u0), (), 0.0);
        Aggregator::<()>::initialize(&mut agg, &mut integrator).unwrap();
        let mut steps = 0;
        while integrator.t < 50.0 && agg.next_jump_time().is_finite() && steps < 20_000 {
            integrator.t = agg.next_jump_time();
            Aggregator::<()>::execute_jumps(&mut agg, &mut integrator).unwrap();
            Aggregator::<()>::generate_jumps(&mut agg, &mut integrator).unwrap();
            steps += 1;
        }
        let (_, _, counts) = integrator.u.as_spatial();
        assert_eq!(counts.iter().sum::<i64>(), 10);
    }

    #[test]
    fn zero_activity_schedules_infinity() {
        let lattice = line_lattice(2);
        let u0 = vec![0, 0];
        let cfg = AggregatorConfig::default();
        let mut agg = RssacrDirectAggregator::new(lattice, 1, vec![], vec![1.0], &u0, 10.0, cfg);
        let mut integrator: Integrator<()> = Integrator::new(State::spatial(1, 2, u0), (), 0.0);
        Aggregator::<()>::initialize(&mut agg, &mut integrator).unwrap();
        assert_eq!(agg.next_jump_time(), f64::INFINITY);
    }
}
