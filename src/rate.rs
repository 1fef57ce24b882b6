//! Rate primitives.
//!
//! A jump catalog is a statically-indexed sequence: the first `M`
//! entries are mass-action jumps (propensity = rate constant times a
//! falling-factorial combinatorial factor per reactant), the rest are
//! general jumps carrying opaque `rate`/`urate`/`lrate`/`rateinterval`/
//! `affect!` closures. Closures are boxed trait objects rather than a
//! generic per-jump type: the aggregator's hot loop calls through
//! these thousands of times per step, and a `Vec<GeneralJump<P>>` of
//! heterogeneous closures cannot be monomorphised per-jump without
//! either an enum of every possible closure shape or dynamic dispatch;
//! dynamic dispatch is the conventional choice here, with `P`
//! monomorphised once for the whole jump set.

use crate::integrator::Integrator;

/// One mass-action jump: `rate_constant * prod_i C(u[s_i], nu_i)`, where
/// `C(n, nu) = n*(n-1)*...*(n-nu+1)` is the falling factorial (zero
/// whenever `n < nu`, for non-negative integer `n`).
#[derive(Clone, Debug)]
pub struct MassActionJump {
    pub rate_constant: f64,
    /// `(species, stoichiometric coefficient)` pairs read by this jump.
    pub react_stoch: Vec<(usize, u32)>,
    /// `(species, signed delta)` pairs this jump's affect applies.
    pub net_stoch: Vec<(usize, i64)>,
}

impl MassActionJump {
    pub fn new(
        rate_constant: f64,
        react_stoch: Vec<(usize, u32)>,
        net_stoch: Vec<(usize, i64)>,
    ) -> Self {
        MassActionJump { rate_constant, react_stoch, net_stoch }
    }

    /// Propensity evaluation as a method on the jump it reads.
    pub fn rate(&self, u: &[i64]) -> f64 {
        self.react_stoch.iter().fold(self.rate_constant, |acc, &(s, nu)| {
            let n = u[s];
            (0..nu as i64).fold(acc, |acc, i| acc * (n - i) as f64)
        })
    }

    pub fn affect(&self, u: &mut [i64]) {
        for &(s, delta) in &self.net_stoch {
            u[s] += delta;
        }
    }

    pub fn read_set(&self) -> impl Iterator<Item = usize> + '_ {
        self.react_stoch.iter().map(|&(s, _)| s)
    }

    pub fn write_set(&self) -> impl Iterator<Item = usize> + '_ {
        self.net_stoch.iter().map(|&(s, _)| s)
    }
}

/// Free-function form for callers that want `eval_ma_rate(u, k,
/// majumps)` instead of `majumps[k].rate(u)`.
pub fn eval_ma_rate(u: &[i64], k: usize, majumps: &[MassActionJump]) -> f64 {
    majumps[k].rate(u)
}

type RateFn<P> = Box<dyn Fn(&[i64], &P, f64) -> f64 + Send + Sync>;
type AffectFn<P> = Box<dyn FnMut(&mut Integrator<P>) + Send>;

/// A jump whose rate is an arbitrary, possibly time-varying, closure.
///
/// `lrate` is optional; when absent the jump's lower bound is a
/// constant `0`. `reads`/`writes` are the species this jump's rate
/// reads and its affect writes — the analogue of
/// `react_stoch`/`net_stoch` for a jump whose state dependency can't
/// be read off a stoichiometry table, supplied explicitly by the
/// caller since both sides are equally opaque for a general jump's
/// `affect!`.
pub struct GeneralJump<P> {
    pub rate: RateFn<P>,
    pub urate: RateFn<P>,
    pub lrate: Option<RateFn<P>>,
    pub rateinterval: RateFn<P>,
    pub affect: AffectFn<P>,
    pub reads: Vec<usize>,
    pub writes: Vec<usize>,
}

impl<P> GeneralJump<P> {
    pub fn lrate_or_zero(&self, u: &[i64], p: &P, t: f64) -> f64 {
        self.lrate.as_ref().map_or(0.0, |f| f(u, p, t))
    }
}

/// The full jump catalog: mass-action jumps first, general jumps
/// after. Jump indices are immutable and key every aggregator array.
pub struct JumpSet<P> {
    pub mass_action: Vec<MassActionJump>,
    pub general: Vec<GeneralJump<P>>,
}

impl<P> JumpSet<P> {
    pub fn new(mass_action: Vec<MassActionJump>, general: Vec<GeneralJump<P>>) -> Self {
        JumpSet { mass_action, general }
    }

    pub fn len(&self) -> usize {
        self.mass_action.len() + self.general.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_mass_action(&self, k: usize) -> bool {
        k < self.mass_action.len()
    }

    fn general_idx(&self, k: usize) -> usize {
        k - self.mass_action.len()
    }

    pub fn rate(&self, k: usize, u: &[i64], p: &P, t: f64) -> f64 {
        if self.is_mass_action(k) {
            self.mass_action[k].rate(u)
        } else {
            let gj = &self.general[self.general_idx(k)];
            (gj.rate)(u, p, t)
        }
    }

    /// Mass-action rates are exact, so `urate == rate` for them.
    pub fn urate(&self, k: usize, u: &[i64], p: &P, t: f64) -> f64 {
        if self.is_mass_action(k) {
            self.mass_action[k].rate(u)
        } else {
            let gj = &self.general[self.general_idx(k)];
            (gj.urate)(u, p, t)
        }
    }

    /// Mass-action rates are exact, so `lrate == rate` for them too.
    pub fn lrate(&self, k: usize, u: &[i64], p: &P, t: f64) -> f64 {
        if self.is_mass_action(k) {
            self.mass_action[k].rate(u)
        } else {
            let gj = &self.general[self.general_idx(k)];
            gj.lrate_or_zero(u, p, t)
        }
    }

    /// Mass-action rates never change validity, so their interval is
    /// `+inf` (valid forever).
    pub fn rateinterval(&self, k: usize, u: &[i64], p: &P, t: f64) -> f64 {
        if self.is_mass_action(k) {
            f64::INFINITY
        } else {
            let gj = &self.general[self.general_idx(k)];
            (gj.rateinterval)(u, p, t)
        }
    }

    pub fn affect(&mut self, k: usize, integrator: &mut Integrator<P>) {
        if self.is_mass_action(k) {
            let u = integrator.u.as_well_mixed_mut();
            self.mass_action[k].affect(u);
            integrator.u_modified();
        } else {
            let idx = self.general_idx(k);
            (self.general[idx].affect)(integrator);
            integrator.u_modified();
        }
    }

    pub fn read_set(&self, k: usize) -> Vec<usize> {
        if self.is_mass_action(k) {
            self.mass_action[k].read_set().collect()
        } else {
            self.general[self.general_idx(k)].reads.clone()
        }
    }

    pub fn write_set(&self, k: usize) -> Vec<usize> {
        if self.is_mass_action(k) {
            self.mass_action[k].write_set().collect()
        } else {
            self.general[self.general_idx(k)].writes.clone()
        }
    }
}
