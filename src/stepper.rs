//! The SSA stepper: drives [`crate::integrator::Integrator`] through a
//! trajectory end-to-end.
//!
//! It fires the aggregator's jump exactly once per distinct `tstop`
//! value, tracked via `last_tstop_applied`. Re-entering the same `tstop`
//! (e.g. because a user `tstops` entry coincides with it) never
//! re-applies the jump.

use crate::aggregator::Aggregator;
use crate::error::Result;
use crate::integrator::{Integrator, RetCode};

pub struct Stepper<P, A: Aggregator<P>> {
    pub aggregator: A,
    pub integrator: Integrator<P>,
    saveat: Vec<f64>,
    save_idx: usize,
    last_tstop_applied: Option<f64>,
}

impl<P, A: Aggregator<P>> Stepper<P, A> {
    /// Runs the aggregator's `initialize`, then sorts `saveat` so the
    /// step loop can flush it in order.
    pub fn new(mut aggregator: A, mut integrator: Integrator<P>, mut saveat: Vec<f64>) -> Result<Self> {
        aggregator.initialize(&mut integrator)?;
        saveat.sort_by(|a, b| a.partial_cmp(b).expect("NaN saveat entry is a fatal user error"));
        integrator.save();
        Ok(Stepper { aggregator, integrator, saveat, save_idx: 0, last_tstop_applied: None })
    }

    /// Advances the trajectory to `tend` (capped by the aggregator's own
    /// `end_time`), saving at every `saveat` entry and at the endpoint.
    pub fn run_until(&mut self, tend: f64) -> Result<RetCode> {
        let tend = tend.min(self.aggregator.end_time());
        while self.integrator.step_should_continue() && self.integrator.t < tend {
            self.step(tend)?;
        }
        if self.integrator.saved_times.last().copied() != Some(self.integrator.t) {
            self.integrator.save();
        }
        Ok(self.integrator.retcode())
    }

    fn step(&mut self, tend: f64) -> Result<()> {
        let agg_tstop = self.aggregator.next_jump_time().min(tend);
        let user_tstop = self.integrator.peek_user_tstop();
        let target = match user_tstop {
            Some(ut) if ut < agg_tstop => ut,
            _ => agg_tstop,
        };

        while self.save_idx < self.saveat.len() && self.saveat[self.save_idx] <= target {
            self.integrator.t = self.saveat[self.save_idx];
            self.integrator.save();
            self.save_idx += 1;
        }

        self.integrator.t = target;

        let at_agg_tstop = target >= agg_tstop && self.last_tstop_applied != Some(agg_tstop);
        if at_agg_tstop {
            self.aggregator.execute_jumps(&mut self.integrator)?;
            self.aggregator.generate_jumps(&mut self.integrator)?;
            self.last_tstop_applied = Some(agg_tstop);
            if self.aggregator.save_positions().1 {
                self.integrator.save();
            }
        }

        if let Some(ut) = user_tstop {
            if target >= ut {
                self.integrator.pop_user_tstop();
            }
        }

        self.integrator.run_callbacks();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::direct::DirectAggregator;
    use crate::rate::MassActionJump;
    use crate::state::State;

    fn birth_death_jumps() -> crate::rate::JumpSet<()> {
        crate::rate::JumpSet::new(
            vec![
                MassActionJump::new(1.0, vec![(0, 1)], vec![(0, 1)]),
                MassActionJump::new(2.0, vec![(0, 1)], vec![(0, -1)]),
                MassActionJump::new(50.0, vec![], vec![(0, 1)]),
            ],
            vec![],
        )
    }

    #[test]
    fn run_until_reaches_the_endpoint_and_saves_it() {
        let agg = DirectAggregator::new(birth_death_jumps(), 20.0, Some(9));
        let integrator = Integrator::new(State::well_mixed(vec![5]), (), 0.0);
        let mut stepper = Stepper::new(agg, integrator, vec![1.0, 2.0, 5.0]).unwrap();
        stepper.run_until(20.0).unwrap();
        assert_eq!(stepper.integrator.saved_times.last().copied(), Some(20.0));
        // the three saveat entries plus the initial save plus at least
        // one jump-triggered save.
        assert!(stepper.integrator.saved_times.len() >= 5);
    }

    #[test]
    fn saveat_entries_appear_in_order() {
        let agg = DirectAggregator::new(birth_death_jumps(), 5.0, Some(4));
        let integrator = Integrator::new(State::well_mixed(vec![5]), (), 0.0);
        let mut stepper = Stepper::new(agg, integrator, vec![1.0, 2.0, 3.0]).unwrap();
        stepper.run_until(5.0).unwrap();
        let saved = &stepper.integrator.saved_times;
        for w in saved.windows(2) {
            assert!(w[0] <= w[1]);
        }
        assert!(saved.iter().any(|&t| (t - 1.0).abs() < 1e-9));
        assert!(saved.iter().any(|&t| (t - 2.0).abs() < 1e-9));
        assert!(saved.iter().any(|&t| (t - 3.0).abs() < 1e-9));
    }
}
