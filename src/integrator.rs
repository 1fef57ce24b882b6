//! The stepper-owned record that aggregators read and write through:
//! `integrator.u`, `.p`, `.t`, `.tstop`, `u_modified!`, `add_tstop!`,
//! `terminate!`, and a callback vector. This module implements that
//! boundary; [`crate::stepper`] implements the loop that drives it.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::state::State;

/// A wrapper giving `f64` a total order for use in the `tstops` heap.
/// Panics on `NaN`: a `NaN` rate (and by extension a `NaN` stop time)
/// is a fatal user error, not something to silently route around.
#[derive(Clone, Copy, Debug, PartialEq)]
struct OrderedTime(f64);

impl Eq for OrderedTime {}
impl PartialOrd for OrderedTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for OrderedTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.partial_cmp(&other.0).expect("NaN time is a fatal user error")
    }
}

/// Why a trajectory stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetCode {
    /// Ran to the end of `tspan` normally.
    Default,
    /// A callback called `terminate!`.
    Terminated,
}

/// A discrete callback, invoked once per step after the aggregator's
/// `execute_jumps`/`generate_jumps` pair.
pub type Callback<P> = Box<dyn FnMut(&mut Integrator<P>)>;

/// The mutable record shared between the stepper and the aggregator.
/// The state vector `u` is mutated only inside an aggregator's
/// `affect!`, after all reads for the step are complete.
pub struct Integrator<P> {
    pub u: State,
    pub p: P,
    pub t: f64,
    /// Next jump time, written by the aggregator via
    /// `register_next_jump_time`. The stepper reads this but never
    /// writes it, and the aggregator never pushes it into `tstops`
    /// (that would silently degrade scheduling from O(1) to O(log N)
    /// per jump).
    pub tstop: f64,
    pub u_modified: bool,
    keep_stepping: bool,
    retcode: RetCode,
    tstops: BinaryHeap<std::cmp::Reverse<OrderedTime>>,
    pub saved_times: Vec<f64>,
    pub saved_u: Vec<State>,
    callbacks: Vec<Callback<P>>,
}

impl<P> Integrator<P> {
    pub fn new(u: State, p: P, t0: f64) -> Self {
        Integrator {
            u,
            p,
            t: t0,
            tstop: f64::INFINITY,
            u_modified: false,
            keep_stepping: true,
            retcode: RetCode::Default,
            tstops: BinaryHeap::new(),
            saved_times: Vec::new(),
            saved_u: Vec::new(),
            callbacks: Vec::new(),
        }
    }

    pub fn u_modified(&mut self) {
        self.u_modified = true;
    }

    /// Schedules a user checkpoint. Distinct from the aggregator's own
    /// `tstop`; the aggregator must never insert into this queue.
    pub fn add_tstop(&mut self, t: f64) {
        self.tstops.push(std::cmp::Reverse(OrderedTime(t)));
    }

    pub fn peek_user_tstop(&self) -> Option<f64> {
        self.tstops.peek().map(|std::cmp::Reverse(OrderedTime(t))| *t)
    }

    pub fn pop_user_tstop(&mut self) -> Option<f64> {
        self.tstops.pop().map(|std::cmp::Reverse(OrderedTime(t))| t)
    }

    pub fn terminate(&mut self, retcode: RetCode) {
        self.keep_stepping = false;
        self.retcode = retcode;
    }

    pub fn step_should_continue(&self) -> bool {
        self.keep_stepping
    }

    pub fn retcode(&self) -> RetCode {
        self.retcode
    }

    pub fn add_callback(&mut self, cb: Callback<P>) {
        self.callbacks.push(cb);
    }

    pub fn run_callbacks(&mut self) {
        let mut callbacks = std::mem::take(&mut self.callbacks);
        for cb in callbacks.iter_mut() {
            cb(self);
        }
        self.callbacks = callbacks;
    }

    pub fn save(&mut self) {
        self.saved_times.push(self.t);
        self.saved_u.push(self.u.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tstops_pop_in_ascending_order() {
        let mut it = Integrator::new(State::well_mixed(vec![0]), (), 0.0);
        it.add_tstop(5.0);
        it.add_tstop(1.0);
        it.add_tstop(3.0);
        assert_eq!(it.pop_user_tstop(), Some(1.0));
        assert_eq!(it.pop_user_tstop(), Some(3.0));
        assert_eq!(it.pop_user_tstop(), Some(5.0));
        assert_eq!(it.pop_user_tstop(), None);
    }

    #[test]
    fn terminate_stops_stepping() {
        let mut it = Integrator::new(State::well_mixed(vec![0]), (), 0.0);
        assert!(it.step_should_continue());
        it.terminate(RetCode::Terminated);
        assert!(!it.step_should_continue());
        assert_eq!(it.retcode(), RetCode::Terminated);
    }
}
