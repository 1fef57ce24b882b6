//! The two-level grouped priority table (`PT`).
//!
//! Groups are indexed by `gid = floor(log2(r)) - minexp` for `r > 0`;
//! `gid = 0` is reserved as the "zero" bucket (exact-zero priorities,
//! which never participate in sampling since their group sum is
//! always `0`). `minexp` is an exponent floor below which the table
//! does not expect to see priorities, used as a starting point for
//! sizing the group array — but it is not a hard ceiling on what the
//! table can hold: a reaction disabled at construction can later turn
//! on at a rate far below the table's initial floor (e.g. a reactant
//! that was at zero becomes one molecule), and `insert`/`update` lower
//! `minexp` and reindex the existing groups rather than rejecting that
//! priority. Within a non-zero group all priorities lie in
//! `[2^(gid+minexp), 2^(gid+minexp+1))`, so rejection sampling against
//! `group_max = 2^(gid+minexp+1)` accepts with probability at least
//! 1/2 per draw — `O(1)` expected rejections regardless of `N`.
//!
//! Cyclic back-pointers (`group -> pid` and `pid -> (group, slot)`) are
//! both represented as indices into dense arenas: no owning pointers,
//! swap-remove keeps everything O(1).

use rand::Rng;
use tracing::{debug, trace};

use crate::error::{JumpError, Result};

#[derive(Default, Clone, Debug)]
struct Group {
    pids: Vec<usize>,
    gsum: f64,
}

#[derive(Clone, Debug)]
pub struct PriorityTable {
    minexp: i32,
    groups: Vec<Group>,
    pidtogroup: Vec<(usize, usize)>,
    priorities: Vec<f64>,
    gsum: f64,
}

const NOWHERE: (usize, usize) = (usize::MAX, usize::MAX);

impl PriorityTable {
    /// `minexp` seeds the table's initial floor: priorities are
    /// expected (but not required) to satisfy `r == 0.0` or
    /// `r >= 2^(minexp + 1)`. `capacity` preallocates the `pid ->
    /// (group, slot)` back-pointer array.
    pub fn new(minexp: i32, capacity: usize) -> Self {
        PriorityTable {
            minexp,
            groups: vec![Group::default()],
            pidtogroup: vec![NOWHERE; capacity],
            priorities: vec![0.0; capacity],
            gsum: 0.0,
        }
    }

    fn ensure_capacity(&mut self, pid: usize) {
        if pid >= self.pidtogroup.len() {
            self.pidtogroup.resize(pid + 1, NOWHERE);
            self.priorities.resize(pid + 1, 0.0);
        }
    }

    fn ensure_group(&mut self, gid: usize) {
        if gid >= self.groups.len() {
            self.groups.resize(gid + 1, Group::default());
        }
    }

    fn prio_to_gid(&self, r: f64) -> Result<usize> {
        if r < 0.0 {
            return Err(JumpError::Domain(format!("negative priority {r}")));
        }
        if r == 0.0 {
            return Ok(0);
        }
        let gid = r.log2().floor() as i32 - self.minexp;
        debug_assert!(gid >= 1, "ensure_floor should have widened the floor for {r}");
        Ok(gid.max(1) as usize)
    }

    fn group_max(&self, gid: usize) -> f64 {
        2f64.powi(gid as i32 + self.minexp + 1)
    }

    /// Widens the floor downward if `r` is positive but would fall
    /// below the current one, reindexing every existing group so their
    /// `gid`s stay correct under the new `minexp`.
    fn ensure_floor(&mut self, r: f64) {
        if !(r > 0.0) {
            return;
        }
        let needed = r.log2().floor() as i32 - 1;
        if needed < self.minexp {
            self.lower_floor_to(needed);
        }
    }

    fn lower_floor_to(&mut self, new_minexp: i32) {
        let shift = (self.minexp - new_minexp) as usize;
        let mut new_groups: Vec<Group> = (0..self.groups.len() + shift).map(|_| Group::default()).collect();
        new_groups[0] = std::mem::take(&mut self.groups[0]);
        for (gid, g) in self.groups.iter_mut().enumerate().skip(1) {
            let moved = std::mem::take(g);
            let new_gid = gid + shift;
            for (slot, &pid) in moved.pids.iter().enumerate() {
                self.pidtogroup[pid] = (new_gid, slot);
            }
            new_groups[new_gid] = moved;
        }
        debug!(old_minexp = self.minexp, new_minexp, "widened priority table floor");
        self.groups = new_groups;
        self.minexp = new_minexp;
    }

    pub fn insert(&mut self, pid: usize, r: f64) -> Result<()> {
        self.ensure_capacity(pid);
        self.ensure_floor(r);
        let gid = self.prio_to_gid(r)?;
        self.ensure_group(gid);
        let slot = self.groups[gid].pids.len();
        self.groups[gid].pids.push(pid);
        self.groups[gid].gsum += r;
        self.gsum += r;
        self.pidtogroup[pid] = (gid, slot);
        self.priorities[pid] = r;
        Ok(())
    }

    fn remove_from_group(&mut self, pid: usize, gid: usize, slot: usize) {
        let r = self.priorities[pid];
        let g = &mut self.groups[gid];
        g.gsum -= r;
        let last = g.pids.len() - 1;
        g.pids.swap(slot, last);
        g.pids.pop();
        if slot < g.pids.len() {
            let moved_pid = g.pids[slot];
            self.pidtogroup[moved_pid] = (gid, slot);
        }
    }

    /// Updates `pid`'s priority from `r_old` to `r_new`. `r_old` is
    /// trusted (the caller is expected to track it); it is only used to
    /// adjust sums when the group does not change.
    pub fn update(&mut self, pid: usize, r_old: f64, r_new: f64) -> Result<()> {
        self.ensure_floor(r_new);
        let new_gid = self.prio_to_gid(r_new)?;
        let (old_gid, slot) = self.pidtogroup[pid];
        debug_assert_ne!(old_gid, NOWHERE.0, "update called on a pid never inserted");
        if old_gid == new_gid {
            self.groups[old_gid].gsum += r_new - r_old;
            self.gsum += r_new - r_old;
            self.priorities[pid] = r_new;
            return Ok(());
        }
        self.remove_from_group(pid, old_gid, slot);
        self.ensure_group(new_gid);
        let new_slot = self.groups[new_gid].pids.len();
        self.groups[new_gid].pids.push(pid);
        self.groups[new_gid].gsum += r_new;
        self.pidtogroup[pid] = (new_gid, new_slot);
        self.gsum += r_new - r_old;
        self.priorities[pid] = r_new;
        trace!(pid, old_gid, new_gid, "priority moved group");
        Ok(())
    }

    /// Weighted sample: picks a group proportional to its sum, then
    /// rejection-samples a slot within the group. Returns `None` only
    /// when the whole table sums to zero.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<usize> {
        if !(self.gsum > 0.0) {
            return None;
        }
        let mut target = rng.gen::<f64>() * self.gsum;
        let mut chosen = None;
        for (gid, g) in self.groups.iter().enumerate().skip(1) {
            if g.gsum <= 0.0 {
                continue;
            }
            if target < g.gsum {
                chosen = Some(gid);
                break;
            }
            target -= g.gsum;
        }
        let gid = chosen?;
        let g = &self.groups[gid];
        let gmax = self.group_max(gid);
        loop {
            let slot = rng.gen_range(0..g.pids.len());
            let pid = g.pids[slot];
            let v = rng.gen::<f64>() * gmax;
            if v <= self.priorities[pid] {
                return Some(pid);
            }
        }
    }

    pub fn gsum(&self) -> f64 {
        self.gsum
    }

    pub fn priority(&self, pid: usize) -> f64 {
        self.priorities[pid]
    }

    /// The grand total equals the sum of group sums equals the sum of
    /// individual priorities, to within a rounding tolerance.
    #[cfg(test)]
    fn invariant_holds(&self, tol: f64) -> bool {
        let from_groups: f64 = self.groups.iter().map(|g| g.gsum).sum();
        let from_priorities: f64 = self.priorities.iter().sum();
        (from_groups - self.gsum).abs() <= tol && (from_priorities - self.gsum).abs() <= tol
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn exponent(x: f64) -> i32 {
        x.log2().floor() as i32
    }

    #[test]
    fn prio_to_gid_boundary_rules() {
        let pt = PriorityTable::new(exponent(1e-12) - 1, 8);
        assert_eq!(pt.prio_to_gid(0.0).unwrap(), 0);
        assert!(pt.prio_to_gid(-1.0).is_err());
    }

    #[test]
    fn insert_update_keep_group_sums_consistent() {
        let mp = 2f64.powi(exponent(1e-12));
        let minexp = exponent(1e-13) - 1;
        let mut pt = PriorityTable::new(minexp, 8);
        let priorities = [1e-13, 0.99 * mp, mp, 1.01e-4, 1e-4, 5.0, 0.0, 1e10];
        for (pid, &r) in priorities.iter().enumerate() {
            pt.insert(pid, r).unwrap();
        }
        assert!(pt.invariant_holds(1e-9 * pt.gsum().max(1.0)));

        // Update pid 1 to a nearby value; same group, sums stay consistent.
        pt.update(1, 0.99 * mp, 0.999 * mp).unwrap();
        assert!(pt.invariant_holds(1e-9 * pt.gsum().max(1.0)));

        // Inserting a much bigger priority extends the group table.
        pt.update(7, 1e10, 1e12).unwrap();
        assert!(pt.invariant_holds(1e-6 * pt.gsum().max(1.0)));
    }

    #[test]
    fn zero_priority_pid_is_never_sampled() {
        let mut pt = PriorityTable::new(-10, 3);
        pt.insert(0, 0.0).unwrap();
        pt.insert(1, 4.0).unwrap();
        pt.insert(2, 0.0).unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..1000 {
            assert_eq!(pt.sample(&mut rng), Some(1));
        }
    }

    #[test]
    fn sampling_respects_relative_weight() {
        let mut pt = PriorityTable::new(-4, 2);
        pt.insert(0, 1.0).unwrap();
        pt.insert(1, 3.0).unwrap();
        let mut rng = SmallRng::seed_from_u64(7);
        let mut count1 = 0;
        let n = 20_000;
        for _ in 0..n {
            if pt.sample(&mut rng) == Some(1) {
                count1 += 1;
            }
        }
        let frac = count1 as f64 / n as f64;
        assert!((frac - 0.75).abs() < 0.02, "fraction {frac} should be near 0.75");
    }

    #[test]
    fn negative_priority_is_rejected() {
        let mut pt = PriorityTable::new(-4, 1);
        assert!(pt.insert(0, -1.0).is_err());
    }

    #[test]
    fn update_below_initial_floor_widens_it_instead_of_erroring() {
        let mut pt = PriorityTable::new(5, 4);
        pt.insert(0, 75.0).unwrap();
        pt.insert(1, 0.0).unwrap();
        pt.insert(2, 0.0).unwrap();
        pt.insert(3, 0.0).unwrap();
        assert!(pt.invariant_holds(1e-9));

        // A jump disabled at construction turns on far below the
        // table's starting floor; this must not be rejected.
        pt.update(3, 0.0, 0.3).unwrap();
        assert!(pt.invariant_holds(1e-9 * pt.gsum().max(1.0)));
        assert_eq!(pt.priority(3), 0.3);
        assert_eq!(pt.priority(0), 75.0);

        let mut rng = SmallRng::seed_from_u64(3);
        let mut saw = std::collections::HashSet::new();
        for _ in 0..2000 {
            if let Some(pid) = pt.sample(&mut rng) {
                saw.insert(pid);
            }
        }
        assert!(saw.contains(&3));
    }
}
