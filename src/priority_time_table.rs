//! The windowed priority-time-table (`PTT`) used for
//! Next-Reaction-style scheduling.
//!
//! A sliding window `[mintime, mintime + ngroups*timestep)` is
//! partitioned into `ngroups` equal-width slots (indices `1..=ngroups`);
//! entries whose time falls outside the window live in a catch-all
//! slot `0` (the "zero"-style reserved bucket, reused from the same
//! idea as [`crate::priority_table`]'s group 0, but here it means
//! "outside the window" rather than "zero priority"). `getfirst` scans
//! slots in time order and only falls back to the unsorted catch-all
//! bucket once every real slot is empty.

use tracing::debug;

#[derive(Clone, Debug)]
pub struct PriorityTimeTable {
    mintime: f64,
    timestep: f64,
    ngroups: usize,
    groups: Vec<Vec<usize>>,
    pidtogroup: Vec<(usize, usize)>,
    times: Vec<f64>,
}

impl PriorityTimeTable {
    pub fn new(mintime: f64, timestep: f64, ngroups: usize, capacity: usize) -> Self {
        PriorityTimeTable {
            mintime,
            timestep,
            ngroups,
            groups: vec![Vec::new(); ngroups + 1],
            pidtogroup: vec![(0, usize::MAX); capacity],
            times: vec![f64::INFINITY; capacity],
        }
    }

    pub fn maxtime(&self) -> f64 {
        self.mintime + self.ngroups as f64 * self.timestep
    }

    fn slot_for(&self, t: f64) -> usize {
        if t < self.mintime || t >= self.maxtime() {
            return 0;
        }
        let raw = ((t - self.mintime) / self.timestep).ceil() as i64;
        raw.clamp(1, self.ngroups as i64) as usize
    }

    fn ensure_capacity(&mut self, pid: usize) {
        if pid >= self.times.len() {
            self.pidtogroup.resize(pid + 1, (0, usize::MAX));
            self.times.resize(pid + 1, f64::INFINITY);
        }
    }

    pub fn insert(&mut self, pid: usize, t: f64) {
        self.ensure_capacity(pid);
        let gid = self.slot_for(t);
        let slot = self.groups[gid].len();
        self.groups[gid].push(pid);
        self.pidtogroup[pid] = (gid, slot);
        self.times[pid] = t;
    }

    pub fn update(&mut self, pid: usize, t_new: f64) {
        let (old_gid, old_slot) = self.pidtogroup[pid];
        let new_gid = self.slot_for(t_new);
        if old_gid == new_gid {
            self.times[pid] = t_new;
            return;
        }
        let g = &mut self.groups[old_gid];
        let last = g.len() - 1;
        g.swap(old_slot, last);
        g.pop();
        if old_slot < g.len() {
            let moved = g[old_slot];
            self.pidtogroup[moved] = (old_gid, old_slot);
        }
        let new_slot = self.groups[new_gid].len();
        self.groups[new_gid].push(pid);
        self.pidtogroup[pid] = (new_gid, new_slot);
        self.times[pid] = t_new;
    }

    fn min_in(&self, gid: usize) -> Option<(usize, f64)> {
        let g = &self.groups[gid];
        let &first = g.first()?;
        let mut best_pid = first;
        let mut best_t = self.times[first];
        for &pid in &g[1..] {
            if self.times[pid] < best_t {
                best_t = self.times[pid];
                best_pid = pid;
            }
        }
        Some((best_pid, best_t))
    }

    /// `argmin` over all entries currently inside the window; falls
    /// back to the out-of-window bucket (also linearly scanned) only
    /// when every in-window slot is empty.
    pub fn getfirst(&self) -> Option<(usize, f64)> {
        for gid in 1..=self.ngroups {
            if let Some(found) = self.min_in(gid) {
                return Some(found);
            }
        }
        self.min_in(0)
    }

    /// Recomputes slotting for a new window. `O(N)`, called once the
    /// window is exhausted (every live entry has drifted outside it).
    pub fn rebuild(&mut self, new_mintime: f64, new_timestep: f64) {
        debug!(new_mintime, new_timestep, "rebuilding priority-time-table window");
        self.mintime = new_mintime;
        self.timestep = new_timestep;
        let mut new_groups = vec![Vec::new(); self.ngroups + 1];
        let mut new_pidtogroup = vec![(0usize, usize::MAX); self.pidtogroup.len()];
        for (pid, &t) in self.times.iter().enumerate() {
            let gid = self.slot_for(t);
            let slot = new_groups[gid].len();
            new_groups[gid].push(pid);
            new_pidtogroup[pid] = (gid, slot);
        }
        self.groups = new_groups;
        self.pidtogroup = new_pidtogroup;
    }

    pub fn mintime(&self) -> f64 {
        self.mintime
    }

    pub fn timestep(&self) -> f64 {
        self.timestep
    }
}
