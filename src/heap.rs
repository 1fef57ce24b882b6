//! An indexed binary min-heap keyed by jump index — the structure the
//! Coevolve aggregator maintains of candidate fire times. Supports
//! `update-key` in `O(log N)`, which a plain `BinaryHeap` cannot do
//! without a full rebuild.

#[derive(Clone, Debug)]
pub struct IndexedMinHeap {
    heap: Vec<usize>,
    pos: Vec<usize>,
    keys: Vec<f64>,
}

impl IndexedMinHeap {
    /// Builds a heap over `pids` `0..keys.len()`, each keyed by `keys[pid]`.
    pub fn from_keys(keys: Vec<f64>) -> Self {
        let n = keys.len();
        let mut h = IndexedMinHeap { heap: (0..n).collect(), pos: (0..n).collect(), keys };
        for i in (0..n / 2).rev() {
            h.sift_down(i);
        }
        h
    }

    pub fn peek(&self) -> Option<(usize, f64)> {
        self.heap.first().map(|&pid| (pid, self.keys[pid]))
    }

    pub fn key(&self, pid: usize) -> f64 {
        self.keys[pid]
    }

    pub fn update(&mut self, pid: usize, new_key: f64) {
        let old_key = self.keys[pid];
        self.keys[pid] = new_key;
        let i = self.pos[pid];
        if new_key < old_key {
            self.sift_up(i);
        } else {
            self.sift_down(i);
        }
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.heap.swap(i, j);
        self.pos[self.heap[i]] = i;
        self.pos[self.heap[j]] = j;
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.keys[self.heap[i]] < self.keys[self.heap[parent]] {
                self.swap(i, parent);
                i = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let n = self.heap.len();
        loop {
            let left = 2 * i + 1;
            let right = 2 * i + 2;
            let mut smallest = i;
            if left < n && self.keys[self.heap[left]] < self.keys[self.heap[smallest]] {
                smallest = left;
            }
            if right < n && self.keys[self.heap[right]] < self.keys[self.heap[smallest]] {
                smallest = right;
            }
            if smallest == i {
                break;
            }
            self.swap(i, smallest);
            i = smallest;
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peek_returns_global_minimum() {
        let h = IndexedMinHeap::from_keys(vec![5.0, 1.0, 3.0, 2.0]);
        assert_eq!(h.peek(), Some((1, 1.0)));
    }

    #[test]
    fn update_reorders_the_heap() {
        let mut h = IndexedMinHeap::from_keys(vec![5.0, 1.0, 3.0, 2.0]);
        h.update(1, 10.0); // pid 1 was the min, push it up
        assert_eq!(h.peek(), Some((3, 2.0)));
        h.update(3, 0.5);
        assert_eq!(h.peek(), Some((3, 0.5)));
    }

    #[test]
    fn heap_stays_consistent_under_many_random_updates() {
        use rand::rngs::SmallRng;
        use rand::{Rng, SeedableRng};
        let mut rng = SmallRng::seed_from_u64(99);
        let n = 50;
        let mut keys: Vec<f64> = (0..n).map(|_| rng.gen::<f64>() * 100.0).collect();
        let mut h = IndexedMinHeap::from_keys(keys.clone());
        for _ in 0..2000 {
            let pid = rng.gen_range(0..n);
            let new_key = rng.gen::<f64>() * 100.0;
            keys[pid] = new_key;
            h.update(pid, new_key);
            let (min_pid, min_key) = h.peek().unwrap();
            let expected_min =
                keys.iter().cloned().fold(f64::INFINITY, f64::min);
            assert_eq!(min_key, expected_min);
            assert_eq!(keys[min_pid], min_key);
        }
    }
}
