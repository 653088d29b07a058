// SPDX-License-Identifier: Apache-2.0

//! Binary max heap of work nodes ordered by gain.
//!
//! Each node records its own position (`heap_index`), which gives O(log n)
//! removal and re-keying of arbitrary entries. Equal gains are ordered by the
//! subject node id so that runs are reproducible.

use crate::cut_resub::node::{WorkPool, WorkRef};

#[derive(Debug, Default)]
pub struct GainHeap {
    array: Vec<WorkRef>,
}

/// True if `a` must be extracted before `b`.
fn precedes(pool: &WorkPool, a: WorkRef, b: WorkRef) -> bool {
    let (na, nb) = (&pool[a], &pool[b]);
    if na.gain() != nb.gain() {
        return na.gain() > nb.gain();
    }
    na.subject().id < nb.subject().id
}

impl GainHeap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empties the heap and reserves room for `capacity` entries. Nodes that
    /// were still present keep a stale position, so this is meant for the
    /// start of a run.
    pub fn init(&mut self, capacity: usize) {
        self.array.clear();
        self.array.reserve(capacity);
    }

    pub fn len(&self) -> usize {
        self.array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    pub fn put(&mut self, pool: &mut WorkPool, node: WorkRef) {
        debug_assert!(!pool[node].in_heap(), "{:?} is already in the heap", node);
        let pos = self.array.len();
        self.array.push(node);
        pool[node].heap_index = Some(pos);
        self.move_up(pool, pos);
    }

    /// Extracts the node with the largest gain.
    pub fn get(&mut self, pool: &mut WorkPool) -> Option<WorkRef> {
        let top = *self.array.first()?;
        self.remove_at(pool, 0);
        Some(top)
    }

    /// Removes `node`; does nothing if it is not in the heap.
    pub fn remove(&mut self, pool: &mut WorkPool, node: WorkRef) {
        if let Some(pos) = pool[node].heap_index {
            self.remove_at(pool, pos);
        }
    }

    /// Sets the gain of `node` and restores the heap order around it.
    pub fn update(&mut self, pool: &mut WorkPool, node: WorkRef, gain: usize) {
        pool[node].set_gain(gain);
        if let Some(pos) = pool[node].heap_index {
            self.resift(pool, pos);
        }
    }

    fn remove_at(&mut self, pool: &mut WorkPool, pos: usize) {
        let node = self.array[pos];
        pool[node].heap_index = None;
        let last = self.array.pop().expect("heap is non-empty");
        if pos < self.array.len() {
            self.array[pos] = last;
            pool[last].heap_index = Some(pos);
            self.resift(pool, pos);
        }
    }

    fn resift(&mut self, pool: &mut WorkPool, pos: usize) {
        if self.move_down(pool, pos) == pos {
            self.move_up(pool, pos);
        }
    }

    fn set(&mut self, pool: &mut WorkPool, pos: usize, node: WorkRef) {
        self.array[pos] = node;
        pool[node].heap_index = Some(pos);
    }

    /// Returns the final position of the element that started at `pos`.
    fn move_down(&mut self, pool: &mut WorkPool, mut pos: usize) -> usize {
        let n = self.array.len();
        loop {
            let left = pos * 2 + 1;
            if left >= n {
                return pos;
            }
            let right = left + 1;
            let mut child = left;
            if right < n && precedes(pool, self.array[right], self.array[left]) {
                child = right;
            }
            let (cur_node, child_node) = (self.array[pos], self.array[child]);
            if !precedes(pool, child_node, cur_node) {
                return pos;
            }
            self.set(pool, pos, child_node);
            self.set(pool, child, cur_node);
            pos = child;
        }
    }

    fn move_up(&mut self, pool: &mut WorkPool, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            let (cur_node, parent_node) = (self.array[pos], self.array[parent]);
            if !precedes(pool, cur_node, parent_node) {
                return;
            }
            self.set(pool, parent, cur_node);
            self.set(pool, pos, parent_node);
            pos = parent;
        }
    }

    /// Checks heap order and the back-pointers of every entry.
    pub fn check_invariant(&self, pool: &WorkPool) -> bool {
        self.array.iter().enumerate().all(|(pos, node)| {
            let parent_ok = pos == 0 || precedes(pool, self.array[(pos - 1) / 2], *node);
            parent_ok && pool[*node].heap_index == Some(pos)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sbj_graph::{IoInfo, SbjGraph};
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg64Mcg;

    fn make_pool(gains: &[usize]) -> (WorkPool, Vec<WorkRef>) {
        let mut g = SbjGraph::new("heap");
        let mut pool = WorkPool::new();
        let mut refs = Vec::new();
        for (i, gain) in gains.iter().enumerate() {
            let s = g.add_input(IoInfo::port("i", i));
            let r = pool.alloc();
            pool[r].set_subject(g.node(s));
            pool[r].set_gain(*gain);
            refs.push(r);
        }
        (pool, refs)
    }

    fn linear_max(pool: &WorkPool, present: &[WorkRef]) -> Option<WorkRef> {
        present.iter().copied().reduce(|best, n| {
            if precedes(pool, n, best) {
                n
            } else {
                best
            }
        })
    }

    #[test]
    fn test_get_orders_by_gain_then_id() {
        let (mut pool, refs) = make_pool(&[3, 5, 3, 0, 5]);
        let mut heap = GainHeap::new();
        heap.init(refs.len());
        for r in &refs {
            heap.put(&mut pool, *r);
        }
        let order: Vec<WorkRef> = std::iter::from_fn(|| heap.get(&mut pool)).collect();
        assert_eq!(order, vec![refs[1], refs[4], refs[0], refs[2], refs[3]]);
        assert!(refs.iter().all(|r| !pool[*r].in_heap()));
    }

    #[test]
    fn test_remove_and_update() {
        let (mut pool, refs) = make_pool(&[1, 2, 3, 4, 5, 6]);
        let mut heap = GainHeap::new();
        for r in &refs {
            heap.put(&mut pool, *r);
        }
        heap.remove(&mut pool, refs[5]);
        heap.remove(&mut pool, refs[5]);
        assert_eq!(heap.len(), 5);
        heap.update(&mut pool, refs[0], 10);
        assert!(heap.check_invariant(&pool));
        assert_eq!(heap.get(&mut pool), Some(refs[0]));
        heap.update(&mut pool, refs[4], 0);
        assert!(heap.check_invariant(&pool));
        assert_eq!(heap.get(&mut pool), Some(refs[3]));

        // Updating a node that is not in the heap only changes its gain.
        heap.update(&mut pool, refs[5], 42);
        assert_eq!(pool[refs[5]].gain(), 42);
        assert!(!pool[refs[5]].in_heap());
        assert_eq!(heap.len(), 3);
    }

    #[test]
    fn test_random_operations_match_linear_scan() {
        let mut rng = Pcg64Mcg::seed_from_u64(0x5eed);
        let gains: Vec<usize> = (0..64).map(|_| rng.gen_range(0..8)).collect();
        let (mut pool, refs) = make_pool(&gains);
        let mut heap = GainHeap::new();
        let mut present: Vec<WorkRef> = Vec::new();
        for _ in 0..2000 {
            match rng.gen_range(0..4) {
                0 => {
                    let r = refs[rng.gen_range(0..refs.len())];
                    if !pool[r].in_heap() {
                        heap.put(&mut pool, r);
                        present.push(r);
                    }
                }
                1 => {
                    let want = linear_max(&pool, &present);
                    let got = heap.get(&mut pool);
                    assert_eq!(got, want);
                    present.retain(|n| Some(*n) != got);
                }
                2 => {
                    let r = refs[rng.gen_range(0..refs.len())];
                    heap.remove(&mut pool, r);
                    present.retain(|n| *n != r);
                }
                _ => {
                    let r = refs[rng.gen_range(0..refs.len())];
                    heap.update(&mut pool, r, rng.gen_range(0..8));
                }
            }
            assert!(heap.check_invariant(&pool));
            assert_eq!(heap.len(), present.len());
        }
    }
}
