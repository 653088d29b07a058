// SPDX-License-Identifier: Apache-2.0

//! Bucket queue keyed by subject-graph level.

use std::collections::VecDeque;

#[derive(Debug)]
pub struct LevelQueue<T> {
    buckets: Vec<VecDeque<T>>,
    count: usize,
    min_level: usize,
    max_level: usize,
}

impl<T: Copy> Default for LevelQueue<T> {
    fn default() -> Self {
        Self {
            buckets: Vec::new(),
            count: 0,
            min_level: 0,
            max_level: 0,
        }
    }
}

impl<T: Copy> LevelQueue<T> {
    pub fn new(max_level: usize) -> Self {
        let mut q = Self::default();
        q.init(max_level);
        q
    }

    /// Allocates `max_level + 1` empty buckets.
    pub fn init(&mut self, max_level: usize) {
        self.buckets.clear();
        self.buckets.resize_with(max_level + 1, VecDeque::new);
        self.count = 0;
        self.min_level = 0;
        self.max_level = 0;
    }

    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.count = 0;
        self.min_level = 0;
        self.max_level = 0;
    }

    pub fn num(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn put(&mut self, item: T, level: usize) {
        assert!(
            level < self.buckets.len(),
            "level {} is outside the queue range 0..={}",
            level,
            self.buckets.len().saturating_sub(1)
        );
        self.buckets[level].push_back(item);
        if self.count == 0 {
            self.min_level = level;
            self.max_level = level;
        } else {
            self.min_level = std::cmp::min(self.min_level, level);
            self.max_level = std::cmp::max(self.max_level, level);
        }
        self.count += 1;
    }

    /// Pops the oldest entry of the lowest non-empty level.
    ///
    /// `min_level` is moved up to the bucket the entry came from even if that
    /// bucket is now empty; later calls scan forward from there.
    pub fn getmin(&mut self) -> Option<T> {
        if self.count == 0 {
            return None;
        }
        for level in self.min_level..self.buckets.len() {
            if let Some(item) = self.buckets[level].pop_front() {
                self.min_level = level;
                self.count -= 1;
                return Some(item);
            }
        }
        panic!(
            "level queue claims {} entries but none found at or above level {}",
            self.count, self.min_level
        );
    }

    /// Pops the oldest entry of the highest non-empty level.
    pub fn getmax(&mut self) -> Option<T> {
        if self.count == 0 {
            return None;
        }
        for level in (0..=self.max_level).rev() {
            if let Some(item) = self.buckets[level].pop_front() {
                self.max_level = level;
                self.count -= 1;
                return Some(item);
            }
        }
        panic!(
            "level queue claims {} entries but none found at or below level {}",
            self.count, self.max_level
        );
    }
}
