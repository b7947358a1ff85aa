use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

#[cfg(not(target_arch = "wasm32"))]
const PARALLEL_THRESHOLD: usize = 1024;

/// Runs `f` over every element; rayon splits the slice into disjoint
/// sub-ranges, so each index is written by exactly one worker.
pub fn for_each_indexed_mut<T, F>(slice: &mut [T], f: F)
where
    T: Send,
    F: Fn(usize, &mut T) + Sync + Send,
{
    #[cfg(not(target_arch = "wasm32"))]
    {
        if slice.len() >= PARALLEL_THRESHOLD {
            slice
                .par_iter_mut()
                .enumerate()
                .for_each(|(idx, value)| f(idx, value));
            return;
        }
    }

    for (idx, value) in slice.iter_mut().enumerate() {
        f(idx, value);
    }
}

/// Fixed-size bit array that any worker may set concurrently. Bits are
/// only ever turned on; read it back after the parallel pass has joined.
pub struct AtomicBitSet {
    words: Vec<AtomicU64>,
    len: usize,
}

impl AtomicBitSet {
    pub fn new(len: usize) -> Self {
        let words = (0..len.div_ceil(64)).map(|_| AtomicU64::new(0)).collect();
        Self { words, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn set(&self, index: usize) {
        if index >= self.len {
            return;
        }
        self.words[index / 64].fetch_or(1 << (index % 64), Ordering::Relaxed);
    }

    pub fn get(&self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        self.words[index / 64].load(Ordering::Relaxed) & (1 << (index % 64)) != 0
    }

    pub fn count_ones(&self) -> usize {
        self.words
            .iter()
            .map(|word| word.load(Ordering::Relaxed).count_ones() as usize)
            .sum()
    }

    pub fn into_mask(self) -> Vec<bool> {
        (0..self.len).map(|idx| self.get(idx)).collect()
    }
}
