//! Sparse, lazily segmented bit set over entity ids.
//!
//! The id space is cut into fixed-size segments. A segment's bit words are
//! allocated the first time an id inside it is set; reads of untouched
//! segments never allocate. Memory is therefore proportional to the number
//! of distinct segments touched, independent of the largest id seen.

use rustc_hash::FxHashMap;

use crate::entity::EntityId;

/// Default segment size: 2^25 ids (4 MiB of bits) per segment.
pub const DEFAULT_SEGMENT_SHIFT: u32 = 25;

/// Bits per backing word.
const WORD_BITS: u64 = 64;

/// Grow-on-demand membership set keyed by [`EntityId`].
///
/// # Memory Complexity
///
/// O(s · segment size / 8) bytes where s = number of distinct segments
/// that ever had an id set.
#[derive(Debug, Clone)]
pub struct SparseIdSet {
    /// Segment number -> bit words of that segment.
    segments: FxHashMap<u64, Box<[u64]>>,
    /// log2 of ids per segment.
    shift: u32,
}

impl Default for SparseIdSet {
    fn default() -> Self {
        Self::new()
    }
}

impl SparseIdSet {
    /// Create an empty set with the default segment size.
    pub fn new() -> Self {
        Self::with_segment_shift(DEFAULT_SEGMENT_SHIFT)
    }

    /// Create an empty set with 2^`shift` ids per segment.
    ///
    /// The segment must hold at least one full word and at most 2^32 bits
    /// (512 MiB), so `shift` is clamped to `6..=32`.
    pub fn with_segment_shift(shift: u32) -> Self {
        Self {
            segments: FxHashMap::default(),
            shift: shift.clamp(6, 32),
        }
    }

    /// Number of ids covered by one segment.
    #[inline]
    pub fn segment_len(&self) -> u64 {
        1 << self.shift
    }

    #[inline]
    fn locate(&self, id: EntityId) -> (u64, usize, u64) {
        let segment = id >> self.shift;
        let offset = id & (self.segment_len() - 1);
        let word = (offset / WORD_BITS) as usize;
        let mask = 1u64 << (offset % WORD_BITS);
        (segment, word, mask)
    }

    /// Mark `id` as a member.
    #[inline]
    pub fn set(&mut self, id: EntityId) {
        let (segment, word, mask) = self.locate(id);
        let words = (self.segment_len() / WORD_BITS) as usize;
        let bits = self
            .segments
            .entry(segment)
            .or_insert_with(|| vec![0u64; words].into_boxed_slice());
        bits[word] |= mask;
    }

    /// Check whether `id` was set. Never allocates.
    #[inline]
    pub fn get(&self, id: EntityId) -> bool {
        let (segment, word, mask) = self.locate(id);
        match self.segments.get(&segment) {
            Some(bits) => bits[word] & mask != 0,
            None => false,
        }
    }

    /// Reset every bit to zero, keeping touched segments allocated for reuse.
    pub fn clear(&mut self) {
        for bits in self.segments.values_mut() {
            bits.fill(0);
        }
    }

    /// Number of ids currently set.
    pub fn count(&self) -> u64 {
        self.segments
            .values()
            .flat_map(|bits| bits.iter())
            .map(|w| u64::from(w.count_ones()))
            .sum()
    }

    /// Number of segments that have backing storage.
    #[inline]
    pub fn segments_allocated(&self) -> usize {
        self.segments.len()
    }

    /// Bytes held by segment storage.
    pub fn allocated_bytes(&self) -> usize {
        self.segments.len() * (self.segment_len() / 8) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashSet;

    #[test]
    fn test_get_before_set_is_false() {
        let set = SparseIdSet::new();
        assert!(!set.get(0));
        assert!(!set.get(1));
        assert!(!set.get(u32::MAX as u64));
        assert_eq!(set.segments_allocated(), 0);
    }

    #[test]
    fn test_set_then_get() {
        let mut set = SparseIdSet::new();
        set.set(42);
        assert!(set.get(42));
        assert!(!set.get(41));
        assert!(!set.get(43));

        // idempotent
        set.set(42);
        assert!(set.get(42));
        assert_eq!(set.count(), 1);
    }

    #[test]
    fn test_segment_boundaries() {
        let mut set = SparseIdSet::with_segment_shift(10);
        let len = set.segment_len();
        assert_eq!(len, 1024);

        let ids = [0, len - 1, len, 2 * len - 1, 2 * len];
        for &id in &ids {
            assert!(!set.get(id));
            set.set(id);
            assert!(set.get(id));
        }
        for &id in &ids {
            assert!(set.get(id), "id {} lost after later sets", id);
        }
        assert!(!set.get(1));
        assert!(!set.get(len + 1));
        assert!(!set.get(len - 2));
        assert_eq!(set.segments_allocated(), 3);
    }

    #[test]
    fn test_far_ids_allocate_only_touched_segments() {
        let mut set = SparseIdSet::new();
        set.set(1);
        set.set(1 << 31);
        set.set(1 << 40);
        set.set(u64::MAX);

        assert!(set.get(1));
        assert!(set.get(1 << 31));
        assert!(set.get(1 << 40));
        assert!(set.get(u64::MAX));
        assert!(!set.get((1 << 40) + 1));
        assert_eq!(set.segments_allocated(), 4);
    }

    #[test]
    fn test_get_does_not_allocate() {
        let set = SparseIdSet::new();
        for id in [0, 1 << 20, 1 << 33, 1 << 50] {
            assert!(!set.get(id));
        }
        assert_eq!(set.segments_allocated(), 0);
        assert_eq!(set.allocated_bytes(), 0);
    }

    #[test]
    fn test_clear_keeps_segments() {
        let mut set = SparseIdSet::with_segment_shift(8);
        set.set(3);
        set.set(1000);
        let segments = set.segments_allocated();

        set.clear();
        assert!(!set.get(3));
        assert!(!set.get(1000));
        assert_eq!(set.count(), 0);
        assert_eq!(set.segments_allocated(), segments);

        set.set(1000);
        assert!(set.get(1000));
    }

    #[test]
    fn test_shift_is_clamped() {
        let set = SparseIdSet::with_segment_shift(1);
        assert_eq!(set.segment_len(), 64);

        let set = SparseIdSet::with_segment_shift(60);
        assert_eq!(set.segment_len(), 1 << 32);
    }

    #[test]
    fn test_matches_hashset_oracle() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut set = SparseIdSet::with_segment_shift(12);
        let mut oracle = HashSet::new();

        for _ in 0..5_000 {
            let id: u64 = rng.gen_range(0..1_000_000);
            set.set(id);
            oracle.insert(id);
        }

        for id in 0..1_000_000u64 {
            assert_eq!(set.get(id), oracle.contains(&id), "mismatch at {}", id);
        }
        assert_eq!(set.count(), oracle.len() as u64);
    }
}
