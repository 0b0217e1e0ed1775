//! CompactMap implementation
//!
//! Sharded open-addressing table of (key, offset, size) slots.

use crate::config::{Config, MAX_SHARD_BITS};
use crate::error::Result;

use super::NeedleValue;

/// Smallest slot count of a shard
const MIN_SHARD_CAPACITY: usize = 16;

/// Grow once len / capacity would exceed MAX_LOAD_NUM / MAX_LOAD_DEN
const MAX_LOAD_NUM: usize = 3;
const MAX_LOAD_DEN: usize = 4;

/// SplitMix64 finalizer. Needle keys are often sequential, so they are
/// mixed before choosing a shard or a home slot.
#[inline(always)]
fn mix64(key: u64) -> u64 {
    let mut h = key;
    h ^= h >> 30;
    h = h.wrapping_mul(0xbf58476d1ce4e5b9);
    h ^= h >> 27;
    h = h.wrapping_mul(0x94d049bb133111eb);
    h ^= h >> 31;
    h
}

/// One 16-byte entry
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    key: u64,
    offset: u32,
    size: u32,
}

impl Slot {
    #[inline]
    fn value(&self) -> NeedleValue {
        NeedleValue::new(self.offset, self.size)
    }
}

/// A single linear-probing table
struct Shard {
    slots: Box<[Slot]>,
    /// One bit per slot
    occupied: Box<[u64]>,
    len: usize,
}

impl Shard {
    fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(MIN_SHARD_CAPACITY).next_power_of_two();
        Self {
            slots: vec![Slot::default(); capacity].into_boxed_slice(),
            occupied: vec![0u64; capacity.div_ceil(64)].into_boxed_slice(),
            len: 0,
        }
    }

    #[inline]
    fn mask(&self) -> usize {
        self.slots.len() - 1
    }

    #[inline]
    fn is_occupied(&self, i: usize) -> bool {
        self.occupied[i / 64] & (1u64 << (i % 64)) != 0
    }

    #[inline]
    fn mark(&mut self, i: usize) {
        self.occupied[i / 64] |= 1u64 << (i % 64);
    }

    #[inline]
    fn unmark(&mut self, i: usize) {
        self.occupied[i / 64] &= !(1u64 << (i % 64));
    }

    #[inline]
    fn home(&self, hash: u64) -> usize {
        hash as usize & self.mask()
    }

    /// `Ok(slot)` holding `key`, or `Err(empty slot)` where it would go.
    /// Terminates because the load factor stays below 1.
    fn probe(&self, key: u64, hash: u64) -> std::result::Result<usize, usize> {
        let mask = self.mask();
        let mut i = self.home(hash);
        loop {
            if !self.is_occupied(i) {
                return Err(i);
            }
            if self.slots[i].key == key {
                return Ok(i);
            }
            i = (i + 1) & mask;
        }
    }

    fn get(&self, key: u64, hash: u64) -> Option<NeedleValue> {
        self.probe(key, hash).ok().map(|i| self.slots[i].value())
    }

    fn set(&mut self, key: u64, hash: u64, value: NeedleValue) -> u32 {
        if let Ok(i) = self.probe(key, hash) {
            let slot = &mut self.slots[i];
            let old_size = slot.size;
            slot.offset = value.offset;
            slot.size = value.size;
            return old_size;
        }

        if (self.len + 1) * MAX_LOAD_DEN > self.slots.len() * MAX_LOAD_NUM {
            self.grow();
        }

        // Probe again: growth moves the insertion point
        let i = match self.probe(key, hash) {
            Ok(i) | Err(i) => i,
        };
        self.slots[i] = Slot {
            key,
            offset: value.offset,
            size: value.size,
        };
        self.mark(i);
        self.len += 1;
        0
    }

    fn delete(&mut self, key: u64, hash: u64) -> u32 {
        let mut hole = match self.probe(key, hash) {
            Ok(i) => i,
            Err(_) => return 0,
        };
        let removed = self.slots[hole].size;
        self.unmark(hole);
        self.len -= 1;

        // Backward-shift: pull later members of the run into the hole
        // whenever the hole lies between their home and their slot.
        let mask = self.mask();
        let mut j = hole;
        loop {
            j = (j + 1) & mask;
            if !self.is_occupied(j) {
                break;
            }
            let home = self.home(mix64(self.slots[j].key));
            if (hole.wrapping_sub(home) & mask) < (j.wrapping_sub(home) & mask) {
                self.slots[hole] = self.slots[j];
                self.mark(hole);
                self.unmark(j);
                hole = j;
            }
        }
        removed
    }

    fn grow(&mut self) {
        let mut bigger = Shard::with_capacity(self.slots.len() * 2);
        for (i, slot) in self.slots.iter().enumerate() {
            if self.is_occupied(i) {
                let hash = mix64(slot.key);
                if let Err(j) = bigger.probe(slot.key, hash) {
                    bigger.slots[j] = *slot;
                    bigger.mark(j);
                    bigger.len += 1;
                }
            }
        }
        tracing::trace!(
            from = self.slots.len(),
            to = bigger.slots.len(),
            entries = bigger.len,
            "grew compact map shard"
        );
        *self = bigger;
    }

    fn entries(&self) -> impl Iterator<Item = (u64, NeedleValue)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(move |(i, _)| self.is_occupied(*i))
            .map(|(_, slot)| (slot.key, slot.value()))
    }

    fn memory_usage(&self) -> usize {
        self.slots.len() * std::mem::size_of::<Slot>()
            + self.occupied.len() * std::mem::size_of::<u64>()
            + std::mem::size_of::<Self>()
    }
}

/// In-memory needle index: key → (offset, size)
///
/// Single-writer; callers serialize mutations externally.
pub struct CompactMap {
    shards: Vec<Shard>,
    shard_bits: u32,
    len: usize,
}

impl CompactMap {
    /// Create an empty map with the default layout
    pub fn new() -> Self {
        let config = Config::default();
        Self::with_layout(config.shard_bits, config.initial_shard_capacity)
    }

    /// Create an empty map sized from `config`
    pub fn from_config(config: &Config) -> Self {
        Self::with_layout(config.shard_bits, config.initial_shard_capacity)
    }

    /// Create an empty map with 2^shard_bits shards of `shard_capacity` slots
    pub fn with_layout(shard_bits: u32, shard_capacity: usize) -> Self {
        let shard_bits = shard_bits.min(MAX_SHARD_BITS);
        let shards = (0..1usize << shard_bits)
            .map(|_| Shard::with_capacity(shard_capacity))
            .collect();
        Self {
            shards,
            shard_bits,
            len: 0,
        }
    }

    #[inline]
    fn shard_index(&self, hash: u64) -> usize {
        if self.shard_bits == 0 {
            0
        } else {
            (hash >> (64 - self.shard_bits)) as usize
        }
    }

    /// Insert or overwrite; returns the previous size, or 0 if absent
    pub fn set(&mut self, key: u64, value: NeedleValue) -> u32 {
        let hash = mix64(key);
        let idx = self.shard_index(hash);
        let shard = &mut self.shards[idx];
        let before = shard.len;
        let old_size = shard.set(key, hash, value);
        self.len += shard.len - before;
        old_size
    }

    /// Look up a key
    pub fn get(&self, key: u64) -> Option<NeedleValue> {
        let hash = mix64(key);
        self.shards[self.shard_index(hash)].get(key, hash)
    }

    /// Remove a key; returns the removed size, or 0 if absent
    pub fn delete(&mut self, key: u64) -> u32 {
        let hash = mix64(key);
        let idx = self.shard_index(hash);
        let shard = &mut self.shards[idx];
        let before = shard.len;
        let removed = shard.delete(key, hash);
        self.len -= before - shard.len;
        removed
    }

    pub fn contains_key(&self, key: u64) -> bool {
        self.get(key).is_some()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total slots across all shards
    pub fn capacity(&self) -> usize {
        self.shards.iter().map(|s| s.slots.len()).sum()
    }

    /// Approximate heap + inline footprint in bytes
    pub fn memory_usage(&self) -> usize {
        self.shards.iter().map(Shard::memory_usage).sum::<usize>() + std::mem::size_of::<Self>()
    }

    /// Iterate live entries in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (u64, NeedleValue)> + '_ {
        self.shards.iter().flat_map(|shard| shard.entries())
    }

    /// Call `f` for each entry in unspecified order, stopping at its first error
    pub fn visit<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(u64, NeedleValue) -> Result<()>,
    {
        self.iter().try_for_each(|(key, value)| f(key, value))
    }

    /// Call `f` for each entry in ascending key order, stopping at its first error
    pub fn ascending_visit<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(u64, NeedleValue) -> Result<()>,
    {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_unstable_by_key(|(key, _)| *key);
        entries
            .into_iter()
            .try_for_each(|(key, value)| f(key, value))
    }
}

impl Default for CompactMap {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CompactMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompactMap")
            .field("len", &self.len)
            .field("shards", &self.shards.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// First `count` keys whose home slot in a 16-slot shard is `home`
    fn colliding_keys(home: usize, count: usize) -> Vec<u64> {
        (0u64..)
            .filter(|k| mix64(*k) as usize & (MIN_SHARD_CAPACITY - 1) == home)
            .take(count)
            .collect()
    }

    /// Every occupied slot must be reachable from its home without crossing an empty slot
    fn assert_runs_intact(shard: &Shard) {
        let mask = shard.mask();
        let mut occupied = 0;
        for i in 0..shard.slots.len() {
            if !shard.is_occupied(i) {
                continue;
            }
            occupied += 1;
            let mut j = shard.home(mix64(shard.slots[i].key));
            while j != i {
                assert!(shard.is_occupied(j), "gap at {} before slot {}", j, i);
                j = (j + 1) & mask;
            }
        }
        assert_eq!(occupied, shard.len);
    }

    #[test]
    fn test_slot_is_sixteen_bytes() {
        assert_eq!(std::mem::size_of::<Slot>(), 16);
    }

    #[test]
    fn test_backward_shift_keeps_collisions_reachable() {
        let keys = colliding_keys(3, 4);
        let mut shard = Shard::with_capacity(MIN_SHARD_CAPACITY);
        for (i, &k) in keys.iter().enumerate() {
            assert_eq!(shard.set(k, mix64(k), NeedleValue::new(i as u32 + 1, 10 * (i as u32 + 1))), 0);
        }
        assert_runs_intact(&shard);

        assert_eq!(shard.delete(keys[0], mix64(keys[0])), 10);
        assert_runs_intact(&shard);
        assert!(shard.get(keys[0], mix64(keys[0])).is_none());
        for &k in &keys[1..] {
            assert!(shard.get(k, mix64(k)).is_some());
        }

        assert_eq!(shard.delete(keys[2], mix64(keys[2])), 30);
        assert_runs_intact(&shard);
        assert_eq!(shard.get(keys[3], mix64(keys[3])), Some(NeedleValue::new(4, 40)));
    }

    #[test]
    fn test_backward_shift_wraps_around() {
        let keys = colliding_keys(MIN_SHARD_CAPACITY - 1, 3);
        let mut shard = Shard::with_capacity(MIN_SHARD_CAPACITY);
        for &k in &keys {
            shard.set(k, mix64(k), NeedleValue::new(1, 1));
        }
        // Run spans slots 15, 0, 1
        assert!(shard.is_occupied(0));
        shard.delete(keys[0], mix64(keys[0]));
        assert_runs_intact(&shard);
        assert!(shard.is_occupied(MIN_SHARD_CAPACITY - 1));
        assert!(!shard.is_occupied(1));
    }

    #[test]
    fn test_grow_preserves_entries() {
        let mut shard = Shard::with_capacity(MIN_SHARD_CAPACITY);
        for k in 0..100u64 {
            shard.set(k, mix64(k), NeedleValue::new(k as u32 + 1, k as u32));
        }
        assert!(shard.slots.len() >= 128);
        assert_runs_intact(&shard);
        for k in 0..100u64 {
            assert_eq!(shard.get(k, mix64(k)), Some(NeedleValue::new(k as u32 + 1, k as u32)));
        }
    }

    #[test]
    fn test_len_tracks_across_shards() {
        let mut map = CompactMap::with_layout(3, 16);
        for k in 0..1000u64 {
            map.set(k, NeedleValue::new(1, 1));
        }
        assert_eq!(map.len(), 1000);
        assert_eq!(map.shards.iter().map(|s| s.len).sum::<usize>(), 1000);
        for k in (0..1000u64).step_by(2) {
            map.delete(k);
        }
        assert_eq!(map.len(), 500);
        for shard in &map.shards {
            assert_runs_intact(shard);
        }
    }
}
