//! The JIT-friendly hash map (spec §4.7): open addressing with linear
//! probing, power-of-two capacities, a 0.75 load-factor growth trigger, and
//! tombstone deletion. The multiplicative-mix hash uses a fixed
//! golden-ratio constant so a JIT backend can inline the same mix function
//! a generated lookup would need.

use std::hash::{BuildHasher, Hash};

/// 2^64 / golden ratio, rounded to an odd integer — the standard
/// Fibonacci-hashing multiplier.
const GOLDEN_RATIO_64: u64 = 0x9E37_79B9_7F4A_7C15;

/// Mixes a raw hash through the golden-ratio multiplier so nearby input
/// hashes spread across the table instead of clustering.
#[inline]
pub const fn golden_mix(hash: u64) -> u64 {
    hash.wrapping_mul(GOLDEN_RATIO_64)
}

const INITIAL_CAPACITY: usize = 8;
const LOAD_FACTOR_NUM: usize = 3;
const LOAD_FACTOR_DEN: usize = 4;

#[derive(Clone)]
enum Slot<K, V> {
    Empty,
    Occupied(K, V),
    Tombstone,
}

/// Open-addressed map with linear probing. `K` must be `Hash + Eq`; the
/// internal hasher is `rustc_hash::FxHasher`'s default build hasher, then
/// passed through [`golden_mix`] before being folded into a slot index.
pub struct JitMap<K, V> {
    slots: Vec<Slot<K, V>>,
    occupied: usize,
    tombstones: usize,
    hasher: rustc_hash::FxBuildHasher,
}

impl<K: Hash + Eq + Clone, V: Clone> Default for JitMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq + Clone, V: Clone> JitMap<K, V> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            occupied: 0,
            tombstones: 0,
            hasher: rustc_hash::FxBuildHasher::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.occupied
    }

    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Empties every slot while retaining the backing vector's capacity,
    /// so a pooled map can be reused without reallocating on its first
    /// insert after release.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = Slot::Empty;
        }
        self.occupied = 0;
        self.tombstones = 0;
    }

    fn index_for(&self, key: &K, capacity: usize) -> usize {
        let raw = self.hasher.hash_one(key);
        (golden_mix(raw) as usize) & (capacity - 1)
    }

    /// Linear probe from the ideal slot, returning `(slot_index, found_key_match)`
    /// and remembering the earliest tombstone seen, so an insert can reuse it.
    fn probe(&self, key: &K) -> ProbeResult {
        let capacity = self.slots.len();
        let start = self.index_for(key, capacity);
        let mut first_tombstone = None;
        for step in 0..capacity {
            let idx = (start + step) & (capacity - 1);
            match &self.slots[idx] {
                Slot::Empty => {
                    return ProbeResult {
                        slot: first_tombstone.unwrap_or(idx),
                        found: false,
                    }
                }
                Slot::Occupied(k, _) if k == key => {
                    return ProbeResult { slot: idx, found: true }
                }
                Slot::Occupied(..) => continue,
                Slot::Tombstone => {
                    if first_tombstone.is_none() {
                        first_tombstone = Some(idx);
                    }
                }
            }
        }
        // Table is full of tombstones/matches with no empty slot; caller
        // must have grown before this can happen.
        ProbeResult {
            slot: first_tombstone.unwrap_or(start),
            found: false,
        }
    }

    fn load_factor_would_exceed(&self, extra: usize) -> bool {
        if self.slots.is_empty() {
            return true;
        }
        (self.occupied + self.tombstones + extra) * LOAD_FACTOR_DEN
            > self.slots.len() * LOAD_FACTOR_NUM
    }

    fn grow(&mut self) {
        let new_capacity = if self.slots.is_empty() {
            INITIAL_CAPACITY
        } else {
            self.slots.len() * 2
        };
        let old = std::mem::replace(&mut self.slots, Vec::new());
        self.slots.resize_with(new_capacity, || Slot::Empty);
        self.occupied = 0;
        self.tombstones = 0;
        for slot in old {
            if let Slot::Occupied(k, v) = slot {
                self.insert(k, v);
            }
        }
    }

    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if self.load_factor_would_exceed(1) {
            self.grow();
        }
        let ProbeResult { slot, found } = self.probe(&key);
        let was_tombstone = matches!(self.slots[slot], Slot::Tombstone);
        let previous = match std::mem::replace(&mut self.slots[slot], Slot::Occupied(key, value)) {
            Slot::Occupied(_, old_value) => Some(old_value),
            _ => None,
        };
        if !found {
            self.occupied += 1;
            if was_tombstone {
                self.tombstones -= 1;
            }
        }
        previous
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        if self.slots.is_empty() {
            return None;
        }
        let ProbeResult { slot, found } = self.probe(key);
        if !found {
            return None;
        }
        match &self.slots[slot] {
            Slot::Occupied(_, v) => Some(v),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        if self.slots.is_empty() {
            return None;
        }
        let ProbeResult { slot, found } = self.probe(key);
        if !found {
            return None;
        }
        match std::mem::replace(&mut self.slots[slot], Slot::Tombstone) {
            Slot::Occupied(_, v) => {
                self.occupied -= 1;
                self.tombstones += 1;
                Some(v)
            }
            _ => None,
        }
    }
}

struct ProbeResult {
    slot: usize,
    found: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get_round_trips() {
        let mut map = JitMap::new();
        assert_eq!(map.insert("a", 1), None);
        assert_eq!(map.insert("b", 2), None);
        assert_eq!(map.get(&"a"), Some(&1));
        assert_eq!(map.get(&"b"), Some(&2));
        assert_eq!(map.get(&"c"), None);
    }

    #[test]
    fn insert_same_key_replaces_and_returns_old_value() {
        let mut map = JitMap::new();
        map.insert("a", 1);
        assert_eq!(map.insert("a", 2), Some(1));
        assert_eq!(map.get(&"a"), Some(&2));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn remove_then_reinsert_reuses_tombstone() {
        let mut map = JitMap::new();
        map.insert("a", 1);
        map.insert("b", 2);
        assert_eq!(map.remove(&"a"), Some(1));
        assert_eq!(map.get(&"a"), None);
        assert_eq!(map.len(), 1);
        map.insert("c", 3);
        assert_eq!(map.get(&"c"), Some(&3));
        assert_eq!(map.get(&"b"), Some(&2));
    }

    #[test]
    fn capacity_is_always_a_power_of_two() {
        let mut map = JitMap::new();
        for i in 0..100 {
            map.insert(i, i * 2);
        }
        assert!(map.capacity().is_power_of_two());
        for i in 0..100 {
            assert_eq!(map.get(&i), Some(&(i * 2)));
        }
    }

    #[test]
    fn growth_preserves_all_entries_past_load_factor() {
        let mut map = JitMap::new();
        // 7 inserts into an 8-slot table would cross 0.75 load factor on
        // the 7th; confirm it has already resized and every key survives.
        for i in 0..7 {
            map.insert(i, i);
        }
        assert!(map.capacity() > 8);
        for i in 0..7 {
            assert_eq!(map.get(&i), Some(&i));
        }
    }
}
