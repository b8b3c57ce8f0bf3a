//! A concurrent free-list of [`JitMap`]s, mirroring
//! `sola_bytecode::ChunkPool`'s contract exactly (spec §5: "the JIT-friendly
//! map pool follows the same contract" as the chunk pool).

use crate::jit_map::JitMap;
use crossbeam_deque::{Injector, Steal};
use std::hash::Hash;

/// Thread-safe pool of reusable [`JitMap`]s. `acquire` resets entries but
/// keeps capacity; `release` clears and returns ownership to the pool —
/// exactly `ChunkPool`'s `acquire`/`release` contract.
#[derive(Default)]
pub struct JitMapPool<K, V> {
    free: Injector<JitMap<K, V>>,
}

impl<K: Hash + Eq + Clone, V: Clone> JitMapPool<K, V> {
    pub fn new() -> Self {
        Self { free: Injector::new() }
    }

    pub fn acquire(&self) -> JitMap<K, V> {
        loop {
            match self.free.steal() {
                Steal::Success(mut map) => {
                    map.clear();
                    return map;
                }
                Steal::Retry => continue,
                Steal::Empty => return JitMap::new(),
            }
        }
    }

    pub fn release(&self, mut map: JitMap<K, V>) {
        map.clear();
        self.free.push(map);
    }
}
