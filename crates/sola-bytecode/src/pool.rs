//! A concurrent free-list of [`Chunk`]s, so hot code-generation paths reuse
//! backing storage instead of reallocating a fresh `Vec` per function.
//!
//! Grounded on the work-stealing queue the pack's scheduler code reaches for
//! (`crossbeam_deque`) rather than a hand-rolled lock-free stack — a single
//! global `Injector` is enough here since chunks are acquired and released,
//! never stolen between concurrent workers in contention.

use crate::chunk::Chunk;
use crossbeam_deque::{Injector, Steal};

/// Thread-safe pool of reusable chunks. `acquire` resets length but keeps
/// capacity; `release` clears and returns ownership to the pool.
#[derive(Default)]
pub struct ChunkPool {
    free: Injector<Chunk>,
}

impl ChunkPool {
    pub fn new() -> Self {
        Self {
            free: Injector::new(),
        }
    }

    /// Take a chunk from the pool, or allocate a fresh one if empty.
    pub fn acquire(&self) -> Chunk {
        loop {
            match self.free.steal() {
                Steal::Success(mut chunk) => {
                    chunk.reset();
                    return chunk;
                }
                Steal::Retry => continue,
                Steal::Empty => return Chunk::new(),
            }
        }
    }

    /// Return a chunk to the pool. The chunk must not be used again by the
    /// releasing caller; treat it as moved.
    pub fn release(&self, mut chunk: Chunk) {
        chunk.reset();
        self.free.push(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::Opcode;

    #[test]
    fn acquire_on_empty_pool_allocates_fresh_chunk() {
        let pool = ChunkPool::new();
        let chunk = pool.acquire();
        assert!(chunk.is_empty());
    }

    #[test]
    fn release_then_acquire_reuses_storage_cleared() {
        let pool = ChunkPool::new();
        let mut chunk = pool.acquire();
        chunk.write_op(Opcode::Pop, 1);
        assert!(!chunk.is_empty());
        pool.release(chunk);

        let reused = pool.acquire();
        assert!(reused.is_empty(), "released chunk must come back cleared");
    }
}
