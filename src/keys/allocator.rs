//! Index allocation capability. The counter is owned by the application (it
//! persists `next_derivation_index` per owner); the engine only consumes it.

use super::MAX_INDEX;
use crate::error::{WalletError, WalletResult};
use std::sync::atomic::{AtomicU32, Ordering};

pub trait IndexAllocator: Send + Sync {
    /// Reserve an index that has never been handed out before.
    fn reserve_next_index(&self) -> WalletResult<u32>;
}

/// In-process monotonic counter, seeded from the persisted next index.
#[derive(Debug)]
pub struct AtomicIndexAllocator {
    next: AtomicU32,
}

impl AtomicIndexAllocator {
    pub fn starting_at(next: u32) -> Self {
        Self { next: AtomicU32::new(next) }
    }

    /// The index the next reservation will return (for persisting).
    pub fn peek(&self) -> u32 {
        self.next.load(Ordering::SeqCst)
    }
}

impl Default for AtomicIndexAllocator {
    fn default() -> Self { Self::starting_at(0) }
}

impl IndexAllocator for AtomicIndexAllocator {
    fn reserve_next_index(&self) -> WalletResult<u32> {
        self.next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| if n <= MAX_INDEX { Some(n + 1) } else { None })
            .map_err(|n| WalletError::InvalidIndex(format!("index space exhausted at {}", n)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_monotonic() {
        let alloc = AtomicIndexAllocator::starting_at(5);
        assert_eq!(alloc.reserve_next_index().unwrap(), 5);
        assert_eq!(alloc.reserve_next_index().unwrap(), 6);
        assert_eq!(alloc.peek(), 7);
    }

    #[test]
    fn test_exhaustion() {
        let alloc = AtomicIndexAllocator::starting_at(MAX_INDEX);
        assert_eq!(alloc.reserve_next_index().unwrap(), MAX_INDEX);
        assert!(matches!(alloc.reserve_next_index(), Err(WalletError::InvalidIndex(_))));
    }

    #[test]
    fn test_no_reuse_across_threads() {
        let alloc = Arc::new(AtomicIndexAllocator::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let alloc = alloc.clone();
                std::thread::spawn(move || (0..100).map(|_| alloc.reserve_next_index().unwrap()).collect::<Vec<_>>())
            })
            .collect();
        let mut seen = HashSet::new();
        for h in handles {
            for i in h.join().unwrap() {
                assert!(seen.insert(i), "index {} handed out twice", i);
            }
        }
        assert_eq!(seen.len(), 800);
    }
}
