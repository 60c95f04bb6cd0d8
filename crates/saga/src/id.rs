//! Order id allocation.
//!
//! Ids are 64-bit snowflakes in the Twitter layout, counted from a custom
//! epoch:
//!
//! ```text
//! | 1 bit unused | 41 bits ms since 2024-01-01 | 10 bits worker | 12 bits sequence |
//! ```

use std::time::Duration;

use common::OrderId;
use ferroid::{
    AtomicSnowflakeGenerator, IdGenStatus, MonotonicClock,
    SnowflakeTwitterId,
};
use thiserror::Error;

/// 2024-01-01T00:00:00Z in Unix milliseconds.
pub const CUSTOM_EPOCH_MS: u64 = 1_704_067_200_000;

const WORKER_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

/// Largest configurable worker id.
pub const MAX_WORKER_ID: u16 = (1 << WORKER_BITS) - 1;

/// Issues order ids.
///
/// Implementations must be thread-safe and never return the same id twice
/// within the process lifetime.
pub trait IdAllocator: Send + Sync {
    fn next_id(&self) -> OrderId;
}

/// Worker id outside `0..=MAX_WORKER_ID`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("worker id {0} exceeds {max}", max = MAX_WORKER_ID)]
pub struct InvalidWorkerId(pub u16);

/// Lock-free snowflake allocator backed by ferroid's atomic generator.
///
/// The clock is monotonic, so a wall clock stepping backwards never
/// produces a repeated id. Once a millisecond's 4096 sequence numbers are
/// used up, callers yield until the next tick.
pub struct SnowflakeIdAllocator {
    worker_id: u16,
    generator: AtomicSnowflakeGenerator<SnowflakeTwitterId, MonotonicClock>,
}

impl SnowflakeIdAllocator {
    pub fn new(worker_id: u16) -> Result<Self, InvalidWorkerId> {
        if worker_id > MAX_WORKER_ID {
            return Err(InvalidWorkerId(worker_id));
        }
        let clock = MonotonicClock::with_epoch(Duration::from_millis(CUSTOM_EPOCH_MS));
        Ok(Self {
            worker_id,
            generator: AtomicSnowflakeGenerator::new(u64::from(worker_id), clock),
        })
    }

    pub fn worker_id(&self) -> u16 {
        self.worker_id
    }
}

impl std::fmt::Debug for SnowflakeIdAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnowflakeIdAllocator")
            .field("worker_id", &self.worker_id)
            .finish_non_exhaustive()
    }
}

impl IdAllocator for SnowflakeIdAllocator {
    fn next_id(&self) -> OrderId {
        loop {
            match self.generator.next_id() {
                IdGenStatus::Ready { id } => return OrderId::new(id.to_raw()),
                IdGenStatus::Pending { .. } => std::thread::yield_now(),
            }
        }
    }
}

/// Splits an id into `(timestamp_ms_since_epoch, worker_id, sequence)`.
pub fn decompose(id: OrderId) -> (u64, u16, u16) {
    let raw = id.value();
    let timestamp = raw >> (WORKER_BITS + SEQUENCE_BITS);
    let worker = (raw >> SEQUENCE_BITS) & u64::from(MAX_WORKER_ID);
    let sequence = raw & SEQUENCE_MASK;
    (timestamp, worker as u16, sequence as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_rejects_out_of_range_worker() {
        assert_eq!(
            SnowflakeIdAllocator::new(1024).unwrap_err(),
            InvalidWorkerId(1024)
        );
        assert!(SnowflakeIdAllocator::new(MAX_WORKER_ID).is_ok());
    }

    #[test]
    fn test_ids_are_increasing_and_carry_worker() {
        let ids = SnowflakeIdAllocator::new(37).unwrap();
        let mut previous = ids.next_id();
        for _ in 0..10_000 {
            let next = ids.next_id();
            assert!(next > previous);
            assert_eq!(decompose(next).1, 37);
            previous = next;
        }
    }

    #[test]
    fn test_timestamp_counts_from_custom_epoch() {
        let ids = SnowflakeIdAllocator::new(1).unwrap();
        let (timestamp, _, _) = decompose(ids.next_id());

        let expected = chrono::Utc::now().timestamp_millis() as u64 - CUSTOM_EPOCH_MS;
        assert!(timestamp.abs_diff(expected) < 5_000, "{timestamp} vs {expected}");
        assert!(ids.next_id().value() >> 63 == 0);
    }

    #[test]
    fn test_exhausted_sequence_rolls_into_next_millisecond() {
        let ids = SnowflakeIdAllocator::new(2).unwrap();
        // More than one millisecond's worth of sequence numbers
        let issued: Vec<_> = (0..3 * 4096).map(|_| ids.next_id()).collect();

        assert!(issued.windows(2).all(|pair| pair[0] < pair[1]));
        let millis: HashSet<_> = issued.iter().map(|id| decompose(*id).0).collect();
        assert!(millis.len() >= 3);
    }

    #[test]
    fn test_concurrent_threads_never_collide() {
        let ids = Arc::new(SnowflakeIdAllocator::new(0).unwrap());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ids = Arc::clone(&ids);
                std::thread::spawn(move || (0..2_000).map(|_| ids.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 16_000);
    }
}
