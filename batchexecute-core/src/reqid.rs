//! Request id generation for the `_reqid` query parameter.

use std::sync::{Mutex, PoisonError};

use rand::Rng;

/// Spacing between consecutive request ids.
const SEQUENCE_STEP: u64 = 100_000;

/// Generates strictly increasing request ids.
///
/// Ids are `base + sequence * 100000`, where `base` is a random four digit
/// number picked once at construction and `sequence` counts calls to
/// [`next`](Self::next) starting at zero.
///
/// The generator is an ordinary owned value: share it between clients by
/// wrapping it in an `Arc`.
///
/// # Example
///
/// ```
/// use batchexecute_core::SequenceIdGenerator;
///
/// let reqid = SequenceIdGenerator::with_base(1234);
/// assert_eq!(reqid.next(), "1234");
/// assert_eq!(reqid.next(), "101234");
/// reqid.reset();
/// assert_eq!(reqid.next(), "1234");
/// ```
#[derive(Debug)]
pub struct SequenceIdGenerator {
    base: u64,
    sequence: Mutex<u64>,
}

impl SequenceIdGenerator {
    /// Create a generator with a random base in `1000..=9999`.
    pub fn new() -> Self {
        Self::with_base(rand::rng().random_range(1000..=9999))
    }

    /// Create a generator with a fixed base.
    pub fn with_base(base: u64) -> Self {
        Self {
            base,
            sequence: Mutex::new(0),
        }
    }

    /// The base chosen at construction.
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Return the next id and advance the sequence.
    pub fn next(&self) -> String {
        // The counter is always left consistent, so a poisoned lock is safe
        // to reuse.
        let mut sequence = self.sequence.lock().unwrap_or_else(PoisonError::into_inner);
        let id = self.base + *sequence * SEQUENCE_STEP;
        *sequence += 1;
        id.to_string()
    }

    /// Restart the sequence at zero, keeping the base.
    pub fn reset(&self) {
        *self.sequence.lock().unwrap_or_else(PoisonError::into_inner) = 0;
    }
}

impl Default for SequenceIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_random_base_in_range() {
        for _ in 0..100 {
            let reqid = SequenceIdGenerator::new();
            assert!((1000..=9999).contains(&reqid.base()));
        }
    }

    #[test]
    fn test_sequence_steps_by_100000() {
        let reqid = SequenceIdGenerator::with_base(4321);
        assert_eq!(reqid.next(), "4321");
        assert_eq!(reqid.next(), "104321");
        assert_eq!(reqid.next(), "204321");
    }

    #[test]
    fn test_strictly_increasing() {
        let reqid = SequenceIdGenerator::new();
        let mut last = 0u64;
        for _ in 0..50 {
            let id: u64 = reqid.next().parse().unwrap();
            assert!(id > last);
            last = id;
        }
    }

    #[test]
    fn test_reset_keeps_base() {
        let reqid = SequenceIdGenerator::with_base(1000);
        reqid.next();
        reqid.next();
        reqid.reset();
        assert_eq!(reqid.base(), 1000);
        assert_eq!(reqid.next(), "1000");
    }

    #[test]
    fn test_concurrent_callers_get_unique_ids() {
        let reqid = Arc::new(SequenceIdGenerator::with_base(5555));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reqid = Arc::clone(&reqid);
                std::thread::spawn(move || (0..100).map(|_| reqid.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id");
            }
        }
        assert_eq!(seen.len(), 800);
        assert_eq!(reqid.next(), (5555 + 800 * SEQUENCE_STEP).to_string());
    }
}
