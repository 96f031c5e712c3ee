//! Identifier minting for domain records (policy, claim, payment numbers).
//!
//! Components that mint identifiers receive an [`IdGenerator`] at construction
//! instead of deriving ids from wall-clock time.

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

pub trait IdGenerator: Send + Sync {
    /// Mint a new identifier such as `POL-00001`.
    fn next_id(&self, prefix: &str) -> String;
}

/// Monotonic counter, zero-padded. Unique per generator instance.
#[derive(Debug)]
pub struct SequentialIds {
    next: AtomicU64,
    width: usize,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
            width: 5,
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self, prefix: &str) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{:0width$}", prefix, n, width = self.width)
    }
}

/// Random v4 UUID suffix; safe across processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&self, prefix: &str) -> String {
        let simple = Uuid::new_v4().simple().to_string().to_uppercase();
        format!("{}-{}", prefix, &simple[..12])
    }
}
