use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Collision-free order ID generator: a monotonic counter combined with a
/// high-resolution timestamp. Safe to share across threads.
pub struct OrderIdGenerator {
    counter: AtomicU64,
}

impl OrderIdGenerator {
    pub fn new() -> Self {
        Self { counter: AtomicU64::new(0) }
    }

    pub fn next(&self) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros())
            .unwrap_or(0);
        format!("ord-{micros}-{seq}")
    }
}

impl Default for OrderIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
