//! Token-bucket rate limiter: the feed's responsibility to stay under a
//! provider's requests-per-minute budget (§4.6).

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Bucket of `capacity` tokens refilled continuously at `capacity` tokens
/// per `refill_period`. `acquire` sleeps until a token is available rather
/// than failing, since feed backpressure is expected to slow the caller
/// rather than error out.
pub struct TokenBucket {
    capacity: f64,
    refill_per_ms: f64,
    state: Mutex<BucketState>,
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// `max_requests_per_minute` tokens refill over a minute, draining
    /// linearly; the bucket starts full.
    pub fn per_minute(max_requests_per_minute: u32) -> Self {
        let capacity = max_requests_per_minute.max(1) as f64;
        Self {
            capacity,
            refill_per_ms: capacity / 60_000.0,
            state: Mutex::new(BucketState { tokens: capacity, last_refill: Instant::now() }),
        }
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed_ms = now.duration_since(state.last_refill).as_millis() as f64;
        state.tokens = (state.tokens + elapsed_ms * self.refill_per_ms).min(self.capacity);
        state.last_refill = now;
    }

    /// Block (async-sleep) until one token is available, then consume it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().expect("token bucket mutex poisoned");
                self.refill(&mut state);
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    None
                } else {
                    let deficit = 1.0 - state.tokens;
                    Some(Duration::from_millis((deficit / self.refill_per_ms).ceil() as u64))
                }
            };
            match wait {
                None => return,
                Some(d) => tokio::time::sleep(d).await,
            }
        }
    }
}
