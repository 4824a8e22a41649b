use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimited {
    pub retry_after: Duration,
}

impl RateLimited {
    /// Wait rounded up to whole seconds, for user-facing messages.
    pub fn retry_after_secs(&self) -> u64 {
        let secs = self.retry_after.as_secs();
        if self.retry_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }
}

/// Token bucket refilled in discrete steps: every `refill_interval`,
/// `refill_amount` tokens are added up to `capacity`.
///
/// The refill clock starts at the first acquisition made while the bucket is
/// full, so a bucket with `refill_amount == capacity` behaves as a window of
/// `capacity` attempts opened by the first attempt.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: u32,
    tokens: u32,
    refill_amount: u32,
    refill_interval: Duration,
    last_refill: Option<Instant>,
}

impl TokenBucket {
    pub fn new(capacity: u32, refill_amount: u32, refill_interval: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            tokens: capacity,
            refill_amount: refill_amount.max(1),
            refill_interval: refill_interval.max(Duration::from_millis(1)),
            last_refill: None,
        }
    }

    /// At most `max_attempts` acquisitions per `window`.
    pub fn per_window(max_attempts: u32, window: Duration) -> Self {
        Self::new(max_attempts, max_attempts, window)
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn try_acquire(&mut self) -> Result<(), RateLimited> {
        self.try_acquire_at(Instant::now())
    }

    pub fn try_acquire_at(&mut self, now: Instant) -> Result<(), RateLimited> {
        self.refill(now);

        if self.tokens == self.capacity {
            self.last_refill = Some(now);
        }

        if self.tokens == 0 {
            let retry_after = self.time_until_refill(now);
            debug!("Rate limit hit, retry in {:?}", retry_after);
            return Err(RateLimited { retry_after });
        }

        self.tokens -= 1;
        Ok(())
    }

    pub fn available_at(&mut self, now: Instant) -> u32 {
        self.refill(now);
        self.tokens
    }

    fn refill(&mut self, now: Instant) {
        let Some(last) = self.last_refill else {
            return;
        };

        let elapsed = now.saturating_duration_since(last);
        let periods = (elapsed.as_nanos() / self.refill_interval.as_nanos()) as u64;
        if periods == 0 {
            return;
        }

        let added = periods.saturating_mul(self.refill_amount as u64);
        self.tokens = (self.tokens as u64 + added).min(self.capacity as u64) as u32;

        let advance = self
            .refill_interval
            .checked_mul(periods.min(u32::MAX as u64) as u32)
            .unwrap_or(elapsed);
        self.last_refill = Some(last + advance);
    }

    fn time_until_refill(&self, now: Instant) -> Duration {
        match self.last_refill {
            Some(last) => {
                let next = last + self.refill_interval;
                next.saturating_duration_since(now)
            }
            None => Duration::ZERO,
        }
    }
}

/// At most `max_attempts` acquisitions in any rolling `window`. Keeps the
/// instants of the most recent accepted attempts; the wait reported when full
/// is the time until the oldest of them leaves the window.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    max_attempts: usize,
    window: Duration,
    attempts: VecDeque<Instant>,
}

impl SlidingWindow {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        let max_attempts = max_attempts.max(1) as usize;
        Self {
            max_attempts,
            window: window.max(Duration::from_millis(1)),
            attempts: VecDeque::with_capacity(max_attempts),
        }
    }

    pub fn try_acquire(&mut self) -> Result<(), RateLimited> {
        self.try_acquire_at(Instant::now())
    }

    pub fn try_acquire_at(&mut self, now: Instant) -> Result<(), RateLimited> {
        self.expire(now);

        if self.attempts.len() >= self.max_attempts {
            let retry_after = self
                .attempts
                .front()
                .map(|oldest| (*oldest + self.window).saturating_duration_since(now))
                .unwrap_or_default();
            debug!("Rate limit hit, retry in {:?}", retry_after);
            return Err(RateLimited { retry_after });
        }

        self.attempts.push_back(now);
        Ok(())
    }

    pub fn remaining_at(&mut self, now: Instant) -> u32 {
        self.expire(now);
        (self.max_attempts - self.attempts.len()) as u32
    }

    fn expire(&mut self, now: Instant) {
        while let Some(oldest) = self.attempts.front() {
            if now.saturating_duration_since(*oldest) >= self.window {
                self.attempts.pop_front();
            } else {
                break;
            }
        }
    }
}
