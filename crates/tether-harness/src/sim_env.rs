//! Simulated environment.
//!
//! Randomness comes from a seeded ChaCha RNG so every run with the same seed
//! generates the same message ids. Time has two sources: the tokio clock,
//! which turmoil drives virtually inside a simulation, or a manual clock
//! advanced explicitly by synchronous model tests.

use std::{
    future::Future,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use chrono::{DateTime, TimeZone, Utc};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tether_core::Environment;

/// Seed used by [`SimEnv::new`].
pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone, Copy)]
enum Clock {
    Tokio,
    Manual(Duration),
}

#[derive(Debug)]
struct Inner {
    rng: ChaCha8Rng,
    clock: Clock,
}

/// Deterministic [`Environment`] for simulations.
#[derive(Debug, Clone)]
pub struct SimEnv {
    origin: Instant,
    inner: Arc<Mutex<Inner>>,
}

impl SimEnv {
    /// Tokio-clocked environment with [`DEFAULT_SEED`].
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    /// Tokio-clocked environment with an explicit seed.
    ///
    /// Use inside turmoil hosts, where the tokio clock is simulated.
    pub fn with_seed(seed: u64) -> Self {
        Self::build(seed, Clock::Tokio, tokio::time::Instant::now().into_std())
    }

    /// Manually clocked environment. Time moves only through
    /// [`SimEnv::advance`].
    pub fn manual(seed: u64) -> Self {
        Self::build(seed, Clock::Manual(Duration::ZERO), Instant::now())
    }

    fn build(seed: u64, clock: Clock, origin: Instant) -> Self {
        Self {
            origin,
            inner: Arc::new(Mutex::new(Inner { rng: ChaCha8Rng::seed_from_u64(seed), clock })),
        }
    }

    /// Move a manual clock forward. No effect on a tokio clock.
    pub fn advance(&self, by: Duration) {
        if let Clock::Manual(elapsed) = &mut self.lock().clock {
            *elapsed += by;
        }
    }

    /// Time since this environment was created.
    pub fn elapsed(&self) -> Duration {
        self.now().saturating_duration_since(self.origin)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for SimEnv {
    fn now(&self) -> Instant {
        match self.lock().clock {
            Clock::Tokio => tokio::time::Instant::now().into_std(),
            Clock::Manual(elapsed) => self.origin + elapsed,
        }
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        let epoch = Utc.timestamp_opt(1_767_225_600, 0).single().unwrap_or(DateTime::UNIX_EPOCH);
        let elapsed = chrono::Duration::from_std(self.elapsed()).unwrap_or(chrono::Duration::zero());
        epoch + elapsed
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        let manual = matches!(self.lock().clock, Clock::Manual(_));
        if manual {
            self.advance(duration);
        }
        async move {
            if !manual {
                tokio::time::sleep(duration).await;
            }
        }
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.lock().rng.fill_bytes(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_bytes() {
        let a = SimEnv::manual(7);
        let b = SimEnv::manual(7);
        assert_eq!(a.random_u64(), b.random_u64());
        assert_ne!(a.random_u64(), SimEnv::manual(8).random_u64());
    }

    #[test]
    fn manual_clock_moves_only_when_advanced() {
        let env = SimEnv::manual(1);
        let start = env.now();
        assert_eq!(env.now(), start);

        env.advance(Duration::from_secs(3));
        assert_eq!(env.now() - start, Duration::from_secs(3));
        assert_eq!(env.wall_clock().timestamp(), 1_767_225_603);
    }
}
