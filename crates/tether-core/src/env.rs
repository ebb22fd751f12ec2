//! Environment abstraction.
//!
//! Everything non-deterministic the transport needs: monotonic time for
//! deadlines, wall-clock time for envelope timestamps, sleeping, and random
//! bytes for message ids. Production uses the tokio clock and the OS RNG;
//! tests use a manually advanced clock and a seeded RNG.

use std::{
    future::Future,
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};

/// Source of time and randomness.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Current monotonic time. Deadlines are computed from this.
    fn now(&self) -> Instant;

    /// Current wall-clock time. Stamped onto outbound envelopes.
    fn wall_clock(&self) -> DateTime<Utc>;

    /// Sleep for `duration`.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;

    /// Fill `buffer` with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Random 64-bit value.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}
