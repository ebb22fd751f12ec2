//! Production environment backed by tokio time and the OS RNG.

use std::{
    future::Future,
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use rand::RngCore;
use tether_core::Environment;

/// Real clock and randomness.
///
/// Monotonic time is read through tokio so it follows a paused or simulated
/// runtime clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioEnv;

impl Environment for TokioEnv {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        rand::rng().fill_bytes(buffer);
    }
}
