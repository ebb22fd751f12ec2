//! Test environment with a frozen clock and counting RNG.

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
    time::{Duration, Instant},
};

use chrono::{DateTime, TimeZone, Utc};
use tether_core::Environment;

#[derive(Clone)]
pub(crate) struct FixedEnv {
    start: Instant,
    counter: Arc<AtomicU8>,
}

impl FixedEnv {
    pub(crate) fn new() -> Self {
        Self { start: Instant::now(), counter: Arc::new(AtomicU8::new(0)) }
    }
}

impl Environment for FixedEnv {
    fn now(&self) -> Instant {
        self.start
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
    }

    fn sleep(&self, _duration: Duration) -> impl Future<Output = ()> + Send {
        std::future::ready(())
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        for byte in buffer {
            *byte = self.counter.fetch_add(1, Ordering::Relaxed);
        }
    }
}
