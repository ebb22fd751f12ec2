//! Bounded outbound queue.
//!
//! Holds envelopes produced while the socket is not open. Bounded so a long
//! outage cannot grow memory without limit: once full, every new envelope
//! evicts the oldest one. Draining is strictly FIFO; an envelope that fails
//! mid-drain goes back to the front.

use std::collections::VecDeque;

use tether_proto::Envelope;

/// Default queue capacity.
pub const DEFAULT_CAPACITY: usize = 100;

/// An envelope plus its enqueue sequence number.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedEnvelope {
    /// Monotonic enqueue order, unique per queue.
    pub seq: u64,
    /// The envelope.
    pub envelope: Envelope,
}

/// FIFO ring with oldest-first eviction.
#[derive(Debug, Clone)]
pub struct OutboundQueue {
    items: VecDeque<QueuedEnvelope>,
    capacity: usize,
    next_seq: u64,
}

impl OutboundQueue {
    /// Create an empty queue holding at most `capacity` envelopes.
    pub fn new(capacity: usize) -> Self {
        Self { items: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)), capacity, next_seq: 0 }
    }

    /// Append an envelope.
    ///
    /// Returns the evicted envelope if the queue was full.
    pub fn push_back(&mut self, envelope: Envelope) -> Option<QueuedEnvelope> {
        let item = QueuedEnvelope { seq: self.next_seq, envelope };
        self.next_seq += 1;

        if self.capacity == 0 {
            return Some(item);
        }

        let evicted = if self.items.len() >= self.capacity { self.items.pop_front() } else { None };
        self.items.push_back(item);
        evicted
    }

    /// Put a previously popped envelope back at the front.
    pub fn push_front(&mut self, item: QueuedEnvelope) {
        self.items.push_front(item);
        while self.items.len() > self.capacity {
            self.items.pop_back();
        }
    }

    /// Remove the oldest envelope.
    pub fn pop_front(&mut self) -> Option<QueuedEnvelope> {
        self.items.pop_front()
    }

    /// Change the capacity, evicting the oldest envelopes that no longer fit.
    ///
    /// Returns the number of evicted envelopes.
    pub fn set_capacity(&mut self, capacity: usize) -> usize {
        self.capacity = capacity;
        let overflow = self.items.len().saturating_sub(capacity);
        self.items.drain(..overflow);
        overflow
    }

    /// Number of queued envelopes.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maximum number of envelopes held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Queued envelopes, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &QueuedEnvelope> {
        self.items.iter()
    }

    /// Drop every queued envelope.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl Default for OutboundQueue {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
