//! Synchronous publish/subscribe.
//!
//! The bus decouples a connection from whoever cares about its events.
//! Delivery is synchronous and ordered: [`EventBus::emit`] calls every
//! listener registered for the event's kind, in registration order, before
//! it returns.
//!
//! Each listener runs in isolation. A listener that returns an error or
//! panics is logged and skipped; the remaining listeners for that emission
//! still run.
//!
//! Listeners are shared closures ([`Listener`]). Identity is pointer
//! identity of the shared closure: registering the same [`Listener`] twice
//! creates two registrations, and [`EventBus::off`] removes the first one.

use std::{
    collections::HashMap,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::{
    error::ListenerError,
    event::{ChannelEvent, EventKind},
};

/// A registered callback.
pub type Listener = Arc<dyn Fn(&ChannelEvent) -> Result<(), ListenerError> + Send + Sync>;

/// Wrap a closure as a [`Listener`].
///
/// Keep the returned value to unregister it later with [`EventBus::off`].
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&ChannelEvent) -> Result<(), ListenerError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Per-kind listener registry.
#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<HashMap<EventKind, Vec<Listener>>>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `kind`.
    ///
    /// Duplicate registrations are kept and invoked once each.
    pub fn on(&self, kind: EventKind, listener: Listener) {
        self.registry().entry(kind).or_default().push(listener);
    }

    /// Remove the first registration of `listener` for `kind`.
    ///
    /// Returns whether a registration was removed.
    pub fn off(&self, kind: EventKind, listener: &Listener) -> bool {
        let mut registry = self.registry();
        let Some(listeners) = registry.get_mut(&kind) else {
            return false;
        };

        let Some(index) = listeners.iter().position(|l| Arc::ptr_eq(l, listener)) else {
            return false;
        };

        listeners.remove(index);
        if listeners.is_empty() {
            registry.remove(&kind);
        }
        true
    }

    /// Deliver `event` to every listener of its kind.
    ///
    /// Returns the number of listeners that completed without error. The
    /// listener set is snapshotted first, so listeners may call `on`/`off`
    /// without affecting the emission in progress.
    pub fn emit(&self, event: &ChannelEvent) -> usize {
        let kind = event.kind();
        let snapshot = match self.registry().get(&kind) {
            Some(listeners) => listeners.clone(),
            None => return 0,
        };

        let mut delivered = 0;
        for (index, listener) in snapshot.iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(error)) => {
                    tracing::warn!(kind = %kind, listener = index, %error, "listener failed");
                },
                Err(payload) => {
                    tracing::warn!(
                        kind = %kind,
                        listener = index,
                        panic = panic_message(payload.as_ref()),
                        "listener panicked"
                    );
                },
            }
        }

        delivered
    }

    /// Number of registrations for `kind`.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.registry().get(&kind).map_or(0, Vec::len)
    }

    /// Remove every registration.
    pub fn clear(&self) {
        self.registry().clear();
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<EventKind, Vec<Listener>>> {
        // Listeners never run under the lock, so a poisoned registry is still
        // consistent.
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.registry();
        let mut kinds: Vec<_> = registry.iter().map(|(kind, l)| (*kind, l.len())).collect();
        kinds.sort();
        f.debug_struct("EventBus").field("listeners", &kinds).finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
