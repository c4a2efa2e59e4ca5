//! Synchronous publish/subscribe bus.
//!
//! The bus carries named events with a payload and delivers them to every
//! handler registered for that name, in registration order, before
//! `publish` returns. Handlers may publish further events; those nested
//! dispatches complete before control returns to the outer one, so
//! delivery is depth-first rather than queued.
//!
//! # Error handling
//!
//! A handler returning an error aborts the remaining handlers of that
//! dispatch and the error is returned from [`EventBus::publish`]. There is
//! no isolation between handlers.

use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// An event that can travel on the bus.
pub trait Event {
    /// Discriminant handlers subscribe to.
    type Name: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    /// Name of this event.
    fn name(&self) -> Self::Name;
}

/// Error returned by a handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result returned by a handler.
pub type HandlerResult = Result<(), HandlerError>;

type Handler<E> = Arc<dyn Fn(&E) -> HandlerResult + Send + Sync>;

/// A handler failed while an event was being dispatched.
#[derive(Debug, thiserror::Error)]
#[error("handler #{position} for event {event} failed: {source}")]
pub struct DispatchError {
    /// Debug name of the event being dispatched.
    pub event: String,
    /// Zero-based position of the failing handler among those that ran.
    pub position: usize,
    /// Error returned by the handler.
    #[source]
    pub source: HandlerError,
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

struct Registration<E: Event> {
    id: u64,
    name: E::Name,
    once: bool,
    handler: Handler<E>,
}

struct Registry<E: Event> {
    next_id: u64,
    registrations: Vec<Registration<E>>,
}

/// Process-wide event channel.
///
/// Share it behind an `Arc`; all methods take `&self`.
pub struct EventBus<E: Event> {
    registry: Mutex<Registry<E>>,
}

impl<E: Event> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> EventBus<E> {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry {
                next_id: 0,
                registrations: Vec::new(),
            }),
        }
    }

    /// Register `handler` for every event named `name`.
    pub fn subscribe<F>(&self, name: E::Name, handler: F) -> Subscription
    where
        F: Fn(&E) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(name, false, Arc::new(handler))
    }

    /// Register `handler` for the next event named `name` only.
    pub fn subscribe_once<F>(&self, name: E::Name, handler: F) -> Subscription
    where
        F: Fn(&E) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(name, true, Arc::new(handler))
    }

    /// Remove a handler. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut registry = self.lock();
        let before = registry.registrations.len();
        registry
            .registrations
            .retain(|registration| registration.id != subscription.0);
        registry.registrations.len() != before
    }

    /// Number of handlers currently registered for `name`.
    pub fn subscriber_count(&self, name: E::Name) -> usize {
        self.lock()
            .registrations
            .iter()
            .filter(|registration| registration.name == name)
            .count()
    }

    /// Deliver `event` to its handlers and return how many ran.
    ///
    /// The handler list is captured when the dispatch starts; handlers
    /// registered during it only see later events. Each captured handler is
    /// checked again right before it runs, so one unsubscribed by an earlier
    /// handler is skipped. A once-handler is removed as it is claimed, so a
    /// nested publish of the same event does not run it twice.
    pub fn publish(&self, event: &E) -> Result<usize, DispatchError> {
        let name = event.name();
        let captured: Vec<(u64, Handler<E>)> = self
            .lock()
            .registrations
            .iter()
            .filter(|registration| registration.name == name)
            .map(|registration| (registration.id, Arc::clone(&registration.handler)))
            .collect();

        tracing::trace!(event = ?name, handlers = captured.len(), "Publishing event");

        let mut invoked = 0;
        for (id, handler) in captured {
            if !self.claim(id) {
                continue;
            }
            handler(event).map_err(|source| DispatchError {
                event: format!("{name:?}"),
                position: invoked,
                source,
            })?;
            invoked += 1;
        }

        Ok(invoked)
    }

    /// Whether registration `id` may still run, consuming it if it is a
    /// once-handler.
    fn claim(&self, id: u64) -> bool {
        let mut registry = self.lock();
        let Some(index) = registry.registrations.iter().position(|r| r.id == id) else {
            return false;
        };
        if registry.registrations[index].once {
            registry.registrations.remove(index);
        }
        true
    }

    fn register(&self, name: E::Name, once: bool, handler: Handler<E>) -> Subscription {
        let mut registry = self.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.registrations.push(Registration {
            id,
            name,
            once,
            handler,
        });
        Subscription(id)
    }

    fn lock(&self) -> MutexGuard<'_, Registry<E>> {
        // Handlers never run under the lock, so a poisoned registry is still consistent.
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E: Event> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.lock().registrations.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
