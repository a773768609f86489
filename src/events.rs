//! Store event registry.
//!
//! Typed publish/subscribe with best-effort delivery: each handler call is
//! isolated so a panicking subscriber cannot block its siblings or propagate
//! into the store operation that emitted the event.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::store::PersistedState;

/// Why the store discarded or replaced persisted data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptionReason {
    /// Stored value was not parseable JSON.
    ParseError,
    /// Stored value parsed but failed schema validation.
    SchemaInvalid,
    /// Host asked for the stored value to be removed.
    ManualClear,
    /// Host asked for a reset to defaults.
    ManualReset,
}

impl CorruptionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParseError => "parse_error",
            Self::SchemaInvalid => "schema_invalid",
            Self::ManualClear => "manual_clear",
            Self::ManualReset => "manual_reset",
        }
    }
}

/// Events emitted by the state store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// A full state snapshot was persisted successfully.
    Change { state: PersistedState },
    /// The store autonomously discarded bad data (or was asked to clear).
    Corruption {
        reason: CorruptionReason,
        detail: Option<Vec<String>>,
        state: PersistedState,
    },
}

impl StoreEvent {
    pub fn kind(&self) -> StoreEventKind {
        match self {
            Self::Change { .. } => StoreEventKind::Change,
            Self::Corruption { .. } => StoreEventKind::Corruption,
        }
    }
}

/// Event channel selector for subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEventKind {
    Change,
    Corruption,
}

/// Handle returned by [`EventRegistry::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&StoreEvent)>;

/// Registry of store event subscribers.
#[derive(Default)]
pub struct EventRegistry {
    next_id: u64,
    handlers: Vec<(SubscriptionId, StoreEventKind, Handler)>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind.
    pub fn subscribe<F>(&mut self, kind: StoreEventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&StoreEvent) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, kind, Box::new(handler)));
        id
    }

    /// Remove a handler. Returns false if the id is unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _, _)| *handler_id != id);
        self.handlers.len() != before
    }

    /// Deliver an event synchronously to every matching handler, in
    /// subscription order. A panicking handler is logged and skipped.
    pub fn emit(&mut self, event: &StoreEvent) {
        let kind = event.kind();
        for (id, handler_kind, handler) in self.handlers.iter_mut() {
            if *handler_kind != kind {
                continue;
            }

            if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                tracing::error!(subscription = id.0, ?kind, "store event handler panicked");
            }
        }
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRegistry")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn change_event() -> StoreEvent {
        StoreEvent::Change {
            state: crate::store::StateStore::in_memory().default_state(),
        }
    }

    #[test]
    fn test_subscribe_and_emit() {
        let mut registry = EventRegistry::new();
        let seen = Rc::new(RefCell::new(0));

        let seen_clone = Rc::clone(&seen);
        registry.subscribe(StoreEventKind::Change, move |_| {
            *seen_clone.borrow_mut() += 1;
        });

        registry.emit(&change_event());
        registry.emit(&change_event());
        assert_eq!(*seen.borrow(), 2);
    }

    #[test]
    fn test_kind_filtering() {
        let mut registry = EventRegistry::new();
        let seen = Rc::new(RefCell::new(0));

        let seen_clone = Rc::clone(&seen);
        registry.subscribe(StoreEventKind::Corruption, move |_| {
            *seen_clone.borrow_mut() += 1;
        });

        registry.emit(&change_event());
        assert_eq!(*seen.borrow(), 0);
    }

    #[test]
    fn test_unsubscribe() {
        let mut registry = EventRegistry::new();
        let seen = Rc::new(RefCell::new(0));

        let seen_clone = Rc::clone(&seen);
        let id = registry.subscribe(StoreEventKind::Change, move |_| {
            *seen_clone.borrow_mut() += 1;
        });

        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));

        registry.emit(&change_event());
        assert_eq!(*seen.borrow(), 0);
    }

    #[test]
    fn test_panicking_handler_does_not_block_siblings() {
        let mut registry = EventRegistry::new();
        let seen = Rc::new(RefCell::new(0));

        registry.subscribe(StoreEventKind::Change, |_| {
            panic!("subscriber failure");
        });

        let seen_clone = Rc::clone(&seen);
        registry.subscribe(StoreEventKind::Change, move |_| {
            *seen_clone.borrow_mut() += 1;
        });

        registry.emit(&change_event());
        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn test_corruption_reason_strings() {
        assert_eq!(CorruptionReason::ParseError.as_str(), "parse_error");
        assert_eq!(CorruptionReason::SchemaInvalid.as_str(), "schema_invalid");
        assert_eq!(CorruptionReason::ManualClear.as_str(), "manual_clear");
        assert_eq!(CorruptionReason::ManualReset.as_str(), "manual_reset");
    }
}
