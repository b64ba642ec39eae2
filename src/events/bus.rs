//! Typed publish/subscribe for diagram events
//!
//! The bus is a cheap handle over a shared registry: clone it to hand the same registry to the
//! state manager and to every observer. Dispatch is synchronous. Handlers run in subscription
//! order, type-specific ones first, then the catch-all ones registered with [`EventBus::on_all`].
//!
//! A handler may emit further events or subscribe/unsubscribe while it runs; the set of handlers
//! for one `emit` call is fixed when the call starts. A handler that mutates the document through
//! the state manager re-enters `emit` on the same call stack. That recursion is unguarded, so a
//! handler that reacts to its own effects must stop itself.
//!
//! The registry is single-threaded (`Rc`), one per open document.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use tracing::error;

use crate::domain_events::{DiagramDomainEvent, EventType};

type Handler = Rc<dyn Fn(&DiagramDomainEvent)>;

struct Listener {
    id: u64,
    handler: Handler,
    once: bool,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    typed: HashMap<EventType, Vec<Listener>>,
    all: Vec<Listener>,
}

impl Registry {
    fn register(&mut self, event_type: Option<EventType>, handler: Handler, once: bool) -> u64 {
        self.next_id += 1;
        let listener = Listener {
            id: self.next_id,
            handler,
            once,
        };
        match event_type {
            Some(event_type) => self.typed.entry(event_type).or_default().push(listener),
            None => self.all.push(listener),
        }
        self.next_id
    }

    fn remove(&mut self, event_type: Option<EventType>, id: u64) -> bool {
        let listeners = match event_type {
            Some(event_type) => match self.typed.get_mut(&event_type) {
                Some(listeners) => listeners,
                None => return false,
            },
            None => &mut self.all,
        };
        let before = listeners.len();
        listeners.retain(|listener| listener.id != id);
        before != listeners.len()
    }

    /// Handlers to run for one dispatch; `once` listeners are dropped here
    fn take_dispatch(&mut self, event_type: EventType) -> Vec<Handler> {
        let mut handlers = Vec::new();
        if let Some(listeners) = self.typed.get_mut(&event_type) {
            handlers.extend(listeners.iter().map(|l| Rc::clone(&l.handler)));
            listeners.retain(|l| !l.once);
        }
        handlers.extend(self.all.iter().map(|l| Rc::clone(&l.handler)));
        self.all.retain(|l| !l.once);
        handlers
    }
}

/// Event bus shared between the state manager and its observers
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Rc<RefCell<Registry>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.borrow();
        f.debug_struct("EventBus")
            .field("typed_types", &registry.typed.len())
            .field("all_listeners", &registry.all.len())
            .finish()
    }
}

/// Handle returned by every subscription; call [`Subscription::unsubscribe`] to detach
///
/// Dropping the handle leaves the handler registered.
#[must_use = "dropping a Subscription does not unsubscribe; keep it to detach later"]
#[derive(Debug)]
pub struct Subscription {
    registry: Weak<RefCell<Registry>>,
    event_type: Option<EventType>,
    id: u64,
}

impl Subscription {
    /// Remove the handler; returns false when it was already gone
    pub fn unsubscribe(self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.borrow_mut().remove(self.event_type, self.id),
            None => false,
        }
    }
}

impl EventBus {
    /// Create a bus with an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `handler` for every event of `event_type`
    pub fn on<F>(&self, event_type: EventType, handler: F) -> Subscription
    where
        F: Fn(&DiagramDomainEvent) + 'static,
    {
        self.subscribe(Some(event_type), Rc::new(handler), false)
    }

    /// Run `handler` for the next event of `event_type` only
    pub fn once<F>(&self, event_type: EventType, handler: F) -> Subscription
    where
        F: Fn(&DiagramDomainEvent) + 'static,
    {
        self.subscribe(Some(event_type), Rc::new(handler), true)
    }

    /// Run `handler` for every event regardless of type
    pub fn on_all<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&DiagramDomainEvent) + 'static,
    {
        self.subscribe(None, Rc::new(handler), false)
    }

    fn subscribe(&self, event_type: Option<EventType>, handler: Handler, once: bool) -> Subscription {
        let id = self.registry.borrow_mut().register(event_type, handler, once);
        Subscription {
            registry: Rc::downgrade(&self.registry),
            event_type,
            id,
        }
    }

    /// Dispatch an event synchronously; returns how many handlers ran to completion
    ///
    /// A panicking handler is logged and skipped; the remaining handlers still run.
    pub fn emit(&self, event: DiagramDomainEvent) -> usize {
        let event_type = event.event_type();
        let handlers = self.registry.borrow_mut().take_dispatch(event_type);

        let mut completed = 0;
        for handler in handlers {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                Ok(()) => completed += 1,
                Err(payload) => {
                    error!(
                        event_type = %event_type,
                        reason = %panic_message(payload.as_ref()),
                        "Event handler panicked"
                    );
                }
            }
        }
        completed
    }

    /// Remove every handler registered for `event_type`
    pub fn off(&self, event_type: EventType) {
        self.registry.borrow_mut().typed.remove(&event_type);
    }

    /// Remove every handler, including catch-all ones
    pub fn clear(&self) {
        let mut registry = self.registry.borrow_mut();
        registry.typed.clear();
        registry.all.clear();
    }

    /// Whether any type-specific handler listens for `event_type`
    pub fn has_listeners(&self, event_type: EventType) -> bool {
        self.listener_count(event_type) > 0
    }

    /// Number of type-specific handlers for `event_type`
    pub fn listener_count(&self, event_type: EventType) -> usize {
        self.registry
            .borrow()
            .typed
            .get(&event_type)
            .map_or(0, Vec::len)
    }

    /// Number of catch-all handlers
    pub fn all_listener_count(&self) -> usize {
        self.registry.borrow().all.len()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
