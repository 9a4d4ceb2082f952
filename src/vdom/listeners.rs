//! Event listener normalization and invokers.
//!
//! Listener names may carry modifier prefixes, in this order: `&` passive,
//! `~` once, `!` capture. The backend is handed an [`Invoker`] rather than
//! the user handler itself, so a re-render can swap the handler without
//! detaching and re-attaching the listener.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::{invoke_with_error_handling, ErrorScope, Result};
use crate::reactive::Value;

/// Listener callback. Receives the event payload.
pub type Handler = Rc<dyn Fn(&Value) -> Result<()>>;

/// A listener name with its modifiers split off.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventName {
    pub name: String,
    pub passive: bool,
    pub once: bool,
    pub capture: bool,
}

/// Split modifier prefixes off a listener name.
pub fn normalize_event(raw: &str) -> EventName {
    let mut rest = raw;
    let passive = rest.starts_with('&');
    if passive {
        rest = &rest[1..];
    }
    let once = rest.starts_with('~');
    if once {
        rest = &rest[1..];
    }
    let capture = rest.starts_with('!');
    if capture {
        rest = &rest[1..];
    }
    EventName {
        name: rest.to_string(),
        passive,
        once,
        capture,
    }
}

struct InvokerInner {
    event: EventName,
    handler: RefCell<Handler>,
    scope: Option<Weak<dyn ErrorScope>>,
    fired: Cell<bool>,
}

/// Stable callable installed on an output node.
#[derive(Clone)]
pub struct Invoker(Rc<InvokerInner>);

impl Invoker {
    pub fn new(event: EventName, handler: Handler, scope: Option<Weak<dyn ErrorScope>>) -> Self {
        Self(Rc::new(InvokerInner {
            event,
            handler: RefCell::new(handler),
            scope,
            fired: Cell::new(false),
        }))
    }

    pub fn event(&self) -> &EventName {
        &self.0.event
    }

    pub fn is_once(&self) -> bool {
        self.0.event.once
    }

    /// Replace the handler. Returns `true` if it actually changed.
    pub fn set_handler(&self, handler: &Handler) -> bool {
        let mut current = self.0.handler.borrow_mut();
        if Rc::ptr_eq(&current, handler) {
            return false;
        }
        *current = handler.clone();
        true
    }

    /// Call the handler with `payload`, routing its error to the owning
    /// component. A once-listener ignores calls after the first.
    ///
    /// Returns whether the handler ran.
    pub fn invoke(&self, payload: &Value) -> bool {
        if self.is_once() && self.0.fired.replace(true) {
            return false;
        }
        let handler = self.0.handler.borrow().clone();
        let scope = self.0.scope.as_ref().and_then(Weak::upgrade);
        invoke_with_error_handling(|| handler(payload), scope.as_deref(), "v-on handler");
        true
    }

    pub fn ptr_eq(&self, other: &Invoker) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invoker").field("event", &self.0.event).finish()
    }
}
