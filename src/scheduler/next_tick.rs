//! Deferred callbacks.
//!
//! [`next_tick`] queues a callback to run after the current synchronous work.
//! There is no event loop in the library: callbacks run when the host calls
//! [`tick`], or when an installed tick driver decides to. A driver is told
//! once per batch that callbacks are pending, and is expected to arrange for
//! [`tick`] to be called soon (for example by posting to its own loop).

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::error::{handle_error, ErrorScope, Result};

type Task = Box<dyn FnOnce() -> Result<()>>;

struct Pending {
    task: Task,
    scope: Option<Weak<dyn ErrorScope>>,
}

thread_local! {
    static CALLBACKS: RefCell<Vec<Pending>> = const { RefCell::new(Vec::new()) };
    static PENDING: Cell<bool> = const { Cell::new(false) };
    static DRIVER: RefCell<Option<Rc<dyn Fn()>>> = const { RefCell::new(None) };
}

/// Queue `callback` for the next tick.
pub fn next_tick(callback: impl FnOnce() -> Result<()> + 'static) {
    enqueue(Box::new(callback), None);
}

/// Queue `callback` for the next tick, routing its error to `scope`.
pub(crate) fn next_tick_in(
    callback: impl FnOnce() -> Result<()> + 'static,
    scope: Weak<dyn ErrorScope>,
) {
    enqueue(Box::new(callback), Some(scope));
}

fn enqueue(task: Task, scope: Option<Weak<dyn ErrorScope>>) {
    CALLBACKS.with(|c| c.borrow_mut().push(Pending { task, scope }));
    if !PENDING.with(|p| p.replace(true)) {
        let driver = DRIVER.with(|d| d.borrow().clone());
        if let Some(driver) = driver {
            driver();
        }
    }
}

/// Run every pending callback, including ones queued while running.
///
/// Returns how many callbacks ran.
pub fn tick() -> usize {
    let mut ran = 0;
    loop {
        PENDING.with(|p| p.set(false));
        let batch = CALLBACKS.with(|c| std::mem::take(&mut *c.borrow_mut()));
        if batch.is_empty() {
            return ran;
        }
        tracing::trace!(callbacks = batch.len(), "tick");
        for Pending { task, scope } in batch {
            ran += 1;
            if let Err(err) = task() {
                let scope = scope.as_ref().and_then(Weak::upgrade);
                handle_error(err, scope.as_deref(), "nextTick");
            }
        }
    }
}

/// Whether callbacks are waiting for a tick.
pub fn has_pending() -> bool {
    CALLBACKS.with(|c| !c.borrow().is_empty())
}

/// Install a driver that is notified whenever a new batch becomes pending.
pub fn set_tick_driver(driver: impl Fn() + 'static) {
    DRIVER.with(|d| *d.borrow_mut() = Some(Rc::new(driver)));
}

/// Remove the tick driver.
pub fn clear_tick_driver() {
    DRIVER.with(|d| *d.borrow_mut() = None);
}

/// Drop pending callbacks and the driver (for testing).
pub fn reset_next_tick() {
    CALLBACKS.with(|c| c.borrow_mut().clear());
    PENDING.with(|p| p.set(false));
    clear_tick_driver();
}
