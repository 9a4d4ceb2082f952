//! Dependency sets and the evaluation-context stack.
//!
//! A [`Dep`] is the fan-out list attached to one observed property or one
//! observed container. Watchers subscribe to it while they evaluate; writes
//! call [`Dep::notify`].
//!
//! The "currently evaluating" watcher is the top of a thread-local stack
//! rather than a single slot: evaluating a render can read a computed value,
//! which evaluates its own watcher, which must not clobber the render's
//! tracking when it finishes.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::watcher::{WeakWatcher, Watcher};
use crate::types::DepId;

// =============================================================================
// Evaluation Context
// =============================================================================

thread_local! {
    /// `None` entries mark untracked regions.
    static TARGET_STACK: RefCell<Vec<Option<Watcher>>> = const { RefCell::new(Vec::new()) };
}

/// Push a watcher (or an untracked marker) onto the evaluation stack.
pub fn push_target(target: Option<Watcher>) {
    TARGET_STACK.with(|stack| stack.borrow_mut().push(target));
}

/// Pop the top of the evaluation stack.
pub fn pop_target() {
    TARGET_STACK.with(|stack| {
        stack.borrow_mut().pop();
    });
}

/// The watcher currently collecting dependencies, if any.
pub fn current_target() -> Option<Watcher> {
    TARGET_STACK.with(|stack| stack.borrow().last().cloned().flatten())
}

/// Whether reads right now would register dependencies.
pub fn is_tracking() -> bool {
    TARGET_STACK.with(|stack| matches!(stack.borrow().last(), Some(Some(_))))
}

/// Run `f` with dependency collection disabled.
pub fn untracked<T>(f: impl FnOnce() -> T) -> T {
    push_target(None);
    let result = f();
    pop_target();
    result
}

// =============================================================================
// Dep
// =============================================================================

struct DepInner {
    id: DepId,
    subs: RefCell<Vec<WeakWatcher>>,
}

/// A dependency set: one per observed property, one per observed container.
///
/// Cloning yields another handle to the same set.
#[derive(Clone)]
pub struct Dep(Rc<DepInner>);

impl Dep {
    /// Create an empty dependency set with a fresh id.
    pub fn new() -> Self {
        Self(Rc::new(DepInner {
            id: DepId::next(),
            subs: RefCell::new(Vec::new()),
        }))
    }

    pub fn id(&self) -> DepId {
        self.0.id
    }

    /// Append a subscriber. Duplicate prevention is the watcher's job.
    pub fn add_sub(&self, watcher: &Watcher) {
        self.0.subs.borrow_mut().push(watcher.downgrade());
    }

    /// Remove a subscriber (and any subscribers that have been dropped).
    pub fn remove_sub(&self, watcher: &Watcher) {
        self.0
            .subs
            .borrow_mut()
            .retain(|sub| sub.is_alive() && !sub.points_to(watcher));
    }

    /// Register this set with the currently evaluating watcher, if any.
    pub fn depend(&self) {
        if let Some(target) = current_target() {
            target.add_dep(self);
        }
    }

    /// Invalidate every subscriber.
    ///
    /// Iterates a snapshot, so subscribers added or removed by the
    /// notification itself only take effect on the next notify.
    pub fn notify(&self) {
        let subs: Vec<WeakWatcher> = {
            let mut subs = self.0.subs.borrow_mut();
            subs.retain(WeakWatcher::is_alive);
            subs.clone()
        };
        for sub in subs {
            if let Some(watcher) = sub.upgrade() {
                watcher.update();
            }
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.0.subs.borrow().iter().filter(|s| s.is_alive()).count()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.0.id)
            .field("subs", &self.subscriber_count())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::watcher::{Watcher, WatcherFlags, WatcherOptions};
    use crate::reactive::Value;
    use std::cell::Cell;

    fn counting_watcher(runs: Rc<Cell<usize>>) -> Watcher {
        Watcher::new(
            move || {
                runs.set(runs.get() + 1);
                Ok(Value::Null)
            },
            None,
            WatcherOptions {
                flags: WatcherFlags::SYNC,
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_target_stack_nesting() {
        assert!(current_target().is_none());
        let runs = Rc::new(Cell::new(0));
        let outer = counting_watcher(runs.clone());
        let inner = counting_watcher(runs);

        push_target(Some(outer.clone()));
        push_target(Some(inner.clone()));
        assert_eq!(current_target().map(|w| w.id()), Some(inner.id()));
        pop_target();
        assert_eq!(current_target().map(|w| w.id()), Some(outer.id()));
        untracked(|| assert!(!is_tracking()));
        assert!(is_tracking());
        pop_target();
        assert!(current_target().is_none());
    }

    #[test]
    fn test_notify_runs_each_subscriber() {
        let runs = Rc::new(Cell::new(0));
        let watcher = counting_watcher(runs.clone());
        let dep = Dep::new();
        dep.add_sub(&watcher);
        runs.set(0);

        dep.notify();
        assert_eq!(runs.get(), 1);

        dep.remove_sub(&watcher);
        dep.notify();
        assert_eq!(runs.get(), 1);
        assert_eq!(dep.subscriber_count(), 0);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let runs = Rc::new(Cell::new(0));
        let dep = Dep::new();
        {
            let watcher = counting_watcher(runs.clone());
            dep.add_sub(&watcher);
            assert_eq!(dep.subscriber_count(), 1);
        }
        assert_eq!(dep.subscriber_count(), 0);
        dep.notify();
        assert_eq!(runs.get(), 1, "only the initial evaluation ran");
    }

    #[test]
    fn test_dep_ids_unique() {
        let a = Dep::new();
        let b = Dep::new();
        assert_ne!(a.id(), b.id());
        assert!(a.ptr_eq(&a.clone()));
        assert!(!a.ptr_eq(&b));
    }
}
