//! Watchers: reactive computations.
//!
//! A [`Watcher`] evaluates a getter while sitting on top of the evaluation
//! stack, so every dependency set read during the getter subscribes it. Two
//! generations of dependency lists are kept: the ones collected by the last
//! completed evaluation and the ones being collected now. When an evaluation
//! finishes, sets present only in the old generation are unsubscribed and the
//! generations swap. A watcher's subscriptions therefore always equal exactly
//! what its last evaluation read.
//!
//! # Modes
//!
//! - **lazy**: invalidation only marks the watcher dirty; the owner calls
//!   [`Watcher::evaluate`] on the next read (computed values)
//! - **sync**: invalidation re-runs immediately
//! - otherwise invalidation enqueues the watcher with the
//!   [scheduler](crate::scheduler)
//!
//! # Errors
//!
//! User watchers (created through `watch`) route getter and callback errors
//! through [`handle_error`] and keep their previous value. Other watchers
//! return the getter error from [`Watcher::get`]; when they run from the
//! scheduler the error is routed there.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

use bitflags::bitflags;

use super::dep::{pop_target, push_target, Dep};
use super::traverse::traverse;
use super::value::Value;
use crate::error::{handle_error, ErrorScope, Result};
use crate::scheduler;
use crate::types::{DepId, WatcherId};

bitflags! {
    /// Watcher behaviour flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WatcherFlags: u8 {
        /// Evaluate on demand only (computed values).
        const LAZY = 1 << 0;
        /// Re-run synchronously on invalidation instead of queueing.
        const SYNC = 1 << 1;
        /// Traverse the result so nested changes re-run the watcher.
        const DEEP = 1 << 2;
        /// Created by user code; errors are routed, not returned.
        const USER = 1 << 3;
    }
}

/// Getter evaluated under dependency tracking.
pub type Getter = Box<dyn Fn() -> Result<Value>>;

/// Change callback: `(new, old)`.
pub type Callback = Box<dyn Fn(&Value, &Value) -> Result<()>>;

/// Construction options.
#[derive(Default)]
pub struct WatcherOptions {
    pub flags: WatcherFlags,
    /// Called by the scheduler right before the watcher runs in a flush.
    pub before: Option<Rc<dyn Fn()>>,
    /// Called once after a flush in which the watcher ran.
    pub after_flush: Option<Rc<dyn Fn()>>,
    /// Scope errors are routed to.
    pub owner: Option<Weak<dyn ErrorScope>>,
    /// Description used in diagnostics.
    pub expression: String,
}

pub(crate) struct WatcherInner {
    id: WatcherId,
    expression: String,
    flags: WatcherFlags,
    getter: Getter,
    callback: Option<Callback>,
    before: Option<Rc<dyn Fn()>>,
    after_flush: Option<Rc<dyn Fn()>>,
    owner: Option<Weak<dyn ErrorScope>>,
    active: Cell<bool>,
    dirty: Cell<bool>,
    value: RefCell<Value>,
    deps: RefCell<Vec<Dep>>,
    dep_ids: RefCell<HashSet<DepId>>,
    new_deps: RefCell<Vec<Dep>>,
    new_dep_ids: RefCell<HashSet<DepId>>,
}

/// Handle to a reactive computation. Cloning shares it.
#[derive(Clone)]
pub struct Watcher(Rc<WatcherInner>);

/// Non-owning handle, held by dependency sets.
#[derive(Clone)]
pub struct WeakWatcher(Weak<WatcherInner>);

impl WeakWatcher {
    pub fn upgrade(&self) -> Option<Watcher> {
        self.0.upgrade().map(Watcher)
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    pub(crate) fn points_to(&self, watcher: &Watcher) -> bool {
        std::ptr::eq(self.0.as_ptr(), Rc::as_ptr(&watcher.0))
    }
}

impl Watcher {
    /// Build a watcher without evaluating it.
    pub fn detached(
        getter: impl Fn() -> Result<Value> + 'static,
        callback: Option<Callback>,
        options: WatcherOptions,
    ) -> Self {
        let lazy = options.flags.contains(WatcherFlags::LAZY);
        Self(Rc::new(WatcherInner {
            id: WatcherId::next(),
            expression: options.expression,
            flags: options.flags,
            getter: Box::new(getter),
            callback,
            before: options.before,
            after_flush: options.after_flush,
            owner: options.owner,
            active: Cell::new(true),
            dirty: Cell::new(lazy),
            value: RefCell::new(Value::Null),
            deps: RefCell::new(Vec::new()),
            dep_ids: RefCell::new(HashSet::new()),
            new_deps: RefCell::new(Vec::new()),
            new_dep_ids: RefCell::new(HashSet::new()),
        }))
    }

    /// Build a watcher and, unless it is lazy, evaluate it once.
    pub fn new(
        getter: impl Fn() -> Result<Value> + 'static,
        callback: Option<Callback>,
        options: WatcherOptions,
    ) -> Result<Self> {
        let watcher = Self::detached(getter, callback, options);
        watcher.prime()?;
        Ok(watcher)
    }

    /// Initial evaluation of a detached watcher. No-op for lazy ones.
    pub fn prime(&self) -> Result<()> {
        if !self.is_lazy() {
            let value = self.get()?;
            *self.0.value.borrow_mut() = value;
        }
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> WatcherId {
        self.0.id
    }

    pub fn expression(&self) -> &str {
        &self.0.expression
    }

    pub fn flags(&self) -> WatcherFlags {
        self.0.flags
    }

    pub fn is_lazy(&self) -> bool {
        self.0.flags.contains(WatcherFlags::LAZY)
    }

    pub fn is_user(&self) -> bool {
        self.0.flags.contains(WatcherFlags::USER)
    }

    pub fn is_active(&self) -> bool {
        self.0.active.get()
    }

    pub fn is_dirty(&self) -> bool {
        self.0.dirty.get()
    }

    /// Cached value of the last successful evaluation.
    pub fn value(&self) -> Value {
        self.0.value.borrow().clone()
    }

    /// Ids of the dependency sets the last evaluation read.
    pub fn dep_ids(&self) -> Vec<DepId> {
        self.0.deps.borrow().iter().map(Dep::id).collect()
    }

    pub fn owner(&self) -> Option<Rc<dyn ErrorScope>> {
        self.0.owner.as_ref().and_then(Weak::upgrade)
    }

    pub fn downgrade(&self) -> WeakWatcher {
        WeakWatcher(Rc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &Watcher) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    // =========================================================================
    // Evaluation
    // =========================================================================

    /// Evaluate the getter and re-collect dependencies.
    pub fn get(&self) -> Result<Value> {
        push_target(Some(self.clone()));
        let result = match (self.0.getter)() {
            Ok(value) => Ok(value),
            Err(err) if self.is_user() => {
                let owner = self.owner();
                handle_error(
                    err,
                    owner.as_deref(),
                    &format!("getter for watcher \"{}\"", self.0.expression),
                );
                Ok(self.value())
            }
            Err(err) => Err(err),
        };
        if self.0.flags.contains(WatcherFlags::DEEP) {
            if let Ok(value) = &result {
                traverse(value);
            }
        }
        pop_target();
        self.cleanup_deps();
        result
    }

    /// Record a dependency read during the current evaluation.
    pub fn add_dep(&self, dep: &Dep) {
        let id = dep.id();
        if self.0.new_dep_ids.borrow_mut().insert(id) {
            self.0.new_deps.borrow_mut().push(dep.clone());
            if !self.0.dep_ids.borrow().contains(&id) {
                dep.add_sub(self);
            }
        }
    }

    fn cleanup_deps(&self) {
        let new_ids = std::mem::take(&mut *self.0.new_dep_ids.borrow_mut());
        let new_deps = std::mem::take(&mut *self.0.new_deps.borrow_mut());
        let old_deps = std::mem::replace(&mut *self.0.deps.borrow_mut(), new_deps);
        for dep in &old_deps {
            if !new_ids.contains(&dep.id()) {
                dep.remove_sub(self);
            }
        }
        *self.0.dep_ids.borrow_mut() = new_ids;
    }

    /// React to a dependency change.
    pub fn update(&self) {
        if !self.is_active() {
            return;
        }
        if self.is_lazy() {
            self.0.dirty.set(true);
        } else if self.0.flags.contains(WatcherFlags::SYNC) {
            self.run();
        } else {
            scheduler::queue_watcher(self.clone());
        }
    }

    /// Re-evaluate and fire the callback if the value changed.
    ///
    /// Containers and deep watchers always count as changed, since a
    /// mutation inside them keeps the identity. Errors are routed.
    pub fn run(&self) {
        if !self.is_active() {
            return;
        }
        let value = match self.get() {
            Ok(value) => value,
            Err(err) => {
                let owner = self.owner();
                handle_error(
                    err,
                    owner.as_deref(),
                    &format!("watcher \"{}\"", self.0.expression),
                );
                return;
            }
        };
        let old = self.value();
        let changed = !value.same(&old)
            || value.is_container()
            || self.0.flags.contains(WatcherFlags::DEEP);
        if !changed {
            return;
        }
        *self.0.value.borrow_mut() = value.clone();
        if let Some(callback) = &self.0.callback {
            if let Err(err) = callback(&value, &old) {
                let owner = self.owner();
                handle_error(
                    err,
                    owner.as_deref(),
                    &format!("callback for watcher \"{}\"", self.0.expression),
                );
            }
        }
    }

    /// Recompute a lazy watcher's value. On failure the watcher stays dirty
    /// and the cached value is kept.
    pub fn evaluate(&self) -> Result<()> {
        let value = self.get()?;
        *self.0.value.borrow_mut() = value;
        self.0.dirty.set(false);
        Ok(())
    }

    /// Make the currently evaluating watcher depend on everything this one
    /// depends on.
    pub fn depend(&self) {
        let deps = self.0.deps.borrow().clone();
        for dep in deps {
            dep.depend();
        }
    }

    /// Unsubscribe from every dependency and deactivate. Idempotent.
    pub fn teardown(&self) {
        if !self.0.active.replace(false) {
            return;
        }
        let deps = std::mem::take(&mut *self.0.deps.borrow_mut());
        self.0.dep_ids.borrow_mut().clear();
        for dep in deps {
            dep.remove_sub(self);
        }
    }

    pub(crate) fn call_before(&self) {
        if let Some(before) = &self.0.before {
            before();
        }
    }

    pub(crate) fn call_after_flush(&self) {
        if let Some(after) = &self.0.after_flush {
            after();
        }
    }
}

impl PartialEq for Watcher {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.0.id)
            .field("expression", &self.0.expression)
            .field("flags", &self.0.flags)
            .field("active", &self.is_active())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
