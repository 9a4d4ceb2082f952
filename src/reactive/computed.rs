//! Free-standing computed values and watches.
//!
//! These wrap a [`Watcher`] the same way component computed properties and
//! `watch` options do, for code that works on reactive state outside any
//! component.
//!
//! ```ignore
//! let state: Object = [("count", 1)].into_iter().collect();
//! observe(&Value::from(state.clone()), false);
//!
//! let s = state.clone();
//! let doubled = computed(move || Ok(Value::from(s.get("count").as_f64().unwrap_or(0.0) * 2.0)));
//! assert_eq!(doubled.get()?, Value::from(2));
//! ```

use std::fmt;
use std::rc::Rc;

use super::dep::is_tracking;
use super::value::Value;
use super::watcher::{Watcher, WatcherFlags, WatcherOptions};
use crate::error::{handle_error, ErrorScope, Result};

// =============================================================================
// Computed
// =============================================================================

/// A cached derived value.
///
/// Recomputes only when read after one of its dependencies changed. Reading
/// it from inside another watcher makes that watcher depend on everything the
/// computed value depends on.
#[derive(Clone)]
pub struct Computed {
    watcher: Watcher,
    setter: Option<Rc<dyn Fn(Value) -> Result<()>>>,
}

/// Create a read-only computed value.
pub fn computed(getter: impl Fn() -> Result<Value> + 'static) -> Computed {
    Computed::new(getter, None, None, "computed")
}

impl Computed {
    pub(crate) fn new(
        getter: impl Fn() -> Result<Value> + 'static,
        setter: Option<Rc<dyn Fn(Value) -> Result<()>>>,
        owner: Option<std::rc::Weak<dyn ErrorScope>>,
        name: &str,
    ) -> Self {
        let watcher = Watcher::detached(
            getter,
            None,
            WatcherOptions {
                flags: WatcherFlags::LAZY,
                owner,
                expression: name.to_string(),
                ..Default::default()
            },
        );
        Self { watcher, setter }
    }

    /// Attach a setter, making the value writable.
    pub fn with_setter(mut self, setter: impl Fn(Value) -> Result<()> + 'static) -> Self {
        self.setter = Some(Rc::new(setter));
        self
    }

    /// Current value, recomputing if stale.
    ///
    /// A failed recomputation returns the error and leaves the value stale,
    /// so the next read retries.
    pub fn get(&self) -> Result<Value> {
        if self.watcher.is_dirty() {
            self.watcher.evaluate()?;
        }
        if is_tracking() {
            self.watcher.depend();
        }
        Ok(self.watcher.value())
    }

    /// Write through the setter. Returns `false` (after a warning) when there
    /// is none.
    pub fn set(&self, value: Value) -> Result<bool> {
        match &self.setter {
            Some(setter) => {
                setter(value)?;
                Ok(true)
            }
            None => {
                crate::error::warn(format_args!(
                    "Computed property \"{}\" was assigned to but it has no setter.",
                    self.watcher.expression()
                ));
                Ok(false)
            }
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.watcher.is_dirty()
    }

    pub fn watcher(&self) -> &Watcher {
        &self.watcher
    }

    /// Stop tracking.
    pub fn teardown(&self) {
        self.watcher.teardown();
    }
}

impl fmt::Debug for Computed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("watcher", &self.watcher)
            .field("writable", &self.setter.is_some())
            .finish()
    }
}

// =============================================================================
// Watch
// =============================================================================

/// Options for [`watch`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchOptions {
    /// Re-run on nested changes inside the watched value.
    pub deep: bool,
    /// Invoke the callback once right away with `Null` as the old value.
    pub immediate: bool,
    /// Run the callback synchronously on change instead of at flush.
    pub sync: bool,
}

impl WatchOptions {
    pub(crate) fn flags(self) -> WatcherFlags {
        let mut flags = WatcherFlags::USER;
        if self.deep {
            flags |= WatcherFlags::DEEP;
        }
        if self.sync {
            flags |= WatcherFlags::SYNC;
        }
        flags
    }
}

/// Handle returned by [`watch`]. Dropping it stops the watch.
#[must_use = "dropping the handle stops the watch"]
pub struct WatchHandle {
    watcher: Watcher,
}

impl WatchHandle {
    pub fn watcher(&self) -> &Watcher {
        &self.watcher
    }

    /// Stop watching.
    pub fn unwatch(self) {
        self.watcher.teardown();
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.watcher.teardown();
    }
}

/// Call `callback(new, old)` whenever the value produced by `source` changes.
///
/// Errors from `source` or `callback` are routed through the error handler.
pub fn watch(
    source: impl Fn() -> Result<Value> + 'static,
    callback: impl Fn(&Value, &Value) -> Result<()> + 'static,
    options: WatchOptions,
) -> WatchHandle {
    let callback: Rc<dyn Fn(&Value, &Value) -> Result<()>> = Rc::new(callback);
    let cb = callback.clone();
    let watcher = Watcher::detached(
        source,
        Some(Box::new(move |new: &Value, old: &Value| cb(new, old))),
        WatcherOptions {
            flags: options.flags(),
            expression: "watch".into(),
            ..Default::default()
        },
    );
    // User watchers route getter errors, so priming cannot fail.
    if let Err(err) = watcher.prime() {
        handle_error(err, None, "watch");
    }
    if options.immediate {
        if let Err(err) = callback(&watcher.value(), &Value::Null) {
            handle_error(err, None, "callback for immediate watcher \"watch\"");
        }
    }
    WatchHandle { watcher }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::error::ViewError;
    use crate::reactive::observer::{observe, toggle_observing};
    use crate::reactive::Object;
    use crate::scheduler;
    use std::cell::{Cell, RefCell};

    fn state(pairs: &[(&str, i32)]) -> Object {
        toggle_observing(true);
        let obj: Object = pairs.iter().copied().collect();
        observe(&Value::from(obj.clone()), false);
        obj
    }

    fn num(value: &Value) -> f64 {
        value.as_f64().unwrap_or(f64::NAN)
    }

    #[test]
    fn test_computed_caches_until_dependency_changes() {
        let s = state(&[("count", 1)]);
        let runs = Rc::new(Cell::new(0));
        let counter = runs.clone();
        let reader = s.clone();
        let doubled = computed(move || {
            counter.set(counter.get() + 1);
            Ok(Value::from(num(&reader.get("count")) * 2.0))
        });

        assert_eq!(runs.get(), 0, "lazy until first read");
        assert_eq!(doubled.get().unwrap(), Value::from(2));
        assert_eq!(doubled.get().unwrap(), Value::from(2));
        assert_eq!(runs.get(), 1);

        s.assign("count", Value::from(5));
        assert!(doubled.is_dirty());
        assert_eq!(doubled.get().unwrap(), Value::from(10));
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_reader_of_computed_depends_transitively() {
        let s = state(&[("count", 1)]);
        let reader = s.clone();
        let doubled = computed(move || Ok(Value::from(num(&reader.get("count")) * 2.0)));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let d = doubled.clone();
        let _handle = watch(
            move || d.get(),
            move |new, _| {
                sink.borrow_mut().push(num(new));
                Ok(())
            },
            WatchOptions { sync: true, ..Default::default() },
        );
        s.assign("count", Value::from(3));
        assert_eq!(*seen.borrow(), vec![6.0]);
    }

    #[test]
    fn test_computed_without_setter_warns() {
        let c = computed(|| Ok(Value::from(1)));
        assert!(!c.set(Value::from(2)).unwrap());
        let sink = Rc::new(Cell::new(0.0));
        let target = sink.clone();
        let writable = computed(|| Ok(Value::Null)).with_setter(move |v| {
            target.set(num(&v));
            Ok(())
        });
        assert!(writable.set(Value::from(4)).unwrap());
        assert_eq!(sink.get(), 4.0);
    }

    #[test]
    fn test_computed_error_retries() {
        let s = state(&[("ok", 0)]);
        let reader = s.clone();
        let c = computed(move || {
            if reader.get("ok").truthy() {
                Ok(Value::from("fine"))
            } else {
                Err(ViewError::msg("not ready"))
            }
        });
        assert!(c.get().is_err());
        assert!(c.is_dirty());
        s.assign("ok", Value::from(1));
        assert_eq!(c.get().unwrap(), Value::from("fine"));
    }

    #[test]
    fn test_watch_immediate_and_unwatch() {
        let s = state(&[("a", 1)]);
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = calls.clone();
        let reader = s.clone();
        let handle = watch(
            move || Ok(reader.get("a")),
            move |new, old| {
                sink.borrow_mut().push((num(new), old.clone()));
                Ok(())
            },
            WatchOptions { immediate: true, sync: true, ..Default::default() },
        );
        assert_eq!(*calls.borrow(), vec![(1.0, Value::Null)]);

        handle.unwatch();
        s.assign("a", Value::from(2));
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn test_watch_batches_through_scheduler() {
        config::reset_config();
        scheduler::reset_scheduler();
        let s = state(&[("a", 1)]);
        let calls = Rc::new(Cell::new(0));
        let sink = calls.clone();
        let reader = s.clone();
        let _handle = watch(
            move || Ok(reader.get("a")),
            move |_, _| {
                sink.set(sink.get() + 1);
                Ok(())
            },
            WatchOptions::default(),
        );
        s.assign("a", Value::from(2));
        s.assign("a", Value::from(3));
        assert_eq!(calls.get(), 0);
        scheduler::tick();
        assert_eq!(calls.get(), 1);
        scheduler::reset_scheduler();
    }

    #[test]
    fn test_dropping_handle_stops_watch() {
        let s = state(&[("a", 1)]);
        let calls = Rc::new(Cell::new(0));
        let sink = calls.clone();
        let reader = s.clone();
        {
            let _handle = watch(
                move || Ok(reader.get("a")),
                move |_, _| {
                    sink.set(sink.get() + 1);
                    Ok(())
                },
                WatchOptions { sync: true, ..Default::default() },
            );
        }
        s.assign("a", Value::from(2));
        assert_eq!(calls.get(), 0);
    }
}
