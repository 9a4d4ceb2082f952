//! Batched, ordered flushing of watchers.
//!
//! Invalidated watchers are queued at most once and flushed together on the
//! next tick (or immediately when `async_flush` is off). A flush:
//!
//! 1. sorts the queue by watcher id, so parents render before children and
//!    user watchers run before the render watcher of the same component;
//! 2. walks the queue by index, because running a watcher can enqueue more;
//!    a watcher queued mid-flush is inserted in id order after the current
//!    position, and re-runs if it was already passed;
//! 3. counts re-runs per watcher and, past `max_update_count`, reports an
//!    infinite-update error and skips that watcher for the rest of the flush;
//! 4. resets, then runs activated hooks and finally the post-flush (updated)
//!    hooks in reverse queue order, so children observe their updated hooks
//!    before parents. A watcher that ran more than once in the flush gets its
//!    post-flush hook once.

pub mod next_tick;

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use crate::component::{lifecycle, Component};
use crate::config;
use crate::error::{handle_error, ViewError};
use crate::reactive::Watcher;
use crate::types::WatcherId;

pub use next_tick::{clear_tick_driver, has_pending, next_tick, set_tick_driver, tick};

// =============================================================================
// State
// =============================================================================

#[derive(Default)]
struct SchedulerState {
    queue: Vec<Watcher>,
    activated: Vec<Component>,
    has: HashSet<WatcherId>,
    circular: HashMap<WatcherId, usize>,
    /// Watchers cut off by the cycle guard until the flush ends.
    excluded: HashSet<WatcherId>,
    waiting: bool,
    flushing: bool,
    index: usize,
}

thread_local! {
    static SCHEDULER: RefCell<SchedulerState> = RefCell::new(SchedulerState::default());
}

/// Whether a flush is in progress.
pub fn is_flushing() -> bool {
    SCHEDULER.with(|s| s.borrow().flushing)
}

/// Number of watchers waiting in the queue.
pub fn queued_len() -> usize {
    SCHEDULER.with(|s| s.borrow().queue.len())
}

// =============================================================================
// Queueing
// =============================================================================

/// Queue a watcher for the next flush. Duplicate ids are ignored.
pub fn queue_watcher(watcher: Watcher) {
    let id = watcher.id();
    let schedule = SCHEDULER.with(|s| {
        let mut s = s.borrow_mut();
        if s.has.contains(&id) || (s.flushing && s.excluded.contains(&id)) {
            return false;
        }
        s.has.insert(id);
        if s.flushing {
            let mut at = s.queue.len();
            while at > s.index + 1 && s.queue[at - 1].id() > id {
                at -= 1;
            }
            s.queue.insert(at, watcher);
        } else {
            s.queue.push(watcher);
        }
        !std::mem::replace(&mut s.waiting, true)
    });
    if schedule {
        if config::async_flush() {
            next_tick(|| {
                flush_scheduler_queue();
                Ok(())
            });
        } else {
            flush_scheduler_queue();
        }
    }
}

/// Queue a component re-activated during a patch; its activated hooks run
/// after the flush.
pub(crate) fn queue_activated_component(component: Component) {
    component.set_inactive(Some(false));
    SCHEDULER.with(|s| s.borrow_mut().activated.push(component));
}

// =============================================================================
// Flush
// =============================================================================

/// Run every queued watcher. Normally called through the tick.
pub fn flush_scheduler_queue() {
    let size = SCHEDULER.with(|s| {
        let mut s = s.borrow_mut();
        if s.flushing {
            return None;
        }
        s.flushing = true;
        s.queue.sort_by_key(Watcher::id);
        s.index = 0;
        Some(s.queue.len())
    });
    let Some(size) = size else { return };
    tracing::debug!(watchers = size, "flush start");

    let max = config::max_update_count();
    loop {
        let next = SCHEDULER.with(|s| {
            let s = s.borrow();
            s.queue.get(s.index).cloned()
        });
        let Some(watcher) = next else { break };
        let id = watcher.id();

        let excluded = SCHEDULER.with(|s| s.borrow().excluded.contains(&id));
        if !excluded {
            watcher.call_before();
            SCHEDULER.with(|s| s.borrow_mut().has.remove(&id));
            watcher.run();

            let looping = SCHEDULER.with(|s| {
                let mut s = s.borrow_mut();
                if !s.has.contains(&id) {
                    return false;
                }
                let count = s.circular.entry(id).or_insert(0);
                *count += 1;
                if *count > max {
                    s.excluded.insert(id);
                    true
                } else {
                    false
                }
            });
            if looping {
                tracing::warn!(watcher = %id, "infinite update loop");
                let owner = watcher.owner();
                handle_error(
                    ViewError::InfiniteUpdate {
                        id,
                        expression: watcher.expression().to_string(),
                    },
                    owner.as_deref(),
                    "scheduler flush",
                );
            }
        }

        SCHEDULER.with(|s| s.borrow_mut().index += 1);
    }

    let (activated, ran) = SCHEDULER.with(|s| {
        let mut s = s.borrow_mut();
        let activated = std::mem::take(&mut s.activated);
        let ran = std::mem::take(&mut s.queue);
        *s = SchedulerState::default();
        (activated, ran)
    });
    tracing::debug!(watchers = ran.len(), "flush end");

    for component in &activated {
        component.set_inactive(Some(true));
        lifecycle::activate_child_component(component, true);
    }

    // Once per watcher, however often it was re-queued.
    let mut seen = HashSet::new();
    for watcher in ran.iter().rev() {
        if seen.insert(watcher.id()) {
            watcher.call_after_flush();
        }
    }
}

/// Clear the queue and pending ticks (for testing).
pub fn reset_scheduler() {
    SCHEDULER.with(|s| *s.borrow_mut() = SchedulerState::default());
    next_tick::reset_next_tick();
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{observe, toggle_observing, Object, Value, WatcherOptions};
    use std::cell::Cell;
    use std::rc::Rc;

    fn reset() {
        config::reset_config();
        reset_scheduler();
        toggle_observing(true);
    }

    fn state(pairs: &[(&str, i32)]) -> Object {
        let obj: Object = pairs.iter().copied().collect();
        observe(&Value::from(obj.clone()), false);
        obj
    }

    fn recording_watcher(
        log: &Rc<RefCell<Vec<String>>>,
        name: &'static str,
        read: impl Fn() -> Value + 'static,
    ) -> Watcher {
        let log = log.clone();
        Watcher::new(
            move || {
                log.borrow_mut().push(name.to_string());
                Ok(read())
            },
            None,
            WatcherOptions {
                expression: name.into(),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_batches_and_dedupes() {
        reset();
        let s = state(&[("a", 1)]);
        let log = Rc::new(RefCell::new(Vec::new()));
        let r = s.clone();
        let _w = recording_watcher(&log, "w", move || r.get("a"));
        log.borrow_mut().clear();

        s.assign("a", Value::from(2));
        s.assign("a", Value::from(3));
        assert_eq!(queued_len(), 1);
        assert!(log.borrow().is_empty());

        tick();
        assert_eq!(*log.borrow(), vec!["w"]);
        assert_eq!(queued_len(), 0);
    }

    #[test]
    fn test_flush_runs_in_id_order() {
        reset();
        let s = state(&[("a", 1), ("b", 1)]);
        let log = Rc::new(RefCell::new(Vec::new()));
        let (ra, rb) = (s.clone(), s.clone());
        let _first = recording_watcher(&log, "first", move || ra.get("a"));
        let _second = recording_watcher(&log, "second", move || rb.get("b"));
        log.borrow_mut().clear();

        // Invalidate in reverse creation order.
        s.assign("b", Value::from(2));
        s.assign("a", Value::from(2));
        tick();
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_sync_mode_flushes_immediately() {
        reset();
        config::set_async_flush(false);
        let s = state(&[("a", 1)]);
        let log = Rc::new(RefCell::new(Vec::new()));
        let r = s.clone();
        let _w = recording_watcher(&log, "w", move || r.get("a"));
        log.borrow_mut().clear();

        s.assign("a", Value::from(2));
        assert_eq!(*log.borrow(), vec!["w"]);
        config::reset_config();
    }

    #[test]
    fn test_watcher_queued_mid_flush_runs_same_flush() {
        reset();
        let s = state(&[("a", 1), ("b", 1)]);
        let log = Rc::new(RefCell::new(Vec::new()));
        let rb = s.clone();
        let writer_state = s.clone();
        let ra = s.clone();
        let _reader_of_b = recording_watcher(&log, "reader", move || rb.get("b"));
        let _writer = recording_watcher(&log, "writer", move || {
            let a = ra.get("a");
            writer_state.assign("b", a.clone());
            a
        });
        log.borrow_mut().clear();

        s.assign("a", Value::from(5));
        tick();
        assert_eq!(*log.borrow(), vec!["writer", "reader"]);
        assert_eq!(s.peek("b"), Value::from(5));
    }

    #[test]
    fn test_cycle_guard_reports_and_terminates() {
        reset();
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = errors.clone();
        config::set_error_handler(move |err, _, _| {
            sink.borrow_mut().push(matches!(err, ViewError::InfiniteUpdate { .. }));
            Ok(())
        });

        let s = state(&[("n", 0)]);
        let runs = Rc::new(Cell::new(0usize));
        let counter = runs.clone();
        let r = s.clone();
        let _w = Watcher::new(
            move || {
                counter.set(counter.get() + 1);
                let n = r.get("n").as_f64().unwrap_or(0.0);
                r.assign("n", Value::from(n + 1.0));
                Ok(Value::Null)
            },
            None,
            WatcherOptions::default(),
        )
        .unwrap();
        // Priming already queued one re-run.
        tick();

        assert_eq!(*errors.borrow(), vec![true]);
        assert_eq!(runs.get(), 1 + config::DEFAULT_MAX_UPDATE_COUNT + 1);
        assert!(!is_flushing());
        config::reset_config();
        reset_scheduler();
    }

    #[test]
    fn test_teardown_after_queue_skips_run() {
        reset();
        let s = state(&[("a", 1)]);
        let log = Rc::new(RefCell::new(Vec::new()));
        let r = s.clone();
        let w = recording_watcher(&log, "w", move || r.get("a"));
        log.borrow_mut().clear();

        s.assign("a", Value::from(2));
        assert_eq!(queued_len(), 1);
        w.teardown();
        tick();
        assert!(log.borrow().is_empty());
        assert_eq!(queued_len(), 0);
        assert!(!is_flushing());

        s.assign("a", Value::from(3));
        assert_eq!(queued_len(), 0);
    }

    #[test]
    fn test_requeued_watcher_gets_one_after_flush_call() {
        reset();
        let s = state(&[("n", 0)]);
        let runs = Rc::new(Cell::new(0usize));
        let afters = Rc::new(Cell::new(0usize));
        let (counter, after_counter) = (runs.clone(), afters.clone());
        let r = s.clone();
        let _w = Watcher::new(
            move || {
                counter.set(counter.get() + 1);
                let n = r.get("n").as_f64().unwrap_or(0.0);
                if n < 2.0 {
                    r.assign("n", Value::from(n + 1.0));
                }
                Ok(Value::Null)
            },
            None,
            WatcherOptions {
                after_flush: Some(Rc::new(move || after_counter.set(after_counter.get() + 1))),
                ..Default::default()
            },
        )
        .unwrap();
        // Priming wrote n and queued the first re-run.
        tick();
        assert_eq!(runs.get(), 3);
        assert_eq!(s.peek("n"), Value::from(2));
        assert_eq!(afters.get(), 1);
    }

    #[test]
    fn test_after_flush_hooks_run_in_reverse() {
        reset();
        let s = state(&[("a", 1)]);
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut keep = Vec::new();
        for name in ["parent", "child"] {
            let r = s.clone();
            let after_log = log.clone();
            keep.push(
                Watcher::new(
                    move || Ok(r.get("a")),
                    None,
                    WatcherOptions {
                        after_flush: Some(Rc::new(move || after_log.borrow_mut().push(name))),
                        ..Default::default()
                    },
                )
                .unwrap(),
            );
        }
        s.assign("a", Value::from(2));
        tick();
        assert_eq!(*log.borrow(), vec!["child", "parent"]);
    }
}
