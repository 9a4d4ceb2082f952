//! Dependency tracking, batching and error routing, end to end.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use spark_view::reactive::{computed, observe, set, watch, Array, Object, Value, WatchOptions};
use spark_view::{reset_runtime, set_error_handler, tick, ViewError, Watcher, WatcherOptions};

fn state<V: Into<Value>>(pairs: impl IntoIterator<Item = (&'static str, V)>) -> Object {
    let object: Object = pairs.into_iter().collect();
    observe(&Value::from(object.clone()), false);
    object
}

fn number(value: &Value) -> f64 {
    value.as_f64().unwrap_or(0.0)
}

/// Watcher counting its evaluations.
fn counting(read: impl Fn() -> Value + 'static) -> (Watcher, Rc<Cell<usize>>) {
    let runs = Rc::new(Cell::new(0));
    let counter = runs.clone();
    let watcher = Watcher::new(
        move || {
            counter.set(counter.get() + 1);
            Ok(read())
        },
        None,
        WatcherOptions::default(),
    )
    .unwrap();
    (watcher, runs)
}

// =============================================================================
// Scenario A
// =============================================================================

#[test]
fn test_computed_doubles_once_per_change() {
    reset_runtime();
    let s = state([("count", 0)]);
    let evaluations = Rc::new(Cell::new(0));
    let counter = evaluations.clone();
    let r = s.clone();
    let doubled = computed(move || {
        counter.set(counter.get() + 1);
        Ok(Value::from(number(&r.get("count")) * 2.0))
    });
    assert_eq!(doubled.get().unwrap(), Value::from(0));
    assert_eq!(evaluations.get(), 1);

    s.assign("count", Value::from(5));
    assert!(doubled.is_dirty());
    assert_eq!(doubled.get().unwrap(), Value::from(10));
    assert_eq!(doubled.get().unwrap(), Value::from(10));
    assert_eq!(evaluations.get(), 2);
}

// =============================================================================
// P1-P3
// =============================================================================

#[test]
fn test_repeated_reads_schedule_once() {
    reset_runtime();
    let s = state([("p", 1)]);
    let r = s.clone();
    let (watcher, runs) = counting(move || {
        let a = r.get("p");
        let _ = r.get("p");
        let _ = r.get("p");
        a
    });
    assert_eq!(watcher.dep_ids().len(), 1);

    s.assign("p", Value::from(2));
    assert_eq!(spark_view::scheduler::queued_len(), 1);
    tick();
    assert_eq!(runs.get(), 2);
}

#[test]
fn test_stale_dependency_dropped() {
    reset_runtime();
    let s = state([("x", Value::from(true)), ("p", Value::from(1))]);
    let r = s.clone();
    let (_watcher, runs) = counting(move || {
        if r.get("x").truthy() {
            r.get("p")
        } else {
            Value::Null
        }
    });

    s.assign("x", Value::from(false));
    tick();
    assert_eq!(runs.get(), 2);

    s.assign("p", Value::from(99));
    tick();
    assert_eq!(runs.get(), 2, "p is no longer a dependency");
}

#[test]
fn test_many_writes_one_evaluation() {
    reset_runtime();
    let s = state([("a", 0), ("b", 0), ("c", 0), ("d", 0)]);
    let r = s.clone();
    let (_watcher, runs) = counting(move || {
        Value::from(["a", "b", "c", "d"].iter().map(|k| number(&r.get(k))).sum::<f64>())
    });

    for (i, key) in ["a", "b", "c", "d"].iter().enumerate() {
        s.assign(key, Value::from(i as i32 + 1));
    }
    tick();
    assert_eq!(runs.get(), 2);
}

// =============================================================================
// Scenario C
// =============================================================================

#[test]
fn test_throwing_getter_keeps_cached_value() {
    reset_runtime();
    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = errors.clone();
    set_error_handler(move |err, scope, info| {
        assert!(scope.is_none());
        sink.borrow_mut().push(format!("{info}: {err}"));
        Ok(())
    });

    let s = state([("n", 1)]);
    let r = s.clone();
    let changes = Rc::new(Cell::new(0));
    let counter = changes.clone();
    let handle = watch(
        move || {
            let n = number(&r.get("n"));
            if n < 0.0 {
                return Err(ViewError::msg("negative"));
            }
            Ok(Value::from(n))
        },
        move |_, _| {
            counter.set(counter.get() + 1);
            Ok(())
        },
        WatchOptions::default(),
    );
    assert_eq!(handle.watcher().value(), Value::from(1));

    s.assign("n", Value::from(-1));
    tick();
    assert_eq!(errors.borrow().len(), 1);
    assert!(errors.borrow()[0].contains("negative"));
    assert_eq!(handle.watcher().value(), Value::from(1));
    assert_eq!(changes.get(), 0);

    // Still subscribed: recovering fires the callback.
    s.assign("n", Value::from(3));
    tick();
    assert_eq!(handle.watcher().value(), Value::from(3));
    assert_eq!(changes.get(), 1);
    reset_runtime();
}

// =============================================================================
// Containers
// =============================================================================

#[test]
fn test_deep_watch_sees_nested_and_added_keys() {
    reset_runtime();
    let inner = Object::new();
    inner.assign("a", Value::from(1));
    let s = state([("inner", Value::from(inner.clone()))]);
    let hits = Rc::new(Cell::new(0));
    let counter = hits.clone();
    let r = s.clone();
    let _handle = watch(
        move || Ok(r.get("inner")),
        move |_, _| {
            counter.set(counter.get() + 1);
            Ok(())
        },
        WatchOptions {
            deep: true,
            ..Default::default()
        },
    );

    inner.assign("a", Value::from(2));
    tick();
    assert_eq!(hits.get(), 1);

    set(&Value::from(inner.clone()), "b", Value::from(1));
    tick();
    assert_eq!(hits.get(), 2);
}

#[test]
fn test_array_mutations_notify_readers() {
    reset_runtime();
    let list = Array::from_vec(vec![Value::from(1), Value::from(2)]);
    let s = state([("list", Value::from(list.clone()))]);
    let r = s.clone();
    let (_watcher, runs) = counting(move || {
        let list = r.get("list");
        Value::from(list.as_array().map_or(0, Array::len))
    });

    list.push([Value::from(3)]);
    tick();
    assert_eq!(runs.get(), 2);

    list.reverse();
    tick();
    assert_eq!(runs.get(), 3);

    // Items pushed later are observed too.
    let item = Object::new();
    item.assign("v", Value::from(0));
    list.push([Value::from(item.clone())]);
    assert!(item.observer().is_some());
}

#[test]
fn test_sync_watch_fires_immediately() {
    reset_runtime();
    let s = state([("a", 1)]);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let r = s.clone();
    let _handle = watch(
        move || Ok(r.get("a")),
        move |new, old| {
            sink.borrow_mut().push((number(old), number(new)));
            Ok(())
        },
        WatchOptions {
            sync: true,
            immediate: true,
            ..Default::default()
        },
    );
    s.assign("a", Value::from(2));
    s.assign("a", Value::from(3));
    assert_eq!(*seen.borrow(), vec![(0.0, 1.0), (1.0, 2.0), (2.0, 3.0)]);
}
