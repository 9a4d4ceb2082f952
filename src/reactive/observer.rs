//! Making containers reactive.
//!
//! [`observe`] attaches an [`Observer`] to an object or array (at most once)
//! and converts every own property of an object into a reactive property via
//! [`define_reactive`]. The observer's own dependency set is what structural
//! changes notify: keys added with [`set`], keys removed with [`del`], and
//! array mutations.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use super::dep::Dep;
use super::value::{Array, Field, Object, Property, Value};
use crate::error::warn;

// =============================================================================
// Observing Toggle
// =============================================================================

thread_local! {
    static SHOULD_OBSERVE: Cell<bool> = const { Cell::new(true) };
}

/// Enable or disable attaching new observers.
///
/// Used while assigning props so that values handed down from a parent are
/// not deep-converted by the child. Existing observers are still returned.
pub fn toggle_observing(enabled: bool) {
    SHOULD_OBSERVE.with(|s| s.set(enabled));
}

/// Whether [`observe`] will attach new observers.
pub fn should_observe() -> bool {
    SHOULD_OBSERVE.with(Cell::get)
}

// =============================================================================
// Observer
// =============================================================================

struct ObserverInner {
    dep: Dep,
    /// How many component instances use the container as their root data.
    vm_count: Cell<usize>,
}

/// Marker attached to an observed container.
#[derive(Clone)]
pub struct Observer(Rc<ObserverInner>);

impl Observer {
    fn new() -> Self {
        Self(Rc::new(ObserverInner {
            dep: Dep::new(),
            vm_count: Cell::new(0),
        }))
    }

    /// Dependency set notified on structural changes.
    pub fn dep(&self) -> &Dep {
        &self.0.dep
    }

    pub fn vm_count(&self) -> usize {
        self.0.vm_count.get()
    }

    pub(crate) fn add_vm(&self) {
        self.0.vm_count.set(self.0.vm_count.get() + 1);
    }

    pub(crate) fn remove_vm(&self) {
        self.0.vm_count.set(self.0.vm_count.get().saturating_sub(1));
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("dep", &self.0.dep.id())
            .field("vm_count", &self.vm_count())
            .finish()
    }
}

/// Attach an observer to `value` if it is a container and does not have one.
///
/// Primitives and opaque values yield `None`, as do non-extensible containers
/// and any new container while observing is toggled off. `as_root` marks the
/// container as a component's root data.
pub fn observe(value: &Value, as_root: bool) -> Option<Observer> {
    let ob = match value {
        Value::Object(object) => match object.observer() {
            Some(ob) => Some(ob),
            None if should_observe() && object.is_extensible() => Some(observe_object(object)),
            None => None,
        },
        Value::Array(array) => match array.observer() {
            Some(ob) => Some(ob),
            None if should_observe() && array.is_extensible() => Some(observe_array(array)),
            None => None,
        },
        _ => None,
    };
    if as_root {
        if let Some(ob) = &ob {
            ob.add_vm();
        }
    }
    ob
}

fn observe_object(object: &Object) -> Observer {
    let ob = Observer::new();
    // The cell is empty: the caller just checked.
    let _ = object.0.observer.set(ob.clone());
    for key in object.keys() {
        define_reactive(object, &key, None);
    }
    ob
}

fn observe_array(array: &Array) -> Observer {
    let ob = Observer::new();
    let _ = array.0.observer.set(ob.clone());
    observe_items(&array.peek_vec());
    ob
}

/// Observe each element.
pub(crate) fn observe_items(items: &[Value]) {
    for item in items {
        observe(item, false);
    }
}

/// Register the current watcher with every observed element of `array`,
/// recursing into nested arrays.
pub(crate) fn depend_array(array: &Array) {
    for item in array.peek_vec() {
        if let Some(ob) = item.observer() {
            ob.dep().depend();
        }
        if let Value::Array(inner) = &item {
            depend_array(inner);
        }
    }
}

// =============================================================================
// Reactive Properties
// =============================================================================

/// Convert `key` on `object` into a reactive property.
///
/// With `value` given, the property is (re)initialised to it; otherwise the
/// current value is kept. Sealed properties are left alone. A property with
/// a getter but no setter keeps its accessor and its current value is not
/// observed.
pub fn define_reactive(object: &Object, key: &str, value: Option<Value>) {
    let existing = object.property(key);
    if existing.as_ref().is_some_and(|p| !p.configurable) {
        return;
    }
    let accessor = existing.as_ref().and_then(|p| p.accessor.clone());
    let getter_only = accessor.as_ref().is_some_and(|a| a.set.is_none());

    let initial = match value {
        Some(value) => value,
        None if getter_only => Value::Null,
        None => match (&existing, &accessor) {
            (_, Some(accessor)) => (accessor.get)(),
            (Some(prop), None) => prop.value.clone(),
            (None, None) => Value::Null,
        },
    };
    observe(&initial, false);

    object.put_property(
        key,
        Property {
            value: initial,
            dep: Some(Dep::new()),
            accessor,
            configurable: true,
        },
    );
}

/// Add or update a property and notify, even when the key is new.
///
/// Arrays take an index: writing past the end pads with `Null`. Returns the
/// written value.
pub fn set(target: &Value, field: impl Into<Field>, value: Value) -> Value {
    let field = field.into();
    match (target, field) {
        (Value::Array(array), Field::Index(index)) => {
            {
                let mut items = array.0.items.borrow_mut();
                if index >= items.len() {
                    items.resize(index + 1, Value::Null);
                }
            }
            array.splice(index, 1, vec![value.clone()]);
            value
        }
        (Value::Object(object), Field::Name(key)) => {
            if object.contains_key(&key) {
                object.assign(&key, value.clone());
                return value;
            }
            let Some(ob) = object.observer() else {
                object.assign(&key, value.clone());
                return value;
            };
            if ob.vm_count() > 0 {
                warn(
                    "Avoid adding reactive properties to a component's root data at runtime - \
                     declare it upfront in the data option.",
                );
                return value;
            }
            if !object.is_extensible() {
                warn(format_args!("Cannot add property \"{key}\": object is not extensible"));
                return value;
            }
            define_reactive(object, &key, Some(value.clone()));
            ob.dep().notify();
            value
        }
        (target, field) => {
            warn(format_args!(
                "Cannot set reactive property \"{field}\" on {} value",
                target.type_name()
            ));
            value
        }
    }
}

/// Remove a property and notify if the container is observed.
pub fn del(target: &Value, field: impl Into<Field>) {
    let field = field.into();
    match (target, field) {
        (Value::Array(array), Field::Index(index)) => {
            if index < array.0.items.borrow().len() {
                array.splice(index, 1, Vec::new());
            }
        }
        (Value::Object(object), Field::Name(key)) => {
            let ob = object.observer();
            if ob.as_ref().is_some_and(|ob| ob.vm_count() > 0) {
                warn(
                    "Avoid deleting properties on a component's root data - just set it to null.",
                );
                return;
            }
            if object.property(&key).is_some_and(|p| !p.configurable) {
                return;
            }
            if object.remove_property(&key).is_none() {
                return;
            }
            if let Some(ob) = ob {
                ob.dep().notify();
            }
        }
        (target, field) => {
            warn(format_args!(
                "Cannot delete reactive property \"{field}\" on {} value",
                target.type_name()
            ));
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::watcher::{Watcher, WatcherFlags, WatcherOptions};
    use std::cell::RefCell;

    fn sync_watch(getter: impl Fn() -> Value + 'static) -> (Watcher, Rc<RefCell<usize>>) {
        let runs = Rc::new(RefCell::new(0usize));
        let counter = runs.clone();
        let watcher = Watcher::new(
            move || {
                *counter.borrow_mut() += 1;
                Ok(getter())
            },
            None,
            WatcherOptions {
                flags: WatcherFlags::SYNC,
                ..Default::default()
            },
        )
        .unwrap();
        (watcher, runs)
    }

    fn data(pairs: &[(&str, Value)]) -> Object {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn test_observe_is_idempotent() {
        toggle_observing(true);
        let obj = Value::from(data(&[("a", Value::from(1))]));
        let first = observe(&obj, false).unwrap();
        let second = observe(&obj, true).unwrap();
        assert_eq!(first.dep().id(), second.dep().id());
        assert_eq!(second.vm_count(), 1);
        assert!(obj.as_object().unwrap().is_reactive("a"));
    }

    #[test]
    fn test_primitives_not_observed() {
        assert!(observe(&Value::from(3), false).is_none());
        assert!(observe(&Value::Null, false).is_none());
    }

    #[test]
    fn test_toggle_observing() {
        toggle_observing(false);
        let obj = Value::from(Object::new());
        assert!(observe(&obj, false).is_none());
        toggle_observing(true);
        assert!(observe(&obj, false).is_some());
    }

    #[test]
    fn test_nested_objects_observed() {
        toggle_observing(true);
        let inner = data(&[("x", Value::from(1))]);
        let outer = Value::from(data(&[("inner", Value::from(inner.clone()))]));
        observe(&outer, false);
        assert!(inner.observer().is_some());
        assert!(inner.is_reactive("x"));
    }

    #[test]
    fn test_reactive_write_notifies_reader() {
        toggle_observing(true);
        let obj = data(&[("count", Value::from(0))]);
        observe(&Value::from(obj.clone()), false);
        let reader = obj.clone();
        let (watcher, runs) = sync_watch(move || reader.get("count"));
        assert_eq!(*runs.borrow(), 1);

        obj.assign("count", Value::from(1));
        assert_eq!(*runs.borrow(), 2);
        assert_eq!(watcher.value(), Value::from(1));

        // Same value: no notification.
        obj.assign("count", Value::from(1));
        assert_eq!(*runs.borrow(), 2);
    }

    #[test]
    fn test_nan_write_does_not_notify() {
        toggle_observing(true);
        let obj = data(&[("n", Value::from(f64::NAN))]);
        observe(&Value::from(obj.clone()), false);
        let reader = obj.clone();
        let (_watcher, runs) = sync_watch(move || reader.get("n"));
        obj.assign("n", Value::from(f64::NAN));
        assert_eq!(*runs.borrow(), 1);
    }

    #[test]
    fn test_set_new_key_notifies_container_readers() {
        toggle_observing(true);
        let obj = data(&[("a", Value::from(1))]);
        let holder = data(&[("obj", Value::from(obj.clone()))]);
        observe(&Value::from(holder.clone()), false);

        let reader = holder.clone();
        let (_watcher, runs) = sync_watch(move || reader.get("obj"));
        set(&Value::from(obj.clone()), "b", Value::from(2));
        assert_eq!(*runs.borrow(), 2);
        assert!(obj.is_reactive("b"));

        del(&Value::from(obj.clone()), "b");
        assert_eq!(*runs.borrow(), 3);
        assert!(!obj.contains_key("b"));
    }

    #[test]
    fn test_set_on_root_data_refused() {
        toggle_observing(true);
        let root = Value::from(Object::new());
        observe(&root, true);
        set(&root, "late", Value::from(1));
        assert!(!root.as_object().unwrap().contains_key("late"));
    }

    #[test]
    fn test_set_array_index_pads() {
        toggle_observing(true);
        let arr = Value::from(Array::from_vec(vec![Value::from(1)]));
        observe(&arr, false);
        set(&arr, 3usize, Value::from(9));
        assert_eq!(
            arr.as_array().unwrap().peek_vec(),
            vec![Value::from(1), Value::Null, Value::Null, Value::from(9)]
        );
        del(&arr, 0usize);
        assert_eq!(arr.as_array().unwrap().peek_vec().len(), 3);
    }

    #[test]
    fn test_sealed_property_stays_plain() {
        toggle_observing(true);
        let obj = data(&[("fixed", Value::from(1))]);
        obj.seal_property("fixed");
        observe(&Value::from(obj.clone()), false);
        assert!(!obj.is_reactive("fixed"));
    }

    #[test]
    fn test_non_extensible_not_observed() {
        toggle_observing(true);
        let obj = Object::new();
        obj.prevent_extensions();
        assert!(observe(&Value::from(obj), false).is_none());
    }

    #[test]
    fn test_getter_only_property_ignores_writes() {
        toggle_observing(true);
        let obj = Object::new();
        obj.define_accessor("answer", || Value::from(42), None);
        observe(&Value::from(obj.clone()), false);
        obj.assign("answer", Value::from(1));
        assert_eq!(obj.get("answer"), Value::from(42));
    }
}
