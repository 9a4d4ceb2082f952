//! Option merging.
//!
//! Pure function of two option records; neither input is modified.
//!
//! | Option | Strategy |
//! |---|---|
//! | `name`, `render` | child wins when present |
//! | `data`, `provide` | both factories run; objects merge recursively, child wins |
//! | hooks, `error_captured` | parent first, then child, duplicates dropped |
//! | `watch` | concatenated, parent first |
//! | `props`, `computed`, `methods`, `components`, `inject` | parent map extended, child overrides |

use std::rc::Rc;

use indexmap::IndexMap;

use super::options::{ComponentOptions, DataFn};
use crate::reactive::{Object, Value};

pub fn merge_options(parent: &ComponentOptions, child: &ComponentOptions) -> ComponentOptions {
    let mut hooks = parent.hooks.clone();
    for (hook, handlers) in &child.hooks {
        let merged = hooks.entry(*hook).or_default();
        merged.extend(handlers.iter().cloned());
        dedupe(merged);
    }
    for handlers in hooks.values_mut() {
        dedupe(handlers);
    }

    let mut error_captured = parent.error_captured.clone();
    error_captured.extend(child.error_captured.iter().cloned());
    dedupe(&mut error_captured);

    let mut watch = parent.watch.clone();
    watch.extend(child.watch.iter().cloned());

    ComponentOptions {
        name: child.name.clone().or_else(|| parent.name.clone()),
        data: merge_data_fn(parent.data.as_ref(), child.data.as_ref()),
        props: extend_map(&parent.props, &child.props),
        computed: extend_map(&parent.computed, &child.computed),
        methods: extend_map(&parent.methods, &child.methods),
        watch,
        hooks,
        error_captured,
        components: extend_map(&parent.components, &child.components),
        provide: merge_data_fn(parent.provide.as_ref(), child.provide.as_ref()),
        inject: extend_map(&parent.inject, &child.inject),
        render: child.render.clone().or_else(|| parent.render.clone()),
    }
}

fn extend_map<V: Clone>(parent: &IndexMap<String, V>, child: &IndexMap<String, V>) -> IndexMap<String, V> {
    let mut merged = parent.clone();
    for (key, value) in child {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Drop later entries that are the same function as an earlier one.
fn dedupe<T: ?Sized>(handlers: &mut Vec<Rc<T>>) {
    let mut kept: Vec<Rc<T>> = Vec::with_capacity(handlers.len());
    for handler in handlers.drain(..) {
        if !kept.iter().any(|k| Rc::ptr_eq(k, &handler)) {
            kept.push(handler);
        }
    }
    *handlers = kept;
}

fn merge_data_fn(parent: Option<&DataFn>, child: Option<&DataFn>) -> Option<DataFn> {
    match (parent, child) {
        (None, None) => None,
        (Some(only), None) | (None, Some(only)) => Some(only.clone()),
        (Some(parent), Some(child)) => {
            let (parent, child) = (parent.clone(), child.clone());
            Some(Rc::new(move |vm| {
                let to = child(vm)?;
                let from = parent(vm)?;
                merge_data(&to, &from);
                Ok(to)
            }))
        }
    }
}

/// Copy keys of `from` missing in `to`; recurse where both hold objects.
pub(crate) fn merge_data(to: &Object, from: &Object) {
    for key in from.keys() {
        let from_value = from.peek(&key);
        if !to.contains_key(&key) {
            to.assign(&key, from_value);
            continue;
        }
        let to_value = to.peek(&key);
        if let (Value::Object(to_obj), Value::Object(from_obj)) = (&to_value, &from_value) {
            if !to_obj.ptr_eq(from_obj) {
                merge_data(to_obj, from_obj);
            }
        }
    }
}
