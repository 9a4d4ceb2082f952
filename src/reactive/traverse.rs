//! Deep traversal for deep watchers.
//!
//! Reads every nested property of a value while a watcher is evaluating, so
//! that a change anywhere in the structure re-runs it. Observed containers
//! are visited once per traversal, keyed by their dependency set's id, which
//! keeps cyclic structures finite.

use std::collections::HashSet;
use std::rc::Rc;

use super::value::Value;
use crate::types::DepId;

#[derive(Default)]
struct Seen {
    deps: HashSet<DepId>,
    // Unobserved containers have no dependency set.
    raw: HashSet<usize>,
}

impl Seen {
    fn first_visit(&mut self, value: &Value) -> bool {
        if let Some(ob) = value.observer() {
            return self.deps.insert(ob.dep().id());
        }
        let addr = match value {
            Value::Object(o) => Rc::as_ptr(&o.0) as *const () as usize,
            Value::Array(a) => Rc::as_ptr(&a.0) as *const () as usize,
            _ => return false,
        };
        self.raw.insert(addr)
    }
}

/// Touch every reachable property of `value`.
pub fn traverse(value: &Value) {
    let mut seen = Seen::default();
    walk(value, &mut seen);
}

fn walk(value: &Value, seen: &mut Seen) {
    if !value.is_container() || !seen.first_visit(value) {
        return;
    }
    match value {
        Value::Object(object) => {
            for key in object.keys() {
                walk(&object.get(&key), seen);
            }
        }
        Value::Array(array) => {
            for item in array.to_vec() {
                walk(&item, seen);
            }
        }
        _ => {}
    }
}
