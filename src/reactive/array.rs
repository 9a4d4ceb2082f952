//! The seven array mutations.
//!
//! Each one changes the element list, observes any inserted elements, and
//! notifies the array's own dependency set. The borrow on the element list is
//! released before notifying, so subscribers may read the array freely.

use std::cmp::Ordering;

use super::observer::observe_items;
use super::value::{Array, Value};

impl Array {
    fn notify(&self) {
        if let Some(ob) = self.observer() {
            ob.dep().notify();
        }
    }

    fn inserted(&self, items: &[Value]) {
        if self.observer().is_some() {
            observe_items(items);
        }
    }

    /// Append elements. Returns the new length.
    pub fn push(&self, values: impl IntoIterator<Item = Value>) -> usize {
        let values: Vec<Value> = values.into_iter().collect();
        let len = {
            let mut items = self.0.items.borrow_mut();
            items.extend(values.iter().cloned());
            items.len()
        };
        self.inserted(&values);
        self.notify();
        len
    }

    /// Remove and return the last element.
    pub fn pop(&self) -> Option<Value> {
        let popped = self.0.items.borrow_mut().pop();
        self.notify();
        popped
    }

    /// Remove and return the first element.
    pub fn shift(&self) -> Option<Value> {
        let shifted = {
            let mut items = self.0.items.borrow_mut();
            if items.is_empty() { None } else { Some(items.remove(0)) }
        };
        self.notify();
        shifted
    }

    /// Prepend elements, keeping their order. Returns the new length.
    pub fn unshift(&self, values: impl IntoIterator<Item = Value>) -> usize {
        let values: Vec<Value> = values.into_iter().collect();
        let len = {
            let mut items = self.0.items.borrow_mut();
            items.splice(0..0, values.iter().cloned());
            items.len()
        };
        self.inserted(&values);
        self.notify();
        len
    }

    /// Remove `delete_count` elements at `start` and insert `values` there.
    /// Out-of-range arguments are clamped. Returns the removed elements.
    pub fn splice(&self, start: usize, delete_count: usize, values: Vec<Value>) -> Vec<Value> {
        let removed = {
            let mut items = self.0.items.borrow_mut();
            let start = start.min(items.len());
            let end = start.saturating_add(delete_count).min(items.len());
            items.splice(start..end, values.iter().cloned()).collect()
        };
        self.inserted(&values);
        self.notify();
        removed
    }

    /// Sort in place with a comparator.
    ///
    /// The elements are moved out while the comparator runs, so it may read
    /// the array (which then looks empty) without a borrow conflict.
    pub fn sort_by(&self, compare: impl FnMut(&Value, &Value) -> Ordering) {
        let mut items = std::mem::take(&mut *self.0.items.borrow_mut());
        items.sort_by(compare);
        *self.0.items.borrow_mut() = items;
        self.notify();
    }

    /// Sort by default ordering: numbers before strings, each ascending,
    /// everything else after in original order.
    pub fn sort(&self) {
        self.sort_by(default_order);
    }

    /// Reverse in place.
    pub fn reverse(&self) {
        self.0.items.borrow_mut().reverse();
        self.notify();
    }
}

fn default_order(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Number(_) => 0,
            Value::Str(_) => 1,
            _ => 2,
        }
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.total_cmp(y),
        (Value::Str(x), Value::Str(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::observer::{observe, toggle_observing};
    use crate::reactive::watcher::{Watcher, WatcherFlags, WatcherOptions};
    use crate::reactive::Object;
    use std::cell::Cell;
    use std::rc::Rc;

    fn nums(values: &[i32]) -> Array {
        values.iter().copied().collect()
    }

    fn as_nums(array: &Array) -> Vec<f64> {
        array.peek_vec().iter().filter_map(Value::as_f64).collect()
    }

    fn watch_len(array: &Array) -> (Watcher, Rc<Cell<usize>>) {
        let runs = Rc::new(Cell::new(0));
        let counter = runs.clone();
        let reader = array.clone();
        let watcher = Watcher::new(
            move || {
                counter.set(counter.get() + 1);
                Ok(Value::from(reader.len()))
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

    #[test]
    fn test_mutations_notify() {
        toggle_observing(true);
        let array = nums(&[3, 1, 2]);
        observe(&Value::from(array.clone()), false);
        let (_watcher, runs) = watch_len(&array);

        array.push([Value::from(4)]);
        assert_eq!(runs.get(), 2);
        array.pop();
        array.shift();
        array.unshift([Value::from(0)]);
        array.splice(1, 1, vec![Value::from(7), Value::from(8)]);
        array.sort();
        array.reverse();
        assert_eq!(runs.get(), 8);
        assert_eq!(as_nums(&array), vec![8.0, 7.0, 2.0, 0.0]);
    }

    #[test]
    fn test_comparator_may_read_the_array() {
        let array = nums(&[3, 1, 2]);
        let reader = array.clone();
        let seen_len = Rc::new(Cell::new(usize::MAX));
        let sink = seen_len.clone();
        array.sort_by(|a, b| {
            sink.set(reader.len());
            let _ = reader.get(0);
            default_order(a, b)
        });
        assert_eq!(as_nums(&array), vec![1.0, 2.0, 3.0]);
        assert_eq!(seen_len.get(), 0);
    }

    #[test]
    fn test_unobserved_array_is_inert() {
        let array = nums(&[1]);
        let (_watcher, runs) = watch_len(&array);
        array.push([Value::from(2)]);
        assert_eq!(runs.get(), 1);
        assert_eq!(as_nums(&array), vec![1.0, 2.0]);
    }

    #[test]
    fn test_inserted_objects_are_observed() {
        toggle_observing(true);
        let array = Array::new();
        observe(&Value::from(array.clone()), false);
        let item = Object::new();
        array.push([Value::from(item.clone())]);
        assert!(item.observer().is_some());
    }

    #[test]
    fn test_splice_clamps() {
        let array = nums(&[1, 2, 3]);
        let removed = array.splice(2, 10, Vec::new());
        assert_eq!(removed, vec![Value::from(3)]);
        let removed = array.splice(10, 1, vec![Value::from(9)]);
        assert!(removed.is_empty());
        assert_eq!(as_nums(&array), vec![1.0, 2.0, 9.0]);
    }
}
