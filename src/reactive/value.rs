//! The dynamic value model the observable layer works on.
//!
//! [`Value`] is a small tagged union. Primitives are plain data; [`Object`]
//! and [`Array`] are shared, interiorly-mutable containers whose identity is
//! the `Rc` they wrap. A container becomes reactive once [`observe`] attaches
//! an [`Observer`] to it: from then on its property reads register
//! dependencies and its writes notify.
//!
//! Reads through [`Object::get`] and [`Array::get`] track; the `peek_*`
//! variants and [`Object::keys`] never do.
//!
//! [`observe`]: super::observer::observe

use std::any::Any;
use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::dep::{self, Dep};
use super::observer::{self, Observer};
use crate::error::warn;

// =============================================================================
// Value
// =============================================================================

/// A dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Object(Object),
    Array(Array),
    /// Host data the runtime never looks inside and never observes.
    Opaque(Rc<dyn Any>),
}

impl Value {
    /// Change-detection equality.
    ///
    /// Primitives compare by value with NaN equal to itself; containers and
    /// opaque values compare by identity.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Opaque(a), Value::Opaque(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Objects and arrays.
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Array(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Truthiness with the usual scripting rules.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Type name used in diagnostics and prop validation.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Boolean",
            Value::Number(_) => "Number",
            Value::Str(_) => "String",
            Value::Object(_) => "Object",
            Value::Array(_) => "Array",
            Value::Opaque(_) => "Opaque",
        }
    }

    /// The observer attached to this container, if any.
    pub fn observer(&self) -> Option<Observer> {
        match self {
            Value::Object(o) => o.observer(),
            Value::Array(a) => a.observer(),
            _ => None,
        }
    }
}

/// Delegates to [`Value::same`].
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(f64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Value::Object(value)
    }
}

impl From<Array> for Value {
    fn from(value: Array) -> Self {
        Value::Array(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Renders the way interpolated text would: integers without a fraction,
/// `Null` as the empty string, containers as JSON-ish text. Never tracks.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Str(s) => f.write_str(s),
            other => write_json(other, f),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Opaque(_) => f.write_str("<opaque>"),
            other => write_json(other, f),
        }
    }
}

fn write_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        write!(f, "{}", n as i64)
    } else if n.is_nan() {
        f.write_str("NaN")
    } else {
        write!(f, "{n}")
    }
}

fn write_json(value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        Value::Null => f.write_str("null"),
        Value::Bool(b) => write!(f, "{b}"),
        Value::Number(n) => write_number(*n, f),
        Value::Str(s) => write!(f, "{s:?}"),
        Value::Opaque(_) => f.write_str("{}"),
        Value::Array(a) => {
            f.write_str("[")?;
            for (i, item) in a.peek_vec().iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write_json(item, f)?;
            }
            f.write_str("]")
        }
        Value::Object(o) => {
            f.write_str("{")?;
            for (i, key) in o.keys().iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{key:?}:")?;
                write_json(&o.peek(key), f)?;
            }
            f.write_str("}")
        }
    }
}

// =============================================================================
// Field
// =============================================================================

/// A property name or an array index, as accepted by
/// [`set`](super::observer::set) and [`del`](super::observer::del).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Index(usize),
    Name(String),
}

impl From<usize> for Field {
    fn from(value: usize) -> Self {
        Field::Index(value)
    }
}

impl From<&str> for Field {
    fn from(value: &str) -> Self {
        Field::Name(value.to_string())
    }
}

impl From<String> for Field {
    fn from(value: String) -> Self {
        Field::Name(value)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Index(i) => write!(f, "{i}"),
            Field::Name(n) => f.write_str(n),
        }
    }
}

// =============================================================================
// Object
// =============================================================================

/// Getter/setter pair installed on a property with [`Object::define_accessor`].
#[derive(Clone)]
pub struct Accessor {
    pub get: Rc<dyn Fn() -> Value>,
    pub set: Option<Rc<dyn Fn(Value)>>,
}

#[derive(Clone)]
pub(crate) struct Property {
    pub(crate) value: Value,
    /// Present once the property has been made reactive.
    pub(crate) dep: Option<Dep>,
    pub(crate) accessor: Option<Accessor>,
    pub(crate) configurable: bool,
}

impl Property {
    fn plain(value: Value) -> Self {
        Self {
            value,
            dep: None,
            accessor: None,
            configurable: true,
        }
    }
}

pub(crate) struct ObjectInner {
    pub(crate) props: RefCell<IndexMap<String, Property>>,
    pub(crate) observer: OnceCell<Observer>,
    extensible: Cell<bool>,
}

/// A shared, ordered string-keyed container.
#[derive(Clone)]
pub struct Object(pub(crate) Rc<ObjectInner>);

impl Object {
    pub fn new() -> Self {
        Self(Rc::new(ObjectInner {
            props: RefCell::new(IndexMap::new()),
            observer: OnceCell::new(),
            extensible: Cell::new(true),
        }))
    }

    /// Read a property, registering dependencies when a watcher is
    /// evaluating. Missing properties read as `Null`.
    pub fn get(&self, key: &str) -> Value {
        let (value, accessor, dep) = {
            let props = self.0.props.borrow();
            match props.get(key) {
                Some(prop) => (prop.value.clone(), prop.accessor.clone(), prop.dep.clone()),
                None => return Value::Null,
            }
        };
        let value = match accessor {
            Some(accessor) => (accessor.get)(),
            None => value,
        };
        if let Some(dep) = dep {
            if dep::is_tracking() {
                dep.depend();
                if let Some(child) = value.observer() {
                    child.dep().depend();
                    if let Value::Array(array) = &value {
                        observer::depend_array(array);
                    }
                }
            }
        }
        value
    }

    /// Read without registering dependencies.
    pub fn peek(&self, key: &str) -> Value {
        dep::untracked(|| self.get(key))
    }

    /// Write a property.
    ///
    /// On a reactive property this runs the change check, re-observes the new
    /// value and notifies. On a plain property it just stores. Writing a
    /// missing key adds a plain, non-reactive property; use
    /// [`set`](super::observer::set) to add a reactive one.
    pub fn assign(&self, key: &str, value: Value) {
        let existing = self.0.props.borrow().get(key).cloned();
        let Some(prop) = existing else {
            if !self.is_extensible() {
                warn(format_args!("Cannot add property \"{key}\": object is not extensible"));
                return;
            }
            self.0
                .props
                .borrow_mut()
                .insert(key.to_string(), Property::plain(value));
            return;
        };

        let Some(dep) = prop.dep else {
            match prop.accessor.and_then(|a| a.set) {
                Some(setter) => setter(value),
                None => self.store(key, value),
            }
            return;
        };

        let old = match &prop.accessor {
            Some(accessor) => (accessor.get)(),
            None => prop.value,
        };
        if value.same(&old) {
            return;
        }
        match prop.accessor {
            Some(Accessor { set: Some(setter), .. }) => setter(value.clone()),
            Some(Accessor { set: None, .. }) => return,
            None => self.store(key, value.clone()),
        }
        observer::observe(&value, false);
        dep.notify();
    }

    fn store(&self, key: &str, value: Value) {
        if let Some(prop) = self.0.props.borrow_mut().get_mut(key) {
            prop.value = value;
        }
    }

    /// Own property names in insertion order. Never tracks.
    pub fn keys(&self) -> Vec<String> {
        self.0.props.borrow().keys().cloned().collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.props.borrow().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.props.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Install a computed property. Replaces any existing value.
    pub fn define_accessor(
        &self,
        key: &str,
        get: impl Fn() -> Value + 'static,
        set: Option<Rc<dyn Fn(Value)>>,
    ) {
        let mut props = self.0.props.borrow_mut();
        if props.get(key).is_some_and(|p| !p.configurable) {
            return;
        }
        let accessor = Accessor { get: Rc::new(get), set };
        match props.get_mut(key) {
            Some(prop) => prop.accessor = Some(accessor),
            None => {
                props.insert(
                    key.to_string(),
                    Property {
                        value: Value::Null,
                        dep: None,
                        accessor: Some(accessor),
                        configurable: true,
                    },
                );
            }
        }
    }

    /// Mark a property non-configurable: it can no longer be made reactive
    /// or redefined.
    pub fn seal_property(&self, key: &str) {
        if let Some(prop) = self.0.props.borrow_mut().get_mut(key) {
            prop.configurable = false;
        }
    }

    /// Forbid adding properties. Non-extensible objects are never observed.
    pub fn prevent_extensions(&self) {
        self.0.extensible.set(false);
    }

    pub fn is_extensible(&self) -> bool {
        self.0.extensible.get()
    }

    pub fn observer(&self) -> Option<Observer> {
        self.0.observer.get().cloned()
    }

    /// Whether `key` is reactive (has a dependency set).
    pub fn is_reactive(&self, key: &str) -> bool {
        self.0
            .props
            .borrow()
            .get(key)
            .is_some_and(|p| p.dep.is_some())
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn property(&self, key: &str) -> Option<Property> {
        self.0.props.borrow().get(key).cloned()
    }

    pub(crate) fn put_property(&self, key: &str, prop: Property) {
        self.0.props.borrow_mut().insert(key.to_string(), prop);
    }

    pub(crate) fn remove_property(&self, key: &str) -> Option<Property> {
        self.0.props.borrow_mut().shift_remove(key)
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let object = Object::new();
        {
            let mut props = object.0.props.borrow_mut();
            for (k, v) in iter {
                props.insert(k.into(), Property::plain(v.into()));
            }
        }
        object
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", Value::Object(self.clone()))
    }
}

// =============================================================================
// Array
// =============================================================================

pub(crate) struct ArrayInner {
    pub(crate) items: RefCell<Vec<Value>>,
    pub(crate) observer: OnceCell<Observer>,
    extensible: Cell<bool>,
}

/// A shared, ordered sequence.
///
/// Element slots are not individually reactive. Reads track the container's
/// dependency set, and the seven mutation methods in
/// [`array`](super::array) notify it.
#[derive(Clone)]
pub struct Array(pub(crate) Rc<ArrayInner>);

impl Array {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(items: Vec<Value>) -> Self {
        Self(Rc::new(ArrayInner {
            items: RefCell::new(items),
            observer: OnceCell::new(),
            extensible: Cell::new(true),
        }))
    }

    fn track(&self) {
        if dep::is_tracking() {
            if let Some(ob) = self.observer() {
                ob.dep().depend();
            }
        }
    }

    /// Element at `index`, or `Null` when out of bounds. Tracks.
    pub fn get(&self, index: usize) -> Value {
        self.track();
        self.peek(index)
    }

    /// Element at `index` without tracking.
    pub fn peek(&self, index: usize) -> Value {
        self.0.items.borrow().get(index).cloned().unwrap_or_default()
    }

    /// Tracks.
    pub fn len(&self) -> usize {
        self.track();
        self.0.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the elements. Tracks.
    pub fn to_vec(&self) -> Vec<Value> {
        self.track();
        self.peek_vec()
    }

    /// Snapshot of the elements without tracking.
    pub fn peek_vec(&self) -> Vec<Value> {
        self.0.items.borrow().clone()
    }

    pub fn prevent_extensions(&self) {
        self.0.extensible.set(false);
    }

    pub fn is_extensible(&self) -> bool {
        self.0.extensible.get()
    }

    pub fn observer(&self) -> Option<Observer> {
        self.0.observer.get().cloned()
    }

    pub fn ptr_eq(&self, other: &Array) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for Array {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Into<Value>> FromIterator<V> for Array {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", Value::Array(self.clone()))
    }
}

// =============================================================================
// Tests
// =============================================================================
