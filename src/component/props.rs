//! Prop declarations and validation.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::warn;
use crate::reactive::{observe, should_observe, toggle_observing, Value};

/// Expected runtime type of a prop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropType {
    #[default]
    Any,
    Bool,
    Number,
    Str,
    Object,
    Array,
}

impl PropType {
    pub fn matches(self, value: &Value) -> bool {
        match self {
            PropType::Any => true,
            PropType::Bool => matches!(value, Value::Bool(_)),
            PropType::Number => matches!(value, Value::Number(_)),
            PropType::Str => matches!(value, Value::Str(_)),
            PropType::Object => matches!(value, Value::Object(_)),
            PropType::Array => matches!(value, Value::Array(_)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PropType::Any => "Any",
            PropType::Bool => "Boolean",
            PropType::Number => "Number",
            PropType::Str => "String",
            PropType::Object => "Object",
            PropType::Array => "Array",
        }
    }
}

impl fmt::Display for PropType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Default value of a prop. Containers should use a factory so that each
/// instance gets its own.
#[derive(Clone)]
pub enum PropDefault {
    Value(Value),
    Factory(Rc<dyn Fn() -> Value>),
}

impl PropDefault {
    pub(crate) fn produce(&self) -> Value {
        match self {
            PropDefault::Value(value) => value.clone(),
            PropDefault::Factory(factory) => factory(),
        }
    }
}

/// Declaration of one prop.
#[derive(Clone, Default)]
pub struct PropDef {
    pub kind: PropType,
    pub required: bool,
    pub default: Option<PropDefault>,
    pub validator: Option<Rc<dyn Fn(&Value) -> bool>>,
}

impl PropDef {
    pub fn new(kind: PropType) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(PropDefault::Value(value.into()));
        self
    }

    pub fn default_with(mut self, factory: impl Fn() -> Value + 'static) -> Self {
        self.default = Some(PropDefault::Factory(Rc::new(factory)));
        self
    }

    pub fn validator(mut self, check: impl Fn(&Value) -> bool + 'static) -> Self {
        self.validator = Some(Rc::new(check));
        self
    }
}

impl fmt::Debug for PropDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropDef")
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

/// Resolve the value of prop `key` from the data a parent passed.
///
/// Boolean props read as `false` when absent without a default, and as
/// `true` when passed as an empty string. Absent or `Null` values fall back
/// to the default, which is observed. Type, required and validator failures
/// only warn.
pub fn validate_prop(key: &str, def: &PropDef, props_data: &IndexMap<String, Value>) -> Value {
    resolve_prop(key, def, props_data, None)
}

/// [`validate_prop`] for a parent re-render. While the parent keeps leaving
/// the prop out, the default produced earlier (`current`) is kept instead of
/// calling the factory again.
pub(crate) fn revalidate_prop(
    key: &str,
    def: &PropDef,
    props_data: &IndexMap<String, Value>,
    previous: &IndexMap<String, Value>,
    current: Value,
) -> Value {
    let previously_absent = previous.get(key).is_none_or(Value::is_null);
    let kept = (previously_absent && !current.is_null()).then_some(current);
    resolve_prop(key, def, props_data, kept)
}

fn resolve_prop(
    key: &str,
    def: &PropDef,
    props_data: &IndexMap<String, Value>,
    kept_default: Option<Value>,
) -> Value {
    let absent = !props_data.contains_key(key);
    let mut value = props_data.get(key).cloned().unwrap_or_default();

    if def.kind == PropType::Bool {
        if absent && def.default.is_none() {
            value = Value::Bool(false);
        } else if value.as_str() == Some("") {
            value = Value::Bool(true);
        }
    }

    if value.is_null() {
        if let (Some(kept), Some(_)) = (kept_default, &def.default) {
            value = kept;
        } else if let Some(default) = &def.default {
            value = default.produce();
            let previous = should_observe();
            toggle_observing(true);
            observe(&value, false);
            toggle_observing(previous);
        }
    }

    assert_prop(key, def, &value, absent);
    value
}

fn assert_prop(key: &str, def: &PropDef, value: &Value, absent: bool) {
    if def.required && absent {
        warn(format_args!("Missing required prop: \"{key}\""));
        return;
    }
    if value.is_null() && !def.required {
        return;
    }
    if !def.kind.matches(value) {
        warn(format_args!(
            "Invalid prop: type check failed for prop \"{key}\". Expected {}, got {} with value {value:?}",
            def.kind,
            value.type_name()
        ));
        return;
    }
    if let Some(check) = &def.validator {
        if !check(value) {
            warn(format_args!(
                "Invalid prop: custom validator check failed for prop \"{key}\"."
            ));
        }
    }
}
