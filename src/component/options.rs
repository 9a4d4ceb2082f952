//! Component descriptors.
//!
//! A [`ComponentDef`] is an immutable, shared record of [`ComponentOptions`]
//! with an identity. Options are assembled with consuming builders:
//!
//! ```ignore
//! let counter = ComponentOptions::named("counter")
//!     .data(|_| Ok([("count", 0)].into_iter().collect()))
//!     .method("inc", |vm, _| {
//!         let n = vm.get("count")?.as_f64().unwrap_or(0.0);
//!         vm.set("count", Value::from(n + 1.0))?;
//!         Ok(Value::Null)
//!     })
//!     .render(|ctx| Ok(VNode::element("span").text_content(ctx.get("count")?.to_string()).into()))
//!     .build();
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::instance::Component;
use super::lifecycle::Hook;
use super::merge::merge_options;
use super::props::{PropDef, PropDefault};
use super::render::{RenderContext, Roots};
use crate::error::{ErrorCapturedHook, ErrorScope, Propagation, Result, ViewError};
use crate::reactive::{Object, Value, WatchOptions};
use crate::types::DefId;

/// Produces the instance's own data object.
pub type DataFn = Rc<dyn Fn(&Component) -> Result<Object>>;
/// Lifecycle hook handler.
pub type HookFn = Rc<dyn Fn(&Component) -> Result<()>>;
/// Render function.
pub type RenderFn = Rc<dyn Fn(&RenderContext<'_>) -> Result<Roots>>;
/// Instance method.
pub type MethodFn = Rc<dyn Fn(&Component, &[Value]) -> Result<Value>>;
/// Computed getter.
pub type ComputedGetter = Rc<dyn Fn(&Component) -> Result<Value>>;
/// Computed setter.
pub type ComputedSetter = Rc<dyn Fn(&Component, Value) -> Result<()>>;
/// Watch handler: `(vm, new, old)`.
pub type WatchHandler = Rc<dyn Fn(&Component, &Value, &Value) -> Result<()>>;
/// Function watch source.
pub type SourceFn = Rc<dyn Fn(&Component) -> Result<Value>>;

/// An injection: the provided key to look up in ancestors, and the value
/// used when none provides it.
#[derive(Clone)]
pub struct InjectDef {
    pub from: String,
    pub default: Option<PropDefault>,
}

impl InjectDef {
    pub fn new(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            default: None,
        }
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(PropDefault::Value(value.into()));
        self
    }

    pub fn default_with(mut self, factory: impl Fn() -> Value + 'static) -> Self {
        self.default = Some(PropDefault::Factory(Rc::new(factory)));
        self
    }
}

/// A computed property declaration.
#[derive(Clone)]
pub struct ComputedDef {
    pub get: ComputedGetter,
    pub set: Option<ComputedSetter>,
}

/// What a watch declaration observes.
#[derive(Clone)]
pub enum WatchSource {
    /// Dotted path from the instance, e.g. `"user.name"`.
    Path(String),
    /// Arbitrary getter.
    Getter(SourceFn),
}

impl From<&str> for WatchSource {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for WatchSource {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

/// A watch declaration.
#[derive(Clone)]
pub struct WatchDef {
    pub source: WatchSource,
    pub handler: WatchHandler,
    pub options: WatchOptions,
}

// =============================================================================
// Options
// =============================================================================

/// Declarative description of a component.
#[derive(Clone, Default)]
pub struct ComponentOptions {
    pub name: Option<String>,
    pub data: Option<DataFn>,
    pub props: IndexMap<String, PropDef>,
    pub computed: IndexMap<String, ComputedDef>,
    pub methods: IndexMap<String, MethodFn>,
    pub watch: Vec<WatchDef>,
    pub hooks: BTreeMap<Hook, Vec<HookFn>>,
    pub error_captured: Vec<ErrorCapturedHook>,
    pub components: IndexMap<String, ComponentDef>,
    /// Values offered to descendants, computed once after `data`.
    pub provide: Option<DataFn>,
    pub inject: IndexMap<String, InjectDef>,
    pub render: Option<RenderFn>,
}

impl ComponentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn data(mut self, data: impl Fn(&Component) -> Result<Object> + 'static) -> Self {
        self.data = Some(Rc::new(data));
        self
    }

    pub fn prop(mut self, name: impl Into<String>, def: PropDef) -> Self {
        self.props.insert(name.into(), def);
        self
    }

    pub fn computed(
        mut self,
        name: impl Into<String>,
        get: impl Fn(&Component) -> Result<Value> + 'static,
    ) -> Self {
        self.computed.insert(
            name.into(),
            ComputedDef {
                get: Rc::new(get),
                set: None,
            },
        );
        self
    }

    pub fn computed_with_setter(
        mut self,
        name: impl Into<String>,
        get: impl Fn(&Component) -> Result<Value> + 'static,
        set: impl Fn(&Component, Value) -> Result<()> + 'static,
    ) -> Self {
        self.computed.insert(
            name.into(),
            ComputedDef {
                get: Rc::new(get),
                set: Some(Rc::new(set)),
            },
        );
        self
    }

    pub fn method(
        mut self,
        name: impl Into<String>,
        method: impl Fn(&Component, &[Value]) -> Result<Value> + 'static,
    ) -> Self {
        self.methods.insert(name.into(), Rc::new(method));
        self
    }

    /// Watch a dotted path or getter with default options.
    pub fn watch(
        self,
        source: impl Into<WatchSource>,
        handler: impl Fn(&Component, &Value, &Value) -> Result<()> + 'static,
    ) -> Self {
        self.watch_with(source, handler, WatchOptions::default())
    }

    pub fn watch_with(
        mut self,
        source: impl Into<WatchSource>,
        handler: impl Fn(&Component, &Value, &Value) -> Result<()> + 'static,
        options: WatchOptions,
    ) -> Self {
        self.watch.push(WatchDef {
            source: source.into(),
            handler: Rc::new(handler),
            options,
        });
        self
    }

    pub fn hook(mut self, hook: Hook, handler: impl Fn(&Component) -> Result<()> + 'static) -> Self {
        self.hooks.entry(hook).or_default().push(Rc::new(handler));
        self
    }

    /// Register an error-captured hook. It sees errors raised in descendants.
    pub fn error_captured(
        mut self,
        hook: impl Fn(&ViewError, &dyn ErrorScope, &str) -> Result<Propagation> + 'static,
    ) -> Self {
        self.error_captured.push(Rc::new(hook));
        self
    }

    /// Register a child component under `name` for [`RenderContext::child`].
    pub fn component(mut self, name: impl Into<String>, def: &ComponentDef) -> Self {
        self.components.insert(name.into(), def.clone());
        self
    }

    pub fn provide(mut self, provide: impl Fn(&Component) -> Result<Object> + 'static) -> Self {
        self.provide = Some(Rc::new(provide));
        self
    }

    /// Inject the ancestor-provided value of the same name.
    pub fn inject(self, name: impl Into<String>) -> Self {
        let name = name.into();
        let def = InjectDef::new(name.clone());
        self.inject_with(name, def)
    }

    pub fn inject_with(mut self, name: impl Into<String>, def: InjectDef) -> Self {
        self.inject.insert(name.into(), def);
        self
    }

    pub fn render(mut self, render: impl Fn(&RenderContext<'_>) -> Result<Roots> + 'static) -> Self {
        self.render = Some(Rc::new(render));
        self
    }

    pub fn build(self) -> ComponentDef {
        ComponentDef::new(self)
    }
}

impl fmt::Debug for ComponentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentOptions")
            .field("name", &self.name)
            .field("props", &self.props.keys().collect::<Vec<_>>())
            .field("computed", &self.computed.keys().collect::<Vec<_>>())
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("watch", &self.watch.len())
            .field("hooks", &self.hooks.keys().collect::<Vec<_>>())
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .field("provide", &self.provide.is_some())
            .field("inject", &self.inject.keys().collect::<Vec<_>>())
            .field("render", &self.render.is_some())
            .finish()
    }
}

// =============================================================================
// Definition
// =============================================================================

struct DefInner {
    id: DefId,
    options: ComponentOptions,
}

/// Immutable, shared component descriptor.
#[derive(Clone)]
pub struct ComponentDef(Rc<DefInner>);

thread_local! {
    static EXTEND_CACHE: RefCell<HashMap<(DefId, DefId), ComponentDef>> = RefCell::new(HashMap::new());
}

impl ComponentDef {
    pub fn new(options: ComponentOptions) -> Self {
        Self(Rc::new(DefInner {
            id: DefId::next(),
            options,
        }))
    }

    pub fn id(&self) -> DefId {
        self.0.id
    }

    pub fn name(&self) -> Option<&str> {
        self.0.options.name.as_deref()
    }

    pub fn options(&self) -> &ComponentOptions {
        &self.0.options
    }

    /// Descriptor whose options are `self`'s merged with `child`'s.
    ///
    /// Extending the same pair twice returns the same descriptor.
    pub fn extend(&self, child: &ComponentDef) -> ComponentDef {
        let key = (self.id(), child.id());
        if let Some(hit) = EXTEND_CACHE.with(|c| c.borrow().get(&key).cloned()) {
            return hit;
        }
        let merged = ComponentDef::new(merge_options(self.options(), child.options()));
        tracing::trace!(parent = ?self.id(), child = ?child.id(), merged = ?merged.id(), "extend");
        EXTEND_CACHE.with(|c| c.borrow_mut().insert(key, merged.clone()));
        merged
    }

    pub fn ptr_eq(&self, other: &ComponentDef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ComponentDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDef")
            .field("id", &self.0.id)
            .field("options", &self.0.options)
            .finish()
    }
}

/// Drop cached `extend` results (for testing).
pub fn reset_extend_cache() {
    EXTEND_CACHE.with(|c| c.borrow_mut().clear());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defs_get_distinct_ids() {
        let a = ComponentOptions::named("a").build();
        let b = ComponentOptions::named("a").build();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.name(), Some("a"));
    }

    #[test]
    fn test_extend_is_cached() {
        reset_extend_cache();
        let base = ComponentOptions::named("base").build();
        let child = ComponentOptions::new().build();
        let first = base.extend(&child);
        let second = base.extend(&child);
        assert!(first.ptr_eq(&second));
        assert_eq!(first.name(), Some("base"));

        let other = ComponentOptions::new().build();
        assert!(!base.extend(&other).ptr_eq(&first));
    }

    #[test]
    fn test_builders_fill_options() {
        let def = ComponentOptions::named("x")
            .prop("p", PropDef::default())
            .computed("c", |_| Ok(Value::Null))
            .method("m", |_, _| Ok(Value::Null))
            .watch("p", |_, _, _| Ok(()))
            .hook(Hook::Created, |_| Ok(()))
            .hook(Hook::Created, |_| Ok(()))
            .build();
        let options = def.options();
        assert!(options.props.contains_key("p"));
        assert!(options.computed.contains_key("c"));
        assert!(options.methods.contains_key("m"));
        assert_eq!(options.watch.len(), 1);
        assert_eq!(options.hooks[&Hook::Created].len(), 2);
    }
}
