//! Component instances.
//!
//! # Lifecycle
//!
//! ```text
//! create:  beforeCreate → inject → props → data → computed → watch → provide → created
//! mount:   beforeMount → render watcher (render + patch) → mounted
//! update:  render watcher queued → beforeUpdate → render + patch → updated
//! destroy: beforeDestroy → teardown watchers → patch(tree, ∅) → destroyed
//! ```
//!
//! Instances form a tree: a parent holds its children strongly, a child
//! refers to its parent weakly. Every closure the runtime builds around an
//! instance (render watcher, computed getters, watch handlers) captures a
//! weak reference, so dropping the last outside handle to a destroyed tree
//! frees it.
//!
//! Child instances are created by the parent's patch. Their `mounted` hooks
//! are deferred until the root patch that created them finishes, through the
//! inserted queue (see [`Patcher`]).

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::lifecycle::{self, call_hook, Hook};
use super::options::{ComponentDef, InjectDef, WatchHandler, WatchSource};
use super::props::{revalidate_prop, validate_prop};
use super::render::RenderContext;
use crate::error::{
    handle_error, invoke_with_error_handling, warn, ErrorCapturedHook, ErrorScope, Result,
    ViewError,
};
use crate::reactive::{
    define_reactive, observe, toggle_observing, untracked, Computed, Object, Value, WatchOptions,
    Watcher, WatcherFlags, WatcherOptions,
};
use crate::renderer::{default_modules, Backend, Module, Patcher};
use crate::scheduler::{self, next_tick};
use crate::types::{ComponentId, NodeId};
use crate::vdom::VNode;

/// Everything needed to create an instance.
pub struct ComponentInit {
    pub parent: Option<Component>,
    /// Prop values passed by the parent.
    pub props_data: IndexMap<String, Value>,
    pub backend: Rc<dyn Backend>,
    pub modules: Rc<[Rc<dyn Module>]>,
    /// Created for a placeholder node in a parent's tree; `mounted` then
    /// waits for the parent's patch.
    pub placeholder: bool,
}

impl ComponentInit {
    /// Init for a root instance with the built-in modules.
    pub fn root(backend: Rc<dyn Backend>) -> Self {
        Self {
            parent: None,
            props_data: IndexMap::new(),
            backend,
            modules: default_modules(),
            placeholder: false,
        }
    }

    pub fn props(mut self, props_data: IndexMap<String, Value>) -> Self {
        self.props_data = props_data;
        self
    }
}

pub(crate) struct ComponentInner {
    id: ComponentId,
    def: ComponentDef,
    parent: Option<Weak<ComponentInner>>,
    children: RefCell<Vec<Component>>,
    backend: Rc<dyn Backend>,
    modules: Rc<[Rc<dyn Module>]>,
    placeholder: bool,

    props: Object,
    injections: Object,
    provided: RefCell<Option<Object>>,
    /// Raw prop values last passed by the parent.
    props_data: RefCell<IndexMap<String, Value>>,
    data: RefCell<Object>,
    computed: RefCell<IndexMap<String, Computed>>,
    watchers: RefCell<Vec<Watcher>>,
    render_watcher: RefCell<Option<Watcher>>,

    vnode: RefCell<Option<VNode>>,
    pending_insert: RefCell<Vec<Component>>,
    container: Cell<Option<NodeId>>,

    mounted: Cell<bool>,
    being_destroyed: Cell<bool>,
    destroyed: Cell<bool>,
    inactive: Cell<Option<bool>>,
    direct_inactive: Cell<bool>,
}

impl ErrorScope for ComponentInner {
    fn scope_id(&self) -> ComponentId {
        self.id
    }

    fn scope_name(&self) -> String {
        self.def.name().unwrap_or("Anonymous").to_string()
    }

    fn parent_scope(&self) -> Option<Rc<dyn ErrorScope>> {
        let parent = self.parent.as_ref()?.upgrade()?;
        Some(parent as Rc<dyn ErrorScope>)
    }

    fn error_captured_hooks(&self) -> Vec<ErrorCapturedHook> {
        self.def.options().error_captured.clone()
    }
}

/// Handle to a component instance. Cloning shares it.
#[derive(Clone)]
pub struct Component(Rc<ComponentInner>);

fn upgrade(weak: &Weak<ComponentInner>) -> Option<Component> {
    weak.upgrade().map(Component)
}

impl Component {
    // =========================================================================
    // Creation
    // =========================================================================

    /// Create and initialise an instance. Does not render; call
    /// [`mount`](Self::mount).
    pub fn create(def: &ComponentDef, init: ComponentInit) -> Component {
        let vm = Component(Rc::new(ComponentInner {
            id: ComponentId::next(),
            def: def.clone(),
            parent: init.parent.as_ref().map(|p| Rc::downgrade(&p.0)),
            children: RefCell::new(Vec::new()),
            backend: init.backend,
            modules: init.modules,
            placeholder: init.placeholder,
            props: Object::new(),
            injections: Object::new(),
            provided: RefCell::new(None),
            props_data: RefCell::new(init.props_data.clone()),
            data: RefCell::new(Object::new()),
            computed: RefCell::new(IndexMap::new()),
            watchers: RefCell::new(Vec::new()),
            render_watcher: RefCell::new(None),
            vnode: RefCell::new(None),
            pending_insert: RefCell::new(Vec::new()),
            container: Cell::new(None),
            mounted: Cell::new(false),
            being_destroyed: Cell::new(false),
            destroyed: Cell::new(false),
            inactive: Cell::new(None),
            direct_inactive: Cell::new(false),
        }));
        if let Some(parent) = &init.parent {
            parent.0.children.borrow_mut().push(vm.clone());
        }
        tracing::debug!(component = %vm.name(), id = %vm.id(), "create");

        call_hook(&vm, Hook::BeforeCreate);
        vm.init_injections();
        vm.init_props(&init.props_data);
        vm.init_methods();
        vm.init_data();
        vm.init_computed();
        vm.init_watch();
        vm.init_provide();
        call_hook(&vm, Hook::Created);
        vm
    }

    fn init_injections(&self) {
        let inject = &self.def().options().inject;
        if inject.is_empty() {
            return;
        }
        toggle_observing(false);
        for (key, def) in inject {
            match self.resolve_injection(def) {
                Some(value) => define_reactive(&self.0.injections, key, Some(value)),
                None => warn(format_args!("Injection \"{key}\" not found")),
            }
        }
        toggle_observing(true);
    }

    /// Nearest ancestor's provided value for `def.from`, else the default.
    fn resolve_injection(&self, def: &InjectDef) -> Option<Value> {
        let mut source = self.parent();
        while let Some(vm) = source {
            let found = vm
                .0
                .provided
                .borrow()
                .as_ref()
                .filter(|provided| provided.contains_key(&def.from))
                .map(|provided| provided.peek(&def.from));
            if found.is_some() {
                return found;
            }
            source = vm.parent();
        }
        def.default.as_ref().map(|default| default.produce())
    }

    fn init_provide(&self) {
        let Some(provide) = self.def().options().provide.clone() else {
            return;
        };
        let provided = untracked(|| {
            invoke_with_error_handling(|| provide(self), Some(self.scope()), "provide()")
        });
        *self.0.provided.borrow_mut() = provided;
    }

    fn init_props(&self, props_data: &IndexMap<String, Value>) {
        let is_root = self.0.parent.is_none();
        if !is_root {
            toggle_observing(false);
        }
        for (key, def) in &self.def().options().props {
            let value = validate_prop(key, def, props_data);
            define_reactive(&self.0.props, key, Some(value));
        }
        toggle_observing(true);
    }

    fn init_methods(&self) {
        for key in self.def().options().methods.keys() {
            if self.0.props.contains_key(key) {
                warn(format_args!("Method \"{key}\" has already been defined as a prop."));
            }
        }
    }

    fn init_data(&self) {
        let data = match self.def().options().data.clone() {
            Some(factory) => untracked(|| {
                invoke_with_error_handling(|| factory(self), Some(self.scope()), "data()")
            })
            .unwrap_or_default(),
            None => Object::new(),
        };
        let options = self.def().options();
        for key in data.keys() {
            if options.methods.contains_key(&key) {
                warn(format_args!(
                    "Method \"{key}\" has already been defined as a data property."
                ));
            }
            if self.0.props.contains_key(&key) {
                warn(format_args!(
                    "The data property \"{key}\" is already declared as a prop. Use prop default value instead."
                ));
            }
        }
        observe(&Value::from(data.clone()), true);
        *self.0.data.borrow_mut() = data;
    }

    fn init_computed(&self) {
        let data = self.data();
        for (name, def) in &self.def().options().computed {
            if data.contains_key(name) {
                warn(format_args!(
                    "The computed property \"{name}\" is already defined in data."
                ));
                continue;
            }
            if self.0.props.contains_key(name) {
                warn(format_args!(
                    "The computed property \"{name}\" is already defined as a prop."
                ));
                continue;
            }
            let get = def.get.clone();
            let weak = Rc::downgrade(&self.0);
            let getter = move || match upgrade(&weak) {
                Some(vm) => get(&vm),
                None => Ok(Value::Null),
            };
            let setter = def.set.clone().map(|set| {
                let weak = Rc::downgrade(&self.0);
                Rc::new(move |value: Value| match upgrade(&weak) {
                    Some(vm) => set(&vm, value),
                    None => Ok(()),
                }) as Rc<dyn Fn(Value) -> Result<()>>
            });
            let computed = Computed::new(getter, setter, Some(self.downgrade_scope()), name);
            self.0.computed.borrow_mut().insert(name.clone(), computed);
        }
    }

    fn init_watch(&self) {
        for def in &self.def().options().watch {
            // Declared watches live as long as the instance.
            let _ = self.watch_source(def.source.clone(), def.handler.clone(), def.options);
        }
    }

    // =========================================================================
    // Identity and Tree
    // =========================================================================

    pub fn id(&self) -> ComponentId {
        self.0.id
    }

    pub fn name(&self) -> String {
        self.0.scope_name()
    }

    pub fn def(&self) -> &ComponentDef {
        &self.0.def
    }

    pub fn parent(&self) -> Option<Component> {
        self.0.parent.as_ref().and_then(upgrade)
    }

    /// The topmost ancestor, or `self`.
    pub fn root(&self) -> Component {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    pub fn children(&self) -> Vec<Component> {
        self.0.children.borrow().clone()
    }

    pub fn ptr_eq(&self, other: &Component) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn backend(&self) -> Rc<dyn Backend> {
        self.0.backend.clone()
    }

    pub fn modules(&self) -> Rc<[Rc<dyn Module>]> {
        self.0.modules.clone()
    }

    pub(crate) fn scope(&self) -> &dyn ErrorScope {
        &*self.0
    }

    pub(crate) fn downgrade_scope(&self) -> Weak<dyn ErrorScope> {
        let weak: Weak<ComponentInner> = Rc::downgrade(&self.0);
        weak
    }

    // =========================================================================
    // State
    // =========================================================================

    /// The reactive data object.
    pub fn data(&self) -> Object {
        self.0.data.borrow().clone()
    }

    /// The reactive props object.
    pub fn props(&self) -> Object {
        self.0.props.clone()
    }

    /// Values injected from ancestors.
    pub fn injections(&self) -> Object {
        self.0.injections.clone()
    }

    /// Values this instance provides to its descendants.
    pub fn provided(&self) -> Option<Object> {
        self.0.provided.borrow().clone()
    }

    /// Computed property `name`, if declared.
    pub fn computed(&self, name: &str) -> Option<Computed> {
        self.0.computed.borrow().get(name).cloned()
    }

    fn lookup(&self, key: &str) -> Result<Option<Value>> {
        if self.0.props.contains_key(key) {
            return Ok(Some(self.0.props.get(key)));
        }
        if self.0.injections.contains_key(key) {
            return Ok(Some(self.0.injections.get(key)));
        }
        let data = self.data();
        if data.contains_key(key) {
            return Ok(Some(data.get(key)));
        }
        match self.computed(key) {
            Some(computed) => computed.get().map(Some),
            None => Ok(None),
        }
    }

    /// Read a prop, injection, data property or computed property, in that
    /// order.
    /// Reads are tracked. Unknown names warn and read as `Null`.
    pub fn get(&self, key: &str) -> Result<Value> {
        match self.lookup(key)? {
            Some(value) => Ok(value),
            None => {
                warn(format_args!(
                    "Property or method \"{key}\" is not defined on the instance but referenced during render."
                ));
                Ok(Value::Null)
            }
        }
    }

    /// Write a data property, prop, injection or computed property.
    pub fn set(&self, key: &str, value: Value) -> Result<()> {
        if self.0.props.contains_key(key) {
            warn(format_args!(
                "Avoid mutating a prop directly since the value will be overwritten whenever the parent component re-renders. Prop being mutated: \"{key}\""
            ));
            self.0.props.assign(key, value);
            return Ok(());
        }
        if self.0.injections.contains_key(key) {
            warn(format_args!(
                "Avoid mutating an injected value directly since the changes will be overwritten whenever the provided component re-renders. injection being mutated: \"{key}\""
            ));
            self.0.injections.assign(key, value);
            return Ok(());
        }
        let data = self.data();
        if data.contains_key(key) {
            data.assign(key, value);
            return Ok(());
        }
        if let Some(computed) = self.computed(key) {
            computed.set(value)?;
            return Ok(());
        }
        warn(format_args!(
            "Cannot set \"{key}\": it is not declared in data, props or computed."
        ));
        Ok(())
    }

    /// Call a declared method.
    pub fn call(&self, method: &str, args: &[Value]) -> Result<Value> {
        let Some(f) = self.def().options().methods.get(method).cloned() else {
            return Err(ViewError::msg(format!(
                "method \"{method}\" is not defined on {}",
                self.name()
            )));
        };
        f(self, args)
    }

    // =========================================================================
    // Watchers
    // =========================================================================

    /// Watch a dotted path (`"user.name"`) on this instance.
    pub fn watch(
        &self,
        path: &str,
        handler: impl Fn(&Component, &Value, &Value) -> Result<()> + 'static,
        options: WatchOptions,
    ) -> Unwatch {
        self.watch_source(WatchSource::Path(path.to_string()), Rc::new(handler), options)
    }

    /// Watch the value produced by `getter`.
    pub fn watch_fn(
        &self,
        getter: impl Fn(&Component) -> Result<Value> + 'static,
        handler: impl Fn(&Component, &Value, &Value) -> Result<()> + 'static,
        options: WatchOptions,
    ) -> Unwatch {
        self.watch_source(WatchSource::Getter(Rc::new(getter)), Rc::new(handler), options)
    }

    fn watch_source(&self, source: WatchSource, handler: WatchHandler, options: WatchOptions) -> Unwatch {
        let weak = Rc::downgrade(&self.0);
        let (getter, expression): (Rc<dyn Fn() -> Result<Value>>, String) = match source {
            WatchSource::Path(path) => {
                let getter: Rc<dyn Fn() -> Result<Value>> = match parse_path(&path) {
                    Some(segments) => {
                        let weak = weak.clone();
                        Rc::new(move || match upgrade(&weak) {
                            Some(vm) => vm.resolve_path(&segments),
                            None => Ok(Value::Null),
                        })
                    }
                    None => {
                        warn(format_args!(
                            "Failed watching path: \"{path}\" Watcher only accepts simple dot-delimited paths. For full control, use a function instead."
                        ));
                        Rc::new(|| Ok(Value::Null))
                    }
                };
                (getter, path)
            }
            WatchSource::Getter(f) => {
                let weak = weak.clone();
                let getter: Rc<dyn Fn() -> Result<Value>> = Rc::new(move || match upgrade(&weak) {
                    Some(vm) => f(&vm),
                    None => Ok(Value::Null),
                });
                (getter, "function".to_string())
            }
        };

        let callback_weak = weak.clone();
        let callback_handler = handler.clone();
        let watcher = Watcher::detached(
            move || getter(),
            Some(Box::new(move |new: &Value, old: &Value| match upgrade(&callback_weak) {
                Some(vm) => callback_handler(&vm, new, old),
                None => Ok(()),
            })),
            WatcherOptions {
                flags: options.flags(),
                owner: Some(self.downgrade_scope()),
                expression: expression.clone(),
                ..Default::default()
            },
        );
        if let Err(err) = watcher.prime() {
            handle_error(err, Some(self.scope()), &format!("getter for watcher \"{expression}\""));
        }
        self.0.watchers.borrow_mut().push(watcher.clone());

        if options.immediate {
            let value = watcher.value();
            untracked(|| {
                invoke_with_error_handling(
                    || handler(self, &value, &Value::Null),
                    Some(self.scope()),
                    &format!("callback for immediate watcher \"{expression}\""),
                )
            });
        }
        Unwatch { watcher, owner: weak }
    }

    fn resolve_path(&self, segments: &[String]) -> Result<Value> {
        let Some((first, rest)) = segments.split_first() else {
            return Ok(Value::Null);
        };
        let mut value = self.lookup(first)?.unwrap_or_default();
        for segment in rest {
            value = match &value {
                Value::Object(object) => object.get(segment),
                Value::Array(array) => match segment.parse::<usize>() {
                    Ok(index) => array.get(index),
                    Err(_) => return Ok(Value::Null),
                },
                _ => return Ok(Value::Null),
            };
        }
        Ok(value)
    }

    /// Number of user watchers registered on this instance.
    pub fn watcher_count(&self) -> usize {
        self.0.watchers.borrow().len()
    }

    pub fn render_watcher(&self) -> Option<Watcher> {
        self.0.render_watcher.borrow().clone()
    }

    // =========================================================================
    // Mount and Render
    // =========================================================================

    /// Render and patch into `container` (roots) or detached (placeholder
    /// children, which the parent's patch inserts).
    pub fn mount(&self, container: Option<NodeId>) {
        self.0.container.set(container);
        if self.def().options().render.is_none() {
            warn(format_args!(
                "Failed to mount component <{}>: template or render function not defined.",
                self.name()
            ));
        }
        call_hook(self, Hook::BeforeMount);

        let weak = Rc::downgrade(&self.0);
        let before_weak = weak.clone();
        let after_weak = weak.clone();
        let watcher = Watcher::detached(
            move || {
                if let Some(vm) = upgrade(&weak) {
                    vm.update_component();
                }
                Ok(Value::Null)
            },
            None,
            WatcherOptions {
                flags: WatcherFlags::empty(),
                before: Some(Rc::new(move || {
                    if let Some(vm) = upgrade(&before_weak) {
                        if vm.is_mounted() && !vm.is_destroyed() {
                            call_hook(&vm, Hook::BeforeUpdate);
                        }
                    }
                })),
                after_flush: Some(Rc::new(move || {
                    if let Some(vm) = upgrade(&after_weak) {
                        if vm.is_mounted() && !vm.is_destroyed() {
                            call_hook(&vm, Hook::Updated);
                        }
                    }
                })),
                owner: Some(self.downgrade_scope()),
                expression: format!("<{}> render", self.name()),
            },
        );
        *self.0.render_watcher.borrow_mut() = Some(watcher.clone());
        if let Err(err) = watcher.prime() {
            handle_error(err, Some(self.scope()), "render watcher");
        }
        tracing::debug!(component = %self.name(), id = %self.id(), "mount");

        if !self.0.placeholder {
            self.0.mounted.set(true);
            call_hook(self, Hook::Mounted);
        }
    }

    /// Body of the render watcher.
    fn update_component(&self) {
        let Some(vnode) = self.render() else { return };
        untracked(|| self.update(vnode));
    }

    /// Run the render function. `None` means it failed and the previous tree
    /// stays in place.
    fn render(&self) -> Option<VNode> {
        let result = match self.def().options().render.clone() {
            Some(render) => render(&RenderContext::new(self)),
            None => Ok(VNode::empty().into()),
        };
        match result {
            Ok(roots) => Some(roots.into_single()),
            Err(err) => {
                handle_error(err, Some(self.scope()), "render");
                if self.0.vnode.borrow().is_none() {
                    Some(VNode::empty())
                } else {
                    None
                }
            }
        }
    }

    /// Patch the previous tree into `vnode`.
    fn update(&self, vnode: VNode) {
        let prev = self.0.vnode.borrow_mut().take();
        let initial = prev.is_none();
        let patched = Patcher::for_component(self).patch(
            prev.as_ref(),
            Some(&vnode),
            self.0.container.get(),
        );
        *self.0.vnode.borrow_mut() = Some(vnode);
        tracing::trace!(component = %self.name(), id = %self.id(), initial, "patched");

        if initial && self.0.placeholder {
            self.0.pending_insert.borrow_mut().extend(patched.inserted);
        } else {
            invoke_insert_hooks(patched.inserted);
        }
    }

    /// Root output node of the current tree.
    pub fn root_elm(&self) -> Option<NodeId> {
        self.0.vnode.borrow().as_ref().and_then(VNode::elm)
    }

    /// Instances created by the initial patch whose `mounted` hooks wait for
    /// the parent's patch.
    pub(crate) fn take_pending_insert(&self) -> Vec<Component> {
        std::mem::take(&mut *self.0.pending_insert.borrow_mut())
    }

    /// Push new prop values from a parent re-render. Only changed values
    /// notify, so an unchanged child does not re-render.
    pub(crate) fn update_from_parent(&self, props_data: &IndexMap<String, Value>) {
        let previous = self.0.props_data.replace(props_data.clone());
        toggle_observing(false);
        for (key, def) in &self.def().options().props {
            let current = self.0.props.peek(key);
            let value = revalidate_prop(key, def, props_data, &previous, current);
            self.0.props.assign(key, value);
        }
        toggle_observing(true);
    }

    /// Re-render on the next flush.
    pub fn force_update(&self) {
        if let Some(watcher) = self.render_watcher() {
            watcher.update();
        }
    }

    /// Run `callback` after the next flush. Errors are routed to this
    /// instance.
    pub fn next_tick(&self, callback: impl FnOnce() -> Result<()> + 'static) {
        next_tick::next_tick_in(callback, self.downgrade_scope());
    }

    // =========================================================================
    // Activation
    // =========================================================================

    /// Re-activate this subtree. During a flush the hooks wait for the flush
    /// to finish.
    pub fn activate(&self) {
        if scheduler::is_flushing() {
            scheduler::queue_activated_component(self.clone());
        } else {
            lifecycle::activate_child_component(self, true);
        }
    }

    pub fn deactivate(&self) {
        lifecycle::deactivate_child_component(self, true);
    }

    pub fn inactive(&self) -> Option<bool> {
        self.0.inactive.get()
    }

    pub(crate) fn set_inactive(&self, inactive: Option<bool>) {
        self.0.inactive.set(inactive);
    }

    pub(crate) fn direct_inactive(&self) -> bool {
        self.0.direct_inactive.get()
    }

    pub(crate) fn set_direct_inactive(&self, value: bool) {
        self.0.direct_inactive.set(value);
    }

    // =========================================================================
    // Destroy
    // =========================================================================

    pub fn is_mounted(&self) -> bool {
        self.0.mounted.get()
    }

    pub fn is_being_destroyed(&self) -> bool {
        self.0.being_destroyed.get()
    }

    pub fn is_destroyed(&self) -> bool {
        self.0.destroyed.get()
    }

    /// Tear the instance down. Idempotent.
    pub fn destroy(&self) {
        if self.0.being_destroyed.get() {
            return;
        }
        call_hook(self, Hook::BeforeDestroy);
        self.0.being_destroyed.set(true);

        if let Some(parent) = self.parent() {
            if !parent.is_being_destroyed() {
                parent.0.children.borrow_mut().retain(|c| !c.ptr_eq(self));
            }
        }

        if let Some(watcher) = self.0.render_watcher.borrow_mut().take() {
            watcher.teardown();
        }
        let watchers = std::mem::take(&mut *self.0.watchers.borrow_mut());
        for watcher in &watchers {
            watcher.teardown();
        }
        for computed in self.0.computed.borrow().values() {
            computed.teardown();
        }
        if let Some(ob) = self.data().observer() {
            ob.remove_vm();
        }

        self.0.destroyed.set(true);
        let vnode = self.0.vnode.borrow_mut().take();
        if let Some(vnode) = &vnode {
            Patcher::for_component(self).patch(Some(vnode), None, None);
        }
        call_hook(self, Hook::Destroyed);
        self.0.children.borrow_mut().clear();
        tracing::debug!(component = %self.name(), id = %self.id(), "destroyed");
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} {}>", self.name(), self.id())
    }
}

/// Mark freshly inserted instances mounted, children first.
fn invoke_insert_hooks(queue: Vec<Component>) {
    for vm in queue {
        if !vm.is_mounted() && !vm.is_destroyed() {
            vm.0.mounted.set(true);
            call_hook(&vm, Hook::Mounted);
        }
    }
}

/// Split `"a.b.c"` into segments. Paths may only hold word characters, `$`
/// and dots.
fn parse_path(path: &str) -> Option<Vec<String>> {
    let valid = path
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '$' || c == '.');
    if !valid {
        return None;
    }
    Some(path.split('.').map(str::to_string).collect())
}

// =============================================================================
// Unwatch
// =============================================================================

/// Handle returned by [`Component::watch`]. The watch lives as long as the
/// instance unless stopped with [`unwatch`](Self::unwatch).
pub struct Unwatch {
    watcher: Watcher,
    owner: Weak<ComponentInner>,
}

impl Unwatch {
    pub fn watcher(&self) -> &Watcher {
        &self.watcher
    }

    /// Stop watching.
    pub fn unwatch(self) {
        if let Some(vm) = upgrade(&self.owner) {
            if !vm.is_being_destroyed() {
                vm.0.watchers.borrow_mut().retain(|w| !w.ptr_eq(&self.watcher));
            }
        }
        self.watcher.teardown();
    }
}

// =============================================================================
// Tests
// =============================================================================
