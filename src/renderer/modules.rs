//! Per-aspect element updaters.
//!
//! Each [`Module`] owns one aspect of an element (attributes, class, style,
//! listeners). It is handed the old and the new virtual node and issues only
//! the backend calls needed to go from one to the other. A node is created by
//! updating from an empty node.

use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};

use super::Backend;
use crate::error::ErrorScope;
use crate::vdom::{normalize_event, Handler, Invoker, VNode, VNodeData};

/// Context handed to modules.
pub struct ModuleEnv<'a> {
    pub backend: &'a dyn Backend,
    /// Component that rendered the nodes; listener errors are routed there.
    pub scope: Option<Weak<dyn ErrorScope>>,
}

/// One aspect of element patching.
pub trait Module {
    /// Apply the aspect to a freshly created element.
    fn create(&self, env: &ModuleEnv<'_>, vnode: &VNode) {
        self.update(env, &VNode::empty(), vnode);
    }

    /// Apply the delta between `old` and `new`. `new` already carries the
    /// output node.
    fn update(&self, env: &ModuleEnv<'_>, old: &VNode, new: &VNode);

    /// Called before an element is discarded.
    fn destroy(&self, _env: &ModuleEnv<'_>, _vnode: &VNode) {}
}

/// The built-in module set.
pub fn default_modules() -> Rc<[Rc<dyn Module>]> {
    Rc::new([
        Rc::new(AttrsModule) as Rc<dyn Module>,
        Rc::new(ClassModule),
        Rc::new(StyleModule),
        Rc::new(EventsModule),
    ])
}

fn data_of(vnode: &VNode) -> Option<&VNodeData> {
    vnode.data()
}

/// Set changed and remove stale entries of a string map.
fn diff_map(
    old: Option<&BTreeMap<String, String>>,
    new: Option<&BTreeMap<String, String>>,
    mut set: impl FnMut(&str, &str),
    mut remove: impl FnMut(&str),
) {
    let empty = BTreeMap::new();
    let old = old.unwrap_or(&empty);
    let new = new.unwrap_or(&empty);
    for (name, value) in new {
        if old.get(name) != Some(value) {
            set(name, value);
        }
    }
    for name in old.keys() {
        if !new.contains_key(name) {
            remove(name);
        }
    }
}

// =============================================================================
// Attributes
// =============================================================================

pub struct AttrsModule;

impl Module for AttrsModule {
    fn update(&self, env: &ModuleEnv<'_>, old: &VNode, new: &VNode) {
        let Some(elm) = new.elm.get() else { return };
        diff_map(
            data_of(old).map(|d| &d.attrs),
            data_of(new).map(|d| &d.attrs),
            |name, value| env.backend.set_attribute(elm, name, value),
            |name| env.backend.remove_attribute(elm, name),
        );
    }
}

// =============================================================================
// Class
// =============================================================================

pub struct ClassModule;

impl Module for ClassModule {
    fn update(&self, env: &ModuleEnv<'_>, old: &VNode, new: &VNode) {
        let Some(elm) = new.elm.get() else { return };
        let old_class = data_of(old).map(VNodeData::class_string).unwrap_or_default();
        let new_class = data_of(new).map(VNodeData::class_string).unwrap_or_default();
        if old_class != new_class {
            env.backend.set_class(elm, &new_class);
        }
    }
}

// =============================================================================
// Style
// =============================================================================

pub struct StyleModule;

impl Module for StyleModule {
    fn update(&self, env: &ModuleEnv<'_>, old: &VNode, new: &VNode) {
        let Some(elm) = new.elm.get() else { return };
        diff_map(
            data_of(old).map(|d| &d.style),
            data_of(new).map(|d| &d.style),
            |property, value| env.backend.set_style(elm, property, value),
            |property| env.backend.remove_style(elm, property),
        );
    }
}

// =============================================================================
// Events
// =============================================================================

/// Listener module.
///
/// The invoker installed for a listener name is carried from the old node to
/// the new one; only its handler is swapped, so an unchanged set of listener
/// names produces no backend calls.
pub struct EventsModule;

impl Module for EventsModule {
    fn update(&self, env: &ModuleEnv<'_>, old: &VNode, new: &VNode) {
        let Some(elm) = new.elm.get() else { return };
        let empty: BTreeMap<String, Handler> = BTreeMap::new();
        let on = data_of(new).map_or(&empty, |d| &d.on);

        let mut previous = std::mem::take(&mut *old.invokers.borrow_mut());
        let mut current = HashMap::with_capacity(on.len());
        for (raw, handler) in on {
            let invoker = match previous.remove(raw) {
                Some(invoker) => {
                    invoker.set_handler(handler);
                    invoker
                }
                None => {
                    let event = normalize_event(raw);
                    let invoker = Invoker::new(event.clone(), handler.clone(), env.scope.clone());
                    env.backend.add_listener(elm, &event, invoker.clone());
                    invoker
                }
            };
            current.insert(raw.clone(), invoker);
        }
        for invoker in previous.values() {
            env.backend.remove_listener(elm, invoker.event());
        }
        *new.invokers.borrow_mut() = current;
    }

    fn destroy(&self, env: &ModuleEnv<'_>, vnode: &VNode) {
        let Some(elm) = vnode.elm.get() else { return };
        let invokers = std::mem::take(&mut *vnode.invokers.borrow_mut());
        for invoker in invokers.values() {
            env.backend.remove_listener(elm, invoker.event());
        }
    }
}
