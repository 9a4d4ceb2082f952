//! Render functions and the render context.

use std::ops::Deref;

use super::instance::Component;
use super::options::ComponentDef;
use crate::error::warn;
use crate::vdom::VNode;

/// What a render function returns. A component must render exactly one root;
/// anything else renders an empty placeholder with a warning.
#[derive(Debug)]
pub enum Roots {
    One(VNode),
    Many(Vec<VNode>),
}

impl From<VNode> for Roots {
    fn from(vnode: VNode) -> Self {
        Roots::One(vnode)
    }
}

impl From<Vec<VNode>> for Roots {
    fn from(vnodes: Vec<VNode>) -> Self {
        Roots::Many(vnodes)
    }
}

impl Roots {
    pub(crate) fn into_single(self) -> VNode {
        match self {
            Roots::One(vnode) => vnode,
            Roots::Many(mut vnodes) if vnodes.len() == 1 => vnodes.remove(0),
            Roots::Many(_) => {
                warn(
                    "Multiple root nodes returned from render function. Render function should return a single root node.",
                );
                VNode::empty()
            }
        }
    }
}

/// Handed to render functions. Dereferences to the rendering component, so
/// `ctx.get("count")` reads instance state under the render's tracking.
pub struct RenderContext<'a> {
    vm: &'a Component,
}

impl<'a> RenderContext<'a> {
    pub(crate) fn new(vm: &'a Component) -> Self {
        Self { vm }
    }

    pub fn component(&self) -> &Component {
        self.vm
    }

    /// Look up a child component registered on this component's options.
    pub fn resolve(&self, name: &str) -> Option<ComponentDef> {
        self.vm.def().options().components.get(name).cloned()
    }

    /// Placeholder for a registered child component. Unknown names warn and
    /// render as a plain element of that tag.
    pub fn child(&self, name: &str) -> VNode {
        match self.resolve(name) {
            Some(def) => VNode::component(&def),
            None => {
                warn(format_args!(
                    "Unknown custom element: <{name}> - did you register the component correctly?"
                ));
                VNode::element(name)
            }
        }
    }
}

impl Deref for RenderContext<'_> {
    type Target = Component;

    fn deref(&self) -> &Component {
        self.vm
    }
}
