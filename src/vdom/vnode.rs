//! Virtual nodes.
//!
//! A [`VNode`] is an immutable description of one output node plus a couple
//! of slots the patcher fills in when it realizes the node: the handle of the
//! output node (`elm`), the child component instance for component
//! placeholders, and the listener invokers attached to an element.
//!
//! Trees are built with the fluent constructors:
//!
//! ```ignore
//! VNode::element("ul").children(
//!     items.iter().map(|item| VNode::element("li").key(item.id).text_content(&item.label)),
//! )
//! ```

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use indexmap::IndexMap;

use super::listeners::{Handler, Invoker};
use crate::component::{Component, ComponentDef};
use crate::error::{warn, Result};
use crate::reactive::Value;
use crate::types::{Key, NodeId};

bitflags! {
    /// Render hints.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct VNodeFlags: u8 {
        /// Subtree never changes; patching reuses the previous output.
        const STATIC = 1 << 0;
        /// Render-once subtree; same treatment as `STATIC`.
        const ONCE = 1 << 1;
    }
}

/// Per-aspect payload of an element.
#[derive(Clone, Default)]
pub struct VNodeData {
    pub attrs: BTreeMap<String, String>,
    pub class: Vec<String>,
    pub style: BTreeMap<String, String>,
    pub on: BTreeMap<String, Handler>,
}

impl VNodeData {
    /// Class list joined the way it is written to the output.
    pub fn class_string(&self) -> String {
        self.class
            .iter()
            .filter(|c| !c.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// What an element contains.
#[derive(Clone)]
pub enum Content {
    Children(Vec<VNode>),
    /// A single run of text, set as the element's text content.
    Text(String),
    /// Raw markup, handed to the backend as-is.
    Html(String),
}

/// Node kind.
#[derive(Clone)]
pub enum VNodeKind {
    Element {
        tag: String,
        data: VNodeData,
        content: Content,
    },
    Text(String),
    Comment(String),
    /// Placeholder for a child component instance.
    Component {
        def: ComponentDef,
        props: IndexMap<String, Value>,
    },
}

/// A virtual node.
///
/// Cloning copies the description only; the realized slots start empty.
pub struct VNode {
    pub(crate) kind: VNodeKind,
    pub(crate) key: Option<Key>,
    pub(crate) flags: VNodeFlags,
    pub(crate) elm: Cell<Option<NodeId>>,
    pub(crate) instance: RefCell<Option<Component>>,
    pub(crate) invokers: RefCell<HashMap<String, Invoker>>,
}

impl Clone for VNode {
    fn clone(&self) -> Self {
        Self::with_kind(self.kind.clone())
            .with_key_opt(self.key.clone())
            .with_flags(self.flags)
    }
}

impl VNode {
    fn with_kind(kind: VNodeKind) -> Self {
        Self {
            kind,
            key: None,
            flags: VNodeFlags::empty(),
            elm: Cell::new(None),
            instance: RefCell::new(None),
            invokers: RefCell::new(HashMap::new()),
        }
    }

    fn with_key_opt(mut self, key: Option<Key>) -> Self {
        self.key = key;
        self
    }

    fn with_flags(mut self, flags: VNodeFlags) -> Self {
        self.flags = flags;
        self
    }

    // =========================================================================
    // Constructors
    // =========================================================================

    pub fn element(tag: impl Into<String>) -> Self {
        Self::with_kind(VNodeKind::Element {
            tag: tag.into(),
            data: VNodeData::default(),
            content: Content::Children(Vec::new()),
        })
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::with_kind(VNodeKind::Text(text.into()))
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Self::with_kind(VNodeKind::Comment(text.into()))
    }

    /// The placeholder rendered when there is nothing to render.
    pub fn empty() -> Self {
        Self::comment("")
    }

    pub fn component(def: &ComponentDef) -> Self {
        Self::with_kind(VNodeKind::Component {
            def: def.clone(),
            props: IndexMap::new(),
        })
    }

    // =========================================================================
    // Builders
    // =========================================================================

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn static_tree(mut self) -> Self {
        self.flags |= VNodeFlags::STATIC;
        self
    }

    pub fn once(mut self) -> Self {
        self.flags |= VNodeFlags::ONCE;
        self
    }

    fn data_mut(&mut self, what: &str) -> Option<&mut VNodeData> {
        match &mut self.kind {
            VNodeKind::Element { data, .. } => Some(data),
            _ => {
                warn(format_args!("{what} ignored on a non-element node"));
                None
            }
        }
    }

    fn content_mut(&mut self, what: &str) -> Option<&mut Content> {
        match &mut self.kind {
            VNodeKind::Element { content, .. } => Some(content),
            _ => {
                warn(format_args!("{what} ignored on a non-element node"));
                None
            }
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Some(data) = self.data_mut("attribute") {
            data.attrs.insert(name.into(), value.into());
        }
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        if let Some(data) = self.data_mut("class") {
            data.class.push(class.into());
        }
        self
    }

    pub fn style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        if let Some(data) = self.data_mut("style") {
            data.style.insert(property.into(), value.into());
        }
        self
    }

    /// Attach a listener. The event name may carry the `&` (passive), `~`
    /// (once) and `!` (capture) prefixes.
    pub fn on(
        mut self,
        event: impl Into<String>,
        handler: impl Fn(&Value) -> Result<()> + 'static,
    ) -> Self {
        if let Some(data) = self.data_mut("listener") {
            data.on.insert(event.into(), Rc::new(handler));
        }
        self
    }

    pub fn child(mut self, child: VNode) -> Self {
        if let Some(content) = self.content_mut("child") {
            match content {
                Content::Children(children) => children.push(child),
                other => *other = Content::Children(vec![child]),
            }
        }
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = VNode>) -> Self {
        if let Some(content) = self.content_mut("children") {
            match content {
                Content::Children(existing) => existing.extend(children),
                other => *other = Content::Children(children.into_iter().collect()),
            }
        }
        self
    }

    /// Replace the content with a single run of text.
    pub fn text_content(mut self, text: impl Into<String>) -> Self {
        if let Some(content) = self.content_mut("text content") {
            *content = Content::Text(text.into());
        }
        self
    }

    /// Replace the content with raw markup.
    pub fn html(mut self, html: impl Into<String>) -> Self {
        if let Some(content) = self.content_mut("html") {
            *content = Content::Html(html.into());
        }
        self
    }

    /// Pass a prop to a component placeholder.
    pub fn prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        match &mut self.kind {
            VNodeKind::Component { props, .. } => {
                props.insert(name.into(), value.into());
            }
            _ => warn("prop ignored on a non-component node"),
        }
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn kind(&self) -> &VNodeKind {
        &self.kind
    }

    pub fn get_key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    pub fn flags(&self) -> VNodeFlags {
        self.flags
    }

    pub fn is_static(&self) -> bool {
        self.flags.intersects(VNodeFlags::STATIC | VNodeFlags::ONCE)
    }

    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            VNodeKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn data(&self) -> Option<&VNodeData> {
        match &self.kind {
            VNodeKind::Element { data, .. } => Some(data),
            _ => None,
        }
    }

    pub fn content(&self) -> Option<&Content> {
        match &self.kind {
            VNodeKind::Element { content, .. } => Some(content),
            _ => None,
        }
    }

    /// Element children, empty for every other shape.
    pub fn child_nodes(&self) -> &[VNode] {
        match self.content() {
            Some(Content::Children(children)) => children,
            _ => &[],
        }
    }

    /// Realized output node. For component placeholders this is the child
    /// instance's current root.
    pub fn elm(&self) -> Option<NodeId> {
        if let Some(instance) = self.instance.borrow().as_ref() {
            if let Some(root) = instance.root_elm() {
                return Some(root);
            }
        }
        self.elm.get()
    }

    /// Child component instance of a placeholder, once created.
    pub fn component_instance(&self) -> Option<Component> {
        self.instance.borrow().clone()
    }
}

/// Whether two nodes describe the same output node, so that one can be
/// patched into the other.
///
/// Keys must match (two absent keys match, giving positional reuse), and so
/// must the node shape: same tag, same component descriptor, text with text,
/// comment with comment. Inputs must also agree on their `type` attribute.
pub fn same_vnode(a: &VNode, b: &VNode) -> bool {
    if a.key != b.key {
        return false;
    }
    match (&a.kind, &b.kind) {
        (
            VNodeKind::Element { tag: ta, data: da, .. },
            VNodeKind::Element { tag: tb, data: db, .. },
        ) => ta == tb && (ta != "input" || da.attrs.get("type") == db.attrs.get("type")),
        (VNodeKind::Text(_), VNodeKind::Text(_)) => true,
        (VNodeKind::Comment(_), VNodeKind::Comment(_)) => true,
        (VNodeKind::Component { def: a, .. }, VNodeKind::Component { def: b, .. }) => {
            a.id() == b.id()
        }
        _ => false,
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            VNodeKind::Element { tag, content, .. } => {
                let mut s = f.debug_struct("Element");
                s.field("tag", tag);
                if let Some(key) = &self.key {
                    s.field("key", key);
                }
                match content {
                    Content::Children(children) => s.field("children", children),
                    Content::Text(text) => s.field("text", text),
                    Content::Html(html) => s.field("html", html),
                };
                s.finish()
            }
            VNodeKind::Text(text) => write!(f, "Text({text:?})"),
            VNodeKind::Comment(text) => write!(f, "Comment({text:?})"),
            VNodeKind::Component { def, props } => f
                .debug_struct("Component")
                .field("name", &def.name())
                .field("props", props)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_data() {
        let node = VNode::element("div")
            .key("root")
            .attr("id", "main")
            .class("a")
            .class("b")
            .style("color", "red")
            .children([VNode::text("x"), VNode::comment("c")]);
        assert_eq!(node.tag(), Some("div"));
        assert_eq!(node.get_key(), Some(&Key::from("root")));
        let data = node.data().unwrap();
        assert_eq!(data.attrs.get("id").map(String::as_str), Some("main"));
        assert_eq!(data.class_string(), "a b");
        assert_eq!(node.child_nodes().len(), 2);
    }

    #[test]
    fn test_text_content_replaces_children() {
        let node = VNode::element("p").child(VNode::text("a")).text_content("b");
        assert!(matches!(node.content(), Some(Content::Text(t)) if t == "b"));
        assert!(node.child_nodes().is_empty());
    }

    #[test]
    fn test_same_vnode_rules() {
        assert!(same_vnode(&VNode::element("li"), &VNode::element("li")));
        assert!(!same_vnode(&VNode::element("li"), &VNode::element("p")));
        assert!(!same_vnode(&VNode::element("li").key(1), &VNode::element("li").key(2)));
        assert!(!same_vnode(&VNode::element("li").key(1), &VNode::element("li")));
        assert!(same_vnode(&VNode::text("a"), &VNode::text("b")));
        assert!(!same_vnode(&VNode::text("a"), &VNode::comment("a")));
        assert!(!same_vnode(
            &VNode::element("input").attr("type", "text"),
            &VNode::element("input").attr("type", "checkbox"),
        ));
    }

    #[test]
    fn test_clone_drops_realized_state() {
        let node = VNode::element("div").key(1).static_tree();
        node.elm.set(Some(NodeId(3)));
        let copy = node.clone();
        assert_eq!(copy.elm(), None);
        assert!(copy.is_static());
        assert_eq!(copy.get_key(), Some(&Key::Int(1)));
    }
}
