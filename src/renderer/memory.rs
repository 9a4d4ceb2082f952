//! In-memory backend.
//!
//! Nodes live in an index-addressed arena; a [`NodeId`] is the slot index.
//! Every call the patcher makes is appended to an operation log, so tests can
//! assert exactly which output mutations a patch produced.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use super::Backend;
use crate::reactive::Value;
use crate::types::NodeId;
use crate::vdom::{EventName, Invoker};

// =============================================================================
// Operation Log
// =============================================================================

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    CreateElement { node: NodeId, tag: String },
    CreateText { node: NodeId, text: String },
    CreateComment { node: NodeId, text: String },
    InsertBefore { parent: NodeId, node: NodeId, reference: Option<NodeId> },
    RemoveChild { parent: NodeId, node: NodeId },
    SetText { node: NodeId, text: String },
    SetHtml { node: NodeId, html: String },
    SetAttribute { node: NodeId, name: String, value: String },
    RemoveAttribute { node: NodeId, name: String },
    SetClass { node: NodeId, class: String },
    SetStyle { node: NodeId, property: String, value: String },
    RemoveStyle { node: NodeId, property: String },
    AddListener { node: NodeId, event: String },
    RemoveListener { node: NodeId, event: String },
}

impl Op {
    /// Node creation.
    pub fn is_create(&self) -> bool {
        matches!(
            self,
            Op::CreateElement { .. } | Op::CreateText { .. } | Op::CreateComment { .. }
        )
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, Op::InsertBefore { .. })
    }

    pub fn is_remove(&self) -> bool {
        matches!(self, Op::RemoveChild { .. })
    }

    pub fn is_text_update(&self) -> bool {
        matches!(self, Op::SetText { .. })
    }
}

// =============================================================================
// Nodes
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeKind {
    Element(String),
    Text,
    Comment,
}

struct MemNode {
    kind: NodeKind,
    /// Text of text/comment nodes; text content of leaf elements.
    text: String,
    html: Option<String>,
    attrs: BTreeMap<String, String>,
    class: String,
    style: BTreeMap<String, String>,
    listeners: HashMap<String, Invoker>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl MemNode {
    fn new(kind: NodeKind, text: &str) -> Self {
        Self {
            kind,
            text: text.to_string(),
            html: None,
            attrs: BTreeMap::new(),
            class: String::new(),
            style: BTreeMap::new(),
            listeners: HashMap::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

/// Output tree kept in memory.
#[derive(Default)]
pub struct MemoryBackend {
    nodes: RefCell<Vec<MemNode>>,
    ops: RefCell<Vec<Op>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached container element to mount into. Not logged.
    pub fn create_root(&self) -> NodeId {
        self.alloc(MemNode::new(NodeKind::Element("root".into()), ""))
    }

    fn alloc(&self, node: MemNode) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(node);
        NodeId(nodes.len() - 1)
    }

    fn log(&self, op: Op) {
        self.ops.borrow_mut().push(op);
    }

    fn with_node<T>(&self, node: NodeId, f: impl FnOnce(&mut MemNode) -> T) -> Option<T> {
        self.nodes.borrow_mut().get_mut(node.0).map(f)
    }

    fn detach(&self, node: NodeId) {
        let parent = self.with_node(node, |n| n.parent.take()).flatten();
        if let Some(parent) = parent {
            self.with_node(parent, |p| p.children.retain(|c| *c != node));
        }
    }

    // =========================================================================
    // Operation Log
    // =========================================================================

    /// Everything recorded since the last clear.
    pub fn ops(&self) -> Vec<Op> {
        self.ops.borrow().clone()
    }

    pub fn take_ops(&self) -> Vec<Op> {
        std::mem::take(&mut *self.ops.borrow_mut())
    }

    pub fn clear_ops(&self) {
        self.ops.borrow_mut().clear();
    }

    /// Count recorded operations matching `pred`.
    pub fn count_ops(&self, pred: impl Fn(&Op) -> bool) -> usize {
        self.ops.borrow().iter().filter(|op| pred(*op)).count()
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.with_node(node, |n| n.children.clone()).unwrap_or_default()
    }

    pub fn tag(&self, node: NodeId) -> Option<String> {
        self.with_node(node, |n| match &n.kind {
            NodeKind::Element(tag) => Some(tag.clone()),
            _ => None,
        })
        .flatten()
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.with_node(node, |n| n.attrs.get(name).cloned()).flatten()
    }

    pub fn class(&self, node: NodeId) -> String {
        self.with_node(node, |n| n.class.clone()).unwrap_or_default()
    }

    pub fn style(&self, node: NodeId, property: &str) -> Option<String> {
        self.with_node(node, |n| n.style.get(property).cloned()).flatten()
    }

    pub fn has_listener(&self, node: NodeId, event: &str) -> bool {
        self.with_node(node, |n| n.listeners.contains_key(event))
            .unwrap_or(false)
    }

    /// Concatenated text of `node` and its descendants (comments excluded).
    pub fn text_content(&self, node: NodeId) -> String {
        let nodes = self.nodes.borrow();
        let mut out = String::new();
        collect_text(&nodes, node, &mut out);
        out
    }

    /// Serialize `node` and its descendants.
    pub fn to_html(&self, node: NodeId) -> String {
        let nodes = self.nodes.borrow();
        let mut out = String::new();
        write_html(&nodes, node, &mut out);
        out
    }

    /// Serialize the children of `node` (typically the mount container).
    pub fn inner_html(&self, node: NodeId) -> String {
        let nodes = self.nodes.borrow();
        let mut out = String::new();
        if let Some(n) = nodes.get(node.0) {
            for child in &n.children {
                write_html(&nodes, *child, &mut out);
            }
        }
        out
    }

    /// Deliver an event to the listener registered for `event` on `node`.
    ///
    /// Once-listeners are removed after delivery. Returns whether a handler
    /// ran.
    pub fn dispatch(&self, node: NodeId, event: &str, payload: &Value) -> bool {
        let invoker = self
            .with_node(node, |n| n.listeners.get(event).cloned())
            .flatten();
        let Some(invoker) = invoker else {
            return false;
        };
        let ran = invoker.invoke(payload);
        if invoker.is_once() {
            self.with_node(node, |n| n.listeners.remove(event));
        }
        ran
    }

    /// Find the first element with `tag` under `root`, depth first.
    pub fn find(&self, root: NodeId, tag: &str) -> Option<NodeId> {
        if self.tag(root).as_deref() == Some(tag) {
            return Some(root);
        }
        self.children(root)
            .into_iter()
            .find_map(|child| self.find(child, tag))
    }
}

fn collect_text(nodes: &[MemNode], node: NodeId, out: &mut String) {
    let Some(n) = nodes.get(node.0) else { return };
    match n.kind {
        NodeKind::Text => out.push_str(&n.text),
        NodeKind::Comment => {}
        NodeKind::Element(_) => {
            if n.children.is_empty() {
                out.push_str(&n.text);
            }
            for child in &n.children {
                collect_text(nodes, *child, out);
            }
        }
    }
}

fn write_html(nodes: &[MemNode], node: NodeId, out: &mut String) {
    let Some(n) = nodes.get(node.0) else { return };
    match &n.kind {
        NodeKind::Text => out.push_str(&n.text),
        NodeKind::Comment => {
            let _ = write!(out, "<!--{}-->", n.text);
        }
        NodeKind::Element(tag) => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in &n.attrs {
                let _ = write!(out, " {name}=\"{value}\"");
            }
            if !n.class.is_empty() {
                let _ = write!(out, " class=\"{}\"", n.class);
            }
            if !n.style.is_empty() {
                let style: Vec<String> = n.style.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                let _ = write!(out, " style=\"{}\"", style.join("; "));
            }
            out.push('>');
            if let Some(html) = &n.html {
                out.push_str(html);
            } else if n.children.is_empty() {
                out.push_str(&n.text);
            }
            for child in &n.children {
                write_html(nodes, *child, out);
            }
            let _ = write!(out, "</{tag}>");
        }
    }
}

// =============================================================================
// Backend
// =============================================================================

impl Backend for MemoryBackend {
    fn create_element(&self, tag: &str) -> NodeId {
        let node = self.alloc(MemNode::new(NodeKind::Element(tag.to_string()), ""));
        self.log(Op::CreateElement { node, tag: tag.to_string() });
        node
    }

    fn create_text(&self, text: &str) -> NodeId {
        let node = self.alloc(MemNode::new(NodeKind::Text, text));
        self.log(Op::CreateText { node, text: text.to_string() });
        node
    }

    fn create_comment(&self, text: &str) -> NodeId {
        let node = self.alloc(MemNode::new(NodeKind::Comment, text));
        self.log(Op::CreateComment { node, text: text.to_string() });
        node
    }

    fn insert_before(&self, parent: NodeId, node: NodeId, reference: Option<NodeId>) {
        self.log(Op::InsertBefore { parent, node, reference });
        self.detach(node);
        self.with_node(parent, |p| {
            let at = reference
                .and_then(|r| p.children.iter().position(|c| *c == r))
                .unwrap_or(p.children.len());
            p.children.insert(at, node);
        });
        self.with_node(node, |n| n.parent = Some(parent));
    }

    fn remove_child(&self, parent: NodeId, node: NodeId) {
        self.log(Op::RemoveChild { parent, node });
        let is_child = self
            .with_node(node, |n| n.parent == Some(parent))
            .unwrap_or(false);
        if is_child {
            self.detach(node);
        }
    }

    fn parent_node(&self, node: NodeId) -> Option<NodeId> {
        self.with_node(node, |n| n.parent).flatten()
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent_node(node)?;
        self.with_node(parent, |p| {
            let at = p.children.iter().position(|c| *c == node)?;
            p.children.get(at + 1).copied()
        })
        .flatten()
    }

    fn set_text_content(&self, node: NodeId, text: &str) {
        self.log(Op::SetText { node, text: text.to_string() });
        let orphans = self
            .with_node(node, |n| {
                n.text = text.to_string();
                n.html = None;
                std::mem::take(&mut n.children)
            })
            .unwrap_or_default();
        for child in orphans {
            self.with_node(child, |c| c.parent = None);
        }
    }

    fn set_inner_html(&self, node: NodeId, html: &str) {
        self.log(Op::SetHtml { node, html: html.to_string() });
        let orphans = self
            .with_node(node, |n| {
                n.html = Some(html.to_string());
                n.text.clear();
                std::mem::take(&mut n.children)
            })
            .unwrap_or_default();
        for child in orphans {
            self.with_node(child, |c| c.parent = None);
        }
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        self.log(Op::SetAttribute {
            node,
            name: name.to_string(),
            value: value.to_string(),
        });
        self.with_node(node, |n| n.attrs.insert(name.to_string(), value.to_string()));
    }

    fn remove_attribute(&self, node: NodeId, name: &str) {
        self.log(Op::RemoveAttribute { node, name: name.to_string() });
        self.with_node(node, |n| n.attrs.remove(name));
    }

    fn set_class(&self, node: NodeId, class: &str) {
        self.log(Op::SetClass { node, class: class.to_string() });
        self.with_node(node, |n| n.class = class.to_string());
    }

    fn set_style(&self, node: NodeId, property: &str, value: &str) {
        self.log(Op::SetStyle {
            node,
            property: property.to_string(),
            value: value.to_string(),
        });
        self.with_node(node, |n| n.style.insert(property.to_string(), value.to_string()));
    }

    fn remove_style(&self, node: NodeId, property: &str) {
        self.log(Op::RemoveStyle { node, property: property.to_string() });
        self.with_node(node, |n| n.style.remove(property));
    }

    fn add_listener(&self, node: NodeId, event: &EventName, invoker: Invoker) {
        self.log(Op::AddListener { node, event: event.name.clone() });
        self.with_node(node, |n| n.listeners.insert(event.name.clone(), invoker));
    }

    fn remove_listener(&self, node: NodeId, event: &EventName) {
        self.log(Op::RemoveListener { node, event: event.name.clone() });
        self.with_node(node, |n| n.listeners.remove(&event.name));
    }
}

// =============================================================================
// Tests
// =============================================================================
