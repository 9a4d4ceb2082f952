//! Patching one virtual tree into another.
//!
//! [`Patcher::patch`] is the single entry point:
//!
//! - `(None, Some(new))` realizes `new` and appends it to the container
//! - `(Some(old), Some(new))` reuses `old`'s output when the two roots are
//!   [`same_vnode`], otherwise builds `new` next to `old` and removes `old`
//! - `(Some(old), None)` runs destroy hooks for the whole tree
//!
//! Component placeholders are realized by creating and mounting a child
//! instance. Their `mounted` hooks must only run once the whole subtree is in
//! the output, so new instances are collected in an *inserted queue*
//! (children before parents) and returned to the caller in [`Patched`].

use std::collections::HashSet;
use std::rc::Rc;

use super::modules::{default_modules, Module, ModuleEnv};
use super::Backend;
use crate::component::{Component, ComponentInit};
use crate::error::warn;
use crate::types::NodeId;
use crate::vdom::{same_vnode, Content, VNode, VNodeKind};

/// Result of a patch.
#[derive(Debug, Default)]
pub struct Patched {
    /// Output node of the new root, if any.
    pub root: Option<NodeId>,
    /// Component instances created by the patch, children first.
    pub inserted: Vec<Component>,
}

/// Reconciles virtual trees through a [`Backend`].
pub struct Patcher {
    backend: Rc<dyn Backend>,
    modules: Rc<[Rc<dyn Module>]>,
    owner: Option<Component>,
}

impl Patcher {
    /// Patcher with the built-in modules and no owning component.
    pub fn new(backend: Rc<dyn Backend>) -> Self {
        Self {
            backend,
            modules: default_modules(),
            owner: None,
        }
    }

    /// Replace the module set.
    pub fn with_modules(mut self, modules: Rc<[Rc<dyn Module>]>) -> Self {
        self.modules = modules;
        self
    }

    /// Patcher for the tree rendered by `owner`.
    pub(crate) fn for_component(owner: &Component) -> Self {
        Self {
            backend: owner.backend(),
            modules: owner.modules(),
            owner: Some(owner.clone()),
        }
    }

    pub fn backend(&self) -> &Rc<dyn Backend> {
        &self.backend
    }

    fn env(&self) -> ModuleEnv<'_> {
        ModuleEnv {
            backend: &*self.backend,
            scope: self.owner.as_ref().map(Component::downgrade_scope),
        }
    }

    // =========================================================================
    // Entry Point
    // =========================================================================

    /// Patch `old` into `new`. `parent` is the container used when there is
    /// no old tree to take the position from.
    pub fn patch(&self, old: Option<&VNode>, new: Option<&VNode>, parent: Option<NodeId>) -> Patched {
        let mut inserted = Vec::new();
        match (old, new) {
            (None, None) => {}
            (Some(old), None) => self.invoke_destroy_hook(old),
            (None, Some(new)) => self.create_elm(new, &mut inserted, parent, None),
            (Some(old), Some(new)) if same_vnode(old, new) => {
                self.patch_vnode(old, new, &mut inserted);
            }
            (Some(old), Some(new)) => {
                let old_elm = old.elm();
                let old_parent = old_elm.and_then(|e| self.backend.parent_node(e));
                let next = old_elm.and_then(|e| self.backend.next_sibling(e));
                self.create_elm(new, &mut inserted, old_parent.or(parent), next);
                match old_parent {
                    Some(_) => self.remove_vnodes(std::slice::from_ref(old), 0, 0, None),
                    None => self.invoke_destroy_hook(old),
                }
            }
        }
        Patched {
            root: new.and_then(VNode::elm),
            inserted,
        }
    }

    // =========================================================================
    // Creation
    // =========================================================================

    pub(crate) fn create_elm(
        &self,
        vnode: &VNode,
        inserted: &mut Vec<Component>,
        parent: Option<NodeId>,
        reference: Option<NodeId>,
    ) {
        match &vnode.kind {
            VNodeKind::Component { .. } => self.create_component(vnode, inserted, parent, reference),
            VNodeKind::Element { tag, content, .. } => {
                let elm = self.backend.create_element(tag);
                vnode.elm.set(Some(elm));
                match content {
                    Content::Children(children) => {
                        check_duplicate_keys(children);
                        for child in children {
                            self.create_elm(child, inserted, Some(elm), None);
                        }
                    }
                    Content::Text(text) if !text.is_empty() => {
                        self.backend.set_text_content(elm, text);
                    }
                    Content::Text(_) => {}
                    Content::Html(html) => self.backend.set_inner_html(elm, html),
                }
                self.invoke_create_hooks(vnode);
                self.insert(parent, elm, reference);
            }
            VNodeKind::Text(text) => {
                let elm = self.backend.create_text(text);
                vnode.elm.set(Some(elm));
                self.insert(parent, elm, reference);
            }
            VNodeKind::Comment(text) => {
                let elm = self.backend.create_comment(text);
                vnode.elm.set(Some(elm));
                self.insert(parent, elm, reference);
            }
        }
    }

    fn create_component(
        &self,
        vnode: &VNode,
        inserted: &mut Vec<Component>,
        parent: Option<NodeId>,
        reference: Option<NodeId>,
    ) {
        let VNodeKind::Component { def, props } = &vnode.kind else {
            return;
        };
        let child = Component::create(
            def,
            ComponentInit {
                parent: self.owner.clone(),
                props_data: props.clone(),
                backend: self.backend.clone(),
                modules: self.modules.clone(),
                placeholder: true,
            },
        );
        child.mount(None);
        let root = child.root_elm();
        vnode.elm.set(root);
        *vnode.instance.borrow_mut() = Some(child.clone());
        inserted.extend(child.take_pending_insert());
        inserted.push(child);
        if let Some(root) = root {
            self.insert(parent, root, reference);
        }
    }

    fn insert(&self, parent: Option<NodeId>, elm: NodeId, reference: Option<NodeId>) {
        if let Some(parent) = parent {
            self.backend.insert_before(parent, elm, reference);
        }
    }

    pub(crate) fn add_vnodes(
        &self,
        parent: NodeId,
        reference: Option<NodeId>,
        vnodes: &[VNode],
        start: usize,
        end: usize,
        inserted: &mut Vec<Component>,
    ) {
        for vnode in vnodes.iter().take(end + 1).skip(start) {
            self.create_elm(vnode, inserted, Some(parent), reference);
        }
    }

    fn invoke_create_hooks(&self, vnode: &VNode) {
        let env = self.env();
        for module in self.modules.iter() {
            module.create(&env, vnode);
        }
    }

    // =========================================================================
    // Patching
    // =========================================================================

    pub(crate) fn patch_vnode(&self, old: &VNode, new: &VNode, inserted: &mut Vec<Component>) {
        if std::ptr::eq(old, new) {
            return;
        }
        let elm = old.elm.get();
        new.elm.set(elm);

        if old.is_static() && new.is_static() && old.key == new.key {
            adopt(old, new);
            return;
        }

        match (&old.kind, &new.kind) {
            (VNodeKind::Component { .. }, VNodeKind::Component { props, .. }) => {
                let child = old.instance.borrow_mut().take();
                if let Some(child) = &child {
                    child.update_from_parent(props);
                    let root = child.root_elm().or(elm);
                    old.elm.set(root);
                    new.elm.set(root);
                }
                *new.instance.borrow_mut() = child;
            }
            (
                VNodeKind::Element { content: old_content, .. },
                VNodeKind::Element { content: new_content, .. },
            ) => {
                let Some(elm) = elm else { return };
                let env = self.env();
                for module in self.modules.iter() {
                    module.update(&env, old, new);
                }
                self.patch_content(elm, old_content, new_content, inserted);
            }
            (VNodeKind::Text(a), VNodeKind::Text(b))
            | (VNodeKind::Comment(a), VNodeKind::Comment(b)) => {
                if a != b {
                    if let Some(elm) = elm {
                        self.backend.set_text_content(elm, b);
                    }
                }
            }
            _ => {}
        }
    }

    fn patch_content(
        &self,
        elm: NodeId,
        old: &Content,
        new: &Content,
        inserted: &mut Vec<Component>,
    ) {
        match (old, new) {
            (Content::Children(a), Content::Children(b)) => {
                if !(a.is_empty() && b.is_empty()) {
                    self.update_children(elm, a, b, inserted);
                }
            }
            (Content::Children(a), Content::Text(text)) => {
                for child in a {
                    self.invoke_destroy_hook(child);
                }
                if !(a.is_empty() && text.is_empty()) {
                    self.backend.set_text_content(elm, text);
                }
            }
            (Content::Children(a), Content::Html(html)) => {
                for child in a {
                    self.invoke_destroy_hook(child);
                }
                self.backend.set_inner_html(elm, html);
            }
            (Content::Text(a), Content::Text(b)) => {
                if a != b {
                    self.backend.set_text_content(elm, b);
                }
            }
            (Content::Html(a), Content::Html(b)) => {
                if a != b {
                    self.backend.set_inner_html(elm, b);
                }
            }
            (Content::Text(old_text), Content::Children(b)) => {
                if !old_text.is_empty() {
                    self.backend.set_text_content(elm, "");
                }
                if !b.is_empty() {
                    self.add_vnodes(elm, None, b, 0, b.len() - 1, inserted);
                }
            }
            (Content::Html(_), Content::Children(b)) => {
                self.backend.set_text_content(elm, "");
                if !b.is_empty() {
                    self.add_vnodes(elm, None, b, 0, b.len() - 1, inserted);
                }
            }
            (Content::Text(_), Content::Html(html)) => self.backend.set_inner_html(elm, html),
            (Content::Html(_), Content::Text(text)) => self.backend.set_text_content(elm, text),
        }
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Remove `vnodes[start..=end]` from the output, skipping entries marked
    /// in `taken`.
    pub(crate) fn remove_vnodes(
        &self,
        vnodes: &[VNode],
        start: usize,
        end: usize,
        taken: Option<&[bool]>,
    ) {
        for (i, vnode) in vnodes.iter().enumerate().take(end + 1).skip(start) {
            if taken.is_some_and(|t| t[i]) {
                continue;
            }
            if let Some(elm) = vnode.elm() {
                if let Some(parent) = self.backend.parent_node(elm) {
                    self.backend.remove_child(parent, elm);
                }
            }
            self.invoke_destroy_hook(vnode);
        }
    }

    /// Tear down component instances and module state under `vnode`.
    pub(crate) fn invoke_destroy_hook(&self, vnode: &VNode) {
        match &vnode.kind {
            VNodeKind::Component { .. } => {
                let child = vnode.instance.borrow().clone();
                if let Some(child) = child {
                    child.destroy();
                }
            }
            VNodeKind::Element { .. } => {
                let env = self.env();
                for module in self.modules.iter() {
                    module.destroy(&env, vnode);
                }
                for child in vnode.child_nodes() {
                    self.invoke_destroy_hook(child);
                }
            }
            _ => {}
        }
    }
}

/// Move the realized state of a static subtree onto its new description.
fn adopt(old: &VNode, new: &VNode) {
    new.elm.set(old.elm.get());
    *new.instance.borrow_mut() = old.instance.borrow_mut().take();
    *new.invokers.borrow_mut() = std::mem::take(&mut *old.invokers.borrow_mut());
    for (o, n) in old.child_nodes().iter().zip(new.child_nodes()) {
        adopt(o, n);
    }
}

pub(crate) fn check_duplicate_keys(children: &[VNode]) {
    let mut seen = HashSet::new();
    for child in children {
        if let Some(key) = &child.key {
            if !seen.insert(key) {
                warn(format_args!(
                    "Duplicate keys detected: '{key}'. This may cause an update error."
                ));
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{MemoryBackend, Op};

    fn setup() -> (Rc<MemoryBackend>, Patcher, NodeId) {
        let backend = Rc::new(MemoryBackend::new());
        let root = backend.create_root();
        let patcher = Patcher::new(backend.clone());
        (backend, patcher, root)
    }

    fn list(items: &[&str]) -> VNode {
        VNode::element("ul").children(
            items
                .iter()
                .map(|s| VNode::element("li").key(*s).text_content(*s)),
        )
    }

    #[test]
    fn test_initial_patch_builds_output() {
        let (backend, patcher, root) = setup();
        let tree = VNode::element("div")
            .attr("id", "app")
            .child(VNode::text("hello"))
            .child(VNode::comment("c"));
        let patched = patcher.patch(None, Some(&tree), Some(root));
        assert_eq!(patched.root, tree.elm());
        assert_eq!(
            backend.inner_html(root),
            r#"<div id="app">hello<!--c--></div>"#
        );
    }

    #[test]
    fn test_identical_tree_patches_nothing() {
        let (backend, patcher, root) = setup();
        let old = list(&["a", "b"]).class("x").on("click", |_| Ok(()));
        patcher.patch(None, Some(&old), Some(root));
        backend.clear_ops();

        let new = list(&["a", "b"]).class("x").on("click", |_| Ok(()));
        patcher.patch(Some(&old), Some(&new), Some(root));
        assert!(backend.ops().is_empty(), "unexpected ops: {:?}", backend.ops());
        assert_eq!(new.elm(), old.elm());
    }

    #[test]
    fn test_root_replacement_keeps_position() {
        let (backend, patcher, root) = setup();
        let before = backend.create_element("header");
        backend.insert_before(root, before, None);
        let old = VNode::element("p").text_content("old");
        patcher.patch(None, Some(&old), Some(root));
        let after = backend.create_element("footer");
        backend.insert_before(root, after, None);

        let new = VNode::element("section").text_content("new");
        patcher.patch(Some(&old), Some(&new), Some(root));
        assert_eq!(
            backend.inner_html(root),
            "<header></header><section>new</section><footer></footer>"
        );
    }

    #[test]
    fn test_text_and_children_transitions() {
        let (backend, patcher, root) = setup();
        let a = VNode::element("div").text_content("plain");
        patcher.patch(None, Some(&a), Some(root));

        let b = VNode::element("div").children([VNode::element("b").text_content("bold")]);
        patcher.patch(Some(&a), Some(&b), Some(root));
        assert_eq!(backend.inner_html(root), "<div><b>bold</b></div>");

        let c = VNode::element("div").text_content("again");
        patcher.patch(Some(&b), Some(&c), Some(root));
        assert_eq!(backend.inner_html(root), "<div>again</div>");

        let d = VNode::element("div").html("<i>raw</i>");
        patcher.patch(Some(&c), Some(&d), Some(root));
        assert_eq!(backend.inner_html(root), "<div><i>raw</i></div>");
    }

    #[test]
    fn test_static_subtree_reused() {
        let (backend, patcher, root) = setup();
        let old = VNode::element("div").child(
            VNode::element("p")
                .key("s")
                .static_tree()
                .text_content("fixed"),
        );
        patcher.patch(None, Some(&old), Some(root));
        backend.clear_ops();

        let new = VNode::element("div").child(
            VNode::element("p")
                .key("s")
                .static_tree()
                .text_content("changed but static"),
        );
        patcher.patch(Some(&old), Some(&new), Some(root));
        assert!(backend.ops().is_empty());
        assert_eq!(new.child_nodes()[0].elm(), old.child_nodes()[0].elm());
    }

    #[test]
    fn test_listener_removed_with_node() {
        let (backend, patcher, root) = setup();
        let old = VNode::element("div").child(VNode::element("button").key(1).on("click", |_| Ok(())));
        patcher.patch(None, Some(&old), Some(root));
        let button = old.child_nodes()[0].elm().unwrap();
        let new = VNode::element("div");
        patcher.patch(Some(&old), Some(&new), Some(root));
        assert!(!backend.has_listener(button, "click"));
        assert_eq!(backend.count_ops(Op::is_remove), 1);
    }
}
