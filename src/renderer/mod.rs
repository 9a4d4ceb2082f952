//! Renderer - reconciling virtual trees against an output.
//!
//! The core never touches output nodes directly. Everything goes through a
//! [`Backend`]: node creation, structural moves, text, and the per-aspect
//! updates (attributes, class, style, listeners) issued by the
//! [modules](modules).
//!
//! # Architecture
//!
//! ```text
//! old VNode ─┐
//!            ├─► Patcher::patch ──► create / patch_vnode / remove
//! new VNode ─┘                          │
//!                                       ├─► diff::update_children (keyed)
//!                                       ├─► Module::update (per aspect)
//!                                       └─► Backend (output mutations)
//! ```
//!
//! [`MemoryBackend`] is an in-memory output tree that records every call it
//! receives; it backs the test-suite and the demos.

pub mod diff;
pub mod memory;
pub mod modules;
pub mod patch;

use crate::types::NodeId;
use crate::vdom::{EventName, Invoker};

pub use memory::{MemoryBackend, Op};
pub use modules::{default_modules, AttrsModule, ClassModule, EventsModule, Module, ModuleEnv, StyleModule};
pub use patch::{Patched, Patcher};

/// Output primitives the patcher is written against.
///
/// Methods take `&self`: a patch can recurse into child component mounts
/// which patch through the same backend, so implementations keep their state
/// behind interior mutability.
pub trait Backend {
    fn create_element(&self, tag: &str) -> NodeId;
    fn create_text(&self, text: &str) -> NodeId;
    fn create_comment(&self, text: &str) -> NodeId;

    /// Insert `node` into `parent` before `reference`, or append when
    /// `reference` is `None`. A node that already has a parent is moved.
    fn insert_before(&self, parent: NodeId, node: NodeId, reference: Option<NodeId>);
    fn remove_child(&self, parent: NodeId, node: NodeId);
    fn parent_node(&self, node: NodeId) -> Option<NodeId>;
    fn next_sibling(&self, node: NodeId) -> Option<NodeId>;

    /// Replace a node's contents (or a text node's text).
    fn set_text_content(&self, node: NodeId, text: &str);
    fn set_inner_html(&self, node: NodeId, html: &str);

    fn set_attribute(&self, node: NodeId, name: &str, value: &str);
    fn remove_attribute(&self, node: NodeId, name: &str);
    fn set_class(&self, node: NodeId, class: &str);
    fn set_style(&self, node: NodeId, property: &str, value: &str);
    fn remove_style(&self, node: NodeId, property: &str);
    fn add_listener(&self, node: NodeId, event: &EventName, invoker: Invoker);
    fn remove_listener(&self, node: NodeId, event: &EventName);
}
