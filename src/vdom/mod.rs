//! Virtual node tree.
//!
//! Render functions return [`VNode`] trees; the [renderer](crate::renderer)
//! reconciles consecutive trees against the output through a
//! [`Backend`](crate::renderer::Backend).

pub mod listeners;
pub mod vnode;

pub use listeners::{normalize_event, EventName, Handler, Invoker};
pub use vnode::{same_vnode, Content, VNode, VNodeData, VNodeFlags, VNodeKind};
