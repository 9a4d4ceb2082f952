//! Components: declarative descriptors and their live instances.
//!
//! A [`ComponentDef`] describes state (props, data, computed), behaviour
//! (methods, watches, lifecycle hooks), values shared with descendants
//! (provide/inject) and a render function. Creating an
//! instance from it wires the state into the reactive layer; mounting it runs
//! the render function under a render watcher, so any state the render reads
//! re-renders the component when it changes.
//!
//! # Architecture
//!
//! ```text
//! ComponentDef ──create──► Component ──mount──► render watcher
//!                              │                    │ render(ctx) → VNode
//!                              │                    ▼
//!                              │               Patcher::patch ──► Backend
//!                              │                    │ placeholder nodes
//!                              └──── children ◄─────┘ Component::create
//! ```

pub mod instance;
pub mod lifecycle;
pub mod merge;
pub mod options;
pub mod props;
pub mod render;

pub use instance::{Component, ComponentInit, Unwatch};
pub use lifecycle::{activate_child_component, call_hook, deactivate_child_component, Hook};
pub use merge::merge_options;
pub use options::{
    reset_extend_cache, ComponentDef, ComponentOptions, ComputedDef, ComputedGetter,
    ComputedSetter, DataFn, HookFn, InjectDef, MethodFn, RenderFn, SourceFn, WatchDef, WatchHandler,
    WatchSource,
};
pub use props::{validate_prop, PropDef, PropDefault, PropType};
pub use render::{RenderContext, Roots};
