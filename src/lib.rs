//! # spark-view
//!
//! Reactive component runtime for Rust.
//!
//! State is made observable in place; render functions that read it are
//! re-run when it changes, and their output trees are reconciled against the
//! previous ones so only the differences reach the output backend.
//!
//! ## Architecture
//!
//! The runtime is single-threaded. Global state (the evaluation stack, the
//! scheduler queue, configuration) lives in thread-locals, and every handle
//! is an `Rc`.
//!
//! ```text
//! Object/Array ─reads─► Dep ◄─subscribes─ Watcher ─invalidated─► scheduler
//!      ▲                                     │                       │ tick
//!      └──────────── writes notify ──────────┘        flush ◄────────┘
//!                                                      │
//! Component render ─► VNode tree ─► Patcher ─► Backend (output nodes)
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Identity newtypes and sibling keys
//! - [`reactive`] - Observable values, dependency sets, watchers, computed
//! - [`scheduler`] - Batched, ordered flushing and the tick pump
//! - [`vdom`] - Virtual node trees
//! - [`renderer`] - Output backend trait, patching, keyed child diff
//! - [`component`] - Component descriptors, instances and lifecycle
//! - [`pipeline`] - Mount entry point

pub mod component;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod reactive;
pub mod renderer;
pub mod scheduler;
pub mod types;
pub mod vdom;

// Re-export commonly used items
pub use types::*;

pub use config::{
    async_flush, clear_error_handler, max_update_count, reset_config, set_async_flush,
    set_error_handler, set_max_update_count, set_silent, silent, Config, ErrorHandler,
};

pub use error::{
    handle_error, invoke_with_error_handling, ErrorCapturedHook, ErrorScope, Propagation, Result,
    ViewError,
};

pub use reactive::{
    computed, del, observe, reset_reactive, set, toggle_observing, untracked, watch, Array,
    Computed, Dep, Object, Value, WatchHandle, WatchOptions, Watcher, WatcherFlags,
    WatcherOptions,
};

pub use scheduler::{next_tick, queue_watcher, reset_scheduler, tick};

pub use vdom::{same_vnode, Content, VNode, VNodeData, VNodeFlags, VNodeKind};

pub use renderer::{Backend, MemoryBackend, Module, Op, Patched, Patcher};

pub use component::{
    Component, ComponentDef, ComponentInit, ComponentOptions, Hook, InjectDef, PropDef, PropType,
    RenderContext, Roots, Unwatch,
};

pub use pipeline::{mount, unmount, MountHandle};

/// Reset every piece of thread-local runtime state (for testing).
pub fn reset_runtime() {
    reset_config();
    reset_scheduler();
    reset_reactive();
    component::reset_extend_cache();
}
