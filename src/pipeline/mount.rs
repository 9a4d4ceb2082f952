//! Mount API - application lifecycle.
//!
//! Entry point for putting a root component on an output.
//!
//! # Example
//!
//! ```ignore
//! use spark_view::pipeline::mount;
//!
//! let backend = Rc::new(MemoryBackend::new());
//! let container = backend.create_root();
//! let handle = mount::mount(&app, backend.clone(), container);
//!
//! // Drive pending flushes from your own loop
//! while mount::tick(&handle) {
//!     // Your logic here
//! }
//!
//! // Clean up
//! handle.unmount();
//! ```

use std::cell::Cell;
use std::rc::Rc;

use crate::component::{Component, ComponentDef, ComponentInit};
use crate::renderer::Backend;
use crate::scheduler;
use crate::types::NodeId;

// =============================================================================
// Mount Handle
// =============================================================================

/// Handle returned by [`mount`].
///
/// Dropping the handle unmounts, like calling [`unmount`](Self::unmount).
pub struct MountHandle {
    component: Component,
    backend: Rc<dyn Backend>,
    container: NodeId,
    running: Cell<bool>,
    unmounted: Cell<bool>,
}

impl MountHandle {
    /// The root instance.
    pub fn component(&self) -> &Component {
        &self.component
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    /// Destroy the root instance and remove its output from the container.
    pub fn unmount(self) {
        self.teardown();
    }

    /// Whether the application is still running.
    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Ask the loop driven by [`run`] / [`tick`] to stop. The tree stays
    /// mounted until the handle is unmounted or dropped.
    pub fn stop(&self) {
        self.running.set(false);
    }

    fn teardown(&self) {
        self.running.set(false);
        if self.unmounted.replace(true) {
            return;
        }
        let component = &self.component;
        let root = component.root_elm();
        component.destroy();
        if let Some(root) = root {
            if self.backend.parent_node(root) == Some(self.container) {
                self.backend.remove_child(self.container, root);
            }
        }
        tracing::debug!(id = %component.id(), "unmounted");
    }
}

impl Drop for MountHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}

// =============================================================================
// Mount Function
// =============================================================================

/// Create a root instance of `def`, render it and append its output to
/// `container`.
///
/// `mounted` hooks of the whole tree have run when this returns. Later state
/// changes are applied on the next [`tick`] (or immediately when
/// `async_flush` is off).
pub fn mount(def: &ComponentDef, backend: Rc<dyn Backend>, container: NodeId) -> MountHandle {
    let component = Component::create(def, ComponentInit::root(backend.clone()));
    component.mount(Some(container));
    tracing::debug!(component = %component.name(), id = %component.id(), %container, "mounted");
    MountHandle {
        component,
        backend,
        container,
        running: Cell::new(true),
        unmounted: Cell::new(false),
    }
}

/// Unmount and clean up.
pub fn unmount(handle: MountHandle) {
    handle.unmount();
}

// =============================================================================
// Event Loop
// =============================================================================

/// Run pending ticks once (non-blocking).
///
/// Returns `false` once [`MountHandle::stop`] was called.
pub fn tick(handle: &MountHandle) -> bool {
    if !handle.is_running() {
        return false;
    }
    scheduler::tick();
    handle.is_running()
}

/// Run ticks until nothing is pending or the handle is stopped.
pub fn run(handle: &MountHandle) {
    while tick(handle) && scheduler::has_pending() {}
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentOptions, Hook};
    use crate::config;
    use crate::reactive::Value;
    use crate::renderer::MemoryBackend;
    use crate::scheduler::reset_scheduler;
    use crate::vdom::VNode;
    use std::cell::RefCell;

    fn reset() {
        config::reset_config();
        reset_scheduler();
    }

    fn greeting(log: Rc<RefCell<Vec<&'static str>>>) -> ComponentDef {
        let destroyed = log.clone();
        ComponentOptions::named("greeting")
            .data(|_| Ok([("who", "world")].into_iter().collect()))
            .render(|ctx| {
                Ok(VNode::element("h1")
                    .text_content(format!("hello {}", ctx.get("who")?))
                    .into())
            })
            .hook(Hook::Mounted, move |_| {
                log.borrow_mut().push("mounted");
                Ok(())
            })
            .hook(Hook::Destroyed, move |_| {
                destroyed.borrow_mut().push("destroyed");
                Ok(())
            })
            .build()
    }

    #[test]
    fn test_mount_tick_unmount() {
        reset();
        let log = Rc::new(RefCell::new(Vec::new()));
        let backend = Rc::new(MemoryBackend::new());
        let container = backend.create_root();
        let handle = mount(&greeting(log.clone()), backend.clone(), container);
        assert_eq!(backend.inner_html(container), "<h1>hello world</h1>");
        assert_eq!(*log.borrow(), vec!["mounted"]);

        handle.component().set("who", Value::from("there")).unwrap();
        assert!(tick(&handle));
        assert_eq!(backend.inner_html(container), "<h1>hello there</h1>");

        let vm = handle.component().clone();
        unmount(handle);
        assert!(vm.is_destroyed());
        assert_eq!(backend.inner_html(container), "");
        assert_eq!(*log.borrow(), vec!["mounted", "destroyed"]);
    }

    #[test]
    fn test_drop_unmounts() {
        reset();
        let log = Rc::new(RefCell::new(Vec::new()));
        let backend = Rc::new(MemoryBackend::new());
        let container = backend.create_root();
        {
            let _handle = mount(&greeting(log.clone()), backend.clone(), container);
        }
        assert_eq!(backend.inner_html(container), "");
        assert_eq!(*log.borrow(), vec!["mounted", "destroyed"]);
    }

    #[test]
    fn test_stop_ends_loop() {
        reset();
        let backend = Rc::new(MemoryBackend::new());
        let container = backend.create_root();
        let handle = mount(&greeting(Rc::new(RefCell::new(Vec::new()))), backend, container);
        handle.stop();
        assert!(!tick(&handle));
        run(&handle);
        assert!(handle.component().is_mounted());
    }
}
