//! Lifecycle hooks and keep-alive style activation.

use std::fmt;

use super::Component;
use crate::error::invoke_with_error_handling;
use crate::reactive::untracked;

/// Lifecycle hook names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Hook {
    BeforeCreate,
    Created,
    BeforeMount,
    Mounted,
    BeforeUpdate,
    Updated,
    BeforeDestroy,
    Destroyed,
    Activated,
    Deactivated,
}

impl Hook {
    pub const ALL: [Hook; 10] = [
        Hook::BeforeCreate,
        Hook::Created,
        Hook::BeforeMount,
        Hook::Mounted,
        Hook::BeforeUpdate,
        Hook::Updated,
        Hook::BeforeDestroy,
        Hook::Destroyed,
        Hook::Activated,
        Hook::Deactivated,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Hook::BeforeCreate => "beforeCreate",
            Hook::Created => "created",
            Hook::BeforeMount => "beforeMount",
            Hook::Mounted => "mounted",
            Hook::BeforeUpdate => "beforeUpdate",
            Hook::Updated => "updated",
            Hook::BeforeDestroy => "beforeDestroy",
            Hook::Destroyed => "destroyed",
            Hook::Activated => "activated",
            Hook::Deactivated => "deactivated",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Run every handler registered for `hook` on `vm`, untracked. A failing
/// handler is routed and does not stop the others.
pub fn call_hook(vm: &Component, hook: Hook) {
    let handlers = vm
        .def()
        .options()
        .hooks
        .get(&hook)
        .cloned()
        .unwrap_or_default();
    if handlers.is_empty() {
        return;
    }
    tracing::trace!(component = %vm.name(), id = %vm.id(), hook = hook.name(), "hook");
    let info = format!("{hook} hook");
    untracked(|| {
        for handler in handlers {
            invoke_with_error_handling(|| handler(vm), Some(vm.scope()), &info);
        }
    });
}

// =============================================================================
// Activation
// =============================================================================

fn is_in_inactive_tree(vm: &Component) -> bool {
    let mut current = vm.parent();
    while let Some(parent) = current {
        if parent.inactive() == Some(true) {
            return true;
        }
        current = parent.parent();
    }
    false
}

/// Re-activate `vm` and its subtree, calling `activated` hooks child-first.
///
/// `direct` marks the component the request was made on; descendants
/// deactivated directly stay inactive.
pub fn activate_child_component(vm: &Component, direct: bool) {
    if direct {
        vm.set_direct_inactive(false);
        if is_in_inactive_tree(vm) {
            return;
        }
    } else if vm.direct_inactive() {
        return;
    }
    if vm.inactive() != Some(false) {
        vm.set_inactive(Some(false));
        for child in vm.children() {
            activate_child_component(&child, false);
        }
        call_hook(vm, Hook::Activated);
    }
}

/// Deactivate `vm` and its subtree, calling `deactivated` hooks child-first.
pub fn deactivate_child_component(vm: &Component, direct: bool) {
    if direct {
        vm.set_direct_inactive(true);
        if is_in_inactive_tree(vm) {
            return;
        }
    }
    if vm.inactive() != Some(true) {
        vm.set_inactive(Some(true));
        for child in vm.children() {
            deactivate_child_component(&child, false);
        }
        call_hook(vm, Hook::Deactivated);
    }
}
