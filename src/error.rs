//! Error handling.
//!
//! User code (render functions, getters, watch callbacks, lifecycle hooks,
//! event listeners) reports failure by returning `Err(ViewError)`. The runtime
//! never lets such an error unwind past the call site: it is routed through
//! [`handle_error`], which gives every ancestor component's error-captured
//! hooks a chance to stop it, then hands it to the process-wide handler
//! configured in [`config`](crate::config), and finally to `tracing`.

use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::config;
use crate::reactive::untracked;
use crate::types::{ComponentId, WatcherId};

/// Crate result alias.
pub type Result<T> = std::result::Result<T, ViewError>;

/// Errors produced by user code or detected by the runtime.
#[derive(Debug, Error)]
pub enum ViewError {
    /// Error raised by user code with a plain message.
    #[error("{0}")]
    Message(String),

    /// A watcher kept re-triggering itself within one flush.
    #[error("infinite update loop in watcher {id} ({expression})")]
    InfiniteUpdate { id: WatcherId, expression: String },

    /// Any other error, boxed.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + 'static>),
}

impl ViewError {
    /// Shorthand for [`ViewError::Message`].
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

// =============================================================================
// Error Scopes
// =============================================================================

/// What an error-captured hook wants done with the error it saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    /// Keep walking up to the next ancestor, then the global handler.
    Continue,
    /// Swallow the error here.
    Stop,
}

/// Error-captured hook: `(error, originating scope, info)`.
pub type ErrorCapturedHook =
    Rc<dyn Fn(&ViewError, &dyn ErrorScope, &str) -> Result<Propagation>>;

/// A node in the ownership chain errors propagate through.
///
/// Component instances implement this; watchers and listeners remember the
/// scope they belong to so their failures can be routed.
pub trait ErrorScope {
    /// Identity of the scope, for diagnostics.
    fn scope_id(&self) -> ComponentId;

    /// Human-readable name, for diagnostics.
    fn scope_name(&self) -> String;

    /// The enclosing scope, if any.
    fn parent_scope(&self) -> Option<Rc<dyn ErrorScope>>;

    /// Error-captured hooks registered on this scope, in call order.
    fn error_captured_hooks(&self) -> Vec<ErrorCapturedHook>;
}

impl fmt::Debug for dyn ErrorScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} {}>", self.scope_name(), self.scope_id())
    }
}

// =============================================================================
// Routing
// =============================================================================

/// Route an error raised by user code.
///
/// Walks the ancestors of `scope` (not `scope` itself) calling their
/// error-captured hooks in order. A hook returning [`Propagation::Stop`] ends
/// the walk. A hook that fails has its own error sent to the global handler
/// and the walk continues. If nothing stops it, the error reaches the global
/// handler.
pub fn handle_error(err: ViewError, scope: Option<&dyn ErrorScope>, info: &str) {
    // Handlers may read reactive state; that must not subscribe whatever
    // watcher happens to be evaluating.
    untracked(|| route_error(err, scope, info));
}

fn route_error(err: ViewError, scope: Option<&dyn ErrorScope>, info: &str) {
    if let Some(origin) = scope {
        let mut current = origin.parent_scope();
        while let Some(ancestor) = current {
            for hook in ancestor.error_captured_hooks() {
                match hook(&err, origin, info) {
                    Ok(Propagation::Stop) => return,
                    Ok(Propagation::Continue) => {}
                    Err(hook_err) => {
                        global_handle_error(hook_err, Some(&*ancestor), "errorCaptured hook");
                    }
                }
            }
            current = ancestor.parent_scope();
        }
    }
    global_handle_error(err, scope, info);
}

/// Run a user callback, routing its error instead of returning it.
///
/// Returns `None` when the callback failed.
pub fn invoke_with_error_handling<T>(
    f: impl FnOnce() -> Result<T>,
    scope: Option<&dyn ErrorScope>,
    info: &str,
) -> Option<T> {
    match f() {
        Ok(value) => Some(value),
        Err(err) => {
            handle_error(err, scope, info);
            None
        }
    }
}

fn global_handle_error(err: ViewError, scope: Option<&dyn ErrorScope>, info: &str) {
    if let Some(handler) = config::error_handler() {
        match handler(&err, scope, info) {
            Ok(()) => return,
            Err(handler_err) => log_error(&handler_err, None, "config.errorHandler"),
        }
    }
    log_error(&err, scope, info);
}

fn log_error(err: &ViewError, scope: Option<&dyn ErrorScope>, info: &str) {
    match scope {
        Some(scope) => tracing::error!(
            component = %scope.scope_name(),
            id = %scope.scope_id(),
            "error in {info}: {err}"
        ),
        None => tracing::error!("error in {info}: {err}"),
    }
}

/// Emit a runtime warning unless warnings are silenced.
pub(crate) fn warn(message: impl fmt::Display) {
    if !config::silent() {
        tracing::warn!("{message}");
    }
}

// =============================================================================
// Tests
// =============================================================================
