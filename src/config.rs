//! Runtime configuration.
//!
//! A single thread-local [`Config`] record holds the knobs the runtime reads
//! while it works: warning suppression, the flush policy, the cycle bound and
//! the process-wide error hook. The runtime is single-threaded, so each thread
//! that hosts components carries its own configuration.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{ErrorScope, ViewError};

/// Process-wide error hook.
///
/// Receives the error, the component it originated in (if any) and a short
/// description of where it happened (`"render"`, `"mounted hook"`, ...).
/// Returning an error makes the runtime log both errors.
pub type ErrorHandler = Rc<dyn Fn(&ViewError, Option<&dyn ErrorScope>, &str) -> Result<(), ViewError>>;

/// Default bound on how often one watcher may re-run within a single flush.
pub const DEFAULT_MAX_UPDATE_COUNT: usize = 100;

/// Runtime configuration.
#[derive(Clone)]
pub struct Config {
    /// Suppress warnings. Errors are always reported.
    pub silent: bool,
    /// Defer flushes to the next tick. When false, queued watchers run
    /// synchronously at queue time.
    pub async_flush: bool,
    /// Re-run bound per watcher per flush before a cycle is reported.
    pub max_update_count: usize,
    /// Custom error hook. `None` logs through `tracing`.
    pub error_handler: Option<ErrorHandler>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            silent: false,
            async_flush: true,
            max_update_count: DEFAULT_MAX_UPDATE_COUNT,
            error_handler: None,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("silent", &self.silent)
            .field("async_flush", &self.async_flush)
            .field("max_update_count", &self.max_update_count)
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}

thread_local! {
    static CONFIG: RefCell<Config> = RefCell::new(Config::default());
}

// =============================================================================
// Accessors
// =============================================================================

/// Whether warnings are suppressed.
pub fn silent() -> bool {
    CONFIG.with(|c| c.borrow().silent)
}

/// Suppress or re-enable warnings.
pub fn set_silent(silent: bool) {
    CONFIG.with(|c| c.borrow_mut().silent = silent);
}

/// Whether flushes are deferred to the next tick.
pub fn async_flush() -> bool {
    CONFIG.with(|c| c.borrow().async_flush)
}

/// Switch between deferred and synchronous flushing.
pub fn set_async_flush(enabled: bool) {
    CONFIG.with(|c| c.borrow_mut().async_flush = enabled);
}

/// Current cycle bound.
pub fn max_update_count() -> usize {
    CONFIG.with(|c| c.borrow().max_update_count)
}

/// Change the cycle bound.
pub fn set_max_update_count(count: usize) {
    CONFIG.with(|c| c.borrow_mut().max_update_count = count);
}

/// Install the process-wide error hook.
pub fn set_error_handler(
    handler: impl Fn(&ViewError, Option<&dyn ErrorScope>, &str) -> Result<(), ViewError> + 'static,
) {
    CONFIG.with(|c| c.borrow_mut().error_handler = Some(Rc::new(handler)));
}

/// Remove the custom error hook, falling back to logging.
pub fn clear_error_handler() {
    CONFIG.with(|c| c.borrow_mut().error_handler = None);
}

/// Current error hook, cloned out so it can be called without holding the
/// configuration borrow.
pub fn error_handler() -> Option<ErrorHandler> {
    CONFIG.with(|c| c.borrow().error_handler.clone())
}

/// Snapshot of the whole configuration.
pub fn current() -> Config {
    CONFIG.with(|c| c.borrow().clone())
}

/// Restore defaults (for testing).
pub fn reset_config() {
    CONFIG.with(|c| *c.borrow_mut() = Config::default());
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        reset_config();
        let config = current();
        assert!(!config.silent);
        assert!(config.async_flush);
        assert_eq!(config.max_update_count, DEFAULT_MAX_UPDATE_COUNT);
        assert!(config.error_handler.is_none());
    }

    #[test]
    fn test_setters() {
        reset_config();
        set_silent(true);
        set_async_flush(false);
        set_max_update_count(5);
        assert!(silent());
        assert!(!async_flush());
        assert_eq!(max_update_count(), 5);

        set_error_handler(|_, _, _| Ok(()));
        assert!(error_handler().is_some());
        clear_error_handler();
        assert!(error_handler().is_none());

        reset_config();
        assert!(!silent());
    }
}
