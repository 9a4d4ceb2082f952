//! Reactive layer.
//!
//! Dependency tracking in the style of property-interception runtimes:
//! containers are made observable in place, reads register the currently
//! evaluating [`Watcher`] with a per-property [`Dep`], and writes notify.
//!
//! # Architecture
//!
//! ```text
//! Value::Object / Value::Array
//!     │ observe()
//!     ▼
//! Observer (per container) ── Dep (structural changes)
//! Property (per key) ──────── Dep (value changes)
//!     │ read while a Watcher is on the target stack
//!     ▼
//! Watcher ── lazy ──► dirty flag (Computed)
//!         ── sync ──► run()
//!         ── else ──► scheduler::queue_watcher()
//! ```

pub mod array;
pub mod computed;
pub mod dep;
pub mod observer;
pub mod traverse;
pub mod value;
pub mod watcher;

pub use computed::{computed, watch, Computed, WatchHandle, WatchOptions};
pub use dep::{current_target, is_tracking, pop_target, push_target, untracked, Dep};
pub use observer::{define_reactive, del, observe, set, should_observe, toggle_observing, Observer};
pub use traverse::traverse;
pub use value::{Accessor, Array, Field, Object, Value};
pub use watcher::{Callback, Getter, WeakWatcher, Watcher, WatcherFlags, WatcherOptions};

/// Restore the observing toggle (for testing).
pub fn reset_reactive() {
    toggle_observing(true);
}
