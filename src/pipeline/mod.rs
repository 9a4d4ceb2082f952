//! Application pipeline
//!
//! Connects a root component to an output backend and drives it.
//!
//! # Pipeline Architecture
//!
//! ```text
//! state write → Dep::notify → scheduler queue → tick → flush
//!     → render watcher → render() → Patcher::patch → Backend
//! ```
//!
//! ## Data Flow
//!
//! 1. **mount** - creates the root instance and renders it into the container
//! 2. **tick** - drains deferred callbacks, which include scheduler flushes
//! 3. **unmount** - destroys the tree and detaches its output

pub mod mount;

pub use mount::{mount, run, tick, unmount, MountHandle};
