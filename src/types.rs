//! Core types for spark-view.
//!
//! Identity newtypes shared by every layer, plus the sibling [`Key`] used by
//! the keyed child diff. Everything that needs a stable identity gets a
//! monotonically assigned integer rather than a pointer, so identities can be
//! logged, sorted and used as map keys.

use std::cell::Cell;
use std::fmt;

// =============================================================================
// Identity Counters
// =============================================================================

thread_local! {
    static NEXT_DEP_ID: Cell<u64> = const { Cell::new(0) };
    static NEXT_WATCHER_ID: Cell<u64> = const { Cell::new(0) };
    static NEXT_COMPONENT_ID: Cell<u64> = const { Cell::new(0) };
    static NEXT_DEF_ID: Cell<u64> = const { Cell::new(1) };
}

fn bump(counter: &'static std::thread::LocalKey<Cell<u64>>) -> u64 {
    counter.with(|c| {
        let id = c.get();
        c.set(id + 1);
        id
    })
}

// =============================================================================
// Ids
// =============================================================================

/// Identity of a dependency set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DepId(pub u64);

impl DepId {
    pub(crate) fn next() -> Self {
        Self(bump(&NEXT_DEP_ID))
    }
}

/// Identity of a reactive computation.
///
/// Ids are handed out in creation order. The scheduler sorts by this id, so a
/// parent's render computation (created first) always flushes before its
/// children's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatcherId(pub u64);

impl WatcherId {
    pub(crate) fn next() -> Self {
        // Start at 1 so that 0 never names a live watcher.
        Self(bump(&NEXT_WATCHER_ID) + 1)
    }
}

impl fmt::Display for WatcherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub u64);

impl ComponentId {
    pub(crate) fn next() -> Self {
        Self(bump(&NEXT_COMPONENT_ID))
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Identity of a component descriptor. Used as the option-merge cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefId(pub u64);

impl DefId {
    pub(crate) fn next() -> Self {
        Self(bump(&NEXT_DEF_ID))
    }
}

/// Handle to a realized output node.
///
/// Output nodes are owned by the [`Backend`](crate::renderer::Backend); the
/// core only ever holds these indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

// =============================================================================
// Key
// =============================================================================

/// User-supplied stable identity of a virtual node among its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        Self::Int(value as i64)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s:?}"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
