//! Backend driver seam
//!
//! Every storage-facing command bottoms out in a [`Driver`]. The in-memory
//! reference driver lives in [`crate::mem`]; a process linked against a real
//! hierarchical database supplies its own implementation of the same trait.
//!
//! Key paths arrive as raw byte slices in wire order. Drivers order siblings
//! by plain byte-lexicographic comparison; collation is the backend's
//! business, not this crate's.

use crate::error::Result;
use crate::session::{Handle, OpenProfile};
use std::time::Duration;

/// Traversal direction for order and query operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Ascending key order
    Forward,
    /// Descending key order
    Backward,
}

/// Presence probe result, the classic `$data` encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// No value, no descendants
    None = 0,
    /// Value, no descendants
    Value = 1,
    /// Descendants, no value
    Descendants = 10,
    /// Both value and descendants
    ValueAndDescendants = 11,
}

impl NodeStatus {
    /// The numeric code callers see
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Result of a function or method call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallValue {
    /// Plain byte result
    Bytes(Vec<u8>),
    /// Reference to a server-side object instance
    Oref(u32),
}

/// One step of a depth-first node traversal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStep {
    /// Full subscript path of the node
    pub keys: Vec<Vec<u8>>,
    /// Value stored at the node
    pub value: Vec<u8>,
}

/// Storage backend behind the dispatcher
///
/// Implementations are shared across dispatch threads, so every method
/// takes `&self` and synchronizes internally. The `handle` parameter is the
/// owning session; drivers use it to scope locks, transactions, and object
/// instances, and to release all three on `disconnect`.
pub trait Driver: Send + Sync {
    /// Version banner reported by `open`
    fn version(&self) -> String;

    /// Backend side of `open`
    fn connect(&self, handle: Handle, profile: &OpenProfile) -> Result<()>;

    /// Backend side of `close`: release locks, roll back open transaction
    /// levels, drop object instances
    fn disconnect(&self, handle: Handle) -> Result<()>;

    /// Store a value at a node
    fn set(
        &self,
        handle: Handle,
        namespace: &str,
        global: &[u8],
        keys: &[&[u8]],
        value: &[u8],
    ) -> Result<()>;

    /// Fetch the value at a node, `None` when undefined
    fn get(
        &self,
        handle: Handle,
        namespace: &str,
        global: &[u8],
        keys: &[&[u8]],
    ) -> Result<Option<Vec<u8>>>;

    /// Delete a node and its entire subtree
    fn delete(&self, handle: Handle, namespace: &str, global: &[u8], keys: &[&[u8]])
        -> Result<()>;

    /// Probe a node for value and descendants
    fn defined(
        &self,
        handle: Handle,
        namespace: &str,
        global: &[u8],
        keys: &[&[u8]],
    ) -> Result<NodeStatus>;

    /// Add a numeric delta to a node, returning the new stored value
    ///
    /// A non-numeric stored value contributes its leading numeric prefix,
    /// or zero when it has none.
    fn increment(
        &self,
        handle: Handle,
        namespace: &str,
        global: &[u8],
        keys: &[&[u8]],
        delta: &[u8],
    ) -> Result<Vec<u8>>;

    /// Copy a subtree over another, leaving unrelated target nodes alone
    fn merge(
        &self,
        handle: Handle,
        namespace: &str,
        to_global: &[u8],
        to_keys: &[&[u8]],
        from_global: &[u8],
        from_keys: &[&[u8]],
    ) -> Result<()>;

    /// Next or previous sibling key at one level, `None` when exhausted
    ///
    /// The last entry of `keys` is the seed; an empty seed starts from the
    /// edge of the level.
    fn order(
        &self,
        handle: Handle,
        namespace: &str,
        global: &[u8],
        keys: &[&[u8]],
        direction: Direction,
    ) -> Result<Option<Vec<u8>>>;

    /// Depth-first next or previous node holding data, `None` when exhausted
    fn node_order(
        &self,
        handle: Handle,
        namespace: &str,
        global: &[u8],
        keys: &[&[u8]],
        direction: Direction,
    ) -> Result<Option<NodeStep>>;

    /// Next or previous global name in the directory, `None` when exhausted
    fn name_order(
        &self,
        handle: Handle,
        namespace: &str,
        global: &[u8],
        direction: Direction,
    ) -> Result<Option<Vec<u8>>>;

    /// Acquire a lock on a node path; `false` on timeout
    ///
    /// Locks nest per owner: a session re-acquiring its own lock increments
    /// a count that `unlock` decrements.
    fn lock(
        &self,
        handle: Handle,
        namespace: &str,
        global: &[u8],
        keys: &[&[u8]],
        timeout: Duration,
    ) -> Result<bool>;

    /// Release one nesting level of a lock held by this session
    ///
    /// `false` when the session did not hold the lock; that is not a fault.
    fn unlock(
        &self,
        handle: Handle,
        namespace: &str,
        global: &[u8],
        keys: &[&[u8]],
    ) -> Result<bool>;

    /// Open one transaction level for this session
    fn tx_start(&self, handle: Handle) -> Result<()>;

    /// Commit the innermost transaction level
    fn tx_commit(&self, handle: Handle) -> Result<()>;

    /// Roll back the innermost transaction level, undoing its writes
    fn tx_rollback(&self, handle: Handle) -> Result<()>;

    /// Call an extrinsic function
    fn function(
        &self,
        handle: Handle,
        namespace: &str,
        name: &[u8],
        args: &[&[u8]],
    ) -> Result<CallValue>;

    /// Call a class method, possibly constructing an instance
    fn classmethod(
        &self,
        handle: Handle,
        namespace: &str,
        class: &[u8],
        method: &[u8],
        args: &[&[u8]],
    ) -> Result<CallValue>;

    /// Read a property of an open instance
    fn get_property(&self, handle: Handle, oref: u32, name: &[u8]) -> Result<Vec<u8>>;

    /// Write a property of an open instance
    fn set_property(&self, handle: Handle, oref: u32, name: &[u8], value: &[u8]) -> Result<()>;

    /// Invoke a method on an open instance
    fn method(
        &self,
        handle: Handle,
        oref: u32,
        name: &[u8],
        args: &[&[u8]],
    ) -> Result<CallValue>;

    /// Release an open instance
    fn close_instance(&self, handle: Handle, oref: u32) -> Result<()>;
}
