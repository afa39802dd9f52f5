//! Namespaced global trees with per-session undo journals
//!
//! Each global is a flat `BTreeMap` from full subscript path to value.
//! Element-wise lexicographic ordering of paths puts every node directly
//! before its descendants, so one range scan walks a subtree depth first
//! and sibling traversal reduces to range bounds.

use crate::driver::{Direction, NodeStatus, NodeStep};
use crate::error::{DbxError, Result};
use crate::session::Handle;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Full subscript path of one node, in wire order
pub type KeyPath = Vec<Vec<u8>>;

/// All data-holding nodes of one global
type GlobalTree = BTreeMap<KeyPath, Vec<u8>>;

/// One namespace: its globals by name
#[derive(Debug, Default)]
struct NamespaceTree {
    globals: BTreeMap<Vec<u8>, GlobalTree>,
}

/// Prior state of one node, recorded before a mutation
#[derive(Debug)]
struct UndoRecord {
    namespace: String,
    global: Vec<u8>,
    keys: KeyPath,
    prior: Option<Vec<u8>>,
}

/// Undo records of one transaction level, in mutation order
type Journal = Vec<UndoRecord>;

/// The whole in-memory database
#[derive(Debug, Default)]
pub struct Store {
    namespaces: FxHashMap<String, NamespaceTree>,
    journals: FxHashMap<Handle, Vec<Journal>>,
}

fn owned_path(keys: &[&[u8]]) -> KeyPath {
    keys.iter().map(|k| k.to_vec()).collect()
}

/// Upper bound of the subtree rooted at `path`
///
/// Appending a zero byte to the last subscript yields the smallest path
/// sorting after every descendant of `path`.
fn subtree_end(path: &[Vec<u8>]) -> Bound<KeyPath> {
    match path.split_last() {
        None => Bound::Unbounded,
        Some((last, level)) => {
            let mut succ = last.clone();
            succ.push(0);
            let mut end: KeyPath = level.to_vec();
            end.push(succ);
            Bound::Excluded(end)
        }
    }
}

/// Split a wire key path into its level and trailing seed subscript
fn split_seed<'a>(keys: &'a [&'a [u8]]) -> (KeyPath, &'a [u8]) {
    match keys.split_last() {
        Some((seed, level)) => (owned_path(level), seed),
        None => (Vec::new(), &[]),
    }
}

/// Child subscript of `path` directly under `level`, when `path` is inside
/// that level's subtree
fn child_of(level: &[Vec<u8>], path: &KeyPath) -> Option<Vec<u8>> {
    if path.len() > level.len() && path[..level.len()] == level[..] {
        Some(path[level.len()].clone())
    } else {
        None
    }
}

/// Longest numeric prefix of a value, zero when there is none
pub fn numeric_prefix(bytes: &[u8]) -> f64 {
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'-' | b'+' if i == 0 => {}
            b'.' if !seen_dot => seen_dot = true,
            b'0'..=b'9' => seen_digit = true,
            _ => break,
        }
        end = i + 1;
    }
    if !seen_digit {
        return 0.0;
    }
    std::str::from_utf8(&bytes[..end])
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0)
}

/// Canonical decimal form: integers without a fraction part
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

impl Store {
    /// Empty store
    pub fn new() -> Self {
        Store::default()
    }

    /// Create the namespace if absent
    pub fn ensure_namespace(&mut self, namespace: &str) {
        self.namespaces.entry(namespace.to_string()).or_default();
    }

    fn tree(&self, namespace: &str, global: &[u8]) -> Option<&GlobalTree> {
        self.namespaces.get(namespace)?.globals.get(global)
    }

    fn journaling(&self, handle: Handle) -> bool {
        self.journals
            .get(&handle)
            .map_or(false, |stack| !stack.is_empty())
    }

    fn journal(
        &mut self,
        handle: Handle,
        namespace: &str,
        global: &[u8],
        keys: KeyPath,
        prior: Option<Vec<u8>>,
    ) {
        if let Some(top) = self
            .journals
            .get_mut(&handle)
            .and_then(|stack| stack.last_mut())
        {
            top.push(UndoRecord {
                namespace: namespace.to_string(),
                global: global.to_vec(),
                keys,
                prior,
            });
        }
    }

    fn set_path(
        &mut self,
        handle: Handle,
        namespace: &str,
        global: &[u8],
        keys: KeyPath,
        value: Vec<u8>,
    ) {
        let recorded = if self.journaling(handle) {
            Some(keys.clone())
        } else {
            None
        };
        let prior = self
            .namespaces
            .entry(namespace.to_string())
            .or_default()
            .globals
            .entry(global.to_vec())
            .or_default()
            .insert(keys, value);
        if let Some(keys) = recorded {
            self.journal(handle, namespace, global, keys, prior);
        }
    }

    /// Set a node, journaling the prior state into any open transaction
    pub fn set(
        &mut self,
        handle: Handle,
        namespace: &str,
        global: &[u8],
        keys: &[&[u8]],
        value: &[u8],
    ) {
        self.set_path(handle, namespace, global, owned_path(keys), value.to_vec());
    }

    /// Read a node's value; `None` when it holds no data
    pub fn get(&self, namespace: &str, global: &[u8], keys: &[&[u8]]) -> Option<Vec<u8>> {
        self.tree(namespace, global)?.get(&owned_path(keys)).cloned()
    }

    /// Remove a node and its whole subtree
    pub fn delete(&mut self, handle: Handle, namespace: &str, global: &[u8], keys: &[&[u8]]) {
        let path = owned_path(keys);
        let end = subtree_end(&path);
        let mut removed: Vec<(KeyPath, Vec<u8>)> = Vec::new();
        let mut emptied = false;
        if let Some(tree) = self
            .namespaces
            .get_mut(namespace)
            .and_then(|space| space.globals.get_mut(global))
        {
            let doomed: Vec<KeyPath> = tree
                .range((Bound::Included(path), end))
                .map(|(k, _)| k.clone())
                .collect();
            for key in doomed {
                if let Some(value) = tree.remove(&key) {
                    removed.push((key, value));
                }
            }
            emptied = tree.is_empty();
        }
        for (keys, value) in removed {
            self.journal(handle, namespace, global, keys, Some(value));
        }
        if emptied {
            if let Some(space) = self.namespaces.get_mut(namespace) {
                space.globals.remove(global);
            }
        }
    }

    /// Classic `$data` probe
    pub fn defined(&self, namespace: &str, global: &[u8], keys: &[&[u8]]) -> NodeStatus {
        let Some(tree) = self.tree(namespace, global) else {
            return NodeStatus::None;
        };
        let path = owned_path(keys);
        let has_value = tree.contains_key(&path);
        let end = subtree_end(&path);
        let has_descendants = tree
            .range((Bound::Excluded(path), end))
            .next()
            .is_some();
        match (has_value, has_descendants) {
            (false, false) => NodeStatus::None,
            (true, false) => NodeStatus::Value,
            (false, true) => NodeStatus::Descendants,
            (true, true) => NodeStatus::ValueAndDescendants,
        }
    }

    /// Add a numeric delta to a node and return the stored result
    pub fn increment(
        &mut self,
        handle: Handle,
        namespace: &str,
        global: &[u8],
        keys: &[&[u8]],
        delta: &[u8],
    ) -> Vec<u8> {
        let path = owned_path(keys);
        let current = self
            .tree(namespace, global)
            .and_then(|tree| tree.get(&path))
            .map(|v| numeric_prefix(v))
            .unwrap_or(0.0);
        let next = format_number(current + numeric_prefix(delta)).into_bytes();
        self.set_path(handle, namespace, global, path, next.clone());
        next
    }

    /// Overlay the source subtree onto the target path
    ///
    /// Target nodes without a source counterpart are left alone.
    pub fn merge(
        &mut self,
        handle: Handle,
        namespace: &str,
        to_global: &[u8],
        to_keys: &[&[u8]],
        from_global: &[u8],
        from_keys: &[&[u8]],
    ) {
        let from_path = owned_path(from_keys);
        let end = subtree_end(&from_path);
        let source: Vec<(KeyPath, Vec<u8>)> = match self.tree(namespace, from_global) {
            Some(tree) => tree
                .range((Bound::Included(from_path.clone()), end))
                .map(|(k, v)| (k[from_path.len()..].to_vec(), v.clone()))
                .collect(),
            None => return,
        };
        for (suffix, value) in source {
            let mut path = owned_path(to_keys);
            path.extend(suffix);
            self.set_path(handle, namespace, to_global, path, value);
        }
    }

    /// Next or previous sibling subscript, `None` when the level is exhausted
    pub fn order(
        &self,
        namespace: &str,
        global: &[u8],
        keys: &[&[u8]],
        direction: Direction,
    ) -> Option<Vec<u8>> {
        let tree = self.tree(namespace, global)?;
        let (level, seed) = split_seed(keys);
        let entry = match direction {
            Direction::Forward => {
                let start = if seed.is_empty() {
                    Bound::Excluded(level.clone())
                } else {
                    let mut succ = seed.to_vec();
                    succ.push(0);
                    let mut from = level.clone();
                    from.push(succ);
                    Bound::Included(from)
                };
                tree.range((start, Bound::Unbounded)).next()?
            }
            Direction::Backward => {
                let end = if seed.is_empty() {
                    subtree_end(&level)
                } else {
                    let mut to = level.clone();
                    to.push(seed.to_vec());
                    Bound::Excluded(to)
                };
                tree.range((Bound::Unbounded, end)).next_back()?
            }
        };
        child_of(&level, entry.0)
    }

    /// Next or previous data-holding node in depth-first order
    pub fn node_order(
        &self,
        namespace: &str,
        global: &[u8],
        keys: &[&[u8]],
        direction: Direction,
    ) -> Option<NodeStep> {
        let tree = self.tree(namespace, global)?;
        let path = owned_path(keys);
        let entry = match direction {
            Direction::Forward => tree
                .range((Bound::Excluded(path), Bound::Unbounded))
                .next()?,
            Direction::Backward if path.is_empty() => tree.iter().next_back()?,
            Direction::Backward => tree
                .range((Bound::Unbounded, Bound::Excluded(path)))
                .next_back()?,
        };
        if entry.0.is_empty() {
            // the unsubscripted root is a starting point, not a stop
            return None;
        }
        Some(NodeStep {
            keys: entry.0.clone(),
            value: entry.1.clone(),
        })
    }

    /// Next or previous global name in the directory
    pub fn name_order(
        &self,
        namespace: &str,
        seed: &[u8],
        direction: Direction,
    ) -> Option<Vec<u8>> {
        let space = self.namespaces.get(namespace)?;
        let bounds = match direction {
            Direction::Forward if seed.is_empty() => (Bound::Unbounded, Bound::Unbounded),
            Direction::Forward => (Bound::Excluded(seed.to_vec()), Bound::Unbounded),
            Direction::Backward if seed.is_empty() => (Bound::Unbounded, Bound::Unbounded),
            Direction::Backward => (Bound::Unbounded, Bound::Excluded(seed.to_vec())),
        };
        let mut range = space.globals.range(bounds);
        loop {
            let (name, tree) = match direction {
                Direction::Forward => range.next()?,
                Direction::Backward => range.next_back()?,
            };
            if !tree.is_empty() {
                return Some(name.clone());
            }
        }
    }

    /// Open one journal level for the session
    pub fn tx_start(&mut self, handle: Handle) {
        self.journals.entry(handle).or_default().push(Journal::new());
    }

    /// Journal nesting depth of the session
    pub fn tx_depth(&self, handle: Handle) -> usize {
        self.journals.get(&handle).map_or(0, |stack| stack.len())
    }

    /// Keep the innermost level's writes; with an outer level open, its
    /// records move there so an outer rollback still undoes them
    pub fn tx_commit(&mut self, handle: Handle) -> Result<()> {
        let stack = self
            .journals
            .get_mut(&handle)
            .filter(|stack| !stack.is_empty())
            .ok_or_else(|| {
                DbxError::Transaction(format!("session {} has no open transaction", handle))
            })?;
        let inner = stack.pop().unwrap_or_default();
        match stack.last_mut() {
            Some(outer) => outer.extend(inner),
            None => {
                self.journals.remove(&handle);
            }
        }
        Ok(())
    }

    /// Undo the innermost level's writes in reverse order
    pub fn tx_rollback(&mut self, handle: Handle) -> Result<()> {
        let mut journal = self
            .journals
            .get_mut(&handle)
            .and_then(|stack| stack.pop())
            .ok_or_else(|| {
                DbxError::Transaction(format!("session {} has no open transaction", handle))
            })?;
        for record in journal.drain(..).rev() {
            self.restore(record);
        }
        if self.journals.get(&handle).is_some_and(|stack| stack.is_empty()) {
            self.journals.remove(&handle);
        }
        Ok(())
    }

    /// Roll back every open level, for session teardown
    pub fn tx_abandon(&mut self, handle: Handle) {
        if let Some(mut stack) = self.journals.remove(&handle) {
            while let Some(mut journal) = stack.pop() {
                for record in journal.drain(..).rev() {
                    self.restore(record);
                }
            }
        }
    }

    fn restore(&mut self, record: UndoRecord) {
        let UndoRecord {
            namespace,
            global,
            keys,
            prior,
        } = record;
        let space = self.namespaces.entry(namespace).or_default();
        let tree = space.globals.entry(global.clone()).or_default();
        match prior {
            Some(value) => {
                tree.insert(keys, value);
            }
            None => {
                tree.remove(&keys);
            }
        }
        if tree.is_empty() {
            space.globals.remove(&global);
        }
    }
}
