//! Node lock table
//!
//! Locks are hierarchical: a held node excludes other sessions from the
//! node itself, its subtree, and its ancestors. A session re-acquiring its
//! own lock increments a nesting count; each unlock decrements it.
//! Unlocking a node the session does not hold is a silent no-op.

use crate::session::Handle;
use rustc_hash::FxHashMap;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LockKey {
    namespace: String,
    global: Vec<u8>,
    keys: Vec<Vec<u8>>,
}

impl LockKey {
    fn new(namespace: &str, global: &[u8], keys: &[&[u8]]) -> Self {
        LockKey {
            namespace: namespace.to_string(),
            global: global.to_vec(),
            keys: keys.iter().map(|k| k.to_vec()).collect(),
        }
    }

    /// Same node, an ancestor, or a descendant
    fn conflicts(&self, other: &LockKey) -> bool {
        if self.namespace != other.namespace || self.global != other.global {
            return false;
        }
        let shorter = self.keys.len().min(other.keys.len());
        self.keys[..shorter] == other.keys[..shorter]
    }
}

#[derive(Debug)]
struct LockState {
    owner: Handle,
    count: u32,
}

/// Lock table shared by every session of one engine
#[derive(Debug, Default)]
pub struct LockTable {
    held: Mutex<FxHashMap<LockKey, LockState>>,
    released: Condvar,
}

impl LockTable {
    /// Empty lock table
    pub fn new() -> Self {
        LockTable::default()
    }

    /// Acquire a lock, waiting up to `timeout`; `false` on expiry
    pub fn lock(
        &self,
        handle: Handle,
        namespace: &str,
        global: &[u8],
        keys: &[&[u8]],
        timeout: Duration,
    ) -> bool {
        let key = LockKey::new(namespace, global, keys);
        let deadline = Instant::now() + timeout;
        let mut held = self.held.lock().unwrap();
        loop {
            if let Some(state) = held.get_mut(&key) {
                if state.owner == handle {
                    state.count += 1;
                    return true;
                }
            }
            let blocked = held
                .iter()
                .any(|(other, state)| state.owner != handle && key.conflicts(other));
            if !blocked {
                held.insert(key, LockState { owner: handle, count: 1 });
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self.released.wait_timeout(held, deadline - now).unwrap();
            held = guard;
        }
    }

    /// Release one nesting level; `false` when the session held nothing
    pub fn unlock(&self, handle: Handle, namespace: &str, global: &[u8], keys: &[&[u8]]) -> bool {
        let key = LockKey::new(namespace, global, keys);
        let mut held = self.held.lock().unwrap();
        if let Some(state) = held.get_mut(&key) {
            if state.owner == handle {
                state.count -= 1;
                if state.count == 0 {
                    held.remove(&key);
                    self.released.notify_all();
                }
                return true;
            }
        }
        false
    }

    /// Drop every lock the session holds, for session teardown
    pub fn release_all(&self, handle: Handle) {
        let mut held = self.held.lock().unwrap();
        let before = held.len();
        held.retain(|_, state| state.owner != handle);
        if held.len() != before {
            self.released.notify_all();
        }
    }

    /// Number of distinct held locks
    pub fn held_count(&self) -> usize {
        self.held.lock().unwrap().len()
    }
}
