//! In-memory reference driver
//!
//! Implements [`Driver`] over process-local state: a namespaced global
//! tree with undo journals, a hierarchical lock table, and closure-backed
//! call registries. Sibling order is plain byte-lexicographic comparison;
//! a server backend applies its own collation instead.

pub mod locks;
pub mod objects;
pub mod store;

use crate::driver::{CallValue, Direction, Driver, NodeStatus, NodeStep};
use crate::error::Result;
use crate::session::{Handle, OpenProfile};
use locks::LockTable;
use objects::{CallTable, FunctionFn, MethodFn};
use std::sync::Mutex;
use std::time::Duration;
use store::Store;

/// Process-local database driver
pub struct MemDriver {
    store: Mutex<Store>,
    locks: LockTable,
    calls: CallTable,
    banner: String,
}

impl Default for MemDriver {
    fn default() -> Self {
        MemDriver::new()
    }
}

impl MemDriver {
    /// Fresh driver with an empty store
    pub fn new() -> Self {
        MemDriver {
            store: Mutex::new(Store::new()),
            locks: LockTable::new(),
            calls: CallTable::new(),
            banner: format!("dbxcore in-memory database v{}", crate::VERSION),
        }
    }

    /// Driver with a custom version banner
    pub fn with_banner(banner: &str) -> Self {
        MemDriver {
            banner: banner.to_string(),
            ..MemDriver::new()
        }
    }

    /// Install an extrinsic function
    pub fn register_function(&self, name: &str, body: FunctionFn) {
        self.calls.register_function(name, body);
    }

    /// Declare a class so `%New` can open instances of it
    pub fn register_class(&self, class: &str) {
        self.calls.register_class(class);
    }

    /// Install a class method
    pub fn register_class_method(&self, class: &str, method: &str, body: FunctionFn) {
        self.calls.register_class_method(class, method, body);
    }

    /// Install an instance method
    pub fn register_method(&self, class: &str, method: &str, body: MethodFn) {
        self.calls.register_method(class, method, body);
    }

    /// Number of open object instances, for teardown checks
    pub fn open_instances(&self) -> usize {
        self.calls.open_count()
    }

    /// Number of distinct held locks, for teardown checks
    pub fn held_locks(&self) -> usize {
        self.locks.held_count()
    }
}

impl Driver for MemDriver {
    fn version(&self) -> String {
        self.banner.clone()
    }

    fn connect(&self, _handle: Handle, profile: &OpenProfile) -> Result<()> {
        self.store.lock().unwrap().ensure_namespace(&profile.namespace);
        Ok(())
    }

    fn disconnect(&self, handle: Handle) -> Result<()> {
        self.locks.release_all(handle);
        self.store.lock().unwrap().tx_abandon(handle);
        self.calls.release_all(handle);
        Ok(())
    }

    fn set(
        &self,
        handle: Handle,
        namespace: &str,
        global: &[u8],
        keys: &[&[u8]],
        value: &[u8],
    ) -> Result<()> {
        self.store
            .lock()
            .unwrap()
            .set(handle, namespace, global, keys, value);
        Ok(())
    }

    fn get(
        &self,
        _handle: Handle,
        namespace: &str,
        global: &[u8],
        keys: &[&[u8]],
    ) -> Result<Option<Vec<u8>>> {
        Ok(self.store.lock().unwrap().get(namespace, global, keys))
    }

    fn delete(
        &self,
        handle: Handle,
        namespace: &str,
        global: &[u8],
        keys: &[&[u8]],
    ) -> Result<()> {
        self.store
            .lock()
            .unwrap()
            .delete(handle, namespace, global, keys);
        Ok(())
    }

    fn defined(
        &self,
        _handle: Handle,
        namespace: &str,
        global: &[u8],
        keys: &[&[u8]],
    ) -> Result<NodeStatus> {
        Ok(self.store.lock().unwrap().defined(namespace, global, keys))
    }

    fn increment(
        &self,
        handle: Handle,
        namespace: &str,
        global: &[u8],
        keys: &[&[u8]],
        delta: &[u8],
    ) -> Result<Vec<u8>> {
        Ok(self
            .store
            .lock()
            .unwrap()
            .increment(handle, namespace, global, keys, delta))
    }

    fn merge(
        &self,
        handle: Handle,
        namespace: &str,
        to_global: &[u8],
        to_keys: &[&[u8]],
        from_global: &[u8],
        from_keys: &[&[u8]],
    ) -> Result<()> {
        self.store
            .lock()
            .unwrap()
            .merge(handle, namespace, to_global, to_keys, from_global, from_keys);
        Ok(())
    }

    fn order(
        &self,
        _handle: Handle,
        namespace: &str,
        global: &[u8],
        keys: &[&[u8]],
        direction: Direction,
    ) -> Result<Option<Vec<u8>>> {
        Ok(self
            .store
            .lock()
            .unwrap()
            .order(namespace, global, keys, direction))
    }

    fn node_order(
        &self,
        _handle: Handle,
        namespace: &str,
        global: &[u8],
        keys: &[&[u8]],
        direction: Direction,
    ) -> Result<Option<NodeStep>> {
        Ok(self
            .store
            .lock()
            .unwrap()
            .node_order(namespace, global, keys, direction))
    }

    fn name_order(
        &self,
        _handle: Handle,
        namespace: &str,
        global: &[u8],
        direction: Direction,
    ) -> Result<Option<Vec<u8>>> {
        Ok(self
            .store
            .lock()
            .unwrap()
            .name_order(namespace, global, direction))
    }

    fn lock(
        &self,
        handle: Handle,
        namespace: &str,
        global: &[u8],
        keys: &[&[u8]],
        timeout: Duration,
    ) -> Result<bool> {
        Ok(self.locks.lock(handle, namespace, global, keys, timeout))
    }

    fn unlock(
        &self,
        handle: Handle,
        namespace: &str,
        global: &[u8],
        keys: &[&[u8]],
    ) -> Result<bool> {
        Ok(self.locks.unlock(handle, namespace, global, keys))
    }

    fn tx_start(&self, handle: Handle) -> Result<()> {
        self.store.lock().unwrap().tx_start(handle);
        Ok(())
    }

    fn tx_commit(&self, handle: Handle) -> Result<()> {
        self.store.lock().unwrap().tx_commit(handle)
    }

    fn tx_rollback(&self, handle: Handle) -> Result<()> {
        self.store.lock().unwrap().tx_rollback(handle)
    }

    fn function(
        &self,
        _handle: Handle,
        _namespace: &str,
        name: &[u8],
        args: &[&[u8]],
    ) -> Result<CallValue> {
        self.calls
            .function(&String::from_utf8_lossy(name), args)
    }

    fn classmethod(
        &self,
        handle: Handle,
        _namespace: &str,
        class: &[u8],
        method: &[u8],
        args: &[&[u8]],
    ) -> Result<CallValue> {
        self.calls.classmethod(
            handle,
            &String::from_utf8_lossy(class),
            &String::from_utf8_lossy(method),
            args,
        )
    }

    fn get_property(&self, handle: Handle, oref: u32, name: &[u8]) -> Result<Vec<u8>> {
        self.calls
            .get_property(handle, oref, &String::from_utf8_lossy(name))
    }

    fn set_property(&self, handle: Handle, oref: u32, name: &[u8], value: &[u8]) -> Result<()> {
        self.calls
            .set_property(handle, oref, &String::from_utf8_lossy(name), value)
    }

    fn method(
        &self,
        handle: Handle,
        oref: u32,
        name: &[u8],
        args: &[&[u8]],
    ) -> Result<CallValue> {
        self.calls
            .method(handle, oref, &String::from_utf8_lossy(name), args)
    }

    fn close_instance(&self, handle: Handle, oref: u32) -> Result<()> {
        self.calls.close_instance(handle, oref)
    }
}
