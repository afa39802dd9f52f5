//! Callable registries and open object instances
//!
//! A real backend resolves functions and classes inside the database. The
//! reference driver instead holds registries of Rust closures, plus a table
//! of open instances keyed by object reference. Instances are property bags
//! scoped to the session that created them.

use crate::driver::CallValue;
use crate::error::{DbxError, Result};
use crate::session::Handle;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex};

/// Extrinsic function or class method body
pub type FunctionFn = Arc<dyn Fn(&[&[u8]]) -> Result<CallValue> + Send + Sync>;

/// Instance method body
pub type MethodFn = Arc<dyn Fn(&mut Instance, &[&[u8]]) -> Result<CallValue> + Send + Sync>;

/// One open instance
#[derive(Debug, Default, Clone)]
pub struct Instance {
    class: String,
    owner: Handle,
    properties: FxHashMap<String, Vec<u8>>,
}

impl Instance {
    /// Class the instance belongs to
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Property value, empty when never written
    pub fn property(&self, name: &str) -> Vec<u8> {
        self.properties.get(name).cloned().unwrap_or_default()
    }

    /// Write a property
    pub fn set_property(&mut self, name: &str, value: &[u8]) {
        self.properties.insert(name.to_string(), value.to_vec());
    }
}

#[derive(Default)]
struct ClassDef {
    class_methods: FxHashMap<String, FunctionFn>,
    methods: FxHashMap<String, MethodFn>,
}

#[derive(Default)]
struct Registry {
    functions: FxHashMap<String, FunctionFn>,
    classes: FxHashMap<String, ClassDef>,
    instances: FxHashMap<u32, Instance>,
    next_oref: u32,
}

/// Shared registry of callables and instances
pub struct CallTable {
    inner: Mutex<Registry>,
}

impl Default for CallTable {
    fn default() -> Self {
        CallTable {
            inner: Mutex::new(Registry {
                next_oref: 1,
                ..Registry::default()
            }),
        }
    }
}

impl CallTable {
    /// Empty call table
    pub fn new() -> Self {
        CallTable::default()
    }

    /// Install an extrinsic function
    pub fn register_function(&self, name: &str, body: FunctionFn) {
        self.inner
            .lock()
            .unwrap()
            .functions
            .insert(name.to_string(), body);
    }

    /// Declare a class, enabling `%New`
    pub fn register_class(&self, class: &str) {
        self.inner
            .lock()
            .unwrap()
            .classes
            .entry(class.to_string())
            .or_default();
    }

    /// Install a class method
    pub fn register_class_method(&self, class: &str, method: &str, body: FunctionFn) {
        self.inner
            .lock()
            .unwrap()
            .classes
            .entry(class.to_string())
            .or_default()
            .class_methods
            .insert(method.to_string(), body);
    }

    /// Install an instance method
    pub fn register_method(&self, class: &str, method: &str, body: MethodFn) {
        self.inner
            .lock()
            .unwrap()
            .classes
            .entry(class.to_string())
            .or_default()
            .methods
            .insert(method.to_string(), body);
    }

    /// Call an extrinsic function
    pub fn function(&self, name: &str, args: &[&[u8]]) -> Result<CallValue> {
        let body = self
            .inner
            .lock()
            .unwrap()
            .functions
            .get(name)
            .cloned()
            .ok_or_else(|| DbxError::Other(format!("function {} is not defined", name)))?;
        body(args)
    }

    /// Call a class method; `%New` opens a fresh instance
    pub fn classmethod(
        &self,
        handle: Handle,
        class: &str,
        method: &str,
        args: &[&[u8]],
    ) -> Result<CallValue> {
        if method == "%New" {
            let mut registry = self.inner.lock().unwrap();
            if !registry.classes.contains_key(class) {
                return Err(DbxError::Object(format!("class {} is not defined", class)));
            }
            let oref = registry.next_oref;
            registry.next_oref += 1;
            registry.instances.insert(
                oref,
                Instance {
                    class: class.to_string(),
                    owner: handle,
                    properties: FxHashMap::default(),
                },
            );
            return Ok(CallValue::Oref(oref));
        }
        let body = self
            .inner
            .lock()
            .unwrap()
            .classes
            .get(class)
            .and_then(|def| def.class_methods.get(method))
            .cloned()
            .ok_or_else(|| {
                DbxError::Object(format!("class method {}.{} is not defined", class, method))
            })?;
        body(args)
    }

    /// Read a property of an open instance
    pub fn get_property(&self, handle: Handle, oref: u32, name: &str) -> Result<Vec<u8>> {
        let registry = self.inner.lock().unwrap();
        let instance = Self::instance_of(&registry, handle, oref)?;
        Ok(instance.property(name))
    }

    /// Write a property of an open instance
    pub fn set_property(&self, handle: Handle, oref: u32, name: &str, value: &[u8]) -> Result<()> {
        let mut registry = self.inner.lock().unwrap();
        Self::instance_of(&registry, handle, oref)?;
        if let Some(instance) = registry.instances.get_mut(&oref) {
            instance.set_property(name, value);
        }
        Ok(())
    }

    /// Invoke an instance method
    pub fn method(
        &self,
        handle: Handle,
        oref: u32,
        method: &str,
        args: &[&[u8]],
    ) -> Result<CallValue> {
        let mut registry = self.inner.lock().unwrap();
        let class = Self::instance_of(&registry, handle, oref)?.class.clone();
        let body = registry
            .classes
            .get(&class)
            .and_then(|def| def.methods.get(method))
            .cloned()
            .ok_or_else(|| {
                DbxError::Object(format!("method {}.{} is not defined", class, method))
            })?;
        let instance = registry
            .instances
            .get_mut(&oref)
            .ok_or_else(|| DbxError::Object(format!("no open instance {}", oref)))?;
        body(instance, args)
    }

    /// Release an open instance
    pub fn close_instance(&self, handle: Handle, oref: u32) -> Result<()> {
        let mut registry = self.inner.lock().unwrap();
        Self::instance_of(&registry, handle, oref)?;
        registry.instances.remove(&oref);
        Ok(())
    }

    /// Drop every instance the session owns, for session teardown
    pub fn release_all(&self, handle: Handle) {
        self.inner
            .lock()
            .unwrap()
            .instances
            .retain(|_, instance| instance.owner != handle);
    }

    /// Number of open instances
    pub fn open_count(&self) -> usize {
        self.inner.lock().unwrap().instances.len()
    }

    fn instance_of<'a>(
        registry: &'a Registry,
        handle: Handle,
        oref: u32,
    ) -> Result<&'a Instance> {
        let instance = registry
            .instances
            .get(&oref)
            .ok_or_else(|| DbxError::Object(format!("no open instance {}", oref)))?;
        if instance.owner != handle {
            return Err(DbxError::Object(format!(
                "instance {} is not open in this session",
                oref
            )));
        }
        Ok(instance)
    }
}
