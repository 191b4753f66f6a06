//! Runtime objects and virtual dispatch

use crate::class::{Call, ClassType};
use crate::error::{CallResult, Fault};
use crate::proxy::ProxyClass;
use crate::value::Value;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;
use weave_types::{Type, TypeParameterMap};

/// Shared object reference
pub type ObjectRef = Arc<Object>;

/// The class an object was instantiated from
#[derive(Debug, Clone)]
pub enum RuntimeClass {
    /// Instance of the class itself
    Plain(ClassType),
    /// Instance of a generated proxy
    Proxy(ProxyClass),
}

impl RuntimeClass {
    /// Name of the runtime class
    pub fn name(&self) -> &str {
        match self {
            RuntimeClass::Plain(class) => class.name(),
            RuntimeClass::Proxy(proxy) => proxy.descriptor().name(),
        }
    }

    /// The class whose vtable backs non-intercepted calls
    pub fn base_class(&self) -> &ClassType {
        match self {
            RuntimeClass::Plain(class) => class,
            RuntimeClass::Proxy(proxy) => proxy.base_class(),
        }
    }
}

/// Heap object with named fields
pub struct Object {
    class: RuntimeClass,
    fields: RwLock<FxHashMap<String, Value>>,
}

impl Object {
    /// Allocate an object with every field set to null
    pub fn new(class: RuntimeClass, layout: Vec<String>) -> ObjectRef {
        let fields = layout.into_iter().map(|name| (name, Value::Null)).collect();
        Arc::new(Self {
            class,
            fields: RwLock::new(fields),
        })
    }

    /// Runtime class
    pub fn class(&self) -> &RuntimeClass {
        &self.class
    }

    /// Runtime class name
    pub fn class_name(&self) -> &str {
        self.class.name()
    }

    /// Whether this object was created through a proxy
    pub fn is_proxy(&self) -> bool {
        matches!(self.class, RuntimeClass::Proxy(_))
    }

    /// Read a field
    pub fn get_field(&self, name: &str) -> CallResult<Value> {
        self.fields
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Fault::MissingMember(format!("{}.{}", self.class_name(), name)))
    }

    /// Write a field
    pub fn set_field(&self, name: &str, value: Value) -> CallResult<()> {
        let mut fields = self.fields.write();
        match fields.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Fault::MissingMember(format!("{}.{}", self.class_name(), name))),
        }
    }

    /// Whether this object is assignable to `ty`
    pub fn instance_of(&self, ty: &Type) -> bool {
        if let RuntimeClass::Proxy(proxy) = &self.class {
            if proxy.as_type() == *ty {
                return true;
            }
        }
        match self.class.base_class().hierarchy() {
            Ok(chain) => chain.iter().any(|class| class.as_type() == *ty),
            Err(_) => false,
        }
    }

    /// Virtual call of a non-generic method
    pub fn call(self: &Arc<Self>, name: &str, args: &mut [Value]) -> CallResult<Value> {
        self.call_generic(name, &[], args)
    }

    /// Virtual call supplying method type arguments
    ///
    /// Intercepted methods of proxy instances go through their handler chain;
    /// everything else runs the most derived body directly.
    pub fn call_generic(
        self: &Arc<Self>,
        name: &str,
        method_type_args: &[Type],
        args: &mut [Value],
    ) -> CallResult<Value> {
        if let RuntimeClass::Proxy(proxy) = &self.class {
            let found = proxy
                .descriptor()
                .find_override(name, args.len(), method_type_args.len());
            if let Some(method) = found {
                return proxy.invoke_override(self, method, method_type_args, args);
            }
        }
        self.dispatch_direct(name, method_type_args, args)
    }

    fn dispatch_direct(
        self: &Arc<Self>,
        name: &str,
        method_type_args: &[Type],
        args: &mut [Value],
    ) -> CallResult<Value> {
        let (owner, method) = self
            .class
            .base_class()
            .find_method(name, args.len(), method_type_args.len())?
            .ok_or_else(|| {
                Fault::MissingMember(format!("{}::{}/{}", self.class_name(), name, args.len()))
            })?;

        let descriptor = method.descriptor();
        if descriptor.generic_params.len() != method_type_args.len() {
            return Err(Fault::Argument(format!(
                "{} expects {} type argument(s), got {}",
                descriptor.name,
                descriptor.generic_params.len(),
                method_type_args.len()
            )));
        }

        let class_map = Arc::new(owner.param_map()?);
        let map = TypeParameterMap::from_defs_with_parent(
            &descriptor.generic_params,
            method_type_args.to_vec(),
            class_map,
        )?;

        for (param, value) in descriptor.parameters.iter().zip(args.iter()) {
            let expected = map.map(&param.ty);
            if !param.is_out() && !value.conforms_to(&expected) {
                return Err(Fault::TypeMismatch {
                    expected: expected.to_string(),
                    got: value.type_name(),
                });
            }
        }

        let result = method.invoke(&mut Call::new(self, args, owner.args(), method_type_args))?;
        result.coerce_to(&map.map(&descriptor.return_type))
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("class", &self.class_name())
            .field("fields", &*self.fields.read())
            .finish()
    }
}
