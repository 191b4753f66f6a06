//! The call being intercepted

use super::method_return::MethodReturn;
use super::parameters::{ArgumentBuffer, ParameterCollection};
use crate::error::Fault;
use crate::object::ObjectRef;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;
use weave_types::{MethodDescriptor, Type};

/// One intercepted call as seen by handlers
pub struct MethodInvocation {
    target: ObjectRef,
    method: Arc<MethodDescriptor>,
    buffer: ArgumentBuffer,
    arguments: ParameterCollection,
    inputs: ParameterCollection,
    class_type_args: Vec<Type>,
    method_type_args: Vec<Type>,
}

impl MethodInvocation {
    /// Capture a call
    pub fn new(
        target: ObjectRef,
        method: Arc<MethodDescriptor>,
        args: Vec<Value>,
        class_type_args: Vec<Type>,
        method_type_args: Vec<Type>,
    ) -> Self {
        let buffer = ArgumentBuffer::new(args);
        let arguments = ParameterCollection::all(buffer.clone(), &method.parameters);
        let inputs = ParameterCollection::new(buffer.clone(), &method.parameters, |p| !p.is_out());
        Self {
            target,
            method,
            buffer,
            arguments,
            inputs,
            class_type_args,
            method_type_args,
        }
    }

    /// Object the call was made on
    pub fn target(&self) -> &ObjectRef {
        &self.target
    }

    /// Signature of the called method
    pub fn method(&self) -> &Arc<MethodDescriptor> {
        &self.method
    }

    /// Every argument slot, including `out` slots
    pub fn arguments(&self) -> &ParameterCollection {
        &self.arguments
    }

    /// Argument slots carrying input (everything except `out`)
    pub fn inputs(&self) -> &ParameterCollection {
        &self.inputs
    }

    /// Type arguments of the proxy class for this call
    pub fn class_type_args(&self) -> &[Type] {
        &self.class_type_args
    }

    /// Type arguments supplied to a generic method
    pub fn method_type_args(&self) -> &[Type] {
        &self.method_type_args
    }

    pub(crate) fn buffer(&self) -> &ArgumentBuffer {
        &self.buffer
    }

    /// Successful return carrying the current by-ref slot values
    pub fn create_method_return(&self, value: Value) -> MethodReturn {
        MethodReturn::new(Ok(value), self.outputs())
    }

    /// Faulted return
    pub fn create_fault_return(&self, fault: Fault) -> MethodReturn {
        MethodReturn::new(Err(fault), self.outputs())
    }

    fn outputs(&self) -> ParameterCollection {
        ParameterCollection::new(self.buffer.clone(), &self.method.parameters, |p| {
            p.is_by_ref()
        })
    }
}

impl fmt::Debug for MethodInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodInvocation")
            .field("target", &self.target.class_name())
            .field("method", &self.method.to_string())
            .field("arguments", &self.buffer.snapshot())
            .finish()
    }
}
