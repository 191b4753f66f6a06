//! Generated proxy shapes and their closed instantiations

use crate::class::{arguments_fit, Call, ClassDef, ClassType, ConstructorDef};
use crate::error::{CallResult, Fault};
use crate::invocation::MethodInvocation;
use crate::object::{Object, ObjectRef, RuntimeClass};
use crate::options::ProxyOptions;
use crate::pipeline::Pipeline;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;
use weave_types::{
    Accessibility, GenericParamDef, MethodDescriptor, ParameterDescriptor, Type, TypeError,
    TypeParameterMap, TypeResult,
};

/// A base constructor re-exposed by a proxy with a mapped signature
#[derive(Debug, Clone)]
pub struct ForwardedConstructor {
    /// Parameters in proxy terms
    pub parameters: Vec<ParameterDescriptor>,
    /// Accessibility on the proxy; public for every forwarded constructor
    pub accessibility: Accessibility,
    /// Accessibility of the base constructor
    pub base_accessibility: Accessibility,
    pub(crate) target: ConstructorDef,
}

/// One generated override
pub struct MethodOverride {
    pub(crate) signature: Arc<MethodDescriptor>,
    pub(crate) base_method: Arc<MethodDescriptor>,
    pub(crate) pipeline: Pipeline,
}

impl MethodOverride {
    /// Signature in proxy terms; `declaring_type` is the proxy name
    pub fn signature(&self) -> &Arc<MethodDescriptor> {
        &self.signature
    }

    /// The overridden declaration
    pub fn base_method(&self) -> &Arc<MethodDescriptor> {
        &self.base_method
    }

    /// Handler names, outermost first
    pub fn handler_names(&self) -> Vec<&str> {
        self.pipeline.handler_names()
    }
}

impl fmt::Debug for MethodOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodOverride")
            .field("signature", &self.signature.to_string())
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

/// Sealed description of a generated proxy type
///
/// Generic sources produce one open descriptor; every closed instantiation
/// is a `ProxyClass` over it.
pub struct ProxyTypeDescriptor {
    pub(crate) name: String,
    pub(crate) source: Arc<ClassDef>,
    pub(crate) generic_params: Vec<GenericParamDef>,
    pub(crate) base: ClassType,
    pub(crate) constructors: Vec<ForwardedConstructor>,
    pub(crate) overrides: Vec<MethodOverride>,
    pub(crate) options: ProxyOptions,
}

impl ProxyTypeDescriptor {
    /// Generated type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The proxied definition
    pub fn source(&self) -> &Arc<ClassDef> {
        &self.source
    }

    /// Proxy generic parameters, mirroring the source's
    pub fn generic_params(&self) -> &[GenericParamDef] {
        &self.generic_params
    }

    /// The source definition applied to the proxy's own parameters
    pub fn base(&self) -> &ClassType {
        &self.base
    }

    /// Forwarded constructors
    pub fn constructors(&self) -> &[ForwardedConstructor] {
        &self.constructors
    }

    /// Generated overrides
    pub fn overrides(&self) -> &[MethodOverride] {
        &self.overrides
    }

    /// Override for `name` taking `arity` arguments and `generic_arity`
    /// type arguments
    pub fn find_override(
        &self,
        name: &str,
        arity: usize,
        generic_arity: usize,
    ) -> Option<&MethodOverride> {
        self.overrides.iter().find(|o| {
            o.signature.name == name
                && o.signature.parameters.len() == arity
                && o.signature.generic_params.len() == generic_arity
        })
    }

    /// Whether `name` is routed through a handler chain
    pub fn is_intercepted(&self, name: &str) -> bool {
        self.overrides.iter().any(|o| o.signature.name == name)
    }

    /// Map from the proxy's parameters to `type_args`
    pub(crate) fn param_map(&self, type_args: &[Type]) -> TypeResult<TypeParameterMap> {
        TypeParameterMap::from_defs(&self.generic_params, type_args.to_vec())
    }
}

impl fmt::Debug for ProxyTypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyTypeDescriptor")
            .field("name", &self.name)
            .field("source", &self.source.name())
            .field("generic_params", &self.generic_params.len())
            .field("constructors", &self.constructors.len())
            .field("overrides", &self.overrides)
            .finish()
    }
}

/// A proxy type applied to type arguments
#[derive(Debug, Clone)]
pub struct ProxyClass {
    descriptor: Arc<ProxyTypeDescriptor>,
    type_args: Vec<Type>,
    base: ClassType,
}

impl ProxyClass {
    /// The proxy over its own parameters
    pub fn open(descriptor: Arc<ProxyTypeDescriptor>) -> Self {
        let type_args: Vec<Type> = descriptor
            .generic_params
            .iter()
            .map(GenericParamDef::as_type)
            .collect();
        let base = descriptor.base.clone();
        Self {
            descriptor,
            type_args,
            base,
        }
    }

    /// Close the proxy over `type_args`
    ///
    /// Checks the argument count and the reference/value-type constraints of
    /// each parameter.
    pub fn close(descriptor: Arc<ProxyTypeDescriptor>, type_args: Vec<Type>) -> TypeResult<Self> {
        if type_args.len() != descriptor.generic_params.len() {
            return Err(TypeError::InvalidTypeArgCount {
                name: descriptor.name.clone(),
                expected: descriptor.generic_params.len(),
                actual: type_args.len(),
            });
        }
        for (param, arg) in descriptor.generic_params.iter().zip(&type_args) {
            if let Some(constraint) = param.violated_by(arg) {
                return Err(TypeError::ConstraintViolation {
                    param: param.param.name.clone(),
                    argument: arg.to_string(),
                    constraint: constraint.to_string(),
                });
            }
        }
        let base = ClassType::new(descriptor.source.clone(), type_args.clone())?;
        Ok(Self {
            descriptor,
            type_args,
            base,
        })
    }

    /// The generated shape
    pub fn descriptor(&self) -> &Arc<ProxyTypeDescriptor> {
        &self.descriptor
    }

    /// Type arguments
    pub fn type_args(&self) -> &[Type] {
        &self.type_args
    }

    /// The source class closed over the same arguments
    pub fn base_class(&self) -> &ClassType {
        &self.base
    }

    /// Whether any argument is still a formal parameter
    pub fn is_open(&self) -> bool {
        self.type_args.iter().any(Type::contains_params)
    }

    /// The proxy as a type expression
    pub fn as_type(&self) -> Type {
        if self.type_args.is_empty() {
            Type::named(&self.descriptor.name)
        } else {
            Type::constructed(&self.descriptor.name, self.type_args.clone())
        }
    }

    /// Allocate an instance through a public forwarded constructor
    pub fn instantiate(&self, args: &[Value]) -> CallResult<ObjectRef> {
        if self.is_open() {
            return Err(Fault::Argument(format!(
                "cannot instantiate open generic type {}",
                self.as_type()
            )));
        }
        let map = self.descriptor.param_map(&self.type_args)?;
        let ctor = self
            .descriptor
            .constructors
            .iter()
            .filter(|c| c.accessibility == Accessibility::Public)
            .find(|c| arguments_fit(&map, &c.parameters, args))
            .ok_or_else(|| {
                Fault::MissingMember(format!(
                    "{} has no public constructor taking {} argument(s)",
                    self.as_type(),
                    args.len()
                ))
            })?;

        let object = Object::new(RuntimeClass::Proxy(self.clone()), self.base.field_layout()?);
        let mut slots = args.to_vec();
        ctor.target
            .run(&mut Call::new(&object, &mut slots, self.base.args(), &[]))?;
        Ok(object)
    }

    /// Run an override's handler chain for a call on `this`
    pub(crate) fn invoke_override(
        &self,
        this: &ObjectRef,
        method: &MethodOverride,
        method_type_args: &[Type],
        args: &mut [Value],
    ) -> CallResult<Value> {
        let signature = &method.signature;
        if signature.generic_params.len() != method_type_args.len() {
            return Err(Fault::Argument(format!(
                "{} expects {} type argument(s), got {}",
                signature.name,
                signature.generic_params.len(),
                method_type_args.len()
            )));
        }
        if signature.parameters.len() != args.len() {
            return Err(Fault::Argument(format!(
                "{} expects {} argument(s), got {}",
                signature.name,
                signature.parameters.len(),
                args.len()
            )));
        }

        let class_map = Arc::new(self.descriptor.param_map(&self.type_args)?);
        let map = TypeParameterMap::from_defs_with_parent(
            &signature.generic_params,
            method_type_args.to_vec(),
            class_map,
        )?;

        if self.descriptor.options.check_arguments {
            for (param, value) in signature.parameters.iter().zip(args.iter()) {
                let expected = map.map(&param.ty);
                if !param.is_out() && !value.conforms_to(&expected) {
                    return Err(Fault::TypeMismatch {
                        expected: expected.to_string(),
                        got: value.type_name(),
                    });
                }
            }
        }

        tracing::trace!(
            proxy = %self.descriptor.name,
            method = %signature.name,
            handlers = method.pipeline.len(),
            "intercepted call"
        );

        let invocation = MethodInvocation::new(
            this.clone(),
            signature.clone(),
            args.to_vec(),
            self.type_args.clone(),
            method_type_args.to_vec(),
        );
        let ret = method.pipeline.invoke(&invocation);
        if let Some(fault) = ret.fault() {
            return Err(fault.clone());
        }

        let outputs = ret.outputs();
        for index in 0..outputs.len() {
            if let Some(position) = outputs.argument_position(index) {
                if let Some(slot) = args.get_mut(position) {
                    *slot = outputs.get(index)?;
                }
            }
        }

        ret.into_result()?.coerce_to(&map.map(&signature.return_type))
    }
}

impl PartialEq for ProxyClass {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.descriptor, &other.descriptor) && self.type_args == other.type_args
    }
}
