//! Class definitions
//!
//! A `ClassDef` is the runtime description of a class: its generic
//! parameters, base class, fields, constructors and methods (with bodies).
//! A `ClassType` is a definition applied to type arguments; it is what gets
//! instantiated, dispatched on and proxied.

use crate::error::{CallResult, Fault};
use crate::object::{Object, ObjectRef, RuntimeClass};
use crate::value::Value;
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use weave_types::{
    Accessibility, GenericParam, GenericParamDef, MethodDescriptor, MethodKey, ParameterDescriptor,
    Type, TypeError, TypeParameterMap, TypeResult,
};

/// Name of the universal base class
pub const OBJECT_CLASS_NAME: &str = "object";

static NEXT_CLASS_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identity of a class definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u64);

impl ClassId {
    fn next() -> Self {
        ClassId(NEXT_CLASS_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the numeric ID value
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Method implementation
pub type MethodBody = Arc<dyn Fn(&mut Call<'_>) -> CallResult<Value> + Send + Sync>;

/// Constructor implementation
pub type ConstructorBody = Arc<dyn Fn(&mut Call<'_>) -> CallResult<()> + Send + Sync>;

/// Execution context handed to method and constructor bodies
///
/// `this` is the object the call was dispatched on; for a proxy instance
/// that is the proxy, so virtual calls made from a body are intercepted too.
pub struct Call<'a> {
    this: &'a ObjectRef,
    args: &'a mut [Value],
    class_type_args: &'a [Type],
    method_type_args: &'a [Type],
}

impl<'a> Call<'a> {
    /// Create a call context
    pub fn new(
        this: &'a ObjectRef,
        args: &'a mut [Value],
        class_type_args: &'a [Type],
        method_type_args: &'a [Type],
    ) -> Self {
        Self {
            this,
            args,
            class_type_args,
            method_type_args,
        }
    }

    /// Receiver
    pub fn this(&self) -> &ObjectRef {
        self.this
    }

    /// All arguments
    pub fn args(&self) -> &[Value] {
        self.args
    }

    /// Argument at `index`
    pub fn arg(&self, index: usize) -> CallResult<&Value> {
        self.args
            .get(index)
            .ok_or_else(|| Fault::Argument(format!("no argument at index {}", index)))
    }

    /// Integer argument at `index`
    pub fn int(&self, index: usize) -> CallResult<i64> {
        let value = self.arg(index)?;
        value.as_int().ok_or_else(|| mismatch("int", value))
    }

    /// Float argument at `index` (integers widen)
    pub fn float(&self, index: usize) -> CallResult<f64> {
        let value = self.arg(index)?;
        value.as_float().ok_or_else(|| mismatch("float", value))
    }

    /// Boolean argument at `index`
    pub fn bool(&self, index: usize) -> CallResult<bool> {
        let value = self.arg(index)?;
        value.as_bool().ok_or_else(|| mismatch("bool", value))
    }

    /// String argument at `index`
    pub fn string(&self, index: usize) -> CallResult<String> {
        let value = self.arg(index)?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch("string", value))
    }

    /// Write an argument slot (visible to the caller for `ref`/`out` parameters)
    pub fn set_arg(&mut self, index: usize, value: Value) -> CallResult<()> {
        let slot = self
            .args
            .get_mut(index)
            .ok_or_else(|| Fault::Argument(format!("no argument at index {}", index)))?;
        *slot = value;
        Ok(())
    }

    /// Type arguments of the class declaring the running body
    pub fn class_type_args(&self) -> &[Type] {
        self.class_type_args
    }

    /// Type arguments of the running generic method
    pub fn method_type_args(&self) -> &[Type] {
        self.method_type_args
    }

    /// Read a field of `this`
    pub fn field(&self, name: &str) -> CallResult<Value> {
        self.this.get_field(name)
    }

    /// Write a field of `this`
    pub fn set_field(&self, name: &str, value: Value) -> CallResult<()> {
        self.this.set_field(name, value)
    }

    /// Virtual call on `this`
    pub fn call(&self, name: &str, args: &mut [Value]) -> CallResult<Value> {
        self.this.call(name, args)
    }
}

fn mismatch(expected: &str, got: &Value) -> Fault {
    Fault::TypeMismatch {
        expected: expected.to_string(),
        got: got.type_name(),
    }
}

/// A method declaration plus its implementation
#[derive(Clone)]
pub struct MethodDef {
    descriptor: Arc<MethodDescriptor>,
    body: Option<MethodBody>,
}

impl MethodDef {
    /// Method with a body
    pub fn new<F>(descriptor: MethodDescriptor, body: F) -> Self
    where
        F: Fn(&mut Call<'_>) -> CallResult<Value> + Send + Sync + 'static,
    {
        Self {
            descriptor: Arc::new(descriptor),
            body: Some(Arc::new(body)),
        }
    }

    /// Method without a body
    pub fn without_body(descriptor: MethodDescriptor) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            body: None,
        }
    }

    /// Signature and modifiers
    pub fn descriptor(&self) -> &Arc<MethodDescriptor> {
        &self.descriptor
    }

    /// Vtable slot identity
    pub fn key(&self) -> MethodKey {
        self.descriptor.key()
    }

    /// Whether there is an implementation to run
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Run the body without any dispatch or checks
    pub fn invoke(&self, call: &mut Call<'_>) -> CallResult<Value> {
        match &self.body {
            Some(body) => body(call),
            None => Err(Fault::AbstractMethod(self.descriptor.to_string())),
        }
    }
}

impl fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDef")
            .field("descriptor", &self.descriptor.to_string())
            .field("has_body", &self.has_body())
            .finish()
    }
}

/// Constructor declaration plus its implementation
#[derive(Clone)]
pub struct ConstructorDef {
    /// Formal parameters
    pub parameters: Vec<ParameterDescriptor>,
    /// Accessibility
    pub accessibility: Accessibility,
    body: Option<ConstructorBody>,
}

impl ConstructorDef {
    /// Public constructor with a body
    pub fn new<F>(parameters: Vec<ParameterDescriptor>, body: F) -> Self
    where
        F: Fn(&mut Call<'_>) -> CallResult<()> + Send + Sync + 'static,
    {
        Self {
            parameters,
            accessibility: Accessibility::Public,
            body: Some(Arc::new(body)),
        }
    }

    /// Public parameterless constructor that only allocates
    pub fn empty() -> Self {
        Self {
            parameters: Vec::new(),
            accessibility: Accessibility::Public,
            body: None,
        }
    }

    /// Set accessibility
    pub fn with_access(mut self, accessibility: Accessibility) -> Self {
        self.accessibility = accessibility;
        self
    }

    /// Run the body against a freshly allocated object
    pub fn run(&self, call: &mut Call<'_>) -> CallResult<()> {
        match &self.body {
            Some(body) => body(call),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for ConstructorDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDef")
            .field("parameters", &self.parameters)
            .field("accessibility", &self.accessibility)
            .finish()
    }
}

/// Kind of type definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassKind {
    /// Reference class
    #[default]
    Class,
    /// Interface
    Interface,
    /// Value type
    Struct,
}

/// Type-level visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeVisibility {
    /// Visible everywhere
    #[default]
    Public,
    /// Visible inside the declaring assembly only
    Internal,
}

/// Runtime class definition
pub struct ClassDef {
    id: ClassId,
    name: String,
    kind: ClassKind,
    visibility: TypeVisibility,
    nested_in: Option<String>,
    is_abstract: bool,
    is_sealed: bool,
    generic_params: Vec<GenericParamDef>,
    base: Option<ClassType>,
    fields: Vec<String>,
    constructors: Vec<ConstructorDef>,
    methods: Vec<MethodDef>,
}

static OBJECT_CLASS: Lazy<Arc<ClassDef>> = Lazy::new(|| {
    let to_string = MethodDescriptor::new(OBJECT_CLASS_NAME, "to_string")
        .returns(Type::string())
        .as_virtual();
    let equals = MethodDescriptor::new(OBJECT_CLASS_NAME, "equals")
        .param("other", Type::object())
        .returns(Type::bool())
        .as_virtual();
    let hash_code = MethodDescriptor::new(OBJECT_CLASS_NAME, "hash_code")
        .returns(Type::i32())
        .as_virtual();

    Arc::new(ClassDef {
        id: ClassId::next(),
        name: OBJECT_CLASS_NAME.to_string(),
        kind: ClassKind::Class,
        visibility: TypeVisibility::Public,
        nested_in: None,
        is_abstract: false,
        is_sealed: false,
        generic_params: Vec::new(),
        base: None,
        fields: Vec::new(),
        constructors: vec![ConstructorDef::empty()],
        methods: vec![
            MethodDef::new(to_string, |call| Ok(Value::str(call.this().class_name()))),
            MethodDef::new(equals, |call| {
                let same = match call.arg(0)? {
                    Value::Object(other) => Arc::ptr_eq(other, call.this()),
                    _ => false,
                };
                Ok(Value::Bool(same))
            }),
            MethodDef::new(hash_code, |call| {
                let addr = Arc::as_ptr(call.this()) as usize as i64;
                Ok(Value::Int(addr & 0x7fff_ffff))
            }),
        ],
    })
});

impl ClassDef {
    /// Start a new definition
    pub fn builder(name: &str) -> ClassBuilder {
        ClassBuilder::new(name)
    }

    /// The universal base class
    pub fn object() -> Arc<ClassDef> {
        OBJECT_CLASS.clone()
    }

    /// Unique identity
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Class name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Definition kind
    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    /// Type visibility
    pub fn visibility(&self) -> TypeVisibility {
        self.visibility
    }

    /// Enclosing type for nested definitions
    pub fn nested_in(&self) -> Option<&str> {
        self.nested_in.as_deref()
    }

    /// Whether the class cannot be instantiated directly
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Whether the class cannot be derived from
    pub fn is_sealed(&self) -> bool {
        self.is_sealed
    }

    /// Whether this is the universal base class
    pub fn is_object_class(&self) -> bool {
        self.base.is_none() && self.name == OBJECT_CLASS_NAME
    }

    /// Declared generic parameters
    pub fn generic_params(&self) -> &[GenericParamDef] {
        &self.generic_params
    }

    /// Number of generic parameters
    pub fn arity(&self) -> usize {
        self.generic_params.len()
    }

    /// Whether the class is a generic definition
    pub fn is_generic(&self) -> bool {
        !self.generic_params.is_empty()
    }

    /// The declared generic parameters as types
    pub fn generic_types(&self) -> Vec<Type> {
        self.generic_params.iter().map(GenericParamDef::as_type).collect()
    }

    /// Base class, expressed over this class's own generic parameters
    pub fn base(&self) -> Option<&ClassType> {
        self.base.as_ref()
    }

    /// Fields declared by this class (not inherited)
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Declared constructors
    pub fn constructors(&self) -> &[ConstructorDef] {
        &self.constructors
    }

    /// Methods declared by this class (not inherited)
    pub fn methods(&self) -> &[MethodDef] {
        &self.methods
    }

    /// Find a declared instance method by name, parameter count and
    /// generic arity
    pub fn declared_method(
        &self,
        name: &str,
        arity: usize,
        generic_arity: usize,
    ) -> Option<&MethodDef> {
        self.methods.iter().find(|m| {
            is_overload(m, name, arity) && m.descriptor().generic_params.len() == generic_arity
        })
    }
}

/// Instance method named `name` taking `arity` arguments
fn is_overload(method: &MethodDef, name: &str, arity: usize) -> bool {
    let d = method.descriptor();
    !d.flags.is_static && d.name == name && d.parameters.len() == arity
}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDef")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("generic_params", &self.generic_params.len())
            .field("base", &self.base.as_ref().map(|b| b.as_type().to_string()))
            .field("methods", &self.methods)
            .finish()
    }
}

/// Builder for `ClassDef`
pub struct ClassBuilder {
    def: ClassDef,
}

impl ClassBuilder {
    fn new(name: &str) -> Self {
        Self {
            def: ClassDef {
                id: ClassId::next(),
                name: name.to_string(),
                kind: ClassKind::Class,
                visibility: TypeVisibility::Public,
                nested_in: None,
                is_abstract: false,
                is_sealed: false,
                generic_params: Vec::new(),
                base: None,
                fields: Vec::new(),
                constructors: Vec::new(),
                methods: Vec::new(),
            },
        }
    }

    /// Declare an unconstrained generic parameter
    pub fn generic(mut self, name: &str) -> Self {
        let param = GenericParam::of_type(&self.def.name, self.def.generic_params.len(), name);
        self.def.generic_params.push(GenericParamDef::new(param));
        self
    }

    /// Declare a fully specified generic parameter
    pub fn generic_def(mut self, def: GenericParamDef) -> Self {
        self.def.generic_params.push(def);
        self
    }

    /// Set the base class
    pub fn extends(mut self, base: ClassType) -> Self {
        self.def.base = Some(base);
        self
    }

    /// Declare a field
    pub fn field(mut self, name: &str) -> Self {
        self.def.fields.push(name.to_string());
        self
    }

    /// Declare a constructor
    pub fn constructor(mut self, ctor: ConstructorDef) -> Self {
        self.def.constructors.push(ctor);
        self
    }

    /// Declare a method with a body
    pub fn method<F>(mut self, descriptor: MethodDescriptor, body: F) -> Self
    where
        F: Fn(&mut Call<'_>) -> CallResult<Value> + Send + Sync + 'static,
    {
        self.def.methods.push(MethodDef::new(descriptor, body));
        self
    }

    /// Declare an abstract method
    pub fn abstract_method(mut self, descriptor: MethodDescriptor) -> Self {
        self.def.methods.push(MethodDef::without_body(descriptor.as_abstract()));
        self
    }

    /// Mark the class abstract
    pub fn as_abstract(mut self) -> Self {
        self.def.is_abstract = true;
        self
    }

    /// Mark the class sealed
    pub fn as_sealed(mut self) -> Self {
        self.def.is_sealed = true;
        self
    }

    /// Set the definition kind
    pub fn with_kind(mut self, kind: ClassKind) -> Self {
        self.def.kind = kind;
        self
    }

    /// Set the visibility
    pub fn with_visibility(mut self, visibility: TypeVisibility) -> Self {
        self.def.visibility = visibility;
        self
    }

    /// Nest inside another type
    pub fn nested_in(mut self, outer: &str) -> Self {
        self.def.nested_in = Some(outer.to_string());
        self
    }

    /// Finish the definition
    ///
    /// Classes without an explicit base derive from `object`; classes
    /// without constructors get a public parameterless one.
    pub fn build(mut self) -> Arc<ClassDef> {
        if self.def.base.is_none() {
            self.def.base = Some(ClassType::object());
        }
        if self.def.constructors.is_empty() {
            self.def.constructors.push(ConstructorDef::empty());
        }
        Arc::new(self.def)
    }
}

/// A class definition applied to type arguments
#[derive(Clone)]
pub struct ClassType {
    definition: Arc<ClassDef>,
    args: Vec<Type>,
}

impl ClassType {
    /// Apply `args` to `definition`
    pub fn new(definition: Arc<ClassDef>, args: Vec<Type>) -> TypeResult<Self> {
        if args.len() != definition.arity() {
            return Err(TypeError::InvalidTypeArgCount {
                name: definition.name().to_string(),
                expected: definition.arity(),
                actual: args.len(),
            });
        }
        Ok(Self { definition, args })
    }

    /// The definition over its own parameters (open for generic classes)
    pub fn open(definition: Arc<ClassDef>) -> Self {
        let args = definition.generic_types();
        Self { definition, args }
    }

    /// `object`
    pub fn object() -> Self {
        Self::open(ClassDef::object())
    }

    /// The definition
    pub fn definition(&self) -> &Arc<ClassDef> {
        &self.definition
    }

    /// Type arguments
    pub fn args(&self) -> &[Type] {
        &self.args
    }

    /// Class name
    pub fn name(&self) -> &str {
        self.definition.name()
    }

    /// Whether any type argument is still a formal parameter
    pub fn is_open(&self) -> bool {
        self.args.iter().any(Type::contains_params)
    }

    /// The class as a type expression
    pub fn as_type(&self) -> Type {
        if self.args.is_empty() {
            Type::named(self.definition.name())
        } else {
            Type::constructed(self.definition.name(), self.args.clone())
        }
    }

    /// Map from the definition's parameters to this type's arguments
    pub fn param_map(&self) -> TypeResult<TypeParameterMap> {
        TypeParameterMap::from_defs(self.definition.generic_params(), self.args.clone())
    }

    /// Base class with this type's arguments substituted
    pub fn base(&self) -> TypeResult<Option<ClassType>> {
        let Some(base) = self.definition.base() else {
            return Ok(None);
        };
        let map = self.param_map()?;
        let args = map.map_all(base.args());
        Ok(Some(ClassType::new(base.definition.clone(), args)?))
    }

    /// This type followed by every ancestor up to `object`
    pub fn hierarchy(&self) -> TypeResult<Vec<ClassType>> {
        let mut chain = vec![self.clone()];
        let mut current = self.base()?;
        while let Some(class) = current {
            current = class.base()?;
            chain.push(class);
        }
        Ok(chain)
    }

    /// Resolve an instance method virtually: the most derived declaration wins
    ///
    /// Returns the declaring class (with arguments substituted) and the method.
    /// When no overload has `generic_arity` type parameters, the first one
    /// matching name and parameter count is returned so the caller can report
    /// the arity mismatch.
    pub fn find_method(
        &self,
        name: &str,
        arity: usize,
        generic_arity: usize,
    ) -> TypeResult<Option<(ClassType, MethodDef)>> {
        let chain = self.hierarchy()?;
        let exact = chain.iter().find_map(|class| {
            class
                .definition
                .declared_method(name, arity, generic_arity)
                .map(|m| (class.clone(), m.clone()))
        });
        if exact.is_some() {
            return Ok(exact);
        }
        Ok(chain.into_iter().find_map(|class| {
            let method = class
                .definition
                .methods()
                .iter()
                .find(|m| is_overload(m, name, arity))
                .cloned();
            method.map(|m| (class, m))
        }))
    }

    /// Field names of an instance, inherited fields first
    pub fn field_layout(&self) -> TypeResult<Vec<String>> {
        let mut layout = Vec::new();
        for class in self.hierarchy()?.iter().rev() {
            layout.extend(class.definition.fields().iter().cloned());
        }
        Ok(layout)
    }

    /// Allocate and construct a plain (non-intercepted) instance
    pub fn instantiate(&self, args: &[Value]) -> CallResult<ObjectRef> {
        if self.is_open() {
            return Err(Fault::Argument(format!(
                "cannot instantiate open generic type {}",
                self.as_type()
            )));
        }
        if self.definition.is_abstract() || self.definition.kind() != ClassKind::Class {
            return Err(Fault::raised(
                "InvalidOperation",
                format!("cannot instantiate {}", self.as_type()),
            ));
        }
        let map = self.param_map()?;
        let ctor = self
            .definition
            .constructors()
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

        let object = Object::new(RuntimeClass::Plain(self.clone()), self.field_layout()?);
        let mut slots = args.to_vec();
        ctor.run(&mut Call::new(&object, &mut slots, &self.args, &[]))?;
        Ok(object)
    }
}

/// Whether `args` can be passed to `params` once mapped through `map`
pub(crate) fn arguments_fit(
    map: &TypeParameterMap,
    params: &[ParameterDescriptor],
    args: &[Value],
) -> bool {
    params.len() == args.len()
        && params
            .iter()
            .zip(args)
            .all(|(p, v)| p.is_out() || v.conforms_to(&map.map(&p.ty)))
}

impl fmt::Debug for ClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassType({})", self.as_type())
    }
}

impl PartialEq for ClassType {
    fn eq(&self, other: &Self) -> bool {
        self.definition.id() == other.definition.id() && self.args == other.args
    }
}

impl Eq for ClassType {}
