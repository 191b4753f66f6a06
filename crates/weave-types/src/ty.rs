//! Core type definitions

use std::fmt;

/// Built-in types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// No value (method return only)
    Void,
    /// `bool`
    Bool,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 64-bit float
    Float64,
    /// UTF-8 string (reference type)
    String,
    /// The universal base type every class derives from
    Object,
}

impl PrimitiveType {
    /// Whether values of this type are copied rather than referenced
    pub fn is_value_type(self) -> bool {
        matches!(
            self,
            PrimitiveType::Bool | PrimitiveType::Int32 | PrimitiveType::Int64 | PrimitiveType::Float64
        )
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveType::Void => write!(f, "void"),
            PrimitiveType::Bool => write!(f, "bool"),
            PrimitiveType::Int32 => write!(f, "i32"),
            PrimitiveType::Int64 => write!(f, "i64"),
            PrimitiveType::Float64 => write!(f, "f64"),
            PrimitiveType::String => write!(f, "string"),
            PrimitiveType::Object => write!(f, "object"),
        }
    }
}

/// What declares a generic parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamOwner {
    /// Declared by a generic type definition
    Type(String),
    /// Declared by a generic method
    Method {
        /// Declaring type name
        declaring: String,
        /// Method name
        method: String,
    },
}

/// A formal generic parameter
///
/// Identity is the owner plus the position; the name is carried along for
/// display and for re-declaring the parameter on generated types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenericParam {
    /// Declaring type or method
    pub owner: ParamOwner,
    /// Position in the owner's parameter list
    pub position: usize,
    /// Source name (`T`, `K`, ...)
    pub name: String,
}

impl GenericParam {
    /// Parameter declared by a type
    pub fn of_type(type_name: &str, position: usize, name: &str) -> Self {
        Self {
            owner: ParamOwner::Type(type_name.to_string()),
            position,
            name: name.to_string(),
        }
    }

    /// Parameter declared by a method
    pub fn of_method(declaring: &str, method: &str, position: usize, name: &str) -> Self {
        Self {
            owner: ParamOwner::Method {
                declaring: declaring.to_string(),
                method: method.to_string(),
            },
            position,
            name: name.to_string(),
        }
    }

    /// Whether this parameter belongs to a method
    pub fn is_method_param(&self) -> bool {
        matches!(self.owner, ParamOwner::Method { .. })
    }
}

/// Variance annotation of a generic parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Variance {
    /// No variance
    #[default]
    Invariant,
    /// `out T`
    Covariant,
    /// `in T`
    Contravariant,
}

/// Non-type constraints on a generic parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SpecialConstraints {
    /// Argument must be a reference type
    pub reference_type: bool,
    /// Argument must be a value type
    pub value_type: bool,
    /// Argument must have a parameterless constructor
    pub default_constructor: bool,
}

/// Full declaration of a generic parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenericParamDef {
    /// The parameter itself
    pub param: GenericParam,
    /// Variance annotation
    pub variance: Variance,
    /// Base class and interface constraints
    pub constraints: Vec<Type>,
    /// Reference / value / constructor constraints
    pub special: SpecialConstraints,
}

impl GenericParamDef {
    /// Unconstrained, invariant parameter
    pub fn new(param: GenericParam) -> Self {
        Self {
            param,
            variance: Variance::Invariant,
            constraints: Vec::new(),
            special: SpecialConstraints::default(),
        }
    }

    /// Add a type constraint
    pub fn with_constraint(mut self, constraint: Type) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Set the variance
    pub fn with_variance(mut self, variance: Variance) -> Self {
        self.variance = variance;
        self
    }

    /// Set the special constraints
    pub fn with_special(mut self, special: SpecialConstraints) -> Self {
        self.special = special;
        self
    }

    /// The parameter as a type
    pub fn as_type(&self) -> Type {
        Type::Param(self.param.clone())
    }

    /// Check the special constraints against a type argument
    ///
    /// Returns the name of the violated constraint, if any. Type constraints
    /// are nominal and are not checked here.
    pub fn violated_by(&self, argument: &Type) -> Option<&'static str> {
        if argument.is_param() {
            return None;
        }
        if self.special.value_type && !argument.is_value_type() {
            return Some("struct");
        }
        if self.special.reference_type && argument.is_value_type() {
            return Some("class");
        }
        None
    }
}

/// The type representation shared by signatures, maps and runtime checks
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Built-in type
    Primitive(PrimitiveType),

    /// Non-generic class or interface, by name
    Named(String),

    /// Generic definition applied to arguments: `Box<T>`, `Map<string, i64>`
    Constructed {
        /// Generic definition name
        definition: String,
        /// Type arguments
        args: Vec<Type>,
    },

    /// Array of `rank` dimensions
    Array {
        /// Element type
        element: Box<Type>,
        /// Number of dimensions (1 for `T[]`)
        rank: u32,
    },

    /// By-reference parameter type (`ref T` / `out T`)
    ByRef(Box<Type>),

    /// Formal generic parameter
    Param(GenericParam),
}

impl Type {
    /// `void`
    pub fn void() -> Self {
        Type::Primitive(PrimitiveType::Void)
    }

    /// `bool`
    pub fn bool() -> Self {
        Type::Primitive(PrimitiveType::Bool)
    }

    /// `i32`
    pub fn i32() -> Self {
        Type::Primitive(PrimitiveType::Int32)
    }

    /// `i64`
    pub fn i64() -> Self {
        Type::Primitive(PrimitiveType::Int64)
    }

    /// `f64`
    pub fn f64() -> Self {
        Type::Primitive(PrimitiveType::Float64)
    }

    /// `string`
    pub fn string() -> Self {
        Type::Primitive(PrimitiveType::String)
    }

    /// The universal base type
    pub fn object() -> Self {
        Type::Primitive(PrimitiveType::Object)
    }

    /// Named non-generic class
    pub fn named(name: &str) -> Self {
        Type::Named(name.to_string())
    }

    /// Constructed generic type
    pub fn constructed(definition: &str, args: Vec<Type>) -> Self {
        Type::Constructed {
            definition: definition.to_string(),
            args,
        }
    }

    /// One-dimensional array
    pub fn array_of(element: Type) -> Self {
        Type::Array {
            element: Box::new(element),
            rank: 1,
        }
    }

    /// Multi-dimensional array
    pub fn array_with_rank(element: Type, rank: u32) -> Self {
        Type::Array {
            element: Box::new(element),
            rank,
        }
    }

    /// By-reference wrapper
    pub fn by_ref(inner: Type) -> Self {
        Type::ByRef(Box::new(inner))
    }

    /// Type parameter of a generic type
    pub fn type_param(type_name: &str, position: usize, name: &str) -> Self {
        Type::Param(GenericParam::of_type(type_name, position, name))
    }

    /// Type parameter of a generic method
    pub fn method_param(declaring: &str, method: &str, position: usize, name: &str) -> Self {
        Type::Param(GenericParam::of_method(declaring, method, position, name))
    }

    /// Check if this is a formal generic parameter
    pub fn is_param(&self) -> bool {
        matches!(self, Type::Param(_))
    }

    /// Check if this is `void`
    pub fn is_void(&self) -> bool {
        matches!(self, Type::Primitive(PrimitiveType::Void))
    }

    /// Check if this is a by-reference type
    pub fn is_by_ref(&self) -> bool {
        matches!(self, Type::ByRef(_))
    }

    /// Check if this is a value type
    pub fn is_value_type(&self) -> bool {
        match self {
            Type::Primitive(p) => p.is_value_type(),
            _ => false,
        }
    }

    /// Whether any generic parameter occurs anywhere in this type
    pub fn contains_params(&self) -> bool {
        match self {
            Type::Param(_) => true,
            Type::Constructed { args, .. } => args.iter().any(Type::contains_params),
            Type::Array { element, .. } | Type::ByRef(element) => element.contains_params(),
            Type::Primitive(_) | Type::Named(_) => false,
        }
    }

    /// Element type of an array or by-reference type
    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Array { element, .. } | Type::ByRef(element) => Some(element),
            _ => None,
        }
    }

    /// Strip one by-reference layer, if present
    pub fn without_by_ref(&self) -> &Type {
        match self {
            Type::ByRef(inner) => inner,
            other => other,
        }
    }

    /// Get the generic parameter if this is one
    pub fn as_param(&self) -> Option<&GenericParam> {
        match self {
            Type::Param(p) => Some(p),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(p) => write!(f, "{}", p),
            Type::Named(name) => write!(f, "{}", name),
            Type::Constructed { definition, args } => {
                write!(f, "{}<", definition)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ">")
            }
            Type::Array { element, rank } => {
                write!(f, "{}[", element)?;
                for _ in 1..*rank {
                    write!(f, ",")?;
                }
                write!(f, "]")
            }
            Type::ByRef(inner) => write!(f, "ref {}", inner),
            Type::Param(p) => write!(f, "{}", p.name),
        }
    }
}
