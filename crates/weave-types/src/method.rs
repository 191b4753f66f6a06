//! Method descriptors
//!
//! Read-only identity of a method: what it is called, what it takes and
//! returns, which generic parameters it declares, and the modifiers that
//! decide whether it may be overridden.

use crate::ty::{GenericParam, GenericParamDef, Type};
use std::fmt;

/// Member accessibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Accessibility {
    /// Visible everywhere
    #[default]
    Public,
    /// Visible to subclasses
    Protected,
    /// Visible to subclasses and the declaring assembly
    ProtectedInternal,
    /// Visible to the declaring assembly
    Internal,
    /// Visible to subclasses inside the declaring assembly
    PrivateProtected,
    /// Visible to the declaring type only
    Private,
}

impl Accessibility {
    /// Whether a subclass generated elsewhere may override or call the member
    pub fn visible_to_subclasses(self) -> bool {
        matches!(
            self,
            Accessibility::Public | Accessibility::Protected | Accessibility::ProtectedInternal
        )
    }
}

/// What kind of member a method is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MethodKind {
    /// Plain method
    #[default]
    Ordinary,
    /// Property getter
    Getter,
    /// Property setter
    Setter,
    /// Operator overload
    Operator,
}

/// Override-related modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MethodFlags {
    /// Dispatched through the vtable
    pub is_virtual: bool,
    /// Virtual but may not be overridden further
    pub is_final: bool,
    /// Declared without a body
    pub is_abstract: bool,
    /// Not bound to an instance
    pub is_static: bool,
}

/// How an argument is passed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParameterMode {
    /// By value
    #[default]
    In,
    /// By reference, read and written
    Ref,
    /// By reference, written only
    Out,
}

/// One formal parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterDescriptor {
    /// Parameter name
    pub name: String,
    /// Declared type (the referent for by-reference parameters)
    pub ty: Type,
    /// Passing mode
    pub mode: ParameterMode,
}

impl ParameterDescriptor {
    /// By-value parameter
    pub fn new(name: &str, ty: Type) -> Self {
        Self {
            name: name.to_string(),
            ty,
            mode: ParameterMode::In,
        }
    }

    /// Whether the argument slot is written back to the caller
    pub fn is_by_ref(&self) -> bool {
        self.mode != ParameterMode::In
    }

    /// Whether the parameter is output-only
    pub fn is_out(&self) -> bool {
        self.mode == ParameterMode::Out
    }

    /// Type as it appears in the signature (`ref T` for by-reference)
    pub fn signature_type(&self) -> Type {
        if self.is_by_ref() {
            Type::by_ref(self.ty.clone())
        } else {
            self.ty.clone()
        }
    }
}

/// Override identity: two methods with the same key occupy the same vtable slot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodKey {
    /// Method name
    pub name: String,
    /// Number of parameters
    pub arity: usize,
    /// Number of method generic parameters
    pub generic_arity: usize,
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)?;
        if self.generic_arity > 0 {
            write!(f, "`{}", self.generic_arity)?;
        }
        Ok(())
    }
}

/// Method identity and signature
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    /// Method name
    pub name: String,
    /// Name of the declaring type
    pub declaring_type: String,
    /// Formal parameters in declaration order
    pub parameters: Vec<ParameterDescriptor>,
    /// Return type
    pub return_type: Type,
    /// Method-level generic parameters
    pub generic_params: Vec<GenericParamDef>,
    /// Accessibility
    pub accessibility: Accessibility,
    /// Member kind
    pub kind: MethodKind,
    /// Modifiers
    pub flags: MethodFlags,
}

impl MethodDescriptor {
    /// Public, ordinary, non-virtual `void` method with no parameters
    pub fn new(declaring_type: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            declaring_type: declaring_type.to_string(),
            parameters: Vec::new(),
            return_type: Type::void(),
            generic_params: Vec::new(),
            accessibility: Accessibility::Public,
            kind: MethodKind::Ordinary,
            flags: MethodFlags::default(),
        }
    }

    /// Add a by-value parameter
    pub fn param(mut self, name: &str, ty: Type) -> Self {
        self.parameters.push(ParameterDescriptor::new(name, ty));
        self
    }

    /// Add a `ref` parameter
    pub fn ref_param(mut self, name: &str, ty: Type) -> Self {
        self.parameters.push(ParameterDescriptor {
            mode: ParameterMode::Ref,
            ..ParameterDescriptor::new(name, ty)
        });
        self
    }

    /// Add an `out` parameter
    pub fn out_param(mut self, name: &str, ty: Type) -> Self {
        self.parameters.push(ParameterDescriptor {
            mode: ParameterMode::Out,
            ..ParameterDescriptor::new(name, ty)
        });
        self
    }

    /// Set the return type
    pub fn returns(mut self, ty: Type) -> Self {
        self.return_type = ty;
        self
    }

    /// Declare a method generic parameter and return the descriptor
    pub fn generic(mut self, name: &str) -> Self {
        let param = GenericParam::of_method(
            &self.declaring_type,
            &self.name,
            self.generic_params.len(),
            name,
        );
        self.generic_params.push(GenericParamDef::new(param));
        self
    }

    /// Declare a fully specified method generic parameter
    pub fn generic_def(mut self, def: GenericParamDef) -> Self {
        self.generic_params.push(def);
        self
    }

    /// The method generic parameter at `position` as a type
    pub fn generic_type(&self, position: usize) -> Type {
        Type::method_param(&self.declaring_type, &self.name, position, self.generic_name(position))
    }

    fn generic_name(&self, position: usize) -> &str {
        self.generic_params
            .get(position)
            .map(|d| d.param.name.as_str())
            .unwrap_or("T")
    }

    /// Mark as virtual
    pub fn as_virtual(mut self) -> Self {
        self.flags.is_virtual = true;
        self
    }

    /// Mark as a sealed override (virtual and final)
    pub fn as_sealed(mut self) -> Self {
        self.flags.is_virtual = true;
        self.flags.is_final = true;
        self
    }

    /// Mark as abstract (implies virtual)
    pub fn as_abstract(mut self) -> Self {
        self.flags.is_virtual = true;
        self.flags.is_abstract = true;
        self
    }

    /// Mark as static
    pub fn as_static(mut self) -> Self {
        self.flags.is_static = true;
        self
    }

    /// Set accessibility
    pub fn with_access(mut self, accessibility: Accessibility) -> Self {
        self.accessibility = accessibility;
        self
    }

    /// Set member kind
    pub fn with_kind(mut self, kind: MethodKind) -> Self {
        self.kind = kind;
        self
    }

    /// Vtable slot identity
    pub fn key(&self) -> MethodKey {
        MethodKey {
            name: self.name.clone(),
            arity: self.parameters.len(),
            generic_arity: self.generic_params.len(),
        }
    }

    /// Whether the method declares its own generic parameters
    pub fn is_generic(&self) -> bool {
        !self.generic_params.is_empty()
    }

    /// Whether the method returns nothing
    pub fn is_void(&self) -> bool {
        self.return_type.is_void()
    }

    /// Signature types of all parameters, in declaration order
    pub fn parameter_types(&self) -> Vec<Type> {
        self.parameters.iter().map(|p| p.signature_type()).collect()
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}::{}", self.return_type, self.declaring_type, self.name)?;
        if self.is_generic() {
            write!(f, "<")?;
            for (i, g) in self.generic_params.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", g.param.name)?;
            }
            write!(f, ">")?;
        }
        write!(f, "(")?;
        for (i, p) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match p.mode {
                ParameterMode::In => write!(f, "{} {}", p.ty, p.name)?,
                ParameterMode::Ref => write!(f, "ref {} {}", p.ty, p.name)?,
                ParameterMode::Out => write!(f, "out {} {}", p.ty, p.name)?,
            }
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let m = MethodDescriptor::new("Account", "balance");
        assert_eq!(m.accessibility, Accessibility::Public);
        assert_eq!(m.kind, MethodKind::Ordinary);
        assert!(!m.flags.is_virtual);
        assert!(m.is_void());
    }

    #[test]
    fn test_generic_params_are_owned_by_method() {
        let m = MethodDescriptor::new("Repo", "convert").generic("U");
        let u = m.generic_type(0);
        assert_eq!(u, Type::method_param("Repo", "convert", 0, "U"));
        assert_eq!(m.key().generic_arity, 1);
    }

    #[test]
    fn test_display_signature() {
        let m = MethodDescriptor::new("Parser", "try_parse")
            .param("text", Type::string())
            .out_param("value", Type::i32())
            .returns(Type::bool());
        assert_eq!(m.to_string(), "bool Parser::try_parse(string text, out i32 value)");
        assert_eq!(m.parameter_types()[1], Type::by_ref(Type::i32()));
    }

    #[test]
    fn test_visibility_to_subclasses() {
        assert!(Accessibility::Public.visible_to_subclasses());
        assert!(Accessibility::Protected.visible_to_subclasses());
        assert!(Accessibility::ProtectedInternal.visible_to_subclasses());
        assert!(!Accessibility::Internal.visible_to_subclasses());
        assert!(!Accessibility::PrivateProtected.visible_to_subclasses());
        assert!(!Accessibility::Private.visible_to_subclasses());
    }

    #[test]
    fn test_sealed_implies_virtual() {
        let m = MethodDescriptor::new("A", "f").as_sealed();
        assert!(m.flags.is_virtual && m.flags.is_final);
    }
}
