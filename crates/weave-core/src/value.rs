//! Runtime values
//!
//! Arguments, return values and fields are all `Value`s. Objects are shared
//! by reference; everything else is copied.

use crate::error::{CallResult, Fault};
use crate::object::ObjectRef;
use std::fmt;
use std::sync::Arc;
use weave_types::{PrimitiveType, Type};

/// Dynamically typed runtime value
#[derive(Clone, Default)]
pub enum Value {
    /// Absence of a value; also the result of `void` calls
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Integer (both `i32` and `i64` slots)
    Int(i64),
    /// Float
    Float(f64),
    /// String
    Str(Arc<str>),
    /// Array; multi-dimensional arrays nest
    Array(Vec<Value>),
    /// Object reference
    Object(ObjectRef),
}

impl Value {
    /// Build a string value
    pub fn str(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }

    /// Check for null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the integer if this is one
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the float, widening integers
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get the boolean if this is one
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the string if this is one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get the array elements if this is an array
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Get the object if this is one
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Name of the runtime type, for diagnostics
    pub fn type_name(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::Str(_) => "string".to_string(),
            Value::Array(_) => "array".to_string(),
            Value::Object(o) => o.class_name().to_string(),
        }
    }

    /// Whether this value may be stored in a slot of type `ty`
    ///
    /// Unbound generic parameters accept anything; integers are accepted
    /// where floats are expected.
    pub fn conforms_to(&self, ty: &Type) -> bool {
        let ty = ty.without_by_ref();
        match ty {
            Type::Param(_) => true,
            Type::Primitive(p) => match (p, self) {
                (PrimitiveType::Object, _) => true,
                (PrimitiveType::Void, Value::Null) => true,
                (PrimitiveType::Bool, Value::Bool(_)) => true,
                (PrimitiveType::Int32, Value::Int(i)) => i32::try_from(*i).is_ok(),
                (PrimitiveType::Int64, Value::Int(_)) => true,
                (PrimitiveType::Float64, Value::Float(_) | Value::Int(_)) => true,
                (PrimitiveType::String, Value::Str(_) | Value::Null) => true,
                _ => false,
            },
            Type::Named(_) | Type::Constructed { .. } => match self {
                Value::Null => true,
                Value::Object(o) => o.instance_of(ty),
                _ => false,
            },
            Type::Array { element, rank } => match self {
                Value::Null => true,
                Value::Array(items) => {
                    if *rank <= 1 {
                        items.iter().all(|v| v.conforms_to(element))
                    } else {
                        let inner = Type::array_with_rank((**element).clone(), rank - 1);
                        items.iter().all(|v| v.conforms_to(&inner))
                    }
                }
                _ => false,
            },
            Type::ByRef(inner) => self.conforms_to(inner),
        }
    }

    /// Convert a value returned through the chain to the declared return type
    pub fn coerce_to(self, ty: &Type) -> CallResult<Value> {
        match (ty.without_by_ref(), self) {
            (Type::Primitive(PrimitiveType::Void), _) => Ok(Value::Null),
            (Type::Primitive(PrimitiveType::Float64), Value::Int(i)) => Ok(Value::Float(i as f64)),
            (ty, value) => {
                if value.conforms_to(ty) {
                    Ok(value)
                } else {
                    Err(Fault::TypeMismatch {
                        expected: ty.to_string(),
                        got: value.type_name(),
                    })
                }
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Array(items) => f.debug_list().entries(items).finish(),
            Value::Object(o) => write!(f, "<{} instance>", o.class_name()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Value::Object(o)
    }
}
