//! Error types
//!
//! Two families that never mix: `InterceptError` is a configuration problem
//! found while registering or synthesizing a proxy, and is returned to the
//! caller immediately; `Fault` is something that went wrong during one call
//! and travels through the handler chain as data.

use weave_types::TypeError;

/// Result type for registration and synthesis
pub type InterceptResult<T> = Result<T, InterceptError>;

/// Result type for a single call
pub type CallResult<T> = Result<T, Fault>;

/// Reasons a type cannot be proxied
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum InterceptError {
    /// Interfaces and value types cannot be subclassed
    #[error("Type '{name}' cannot be intercepted: not a class")]
    NotAClass {
        /// Type name
        name: String,
    },

    /// Only public types are proxied
    #[error("Type '{name}' cannot be intercepted: not publicly visible")]
    NotPublic {
        /// Type name
        name: String,
    },

    /// Nested types are not proxied
    #[error("Type '{name}' cannot be intercepted: nested in '{outer}'")]
    Nested {
        /// Type name
        name: String,
        /// Enclosing type name
        outer: String,
    },

    /// Sealed (and static) classes cannot be derived from
    #[error("Type '{name}' cannot be intercepted: sealed")]
    Sealed {
        /// Type name
        name: String,
    },

    /// Nothing to forward construction to
    #[error("Type '{name}' has no constructor accessible to subclasses")]
    NoAccessibleConstructor {
        /// Type name
        name: String,
    },

    /// Malformed generic shape
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// A fault raised while executing an intercepted or plain call
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum Fault {
    /// Raised by user code (method bodies or handlers)
    #[error("{kind}: {message}")]
    Raised {
        /// Fault category, e.g. `InvalidOperation`
        kind: String,
        /// Human readable message
        message: String,
    },

    /// A value did not conform to the expected type
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected type
        expected: String,
        /// Actual value type
        got: String,
    },

    /// Bad argument count, name or index
    #[error("Argument error: {0}")]
    Argument(String),

    /// No such method, field or constructor
    #[error("Missing member: {0}")]
    MissingMember(String),

    /// The chain reached a method that has no body
    #[error("Cannot invoke abstract method {0}")]
    AbstractMethod(String),

    /// A method body panicked
    #[error("Method panicked: {0}")]
    Panic(String),

    /// Generic shape could not be closed for this call
    #[error(transparent)]
    Type(#[from] TypeError),
}

impl Fault {
    /// Build a user-level fault
    pub fn raised(kind: &str, message: impl Into<String>) -> Self {
        Fault::Raised {
            kind: kind.to_string(),
            message: message.into(),
        }
    }
}
