//! Type system errors

use thiserror::Error;

/// Result alias for type-model operations
pub type TypeResult<T> = Result<T, TypeError>;

/// Errors raised while building or applying type maps
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    /// Two parameter lists paired into a map differ in length
    #[error("Mapped parameters do not match: {expected} reflected, {actual} generated")]
    ParameterCountMismatch {
        /// Number of reflected (source) parameters
        expected: usize,
        /// Number of generated (target) parameters
        actual: usize,
    },

    /// A generic definition was closed with the wrong number of arguments
    #[error("Invalid type argument count for {name}: expected {expected}, got {actual}")]
    InvalidTypeArgCount {
        /// Generic definition name
        name: String,
        /// Declared arity
        expected: usize,
        /// Supplied arguments
        actual: usize,
    },

    /// A type argument does not satisfy a parameter constraint
    #[error("Type argument {argument} violates constraint '{constraint}' on {param}")]
    ConstraintViolation {
        /// Parameter name
        param: String,
        /// Offending argument
        argument: String,
        /// Constraint description
        constraint: String,
    },
}
