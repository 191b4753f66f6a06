//! weave type model
//!
//! Plain-data description of the types an intercepted class is built from:
//! primitive and named types, constructed generics, arrays, by-reference
//! parameters and formal generic parameters, plus the method descriptors and
//! the chained generic-parameter substitution map used when synthesizing
//! proxies.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod error;
pub mod method;
pub mod param_map;
pub mod ty;

pub use error::{TypeError, TypeResult};
pub use method::{
    Accessibility, MethodDescriptor, MethodFlags, MethodKey, MethodKind, ParameterDescriptor,
    ParameterMode,
};
pub use param_map::TypeParameterMap;
pub use ty::{GenericParam, GenericParamDef, ParamOwner, PrimitiveType, SpecialConstraints, Type, Variance};
