//! weave runtime
//!
//! Dynamic interception for a small runtime object model. A class registered
//! with a [`ProxyRegistry`] is replaced by a generated proxy type whose
//! overridable methods run through an ordered chain of [`CallHandler`]s
//! before the original body executes.
//!
//! # Overview
//!
//! - [`class`]: class definitions, constructors, method bodies
//! - [`object`]: instances and virtual dispatch
//! - [`invocation`]: what handlers see of a call
//! - [`handler`]: handler contract and configuration
//! - [`pipeline`]: onion-style handler chains
//! - [`analyzer`]: which methods can be intercepted
//! - [`proxy`]: proxy synthesis and closed proxy classes
//! - [`registry`]: get-or-create cache of proxy types

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod analyzer;
pub mod class;
pub mod error;
pub mod handler;
pub mod invocation;
pub mod object;
pub mod options;
pub mod pipeline;
pub mod proxy;
pub mod registry;
pub mod value;

pub use analyzer::{method_can_be_intercepted, Candidate};
pub use class::{
    Call, ClassBuilder, ClassDef, ClassId, ClassKind, ClassType, ConstructorDef, MethodDef,
    TypeVisibility,
};
pub use error::{CallResult, Fault, InterceptError, InterceptResult};
pub use handler::{
    handler_fn, resolve_handlers, CallHandler, HandlerFactory, HandlerSource, HandlerSpec,
    InterceptionConfig, SharedHandler,
};
pub use invocation::{ArgumentBuffer, MethodInvocation, MethodReturn, ParameterCollection};
pub use object::{Object, ObjectRef, RuntimeClass};
pub use options::ProxyOptions;
pub use pipeline::{InvokeFn, Next, Pipeline, PipelineBuilder};
pub use proxy::{ForwardedConstructor, MethodOverride, ProxyClass, ProxyTypeDescriptor, Synthesizer};
pub use registry::ProxyRegistry;
pub use value::Value;

pub use weave_types;
