//! Proxy types
//!
//! The synthesizer turns a class into a `ProxyTypeDescriptor`: mirrored
//! generic parameters, forwarded constructors and one compiled handler
//! pipeline per intercepted method. A `ProxyClass` closes a descriptor over
//! type arguments and creates instances whose intercepted calls run through
//! those pipelines.

mod descriptor;
mod synthesizer;

pub use descriptor::{ForwardedConstructor, MethodOverride, ProxyClass, ProxyTypeDescriptor};
pub use synthesizer::Synthesizer;
