//! Invocation context model
//!
//! What handlers see of a call: the `MethodInvocation` going in, the
//! `MethodReturn` coming out, and the parameter collections that expose the
//! call's argument slots by position and by name.

mod method_invocation;
mod method_return;
mod parameters;

pub use method_invocation::MethodInvocation;
pub use method_return::MethodReturn;
pub use parameters::{ArgumentBuffer, ParameterCollection};
