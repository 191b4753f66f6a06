//! Handler pipeline
//!
//! A pipeline is an ordered handler list plus a terminal step. The first
//! handler is outermost: it sees the call first and the result last. Each
//! handler receives a `Next` that runs the rest of the chain, so the chain is
//! built once and every call walks the same slice.

use crate::handler::{CallHandler, HandlerSpec};
use crate::invocation::{MethodInvocation, MethodReturn};
use std::fmt;
use std::sync::Arc;

/// Innermost step of a chain
pub type InvokeFn = Arc<dyn Fn(&MethodInvocation) -> MethodReturn + Send + Sync>;

/// Continuation handed to a handler
#[derive(Clone, Copy)]
pub struct Next<'a> {
    handlers: &'a [HandlerSpec],
    terminal: &'a InvokeFn,
}

impl<'a> Next<'a> {
    /// Run the remainder of the chain
    ///
    /// May be called more than once; each call runs the remaining handlers and
    /// the terminal again against the same argument slots.
    pub fn proceed(&self, invocation: &MethodInvocation) -> MethodReturn {
        match self.handlers.split_first() {
            Some((first, rest)) => first.handler.invoke(
                invocation,
                Next {
                    handlers: rest,
                    terminal: self.terminal,
                },
            ),
            None => (self.terminal)(invocation),
        }
    }

    /// Handlers still ahead of the terminal
    pub fn remaining(&self) -> usize {
        self.handlers.len()
    }
}

/// Compiled handler chain for one method
pub struct Pipeline {
    handlers: Vec<HandlerSpec>,
    terminal: InvokeFn,
}

impl Pipeline {
    /// Compose `handlers` (outermost first) around `terminal`
    pub fn build(handlers: Vec<HandlerSpec>, terminal: InvokeFn) -> Self {
        Self { handlers, terminal }
    }

    /// Run the chain for one call
    pub fn invoke(&self, invocation: &MethodInvocation) -> MethodReturn {
        Next {
            handlers: &self.handlers,
            terminal: &self.terminal,
        }
        .proceed(invocation)
    }

    /// Number of handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the chain is only the terminal
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Handler names, outermost first
    pub fn handler_names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name.as_str()).collect()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("handlers", &self.handler_names())
            .finish()
    }
}

/// Incremental pipeline construction
pub struct PipelineBuilder {
    handlers: Vec<HandlerSpec>,
    terminal: InvokeFn,
}

impl PipelineBuilder {
    /// Start from a terminal step
    pub fn new<F>(terminal: F) -> Self
    where
        F: Fn(&MethodInvocation) -> MethodReturn + Send + Sync + 'static,
    {
        Self {
            handlers: Vec::new(),
            terminal: Arc::new(terminal),
        }
    }

    /// Append a handler inside the ones already added
    pub fn with(mut self, name: &str, order: i32, handler: Arc<dyn CallHandler>) -> Self {
        self.handlers.push(HandlerSpec {
            name: name.to_string(),
            order,
            handler,
        });
        self
    }

    /// Append an already resolved entry
    pub fn with_spec(mut self, spec: HandlerSpec) -> Self {
        self.handlers.push(spec);
        self
    }

    /// Finish the chain
    pub fn build(self) -> Pipeline {
        Pipeline::build(self.handlers, self.terminal)
    }
}
