//! Outcome of an intercepted call

use super::parameters::ParameterCollection;
use crate::error::{CallResult, Fault};
use crate::value::Value;
use once_cell::sync::Lazy;

static NO_OUTPUTS: Lazy<ParameterCollection> = Lazy::new(ParameterCollection::default);

/// Either a return value with by-ref outputs, or a fault
#[derive(Debug, Clone)]
pub struct MethodReturn {
    outcome: Result<Value, Fault>,
    outputs: ParameterCollection,
}

impl MethodReturn {
    pub(crate) fn new(outcome: Result<Value, Fault>, outputs: ParameterCollection) -> Self {
        Self { outcome, outputs }
    }

    /// Return value, absent when faulted
    pub fn return_value(&self) -> Option<&Value> {
        self.outcome.as_ref().ok()
    }

    /// Fault, absent on success
    pub fn fault(&self) -> Option<&Fault> {
        self.outcome.as_ref().err()
    }

    /// Whether the call faulted
    pub fn is_fault(&self) -> bool {
        self.outcome.is_err()
    }

    /// `ref` and `out` parameters; empty when faulted
    pub fn outputs(&self) -> &ParameterCollection {
        if self.outcome.is_err() {
            &*NO_OUTPUTS
        } else {
            &self.outputs
        }
    }

    /// Replace the outcome with a value
    pub fn set_return_value(&mut self, value: Value) {
        self.outcome = Ok(value);
    }

    /// Replace the outcome with a fault
    pub fn set_fault(&mut self, fault: Fault) {
        self.outcome = Err(fault);
    }

    /// Consume into a plain result
    pub fn into_result(self) -> CallResult<Value> {
        self.outcome
    }
}
