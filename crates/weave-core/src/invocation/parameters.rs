//! Argument buffer and parameter projections

use crate::error::{CallResult, Fault};
use crate::value::Value;
use parking_lot::RwLock;
use std::sync::Arc;
use weave_types::ParameterDescriptor;

/// Shared, mutable argument slots of one call
///
/// Every collection created for a call views the same buffer, so a write
/// through `arguments` is visible through `inputs` and through the outputs of
/// the return.
#[derive(Debug, Clone, Default)]
pub struct ArgumentBuffer(Arc<RwLock<Vec<Value>>>);

impl ArgumentBuffer {
    /// Wrap the caller's argument values
    pub fn new(values: Vec<Value>) -> Self {
        Self(Arc::new(RwLock::new(values)))
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// Whether there are no slots
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Read slot `index`
    pub fn get(&self, index: usize) -> CallResult<Value> {
        self.0
            .read()
            .get(index)
            .cloned()
            .ok_or_else(|| Fault::Argument(format!("argument slot {} out of range", index)))
    }

    /// Write slot `index`
    pub fn set(&self, index: usize, value: Value) -> CallResult<()> {
        let mut slots = self.0.write();
        let slot = slots
            .get_mut(index)
            .ok_or_else(|| Fault::Argument(format!("argument slot {} out of range", index)))?;
        *slot = value;
        Ok(())
    }

    /// Copy of all slots
    pub fn snapshot(&self) -> Vec<Value> {
        self.0.read().clone()
    }

    /// Copy the given slots of `values` back into the buffer
    pub(crate) fn write_back(&self, indices: &[usize], values: &[Value]) {
        let mut slots = self.0.write();
        for &index in indices {
            if let (Some(slot), Some(value)) = (slots.get_mut(index), values.get(index)) {
                *slot = value.clone();
            }
        }
    }
}

/// Ordered view over a subset of a call's parameters
///
/// Positions in the collection are 0-based over the subset; each maps to the
/// original argument position in the buffer.
#[derive(Debug, Clone, Default)]
pub struct ParameterCollection {
    buffer: ArgumentBuffer,
    slots: Vec<(usize, ParameterDescriptor)>,
}

impl ParameterCollection {
    /// Project the parameters accepted by `include`
    pub fn new<F>(buffer: ArgumentBuffer, parameters: &[ParameterDescriptor], include: F) -> Self
    where
        F: Fn(&ParameterDescriptor) -> bool,
    {
        let slots = parameters
            .iter()
            .enumerate()
            .filter(|(_, p)| include(p))
            .map(|(index, p)| (index, p.clone()))
            .collect();
        Self { buffer, slots }
    }

    /// Every parameter
    pub fn all(buffer: ArgumentBuffer, parameters: &[ParameterDescriptor]) -> Self {
        Self::new(buffer, parameters, |_| true)
    }

    /// Number of parameters in the view
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the view is empty
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot(&self, index: usize) -> CallResult<usize> {
        self.slots.get(index).map(|(slot, _)| *slot).ok_or_else(|| {
            Fault::Argument(format!(
                "index {} out of range for {} parameter(s)",
                index,
                self.slots.len()
            ))
        })
    }

    fn slot_by_name(&self, name: &str) -> CallResult<usize> {
        self.slots
            .iter()
            .find(|(_, p)| p.name == name)
            .map(|(slot, _)| *slot)
            .ok_or_else(|| Fault::Argument(format!("invalid parameter name '{}'", name)))
    }

    /// Value at `index`
    pub fn get(&self, index: usize) -> CallResult<Value> {
        self.buffer.get(self.slot(index)?)
    }

    /// Replace the value at `index`
    pub fn set(&self, index: usize, value: Value) -> CallResult<()> {
        self.buffer.set(self.slot(index)?, value)
    }

    /// Value of the parameter called `name`
    pub fn get_by_name(&self, name: &str) -> CallResult<Value> {
        self.buffer.get(self.slot_by_name(name)?)
    }

    /// Replace the value of the parameter called `name`
    pub fn set_by_name(&self, name: &str, value: Value) -> CallResult<()> {
        self.buffer.set(self.slot_by_name(name)?, value)
    }

    /// Name of the parameter at `index`
    pub fn parameter_name(&self, index: usize) -> Option<&str> {
        self.slots.get(index).map(|(_, p)| p.name.as_str())
    }

    /// Descriptor of the parameter at `index`
    pub fn parameter_info(&self, index: usize) -> Option<&ParameterDescriptor> {
        self.slots.get(index).map(|(_, p)| p)
    }

    /// Whether a parameter called `name` is in the view
    pub fn contains_parameter(&self, name: &str) -> bool {
        self.slots.iter().any(|(_, p)| p.name == name)
    }

    /// Whether any value in the view equals `value`
    pub fn contains_value(&self, value: &Value) -> bool {
        self.values().iter().any(|v| v == value)
    }

    /// Position of `name` within the view
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|(_, p)| p.name == name)
    }

    /// Original argument position of the view's `index`
    pub fn argument_position(&self, index: usize) -> Option<usize> {
        self.slots.get(index).map(|(slot, _)| *slot)
    }

    /// Current values, in view order
    pub fn values(&self) -> Vec<Value> {
        let all = self.buffer.snapshot();
        self.slots
            .iter()
            .filter_map(|(slot, _)| all.get(*slot).cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_types::{MethodDescriptor, Type};

    fn try_parse() -> MethodDescriptor {
        MethodDescriptor::new("Parser", "try_parse")
            .param("text", Type::string())
            .ref_param("attempts", Type::i32())
            .out_param("value", Type::i32())
            .returns(Type::bool())
    }

    #[test]
    fn test_projection_maps_positions() {
        let method = try_parse();
        let buffer = ArgumentBuffer::new(vec![Value::str("42"), Value::Int(0), Value::Null]);
        let inputs = ParameterCollection::new(buffer.clone(), &method.parameters, |p| !p.is_out());
        let outputs = ParameterCollection::new(buffer, &method.parameters, |p| p.is_by_ref());

        assert_eq!(inputs.len(), 2);
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs.parameter_name(0), Some("attempts"));
        assert_eq!(outputs.argument_position(1), Some(2));
        assert_eq!(inputs.position_of("attempts"), Some(1));
        assert_eq!(inputs.position_of("value"), None);
    }

    #[test]
    fn test_writes_are_shared() {
        let method = try_parse();
        let buffer = ArgumentBuffer::new(vec![Value::str("42"), Value::Int(0), Value::Null]);
        let all = ParameterCollection::all(buffer.clone(), &method.parameters);
        let inputs = ParameterCollection::new(buffer, &method.parameters, |p| !p.is_out());

        all.set_by_name("attempts", Value::Int(3)).unwrap();
        assert_eq!(inputs.get(1).unwrap(), Value::Int(3));
        assert!(inputs.contains_value(&Value::str("42")));
        assert!(inputs.contains_parameter("text"));
    }

    #[test]
    fn test_invalid_name_and_index() {
        let method = try_parse();
        let buffer = ArgumentBuffer::new(vec![Value::Null; 3]);
        let all = ParameterCollection::all(buffer, &method.parameters);
        assert!(matches!(all.get_by_name("nope"), Err(Fault::Argument(_))));
        assert!(matches!(all.set(7, Value::Null), Err(Fault::Argument(_))));
        assert!(all.parameter_info(7).is_none());
    }
}
