//! Handler contract and configuration
//!
//! Handlers are produced by named, ordered factories. Where the factories
//! come from is a `HandlerSource` concern; the synthesizer asks a source for
//! the class-level factories of every class in the hierarchy and the
//! method-level factories of every declaration of one method, and turns them
//! into an ordered `HandlerSpec` list.

use crate::class::{ClassDef, ClassType};
use crate::invocation::{MethodInvocation, MethodReturn};
use crate::pipeline::Next;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;
use weave_types::MethodDescriptor;

/// A cross-cutting step of an intercepted call
///
/// Call `next.proceed(invocation)` to continue down the chain; return without
/// calling it to short-circuit.
pub trait CallHandler: Send + Sync {
    /// Handle one call
    fn invoke(&self, invocation: &MethodInvocation, next: Next<'_>) -> MethodReturn;
}

impl<F> CallHandler for F
where
    F: Fn(&MethodInvocation, Next<'_>) -> MethodReturn + Send + Sync,
{
    fn invoke(&self, invocation: &MethodInvocation, next: Next<'_>) -> MethodReturn {
        self(invocation, next)
    }
}

/// Wrap a closure as a shared handler
pub fn handler_fn<F>(f: F) -> Arc<dyn CallHandler>
where
    F: Fn(&MethodInvocation, Next<'_>) -> MethodReturn + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Produces handler instances for generated overrides
pub trait HandlerFactory: Send + Sync {
    /// Name used in logs and diagnostics
    fn name(&self) -> &str;

    /// Position in the chain; lower runs further out
    fn order(&self) -> i32 {
        0
    }

    /// Create the handler for one override
    fn create(&self) -> Arc<dyn CallHandler>;
}

/// Factory handing out one shared handler instance
#[derive(Clone)]
pub struct SharedHandler {
    name: String,
    order: i32,
    handler: Arc<dyn CallHandler>,
}

impl SharedHandler {
    /// Share `handler` under `name` at `order`
    pub fn new(name: &str, order: i32, handler: Arc<dyn CallHandler>) -> Self {
        Self {
            name: name.to_string(),
            order,
            handler,
        }
    }

    /// Share a closure under `name` at `order`
    pub fn from_fn<F>(name: &str, order: i32, f: F) -> Self
    where
        F: Fn(&MethodInvocation, Next<'_>) -> MethodReturn + Send + Sync + 'static,
    {
        Self::new(name, order, handler_fn(f))
    }
}

impl HandlerFactory for SharedHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn create(&self) -> Arc<dyn CallHandler> {
        self.handler.clone()
    }
}

/// A resolved chain entry
#[derive(Clone)]
pub struct HandlerSpec {
    /// Factory name
    pub name: String,
    /// Priority, ascending
    pub order: i32,
    /// Handler instance
    pub handler: Arc<dyn CallHandler>,
}

impl HandlerSpec {
    /// Instantiate from a factory
    pub fn from_factory(factory: &dyn HandlerFactory) -> Self {
        Self {
            name: factory.name().to_string(),
            order: factory.order(),
            handler: factory.create(),
        }
    }
}

impl fmt::Debug for HandlerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerSpec")
            .field("name", &self.name)
            .field("order", &self.order)
            .finish()
    }
}

/// Where handler factories are declared
pub trait HandlerSource: Send + Sync {
    /// Factories applying to every candidate method of `class`
    fn type_handlers(&self, class: &ClassDef) -> Vec<Arc<dyn HandlerFactory>>;

    /// Factories applying to one method, keyed by its declaration
    fn method_handlers(&self, method: &MethodDescriptor) -> Vec<Arc<dyn HandlerFactory>>;

    /// Whether `class` has class-level configuration
    fn has_type_handlers(&self, class: &ClassDef) -> bool {
        !self.type_handlers(class).is_empty()
    }

    /// Whether `method` has method-level configuration
    fn has_method_handlers(&self, method: &MethodDescriptor) -> bool {
        !self.method_handlers(method).is_empty()
    }
}

/// In-memory handler configuration
#[derive(Clone, Default)]
pub struct InterceptionConfig {
    types: FxHashMap<String, Vec<Arc<dyn HandlerFactory>>>,
    methods: FxHashMap<(String, String), Vec<Arc<dyn HandlerFactory>>>,
}

impl InterceptionConfig {
    /// Empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `factory` to every candidate method of `class_name`
    pub fn intercept_type(mut self, class_name: &str, factory: Arc<dyn HandlerFactory>) -> Self {
        self.types
            .entry(class_name.to_string())
            .or_default()
            .push(factory);
        self
    }

    /// Apply `factory` to `method` as declared on `declaring_type`
    pub fn intercept_method(
        mut self,
        declaring_type: &str,
        method: &str,
        factory: Arc<dyn HandlerFactory>,
    ) -> Self {
        self.methods
            .entry((declaring_type.to_string(), method.to_string()))
            .or_default()
            .push(factory);
        self
    }
}

impl HandlerSource for InterceptionConfig {
    fn type_handlers(&self, class: &ClassDef) -> Vec<Arc<dyn HandlerFactory>> {
        self.types.get(class.name()).cloned().unwrap_or_default()
    }

    fn method_handlers(&self, method: &MethodDescriptor) -> Vec<Arc<dyn HandlerFactory>> {
        self.methods
            .get(&(method.declaring_type.clone(), method.name.clone()))
            .cloned()
            .unwrap_or_default()
    }

    fn has_type_handlers(&self, class: &ClassDef) -> bool {
        self.types.contains_key(class.name())
    }
}

impl fmt::Debug for InterceptionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptionConfig")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Whether `class` or any of its ancestors has class-level configuration
pub fn has_inherited_type_handlers(source: &dyn HandlerSource, chain: &[ClassType]) -> bool {
    chain
        .iter()
        .filter(|class| !class.definition().is_object_class())
        .any(|class| source.has_type_handlers(class.definition()))
}

/// Whether any declaration of `method` along `chain` has method-level
/// configuration
pub fn has_inherited_method_handlers(
    source: &dyn HandlerSource,
    chain: &[ClassType],
    method: &MethodDescriptor,
) -> bool {
    declarations(chain, method).any(|decl| source.has_method_handlers(decl))
}

/// Every declaration sharing `method`'s key along `chain`, most derived first
fn declarations<'a>(
    chain: &'a [ClassType],
    method: &MethodDescriptor,
) -> impl Iterator<Item = &'a MethodDescriptor> + 'a {
    let key = method.key();
    chain
        .iter()
        .flat_map(|class| class.definition().methods().iter())
        .map(|m| &**m.descriptor())
        .filter(move |d| !d.flags.is_static && d.key() == key)
}

/// Ordered chain for `method` on the class whose hierarchy is `chain`
///
/// Class-level entries of every class in `chain` come first (most derived
/// class first), then method-level entries of every declaration of the
/// method, then everything is stably sorted by ascending `order`.
pub fn resolve_handlers(
    source: &dyn HandlerSource,
    chain: &[ClassType],
    method: &MethodDescriptor,
) -> Vec<HandlerSpec> {
    let type_level = chain
        .iter()
        .filter(|class| !class.definition().is_object_class())
        .flat_map(|class| source.type_handlers(class.definition()));
    let method_level = declarations(chain, method).flat_map(|decl| source.method_handlers(decl));

    let mut specs: Vec<HandlerSpec> = type_level
        .chain(method_level)
        .map(|factory| HandlerSpec::from_factory(factory.as_ref()))
        .collect();
    specs.sort_by_key(|spec| spec.order);
    specs
}
