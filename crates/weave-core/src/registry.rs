//! Proxy registry
//!
//! Owns the synthesized descriptors. Registration is an atomic get-or-create
//! keyed by class definition, so concurrent registrants of the same class
//! share one synthesis. Each entry is a `OnceCell`; the map's shard lock is
//! released before synthesis runs handler sources and factories.

use crate::class::{ClassId, ClassType};
use crate::error::{CallResult, Fault, InterceptResult};
use crate::handler::HandlerSource;
use crate::object::ObjectRef;
use crate::options::ProxyOptions;
use crate::proxy::{ProxyClass, ProxyTypeDescriptor, Synthesizer};
use crate::value::Value;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::sync::Arc;

type Slot = Arc<OnceCell<Arc<ProxyTypeDescriptor>>>;

/// Registry of generated proxy types
pub struct ProxyRegistry {
    synthesizer: Synthesizer,
    config: Arc<dyn HandlerSource>,
    proxies: DashMap<ClassId, Slot>,
}

impl ProxyRegistry {
    /// Registry with default options
    pub fn new(config: Arc<dyn HandlerSource>) -> Self {
        Self::with_options(config, ProxyOptions::default())
    }

    /// Registry with explicit options
    pub fn with_options(config: Arc<dyn HandlerSource>, options: ProxyOptions) -> Self {
        Self {
            synthesizer: Synthesizer::new(options),
            config,
            proxies: DashMap::new(),
        }
    }

    /// Get or synthesize the proxy shape for `class`
    ///
    /// Every instantiation of a generic definition shares one descriptor.
    /// Handler sources and factories may call back into the registry while a
    /// synthesis runs, except to register the class being synthesized.
    pub fn register(&self, class: &ClassType) -> InterceptResult<Arc<ProxyTypeDescriptor>> {
        let id = class.definition().id();
        let slot: Slot = self.proxies.entry(id).or_default().value().clone();

        let synthesized =
            slot.get_or_try_init(|| self.synthesizer.synthesize(class, self.config.as_ref()));
        let descriptor = match synthesized {
            Ok(descriptor) => descriptor.clone(),
            Err(e) => {
                self.proxies.remove_if(&id, |_, slot| slot.get().is_none());
                return Err(e);
            }
        };

        tracing::debug!(source = %class.name(), proxy = %descriptor.name(), "registered");
        Ok(descriptor)
    }

    /// The proxy class standing in for `class`
    ///
    /// A definition over its own parameters gives the open proxy; any other
    /// application, including a partly open one such as `Box<List<U>>`, is
    /// closed over the same type arguments.
    pub fn resolve(&self, class: &ClassType) -> InterceptResult<ProxyClass> {
        let descriptor = self.register(class)?;
        if class.args() == class.definition().generic_types().as_slice() {
            return Ok(ProxyClass::open(descriptor));
        }
        Ok(ProxyClass::close(descriptor, class.args().to_vec())?)
    }

    /// Instantiate `class` through its proxy
    pub fn create(&self, class: &ClassType, args: &[Value]) -> CallResult<ObjectRef> {
        let proxy = self
            .resolve(class)
            .map_err(|e| Fault::raised("InterceptError", e.to_string()))?;
        proxy.instantiate(args)
    }

    /// Registered descriptor for `class`, if any
    pub fn get(&self, class: &ClassType) -> Option<Arc<ProxyTypeDescriptor>> {
        self.proxies
            .get(&class.definition().id())
            .and_then(|entry| entry.value().get().cloned())
    }

    /// Whether `class` has been registered
    pub fn contains(&self, class: &ClassType) -> bool {
        self.get(class).is_some()
    }

    /// Number of registered definitions
    pub fn len(&self) -> usize {
        self.proxies
            .iter()
            .filter(|entry| entry.value().get().is_some())
            .count()
    }

    /// Whether nothing has been registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ProxyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyRegistry")
            .field("options", self.synthesizer.options())
            .field("proxies", &self.len())
            .finish()
    }
}
