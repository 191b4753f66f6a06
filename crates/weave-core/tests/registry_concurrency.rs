//! Concurrent registration and calls

use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use weave_core::{
    ClassDef, ClassType, HandlerFactory, HandlerSource, ProxyRegistry, SharedHandler, Value,
};
use weave_types::{MethodDescriptor, Type};

/// Counts how often a synthesis asked for class-level configuration
struct CountingSource {
    syntheses: AtomicUsize,
    calls: Arc<AtomicUsize>,
}

impl HandlerSource for CountingSource {
    fn type_handlers(&self, _class: &ClassDef) -> Vec<Arc<dyn HandlerFactory>> {
        let calls = self.calls.clone();
        vec![Arc::new(SharedHandler::from_fn("count", 0, move |inv, next| {
            calls.fetch_add(1, Ordering::SeqCst);
            next.proceed(inv)
        }))]
    }

    fn method_handlers(&self, _method: &MethodDescriptor) -> Vec<Arc<dyn HandlerFactory>> {
        Vec::new()
    }

    fn has_type_handlers(&self, _class: &ClassDef) -> bool {
        self.syntheses.fetch_add(1, Ordering::SeqCst);
        true
    }
}

fn counter() -> ClassType {
    let def = ClassDef::builder("Counter")
        .method(
            MethodDescriptor::new("Counter", "next")
                .param("from", Type::i64())
                .returns(Type::i64())
                .as_virtual(),
            |call| Ok(Value::Int(call.int(0)? + 1)),
        )
        .build();
    ClassType::open(def)
}

#[test]
fn test_concurrent_registration_synthesizes_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let source = Arc::new(CountingSource {
        syntheses: AtomicUsize::new(0),
        calls: calls.clone(),
    });
    let registry = ProxyRegistry::new(source.clone());
    let class = counter();

    let descriptors: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| registry.register(&class).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(source.syntheses.load(Ordering::SeqCst), 1);
    assert!(descriptors.iter().all(|d| Arc::ptr_eq(d, &descriptors[0])));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_concurrent_calls_share_pipeline() {
    let calls = Arc::new(AtomicUsize::new(0));
    let source = Arc::new(CountingSource {
        syntheses: AtomicUsize::new(0),
        calls: calls.clone(),
    });
    let registry = ProxyRegistry::new(source);
    let obj = registry.create(&counter(), &[]).unwrap();

    thread::scope(|s| {
        for i in 0..4 {
            let obj = obj.clone();
            s.spawn(move || {
                for n in 0..25 {
                    let from = i * 100 + n;
                    let out = obj.call("next", &mut [Value::Int(from)]).unwrap();
                    assert_eq!(out, Value::Int(from + 1));
                }
            });
        }
    });

    assert_eq!(calls.load(Ordering::SeqCst), 100);
}

/// Registers another class while its own class is being synthesized
struct ReentrantSource {
    registry: OnceCell<Weak<ProxyRegistry>>,
    helper: ClassType,
}

impl HandlerSource for ReentrantSource {
    fn type_handlers(&self, _class: &ClassDef) -> Vec<Arc<dyn HandlerFactory>> {
        Vec::new()
    }

    fn method_handlers(&self, _method: &MethodDescriptor) -> Vec<Arc<dyn HandlerFactory>> {
        Vec::new()
    }

    fn has_type_handlers(&self, class: &ClassDef) -> bool {
        if class.name() == "Counter" {
            if let Some(registry) = self.registry.get().and_then(Weak::upgrade) {
                registry.register(&self.helper).unwrap();
                assert!(registry.get(&self.helper).is_some());
            }
        }
        false
    }
}

#[test]
fn test_source_can_call_back_into_registry() {
    let source = Arc::new(ReentrantSource {
        registry: OnceCell::new(),
        helper: ClassType::open(ClassDef::builder("Helper").build()),
    });
    let registry = Arc::new(ProxyRegistry::new(source.clone()));
    let _ = source.registry.set(Arc::downgrade(&registry));

    let descriptor = registry.register(&counter()).unwrap();
    assert!(descriptor.overrides().is_empty());
    assert!(registry.contains(&source.helper));
    assert_eq!(registry.len(), 2);
}
