use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use weave_core::{
    ClassDef, ClassType, HandlerFactory, InterceptionConfig, ProxyRegistry, SharedHandler, Value,
};
use weave_types::{MethodDescriptor, Type};

fn adder() -> ClassType {
    let def = ClassDef::builder("Adder")
        .method(
            MethodDescriptor::new("Adder", "add")
                .param("a", Type::i64())
                .param("b", Type::i64())
                .returns(Type::i64())
                .as_virtual(),
            |call| Ok(Value::Int(call.int(0)? + call.int(1)?)),
        )
        .build();
    ClassType::open(def)
}

fn passthrough(order: i32) -> Arc<dyn HandlerFactory> {
    Arc::new(SharedHandler::from_fn("pass", order, |inv, next| next.proceed(inv)))
}

fn bench_direct(c: &mut Criterion) {
    let obj = adder().instantiate(&[]).unwrap();

    c.bench_function("direct_call", |b| {
        b.iter(|| {
            let mut args = [Value::Int(black_box(2)), Value::Int(black_box(3))];
            obj.call("add", &mut args).unwrap()
        });
    });
}

fn bench_intercepted(c: &mut Criterion) {
    let mut group = c.benchmark_group("intercepted_call");

    for depth in [0usize, 1, 4, 16] {
        let class = adder();
        let mut config = InterceptionConfig::new().intercept_method("Adder", "add", passthrough(0));
        for order in 1..depth {
            config = config.intercept_method("Adder", "add", passthrough(order as i32));
        }
        if depth == 0 {
            config = InterceptionConfig::new();
        }
        let registry = ProxyRegistry::new(Arc::new(config));
        let obj = registry.create(&class, &[]).unwrap();

        group.bench_with_input(BenchmarkId::new("handlers", depth), &obj, |b, obj| {
            b.iter(|| {
                let mut args = [Value::Int(black_box(2)), Value::Int(black_box(3))];
                obj.call("add", &mut args).unwrap()
            });
        });
    }

    group.finish();
}

fn bench_synthesis(c: &mut Criterion) {
    let config = InterceptionConfig::new().intercept_type("Adder", passthrough(0));
    let registry = ProxyRegistry::new(Arc::new(config));

    c.bench_function("synthesize_and_register", |b| {
        b.iter(|| {
            let class = adder();
            registry.register(black_box(&class)).unwrap()
        });
    });
}

criterion_group!(benches, bench_direct, bench_intercepted, bench_synthesis);
criterion_main!(benches);
