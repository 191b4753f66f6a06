//! Integration tests for intercepted calls
//!
//! Tests cover:
//! - Handler ordering (onion semantics)
//! - Short-circuiting handlers
//! - Fault transparency with and without handlers
//! - `out` / `ref` parameter fidelity
//! - Methods that are never intercepted
//! - Abstract classes, self calls, retry handlers and panics
//! - Configuration inherited from base classes and base declarations

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use weave_core::{
    ClassDef, ClassType, ConstructorDef, Fault, HandlerFactory, HandlerSource, InterceptionConfig,
    ProxyOptions, ProxyRegistry, SharedHandler, Value,
};
use weave_types::{Accessibility, MethodDescriptor, ParameterDescriptor, Type};

type Log = Arc<Mutex<Vec<String>>>;

fn account() -> ClassType {
    let def = ClassDef::builder("Account")
        .field("balance")
        .constructor(ConstructorDef::new(
            vec![ParameterDescriptor::new("opening", Type::i64())],
            |call| {
                let opening = call.int(0)?;
                call.set_field("balance", Value::Int(opening))
            },
        ))
        .method(
            MethodDescriptor::new("Account", "deposit")
                .param("amount", Type::i64())
                .returns(Type::i64())
                .as_virtual(),
            |call| {
                let balance = call.field("balance")?.as_int().unwrap_or(0) + call.int(0)?;
                call.set_field("balance", Value::Int(balance))?;
                Ok(Value::Int(balance))
            },
        )
        .method(
            MethodDescriptor::new("Account", "withdraw")
                .param("amount", Type::i64())
                .returns(Type::i64())
                .as_virtual(),
            |call| {
                let balance = call.field("balance")?.as_int().unwrap_or(0);
                let amount = call.int(0)?;
                if amount > balance {
                    return Err(Fault::raised("InsufficientFunds", format!("{} > {}", amount, balance)));
                }
                call.set_field("balance", Value::Int(balance - amount))?;
                Ok(Value::Int(balance - amount))
            },
        )
        .method(
            MethodDescriptor::new("Account", "try_parse")
                .param("text", Type::string())
                .out_param("value", Type::i64())
                .returns(Type::bool())
                .as_virtual(),
            |call| match call.string(0)?.parse::<i64>() {
                Ok(v) => {
                    call.set_arg(1, Value::Int(v))?;
                    Ok(Value::Bool(true))
                }
                Err(_) => {
                    call.set_arg(1, Value::Int(0))?;
                    Ok(Value::Bool(false))
                }
            },
        )
        .method(
            MethodDescriptor::new("Account", "accumulate")
                .ref_param("total", Type::i64())
                .param("delta", Type::i64())
                .as_virtual(),
            |call| {
                let total = call.int(0)? + call.int(1)?;
                call.set_arg(0, Value::Int(total))?;
                Ok(Value::Null)
            },
        )
        .method(
            MethodDescriptor::new("Account", "balance").returns(Type::i64()),
            |call| call.field("balance"),
        )
        .method(
            MethodDescriptor::new("Account", "audit_id")
                .returns(Type::i64())
                .as_sealed(),
            |_| Ok(Value::Int(7)),
        )
        .method(
            MethodDescriptor::new("Account", "secret")
                .returns(Type::string())
                .as_virtual()
                .with_access(Accessibility::Private),
            |_| Ok(Value::str("hidden")),
        )
        .build();
    ClassType::open(def)
}

fn recording(log: &Log, name: &'static str, order: i32) -> Arc<dyn HandlerFactory> {
    let log = log.clone();
    Arc::new(SharedHandler::from_fn(name, order, move |inv, next| {
        log.lock().push(format!("{}-before:{}", name, inv.method().name));
        let ret = next.proceed(inv);
        log.lock().push(format!("{}-after:{}", name, inv.method().name));
        ret
    }))
}

fn registry_with(config: InterceptionConfig) -> ProxyRegistry {
    ProxyRegistry::new(Arc::new(config))
}

/// Intercepts every candidate with an empty handler list
struct EmptyChains;

impl HandlerSource for EmptyChains {
    fn type_handlers(&self, _class: &ClassDef) -> Vec<Arc<dyn HandlerFactory>> {
        Vec::new()
    }

    fn method_handlers(&self, _method: &MethodDescriptor) -> Vec<Arc<dyn HandlerFactory>> {
        Vec::new()
    }

    fn has_type_handlers(&self, _class: &ClassDef) -> bool {
        true
    }
}

#[test]
fn test_handler_order_is_onion() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    // declared in reverse priority to show sorting
    let config = InterceptionConfig::new()
        .intercept_method("Account", "deposit", recording(&log, "H2", 1))
        .intercept_method("Account", "deposit", recording(&log, "H1", 0));
    let registry = registry_with(config);

    let obj = registry.create(&account(), &[Value::Int(10)]).unwrap();
    let result = obj.call("deposit", &mut [Value::Int(5)]).unwrap();

    assert_eq!(result, Value::Int(15));
    assert_eq!(
        *log.lock(),
        vec![
            "H1-before:deposit",
            "H2-before:deposit",
            "H2-after:deposit",
            "H1-after:deposit"
        ]
    );
}

#[test]
fn test_short_circuit_prevents_side_effect() {
    let deny = Arc::new(SharedHandler::from_fn("deny", 0, |inv, _next| {
        inv.create_method_return(Value::Int(-1))
    }));
    let registry = registry_with(InterceptionConfig::new().intercept_method("Account", "deposit", deny));

    let obj = registry.create(&account(), &[Value::Int(10)]).unwrap();
    assert_eq!(obj.call("deposit", &mut [Value::Int(5)]).unwrap(), Value::Int(-1));
    assert_eq!(obj.call("balance", &mut []).unwrap(), Value::Int(10));
}

#[test]
fn test_fault_is_transparent_through_empty_chain() {
    let registry = ProxyRegistry::new(Arc::new(EmptyChains));
    let class = account();
    let proxy_obj = registry.create(&class, &[Value::Int(3)]).unwrap();
    let plain_obj = class.instantiate(&[Value::Int(3)]).unwrap();

    let descriptor = registry.register(&class).unwrap();
    assert!(descriptor.is_intercepted("withdraw"));

    let expected = plain_obj.call("withdraw", &mut [Value::Int(50)]).unwrap_err();
    let actual = proxy_obj.call("withdraw", &mut [Value::Int(50)]).unwrap_err();
    assert_eq!(actual, expected);
    assert_eq!(actual, Fault::raised("InsufficientFunds", "50 > 3"));
}

#[test]
fn test_fault_flows_through_handlers_as_data() {
    let seen: Arc<Mutex<Option<Fault>>> = Arc::new(Mutex::new(None));
    let observer = {
        let seen = seen.clone();
        Arc::new(SharedHandler::from_fn("observe", 0, move |inv, next| {
            let ret = next.proceed(inv);
            *seen.lock() = ret.fault().cloned();
            ret
        }))
    };
    let translate = Arc::new(SharedHandler::from_fn("translate", -1, |inv, next| {
        let mut ret = next.proceed(inv);
        if ret.is_fault() {
            ret.set_fault(Fault::raised("Declined", "withdrawal declined"));
        }
        ret
    }));
    let config = InterceptionConfig::new()
        .intercept_type("Account", observer)
        .intercept_type("Account", translate);
    let registry = registry_with(config);

    let obj = registry.create(&account(), &[Value::Int(1)]).unwrap();
    let err = obj.call("withdraw", &mut [Value::Int(9)]).unwrap_err();

    assert_eq!(err, Fault::raised("Declined", "withdrawal declined"));
    assert_eq!(*seen.lock(), Some(Fault::raised("InsufficientFunds", "9 > 1")));
}

#[test]
fn test_out_and_ref_values_reach_caller() {
    let noop = Arc::new(SharedHandler::from_fn("noop", 0, |inv, next| next.proceed(inv)));
    let registry = registry_with(InterceptionConfig::new().intercept_type("Account", noop));
    let obj = registry.create(&account(), &[Value::Int(0)]).unwrap();

    let mut args = [Value::str("42"), Value::Null];
    assert_eq!(obj.call("try_parse", &mut args).unwrap(), Value::Bool(true));
    assert_eq!(args[1], Value::Int(42));

    let mut args = [Value::Int(10), Value::Int(5)];
    assert_eq!(obj.call("accumulate", &mut args).unwrap(), Value::Null);
    assert_eq!(args[0], Value::Int(15));
}

#[test]
fn test_handler_can_rewrite_outputs_and_inputs() {
    let rewrite = Arc::new(SharedHandler::from_fn("rewrite", 0, |inv, next| {
        let _ = inv.inputs().set_by_name("text", Value::str("7"));
        let ret = next.proceed(inv);
        if let Some(v) = ret.outputs().get_by_name("value").ok().and_then(|v| v.as_int()) {
            let _ = ret.outputs().set_by_name("value", Value::Int(v * 100));
        }
        ret
    }));
    let registry = registry_with(InterceptionConfig::new().intercept_method("Account", "try_parse", rewrite));
    let obj = registry.create(&account(), &[Value::Int(0)]).unwrap();

    let mut args = [Value::str("not a number"), Value::Null];
    assert_eq!(obj.call("try_parse", &mut args).unwrap(), Value::Bool(true));
    assert_eq!(args[1], Value::Int(700));
    // the input slot is not by-ref, so the caller keeps its own value
    assert_eq!(args[0], Value::str("not a number"));
}

#[test]
fn test_non_virtual_sealed_private_bypass_chain() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let registry = registry_with(InterceptionConfig::new().intercept_type("Account", recording(&log, "H", 0)));
    let obj = registry.create(&account(), &[Value::Int(4)]).unwrap();

    let descriptor = registry.register(&account()).unwrap();
    for name in ["balance", "audit_id", "secret"] {
        assert!(!descriptor.is_intercepted(name), "{} should not be overridden", name);
    }

    assert_eq!(obj.call("balance", &mut []).unwrap(), Value::Int(4));
    assert_eq!(obj.call("audit_id", &mut []).unwrap(), Value::Int(7));
    assert_eq!(obj.call("secret", &mut []).unwrap(), Value::str("hidden"));
    assert_eq!(obj.call("to_string", &mut []).unwrap(), Value::str(obj.class_name()));
    assert!(log.lock().is_empty());

    obj.call("deposit", &mut [Value::Int(1)]).unwrap();
    assert_eq!(log.lock().len(), 2);
}

#[test]
fn test_argument_checks_reject_bad_input() {
    let noop = Arc::new(SharedHandler::from_fn("noop", 0, |inv, next| next.proceed(inv)));
    let registry = registry_with(InterceptionConfig::new().intercept_type("Account", noop));
    let obj = registry.create(&account(), &[Value::Int(0)]).unwrap();

    let err = obj.call("deposit", &mut [Value::str("ten")]).unwrap_err();
    assert_eq!(
        err,
        Fault::TypeMismatch {
            expected: "i64".to_string(),
            got: "string".to_string()
        }
    );
    assert!(matches!(
        obj.call_generic("deposit", &[Type::i64()], &mut [Value::Int(1)]),
        Err(Fault::Argument(_))
    ));
    assert!(registry.create(&account(), &[Value::str("x")]).is_err());
}

fn shape() -> ClassType {
    let def = ClassDef::builder("Shape")
        .as_abstract()
        .abstract_method(MethodDescriptor::new("Shape", "area").returns(Type::f64()))
        .method(
            MethodDescriptor::new("Shape", "describe")
                .returns(Type::string())
                .as_virtual(),
            |call| {
                let area = call.call("area", &mut [])?;
                Ok(Value::from(format!("area={:?}", area)))
            },
        )
        .build();
    ClassType::open(def)
}

#[test]
fn test_abstract_class_proxy() {
    let class = shape();
    assert!(class.instantiate(&[]).is_err());

    let registry = ProxyRegistry::new(Arc::new(EmptyChains));
    let obj = registry.create(&class, &[]).unwrap();
    let err = obj.call("area", &mut []).unwrap_err();
    assert!(matches!(err, Fault::AbstractMethod(_)));
}

/// `class Circle : Shape { override f64 area(); }`
fn circle() -> ClassType {
    let def = ClassDef::builder("Circle")
        .extends(shape())
        .method(
            MethodDescriptor::new("Circle", "area")
                .returns(Type::f64())
                .as_virtual(),
            |_| Ok(Value::Float(3.0)),
        )
        .build();
    ClassType::open(def)
}

#[test]
fn test_method_config_applies_to_overrides() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let registry = registry_with(InterceptionConfig::new().intercept_method(
        "Shape",
        "area",
        recording(&log, "H", 0),
    ));
    let class = circle();

    let descriptor = registry.register(&class).unwrap();
    assert!(descriptor.is_intercepted("area"));
    assert!(!descriptor.is_intercepted("describe"));

    let obj = registry.create(&class, &[]).unwrap();
    assert_eq!(obj.call("area", &mut []).unwrap(), Value::Float(3.0));
    assert_eq!(*log.lock(), vec!["H-before:area", "H-after:area"]);
}

#[test]
fn test_type_config_applies_to_derived_classes() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let registry = registry_with(InterceptionConfig::new().intercept_type("Shape", recording(&log, "H", 0)));
    let class = circle();

    let descriptor = registry.register(&class).unwrap();
    assert_eq!(descriptor.overrides().len(), 2);

    let obj = registry.create(&class, &[]).unwrap();
    assert_eq!(obj.call("describe", &mut []).unwrap(), Value::str("area=3.0"));
    assert_eq!(
        *log.lock(),
        vec![
            "H-before:describe",
            "H-before:area",
            "H-after:area",
            "H-after:describe"
        ]
    );
}

#[test]
fn test_protected_constructor_is_usable_through_proxy() {
    let def = ClassDef::builder("Template")
        .as_abstract()
        .field("count")
        .constructor(
            ConstructorDef::new(Vec::new(), |call| call.set_field("count", Value::Int(2)))
                .with_access(Accessibility::Protected),
        )
        .abstract_method(MethodDescriptor::new("Template", "step").returns(Type::i64()))
        .method(
            MethodDescriptor::new("Template", "count").returns(Type::i64()),
            |call| call.field("count"),
        )
        .build();
    let class = ClassType::open(def);
    assert!(class.instantiate(&[]).is_err());

    let fill = Arc::new(SharedHandler::from_fn("fill", 0, |inv, _next| {
        inv.create_method_return(Value::Int(5))
    }));
    let registry = registry_with(InterceptionConfig::new().intercept_type("Template", fill));

    let descriptor = registry.register(&class).unwrap();
    let ctor = &descriptor.constructors()[0];
    assert_eq!(ctor.accessibility, Accessibility::Public);
    assert_eq!(ctor.base_accessibility, Accessibility::Protected);

    let obj = registry.create(&class, &[]).unwrap();
    assert_eq!(obj.call("count", &mut []).unwrap(), Value::Int(2));
    assert_eq!(obj.call("step", &mut []).unwrap(), Value::Int(5));
}

#[test]
fn test_self_calls_are_intercepted() {
    let fixed = Arc::new(SharedHandler::from_fn("fixed_area", 0, |inv, next| {
        if inv.method().name == "area" {
            return inv.create_method_return(Value::Int(12));
        }
        next.proceed(inv)
    }));
    let registry = registry_with(InterceptionConfig::new().intercept_type("Shape", fixed));
    let obj = registry.create(&shape(), &[]).unwrap();

    // the int result is widened to the declared f64
    assert_eq!(obj.call("area", &mut []).unwrap(), Value::Float(12.0));
    assert_eq!(obj.call("describe", &mut []).unwrap(), Value::str("area=12.0"));
}

#[test]
fn test_retry_handler_calls_next_repeatedly() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let flaky = {
        let attempts = attempts.clone();
        ClassDef::builder("Gateway")
            .method(
                MethodDescriptor::new("Gateway", "send")
                    .returns(Type::string())
                    .as_virtual(),
                move |_| {
                    if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(Fault::raised("Timeout", "try again"))
                    } else {
                        Ok(Value::str("sent"))
                    }
                },
            )
            .build()
    };
    let retry = Arc::new(SharedHandler::from_fn("retry", 0, |inv, next| {
        let mut ret = next.proceed(inv);
        for _ in 0..3 {
            if !ret.is_fault() {
                break;
            }
            ret = next.proceed(inv);
        }
        ret
    }));
    let registry = registry_with(InterceptionConfig::new().intercept_type("Gateway", retry));
    let obj = registry.create(&ClassType::open(flaky), &[]).unwrap();

    assert_eq!(obj.call("send", &mut []).unwrap(), Value::str("sent"));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

fn exploding() -> ClassType {
    let def = ClassDef::builder("Exploding")
        .method(
            MethodDescriptor::new("Exploding", "run").as_virtual(),
            |_| panic!("boom"),
        )
        .build();
    ClassType::open(def)
}

#[test]
fn test_panics_become_faults() {
    let registry = ProxyRegistry::new(Arc::new(EmptyChains));
    let obj = registry.create(&exploding(), &[]).unwrap();
    assert_eq!(
        obj.call("run", &mut []).unwrap_err(),
        Fault::Panic("boom".to_string())
    );
}

#[test]
fn test_panic_capture_can_be_disabled() {
    let registry = ProxyRegistry::with_options(
        Arc::new(EmptyChains),
        ProxyOptions::default().with_panic_capture(false),
    );
    let obj = registry.create(&exploding(), &[]).unwrap();
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _ = obj.call("run", &mut []);
    }));
    assert!(outcome.is_err());
}
