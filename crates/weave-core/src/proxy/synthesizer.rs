//! Proxy type synthesis

use super::descriptor::{ForwardedConstructor, MethodOverride, ProxyTypeDescriptor};
use crate::analyzer::{intercepted_methods, Candidate};
use crate::class::{Call, ClassDef, ClassKind, ClassType, MethodDef, TypeVisibility};
use crate::error::{Fault, InterceptError, InterceptResult};
use crate::handler::{resolve_handlers, HandlerSource};
use crate::invocation::{MethodInvocation, MethodReturn};
use crate::options::ProxyOptions;
use crate::pipeline::{InvokeFn, Pipeline};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use weave_types::{
    Accessibility, GenericParam, GenericParamDef, MethodDescriptor, ParameterDescriptor, Type,
    TypeParameterMap,
};

static NEXT_PROXY_ID: AtomicU64 = AtomicU64::new(1);

/// Builds proxy descriptors
///
/// Stateless between calls apart from its options; caching is the
/// registry's job.
#[derive(Debug, Clone, Default)]
pub struct Synthesizer {
    options: ProxyOptions,
}

impl Synthesizer {
    /// Create a synthesizer
    pub fn new(options: ProxyOptions) -> Self {
        Self { options }
    }

    /// Options applied to generated proxies
    pub fn options(&self) -> &ProxyOptions {
        &self.options
    }

    /// Generate the proxy shape for `source`
    ///
    /// Closed generic types are synthesized against their open definition;
    /// close the result with `ProxyClass::close`.
    pub fn synthesize(
        &self,
        source: &ClassType,
        handlers: &dyn HandlerSource,
    ) -> InterceptResult<Arc<ProxyTypeDescriptor>> {
        let def = source.definition();
        check_eligible(def)?;

        let name = format!(
            "{}_{}_{}",
            self.options.name_prefix,
            def.name(),
            NEXT_PROXY_ID.fetch_add(1, Ordering::Relaxed)
        );

        let proxy_params: Vec<Type> = def
            .generic_params()
            .iter()
            .map(|p| Type::Param(GenericParam::of_type(&name, p.param.position, &p.param.name)))
            .collect();
        let map = Arc::new(TypeParameterMap::from_defs(
            def.generic_params(),
            proxy_params.clone(),
        )?);
        let generic_params = redeclare(def.generic_params(), &proxy_params, &map);
        let base = ClassType::new(def.clone(), proxy_params)?;

        let constructors = forward_constructors(def, &map, &name)?;

        let open = ClassType::open(def.clone());
        let chain = open.hierarchy()?;
        let mut overrides = Vec::new();
        for candidate in intercepted_methods(&open, handlers)? {
            overrides.push(self.build_override(
                &name,
                &chain,
                &map,
                &generic_params,
                candidate,
                handlers,
            )?);
        }

        tracing::info!(
            proxy = %name,
            source = %def.name(),
            overrides = overrides.len(),
            constructors = constructors.len(),
            "synthesized proxy type"
        );

        Ok(Arc::new(ProxyTypeDescriptor {
            name,
            source: def.clone(),
            generic_params,
            base,
            constructors,
            overrides,
            options: self.options.clone(),
        }))
    }

    fn build_override(
        &self,
        proxy_name: &str,
        chain: &[ClassType],
        map: &Arc<TypeParameterMap>,
        proxy_params: &[GenericParamDef],
        candidate: Candidate,
        handlers: &dyn HandlerSource,
    ) -> InterceptResult<MethodOverride> {
        let Candidate { declaring, method } = candidate;
        let base = method.descriptor().clone();

        // declaring class parameters -> declaring arguments in proxy terms
        let declaring_args = map.map_all(declaring.args());
        let declaring_map = Arc::new(TypeParameterMap::from_defs_with_parent(
            declaring.definition().generic_params(),
            declaring_args.clone(),
            map.clone(),
        )?);

        let method_params: Vec<Type> = base
            .generic_params
            .iter()
            .map(|p| {
                Type::Param(GenericParam::of_method(
                    proxy_name,
                    &base.name,
                    p.param.position,
                    &p.param.name,
                ))
            })
            .collect();
        let method_map = TypeParameterMap::from_defs_with_parent(
            &base.generic_params,
            method_params.clone(),
            declaring_map,
        )?;

        let mut signature = MethodDescriptor::new(proxy_name, &base.name)
            .returns(method_map.map(&base.return_type))
            .with_access(base.accessibility)
            .with_kind(base.kind)
            .as_virtual();
        signature.parameters = map_parameters(&base.parameters, &method_map);
        signature.generic_params = redeclare(&base.generic_params, &method_params, &method_map);

        let specs = resolve_handlers(handlers, chain, &base);
        let terminal = self.terminal(method, proxy_params.to_vec(), declaring_args);
        let pipeline = Pipeline::build(specs, terminal);

        tracing::debug!(
            proxy = %proxy_name,
            method = %signature,
            handlers = ?pipeline.handler_names(),
            "generated override"
        );

        Ok(MethodOverride {
            signature: Arc::new(signature),
            base_method: base,
            pipeline,
        })
    }

    /// Innermost chain step: run the base body with `this` as the proxy
    fn terminal(
        &self,
        method: MethodDef,
        proxy_params: Vec<GenericParamDef>,
        declaring_args: Vec<Type>,
    ) -> InvokeFn {
        let catch_panics = self.options.catch_panics;
        let by_ref: Vec<usize> = method
            .descriptor()
            .parameters
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_by_ref())
            .map(|(i, _)| i)
            .collect();

        Arc::new(move |invocation: &MethodInvocation| -> MethodReturn {
            let class_args = if declaring_args.iter().any(Type::contains_params) {
                match TypeParameterMap::from_defs(&proxy_params, invocation.class_type_args().to_vec())
                {
                    Ok(closed) => closed.map_all(&declaring_args),
                    Err(e) => return invocation.create_fault_return(e.into()),
                }
            } else {
                declaring_args.clone()
            };

            let mut args = invocation.buffer().snapshot();
            let target = invocation.target().clone();
            let mut run = || {
                method.invoke(&mut Call::new(
                    &target,
                    &mut args,
                    &class_args,
                    invocation.method_type_args(),
                ))
            };
            let result = if catch_panics {
                panic::catch_unwind(AssertUnwindSafe(run)).unwrap_or_else(|payload| {
                    let message = panic_message(payload.as_ref());
                    tracing::warn!(
                        method = %method.descriptor().name,
                        %message,
                        "method body panicked"
                    );
                    Err(Fault::Panic(message))
                })
            } else {
                run()
            };

            match result {
                Ok(value) => {
                    invocation.buffer().write_back(&by_ref, &args);
                    invocation.create_method_return(value)
                }
                Err(fault) => invocation.create_fault_return(fault),
            }
        })
    }
}

fn check_eligible(def: &ClassDef) -> InterceptResult<()> {
    let name = def.name().to_string();
    if def.kind() != ClassKind::Class {
        return Err(InterceptError::NotAClass { name });
    }
    if def.visibility() != TypeVisibility::Public {
        return Err(InterceptError::NotPublic { name });
    }
    if let Some(outer) = def.nested_in() {
        return Err(InterceptError::Nested {
            name,
            outer: outer.to_string(),
        });
    }
    if def.is_sealed() {
        return Err(InterceptError::Sealed { name });
    }
    Ok(())
}

/// Mirror `params` as `generated`, mapping constraints through `map`
fn redeclare(
    params: &[GenericParamDef],
    generated: &[Type],
    map: &TypeParameterMap,
) -> Vec<GenericParamDef> {
    params
        .iter()
        .zip(generated)
        .filter_map(|(source, ty)| {
            let param = ty.as_param()?.clone();
            Some(GenericParamDef {
                param,
                variance: source.variance,
                constraints: map.map_all(&source.constraints),
                special: source.special,
            })
        })
        .collect()
}

fn map_parameters(params: &[ParameterDescriptor], map: &TypeParameterMap) -> Vec<ParameterDescriptor> {
    params
        .iter()
        .map(|p| ParameterDescriptor {
            ty: map.map(&p.ty),
            ..p.clone()
        })
        .collect()
}

fn forward_constructors(
    def: &ClassDef,
    map: &TypeParameterMap,
    proxy_name: &str,
) -> InterceptResult<Vec<ForwardedConstructor>> {
    let forwarded: Vec<ForwardedConstructor> = def
        .constructors()
        .iter()
        .filter(|c| c.accessibility.visible_to_subclasses())
        .map(|c| ForwardedConstructor {
            parameters: map_parameters(&c.parameters, map),
            accessibility: Accessibility::Public,
            base_accessibility: c.accessibility,
            target: c.clone(),
        })
        .collect();

    if forwarded.is_empty() {
        return Err(InterceptError::NoAccessibleConstructor {
            name: def.name().to_string(),
        });
    }
    for ctor in &forwarded {
        tracing::debug!(
            proxy = %proxy_name,
            parameters = ctor.parameters.len(),
            "forwarded constructor"
        );
    }
    Ok(forwarded)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
