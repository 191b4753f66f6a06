//! Interceptability analysis
//!
//! Decides which methods of a class a proxy overrides.

use crate::class::{ClassType, MethodDef};
use crate::handler::{
    has_inherited_method_handlers, has_inherited_type_handlers, HandlerSource,
};
use rustc_hash::FxHashSet;
use weave_types::{MethodDescriptor, MethodKind, TypeResult};

/// A method selected for overriding
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Declaring class, expressed over the analyzed type's arguments
    pub declaring: ClassType,
    /// The declaration being overridden
    pub method: MethodDef,
}

/// Whether `method` can be overridden by a proxy at all
pub fn method_can_be_intercepted(method: &MethodDescriptor) -> bool {
    method.kind == MethodKind::Ordinary
        && !method.flags.is_static
        && method.flags.is_virtual
        && !method.flags.is_final
        && method.accessibility.visible_to_subclasses()
}

/// Every overridable method visible on `class`, most derived first
///
/// A declaration hides base declarations with the same name, parameter count
/// and generic arity, whether or not it is itself overridable.
pub fn candidate_methods(class: &ClassType) -> TypeResult<Vec<Candidate>> {
    let mut seen = FxHashSet::default();
    let mut candidates = Vec::new();

    for declaring in class.hierarchy()? {
        if declaring.definition().is_object_class() {
            continue;
        }
        for method in declaring.definition().methods() {
            let descriptor = method.descriptor();
            if descriptor.flags.is_static || !seen.insert(descriptor.key()) {
                continue;
            }
            if method_can_be_intercepted(descriptor) {
                candidates.push(Candidate {
                    declaring: declaring.clone(),
                    method: method.clone(),
                });
            }
        }
    }
    Ok(candidates)
}

/// Candidates that have handler configuration
///
/// Class-level configuration on the class or any ancestor selects every
/// candidate; otherwise only methods configured on some declaration along
/// the hierarchy are selected.
pub fn intercepted_methods(
    class: &ClassType,
    source: &dyn HandlerSource,
) -> TypeResult<Vec<Candidate>> {
    let candidates = candidate_methods(class)?;
    let chain = class.hierarchy()?;
    if has_inherited_type_handlers(source, &chain) {
        return Ok(candidates);
    }
    Ok(candidates
        .into_iter()
        .filter(|c| has_inherited_method_handlers(source, &chain, c.method.descriptor()))
        .collect())
}
