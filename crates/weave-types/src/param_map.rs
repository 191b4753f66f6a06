//! Generic parameter substitution
//!
//! A `TypeParameterMap` pairs formal generic parameters with the types that
//! replace them and rewrites whole types structurally:
//!
//! - a formal parameter is looked up locally; when absent the *original*
//!   parameter is handed to the parent map; when still unresolved it maps to
//!   itself
//! - arrays keep their rank and have their element type mapped
//! - constructed generics keep their definition and have every argument mapped
//! - by-reference types have their referent mapped
//! - everything else maps to itself
//!
//! Results are memoized per queried type. The pairing itself never changes
//! after construction.

use crate::error::{TypeError, TypeResult};
use crate::ty::{GenericParam, GenericParamDef, Type};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Chained substitution table from formal parameters to types
#[derive(Debug, Default)]
pub struct TypeParameterMap {
    /// Local pairs in declaration order
    mappings: Vec<(GenericParam, Type)>,
    /// Fallback map for parameters not declared locally
    parent: Option<Arc<TypeParameterMap>>,
    /// Memoized results keyed by the queried type
    cache: RwLock<FxHashMap<Type, Type>>,
}

impl TypeParameterMap {
    /// Map with no pairs and no parent; every type maps to itself
    pub fn empty() -> Self {
        Self::default()
    }

    /// Pair `reflected[i]` with `generated[i]`
    pub fn new(reflected: Vec<GenericParam>, generated: Vec<Type>) -> TypeResult<Self> {
        Self::build(reflected, generated, None)
    }

    /// Pair parameters and fall back to `parent` for everything else
    pub fn with_parent(
        reflected: Vec<GenericParam>,
        generated: Vec<Type>,
        parent: Arc<TypeParameterMap>,
    ) -> TypeResult<Self> {
        Self::build(reflected, generated, Some(parent))
    }

    /// Pair declared parameters with replacement types
    pub fn from_defs(defs: &[GenericParamDef], generated: Vec<Type>) -> TypeResult<Self> {
        Self::new(defs.iter().map(|d| d.param.clone()).collect(), generated)
    }

    /// Pair declared parameters with replacement types, chained to `parent`
    pub fn from_defs_with_parent(
        defs: &[GenericParamDef],
        generated: Vec<Type>,
        parent: Arc<TypeParameterMap>,
    ) -> TypeResult<Self> {
        Self::with_parent(defs.iter().map(|d| d.param.clone()).collect(), generated, parent)
    }

    fn build(
        reflected: Vec<GenericParam>,
        generated: Vec<Type>,
        parent: Option<Arc<TypeParameterMap>>,
    ) -> TypeResult<Self> {
        if reflected.len() != generated.len() {
            return Err(TypeError::ParameterCountMismatch {
                expected: reflected.len(),
                actual: generated.len(),
            });
        }
        Ok(Self {
            mappings: reflected.into_iter().zip(generated).collect(),
            parent,
            cache: RwLock::new(FxHashMap::default()),
        })
    }

    /// Substitute every mapped parameter occurring in `ty`
    pub fn map(&self, ty: &Type) -> Type {
        if let Some(hit) = self.cache.read().get(ty) {
            return hit.clone();
        }
        let mapped = self.do_map(ty);
        self.cache.write().insert(ty.clone(), mapped.clone());
        mapped
    }

    /// Map every type in a slice
    pub fn map_all(&self, types: &[Type]) -> Vec<Type> {
        types.iter().map(|t| self.map(t)).collect()
    }

    fn do_map(&self, ty: &Type) -> Type {
        match ty {
            Type::Param(param) => match self.lookup_local(param) {
                Some(local) => local.clone(),
                None => match &self.parent {
                    Some(parent) => parent.map(ty),
                    None => ty.clone(),
                },
            },
            Type::Array { element, rank } => Type::Array {
                element: Box::new(self.map(element)),
                rank: *rank,
            },
            Type::Constructed { definition, args } => Type::Constructed {
                definition: definition.clone(),
                args: self.map_all(args),
            },
            Type::ByRef(inner) => Type::ByRef(Box::new(self.map(inner))),
            Type::Primitive(_) | Type::Named(_) => ty.clone(),
        }
    }

    fn lookup_local(&self, param: &GenericParam) -> Option<&Type> {
        self.mappings
            .iter()
            .find(|(reflected, _)| reflected == param)
            .map(|(_, generated)| generated)
    }

    /// Source-side parameters, in declaration order
    pub fn reflected_parameters(&self) -> Vec<GenericParam> {
        self.mappings.iter().map(|(p, _)| p.clone()).collect()
    }

    /// Replacement types, in declaration order
    pub fn generated_parameters(&self) -> Vec<Type> {
        self.mappings.iter().map(|(_, t)| t.clone()).collect()
    }

    /// Parent map, if chained
    pub fn parent(&self) -> Option<&Arc<TypeParameterMap>> {
        self.parent.as_ref()
    }

    /// Number of local pairs
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Check if there are no local pairs
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Number of memoized results
    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }
}
