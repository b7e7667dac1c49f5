//! Serializer resolution and transitive collection.
//!
//! A [`ResolutionContext`] is built fresh for every configuration entry and
//! dropped afterwards, so overrides from one entry can never be observed while
//! resolving another.
//!
//! Precedence, strongest first:
//! 1. field override for `(owning type, field)`;
//! 2. class override for the type's qualified name;
//! 3. derived `<Type>Serializer` for user composites the host can't handle;
//! 4. nothing.
pub mod builtins;

use indexmap::{IndexMap, IndexSet};
use tracing::trace;

use crate::catalog::TypeQuery;
use crate::config::GeneratorOptions;
use crate::ir::{SerializerRef, TypeExpr, TypeName};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Naming conventions for generated items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Naming {
    pub surrogate_suffix: String,
    pub serializer_suffix: String,
}

/// A second override for a key that already has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateOverride {
    Class { ty: TypeName },
    Field { owner: TypeName, field: String },
}

pub struct ResolutionContext<'o> {
    oracle: &'o dyn TypeQuery,
    naming: Naming,
    class_overrides: IndexMap<TypeName, SerializerRef>,
    field_overrides: IndexMap<TypeName, IndexMap<String, SerializerRef>>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl From<&GeneratorOptions> for Naming {
    fn from(options: &GeneratorOptions) -> Self {
        Self {
            surrogate_suffix: options.surrogate_suffix.clone(),
            serializer_suffix: options.serializer_suffix.clone(),
        }
    }
}

impl<'o> ResolutionContext<'o> {
    pub fn new(oracle: &'o dyn TypeQuery, naming: Naming) -> Self {
        Self {
            oracle,
            naming,
            class_overrides: IndexMap::new(),
            field_overrides: IndexMap::new(),
        }
    }

    pub fn oracle(&self) -> &'o dyn TypeQuery {
        self.oracle
    }

    pub fn naming(&self) -> &Naming {
        &self.naming
    }

    pub fn class_overrides(&self) -> impl Iterator<Item = (&TypeName, &SerializerRef)> {
        self.class_overrides.iter()
    }

    /// Register a class override. A repeated key is rejected and the first
    /// registration is kept.
    pub fn add_class_override(&mut self, ty: TypeName, serializer: TypeName) -> Result<(), DuplicateOverride> {
        if self.class_overrides.contains_key(&ty) {
            return Err(DuplicateOverride::Class { ty });
        }
        self.class_overrides.insert(ty, SerializerRef::explicit(serializer));
        Ok(())
    }

    pub fn add_field_override(
        &mut self,
        owner: TypeName,
        field: String,
        serializer: TypeName,
    ) -> Result<(), DuplicateOverride> {
        let fields = self.field_overrides.entry(owner.clone()).or_default();
        if fields.contains_key(&field) {
            return Err(DuplicateOverride::Field { owner, field });
        }
        fields.insert(field, SerializerRef::explicit(serializer));
        Ok(())
    }

    /// User composite the host cannot handle natively.
    pub fn needs_derived(&self, name: &TypeName) -> bool {
        !builtins::is_builtin(name)
            && self.oracle.exists(name)
            && !self.oracle.has_native_serializable_marker(name)
    }

    pub fn derived_ref(&self, name: &TypeName) -> SerializerRef {
        let simple = format!("{}{}", name.simple(), self.naming.serializer_suffix);
        SerializerRef::derived(name.sibling(&simple))
    }

    pub fn surrogate_name(&self, name: &TypeName) -> TypeName {
        name.sibling(&format!("{}{}", name.simple(), self.naming.surrogate_suffix))
    }

    pub fn resolve(&self, ty: &TypeExpr, owning_field: Option<(&TypeName, &str)>) -> Option<SerializerRef> {
        if let Some((owner, field)) = owning_field {
            let found = self.field_overrides.get(owner).and_then(|fields| fields.get(field));
            if let Some(found) = found {
                trace!(%owner, field, serializer = %found, "field override");
                return Some(found.clone());
            }
        }
        if let Some(found) = self.class_overrides.get(&ty.name) {
            trace!(ty = %ty.name, serializer = %found, "class override");
            return Some(found.clone());
        }
        if self.needs_derived(&ty.name) {
            return Some(self.derived_ref(&ty.name));
        }
        None
    }

    /// Every serializer `ty` needs anywhere in its tree, in discovery order.
    /// Nested nodes resolve without field context.
    pub fn collect_all(&self, ty: &TypeExpr) -> IndexSet<SerializerRef> {
        let mut out = IndexSet::new();
        ty.walk(&mut |node| {
            if let Some(found) = self.resolve(node, None) {
                out.insert(found);
            }
        });
        out
    }
}
