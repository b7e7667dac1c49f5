//! Type query interface: the read-only oracle the generator asks about types.
//!
//! [`Catalog`] is the JSON-backed implementation used by the CLI:
//!
//! ```json
//! { "types": [
//!     { "name": "crate::hr::Position",
//!       "fields": [ { "name": "name", "type": "String" },
//!                   { "name": "experience", "type": "i32" } ] },
//!     { "name": "chrono::NaiveDate", "native_serializable": true }
//! ] }
//! ```
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::ir::{FieldDecl, TypeName};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

pub trait TypeQuery {
    fn exists(&self, name: &TypeName) -> bool;
    /// Declared fields in declaration order; `None` for unknown types.
    fn fields(&self, name: &TypeName) -> Option<&[FieldDecl]>;
    /// The type already (de)serializes on its own; never derive for it.
    fn has_native_serializable_marker(&self, name: &TypeName) -> bool;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: TypeName,
    #[serde(default)]
    pub native_serializable: bool,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    types: IndexMap<TypeName, TypeDecl>,
}

#[derive(Deserialize)]
struct CatalogFile {
    types: Vec<TypeDecl>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(origin: &str, src: &str) -> Result<Self> {
        let file: CatalogFile = crate::path_de::from_str_with_path(origin, src)?;
        Ok(file.types.into_iter().collect())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let file: CatalogFile = crate::path_de::from_file_with_path(path)?;
        Ok(file.types.into_iter().collect())
    }

    /// Later declarations of the same name replace earlier ones.
    pub fn insert(&mut self, decl: TypeDecl) {
        if let Some(previous) = self.types.insert(decl.name.clone(), decl) {
            debug!(ty = %previous.name, "catalog declaration replaced");
        }
    }

    pub fn merge(&mut self, other: Catalog) {
        for decl in other.types.into_values() {
            self.insert(decl);
        }
    }

    pub fn get(&self, name: &TypeName) -> Option<&TypeDecl> {
        self.types.get(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl FromIterator<TypeDecl> for Catalog {
    fn from_iter<I: IntoIterator<Item = TypeDecl>>(iter: I) -> Self {
        let mut catalog = Catalog::new();
        for decl in iter {
            catalog.insert(decl);
        }
        catalog
    }
}

impl TypeQuery for Catalog {
    fn exists(&self, name: &TypeName) -> bool {
        self.types.contains_key(name)
    }
    fn fields(&self, name: &TypeName) -> Option<&[FieldDecl]> {
        self.types.get(name).map(|decl| decl.fields.as_slice())
    }
    fn has_native_serializable_marker(&self, name: &TypeName) -> bool {
        self.types.get(name).is_some_and(|decl| decl.native_serializable)
    }
}
