//! Generation configuration: which types to adapt, which serializers to force.
//!
//! ```json
//! { "options": { "module_suffix": "Module" },
//!   "entries": [ {
//!     "name": "Hr",
//!     "targets": ["crate::hr::Company", "crate::hr::Employee", "crate::hr::Position"],
//!     "class_overrides": [ { "type": "i32", "serializer": "crate::ser::AddHundred" } ],
//!     "field_overrides": [ { "type": "crate::hr::Position",
//!                            "fields": [ { "field": "experience", "serializer": "crate::ser::Years" } ] } ],
//!     "exclude_from_module": ["i32"]
//! } ] }
//! ```
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ir::TypeName;

static IDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorOptions {
    pub surrogate_suffix: String,
    pub serializer_suffix: String,
    pub module_suffix: String,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            surrogate_suffix: "Surrogate".into(),
            serializer_suffix: "Serializer".into(),
            module_suffix: "Module".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub options: GeneratorOptions,
    pub entries: Vec<ConfigEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigEntry {
    pub name: String,
    pub targets: Vec<TypeName>,
    #[serde(default)]
    pub class_overrides: Vec<ClassOverrideDecl>,
    #[serde(default)]
    pub field_overrides: Vec<FieldOverrideGroup>,
    #[serde(default)]
    pub exclude_from_module: Vec<TypeName>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassOverrideDecl {
    #[serde(rename = "type")]
    pub ty: TypeName,
    pub serializer: TypeName,
}

/// Field-level overrides for one owning type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOverrideGroup {
    #[serde(rename = "type")]
    pub ty: TypeName,
    pub fields: Vec<FieldOverrideDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOverrideDecl {
    pub field: String,
    pub serializer: TypeName,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl GeneratorOptions {
    pub fn validate(&self) -> Result<()> {
        for (what, suffix) in [
            ("surrogate suffix", &self.surrogate_suffix),
            ("serializer suffix", &self.serializer_suffix),
            ("module suffix", &self.module_suffix),
        ] {
            if !IDENT.is_match(suffix) {
                return Err(Error::InvalidName { what, name: suffix.clone() });
            }
        }
        Ok(())
    }
}

impl GenerationConfig {
    pub fn from_json_str(origin: &str, src: &str) -> Result<Self> {
        let config: Self = crate::path_de::from_str_with_path(origin, src)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let config: Self = crate::path_de::from_file_with_path(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Append another file's entries; its options are ignored.
    pub fn extend(&mut self, other: GenerationConfig) {
        self.entries.extend(other.entries);
    }

    pub fn validate(&self) -> Result<()> {
        self.options.validate()?;
        for entry in &self.entries {
            entry.validate()?;
        }
        Ok(())
    }
}

impl ConfigEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            targets: Vec::new(),
            class_overrides: Vec::new(),
            field_overrides: Vec::new(),
            exclude_from_module: Vec::new(),
        }
    }

    pub fn target(mut self, ty: &str) -> Self {
        self.targets.push(TypeName::new(ty));
        self
    }

    pub fn class_override(mut self, ty: &str, serializer: &str) -> Self {
        self.class_overrides.push(ClassOverrideDecl {
            ty: TypeName::new(ty),
            serializer: TypeName::new(serializer),
        });
        self
    }

    pub fn field_override(mut self, ty: &str, field: &str, serializer: &str) -> Self {
        let decl = FieldOverrideDecl { field: field.to_string(), serializer: TypeName::new(serializer) };
        match self.field_overrides.iter_mut().find(|g| g.ty.as_str() == ty) {
            Some(group) => group.fields.push(decl),
            None => self.field_overrides.push(FieldOverrideGroup { ty: TypeName::new(ty), fields: vec![decl] }),
        }
        self
    }

    pub fn exclude(mut self, ty: &str) -> Self {
        self.exclude_from_module.push(TypeName::new(ty));
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !IDENT.is_match(&self.name) {
            return Err(Error::InvalidName { what: "configuration entry", name: self.name.clone() });
        }
        for group in &self.field_overrides {
            for decl in &group.fields {
                if !IDENT.is_match(&decl.field) {
                    return Err(Error::InvalidName { what: "field", name: decl.field.clone() });
                }
            }
        }
        Ok(())
    }
}
