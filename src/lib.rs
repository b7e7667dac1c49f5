//! Generates serialization surrogates for types whose on-the-wire shape has
//! to be customized without touching the types themselves.
//!
//! A [`Catalog`] describes the types, a [`GenerationConfig`] says which of
//! them to mirror and which serializers override what. The [`Generator`]
//! turns both into [`GenerationUnit`]s and [`ModuleSpec`]s, which an
//! [`Emitter`] renders as source or the [`Runtime`] interprets directly.
pub mod catalog;
pub mod cli;
pub mod codegen;
pub mod config;
pub mod driver;
pub mod error;
pub mod ir;
pub mod path_de;
pub mod registry;
pub mod resolve;
pub mod runtime;
pub mod synth;

#[cfg(test)]
mod fixtures;

pub use catalog::{Catalog, TypeDecl, TypeQuery};
pub use codegen::{EmittedFile, Emitter, RustEmitter};
pub use config::{ConfigEntry, GenerationConfig, GeneratorOptions};
pub use driver::{Diagnostic, Generation, Generator};
pub use error::{Error, Result};
pub use ir::{GenerationUnit, ModuleSpec, SerializerRef, TypeExpr, TypeName};
pub use runtime::Runtime;
