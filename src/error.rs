//! Library error type.
//!
//! Resolution and synthesis never fail; per-entry problems are reported as
//! [`Diagnostic`](crate::driver::Diagnostic)s. Only loading inputs and the
//! final unresolved-entries report surface here.
use std::path::PathBuf;

use thiserror::Error;

use crate::driver::DeferredEntry;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{origin}: at JSON path {path} → {message}")]
    Parse {
        origin: String,
        path: String,
        message: String,
    },

    #[error("invalid type expression `{src}`: {message}")]
    TypeSyntax { src: String, message: String },

    #[error("invalid {what} name `{name}`")]
    InvalidName { what: &'static str, name: String },

    #[error("no input matched `{pattern}`")]
    NoInput { pattern: String },

    #[error("{} still unresolved: {}", count(.entries), summarize(.entries))]
    Unresolved { entries: Vec<DeferredEntry> },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

fn count(entries: &[DeferredEntry]) -> String {
    match entries.len() {
        1 => "1 configuration entry".to_string(),
        n => format!("{n} configuration entries"),
    }
}

fn summarize(entries: &[DeferredEntry]) -> String {
    entries
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
