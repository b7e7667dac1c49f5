//! Module aggregation: the per-entry registry of `(type, serializer)` pairs.
use std::collections::HashSet;

use tracing::debug;

use crate::ir::{ModuleEntry, ModuleSpec, TypeName};

/// Drop excluded types, keep order, keep duplicates. `None` when nothing is
/// left to register.
pub fn aggregate(
    name: impl Into<String>,
    entry: impl Into<String>,
    pairs: impl IntoIterator<Item = ModuleEntry>,
    excluded: &[TypeName],
) -> Option<ModuleSpec> {
    let excluded = excluded.iter().collect::<HashSet<_>>();
    let entries = pairs
        .into_iter()
        .filter(|pair| !excluded.contains(&pair.target))
        .collect::<Vec<_>>();
    if entries.is_empty() {
        return None;
    }
    let module = ModuleSpec { name: name.into(), entry: entry.into(), entries };
    debug!(module = %module.name, pairs = module.entries.len(), "aggregated module");
    Some(module)
}
