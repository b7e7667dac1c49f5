//! Host built-ins: primitives and containers the generator never derives for.
use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::ir::TypeName;

static PRIMITIVES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "bool", "char", "str", "String",
        "i8", "i16", "i32", "i64", "i128", "isize",
        "u8", "u16", "u32", "u64", "u128", "usize",
        "f32", "f64",
    ]
    .into_iter()
    .collect()
});

/// Paths the built-in names may be qualified with (`std::collections::HashMap`).
const STD_ROOTS: &[&str] = &["std", "core", "alloc", "indexmap"];

/// How a container's values nest its type arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// Every element uses argument 0.
    Sequence,
    /// Keys use argument 0, values argument 1.
    Map,
    /// The value is argument 0 (`Box`, `Rc`, `Arc`, `Cow`).
    Transparent,
    /// Element `i` uses argument `i`.
    Tuple,
    /// Fixed-length array; every element uses argument 0.
    Array,
}

fn simple_container(simple: &str) -> Option<ContainerKind> {
    match simple {
        "Vec" | "VecDeque" | "LinkedList" | "HashSet" | "BTreeSet" | "BinaryHeap" | "IndexSet" => {
            Some(ContainerKind::Sequence)
        }
        "HashMap" | "BTreeMap" | "IndexMap" => Some(ContainerKind::Map),
        "Box" | "Rc" | "Arc" | "Cow" | "Option" => Some(ContainerKind::Transparent),
        _ => None,
    }
}

fn std_qualified(name: &TypeName) -> bool {
    match name.namespace() {
        None => true,
        Some(ns) => {
            let root = ns.trim_start_matches("::").split("::").next().unwrap_or_default();
            STD_ROOTS.contains(&root)
        }
    }
}

pub fn container_kind(name: &TypeName) -> Option<ContainerKind> {
    let raw = name.as_str();
    if raw == "()" {
        return Some(ContainerKind::Tuple);
    }
    if raw.starts_with('[') {
        return Some(if raw == "[]" { ContainerKind::Sequence } else { ContainerKind::Array });
    }
    if !std_qualified(name) {
        return None;
    }
    simple_container(name.simple())
}

pub fn is_primitive(name: &TypeName) -> bool {
    std_qualified(name) && PRIMITIVES.contains(name.simple())
}

/// Primitive or container: only explicit overrides ever apply.
pub fn is_builtin(name: &TypeName) -> bool {
    is_primitive(name) || container_kind(name).is_some()
}
