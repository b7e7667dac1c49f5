//! Strongly-typed IR shared by resolution, synthesis and codegen.
//!
//! Inputs (`TypeExpr`, `FieldDecl`) are read-only views of the user's types.
//! Outputs (`GenerationUnit`, `ModuleSpec`) are write-once descriptions handed
//! to an emitter; nothing in here knows about Rust syntax except the
//! `TypeExpr` parser/printer.
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ————————————————————————————————————————————————————————————————————————————
// NAMES
// ————————————————————————————————————————————————————————————————————————————

static RUST_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(::)?[A-Za-z_][A-Za-z0-9_]*(::[A-Za-z_][A-Za-z0-9_]*)*$").unwrap()
});

/// Fully-qualified type (or serializer) path, e.g. `crate::hr::Position`.
///
/// Deserialized names are validated; names built internally (including the
/// synthetic `()`, `[]` and `[N]` heads used by `TypeExpr`) are not.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeName(String);

impl TypeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
    pub fn parse(name: &str) -> Result<Self> {
        if RUST_PATH.is_match(name) {
            Ok(Self(name.to_string()))
        } else {
            Err(Error::InvalidName { what: "type", name: name.to_string() })
        }
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
    /// Last path segment.
    pub fn simple(&self) -> &str {
        self.0.rsplit("::").next().unwrap_or(&self.0)
    }
    /// Everything before the last `::`, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.0.rsplit_once("::").map(|(ns, _)| ns)
    }
    /// A name living in the same namespace as `self`.
    pub fn sibling(&self, simple: &str) -> TypeName {
        match self.namespace() {
            Some(ns) => TypeName(format!("{ns}::{simple}")),
            None => TypeName(simple.to_string()),
        }
    }
}

impl TryFrom<String> for TypeName {
    type Error = Error;
    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<TypeName> for String {
    fn from(value: TypeName) -> Self {
        value.0
    }
}

impl Borrow<str> for TypeName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TYPE EXPRESSIONS
// ————————————————————————————————————————————————————————————————————————————

/// A field's declared type: head name, type arguments, nullability.
///
/// `Option<T>` is folded into `T` with `nullable = true`. Tuples, slices and
/// arrays use the synthetic heads `()`, `[]` and `[N]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeExpr {
    pub name: TypeName,
    pub args: Vec<TypeExpr>,
    pub nullable: bool,
}

impl TypeExpr {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: TypeName::new(name), args: Vec::new(), nullable: false }
    }
    pub fn generic(name: impl Into<String>, args: Vec<TypeExpr>) -> Self {
        Self { name: TypeName::new(name), args, nullable: false }
    }
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
    /// Visit this node and every nested type argument, depth-first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a TypeExpr)) {
        visit(self);
        for arg in &self.args {
            arg.walk(visit);
        }
    }
}

/// Render a type head applied to already-rendered arguments.
pub(crate) fn render_applied(head: &str, args: &[String]) -> String {
    match head {
        "()" if args.len() == 1 => format!("({},)", args[0]),
        "()" => format!("({})", args.join(", ")),
        "[]" => format!("[{}]", args.first().map(String::as_str).unwrap_or("_")),
        _ if head.starts_with('[') => {
            let len = head.trim_start_matches('[').trim_end_matches(']');
            format!("[{}; {len}]", args.first().map(String::as_str).unwrap_or("_"))
        }
        _ if args.is_empty() => head.to_string(),
        _ => format!("{head}<{}>", args.join(", ")),
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = self.args.iter().map(|a| a.to_string()).collect::<Vec<_>>();
        let core = render_applied(self.name.as_str(), &args);
        if self.nullable {
            write!(f, "Option<{core}>")
        } else {
            f.write_str(&core)
        }
    }
}

impl FromStr for TypeExpr {
    type Err = Error;
    fn from_str(src: &str) -> Result<Self> {
        let syntax_error = |message: String| Error::TypeSyntax { src: src.to_string(), message };
        let ty = syn::parse_str::<syn::Type>(src).map_err(|e| syntax_error(e.to_string()))?;
        lower_syn_type(&ty).map_err(syntax_error)
    }
}

impl TryFrom<String> for TypeExpr {
    type Error = Error;
    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TypeExpr> for String {
    fn from(value: TypeExpr) -> Self {
        value.to_string()
    }
}

fn lower_syn_type(ty: &syn::Type) -> std::result::Result<TypeExpr, String> {
    match ty {
        syn::Type::Path(p) if p.qself.is_none() => lower_syn_path(&p.path),
        syn::Type::Paren(p) => lower_syn_type(&p.elem),
        syn::Type::Group(g) => lower_syn_type(&g.elem),
        syn::Type::Tuple(t) => {
            let elems = t.elems.iter().map(lower_syn_type).collect::<std::result::Result<_, _>>()?;
            Ok(TypeExpr::generic("()", elems))
        }
        syn::Type::Slice(s) => Ok(TypeExpr::generic("[]", vec![lower_syn_type(&s.elem)?])),
        syn::Type::Array(a) => {
            let len = match &a.len {
                syn::Expr::Lit(syn::ExprLit { lit: syn::Lit::Int(n), .. }) => {
                    n.base10_parse::<usize>().map_err(|e| e.to_string())?
                }
                _ => return Err("array length must be an integer literal".into()),
            };
            Ok(TypeExpr::generic(format!("[{len}]"), vec![lower_syn_type(&a.elem)?]))
        }
        _ => Err("only paths, tuples, slices and arrays are supported".into()),
    }
}

fn lower_syn_path(path: &syn::Path) -> std::result::Result<TypeExpr, String> {
    let mut name = String::new();
    if path.leading_colon.is_some() {
        name.push_str("::");
    }
    let last = path.segments.len().saturating_sub(1);
    let mut args = Vec::new();
    for (i, segment) in path.segments.iter().enumerate() {
        if i > 0 {
            name.push_str("::");
        }
        name.push_str(&segment.ident.to_string());
        match &segment.arguments {
            syn::PathArguments::None => {}
            syn::PathArguments::AngleBracketed(generic) if i == last => {
                for arg in &generic.args {
                    match arg {
                        syn::GenericArgument::Type(t) => args.push(lower_syn_type(t)?),
                        syn::GenericArgument::Lifetime(_) => {}
                        _ => return Err(format!("unsupported generic argument in `{name}`")),
                    }
                }
            }
            _ => return Err(format!("unexpected arguments on path segment `{}`", segment.ident)),
        }
    }

    let is_option = matches!(
        name.as_str(),
        "Option" | "std::option::Option" | "core::option::Option" | "::std::option::Option" | "::core::option::Option"
    );
    if is_option && args.len() == 1 && !args[0].nullable {
        return Ok(args.remove(0).nullable());
    }
    Ok(TypeExpr { name: TypeName::new(name), args, nullable: false })
}

// ————————————————————————————————————————————————————————————————————————————
// DECLARATIONS (read-only inputs)
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    #[default]
    #[serde(rename = "pub")]
    Public,
    #[serde(rename = "pub(crate)")]
    Crate,
    /// `pub(super)` / `pub(in path)`
    #[serde(rename = "restricted")]
    Restricted,
    #[serde(rename = "private")]
    Private,
}

impl Visibility {
    /// Whether the field is mirrored on the surrogate.
    pub fn is_eligible(self) -> bool {
        matches!(self, Visibility::Public | Visibility::Crate)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
    #[serde(default)]
    pub visibility: Visibility,
}

// ————————————————————————————————————————————————————————————————————————————
// SERIALIZER REFERENCES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SerializerKind {
    /// Named by configuration (class- or field-level override).
    Explicit,
    /// `<Type>Serializer`, assumed to exist once generation is done.
    Derived,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SerializerRef {
    pub name: TypeName,
    pub kind: SerializerKind,
}

impl SerializerRef {
    pub fn explicit(name: TypeName) -> Self {
        Self { name, kind: SerializerKind::Explicit }
    }
    pub fn derived(name: TypeName) -> Self {
        Self { name, kind: SerializerKind::Derived }
    }
    pub fn is_derived(&self) -> bool {
        self.kind == SerializerKind::Derived
    }
}

impl fmt::Display for SerializerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name.as_str())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// OUTPUTS
// ————————————————————————————————————————————————————————————————————————————

/// How one surrogate field is (de)serialized, node by node.
///
/// Built once by the synthesizer; codegen renders it as a `serde_as` type and
/// the runtime walks it over JSON values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AsPlan {
    /// Host's own handling; nothing inside needs a custom serializer.
    Native,
    Use { serializer: SerializerRef },
    Nullable { inner: Box<AsPlan> },
    /// Built-in container whose arguments carry custom serializers.
    Generic { name: TypeName, args: Vec<AsPlan> },
}

impl AsPlan {
    pub fn is_native(&self) -> bool {
        matches!(self, AsPlan::Native)
    }
    pub(crate) fn wrap_nullable(self, nullable: bool) -> AsPlan {
        if nullable && !self.is_native() {
            AsPlan::Nullable { inner: Box::new(self) }
        } else {
            self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SurrogateField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
    /// Serializer attached directly to this field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attached: Option<SerializerRef>,
    pub plan: AsPlan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SurrogateType {
    pub name: TypeName,
    pub fields: Vec<SurrogateField>,
    /// Needed somewhere inside a field's type arguments but attached to no
    /// field directly.
    pub file_scope: Vec<SerializerRef>,
}

/// Field-by-field copy from one shape into the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversion {
    pub from: TypeName,
    pub to: TypeName,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappedSerializerSpec {
    pub name: TypeName,
    pub to_surrogate: Conversion,
    pub from_surrogate: Conversion,
    /// Target fields left out of the surrogate (restricted visibility).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub omitted: Vec<String>,
    /// Every serializer that must be visible in the generated file.
    pub imports: Vec<SerializerRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationUnit {
    pub target: TypeName,
    pub surrogate: SurrogateType,
    pub serializer: MappedSerializerSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleEntry {
    pub target: TypeName,
    pub serializer: SerializerRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleSpec {
    pub name: String,
    /// Configuration entry this module was aggregated for.
    pub entry: String,
    pub entries: Vec<ModuleEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_folds_into_nullable_flag() {
        let ty: TypeExpr = "Option<Vec<crate::hr::Position>>".parse().unwrap();
        assert!(ty.nullable);
        assert_eq!(ty.name.as_str(), "Vec");
        assert_eq!(ty.args[0].name.as_str(), "crate::hr::Position");
        assert_eq!(ty.to_string(), "Option<Vec<crate::hr::Position>>");
    }

    #[test]
    fn nested_option_keeps_outer_container() {
        let ty: TypeExpr = "Option<Option<i32>>".parse().unwrap();
        assert!(!ty.nullable);
        assert_eq!(ty.name.as_str(), "Option");
        assert!(ty.args[0].nullable);
    }

    #[test]
    fn tuples_arrays_and_maps_print_back() {
        for src in [
            "(i32, String)",
            "(u8,)",
            "[f64; 3]",
            "std::collections::HashMap<String, Vec<u8>>",
            "Box<[u8]>",
        ] {
            let ty: TypeExpr = src.parse().unwrap();
            assert_eq!(ty.to_string(), src);
        }
    }

    #[test]
    fn references_are_rejected() {
        let err = "&'static str".parse::<TypeExpr>().unwrap_err();
        assert!(matches!(err, Error::TypeSyntax { .. }));
    }

    #[test]
    fn type_name_segments() {
        let name = TypeName::parse("crate::hr::Position").unwrap();
        assert_eq!(name.simple(), "Position");
        assert_eq!(name.namespace(), Some("crate::hr"));
        assert_eq!(name.sibling("PositionSerializer").as_str(), "crate::hr::PositionSerializer");
        assert_eq!(TypeName::new("i32").sibling("AddHundred").as_str(), "AddHundred");
        assert!(TypeName::parse("crate::hr::").is_err());
        assert!(TypeName::parse("Vec<u8>").is_err());
    }

    #[test]
    fn field_decl_from_json() {
        let decl: FieldDecl = serde_json::from_value(serde_json::json!({
            "name": "salary",
            "type": "Option<u64>",
            "visibility": "pub(crate)",
        }))
        .unwrap();
        assert!(decl.ty.nullable);
        assert_eq!(decl.visibility, Visibility::Crate);
        assert!(decl.visibility.is_eligible());
        assert!(!Visibility::Restricted.is_eligible());
    }
}
