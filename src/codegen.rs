//! Rust emitter: renders generation units and modules as `serde` +
//! `serde_with` source.
//!
//! Each unit becomes one file holding the surrogate struct, the two `From`
//! conversions and the `SerializeAs`/`DeserializeAs` serializer. Serializers
//! are brought in with `use` and referenced from `#[serde_as(as = "...")]`.
//! Each module becomes a `static` slice of `(type, serializer)` paths.
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::driver::Generation;
use crate::error::{Error, Result};
use crate::ir::{render_applied, AsPlan, GenerationUnit, ModuleSpec, SerializerRef, TypeName};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedFile {
    /// Relative to the output directory.
    pub path: PathBuf,
    pub contents: String,
}

pub trait Emitter {
    fn emit_unit(&self, unit: &GenerationUnit) -> EmittedFile;
    fn emit_module(&self, module: &ModuleSpec) -> EmittedFile;

    fn emit_all(&self, generation: &Generation) -> Vec<EmittedFile> {
        let units = generation.units.iter().map(|unit| self.emit_unit(unit));
        let modules = generation.modules.iter().map(|module| self.emit_module(module));
        units.chain(modules).collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RustEmitter;

/// Indented line writer.
struct Codegen {
    out: String,
    indent: usize,
}

/// Local names for imported serializers; colliding simple names get a numeric suffix.
struct Imports {
    locals: IndexMap<TypeName, String>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Codegen {
    fn new() -> Self {
        Self { out: String::new(), indent: 0 }
    }
    fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.indent {
                self.out.push_str("    ");
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }
    fn blank(&mut self) {
        self.out.push('\n');
    }
    fn open(&mut self, text: impl AsRef<str>) {
        self.line(text);
        self.indent += 1;
    }
    fn close(&mut self, text: impl AsRef<str>) {
        self.indent = self.indent.saturating_sub(1);
        self.line(text);
    }
    fn into_string(self) -> String {
        self.out
    }
}

impl Imports {
    fn for_unit(unit: &GenerationUnit) -> Self {
        let own = &unit.serializer.name;
        let mut locals = IndexMap::new();
        locals.insert(own.clone(), own.simple().to_string());

        let mut taken = vec![unit.surrogate.name.simple().to_string(), own.simple().to_string()];
        for found in &unit.serializer.imports {
            if locals.contains_key(&found.name) {
                continue;
            }
            let simple = found.name.simple();
            let mut local = simple.to_string();
            let mut n = 2;
            while taken.contains(&local) {
                local = format!("{simple}{n}");
                n += 1;
            }
            taken.push(local.clone());
            locals.insert(found.name.clone(), local);
        }
        Self { locals }
    }

    fn local<'a>(&'a self, name: &'a TypeName) -> &'a str {
        self.locals.get(name).map(String::as_str).unwrap_or(name.as_str())
    }

    fn use_line(&self, found: &SerializerRef) -> Option<String> {
        let local = self.locals.get(&found.name)?;
        if found.name.namespace().is_none() && local == found.name.as_str() {
            return None;
        }
        if local == found.name.simple() {
            Some(format!("use {};", found.name))
        } else {
            Some(format!("use {} as {local};", found.name))
        }
    }
}

fn render_plan(plan: &AsPlan, imports: &Imports) -> String {
    match plan {
        AsPlan::Native => "_".to_string(),
        AsPlan::Use { serializer } => imports.local(&serializer.name).to_string(),
        AsPlan::Nullable { inner } => format!("Option<{}>", render_plan(inner, imports)),
        AsPlan::Generic { name, args } => {
            let args = args.iter().map(|arg| render_plan(arg, imports)).collect::<Vec<_>>();
            render_applied(name.as_str(), &args)
        }
    }
}

/// Serializer names a plan renders.
fn referenced<'p>(plan: &'p AsPlan, out: &mut IndexSet<&'p TypeName>) {
    match plan {
        AsPlan::Native => {}
        AsPlan::Use { serializer } => {
            out.insert(&serializer.name);
        }
        AsPlan::Nullable { inner } => referenced(inner, out),
        AsPlan::Generic { args, .. } => args.iter().for_each(|arg| referenced(arg, out)),
    }
}

impl Emitter for RustEmitter {
    fn emit_unit(&self, unit: &GenerationUnit) -> EmittedFile {
        let imports = Imports::for_unit(unit);
        let target = &unit.target;
        let surrogate = unit.surrogate.name.simple();
        let serializer = unit.serializer.name.simple();
        let mut cg = Codegen::new();

        cg.line(format!("// @generated by surrogate-gen from `{target}`. Do not edit."));
        let own = &unit.serializer.name;
        let mut used = IndexSet::new();
        for field in &unit.surrogate.fields {
            referenced(&field.plan, &mut used);
        }
        // serializers hidden behind a field override or a native type stay unimported
        let wanted = |found: &&SerializerRef| &found.name != own && used.contains(&found.name);
        let attached = unit
            .serializer
            .imports
            .iter()
            .filter(|found| !unit.surrogate.file_scope.contains(*found))
            .filter(wanted)
            .filter_map(|found| imports.use_line(found))
            .collect::<Vec<_>>();
        let file_scope = unit
            .surrogate
            .file_scope
            .iter()
            .filter(wanted)
            .filter_map(|found| imports.use_line(found))
            .collect::<Vec<_>>();
        if !attached.is_empty() {
            cg.blank();
            for line in attached {
                cg.line(line);
            }
        }
        if !file_scope.is_empty() {
            cg.blank();
            cg.line("// used inside generic arguments only");
            for line in file_scope {
                cg.line(line);
            }
        }

        // surrogate
        cg.blank();
        cg.line("#[::serde_with::serde_as]");
        cg.line("#[derive(::serde::Serialize, ::serde::Deserialize)]");
        cg.line(format!("#[serde(rename = \"{}\")]", target.simple()));
        cg.open(format!("pub struct {surrogate} {{"));
        for field in &unit.surrogate.fields {
            if !field.plan.is_native() {
                cg.line(format!("#[serde_as(as = \"{}\")]", render_plan(&field.plan, &imports)));
            }
            cg.line(format!("pub {}: {},", field.name, field.ty));
        }
        cg.close("}");

        // conversions
        cg.blank();
        cg.open(format!("impl ::core::convert::From<&{target}> for {surrogate} {{"));
        cg.open(format!("fn from(value: &{target}) -> Self {{"));
        cg.open("Self {");
        for field in &unit.serializer.to_surrogate.fields {
            cg.line(format!("{field}: ::core::clone::Clone::clone(&value.{field}),"));
        }
        cg.close("}");
        cg.close("}");
        cg.close("}");

        cg.blank();
        cg.open(format!("impl ::core::convert::From<{surrogate}> for {target} {{"));
        cg.open(format!("fn from(value: {surrogate}) -> Self {{"));
        cg.open("Self {");
        for field in &unit.serializer.from_surrogate.fields {
            cg.line(format!("{field}: value.{field},"));
        }
        if !unit.serializer.omitted.is_empty() {
            cg.line(format!("// not mirrored: {}", unit.serializer.omitted.join(", ")));
            cg.line("..::core::default::Default::default()");
        }
        cg.close("}");
        cg.close("}");
        cg.close("}");

        // serializer
        cg.blank();
        cg.line(format!("pub struct {serializer};"));
        cg.blank();
        cg.open(format!("impl ::serde_with::SerializeAs<{target}> for {serializer} {{"));
        cg.line(format!(
            "fn serialize_as<S>(source: &{target}, serializer: S) -> ::core::result::Result<S::Ok, S::Error>"
        ));
        cg.line("where");
        cg.line("    S: ::serde::Serializer,");
        cg.open("{");
        cg.line(format!("::serde::Serialize::serialize(&{surrogate}::from(source), serializer)"));
        cg.close("}");
        cg.close("}");
        cg.blank();
        cg.open(format!("impl<'de> ::serde_with::DeserializeAs<'de, {target}> for {serializer} {{"));
        cg.line(format!(
            "fn deserialize_as<D>(deserializer: D) -> ::core::result::Result<{target}, D::Error>"
        ));
        cg.line("where");
        cg.line("    D: ::serde::Deserializer<'de>,");
        cg.open("{");
        cg.line(format!(
            "<{surrogate} as ::serde::Deserialize>::deserialize(deserializer).map(::core::convert::Into::into)"
        ));
        cg.close("}");
        cg.close("}");

        EmittedFile {
            path: PathBuf::from(format!("{}.rs", to_snake_case(surrogate))),
            contents: cg.into_string(),
        }
    }

    fn emit_module(&self, module: &ModuleSpec) -> EmittedFile {
        let snake = to_snake_case(&module.name);
        let mut cg = Codegen::new();
        cg.line(format!("// @generated by surrogate-gen for configuration `{}`. Do not edit.", module.entry));
        cg.blank();
        cg.line(format!("/// `(type, serializer)` pairs registered by `{}`, in registration order.", module.entry));
        cg.open(format!("pub static {}: &[(&str, &str)] = &[", snake.to_uppercase()));
        for pair in &module.entries {
            cg.line(format!("(\"{}\", \"{}\"),", pair.target, pair.serializer));
        }
        cg.close("];");
        EmittedFile { path: PathBuf::from(format!("{snake}.rs")), contents: cg.into_string() }
    }
}

/// Write every file under `out_dir`, creating directories as needed.
pub fn write_all(files: &[EmittedFile], out_dir: &Path) -> Result<()> {
    let io = |path: &Path| {
        let path = path.to_path_buf();
        move |source| Error::Io { path, source }
    };
    std::fs::create_dir_all(out_dir).map_err(io(out_dir))?;
    for file in files {
        let path = out_dir.join(&file.path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io(parent))?;
        }
        std::fs::write(&path, &file.contents).map_err(io(&path))?;
        debug!(path = %path.display(), bytes = file.contents.len(), "wrote file");
    }
    Ok(())
}

pub(crate) fn to_snake_case(name: &str) -> String {
    let chars = name.chars().collect::<Vec<_>>();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|j| chars[j]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                None | Some('_') => false,
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(_) => next.is_some_and(|n| n.is_lowercase()),
            };
            if boundary {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
