//! Value-level execution of generation units.
//!
//! The [`Runtime`] behaves like the emitted code would, but over
//! `serde_json::Value`: registered [`ValueSerializer`]s stand in for
//! hand-written serializers, every loaded [`GenerationUnit`] acts as its
//! derived serializer, and loaded modules provide lookup by type.
//!
//! Encoding a target copies its visible fields into the surrogate shape and
//! runs each field's [`AsPlan`]; decoding runs the plans in reverse and copies
//! the fields back.
use indexmap::IndexMap;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::trace;

use crate::driver::Generation;
use crate::ir::{AsPlan, GenerationUnit, ModuleSpec, SerializerRef, TypeName};
use crate::resolve::builtins::{self, ContainerKind};

static NATIVE: AsPlan = AsPlan::Native;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("no serializer named `{0}`")]
    UnknownSerializer(TypeName),
    #[error("no serializer registered for `{0}`")]
    NotRegistered(TypeName),
    #[error("`{ty}`: expected {expected}, found {found}")]
    Shape {
        ty: TypeName,
        expected: &'static str,
        found: Value,
    },
    #[error("`{ty}`: missing field `{field}`")]
    MissingField { ty: TypeName, field: String },
    #[error("{0}")]
    Custom(String),
}

pub type RuntimeResult<T> = std::result::Result<T, RuntimeError>;

pub trait ValueSerializer {
    fn encode(&self, value: Value) -> RuntimeResult<Value>;
    fn decode(&self, value: Value) -> RuntimeResult<Value>;
}

/// A serializer made of two closures.
pub struct FnSerializer<E, D> {
    encode: E,
    decode: D,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Encode,
    Decode,
}

#[derive(Default)]
pub struct Runtime {
    serializers: IndexMap<TypeName, Box<dyn ValueSerializer>>,
    /// Keyed by the unit's serializer name.
    units: IndexMap<TypeName, GenerationUnit>,
    /// Contextual registrations from loaded modules: type → serializer.
    registry: IndexMap<TypeName, TypeName>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl<E, D> FnSerializer<E, D>
where
    E: Fn(Value) -> RuntimeResult<Value>,
    D: Fn(Value) -> RuntimeResult<Value>,
{
    pub fn new(encode: E, decode: D) -> Self {
        Self { encode, decode }
    }
}

impl<E, D> ValueSerializer for FnSerializer<E, D>
where
    E: Fn(Value) -> RuntimeResult<Value>,
    D: Fn(Value) -> RuntimeResult<Value>,
{
    fn encode(&self, value: Value) -> RuntimeResult<Value> {
        (self.encode)(value)
    }
    fn decode(&self, value: Value) -> RuntimeResult<Value> {
        (self.decode)(value)
    }
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hand-written serializer under its qualified name.
    pub fn register(&mut self, name: &str, serializer: impl ValueSerializer + 'static) {
        self.serializers.insert(TypeName::new(name), Box::new(serializer));
    }

    pub fn add_unit(&mut self, unit: GenerationUnit) {
        self.units.insert(unit.serializer.name.clone(), unit);
    }

    /// Later modules win for a type registered twice.
    pub fn add_module(&mut self, module: &ModuleSpec) {
        for pair in &module.entries {
            self.registry.insert(pair.target.clone(), pair.serializer.name.clone());
        }
    }

    pub fn load(&mut self, generation: &Generation) {
        for unit in &generation.units {
            self.add_unit(unit.clone());
        }
        for module in &generation.modules {
            self.add_module(module);
        }
    }

    /// Contextual lookup through the loaded modules.
    pub fn serializer_for(&self, ty: &TypeName) -> Option<&TypeName> {
        self.registry.get(ty)
    }

    pub fn encode(&self, ty: &TypeName, value: Value) -> RuntimeResult<Value> {
        let serializer = self.serializer_for(ty).ok_or_else(|| RuntimeError::NotRegistered(ty.clone()))?;
        self.run_named(serializer, value, Direction::Encode)
    }

    pub fn decode(&self, ty: &TypeName, value: Value) -> RuntimeResult<Value> {
        let serializer = self.serializer_for(ty).ok_or_else(|| RuntimeError::NotRegistered(ty.clone()))?;
        self.run_named(serializer, value, Direction::Decode)
    }

    /// Encode with a specific serializer, bypassing module lookup.
    pub fn encode_with(&self, serializer: &SerializerRef, value: Value) -> RuntimeResult<Value> {
        self.run_named(&serializer.name, value, Direction::Encode)
    }

    pub fn decode_with(&self, serializer: &SerializerRef, value: Value) -> RuntimeResult<Value> {
        self.run_named(&serializer.name, value, Direction::Decode)
    }

    fn run_named(&self, name: &TypeName, value: Value, direction: Direction) -> RuntimeResult<Value> {
        if let Some(custom) = self.serializers.get(name) {
            trace!(serializer = %name, ?direction, "custom serializer");
            return match direction {
                Direction::Encode => custom.encode(value),
                Direction::Decode => custom.decode(value),
            };
        }
        match self.units.get(name) {
            Some(unit) => self.run_unit(unit, value, direction),
            None => Err(RuntimeError::UnknownSerializer(name.clone())),
        }
    }

    fn run_unit(&self, unit: &GenerationUnit, value: Value, direction: Direction) -> RuntimeResult<Value> {
        let ty = match direction {
            Direction::Encode => &unit.target,
            Direction::Decode => &unit.surrogate.name,
        };
        let mut source = match value {
            Value::Object(source) => source,
            found => return Err(RuntimeError::Shape { ty: ty.clone(), expected: "an object", found }),
        };

        let mut out = Map::new();
        for field in &unit.surrogate.fields {
            let raw = match source.remove(&field.name) {
                Some(raw) => raw,
                None if field.ty.nullable => Value::Null,
                None => return Err(RuntimeError::MissingField { ty: ty.clone(), field: field.name.clone() }),
            };
            out.insert(field.name.clone(), self.run_plan(&field.plan, raw, direction)?);
        }
        Ok(Value::Object(out))
    }

    fn run_plan(&self, plan: &AsPlan, value: Value, direction: Direction) -> RuntimeResult<Value> {
        match plan {
            AsPlan::Native => Ok(value),
            AsPlan::Use { serializer } => self.run_named(&serializer.name, value, direction),
            AsPlan::Nullable { inner } => {
                if value.is_null() {
                    Ok(Value::Null)
                } else {
                    self.run_plan(inner, value, direction)
                }
            }
            AsPlan::Generic { name, args } => self.run_container(name, args, value, direction),
        }
    }

    fn run_container(&self, name: &TypeName, args: &[AsPlan], value: Value, direction: Direction) -> RuntimeResult<Value> {
        let arg = |i: usize| args.get(i).unwrap_or(&NATIVE);
        let shape = |expected, found| RuntimeError::Shape { ty: name.clone(), expected, found };

        match builtins::container_kind(name) {
            Some(ContainerKind::Sequence) | Some(ContainerKind::Array) => match value {
                Value::Array(items) => items
                    .into_iter()
                    .map(|item| self.run_plan(arg(0), item, direction))
                    .collect::<RuntimeResult<Vec<_>>>()
                    .map(Value::Array),
                other => Err(shape("an array", other)),
            },
            Some(ContainerKind::Tuple) => match value {
                Value::Array(items) => items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| self.run_plan(arg(i), item, direction))
                    .collect::<RuntimeResult<Vec<_>>>()
                    .map(Value::Array),
                other => Err(shape("an array", other)),
            },
            Some(ContainerKind::Map) => match value {
                Value::Object(entries) => {
                    let mut out = Map::new();
                    for (key, item) in entries {
                        let key = match self.run_plan(arg(0), Value::String(key), direction)? {
                            Value::String(key) => key,
                            other => return Err(shape("a string key", other)),
                        };
                        out.insert(key, self.run_plan(arg(1), item, direction)?);
                    }
                    Ok(Value::Object(out))
                }
                other => Err(shape("an object", other)),
            },
            Some(ContainerKind::Transparent) => self.run_plan(arg(0), value, direction),
            // user generics handle their own arguments
            None => Ok(value),
        }
    }
}
