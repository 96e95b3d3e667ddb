//! Public conversion API.
//!
//! Records arrive as a top-level list, so every [`Converter`] walks
//! `array<#Root>` over a shared registry.
use std::sync::Arc;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use crate::datum::Datum;
use crate::descriptor::Descriptor;
use crate::error::{DefinitionError, Error, JsonPath, SchemaError, Segment};
use crate::path_de;
use crate::props::Direction;
use crate::registry::Registry;
use crate::transform::{Options, transform};

#[derive(Debug, Clone)]
pub struct Converter {
    registry: Arc<Registry>,
    root_name: String,
    root: Descriptor,
    options: Options,
}

impl Converter {
    pub fn new(registry: Arc<Registry>, root_name: impl Into<String>) -> Result<Self, DefinitionError> {
        let root_name = root_name.into();
        if !registry.contains(&root_name) {
            return Err(DefinitionError::UnknownRoot(root_name));
        }
        let root = Descriptor::array(Descriptor::reference(root_name.clone()));
        registry.check(&root)?;
        Ok(Self { registry, root_name, root, options: Options::default() })
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &Arc<Registry> { &self.registry }

    pub fn root_name(&self) -> &str { &self.root_name }

    pub fn options(&self) -> &Options { &self.options }

    // ------------------------------ Trees -------------------------------- //

    /// External → internal. Fails on the first offending record.
    pub fn decode(&self, raw: &Value) -> Result<Vec<Datum>, SchemaError> {
        let converted = transform(&self.registry, &Datum::from(raw), &self.root, Direction::Decode, &self.options)?;
        match converted {
            Datum::Array(records) => Ok(records),
            other => Err(SchemaError::ShapeMismatch {
                path: JsonPath::root(),
                expected: "array".into(),
                actual: other.preview(),
            }),
        }
    }

    /// Internal → external, ready for a JSON printer. Fails on the first offending record.
    pub fn encode(&self, records: &[Datum]) -> Result<Value, SchemaError> {
        let item = Descriptor::reference(self.root_name.clone());
        records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                transform(&self.registry, record, &item, Direction::Encode, &self.options)
                    .map(Value::from)
                    .map_err(|e| e.within(Segment::Index(i)))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    /// Decode each record on its own. Only a non-list input fails as a whole.
    pub fn decode_each(&self, raw: &Value) -> Result<Vec<Result<Datum, SchemaError>>, SchemaError> {
        let Value::Array(items) = raw else {
            return Err(SchemaError::ShapeMismatch {
                path: JsonPath::root(),
                expected: "array".into(),
                actual: Datum::from(raw).preview(),
            });
        };
        let item = Descriptor::reference(self.root_name.clone());
        Ok(items
            .iter()
            .enumerate()
            .map(|(i, v)| {
                transform(&self.registry, &Datum::from(v), &item, Direction::Decode, &self.options)
                    .map_err(|e| e.within(Segment::Index(i)))
            })
            .collect())
    }

    // ------------------------------- Text -------------------------------- //

    pub fn decode_str(&self, json: &str) -> Result<Vec<Datum>, Error> {
        let raw: Value = serde_json::from_str(json)?;
        Ok(self.decode(&raw)?)
    }

    /// Pretty-printed with two-space indentation.
    pub fn encode_to_string(&self, records: &[Datum]) -> Result<String, Error> {
        let raw = self.encode(records)?;
        Ok(serde_json::to_string_pretty(&raw)?)
    }

    // ------------------------------ Typed -------------------------------- //

    /// Validate and re-key, then deserialize each record into `T`.
    pub fn decode_into<T: DeserializeOwned>(&self, raw: &Value) -> Result<Vec<T>, Error> {
        self.decode(raw)?
            .into_iter()
            .enumerate()
            .map(|(i, record)| {
                path_de::from_value_with_path::<T>(Value::from(record)).map_err(|e| e.at_record(i))
            })
            .collect()
    }

    /// Serialize `records`, check them against the internal shape, emit wire form.
    pub fn encode_from<T: Serialize>(&self, records: &[T]) -> Result<Value, Error> {
        let internal = records
            .iter()
            .map(|r| serde_json::to_value(r).map(Datum::from))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.encode(&internal)?)
    }
}

// ------------------------------- Tests ------------------------------------ //
