//! JSON schema documents → registry.
//!
//! ```json
//! {
//!   "root": "Country",
//!   "types": {
//!     "Country": { "object": { "fields": [
//!       { "json": "name", "type": "string" },
//!       { "json": "numericCode", "js": "numeric_code", "type": { "union": [null, "string"] } },
//!       { "json": "currencies", "type": { "array": { "ref": "Currency" } } }
//!     ], "additional": false } },
//!     "Region": { "enum": ["Europe", "Asia"] }
//!   }
//! }
//! ```
//!
//! Keywords: `string`, `number`, `boolean`, `object` (opaque map), `date`, `any`;
//! `null` is the null literal. Tagged forms: `array`, `union`, `enum`, `ref`,
//! `object`, `map`.
use std::sync::Arc;
use indexmap::IndexMap;
use serde::Deserialize;
use crate::convert::Converter;
use crate::descriptor::{Additional, Descriptor, FieldSpec, ObjectShape, PrimitiveKind};
use crate::error::DefinitionError;
use crate::path_de;
use crate::registry::Registry;

// ————————————————————————————————————————————————————————————————————————————
// DOCUMENT
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaDoc {
    root: String,
    types: IndexMap<String, TypeDef>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TypeDef {
    Null,
    Keyword(Keyword),
    Tagged(Tagged),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Keyword {
    String,
    Number,
    Boolean,
    Object,
    Date,
    Any,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Tagged {
    Array(Box<TypeDef>),
    Union(Vec<TypeDef>),
    Enum(Vec<String>),
    Ref(String),
    Object(ObjectDef),
    /// No declared fields; every value checked against the given type.
    Map(Box<TypeDef>),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ObjectDef {
    fields: Vec<FieldDef>,
    #[serde(default)]
    additional: AdditionalDef,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldDef {
    json: String,
    /// Defaults to `json`.
    js: Option<String>,
    #[serde(rename = "type")]
    ty: TypeDef,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AdditionalDef {
    Flag(bool),
    Type(Box<TypeDef>),
}

impl Default for AdditionalDef {
    fn default() -> Self { AdditionalDef::Flag(false) }
}

// ————————————————————————————————————————————————————————————————————————————
// LOWERING
// ————————————————————————————————————————————————————————————————————————————

fn lower(def: TypeDef) -> Descriptor {
    match def {
        TypeDef::Null => Descriptor::Null,
        TypeDef::Keyword(k) => match k {
            Keyword::String => Descriptor::Primitive(PrimitiveKind::String),
            Keyword::Number => Descriptor::Primitive(PrimitiveKind::Number),
            Keyword::Boolean => Descriptor::Primitive(PrimitiveKind::Boolean),
            Keyword::Object => Descriptor::Primitive(PrimitiveKind::Object),
            Keyword::Date => Descriptor::Primitive(PrimitiveKind::Temporal),
            Keyword::Any => Descriptor::Any,
        },
        TypeDef::Tagged(t) => match t {
            Tagged::Array(item) => Descriptor::array(lower(*item)),
            Tagged::Union(members) => Descriptor::union(members.into_iter().map(lower)),
            Tagged::Enum(cases) => Descriptor::Enum(cases),
            Tagged::Ref(name) => Descriptor::Ref(name),
            Tagged::Map(values) => Descriptor::map(lower(*values)),
            Tagged::Object(obj) => {
                let fields = obj.fields.into_iter().map(|f| {
                    let internal = f.js.unwrap_or_else(|| f.json.clone());
                    FieldSpec::new(f.json, internal, lower(f.ty))
                }).collect();
                let additional = match obj.additional {
                    AdditionalDef::Flag(false) => Additional::Disallowed,
                    AdditionalDef::Flag(true) => Additional::any(),
                    AdditionalDef::Type(ty) => Additional::Allowed(Box::new(lower(*ty))),
                };
                Descriptor::Object(ObjectShape::new(fields, additional))
            }
        },
    }
}

// ————————————————————————————————————————————————————————————————————————————
// FRONT API
// ————————————————————————————————————————————————————————————————————————————

/// A checked registry plus the name of its record type.
#[derive(Debug, Clone)]
pub struct Schema {
    pub registry: Arc<Registry>,
    pub root: String,
}

impl Schema {
    pub fn parse(src: &str) -> Result<Self, DefinitionError> {
        let doc: SchemaDoc = path_de::from_str_with_path(src).map_err(|e| {
            DefinitionError::Document { path: e.path, message: e.message }
        })?;
        let registry = doc.types
            .into_iter()
            .fold(Registry::builder(), |b, (name, def)| b.define(name, lower(def)))
            .build()?;
        if !registry.contains(&doc.root) {
            return Err(DefinitionError::UnknownRoot(doc.root));
        }
        Ok(Self { registry: Arc::new(registry), root: doc.root })
    }

    pub fn converter(&self) -> Result<Converter, DefinitionError> {
        Converter::new(Arc::clone(&self.registry), self.root.clone())
    }
}

// ------------------------------- Tests ------------------------------------ //
