//! Schema-driven, bidirectional conversion between decoded JSON trees and
//! an internal record representation.
//!
//! A [`Registry`] of named [`Descriptor`]s describes the expected shapes.
//! [`transform`] walks a value against a descriptor in one [`Direction`]:
//! `Decode` checks wire data and renames external keys to internal ones,
//! `Encode` does the reverse for serialization. [`Converter`] wraps the
//! common case of a top-level list of records.
pub mod convert;
pub mod datum;
pub mod descriptor;
pub mod error;
pub mod path_de;
pub mod props;
pub mod registry;
pub mod schema_def;
pub mod transform;

pub use convert::Converter;
pub use datum::Datum;
pub use descriptor::{Additional, Descriptor, FieldSpec, ObjectShape, PrimitiveKind};
pub use error::{DefinitionError, Error, JsonPath, SchemaError, Segment};
pub use props::Direction;
pub use registry::{Registry, RegistryBuilder};
pub use schema_def::Schema;
pub use transform::{MissingFieldPolicy, Options, transform};
