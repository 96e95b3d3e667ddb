//! Failure taxonomy.
//!
//! Three layers:
//! - [`SchemaError`]: what the engine reports for one `(value, descriptor, direction)` call.
//!   Every data-validation kind carries the [`JsonPath`] of the first point of divergence.
//! - [`DefinitionError`]: schema-authoring defects caught while building a registry.
//! - [`Error`]: umbrella for the text and typed conveniences in [`crate::convert`].
use std::fmt;
use thiserror::Error;

// ————————————————————————————————————————————————————————————————————————————
// PATHS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Location of a failure inside the input tree, rendered as `$.a[1]["odd key"]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonPath(Vec<Segment>);

impl JsonPath {
    pub fn root() -> Self { Self::default() }

    pub fn segments(&self) -> &[Segment] { &self.0 }

    pub fn is_root(&self) -> bool { self.0.is_empty() }

    /// Innermost object key on the path, skipping trailing indices.
    pub fn last_key(&self) -> Option<&str> {
        self.0.iter().rev().find_map(|s| match s {
            Segment::Key(k) => Some(k.as_str()),
            Segment::Index(_) => None,
        })
    }

    fn push_front(&mut self, seg: Segment) { self.0.insert(0, seg); }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for seg in &self.0 {
            match seg {
                Segment::Index(i) => write!(f, "[{i}]")?,
                Segment::Key(k) if is_plain_key(k) => write!(f, ".{k}")?,
                Segment::Key(k) => write!(f, "[{}]", serde_json::Value::from(k.as_str()))?,
            }
        }
        Ok(())
    }
}

fn is_plain_key(k: &str) -> bool {
    let mut chars = k.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ————————————————————————————————————————————————————————————————————————————
// ENGINE FAILURES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// Runtime kind differs from the expected kind.
    #[error("invalid value at {path}: expected {expected}, got {actual}")]
    ShapeMismatch { path: JsonPath, expected: String, actual: String },

    #[error("invalid value at {path}: expected one of {}, got {actual}", quote_list(.allowed))]
    EnumMismatch { path: JsonPath, allowed: Vec<String>, actual: String },

    /// Member errors are not kept; no single member is "the" expected shape.
    #[error("invalid value at {path}: expected one of [{}], got {actual}", .members.join(", "))]
    UnionExhausted { path: JsonPath, members: Vec<String>, actual: String },

    #[error("unexpected field `{key}` at {path}")]
    DisallowedAdditionalField { path: JsonPath, key: String },

    #[error("missing field `{key}` at {path}: expected {expected}")]
    MissingField { path: JsonPath, key: String, expected: String },

    /// A schema defect rather than a data defect.
    #[error("unknown schema reference `{0}`")]
    UnknownSchemaReference(String),
}

impl SchemaError {
    pub fn path(&self) -> Option<&JsonPath> {
        match self {
            Self::ShapeMismatch { path, .. }
            | Self::EnumMismatch { path, .. }
            | Self::UnionExhausted { path, .. }
            | Self::DisallowedAdditionalField { path, .. }
            | Self::MissingField { path, .. } => Some(path),
            Self::UnknownSchemaReference(_) => None,
        }
    }

    /// Innermost field key in whose context the failure happened.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::DisallowedAdditionalField { key, .. } | Self::MissingField { key, .. } => Some(key),
            other => other.path().and_then(JsonPath::last_key),
        }
    }

    /// True for authoring defects that no input could have avoided.
    pub fn is_schema_defect(&self) -> bool {
        matches!(self, Self::UnknownSchemaReference(_))
    }

    /// Prefix the failure location with an enclosing segment.
    pub(crate) fn within(mut self, seg: Segment) -> Self {
        match &mut self {
            Self::ShapeMismatch { path, .. }
            | Self::EnumMismatch { path, .. }
            | Self::UnionExhausted { path, .. }
            | Self::DisallowedAdditionalField { path, .. }
            | Self::MissingField { path, .. } => path.push_front(seg),
            Self::UnknownSchemaReference(_) => {}
        }
        self
    }
}

fn quote_list(xs: &[String]) -> String {
    let quoted = xs.iter().map(|x| format!("{x:?}")).collect::<Vec<_>>();
    format!("[{}]", quoted.join(", "))
}

// ————————————————————————————————————————————————————————————————————————————
// AUTHORING FAILURES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("type `{0}` is defined more than once")]
    DuplicateType(String),

    #[error("type `{from}` refers to unknown type `{name}`")]
    UnknownReference { from: String, name: String },

    #[error("type `{owner}` declares {side} key `{key}` more than once")]
    DuplicateKey { owner: String, side: &'static str, key: String },

    /// `A -> B -> A` with no shape in between never resolves.
    #[error("reference chain never reaches a shape: {}", .0.join(" -> "))]
    AliasCycle(Vec<String>),

    #[error("root type `{0}` is not defined")]
    UnknownRoot(String),

    #[error("invalid schema document at {path}: {message}")]
    Document { path: String, message: String },
}

// ————————————————————————————————————————————————————————————————————————————
// UMBRELLA
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Typed (de)serialization failed after the engine accepted the value.
    #[error("at JSON path {path}: {message}")]
    Typed { path: String, message: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ------------------------------- Tests ------------------------------------ //
