//! Type-directed transformation engine.
//!
//! Walks a [`Datum`] against a [`Descriptor`], resolving references one hop
//! at a time, and either rebuilds the value with object keys renamed for the
//! active [`Direction`] or reports the first point of divergence.
//!
//! Rules per descriptor:
//! - `Primitive`: runtime kind must match; `date` also parses text and keeps null.
//! - `Any`: passes through, including an absent field.
//! - `Array`: every element, order and length preserved.
//! - `Union`: members in order, first success wins, member failures dropped.
//! - `Enum`: exact string membership.
//! - `Object`: declared fields re-keyed, undeclared keys per `additional`.
use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound, Utc};
use indexmap::IndexMap;
use tracing::trace;
use crate::datum::Datum;
use crate::descriptor::{Additional, Descriptor, ObjectShape, PrimitiveKind};
use crate::error::{JsonPath, SchemaError, Segment};
use crate::props::Direction;
use crate::registry::Registry;

// ------------------------------- Policy ---------------------------------- //

/// What a declared field whose key is missing from the input turns into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingFieldPolicy {
    /// Absent stays absent: only `any` (alone or inside a union) accepts it,
    /// and the key is left out of the output. Everything else is `MissingField`.
    #[default]
    Strict,
    /// Absent is fed to the field's descriptor as an explicit `null`.
    AbsentAsNull,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    pub missing: MissingFieldPolicy,
}

static NULL: Datum = Datum::Null;

// ------------------------------ Front API -------------------------------- //

pub fn transform(
    registry: &Registry,
    value: &Datum,
    descriptor: &Descriptor,
    direction: Direction,
    options: &Options,
) -> Result<Datum, SchemaError> {
    Engine { registry, direction, options: *options }.value(value, descriptor)
}

// -------------------------------- Engine --------------------------------- //

struct Engine<'r> {
    registry: &'r Registry,
    direction: Direction,
    options: Options,
}

impl Engine<'_> {
    fn value(&self, value: &Datum, descriptor: &Descriptor) -> Result<Datum, SchemaError> {
        match self.registry.resolve_descriptor(descriptor)? {
            Descriptor::Any => Ok(value.clone()),
            Descriptor::Null => match value {
                Datum::Null => Ok(Datum::Null),
                _ => Err(mismatch("null", value)),
            },
            Descriptor::Primitive(kind) => primitive(*kind, value),
            Descriptor::Enum(cases) => enumeration(cases, value),
            Descriptor::Array(item) => self.array(item, value),
            Descriptor::Union(members) => self.union(members, value),
            Descriptor::Object(shape) => self.object(shape, value),
            Descriptor::Ref(name) => unreachable!("`{name}` survived reference resolution"),
        }
    }

    /// A declared field's value, possibly absent.
    fn slot(
        &self,
        value: Option<&Datum>,
        descriptor: &Descriptor,
        key: &str,
    ) -> Result<Option<Datum>, SchemaError> {
        match value {
            Some(v) => self.value(v, descriptor).map(Some),
            None if self.accepts_absent(descriptor)? => Ok(None),
            None => Err(SchemaError::MissingField {
                path: JsonPath::root(),
                key: key.to_string(),
                expected: descriptor.to_string(),
            }),
        }
    }

    fn accepts_absent(&self, descriptor: &Descriptor) -> Result<bool, SchemaError> {
        match self.registry.resolve_descriptor(descriptor)? {
            Descriptor::Any => Ok(true),
            Descriptor::Union(members) => {
                for m in members {
                    if self.accepts_absent(m)? { return Ok(true); }
                }
                Ok(false)
            }
            _ => Ok(false),
        }
    }

    fn array(&self, item: &Descriptor, value: &Datum) -> Result<Datum, SchemaError> {
        let Datum::Array(xs) = value else {
            return Err(mismatch("array", value));
        };
        xs.iter()
            .enumerate()
            .map(|(i, x)| self.value(x, item).map_err(|e| e.within(Segment::Index(i))))
            .collect::<Result<Vec<_>, _>>()
            .map(Datum::Array)
    }

    fn union(&self, members: &[Descriptor], value: &Datum) -> Result<Datum, SchemaError> {
        for member in members {
            match self.value(value, member) {
                Ok(converted) => return Ok(converted),
                Err(error) if error.is_schema_defect() => return Err(error),
                Err(error) => trace!(%member, %error, "union member rejected value"),
            }
        }
        Err(SchemaError::UnionExhausted {
            path: JsonPath::root(),
            members: members.iter().map(|m| m.to_string()).collect(),
            actual: value.preview(),
        })
    }

    fn object(&self, shape: &ObjectShape, value: &Datum) -> Result<Datum, SchemaError> {
        let Datum::Object(input) = value else {
            return Err(mismatch("object", value));
        };
        let props = self.direction.props(shape);
        let mut out = IndexMap::with_capacity(input.len());

        for (source, prop) in props {
            let field = &shape.fields[prop.field];
            let found = input.get(source).or(match self.options.missing {
                MissingFieldPolicy::Strict => None,
                MissingFieldPolicy::AbsentAsNull => Some(&NULL),
            });
            let converted = self
                .slot(found, &field.ty, source)
                .map_err(|e| e.within(Segment::Key(source.clone())))?;
            if let Some(v) = converted {
                out.insert(prop.key.clone(), v);
            }
        }

        for (key, v) in input {
            if props.contains_key(key) { continue; }
            match &shape.additional {
                Additional::Disallowed => {
                    return Err(SchemaError::DisallowedAdditionalField {
                        path: JsonPath::root(),
                        key: key.clone(),
                    });
                }
                Additional::Allowed(extra) => {
                    let converted = self
                        .value(v, extra)
                        .map_err(|e| e.within(Segment::Key(key.clone())))?;
                    out.insert(key.clone(), converted);
                }
            }
        }

        Ok(Datum::Object(out))
    }
}

// -------------------------------- Leaves --------------------------------- //

fn primitive(kind: PrimitiveKind, value: &Datum) -> Result<Datum, SchemaError> {
    let ok = match (kind, value) {
        (PrimitiveKind::String, Datum::String(_))
        | (PrimitiveKind::Number, Datum::Number(_))
        | (PrimitiveKind::Boolean, Datum::Bool(_))
        | (PrimitiveKind::Object, Datum::Object(_))
        | (PrimitiveKind::Temporal, Datum::Null) => true,
        (PrimitiveKind::Temporal, Datum::Timestamp(t)) => {
            return Ok(Datum::Timestamp(t.trunc_subsecs(TIMESTAMP_DIGITS)));
        }
        (PrimitiveKind::Temporal, Datum::String(s)) => {
            return parse_timestamp(s)
                .map(Datum::Timestamp)
                .ok_or_else(|| mismatch("date", value));
        }
        _ => false,
    };
    if ok { Ok(value.clone()) } else { Err(mismatch(&kind.to_string(), value)) }
}

fn enumeration(cases: &[String], value: &Datum) -> Result<Datum, SchemaError> {
    match value {
        Datum::String(s) if cases.iter().any(|c| c == s) => Ok(value.clone()),
        _ => Err(SchemaError::EnumMismatch {
            path: JsonPath::root(),
            allowed: cases.to_vec(),
            actual: value.preview(),
        }),
    }
}

fn mismatch(expected: &str, value: &Datum) -> SchemaError {
    SchemaError::ShapeMismatch {
        path: JsonPath::root(),
        expected: expected.to_string(),
        actual: value.preview(),
    }
}

/// Timestamps keep millisecond precision, the most their rendering carries.
const TIMESTAMP_DIGITS: u16 = 3;

/// RFC 3339, RFC 2822, naive `YYYY-MM-DDTHH:MM:SS[.f]` or bare `YYYY-MM-DD`; naive forms read as UTC.
/// Sub-millisecond digits are dropped.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    parse_full_timestamp(s).map(|t| t.trunc_subsecs(TIMESTAMP_DIGITS))
}

fn parse_full_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = DateTime::parse_from_rfc2822(s) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(t.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

// ------------------------------- Tests ------------------------------------ //
