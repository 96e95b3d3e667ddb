//! Type descriptor algebra.
//!
//! A closed set of shapes a schema author can express. Named sharing and
//! recursion go through [`Descriptor::Ref`], resolved one hop at a time by
//! [`crate::registry::Registry`]; descriptors never embed themselves.
use std::fmt;
use crate::props::PropCache;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    String,
    Number,
    Boolean,
    /// Opaque keyed map, passed through untouched.
    Object,
    /// Text parsed into a timestamp; numbers are never reinterpreted as dates.
    Temporal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Descriptor {
    Primitive(PrimitiveKind),
    Any,
    Null,
    Array(Box<Descriptor>),
    /// Ordered; first member that converts wins.
    Union(Vec<Descriptor>),
    Enum(Vec<String>),
    Object(ObjectShape),
    Ref(String),
}

/// Policy for keys present in the input but not declared on the shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Additional {
    Disallowed,
    Allowed(Box<Descriptor>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Wire-side key.
    pub external: String,
    /// Program-side key.
    pub internal: String,
    pub ty: Descriptor,
}

pub struct ObjectShape {
    pub fields: Vec<FieldSpec>,
    pub additional: Additional,
    pub(crate) props: PropCache,
}

// ————————————————————————————————————————————————————————————————————————————
// CONSTRUCTION
// ————————————————————————————————————————————————————————————————————————————

impl Descriptor {
    pub fn string() -> Self { Descriptor::Primitive(PrimitiveKind::String) }
    pub fn number() -> Self { Descriptor::Primitive(PrimitiveKind::Number) }
    pub fn boolean() -> Self { Descriptor::Primitive(PrimitiveKind::Boolean) }
    pub fn opaque_object() -> Self { Descriptor::Primitive(PrimitiveKind::Object) }
    pub fn date() -> Self { Descriptor::Primitive(PrimitiveKind::Temporal) }

    pub fn array(item: Descriptor) -> Self { Descriptor::Array(Box::new(item)) }

    pub fn union<I: IntoIterator<Item = Descriptor>>(members: I) -> Self {
        Descriptor::Union(members.into_iter().collect())
    }

    /// `member | null`, null tried first.
    pub fn nullable(inner: Descriptor) -> Self {
        Descriptor::Union(vec![Descriptor::Null, inner])
    }

    pub fn enumeration<I, S>(cases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Descriptor::Enum(cases.into_iter().map(Into::into).collect())
    }

    pub fn object<I: IntoIterator<Item = FieldSpec>>(fields: I, additional: Additional) -> Self {
        Descriptor::Object(ObjectShape::new(fields.into_iter().collect(), additional))
    }

    /// Free-form map: no declared fields, every key checked against `values`.
    pub fn map(values: Descriptor) -> Self {
        Descriptor::Object(ObjectShape::new(Vec::new(), Additional::Allowed(Box::new(values))))
    }

    pub fn reference(name: impl Into<String>) -> Self { Descriptor::Ref(name.into()) }

    /// Visit every nested descriptor without following references.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Descriptor)) {
        visit(self);
        match self {
            Descriptor::Array(item) => item.walk(visit),
            Descriptor::Union(members) => {
                for m in members { m.walk(visit); }
            }
            Descriptor::Object(shape) => {
                for f in &shape.fields { f.ty.walk(visit); }
                if let Additional::Allowed(extra) = &shape.additional {
                    extra.walk(visit);
                }
            }
            Descriptor::Primitive(_)
            | Descriptor::Any
            | Descriptor::Null
            | Descriptor::Enum(_)
            | Descriptor::Ref(_) => {}
        }
    }
}

impl Additional {
    pub fn any() -> Self { Additional::Allowed(Box::new(Descriptor::Any)) }
}

impl FieldSpec {
    pub fn new(external: impl Into<String>, internal: impl Into<String>, ty: Descriptor) -> Self {
        Self { external: external.into(), internal: internal.into(), ty }
    }

    /// Same key on both sides.
    pub fn same(key: impl Into<String>, ty: Descriptor) -> Self {
        let key = key.into();
        Self { external: key.clone(), internal: key, ty }
    }
}

impl ObjectShape {
    pub fn new(fields: Vec<FieldSpec>, additional: Additional) -> Self {
        Self { fields, additional, props: PropCache::default() }
    }
}

// Caches are derived data: a clone starts cold, equality ignores them.

impl Clone for ObjectShape {
    fn clone(&self) -> Self { Self::new(self.fields.clone(), self.additional.clone()) }
}

impl PartialEq for ObjectShape {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields && self.additional == other.additional
    }
}

impl Eq for Descriptor {}
impl Eq for Additional {}

impl fmt::Debug for ObjectShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectShape")
            .field("fields", &self.fields)
            .field("additional", &self.additional)
            .finish()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DESCRIPTIONS
// ————————————————————————————————————————————————————————————————————————————

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PrimitiveKind::String => "string",
            PrimitiveKind::Number => "number",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Object => "object",
            PrimitiveKind::Temporal => "date",
        })
    }
}

/// Expected-shape description. References print by name and are not followed.
impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Descriptor::Primitive(kind) => write!(f, "{kind}"),
            Descriptor::Any => f.write_str("any"),
            Descriptor::Null => f.write_str("null"),
            Descriptor::Array(item) => write!(f, "array<{item}>"),
            Descriptor::Union(members) => {
                let parts = members.iter().map(|m| m.to_string()).collect::<Vec<_>>();
                write!(f, "{}", parts.join(" | "))
            }
            Descriptor::Enum(cases) => {
                let parts = cases.iter().map(|c| format!("{c:?}")).collect::<Vec<_>>();
                write!(f, "enum[{}]", parts.join(", "))
            }
            Descriptor::Object(_) => f.write_str("object"),
            Descriptor::Ref(name) => write!(f, "#{name}"),
        }
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptions_are_compact() {
        let d = Descriptor::array(Descriptor::union([
            Descriptor::Null,
            Descriptor::reference("Currency"),
            Descriptor::enumeration(["EU", "EFTA"]),
        ]));
        assert_eq!(d.to_string(), r#"array<null | #Currency | enum["EU", "EFTA"]>"#);
        assert_eq!(Descriptor::date().to_string(), "date");
    }

    #[test]
    fn clone_compares_equal_and_starts_cold() {
        let d = Descriptor::object(
            [FieldSpec::new("first_name", "firstName", Descriptor::string())],
            Additional::Disallowed,
        );
        let Descriptor::Object(shape) = &d else { unreachable!() };
        let _ = crate::props::Direction::Decode.props(shape);
        assert!(shape.props.is_warm(crate::props::Direction::Decode));

        let copy = d.clone();
        assert_eq!(copy, d);
        let Descriptor::Object(copied) = &copy else { unreachable!() };
        assert!(!copied.props.is_warm(crate::props::Direction::Decode));
    }

    #[test]
    fn walk_does_not_follow_references() {
        let d = Descriptor::object(
            [
                FieldSpec::same("children", Descriptor::array(Descriptor::reference("Node"))),
                FieldSpec::same("label", Descriptor::nullable(Descriptor::string())),
            ],
            Additional::any(),
        );
        let mut refs = Vec::new();
        let mut count = 0;
        d.walk(&mut |node| {
            count += 1;
            if let Descriptor::Ref(name) = node { refs.push(name.clone()); }
        });
        assert_eq!(refs, ["Node"]);
        // object, array, ref, union, null, string, any
        assert_eq!(count, 7);
    }
}
