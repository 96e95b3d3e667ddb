//! Property direction strategy.
//!
//! Picks, per call, which side of each [`FieldSpec`] is the lookup key.
//! Each [`ObjectShape`] fills one table per direction on first use. The fill
//! is a lock-free race: concurrent callers may both build the table, they
//! build identical ones, and the first to publish wins.
use indexmap::IndexMap;
use once_cell::race::OnceBox;
use crate::descriptor::{Descriptor, FieldSpec, ObjectShape};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// External (wire) keys → internal (program) keys.
    Decode,
    /// Internal keys → external keys.
    Encode,
}

/// Where a source key lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prop {
    pub key: String,
    /// Index into [`ObjectShape::fields`].
    pub field: usize,
}

/// Source key → destination, in declaration order.
pub type PropMap = IndexMap<String, Prop>;

#[derive(Default)]
pub(crate) struct PropCache {
    decode: OnceBox<PropMap>,
    encode: OnceBox<PropMap>,
}

impl PropCache {
    fn slot(&self, direction: Direction) -> &OnceBox<PropMap> {
        match direction {
            Direction::Decode => &self.decode,
            Direction::Encode => &self.encode,
        }
    }

    #[cfg(test)]
    pub(crate) fn is_warm(&self, direction: Direction) -> bool {
        self.slot(direction).get().is_some()
    }
}

impl Direction {
    pub fn source_key(self, field: &FieldSpec) -> &str {
        match self {
            Direction::Decode => &field.external,
            Direction::Encode => &field.internal,
        }
    }

    pub fn destination_key(self, field: &FieldSpec) -> &str {
        match self {
            Direction::Decode => &field.internal,
            Direction::Encode => &field.external,
        }
    }

    /// Key map for `shape` in this direction, built on first request.
    pub fn props(self, shape: &ObjectShape) -> &PropMap {
        shape.props.slot(self).get_or_init(|| Box::new(build_props(self, shape)))
    }
}

/// Resolve the declared field a source key maps to, with its descriptor.
pub fn lookup<'a>(
    direction: Direction,
    shape: &'a ObjectShape,
    source_key: &str,
) -> Option<(&'a str, &'a Descriptor)> {
    let prop = direction.props(shape).get(source_key)?;
    Some((prop.key.as_str(), &shape.fields[prop.field].ty))
}

fn build_props(direction: Direction, shape: &ObjectShape) -> PropMap {
    shape.fields.iter().enumerate().map(|(i, f)| {
        let prop = Prop { key: direction.destination_key(f).to_string(), field: i };
        (direction.source_key(f).to_string(), prop)
    }).collect()
}

// ------------------------------- Tests ------------------------------------ //
