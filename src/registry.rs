//! Name → descriptor registry.
//!
//! Built once, checked once, read-only afterwards. Every reference reachable
//! from a definition is guaranteed to resolve, so the engine never meets an
//! unknown name coming from the registry itself.
use std::collections::{BTreeSet, HashSet};
use indexmap::IndexMap;
use tracing::debug;
use crate::descriptor::{Descriptor, ObjectShape};
use crate::error::{DefinitionError, SchemaError};

#[derive(Debug, Default)]
pub struct Registry {
    types: IndexMap<String, Descriptor>,
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    types: IndexMap<String, Descriptor>,
    duplicates: Vec<String>,
}

impl RegistryBuilder {
    pub fn define(mut self, name: impl Into<String>, descriptor: Descriptor) -> Self {
        let name = name.into();
        if self.types.contains_key(&name) {
            self.duplicates.push(name);
        } else {
            self.types.insert(name, descriptor);
        }
        self
    }

    pub fn build(self) -> Result<Registry, DefinitionError> {
        if let Some(name) = self.duplicates.into_iter().next() {
            return Err(DefinitionError::DuplicateType(name));
        }
        let registry = Registry { types: self.types };
        for (name, descriptor) in &registry.types {
            registry.check_named(name, descriptor)?;
        }
        registry.check_productive()?;
        debug!(types = registry.types.len(), "schema registry built");
        Ok(registry)
    }
}

impl Registry {
    pub fn builder() -> RegistryBuilder { RegistryBuilder::default() }

    pub fn len(&self) -> usize { self.types.len() }

    pub fn is_empty(&self) -> bool { self.types.is_empty() }

    pub fn contains(&self, name: &str) -> bool { self.types.contains_key(name) }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(|k| k.as_str())
    }

    pub fn resolve(&self, name: &str) -> Result<&Descriptor, SchemaError> {
        self.types
            .get(name)
            .ok_or_else(|| SchemaError::UnknownSchemaReference(name.to_string()))
    }

    /// Follow references until a non-reference descriptor is reached.
    pub fn resolve_descriptor<'a>(&'a self, mut descriptor: &'a Descriptor) -> Result<&'a Descriptor, SchemaError> {
        while let Descriptor::Ref(name) = descriptor {
            descriptor = self.resolve(name)?;
        }
        Ok(descriptor)
    }

    /// Validate a caller-supplied descriptor (e.g. a root) against this registry.
    pub fn check(&self, descriptor: &Descriptor) -> Result<(), DefinitionError> {
        self.check_named("<root>", descriptor)
    }

    fn check_named(&self, owner: &str, descriptor: &Descriptor) -> Result<(), DefinitionError> {
        let mut result = Ok(());
        descriptor.walk(&mut |node| {
            if result.is_err() { return; }
            result = match node {
                Descriptor::Ref(name) if !self.contains(name) => {
                    Err(DefinitionError::UnknownReference {
                        from: owner.to_string(),
                        name: name.clone(),
                    })
                }
                Descriptor::Object(shape) => check_unique_keys(owner, shape),
                _ => Ok(()),
            };
        });
        result
    }

    /// Reject definitions that can re-enter themselves without consuming input:
    /// `A = #B`, `B = #A`, or `A = null | #A`.
    fn check_productive(&self) -> Result<(), DefinitionError> {
        let mut done = HashSet::<&str>::new();
        for name in self.types.keys() {
            let mut stack = Vec::new();
            self.visit_heads(name, &mut stack, &mut done)?;
        }
        Ok(())
    }

    fn visit_heads<'a>(
        &'a self,
        name: &'a str,
        stack: &mut Vec<&'a str>,
        done: &mut HashSet<&'a str>,
    ) -> Result<(), DefinitionError> {
        if done.contains(name) { return Ok(()); }
        if let Some(pos) = stack.iter().position(|n| *n == name) {
            let mut chain: Vec<String> = stack[pos..].iter().map(|s| s.to_string()).collect();
            chain.push(name.to_string());
            return Err(DefinitionError::AliasCycle(chain));
        }
        stack.push(name);
        if let Some(descriptor) = self.types.get(name) {
            let mut heads = BTreeSet::new();
            head_refs(descriptor, &mut heads);
            for next in heads {
                self.visit_heads(next, stack, done)?;
            }
        }
        stack.pop();
        done.insert(name);
        Ok(())
    }
}

/// References reached without passing through an array or object.
fn head_refs<'a>(descriptor: &'a Descriptor, out: &mut BTreeSet<&'a str>) {
    match descriptor {
        Descriptor::Ref(name) => { out.insert(name.as_str()); }
        Descriptor::Union(members) => {
            for m in members { head_refs(m, out); }
        }
        _ => {}
    }
}

fn check_unique_keys(owner: &str, shape: &ObjectShape) -> Result<(), DefinitionError> {
    let mut external = HashSet::new();
    let mut internal = HashSet::new();
    for f in &shape.fields {
        if !external.insert(f.external.as_str()) {
            return Err(DefinitionError::DuplicateKey {
                owner: owner.to_string(),
                side: "external",
                key: f.external.clone(),
            });
        }
        if !internal.insert(f.internal.as_str()) {
            return Err(DefinitionError::DuplicateKey {
                owner: owner.to_string(),
                side: "internal",
                key: f.internal.clone(),
            });
        }
    }
    Ok(())
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Additional, FieldSpec};

    fn node() -> Descriptor {
        Descriptor::object(
            [
                FieldSpec::same("label", Descriptor::string()),
                FieldSpec::same("children", Descriptor::array(Descriptor::reference("Node"))),
            ],
            Additional::Disallowed,
        )
    }

    #[test]
    fn recursive_shapes_are_legal() {
        let reg = Registry::builder().define("Node", node()).build().unwrap();
        assert!(matches!(reg.resolve("Node").unwrap(), Descriptor::Object(_)));
    }

    #[test]
    fn references_resolve_transitively() {
        let reg = Registry::builder()
            .define("Alias", Descriptor::reference("Other"))
            .define("Other", Descriptor::reference("Leaf"))
            .define("Leaf", Descriptor::number())
            .build()
            .unwrap();
        let root = Descriptor::reference("Alias");
        assert_eq!(reg.resolve_descriptor(&root).unwrap(), &Descriptor::number());
    }

    #[test]
    fn unknown_reference_fails_at_build() {
        let err = Registry::builder()
            .define("Country", Descriptor::array(Descriptor::reference("Currency")))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            DefinitionError::UnknownReference { ref from, ref name } if from == "Country" && name == "Currency"
        ));
    }

    #[test]
    fn unknown_name_at_lookup_is_a_schema_error() {
        let reg = Registry::builder().build().unwrap();
        let err = reg.resolve("Ghost").unwrap_err();
        assert_eq!(err, SchemaError::UnknownSchemaReference("Ghost".into()));
    }

    #[test]
    fn alias_loops_are_rejected() {
        let err = Registry::builder()
            .define("A", Descriptor::reference("B"))
            .define("B", Descriptor::union([Descriptor::Null, Descriptor::reference("A")]))
            .build()
            .unwrap_err();
        match err {
            DefinitionError::AliasCycle(chain) => assert_eq!(chain, ["A", "B", "A"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let shape = Descriptor::object(
            [
                FieldSpec::new("a", "x", Descriptor::string()),
                FieldSpec::new("b", "x", Descriptor::string()),
            ],
            Additional::Disallowed,
        );
        let err = Registry::builder().define("T", shape).build().unwrap_err();
        assert!(matches!(err, DefinitionError::DuplicateKey { side: "internal", .. }));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = Registry::builder()
            .define("T", Descriptor::string())
            .define("T", Descriptor::number())
            .build()
            .unwrap_err();
        assert!(matches!(err, DefinitionError::DuplicateType(name) if name == "T"));
    }

    #[test]
    fn check_validates_inline_roots() {
        let reg = Registry::builder().define("Node", node()).build().unwrap();
        assert!(reg.check(&Descriptor::array(Descriptor::reference("Node"))).is_ok());
        assert!(reg.check(&Descriptor::array(Descriptor::reference("Nope"))).is_err());
    }
}
