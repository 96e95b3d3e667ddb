use std::sync::Arc;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use json_cast::{
    Additional, Converter, Datum, Descriptor, Direction, FieldSpec, MissingFieldPolicy, Options,
    Registry, SchemaError, transform,
};

fn decode_with(registry: &Registry, d: &Descriptor, v: Value, options: Options) -> Result<Value, SchemaError> {
    transform(registry, &Datum::from(v), d, Direction::Decode, &options).map(Value::from)
}

fn decode(d: &Descriptor, v: Value) -> Result<Value, SchemaError> {
    decode_with(&Registry::default(), d, v, Options::default())
}

fn ab_shape() -> Descriptor {
    Descriptor::object(
        [
            FieldSpec::same("a", Descriptor::string()),
            FieldSpec::same("b", Descriptor::number()),
        ],
        Additional::Disallowed,
    )
}

// ── concrete scenario ────────────────────────────────────────────

#[test]
fn declared_fields_decode() {
    assert_eq!(decode(&ab_shape(), json!({"a": "x", "b": 5})).unwrap(), json!({"a": "x", "b": 5}));
}

#[test]
fn undeclared_field_is_rejected_by_name() {
    let err = decode(&ab_shape(), json!({"a": "x", "b": 5, "c": true})).unwrap_err();
    assert!(matches!(err, SchemaError::DisallowedAdditionalField { ref key, .. } if key == "c"));
    assert_eq!(err.key(), Some("c"));
}

// ── union order ──────────────────────────────────────────────────

#[test]
fn union_result_follows_member_order() {
    let wide = Descriptor::map(Descriptor::Any);
    let renaming = Descriptor::object(
        [FieldSpec::new("k", "key", Descriptor::string())],
        Additional::Disallowed,
    );
    let input = json!({"k": "v"});

    let first_wide = Descriptor::union([wide.clone(), renaming.clone()]);
    assert_eq!(decode(&first_wide, input.clone()).unwrap(), json!({"k": "v"}));

    let first_renaming = Descriptor::union([renaming, wide]);
    assert_eq!(decode(&first_renaming, input).unwrap(), json!({"key": "v"}));
}

// ── enum exactness ───────────────────────────────────────────────

#[test]
fn numeric_lookalikes_are_not_enum_members() {
    let d = Descriptor::enumeration(["5", "true", "null"]);
    assert!(decode(&d, json!("5")).is_ok());
    for loose in [json!(5), json!(true), json!(null), json!(["5"])] {
        assert!(
            matches!(decode(&d, loose.clone()), Err(SchemaError::EnumMismatch { .. })),
            "{loose} should be rejected",
        );
    }
}

// ── additional-field policy ──────────────────────────────────────

#[test]
fn any_additional_passes_undeclared_keys_through() {
    let d = Descriptor::object(
        [FieldSpec::new("a", "alpha", Descriptor::string())],
        Additional::any(),
    );
    let out = decode(&d, json!({"a": "x", "extra": {"deep": [1, null]}, "n": 3})).unwrap();
    assert_eq!(out, json!({"alpha": "x", "extra": {"deep": [1, null]}, "n": 3}));
}

#[test]
fn typed_additional_checks_each_value() {
    let d = Descriptor::map(Descriptor::number());
    assert_eq!(decode(&d, json!({"x": 1, "y": 2})).unwrap(), json!({"x": 1, "y": 2}));
    let err = decode(&d, json!({"x": 1, "y": "2"})).unwrap_err();
    assert_eq!(err.path().unwrap().to_string(), "$.y");
}

// ── missing vs null ──────────────────────────────────────────────

fn nullable_name() -> Descriptor {
    Descriptor::object(
        [FieldSpec::same("name", Descriptor::union([Descriptor::string(), Descriptor::Null]))],
        Additional::Disallowed,
    )
}

#[test]
fn present_null_is_accepted_under_both_policies() {
    for missing in [MissingFieldPolicy::Strict, MissingFieldPolicy::AbsentAsNull] {
        let out = decode_with(&Registry::default(), &nullable_name(), json!({"name": null}), Options { missing });
        assert_eq!(out.unwrap(), json!({"name": null}));
    }
}

#[test]
fn absent_field_fails_under_strict_policy() {
    let err = decode(&nullable_name(), json!({})).unwrap_err();
    match err {
        SchemaError::MissingField { key, expected, .. } => {
            assert_eq!(key, "name");
            assert_eq!(expected, "string | null");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn absent_field_becomes_null_under_lenient_policy() {
    let options = Options { missing: MissingFieldPolicy::AbsentAsNull };
    let out = decode_with(&Registry::default(), &nullable_name(), json!({}), options).unwrap();
    assert_eq!(out, json!({"name": null}));
}

#[test]
fn absent_field_with_an_any_member_is_left_out() {
    let d = Descriptor::object(
        [FieldSpec::same("note", Descriptor::union([Descriptor::string(), Descriptor::Any]))],
        Additional::Disallowed,
    );
    assert_eq!(decode(&d, json!({})).unwrap(), json!({}));
}

// ── array locality ───────────────────────────────────────────────

#[test]
fn only_the_malformed_element_is_reported() {
    let item = Descriptor::object(
        [
            FieldSpec::same("id", Descriptor::number()),
            FieldSpec::same("tag", Descriptor::string()),
        ],
        Additional::Disallowed,
    );
    let d = Descriptor::array(item);
    let err = decode(&d, json!([
        {"id": 0, "tag": "a"},
        {"id": 1, "tag": false},
        {"id": "two", "tag": "c"},
    ]))
    .unwrap_err();
    assert_eq!(err.path().unwrap().to_string(), "$[1].tag");
    assert_eq!(err.key(), Some("tag"));
    assert!(err.to_string().contains("expected string, got false"), "{err}");
}

// ── recursion through the registry ───────────────────────────────

fn tree_registry() -> Registry {
    Registry::builder()
        .define("Tree", Descriptor::object(
            [
                FieldSpec::new("node_label", "label", Descriptor::string()),
                FieldSpec::same("children", Descriptor::array(Descriptor::reference("Tree"))),
            ],
            Additional::Disallowed,
        ))
        .build()
        .unwrap()
}

#[test]
fn recursive_shapes_convert_at_every_depth() {
    let reg = tree_registry();
    let input = json!({"node_label": "root", "children": [
        {"node_label": "a", "children": []},
        {"node_label": "b", "children": [{"node_label": "b1", "children": []}]},
    ]});
    let out = decode_with(&reg, &Descriptor::reference("Tree"), input, Options::default()).unwrap();
    assert_eq!(out["children"][1]["children"][0], json!({"label": "b1", "children": []}));
}

#[test]
fn deep_failures_carry_the_full_path() {
    let reg = tree_registry();
    let input = json!({"node_label": "root", "children": [
        {"node_label": "b", "children": [{"node_label": 9, "children": []}]},
    ]});
    let err = decode_with(&reg, &Descriptor::reference("Tree"), input, Options::default()).unwrap_err();
    assert_eq!(err.path().unwrap().to_string(), "$.children[0].children[0].node_label");
}

#[test]
fn converter_wraps_records_in_a_list() {
    let c = Converter::new(Arc::new(tree_registry()), "Tree").unwrap();
    let records = c.decode(&json!([{"node_label": "x", "children": []}])).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(c.encode(&records).unwrap(), json!([{"node_label": "x", "children": []}]));
}

// ── dates through a full round trip ──────────────────────────────

#[test]
fn dates_normalize_then_stay_put() {
    let reg = Registry::builder()
        .define("Event", Descriptor::object(
            [FieldSpec::new("at", "when", Descriptor::nullable(Descriptor::date()))],
            Additional::Disallowed,
        ))
        .build()
        .unwrap();
    let c = Converter::new(Arc::new(reg), "Event").unwrap();

    let once = c.decode(&json!([{"at": "2024-02-29"}, {"at": null}])).unwrap();
    let wire = c.encode(&once).unwrap();
    assert_eq!(wire, json!([{"at": "2024-02-29T00:00:00.000Z"}, {"at": null}]));
    assert_eq!(c.decode(&wire).unwrap(), once);

    let err = c.decode(&json!([{"at": 1709164800}])).unwrap_err();
    assert!(matches!(err, SchemaError::UnionExhausted { .. }));
}
