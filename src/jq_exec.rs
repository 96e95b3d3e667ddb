//! Input pre-selection: JSON Pointer and jq (via jaq).
use anyhow::{anyhow, Context, Result};
use jaq_core::{compile::Undefined, load, Compiler, Ctx, RcIter};
use jaq_json::Val;
use serde_json::Value;

/// Run `filter_src` over `input`; every jq output becomes one document.
pub fn run_jaq(filter_src: &str, input: &Value) -> Result<Vec<Value>> {
    let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = load::Arena::default();
    let program = load::File { code: filter_src, path: () };

    let modules = loader
        .load(&arena, program)
        .map_err(format_parse_errors)?;

    let filter = Compiler::default()
        .with_funs(jaq_std::funs().chain(jaq_json::funs()))
        .compile(modules)
        .map_err(format_undefined_errors)?;

    let inputs = RcIter::new(core::iter::empty());
    let mut it = filter.run((Ctx::new([], &inputs), Val::from(input.clone())));

    let mut out = Vec::new();
    while let Some(item) = it.next() {
        let v = item.map_err(|e| anyhow!("jq runtime error: {e:?}"))?;
        // Val renders as JSON text; reparse to stay on serde_json values.
        let doc = serde_json::from_str::<Value>(&v.to_string())
            .with_context(|| format!("jq produced non-JSON output `{v}`"))?;
        out.push(doc);
    }
    Ok(out)
}

/// Select a subnode; a missing target is an error rather than an empty result.
pub fn select_pointer(input: Value, pointer: &str) -> Result<Value> {
    let mut input = input;
    input
        .pointer_mut(pointer)
        .map(std::mem::take)
        .ok_or_else(|| anyhow!("JSON pointer `{pointer}` matched nothing"))
}

fn format_parse_errors(
    errs: Vec<(load::File<&str, ()>, load::Error<&str>)>,
) -> anyhow::Error {
    let mut s = String::new();
    for (file, err) in errs {
        s.push_str(&format!("parse error: {err:?} in `{}`\n", file.code));
    }
    anyhow!(s)
}

fn format_undefined_errors(
    errs: Vec<(load::File<&str, ()>, Vec<(&str, Undefined)>)>,
) -> anyhow::Error {
    let mut s = String::new();
    for (file, list) in errs {
        for (name, undef) in list {
            s.push_str(&format!("undefined `{name}`: {undef:?} in `{}`\n", file.code));
        }
    }
    anyhow!(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn jq_unwraps_a_wrapper_document() {
        let doc = json!({"data": {"items": [{"a": 1}, {"a": 2}]}});
        let out = run_jaq(".data.items", &doc).unwrap();
        assert_eq!(out, [json!([{"a": 1}, {"a": 2}])]);
    }

    #[test]
    fn jq_streams_multiple_outputs() {
        let out = run_jaq(".[]", &json!([1, "x"])).unwrap();
        assert_eq!(out, [json!(1), json!("x")]);
    }

    #[test]
    fn pointer_selects_or_fails() {
        let doc = json!({"payload": [1, 2]});
        assert_eq!(select_pointer(doc.clone(), "/payload").unwrap(), json!([1, 2]));
        assert!(select_pointer(doc, "/nope").is_err());
    }
}
