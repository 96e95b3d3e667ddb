//! Internal value tree.
//!
//! Same node kinds as a decoded JSON document, plus `Timestamp` for values
//! produced by the temporal primitive. Object key order is kept as observed.
use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde_json::{Number, Value};

const PREVIEW_MAX_CHARS: usize = 64;
const PREVIEW_MAX_ITEMS: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Timestamp(DateTime<Utc>),
    Array(Vec<Datum>),
    Object(IndexMap<String, Datum>),
}

impl Datum {
    /// Runtime kind name, as used in failure messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Datum::Null => "null",
            Datum::Bool(_) => "boolean",
            Datum::Number(_) => "number",
            Datum::String(_) => "string",
            Datum::Timestamp(_) => "timestamp",
            Datum::Array(_) => "array",
            Datum::Object(_) => "object",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Datum::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, Datum>> {
        match self {
            Datum::Object(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Datum]> {
        match self {
            Datum::Array(xs) => Some(xs),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Datum> {
        self.as_object().and_then(|m| m.get(key))
    }

    /// Bounded single-line rendering for diagnostics.
    pub fn preview(&self) -> String {
        let mut out = String::new();
        write_preview(self, &mut out);
        out
    }
}

fn write_preview(d: &Datum, out: &mut String) {
    match d {
        Datum::String(s) => {
            let mut short: String = s.chars().take(PREVIEW_MAX_CHARS).collect();
            if short.len() < s.len() { short.push('…'); }
            out.push_str(&Value::String(short).to_string());
        }
        Datum::Timestamp(t) => {
            out.push_str("date(");
            out.push_str(&render_timestamp(t));
            out.push(')');
        }
        Datum::Array(xs) => {
            out.push('[');
            for (i, x) in xs.iter().take(PREVIEW_MAX_ITEMS).enumerate() {
                if i > 0 { out.push_str(", "); }
                write_preview(x, out);
            }
            if xs.len() > PREVIEW_MAX_ITEMS { out.push_str(", …"); }
            out.push(']');
        }
        Datum::Object(m) => {
            out.push('{');
            for (i, (k, v)) in m.iter().take(PREVIEW_MAX_ITEMS).enumerate() {
                if i > 0 { out.push_str(", "); }
                out.push_str(&Value::String(k.clone()).to_string());
                out.push_str(": ");
                write_preview(v, out);
            }
            if m.len() > PREVIEW_MAX_ITEMS { out.push_str(", …"); }
            out.push('}');
        }
        Datum::Null => out.push_str("null"),
        Datum::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Datum::Number(n) => out.push_str(&n.to_string()),
    }
}

/// `2020-01-02T03:04:05.000Z`
pub fn render_timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ------------------------------ Boundaries ------------------------------- //

impl From<&Value> for Datum {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => Datum::Null,
            Value::Bool(b) => Datum::Bool(*b),
            Value::Number(n) => Datum::Number(n.clone()),
            Value::String(s) => Datum::String(s.clone()),
            Value::Array(xs) => Datum::Array(xs.iter().map(Datum::from).collect()),
            Value::Object(m) => Datum::Object(
                m.iter().map(|(k, v)| (k.clone(), Datum::from(v))).collect()
            ),
        }
    }
}

impl From<Value> for Datum {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => Datum::Null,
            Value::Bool(b) => Datum::Bool(b),
            Value::Number(n) => Datum::Number(n),
            Value::String(s) => Datum::String(s),
            Value::Array(xs) => Datum::Array(xs.into_iter().map(Datum::from).collect()),
            Value::Object(m) => Datum::Object(
                m.into_iter().map(|(k, v)| (k, Datum::from(v))).collect()
            ),
        }
    }
}

impl From<Datum> for Value {
    fn from(d: Datum) -> Self {
        match d {
            Datum::Null => Value::Null,
            Datum::Bool(b) => Value::Bool(b),
            Datum::Number(n) => Value::Number(n),
            Datum::String(s) => Value::String(s),
            Datum::Timestamp(t) => Value::String(render_timestamp(&t)),
            Datum::Array(xs) => Value::Array(xs.into_iter().map(Value::from).collect()),
            Datum::Object(m) => Value::Object(
                m.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
            ),
        }
    }
}

impl From<&str> for Datum {
    fn from(s: &str) -> Self { Datum::String(s.to_string()) }
}

impl From<bool> for Datum {
    fn from(b: bool) -> Self { Datum::Bool(b) }
}

impl From<DateTime<Utc>> for Datum {
    fn from(t: DateTime<Utc>) -> Self { Datum::Timestamp(t) }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn object_key_order_survives_the_boundary() {
        let v = json!({"z": 1, "a": [true, null], "m": "x"});
        let d = Datum::from(&v);
        let keys: Vec<&str> = d.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, ["z", "a", "m"]);
        assert_eq!(Value::from(d), v);
    }

    #[test]
    fn timestamps_render_like_iso_strings() {
        let t = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(Value::from(Datum::Timestamp(t)), json!("2020-01-02T03:04:05.000Z"));
    }

    #[test]
    fn preview_is_bounded() {
        let long = "x".repeat(500);
        let d = Datum::from(&json!({"s": long, "xs": [1,2,3,4,5,6,7,8,9,10]}));
        let p = d.preview();
        assert!(p.len() < 200, "{p}");
        assert!(p.contains('…'));
    }
}
