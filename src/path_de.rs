use serde::de::DeserializeOwned;
use serde_json::Value;
use crate::error::Error;

/// A serde failure with the JSON path it happened at.
#[derive(Debug)]
pub struct PathError {
    pub path: String,
    pub message: String,
}

impl PathError {
    fn from_serde(err: serde_path_to_error::Error<serde_json::Error>) -> Self {
        let path = err.path().to_string();
        Self { path, message: err.into_inner().to_string() }
    }

    /// Re-anchor under record `index` of the top-level list.
    pub fn at_record(self, index: usize) -> Error {
        let path = match self.path.as_str() {
            "." => format!("$[{index}]"),
            rest => format!("$[{index}].{rest}"),
        };
        Error::Typed { path, message: self.message }
    }
}

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, PathError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(PathError::from_serde)
}

pub fn from_value_with_path<T: DeserializeOwned>(value: Value) -> Result<T, PathError> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(PathError::from_serde)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Outer { inner: Vec<Inner> }

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Inner { code: String }

    #[test]
    fn errors_carry_the_path() {
        let err = from_str_with_path::<Outer>(r#"{"inner": [{"code": "a"}, {"code": 1}]}"#).unwrap_err();
        assert_eq!(err.path, "inner[1].code");
        match err.at_record(4) {
            Error::Typed { path, .. } => assert_eq!(path, "$[4].inner[1].code"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
