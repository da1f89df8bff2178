//! User-supplied tool parameters.
//!
//! A [`ParamSet`] is the form state handed to the command builder: a mapping
//! from option name to a string, number, or boolean value. It is created from
//! the HTTP request body (a JSON object) or from CLI `key=value` pairs, and
//! discarded once a run has been submitted.
//!
//! Validation here is limited to presence checks: the `require_*` accessors
//! fail with a validation error when a field is absent or empty, and never
//! substitute a default for a required value. The `*_or` accessors coerce
//! string-typed values (as produced by CLI pairs) into numbers and booleans
//! so both entry points share one builder path.

use serde_json::{Map, Value};

use clipforge_core::{Error, Result};

/// An ordered mapping from option name to value.
#[derive(Debug, Clone, Default)]
pub struct ParamSet {
    values: Map<String, Value>,
}

impl ParamSet {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a parameter set from a JSON value. `null` is treated as an
    /// empty set; anything other than an object is rejected.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(values) => Ok(Self { values }),
            Value::Null => Ok(Self::new()),
            other => Err(Error::Validation(format!(
                "parameters must be a JSON object, got {other}"
            ))),
        }
    }

    /// Build a parameter set from CLI-style `key=value` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut values = Map::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let Some((key, value)) = pair.split_once('=') else {
                return Err(Error::Validation(format!(
                    "expected key=value, got '{pair}'"
                )));
            };
            values.insert(key.to_string(), Value::String(value.to_string()));
        }
        Ok(Self { values })
    }

    /// Insert or replace a value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Raw lookup.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// True when the field is present and non-empty (non-empty string,
    /// non-empty array, or any number/bool).
    pub fn has(&self, name: &str) -> bool {
        match self.values.get(name) {
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Array(a)) => !a.is_empty(),
            Some(Value::Number(_)) | Some(Value::Bool(_)) => true,
            _ => false,
        }
    }

    /// Optional string accessor.
    pub fn str(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    /// String with default.
    pub fn str_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.str(name).unwrap_or(default)
    }

    /// Optional float accessor, coercing numeric strings.
    pub fn f64(&self, name: &str) -> Option<f64> {
        match self.values.get(name)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Float with default.
    pub fn f64_or(&self, name: &str, default: f64) -> f64 {
        self.f64(name).unwrap_or(default)
    }

    /// Integer with default, coercing numeric strings.
    pub fn i64_or(&self, name: &str, default: i64) -> i64 {
        match self.values.get(name) {
            Some(Value::Number(n)) => n.as_i64().unwrap_or(default),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    /// Unsigned integer with default.
    pub fn u32_or(&self, name: &str, default: u32) -> u32 {
        u32::try_from(self.i64_or(name, i64::from(default))).unwrap_or(default)
    }

    /// Boolean with default, accepting `"true"`/`"false"`/`"1"`/`"0"`.
    pub fn bool_or(&self, name: &str, default: bool) -> bool {
        match self.values.get(name) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => match s.trim() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => default,
            },
            _ => default,
        }
    }

    /// Required non-empty string; fails with a validation error otherwise.
    pub fn require_str(&self, name: &str) -> Result<&str> {
        self.str(name)
            .ok_or_else(|| Error::Validation(format!("'{name}' is required")))
    }

    /// Required list of non-empty strings (accepts a JSON array of strings,
    /// or a single comma-separated string from the CLI).
    pub fn require_list(&self, name: &str) -> Result<Vec<String>> {
        let items: Vec<String> = match self.values.get(name) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            Some(Value::String(s)) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            _ => Vec::new(),
        };
        if items.is_empty() {
            return Err(Error::Validation(format!("'{name}' is required")));
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_object() {
        let params = ParamSet::from_value(json!({"input": "a.mp4", "crf": 20})).unwrap();
        assert_eq!(params.str("input"), Some("a.mp4"));
        assert_eq!(params.f64_or("crf", 23.0), 20.0);
    }

    #[test]
    fn from_json_rejects_non_object() {
        assert!(ParamSet::from_value(json!([1, 2])).is_err());
        assert!(ParamSet::from_value(json!(null)).is_ok());
    }

    #[test]
    fn from_pairs_parses_and_coerces() {
        let params = ParamSet::from_pairs(["input=a.mp4", "factor=2.5", "copy=true"]).unwrap();
        assert_eq!(params.str("input"), Some("a.mp4"));
        assert_eq!(params.f64_or("factor", 1.0), 2.5);
        assert!(params.bool_or("copy", false));
    }

    #[test]
    fn from_pairs_rejects_malformed() {
        assert!(ParamSet::from_pairs(["no-equals-sign"]).is_err());
    }

    #[test]
    fn require_str_rejects_missing_and_empty() {
        let params = ParamSet::from_value(json!({"input": "  "})).unwrap();
        assert!(params.require_str("input").is_err());
        assert!(params.require_str("output").is_err());

        let params = ParamSet::from_value(json!({"input": "clip.mp4"})).unwrap();
        assert_eq!(params.require_str("input").unwrap(), "clip.mp4");
    }

    #[test]
    fn require_list_from_array_and_string() {
        let params = ParamSet::from_value(json!({"inputs": ["a.mp4", "b.mp4"]})).unwrap();
        assert_eq!(params.require_list("inputs").unwrap().len(), 2);

        let params = ParamSet::from_pairs(["inputs=a.mp4, b.mp4"]).unwrap();
        assert_eq!(params.require_list("inputs").unwrap(), ["a.mp4", "b.mp4"]);

        let params = ParamSet::new();
        assert!(params.require_list("inputs").is_err());
    }

    #[test]
    fn has_checks_emptiness() {
        let params =
            ParamSet::from_value(json!({"a": "", "b": "x", "c": [], "d": 0, "e": false})).unwrap();
        assert!(!params.has("a"));
        assert!(params.has("b"));
        assert!(!params.has("c"));
        assert!(params.has("d"));
        assert!(params.has("e"));
        assert!(!params.has("missing"));
    }

    #[test]
    fn numeric_defaults() {
        let params = ParamSet::new();
        assert_eq!(params.u32_or("width", 480), 480);
        assert_eq!(params.i64_or("height", -1), -1);
        assert!(params.bool_or("palette", true));
    }
}
