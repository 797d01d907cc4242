// src/task/params.rs

//! Typed task parameters.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

/// Parameter name → typed value.
pub type Params = BTreeMap<String, ParamValue>;

/// A typed parameter default.
///
/// The type of the declared default decides how a command-line override is
/// parsed: `--jobs=4` against an integer default yields `Int(4)`, against a
/// string default it yields `Str("4")`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<String>),
}

impl ParamValue {
    /// Parse `raw` into a value of the same type as `self`.
    pub fn parse_same_type(&self, raw: &str) -> Result<ParamValue, String> {
        let raw = raw.trim();
        match self {
            ParamValue::Bool(_) => match raw.to_lowercase().as_str() {
                "true" | "yes" | "1" | "on" => Ok(ParamValue::Bool(true)),
                "false" | "no" | "0" | "off" => Ok(ParamValue::Bool(false)),
                other => Err(format!("expected a boolean, got \"{other}\"")),
            },
            ParamValue::Int(_) => raw
                .parse::<i64>()
                .map(ParamValue::Int)
                .map_err(|e| format!("expected an integer, got \"{raw}\": {e}")),
            ParamValue::Float(_) => raw
                .parse::<f64>()
                .map(ParamValue::Float)
                .map_err(|e| format!("expected a float, got \"{raw}\": {e}")),
            ParamValue::Str(_) => Ok(ParamValue::Str(raw.to_string())),
            ParamValue::List(_) => Ok(ParamValue::List(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
        }
    }
}

impl fmt::Display for ParamValue {
    /// Rendering used for `{param}` interpolation. Lists are space-joined.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Int(i) => write!(f, "{i}"),
            ParamValue::Float(x) => write!(f, "{x}"),
            ParamValue::Str(s) => f.write_str(s),
            ParamValue::List(items) => f.write_str(&items.join(" ")),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Str(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Str(s)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        ParamValue::Int(i)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}
