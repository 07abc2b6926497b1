//! Node parameters: typed values with editable ranges or allowed sets.
//!
//! A [`ParameterSet`] is the whole user-editable configuration of a node
//! model. It is what `save`/`load` persist; ports, connections and cached
//! outputs are never part of it.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// A single parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Choice(String),
    Text(String),
    Path(PathBuf),
}

impl ParameterValue {
    fn kind_name(&self) -> &'static str {
        match self {
            ParameterValue::Int(_) => "integer",
            ParameterValue::Float(_) => "float",
            ParameterValue::Bool(_) => "boolean",
            ParameterValue::Choice(_) => "choice",
            ParameterValue::Text(_) => "text",
            ParameterValue::Path(_) => "path",
        }
    }

    /// JSON representation used in saved graphs
    pub fn to_json(&self) -> Value {
        match self {
            ParameterValue::Int(v) => Value::from(*v),
            ParameterValue::Float(v) => Value::from(*v),
            ParameterValue::Bool(v) => Value::from(*v),
            ParameterValue::Choice(v) | ParameterValue::Text(v) => Value::from(v.clone()),
            ParameterValue::Path(v) => Value::from(v.to_string_lossy().into_owned()),
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Int(v) => write!(f, "{}", v),
            ParameterValue::Float(v) => write!(f, "{}", v),
            ParameterValue::Bool(v) => write!(f, "{}", v),
            ParameterValue::Choice(v) | ParameterValue::Text(v) => f.write_str(v),
            ParameterValue::Path(v) => write!(f, "{}", v.display()),
        }
    }
}

/// The editable range or allowed set of a parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterKind {
    Int { min: i64, max: i64 },
    Float { min: f64, max: f64 },
    Bool,
    Choice { options: Vec<String> },
    Text,
    Path,
}

/// Errors raised while editing or validating parameters
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    #[error("unknown parameter '{0}'")]
    Unknown(String),
    #[error("parameter '{name}' expects a {expected} value")]
    TypeMismatch { name: String, expected: &'static str },
    #[error("'{value}' is not an allowed value for parameter '{name}'")]
    NotAllowed { name: String, value: String },
    #[error("parameter '{name}' = {value} is outside {min}..={max}")]
    OutOfRange {
        name: String,
        value: String,
        min: String,
        max: String,
    },
}

/// Declaration of one parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub label: String,
    pub kind: ParameterKind,
    pub default: ParameterValue,
}

impl ParameterSpec {
    pub fn int(name: &str, label: &str, default: i64, min: i64, max: i64) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind: ParameterKind::Int { min, max },
            default: ParameterValue::Int(default),
        }
    }

    pub fn float(name: &str, label: &str, default: f64, min: f64, max: f64) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind: ParameterKind::Float { min, max },
            default: ParameterValue::Float(default),
        }
    }

    pub fn boolean(name: &str, label: &str, default: bool) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind: ParameterKind::Bool,
            default: ParameterValue::Bool(default),
        }
    }

    pub fn choice(name: &str, label: &str, default: &str, options: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind: ParameterKind::Choice {
                options: options.iter().map(|s| s.to_string()).collect(),
            },
            default: ParameterValue::Choice(default.to_string()),
        }
    }

    pub fn text(name: &str, label: &str, default: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind: ParameterKind::Text,
            default: ParameterValue::Text(default.to_string()),
        }
    }

    pub fn path(name: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind: ParameterKind::Path,
            default: ParameterValue::Path(PathBuf::new()),
        }
    }

    /// Check type and allowed set. Numeric ranges are checked by
    /// [`ParameterSpec::check_range`].
    fn coerce(&self, value: ParameterValue) -> Result<ParameterValue, ParameterError> {
        let mismatch = || ParameterError::TypeMismatch {
            name: self.name.clone(),
            expected: self.default.kind_name(),
        };

        match (&self.kind, value) {
            (ParameterKind::Int { .. }, v @ ParameterValue::Int(_)) => Ok(v),
            // NaN and infinities have no JSON form
            (ParameterKind::Float { .. }, ParameterValue::Float(v)) if !v.is_finite() => {
                Err(ParameterError::NotAllowed {
                    name: self.name.clone(),
                    value: v.to_string(),
                })
            }
            (ParameterKind::Float { .. }, v @ ParameterValue::Float(_)) => Ok(v),
            (ParameterKind::Float { .. }, ParameterValue::Int(v)) => Ok(ParameterValue::Float(v as f64)),
            (ParameterKind::Bool, v @ ParameterValue::Bool(_)) => Ok(v),
            (ParameterKind::Choice { options }, ParameterValue::Choice(v))
            | (ParameterKind::Choice { options }, ParameterValue::Text(v)) => {
                if options.iter().any(|o| o == &v) {
                    Ok(ParameterValue::Choice(v))
                } else {
                    Err(ParameterError::NotAllowed {
                        name: self.name.clone(),
                        value: v,
                    })
                }
            }
            (ParameterKind::Text, v @ ParameterValue::Text(_)) => Ok(v),
            (ParameterKind::Path, v @ ParameterValue::Path(_)) => Ok(v),
            (ParameterKind::Path, ParameterValue::Text(v)) => Ok(ParameterValue::Path(PathBuf::from(v))),
            _ => Err(mismatch()),
        }
    }

    fn from_json(&self, value: &Value) -> Result<ParameterValue, ParameterError> {
        let mismatch = || ParameterError::TypeMismatch {
            name: self.name.clone(),
            expected: self.default.kind_name(),
        };

        let parsed = match &self.kind {
            ParameterKind::Int { .. } => ParameterValue::Int(value.as_i64().ok_or_else(mismatch)?),
            ParameterKind::Float { .. } => ParameterValue::Float(value.as_f64().ok_or_else(mismatch)?),
            ParameterKind::Bool => ParameterValue::Bool(value.as_bool().ok_or_else(mismatch)?),
            ParameterKind::Choice { .. } => {
                ParameterValue::Choice(value.as_str().ok_or_else(mismatch)?.to_string())
            }
            ParameterKind::Text => ParameterValue::Text(value.as_str().ok_or_else(mismatch)?.to_string()),
            ParameterKind::Path => ParameterValue::Path(PathBuf::from(value.as_str().ok_or_else(mismatch)?)),
        };
        self.coerce(parsed)
    }

    /// Check a value against the numeric range of this parameter
    pub fn check_range(&self, value: &ParameterValue) -> Result<(), ParameterError> {
        let out_of_range = |min: String, max: String| ParameterError::OutOfRange {
            name: self.name.clone(),
            value: value.to_string(),
            min,
            max,
        };

        match (&self.kind, value) {
            (ParameterKind::Int { min, max }, ParameterValue::Int(v)) if v < min || v > max => {
                Err(out_of_range(min.to_string(), max.to_string()))
            }
            (ParameterKind::Float { min, max }, ParameterValue::Float(v))
                if v.is_nan() || v < min || v > max =>
            {
                Err(out_of_range(min.to_string(), max.to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// The full configuration of one node model
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    specs: Vec<ParameterSpec>,
    values: BTreeMap<String, ParameterValue>,
}

impl ParameterSet {
    /// Create a set with every parameter at its default
    pub fn new(specs: Vec<ParameterSpec>) -> Self {
        let values = specs
            .iter()
            .map(|spec| (spec.name.clone(), spec.default.clone()))
            .collect();
        Self { specs, values }
    }

    pub fn specs(&self) -> &[ParameterSpec] {
        &self.specs
    }

    pub fn spec(&self, name: &str) -> Option<&ParameterSpec> {
        self.specs.iter().find(|spec| spec.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.values.get(name)
    }

    pub fn int(&self, name: &str) -> i64 {
        match self.values.get(name) {
            Some(ParameterValue::Int(v)) => *v,
            _ => 0,
        }
    }

    pub fn float(&self, name: &str) -> f64 {
        match self.values.get(name) {
            Some(ParameterValue::Float(v)) => *v,
            Some(ParameterValue::Int(v)) => *v as f64,
            _ => 0.0,
        }
    }

    pub fn bool(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(ParameterValue::Bool(true)))
    }

    /// Value of a choice or text parameter
    pub fn text(&self, name: &str) -> &str {
        match self.values.get(name) {
            Some(ParameterValue::Choice(v)) | Some(ParameterValue::Text(v)) => v,
            _ => "",
        }
    }

    pub fn path(&self, name: &str) -> Option<&std::path::Path> {
        match self.values.get(name) {
            Some(ParameterValue::Path(p)) if !p.as_os_str().is_empty() => Some(p),
            _ => None,
        }
    }

    /// Set a parameter. Returns whether the stored value changed.
    pub fn set(&mut self, name: &str, value: ParameterValue) -> Result<bool, ParameterError> {
        let spec = self
            .spec(name)
            .ok_or_else(|| ParameterError::Unknown(name.to_string()))?;
        let value = spec.coerce(value)?;

        let changed = self.values.get(name) != Some(&value);
        self.values.insert(name.to_string(), value);
        Ok(changed)
    }

    /// Check every numeric parameter against its range
    pub fn validate(&self) -> Result<(), ParameterError> {
        for spec in &self.specs {
            if let Some(value) = self.values.get(&spec.name) {
                spec.check_range(value)?;
            }
        }
        Ok(())
    }

    /// Serialize every parameter into a JSON object
    pub fn to_json(&self) -> Map<String, Value> {
        self.specs
            .iter()
            .filter_map(|spec| {
                self.values
                    .get(&spec.name)
                    .map(|value| (spec.name.clone(), value.to_json()))
            })
            .collect()
    }

    /// Restore parameters from a JSON object.
    ///
    /// Either every entry is applied or none is. Parameters absent from the
    /// object keep their current value.
    pub fn load_json(&mut self, object: &Map<String, Value>) -> Result<(), ParameterError> {
        let mut parsed = Vec::with_capacity(object.len());
        for (name, raw) in object {
            let spec = self
                .spec(name)
                .ok_or_else(|| ParameterError::Unknown(name.clone()))?;
            parsed.push((name.clone(), spec.from_json(raw)?));
        }

        for (name, value) in parsed {
            self.values.insert(name, value);
        }
        Ok(())
    }
}
