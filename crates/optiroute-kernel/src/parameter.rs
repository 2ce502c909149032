//! Typed solver parameter schema.
//!
//! Each solver registers a list of [`ParameterSpec`]s. Every value that ends
//! up in a synthesized [`ParameterMap`] has passed [`ParameterSpec::validate`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A concrete parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParameterValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::Int(v) => Some(*v as f64),
            ParameterValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParameterValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Bool(v) => write!(f, "{}", v),
            ParameterValue::Int(v) => write!(f, "{}", v),
            ParameterValue::Float(v) => write!(f, "{}", v),
            ParameterValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// Validated solver parameters, ordered by name for stable output.
pub type ParameterMap = BTreeMap<String, ParameterValue>;

/// Type and bounds of a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParameterKind {
    Bool,
    Int { min: i64, max: i64 },
    Float { min: f64, max: f64 },
    Choice { values: Vec<String> },
}

/// What a parameter controls. Synthesis adjusts parameters by role rather
/// than by backend-specific name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParameterRole {
    /// Wall-clock limit in seconds.
    TimeLimit,
    /// Worker thread count.
    Threads,
    /// Relative optimality gap.
    OptimalityGap,
    /// Iteration cap.
    IterationLimit,
    #[default]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParameterKind,
    pub default: ParameterValue,
    #[serde(default)]
    pub role: ParameterRole,
    #[serde(default)]
    pub description: String,
}

impl ParameterSpec {
    pub fn int(name: impl Into<String>, default: i64, min: i64, max: i64) -> Self {
        Self {
            name: name.into(),
            kind: ParameterKind::Int { min, max },
            default: ParameterValue::Int(default),
            role: ParameterRole::Other,
            description: String::new(),
        }
    }

    pub fn float(name: impl Into<String>, default: f64, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            kind: ParameterKind::Float { min, max },
            default: ParameterValue::Float(default),
            role: ParameterRole::Other,
            description: String::new(),
        }
    }

    pub fn boolean(name: impl Into<String>, default: bool) -> Self {
        Self {
            name: name.into(),
            kind: ParameterKind::Bool,
            default: ParameterValue::Bool(default),
            role: ParameterRole::Other,
            description: String::new(),
        }
    }

    pub fn choice(name: impl Into<String>, default: &str, values: &[&str]) -> Self {
        Self {
            name: name.into(),
            kind: ParameterKind::Choice {
                values: values.iter().map(|v| v.to_string()).collect(),
            },
            default: ParameterValue::Text(default.to_string()),
            role: ParameterRole::Other,
            description: String::new(),
        }
    }

    pub fn with_role(mut self, role: ParameterRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Check a value against this parameter's type, bounds and choices.
    ///
    /// Integer values are accepted for float parameters; nothing else is
    /// coerced.
    pub fn validate(&self, value: &ParameterValue) -> Result<(), String> {
        match (&self.kind, value) {
            (ParameterKind::Bool, ParameterValue::Bool(_)) => Ok(()),
            (ParameterKind::Int { min, max }, ParameterValue::Int(v)) => {
                if v < min || v > max {
                    Err(format!("{} = {} is outside [{}, {}]", self.name, v, min, max))
                } else {
                    Ok(())
                }
            }
            (ParameterKind::Float { min, max }, ParameterValue::Float(_) | ParameterValue::Int(_)) => {
                let v = value.as_f64().unwrap_or(f64::NAN);
                if !v.is_finite() {
                    Err(format!("{} must be finite", self.name))
                } else if v < *min || v > *max {
                    Err(format!("{} = {} is outside [{}, {}]", self.name, v, min, max))
                } else {
                    Ok(())
                }
            }
            (ParameterKind::Choice { values }, ParameterValue::Text(v)) => {
                if values.iter().any(|allowed| allowed == v) {
                    Ok(())
                } else {
                    Err(format!("{} = '{}' is not one of {:?}", self.name, v, values))
                }
            }
            (kind, value) => Err(format!(
                "{} expects {} but got {:?}",
                self.name,
                kind.type_name(),
                value
            )),
        }
    }

    /// Clamp a numeric value into this parameter's bounds, keeping its type.
    /// Non-numeric parameters return `None`.
    pub fn clamp(&self, value: f64) -> Option<ParameterValue> {
        match &self.kind {
            ParameterKind::Int { min, max } => {
                Some(ParameterValue::Int((value.round() as i64).clamp(*min, *max)))
            }
            ParameterKind::Float { min, max } => Some(ParameterValue::Float(value.clamp(*min, *max))),
            _ => None,
        }
    }

    /// Upper bound for numeric parameters.
    pub fn max(&self) -> Option<f64> {
        match &self.kind {
            ParameterKind::Int { max, .. } => Some(*max as f64),
            ParameterKind::Float { max, .. } => Some(*max),
            _ => None,
        }
    }
}

impl ParameterKind {
    fn type_name(&self) -> &'static str {
        match self {
            ParameterKind::Bool => "bool",
            ParameterKind::Int { .. } => "int",
            ParameterKind::Float { .. } => "float",
            ParameterKind::Choice { .. } => "choice",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_bounds_are_enforced() {
        let spec = ParameterSpec::int("time_limit", 60, 1, 3600);
        assert!(spec.validate(&ParameterValue::Int(3600)).is_ok());
        assert!(spec.validate(&ParameterValue::Int(3601)).is_err());
        assert!(spec.validate(&ParameterValue::Float(10.0)).is_err());
    }

    #[test]
    fn float_accepts_ints_and_rejects_nan() {
        let spec = ParameterSpec::float("mip_gap", 1e-4, 0.0, 1.0);
        assert!(spec.validate(&ParameterValue::Int(1)).is_ok());
        assert!(spec.validate(&ParameterValue::Float(f64::NAN)).is_err());
        assert!(spec.validate(&ParameterValue::Float(1.5)).is_err());
    }

    #[test]
    fn choice_membership() {
        let spec = ParameterSpec::choice("method", "simplex", &["simplex", "barrier"]);
        assert!(spec.validate(&ParameterValue::Text("barrier".into())).is_ok());
        assert!(spec.validate(&ParameterValue::Text("magic".into())).is_err());
    }

    #[test]
    fn clamp_keeps_type() {
        let spec = ParameterSpec::int("threads", 1, 1, 16);
        assert_eq!(spec.clamp(40.0), Some(ParameterValue::Int(16)));
        let spec = ParameterSpec::boolean("presolve", true);
        assert_eq!(spec.clamp(1.0), None);
    }
}
