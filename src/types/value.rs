//! Scalar feature values and their JSON rendering

use serde_json::Value;
use std::fmt;

/// One cell of a feature vector or preprocessed table.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Number(f64),
    Text(String),
    Missing,
}

impl FeatureValue {
    pub fn text(value: &str) -> Self {
        FeatureValue::Text(value.to_string())
    }

    pub fn flag(value: bool) -> Self {
        FeatureValue::Number(if value { 1.0 } else { 0.0 })
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FeatureValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FeatureValue::Missing)
    }

    /// Render a value for a categorical column: numbers become their
    /// shortest decimal text, missing stays missing.
    pub fn into_categorical(self) -> Self {
        match self {
            FeatureValue::Number(n) => FeatureValue::Text(n.to_string()),
            other => other,
        }
    }

    /// Parse a CSV cell. Blank cells are missing.
    pub fn parse_cell(cell: &str, numeric: bool) -> Self {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            return FeatureValue::Missing;
        }
        if numeric {
            if let Ok(n) = trimmed.parse::<f64>() {
                return FeatureValue::Number(n);
            }
        }
        FeatureValue::Text(cell.to_string())
    }

    /// Convert to a JSON scalar that always serializes.
    ///
    /// Finite numbers stay numbers, non-finite numbers and missing values
    /// become `null`, text stays text.
    pub fn to_json_scalar(&self) -> Value {
        match self {
            FeatureValue::Number(n) => safe_json_number(*n),
            FeatureValue::Text(s) => Value::String(s.clone()),
            FeatureValue::Missing => Value::Null,
        }
    }
}

/// Finite number → JSON number, anything else → `null`.
///
/// A finite value serde_json still refuses is rendered as its string form.
pub fn safe_json_number(value: f64) -> Value {
    if !value.is_finite() {
        return Value::Null;
    }
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(value.to_string()))
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Number(n) => write!(f, "{}", n),
            FeatureValue::Text(s) => write!(f, "{}", s),
            FeatureValue::Missing => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_scalar_mapping() {
        assert_eq!(FeatureValue::Number(70.35).to_json_scalar(), json!(70.35));
        assert_eq!(FeatureValue::Number(f64::NAN).to_json_scalar(), Value::Null);
        assert_eq!(FeatureValue::Number(f64::INFINITY).to_json_scalar(), Value::Null);
        assert_eq!(FeatureValue::text("Yes").to_json_scalar(), json!("Yes"));
        assert_eq!(FeatureValue::Missing.to_json_scalar(), Value::Null);
    }

    #[test]
    fn test_categorical_rendering() {
        assert_eq!(FeatureValue::Number(1.0).into_categorical(), FeatureValue::text("1"));
        assert_eq!(FeatureValue::Number(0.5).into_categorical(), FeatureValue::text("0.5"));
        assert_eq!(FeatureValue::Missing.into_categorical(), FeatureValue::Missing);
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!(FeatureValue::parse_cell("29.85", true), FeatureValue::Number(29.85));
        assert_eq!(FeatureValue::parse_cell(" ", true), FeatureValue::Missing);
        assert_eq!(FeatureValue::parse_cell("29.85", false), FeatureValue::text("29.85"));
        assert_eq!(FeatureValue::parse_cell("DSL", true), FeatureValue::text("DSL"));
    }
}
