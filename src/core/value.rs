use serde_json::{Number, Value as JsonValue};
use std::cmp::Ordering;
use std::fmt;

/// Scalar value of one record attribute, stored or derived.
#[derive(Debug, Clone)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
}

impl FieldValue {
    /// Total ordering used by the sort engine.
    ///
    /// Policy: NULL sorts after every other value (NULL LAST), integers and
    /// floats compare numerically across types, NaN is greater than any
    /// finite float, and remaining cross-type pairs fall back to comparing
    /// type names so the ordering stays total and deterministic.
    pub fn compare(&self, other: &FieldValue) -> Ordering {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => Ordering::Equal,
            (FieldValue::Null, _) => Ordering::Greater,
            (_, FieldValue::Null) => Ordering::Less,

            (FieldValue::Integer(a), FieldValue::Integer(b)) => a.cmp(b),
            (FieldValue::Float(a), FieldValue::Float(b)) => compare_floats(*a, *b),
            (FieldValue::Integer(a), FieldValue::Float(b)) => compare_floats(*a as f64, *b),
            (FieldValue::Float(a), FieldValue::Integer(b)) => compare_floats(*a, *b as f64),

            (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => a.cmp(b),

            _ => self.type_name().cmp(other.type_name()),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Boolean(_) => "boolean",
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Converts back to the JSON representation used by the storage file.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Integer(i) => JsonValue::Number((*i).into()),
            Self::Float(f) => Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Self::Text(s) => JsonValue::String(s.clone()),
            Self::Boolean(b) => JsonValue::Bool(*b),
        }
    }
}

fn compare_floats(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => {
                if a.is_nan() && b.is_nan() {
                    return true;
                }
                (a - b).abs() < f64::EPSILON
            }
            (Self::Integer(i), Self::Float(f)) | (Self::Float(f), Self::Integer(i)) => {
                (*i as f64 - f).abs() < f64::EPSILON
            }
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(fl) => write!(f, "{}", fl),
            Self::Text(s) => write!(f, "{}", s),
            Self::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

/// Declared type of a stored attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Integer,
    Float,
    Text,
    Boolean,
}

impl DataType {
    /// Converts a raw JSON value into a `FieldValue` of this type.
    ///
    /// Integers are accepted where floats are declared and stored as floats,
    /// so a payload like `"weight": 70` sorts and derives consistently.
    pub fn convert(&self, raw: &JsonValue) -> std::result::Result<FieldValue, String> {
        match self {
            Self::Integer => raw
                .as_i64()
                .map(FieldValue::Integer)
                .ok_or_else(|| "must be an integer".to_string()),
            Self::Float => raw
                .as_f64()
                .map(FieldValue::Float)
                .ok_or_else(|| "must be a number".to_string()),
            Self::Text => raw
                .as_str()
                .map(FieldValue::from)
                .ok_or_else(|| "must be a string".to_string()),
            Self::Boolean => raw
                .as_bool()
                .map(FieldValue::Boolean)
                .ok_or_else(|| "must be a boolean".to_string()),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::Text => write!(f, "text"),
            Self::Boolean => write!(f, "boolean"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nulls_sort_last() {
        assert_eq!(
            FieldValue::Null.compare(&FieldValue::Integer(0)),
            Ordering::Greater
        );
        assert_eq!(
            FieldValue::Integer(0).compare(&FieldValue::Null),
            Ordering::Less
        );
        assert_eq!(FieldValue::Null.compare(&FieldValue::Null), Ordering::Equal);
    }

    #[test]
    fn mixed_numeric_comparison() {
        assert_eq!(
            FieldValue::Integer(2).compare(&FieldValue::Float(1.5)),
            Ordering::Greater
        );
        assert_eq!(
            FieldValue::Float(1.5).compare(&FieldValue::Integer(2)),
            Ordering::Less
        );
        assert_eq!(FieldValue::Integer(3), FieldValue::Float(3.0));
    }

    #[test]
    fn integer_accepted_for_float_field() {
        let v = DataType::Float.convert(&json!(70)).unwrap();
        assert_eq!(v, FieldValue::Float(70.0));
    }

    #[test]
    fn type_mismatch_reports_expected_type() {
        let err = DataType::Integer.convert(&json!("abc")).unwrap_err();
        assert!(err.contains("integer"));
    }
}
