//! Value type for fixdb
//!
//! This module defines how data values are represented in memory. The
//! engine stores exactly three kinds of values, matching the three column
//! types.

use crate::catalog::ColumnType;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A value in the database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// 32-bit signed integer
    Int(i32),
    /// 32-bit IEEE float
    Float(f32),
    /// String value (fixed-width CHAR on disk)
    Str(String),
}

impl Value {
    /// Default value for a column type: 0 / 0.0 / ""
    pub fn default_for(ty: &ColumnType) -> Value {
        match ty {
            ColumnType::Int32 => Value::Int(0),
            ColumnType::Float32 => Value::Float(0.0),
            ColumnType::Char(_) => Value::Str(String::new()),
        }
    }

    /// Check whether this value's tag matches a column type
    pub fn matches(&self, ty: &ColumnType) -> bool {
        matches!(
            (self, ty),
            (Value::Int(_), ColumnType::Int32)
                | (Value::Float(_), ColumnType::Float32)
                | (Value::Str(_), ColumnType::Char(_))
        )
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "INT",
            Value::Float(_) => "FLOAT",
            Value::Str(_) => "CHAR",
        }
    }

    /// Try to view this value as an i32
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to view this value as an f32
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Try to view this value as a string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Compare two values (for WHERE predicates)
    ///
    /// Same-kind comparisons plus the numeric cross pairs; strings compare
    /// by raw bytes.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f32).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f32)),
            (Value::Str(a), Value::Str(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
            _ => None,
        }
    }

    /// Coerce this value to a column type
    ///
    /// Implicit coercions: INT<->FLOAT, and numeric -> CHAR via the decimal
    /// string. Returns None when no coercion applies.
    pub fn coerce_to(&self, ty: &ColumnType) -> Option<Value> {
        match (self, ty) {
            (Value::Int(_), ColumnType::Int32)
            | (Value::Float(_), ColumnType::Float32)
            | (Value::Str(_), ColumnType::Char(_)) => Some(self.clone()),
            (Value::Float(f), ColumnType::Int32) => Some(Value::Int(f.round() as i32)),
            (Value::Int(i), ColumnType::Float32) => Some(Value::Float(*i as f32)),
            (Value::Int(i), ColumnType::Char(_)) => Some(Value::Str(i.to_string())),
            (Value::Float(f), ColumnType::Char(_)) => Some(Value::Str(f.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_comparison() {
        assert_eq!(Value::Int(5).compare(&Value::Int(3)), Some(Ordering::Greater));
        assert_eq!(
            Value::Str("abc".into()).compare(&Value::Str("abd".into())),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Int(2).compare(&Value::Float(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(Value::Int(1).compare(&Value::Str("1".into())), None);
    }

    #[test]
    fn test_coercions() {
        assert_eq!(
            Value::Float(2.6).coerce_to(&ColumnType::Int32),
            Some(Value::Int(3))
        );
        assert_eq!(
            Value::Int(7).coerce_to(&ColumnType::Float32),
            Some(Value::Float(7.0))
        );
        assert_eq!(
            Value::Int(7).coerce_to(&ColumnType::Char(8)),
            Some(Value::Str("7".into()))
        );
        assert_eq!(Value::Str("x".into()).coerce_to(&ColumnType::Int32), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Int(10).to_string(), "10");
        assert_eq!(Value::Float(20.5).to_string(), "20.5");
        assert_eq!(Value::Str("b".into()).to_string(), "b");
    }
}
