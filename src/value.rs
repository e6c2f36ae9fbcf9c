//! Run-time value: a dynamically-typed cell.
//!
//! A tagged-variant value restricted to the four types the SQL front-end
//! supports, with comparisons returning `Result` instead of panicking on
//! a variant mismatch.

use crate::error::DbError;
use std::cmp::Ordering;
use std::fmt;

/// A column's declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ColumnType {
    Int,
    Float,
    /// `None` means unbounded.
    Varchar(Option<u32>),
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Int => write!(f, "INT"),
            ColumnType::Float => write!(f, "FLOAT"),
            ColumnType::Varchar(Some(n)) => write!(f, "VARCHAR({n})"),
            ColumnType::Varchar(None) => write!(f, "VARCHAR"),
        }
    }
}

/// One cell of a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Varchar(String),
    Null,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "INT",
            Value::Float(_) => "FLOAT",
            Value::Varchar(_) => "VARCHAR",
            Value::Null => "NULL",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric promotion used by arithmetic: INT and FLOAT combine to FLOAT.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(x) => Some(*x as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn add(&self, other: &Value) -> crate::error::Result<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            (a, b) if a.as_f64().is_some() && b.as_f64().is_some() => {
                Ok(Value::Float(a.as_f64().unwrap() + b.as_f64().unwrap()))
            }
            (a, b) => Err(DbError::type_error(format!(
                "cannot add {} and {}",
                a.type_name(),
                b.type_name()
            ))),
        }
    }

    /// Ordering/equality for two values of the *same* variant; a mixed-variant
    /// pair (excluding NULL, which is handled by the caller) is a type error.
    pub fn compare(&self, other: &Value) -> crate::error::Result<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
            (Value::Varchar(a), Value::Varchar(b)) => Ok(a.cmp(b)),
            (a, b) if a.as_f64().is_some() && b.as_f64().is_some() => {
                let (x, y) = (a.as_f64().unwrap(), b.as_f64().unwrap());
                x.partial_cmp(&y)
                    .ok_or_else(|| DbError::type_error("NaN is not ordered"))
            }
            (a, b) => Err(DbError::type_error(format!(
                "cannot compare {} and {}",
                a.type_name(),
                b.type_name()
            ))),
        }
    }

    /// SQL equality: NULL compares unequal (and un-ordered) to everything,
    /// including another NULL. Callers that need tri-valued WHERE semantics
    /// special-case NULL themselves; this helper is for GROUP BY keys where
    /// two NULLs must group together.
    pub fn key_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            _ => self.compare(other).map(|o| o == Ordering::Equal).unwrap_or(false),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(x) => write!(f, "{x}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Varchar(s) => write!(f, "{s}"),
            Value::Null => write!(f, "NULL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_promotes_to_float() {
        let v = Value::Int(2).add(&Value::Float(1.5)).unwrap();
        match v {
            Value::Float(x) => assert!((x - 3.5).abs() < 1e-9),
            _ => panic!("expected float"),
        }
    }

    #[test]
    fn compare_mixed_variant_is_type_error() {
        let e = Value::Int(1).compare(&Value::Varchar("a".into()));
        assert!(e.is_err());
    }

    #[test]
    fn null_keys_group_together() {
        assert!(Value::Null.key_eq(&Value::Null));
        assert!(!Value::Null.key_eq(&Value::Int(0)));
    }
}
