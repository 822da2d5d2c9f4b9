use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CelError;

/// Runtime value produced by expression evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
}

impl Value {
    /// Convert a `serde_json::Value` into a runtime value.
    #[must_use]
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Self::Float(f)
                } else {
                    Self::Null
                }
            }
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(arr) => {
                Self::List(arr.into_iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(obj) => Self::Map(
                obj.into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Truthiness: `Null`, zero, and empty collections are falsy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(n) => *n != 0,
            Self::Float(f) => *f != 0.0,
            Self::String(s) => !s.is_empty(),
            Self::List(v) => !v.is_empty(),
            Self::Map(m) => !m.is_empty(),
        }
    }

    /// The value's type name, for error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Field access on map values. Missing keys yield `Null`.
    pub(crate) fn field(&self, name: &str) -> Result<Self, CelError> {
        match self {
            Self::Map(m) => Ok(m.get(name).cloned().unwrap_or(Self::Null)),
            _ => Err(CelError::Type(format!(
                "cannot access field '{name}' on {}",
                self.type_name()
            ))),
        }
    }

    /// Index access on lists (negative indexes count from the end) and
    /// maps. Out-of-range and missing keys yield `Null`.
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
    pub(crate) fn index(&self, idx: &Self) -> Result<Self, CelError> {
        match (self, idx) {
            (Self::List(v), Self::Int(i)) => {
                let index = if *i < 0 {
                    (v.len() as i64 + i) as usize
                } else {
                    *i as usize
                };
                Ok(v.get(index).cloned().unwrap_or(Self::Null))
            }
            (Self::Map(m), Self::String(key)) => Ok(m.get(key).cloned().unwrap_or(Self::Null)),
            _ => Err(CelError::Type(format!(
                "cannot index {} with {}",
                self.type_name(),
                idx.type_name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
        assert!(Value::String("x".into()).is_truthy());
        assert!(Value::List(vec![Value::Null]).is_truthy());
    }

    #[test]
    fn missing_map_key_is_null() {
        let map = Value::Map(HashMap::new());
        assert_eq!(map.field("absent").unwrap(), Value::Null);
        assert_eq!(
            map.index(&Value::String("absent".into())).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn negative_list_index() {
        let list = Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(list.index(&Value::Int(-1)).unwrap(), Value::Int(3));
        assert_eq!(list.index(&Value::Int(9)).unwrap(), Value::Null);
    }

    #[test]
    fn from_json_nested() {
        let json = serde_json::json!({"labels": {"site": "us-east-1"}, "count": 2});
        let value = Value::from_json(json);
        let Value::Map(m) = value else {
            panic!("expected map")
        };
        assert_eq!(m["count"], Value::Int(2));
        assert!(matches!(m["labels"], Value::Map(_)));
    }
}
