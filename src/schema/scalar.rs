//! Scalar type mapper: descriptor scalar names → GraphQL built-in scalars.

use serde_json::Value;
use std::fmt;

/// GraphQL built-in scalars a descriptor may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    String,
    Boolean,
    Int,
    Float,
    Id,
}

impl ScalarType {
    /// Map a camel-cased descriptor name to a scalar.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "String" => Some(ScalarType::String),
            "Boolean" => Some(ScalarType::Boolean),
            "Int" => Some(ScalarType::Int),
            "Float" => Some(ScalarType::Float),
            "Id" | "ID" => Some(ScalarType::Id),
            _ => None,
        }
    }

    /// Name of the scalar in the GraphQL type system.
    pub fn type_name(self) -> &'static str {
        match self {
            ScalarType::String => "String",
            ScalarType::Boolean => "Boolean",
            ScalarType::Int => "Int",
            ScalarType::Float => "Float",
            ScalarType::Id => "ID",
        }
    }

    /// Whether a JSON value can be served as this scalar.
    ///
    /// `null` is accepted everywhere since synthesized fields are nullable.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (ScalarType::String, Value::String(_)) => true,
            (ScalarType::Boolean, Value::Bool(_)) => true,
            (ScalarType::Int, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (ScalarType::Float, Value::Number(_)) => true,
            (ScalarType::Id, Value::String(_) | Value::Number(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}
