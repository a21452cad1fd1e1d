use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub type Map = BTreeMap<String, Value>;

/// One node of a parsed document.
///
/// Maps are key-ordered, which is also the order the binary format stores
/// them in, so iterating a `Map` visits children in document order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Map(Map),
    Array(Vec<Value>),
    String(String),
    Bool(bool),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    Float(f32),
    Double(f64),
    Null,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeType {
    Map,
    Array,
    String,
    Bool,
    I32,
    U32,
    I64,
    U64,
    Float,
    Double,
    Null,
}

impl NodeType {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Map => "map",
            NodeType::Array => "array",
            NodeType::String => "string",
            NodeType::Bool => "bool",
            NodeType::I32 => "i32",
            NodeType::U32 => "u32",
            NodeType::I64 => "i64",
            NodeType::U64 => "u64",
            NodeType::Float => "float",
            NodeType::Double => "double",
            NodeType::Null => "null",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Value {
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        )
    }

    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(items.into_iter().collect())
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            Value::Map(_) => NodeType::Map,
            Value::Array(_) => NodeType::Array,
            Value::String(_) => NodeType::String,
            Value::Bool(_) => NodeType::Bool,
            Value::I32(_) => NodeType::I32,
            Value::U32(_) => NodeType::U32,
            Value::I64(_) => NodeType::I64,
            Value::U64(_) => NodeType::U64,
            Value::Float(_) => NodeType::Float,
            Value::Double(_) => NodeType::Double,
            Value::Null => NodeType::Null,
        }
    }

    pub fn is(&self, node_type: NodeType) -> bool {
        self.node_type() == node_type
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::U32(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U64(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(value) => Some(*value),
            _ => None,
        }
    }

    /// Map lookup; `None` for missing keys and for non-map nodes.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|map| map.get(key))
    }
}

impl From<Map> for Value {
    fn from(value: Map) -> Self {
        Value::Map(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::I32(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::U32(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::I64(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::U64(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}
