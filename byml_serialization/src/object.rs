use std::marker::PhantomData;

use byml_value::{Map, NodeType, Value};

use crate::context::{Conversion, ReadContext, SerializationContext, WriteContext};
use crate::error::{ContentErrors, DeserializeError};
use crate::path::PropertyPathSet;

/// A record stored as a map node.
///
/// `serialization` lists every field once; the same routine runs against a
/// [`ReadContext`] when loading and a [`WriteContext`] when saving.
pub trait BymlObject: Default {
    fn serialization<C: SerializationContext>(&mut self, ctx: &mut C);
}

pub struct Object<T>(PhantomData<fn() -> T>);

impl<T> Object<T> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Object<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Object<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Object<T> {}

impl<T: BymlObject> Conversion for Object<T> {
    type Value = T;
    const TAG: Option<NodeType> = Some(NodeType::Map);

    fn read(&self, ctx: &mut ReadContext<'_>) -> Option<T> {
        let mut value = T::default();
        value.serialization(ctx);
        Some(value)
    }

    fn write(&self, value: &mut T, existing: Option<Value>) -> Value {
        let mut map = match existing {
            Some(Value::Map(map)) => map,
            _ => Map::new(),
        };
        value.serialization(&mut WriteContext::new(&mut map));
        Value::Map(map)
    }
}

/// Reads a whole document into `T`. Every structural problem is collected
/// before returning; a non-empty batch fails the load.
pub fn deserialize<T: BymlObject>(
    document: &Value,
    ignore: &PropertyPathSet,
) -> Result<T, DeserializeError> {
    if !document.is(NodeType::Map) {
        return Err(DeserializeError::RootTypeMismatch {
            expected: NodeType::Map,
            actual: document.node_type(),
        });
    }
    let mut errors = ContentErrors::new();
    let mut value = T::default();
    {
        let mut ctx = ReadContext::new(document, &mut errors, ignore);
        value.serialization(&mut ctx);
    }
    if errors.is_empty() {
        Ok(value)
    } else {
        Err(DeserializeError::Content(errors))
    }
}

/// Writes `value` over `original` (when it is a map) so keys the record does
/// not declare are kept.
pub fn serialize<T: BymlObject>(value: &mut T, original: Option<Value>) -> Value {
    Object::<T>::new().write(value, original)
}
