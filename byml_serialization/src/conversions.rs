use std::collections::BTreeMap;
use std::marker::PhantomData;

use byml_value::{Map, NodeType, Value};

use crate::context::{Conversion, Presence, ReadContext};

pub type Float3 = [f32; 3];
/// Map node kept verbatim; its contents are not interpreted.
pub type PropertyDict = Map;

macro_rules! scalar_conversion {
    ($conv:ident, $constant:ident, $ty:ty, $tag:ident, $getter:ident) => {
        #[derive(Clone, Copy, Debug, Default)]
        pub struct $conv;

        pub const $constant: $conv = $conv;

        impl Conversion for $conv {
            type Value = $ty;
            const TAG: Option<NodeType> = Some(NodeType::$tag);

            fn read(&self, ctx: &mut ReadContext<'_>) -> Option<$ty> {
                let value = ctx.node().$getter();
                if value.is_none() {
                    ctx.report_unexpected_type(NodeType::$tag);
                }
                value
            }

            fn write(&self, value: &mut $ty, _existing: Option<Value>) -> Value {
                Value::from(*value)
            }
        }
    };
}

scalar_conversion!(I32Conversion, I32, i32, I32, as_i32);
scalar_conversion!(U32Conversion, U32, u32, U32, as_u32);
scalar_conversion!(I64Conversion, I64, i64, I64, as_i64);
scalar_conversion!(U64Conversion, U64, u64, U64, as_u64);
scalar_conversion!(FloatConversion, FLOAT, f32, Float, as_f32);
scalar_conversion!(DoubleConversion, DOUBLE, f64, Double, as_f64);
scalar_conversion!(BoolConversion, BOOL, bool, Bool, as_bool);

#[derive(Clone, Copy, Debug, Default)]
pub struct StringConversion;

pub const STRING: StringConversion = StringConversion;

impl Conversion for StringConversion {
    type Value = String;
    const TAG: Option<NodeType> = Some(NodeType::String);

    fn read(&self, ctx: &mut ReadContext<'_>) -> Option<String> {
        match ctx.node().as_str() {
            Some(text) => Some(text.to_string()),
            None => {
                ctx.report_unexpected_type(NodeType::String);
                None
            }
        }
    }

    fn write(&self, value: &mut String, _existing: Option<Value>) -> Value {
        Value::String(value.clone())
    }
}

/// `[x, y, z]` float array. Assigned only when all three components read.
#[derive(Clone, Copy, Debug, Default)]
pub struct Float3Conversion;

pub const FLOAT3: Float3Conversion = Float3Conversion;

impl Conversion for Float3Conversion {
    type Value = Float3;
    const TAG: Option<NodeType> = Some(NodeType::Array);

    fn read(&self, ctx: &mut ReadContext<'_>) -> Option<Float3> {
        let len = ctx.node().as_array().map_or(0, |items| items.len());
        if len < 3 {
            ctx.report_missing_elements(3);
            return None;
        }
        let x = ctx.read_index(FLOAT, 0);
        let y = ctx.read_index(FLOAT, 1);
        let z = ctx.read_index(FLOAT, 2);
        Some([x?, y?, z?])
    }

    fn write(&self, value: &mut Float3, _existing: Option<Value>) -> Value {
        Value::array(value.iter().map(|component| Value::Float(*component)))
    }
}

/// `{X, Y, Z}` float map. Missing components are always reported, even for
/// paths an inheritance chain would otherwise excuse.
#[derive(Clone, Copy, Debug, Default)]
pub struct Vector3Conversion;

pub const VECTOR3: Vector3Conversion = Vector3Conversion;

impl Conversion for Vector3Conversion {
    type Value = Float3;
    const TAG: Option<NodeType> = Some(NodeType::Map);

    fn read(&self, ctx: &mut ReadContext<'_>) -> Option<Float3> {
        let x = ctx.read_key(FLOAT, "X", Presence::Forced);
        let y = ctx.read_key(FLOAT, "Y", Presence::Forced);
        let z = ctx.read_key(FLOAT, "Z", Presence::Forced);
        Some([x?, y?, z?])
    }

    fn write(&self, value: &mut Float3, existing: Option<Value>) -> Value {
        let mut map = match existing {
            Some(Value::Map(map)) => map,
            _ => Map::new(),
        };
        for (key, component) in ["X", "Y", "Z"].iter().zip(value.iter()) {
            map.insert(key.to_string(), Value::Float(*component));
        }
        Value::Map(map)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PropertyDictConversion;

pub const PROPERTY_DICT: PropertyDictConversion = PropertyDictConversion;

impl Conversion for PropertyDictConversion {
    type Value = PropertyDict;
    const TAG: Option<NodeType> = Some(NodeType::Map);

    fn read(&self, ctx: &mut ReadContext<'_>) -> Option<PropertyDict> {
        match ctx.node().as_map() {
            Some(map) => Some(map.clone()),
            None => {
                ctx.report_unexpected_type(NodeType::Map);
                None
            }
        }
    }

    fn write(&self, value: &mut PropertyDict, _existing: Option<Value>) -> Value {
        Value::Map(value.clone())
    }
}

/// Array of `C`. Elements with the wrong tag are reported and left out.
#[derive(Clone, Copy, Debug, Default)]
pub struct ArrayOf<C>(pub C);

impl<C: Conversion> Conversion for ArrayOf<C> {
    type Value = Vec<C::Value>;
    const TAG: Option<NodeType> = Some(NodeType::Array);

    fn read(&self, ctx: &mut ReadContext<'_>) -> Option<Self::Value> {
        let Some(items) = ctx.node().as_array() else {
            ctx.report_unexpected_type(NodeType::Array);
            return None;
        };
        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let path = ctx.path().index(index);
            if let Some(value) = ctx.read_node(self.0, item, path) {
                out.push(value);
            }
        }
        Some(out)
    }

    fn write(&self, value: &mut Self::Value, existing: Option<Value>) -> Value {
        let mut previous = match existing {
            Some(Value::Array(items)) => items.into_iter(),
            _ => Vec::new().into_iter(),
        };
        let items = value
            .iter_mut()
            .map(|item| self.0.write(item, previous.next()))
            .collect();
        Value::Array(items)
    }
}

/// String-keyed map of `C`, visited in key order.
#[derive(Clone, Copy, Debug, Default)]
pub struct MapOf<C>(pub C);

impl<C: Conversion> Conversion for MapOf<C> {
    type Value = BTreeMap<String, C::Value>;
    const TAG: Option<NodeType> = Some(NodeType::Map);

    fn read(&self, ctx: &mut ReadContext<'_>) -> Option<Self::Value> {
        let Some(map) = ctx.node().as_map() else {
            ctx.report_unexpected_type(NodeType::Map);
            return None;
        };
        let mut out = BTreeMap::new();
        for (key, item) in map {
            let path = ctx.path().key(key);
            if let Some(value) = ctx.read_node(self.0, item, path) {
                out.insert(key.clone(), value);
            }
        }
        Some(out)
    }

    fn write(&self, value: &mut Self::Value, existing: Option<Value>) -> Value {
        let mut map = match existing {
            Some(Value::Map(map)) => map,
            _ => Map::new(),
        };
        map.retain(|key, _| value.contains_key(key));
        for (key, item) in value.iter_mut() {
            let previous = map.remove(key);
            let node = self.0.write(item, previous);
            map.insert(key.clone(), node);
        }
        Value::Map(map)
    }
}

/// Wraps `C` so a field can hold "not set" without a sentinel value.
#[derive(Clone, Copy, Debug, Default)]
pub struct OptionOf<C>(pub C);

impl<C: Conversion> Conversion for OptionOf<C> {
    type Value = Option<C::Value>;
    const TAG: Option<NodeType> = C::TAG;

    fn read(&self, ctx: &mut ReadContext<'_>) -> Option<Self::Value> {
        self.0.read(ctx).map(Some)
    }

    fn write(&self, value: &mut Self::Value, existing: Option<Value>) -> Value {
        match value {
            Some(value) => self.0.write(value, existing),
            None => existing.unwrap_or(Value::Null),
        }
    }
}

/// Closed set of named values backed by an `i32`.
///
/// Usually implemented through [`byml_enum!`](crate::byml_enum).
pub trait BymlEnum: Copy + Default {
    fn from_i32(value: i32) -> Option<Self>;
    fn to_i32(self) -> i32;
    fn from_name(name: &str) -> Option<Self>;
    fn name(self) -> &'static str;
}

/// Enum stored as its `i32` value.
pub struct Enum<E>(PhantomData<fn() -> E>);

impl<E> Enum<E> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<E> Clone for Enum<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Enum<E> {}

impl<E: BymlEnum> Conversion for Enum<E> {
    type Value = E;
    const TAG: Option<NodeType> = Some(NodeType::I32);

    fn read(&self, ctx: &mut ReadContext<'_>) -> Option<E> {
        let Some(raw) = ctx.node().as_i32() else {
            ctx.report_unexpected_type(NodeType::I32);
            return None;
        };
        let value = E::from_i32(raw);
        if value.is_none() {
            ctx.report_unexpected_enum_value(raw);
        }
        value
    }

    fn write(&self, value: &mut E, _existing: Option<Value>) -> Value {
        Value::I32(value.to_i32())
    }
}

/// Enum stored as its variant name.
pub struct EnumName<E>(PhantomData<fn() -> E>);

impl<E> EnumName<E> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<E> Clone for EnumName<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for EnumName<E> {}

impl<E: BymlEnum> Conversion for EnumName<E> {
    type Value = E;
    const TAG: Option<NodeType> = Some(NodeType::String);

    fn read(&self, ctx: &mut ReadContext<'_>) -> Option<E> {
        let Some(name) = ctx.node().as_str() else {
            ctx.report_unexpected_type(NodeType::String);
            return None;
        };
        let value = E::from_name(name);
        if value.is_none() {
            ctx.report_unexpected_enum_value(name);
        }
        value
    }

    fn write(&self, value: &mut E, _existing: Option<Value>) -> Value {
        Value::String(value.name().to_string())
    }
}

/// Declares a fieldless enum with explicit `i32` discriminants and its
/// [`BymlEnum`] impl.
#[macro_export]
macro_rules! byml_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$variant_meta:meta])* $variant:ident = $value:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($(#[$variant_meta])* $variant = $value),+
        }

        impl $crate::conversions::BymlEnum for $name {
            fn from_i32(value: i32) -> Option<Self> {
                $(if value == $value {
                    return Some($name::$variant);
                })+
                None
            }

            fn to_i32(self) -> i32 {
                self as i32
            }

            fn from_name(name: &str) -> Option<Self> {
                match name {
                    $(stringify!($variant) => Some($name::$variant),)+
                    _ => None,
                }
            }

            fn name(self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),+
                }
            }
        }
    };
}
