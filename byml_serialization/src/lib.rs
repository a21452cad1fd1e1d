//! Typed records over [`byml_value::Value`] documents.
//!
//! A record implements [`BymlObject`] once; loading collects every content
//! error in the document instead of stopping at the first, and saving writes
//! back into the original tree so undeclared keys survive.
#![forbid(unsafe_code)]

pub mod context;
pub mod conversions;
pub mod error;
pub mod inherited;
pub mod object;
pub mod path;

pub use context::{Conversion, Presence, ReadContext, SerializationContext, WriteContext};
pub use conversions::{
    ArrayOf, BymlEnum, Enum, EnumName, Float3, MapOf, OptionOf, PropertyDict, BOOL, DOUBLE, FLOAT, FLOAT3,
    I32, I64, PROPERTY_DICT, STRING, U32, U64, VECTOR3,
};
pub use error::{ContentError, ContentErrorFlags, ContentErrors, DeserializeError};
pub use inherited::Inherited;
pub use object::{deserialize, serialize, BymlObject, Object};
pub use path::{collect_property_paths, PropertyPath, PropertyPathSet, Segment};
