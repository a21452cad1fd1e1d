//! Structured document tree shared by every layer of the romfs loader.
#![forbid(unsafe_code)]

pub mod codec;
pub mod value;

pub use codec::{DocumentCodec, DocumentError, JsonDocumentCodec};
pub use value::{Map, NodeType, Value};
