use thiserror::Error;

use crate::value::Value;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document parse failed: {0}")]
    Parse(String),
    #[error("document serialize failed: {0}")]
    Serialize(String),
}

/// Bytes <-> tree seam. The shipped binary format plugs in here; the loader
/// never looks at raw document bytes itself.
pub trait DocumentCodec {
    fn parse(&self, bytes: &[u8]) -> Result<Value, DocumentError>;
    fn serialize(&self, value: &Value) -> Result<Vec<u8>, DocumentError>;
}

/// Text rendition of the tree. Scalars are externally tagged (`{"U64": 7}`)
/// so every numeric width survives a round trip.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonDocumentCodec;

impl DocumentCodec for JsonDocumentCodec {
    fn parse(&self, bytes: &[u8]) -> Result<Value, DocumentError> {
        serde_json::from_slice(bytes).map_err(|err| DocumentError::Parse(err.to_string()))
    }

    fn serialize(&self, value: &Value) -> Result<Vec<u8>, DocumentError> {
        serde_json::to_vec_pretty(value).map_err(|err| DocumentError::Serialize(err.to_string()))
    }
}
