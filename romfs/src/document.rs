use byml_serialization::{deserialize, BymlObject, DeserializeError, PropertyPathSet};
use byml_value::Value;

use crate::handler::{DocumentErrorHandler, LoadFailed};
use crate::location::RetrievedFileLocation;

/// Deserializes `document` into `T`, delivering the whole batch of problems
/// to `handler` in a single call.
pub fn read_document<T, H>(
    document: &Value,
    ignore: &PropertyPathSet,
    handler: &mut H,
    location: &RetrievedFileLocation,
) -> Result<T, LoadFailed>
where
    T: BymlObject,
    H: DocumentErrorHandler + ?Sized,
{
    match deserialize::<T>(document, ignore) {
        Ok(value) => Ok(value),
        Err(DeserializeError::RootTypeMismatch { expected, actual }) => {
            handler.on_root_type_mismatch(location, expected, actual);
            Err(LoadFailed)
        }
        Err(DeserializeError::Content(errors)) => {
            handler.on_content_errors(location, &errors);
            Err(LoadFailed)
        }
    }
}
