use std::collections::BTreeMap;

use byml_serialization::{Conversion, ContentErrors, MapOf, PropertyPathSet, ReadContext, STRING};
use byml_value::{NodeType, Value};
use thiserror::Error;

/// Path indirection loaded from the system address table: a requested
/// storage path found here is fetched from its mapped path instead.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddressTable {
    entries: BTreeMap<String, String>,
}

#[derive(Debug, Error)]
pub enum AddressTableError {
    #[error("address table root is a {actual} node, expected Map")]
    RootTypeMismatch { actual: NodeType },
    #[error("address table has {} malformed entries", .0.len())]
    Content(ContentErrors),
}

impl AddressTable {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }

    pub fn from_document(document: &Value) -> Result<Self, AddressTableError> {
        if !document.is(NodeType::Map) {
            return Err(AddressTableError::RootTypeMismatch {
                actual: document.node_type(),
            });
        }
        let mut errors = ContentErrors::new();
        let ignore = PropertyPathSet::new();
        let entries = {
            let mut ctx = ReadContext::new(document, &mut errors, &ignore);
            MapOf(STRING).read(&mut ctx)
        };
        match entries {
            Some(entries) if errors.is_empty() => Ok(Self { entries }),
            _ => Err(AddressTableError::Content(errors)),
        }
    }

    pub fn to_document(&self) -> Value {
        Value::map(
            self.entries
                .iter()
                .map(|(from, to)| (from.clone(), Value::String(to.clone()))),
        )
    }

    pub fn redirect(&self, path: &str) -> Option<&str> {
        self.entries.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
