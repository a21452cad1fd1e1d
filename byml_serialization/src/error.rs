use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use byml_value::NodeType;
use thiserror::Error;

use crate::path::PropertyPath;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ContentErrorFlags(u8);

impl ContentErrorFlags {
    pub const NONE: Self = Self(0);
    pub const UNEXPECTED_TYPE: Self = Self(1 << 0);
    pub const MISSING_KEYS: Self = Self(1 << 1);
    pub const MISSING_ELEMENTS: Self = Self(1 << 2);
    pub const UNEXPECTED_ENUM_VALUE: Self = Self(1 << 3);
    pub const INVALID_REF_PATH: Self = Self(1 << 4);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ContentErrorFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ContentErrorFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.insert(rhs);
    }
}

/// Everything wrong with one node of a document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContentError {
    pub flags: ContentErrorFlags,
    pub expected_type: Option<NodeType>,
    pub missing_keys: Vec<String>,
    pub min_elements: Option<usize>,
    pub invalid_enum_value: Option<String>,
    pub expected_ref_suffix: Option<String>,
}

impl fmt::Display for ContentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(expected) = self.expected_type {
            parts.push(format!("expected {} node", expected));
        }
        if !self.missing_keys.is_empty() {
            parts.push(format!("missing keys [{}]", self.missing_keys.join(", ")));
        }
        if let Some(min) = self.min_elements {
            parts.push(format!("expected at least {} elements", min));
        }
        if let Some(value) = &self.invalid_enum_value {
            parts.push(format!("unexpected enum value {}", value));
        }
        if let Some(suffix) = &self.expected_ref_suffix {
            parts.push(format!("invalid ref path, expected Work/...{}", suffix));
        }
        write!(f, "{}", parts.join("; "))
    }
}

/// Per-document error sink keyed by the offending node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContentErrors {
    entries: BTreeMap<PropertyPath, ContentError>,
}

impl ContentErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, path: &PropertyPath) -> Option<&ContentError> {
        self.entries.get(path)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, PropertyPath, ContentError> {
        self.entries.iter()
    }

    pub fn report_unexpected_type(&mut self, path: PropertyPath, expected: NodeType) {
        let entry = self.entry(path, ContentErrorFlags::UNEXPECTED_TYPE);
        entry.expected_type = Some(expected);
    }

    pub fn report_missing_key(&mut self, map_path: PropertyPath, key: &str) {
        let entry = self.entry(map_path, ContentErrorFlags::MISSING_KEYS);
        if !entry.missing_keys.iter().any(|existing| existing == key) {
            entry.missing_keys.push(key.to_string());
        }
    }

    pub fn report_missing_elements(&mut self, path: PropertyPath, min_count: usize) {
        let entry = self.entry(path, ContentErrorFlags::MISSING_ELEMENTS);
        entry.min_elements = Some(entry.min_elements.map_or(min_count, |m| m.max(min_count)));
    }

    pub fn report_unexpected_enum_value(&mut self, path: PropertyPath, value: impl fmt::Display) {
        let entry = self.entry(path, ContentErrorFlags::UNEXPECTED_ENUM_VALUE);
        entry.invalid_enum_value = Some(value.to_string());
    }

    pub fn report_invalid_ref_path(&mut self, path: PropertyPath, expected_suffix: &str) {
        let entry = self.entry(path, ContentErrorFlags::INVALID_REF_PATH);
        entry.expected_ref_suffix = Some(expected_suffix.to_string());
    }

    fn entry(&mut self, path: PropertyPath, flag: ContentErrorFlags) -> &mut ContentError {
        let entry = self.entries.entry(path).or_default();
        entry.flags.insert(flag);
        entry
    }
}

impl<'a> IntoIterator for &'a ContentErrors {
    type Item = (&'a PropertyPath, &'a ContentError);
    type IntoIter = btree_map::Iter<'a, PropertyPath, ContentError>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl fmt::Display for ContentErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (path, error)) in self.entries.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {}", path, error)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum DeserializeError {
    #[error("document root is a {actual} node, expected {expected}")]
    RootTypeMismatch { expected: NodeType, actual: NodeType },
    #[error("{} node(s) with content errors", .0.len())]
    Content(ContentErrors),
}
