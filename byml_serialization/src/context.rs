use std::collections::BTreeMap;

use byml_value::{Map, NodeType, Value};

use crate::conversions::{ArrayOf, MapOf};
use crate::error::ContentErrors;
use crate::inherited::Inherited;
use crate::object::{BymlObject, Object};
use crate::path::{PropertyPath, PropertyPathSet};

/// Typed view of one kind of document node.
///
/// Implementors are zero-sized tables: the node tag they expect plus a read
/// and a write function. `read` returning `None` means the problem has
/// already been reported and the target must stay as it is.
pub trait Conversion: Copy {
    type Value;

    /// Tag the node must carry before `read` is invoked; `None` accepts any.
    const TAG: Option<NodeType>;

    fn read(&self, ctx: &mut ReadContext<'_>) -> Option<Self::Value>;

    /// Produces the node for `value`. `existing` is whatever the document
    /// held under the same key before, so containers can be updated in place.
    fn write(&self, value: &mut Self::Value, existing: Option<Value>) -> Value;
}

/// One routine per record type drives both loading and saving.
pub trait SerializationContext {
    fn set<C: Conversion>(&mut self, conv: C, value: &mut C::Value, key: &str);

    /// Like [`set`](Self::set) but an absent key keeps the current value.
    fn set_optional<C: Conversion>(&mut self, conv: C, value: &mut C::Value, key: &str);

    /// Reads into `Some` on success and leaves the field as it was otherwise.
    /// A `None` field leaves the document untouched on save.
    fn set_option<C: Conversion>(
        &mut self,
        conv: C,
        value: &mut Option<C::Value>,
        key: &str,
        optional: bool,
    );

    fn set_inherited<C: Conversion>(
        &mut self,
        conv: C,
        value: &mut Inherited<C::Value>,
        key: &str,
        optional: bool,
    );

    fn set_array<C: Conversion>(
        &mut self,
        conv: C,
        value: &mut Vec<C::Value>,
        key: &str,
        optional: bool,
    ) {
        if optional {
            self.set_optional(ArrayOf(conv), value, key);
        } else {
            self.set(ArrayOf(conv), value, key);
        }
    }

    fn set_map<C: Conversion>(
        &mut self,
        conv: C,
        value: &mut BTreeMap<String, C::Value>,
        key: &str,
        optional: bool,
    ) {
        if optional {
            self.set_optional(MapOf(conv), value, key);
        } else {
            self.set(MapOf(conv), value, key);
        }
    }

    fn set_object<T: BymlObject>(&mut self, value: &mut T, key: &str) {
        self.set(Object::<T>::new(), value, key);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
    /// Required, and reported even when the path is in the ignore set.
    Forced,
}

fn presence_for(optional: bool) -> Presence {
    if optional {
        Presence::Optional
    } else {
        Presence::Required
    }
}

pub struct ReadContext<'a> {
    node: &'a Value,
    path: PropertyPath,
    errors: &'a mut ContentErrors,
    ignore: &'a PropertyPathSet,
}

impl<'a> ReadContext<'a> {
    pub fn new(node: &'a Value, errors: &'a mut ContentErrors, ignore: &'a PropertyPathSet) -> Self {
        Self {
            node,
            path: PropertyPath::root(),
            errors,
            ignore,
        }
    }

    pub fn node(&self) -> &'a Value {
        self.node
    }

    pub fn path(&self) -> &PropertyPath {
        &self.path
    }

    fn child<'b>(&'b mut self, node: &'a Value, path: PropertyPath) -> ReadContext<'b> {
        ReadContext {
            node,
            path,
            errors: &mut *self.errors,
            ignore: self.ignore,
        }
    }

    fn map(&self) -> &'a Map {
        match self.node {
            Value::Map(map) => map,
            other => panic!(
                "keyed access on a {} node at {}",
                other.node_type(),
                self.path
            ),
        }
    }

    /// Tag-checks `node` and runs `conv` on it in a child context.
    pub fn read_node<C: Conversion>(
        &mut self,
        conv: C,
        node: &'a Value,
        path: PropertyPath,
    ) -> Option<C::Value> {
        if let Some(expected) = C::TAG {
            if node.node_type() != expected {
                self.errors.report_unexpected_type(path, expected);
                return None;
            }
        }
        let mut child = self.child(node, path);
        conv.read(&mut child)
    }

    /// Reads the child under `key`. Panics if the current node is not a map.
    pub fn read_key<C: Conversion>(
        &mut self,
        conv: C,
        key: &str,
        presence: Presence,
    ) -> Option<C::Value> {
        let map = self.map();
        let path = self.path.key(key);
        match map.get(key) {
            Some(node) => self.read_node(conv, node, path),
            None => {
                let report = match presence {
                    Presence::Required => !self.ignore.contains(&path),
                    Presence::Optional => false,
                    Presence::Forced => true,
                };
                if report {
                    self.errors.report_missing_key(self.path.clone(), key);
                }
                None
            }
        }
    }

    pub fn read_index<C: Conversion>(&mut self, conv: C, index: usize) -> Option<C::Value> {
        let current: &'a Value = self.node;
        match current.as_array().and_then(|items| items.get(index)) {
            Some(node) => {
                let path = self.path.index(index);
                self.read_node(conv, node, path)
            }
            None => {
                self.report_missing_elements(index + 1);
                None
            }
        }
    }

    pub fn report_unexpected_type(&mut self, expected: NodeType) {
        self.errors.report_unexpected_type(self.path.clone(), expected);
    }

    pub fn report_missing_elements(&mut self, min_count: usize) {
        self.errors
            .report_missing_elements(self.path.clone(), min_count);
    }

    pub fn report_unexpected_enum_value(&mut self, value: impl std::fmt::Display) {
        self.errors
            .report_unexpected_enum_value(self.path.clone(), value);
    }

    pub fn report_invalid_ref_path(&mut self, expected_suffix: &str) {
        self.errors
            .report_invalid_ref_path(self.path.clone(), expected_suffix);
    }
}

impl SerializationContext for ReadContext<'_> {
    fn set<C: Conversion>(&mut self, conv: C, value: &mut C::Value, key: &str) {
        if let Some(read) = self.read_key(conv, key, Presence::Required) {
            *value = read;
        }
    }

    fn set_optional<C: Conversion>(&mut self, conv: C, value: &mut C::Value, key: &str) {
        if let Some(read) = self.read_key(conv, key, Presence::Optional) {
            *value = read;
        }
    }

    fn set_option<C: Conversion>(
        &mut self,
        conv: C,
        value: &mut Option<C::Value>,
        key: &str,
        optional: bool,
    ) {
        if let Some(read) = self.read_key(conv, key, presence_for(optional)) {
            *value = Some(read);
        }
    }

    fn set_inherited<C: Conversion>(
        &mut self,
        conv: C,
        value: &mut Inherited<C::Value>,
        key: &str,
        optional: bool,
    ) {
        match self.read_key(conv, key, presence_for(optional)) {
            Some(read) => {
                value.value = read;
                value.present = true;
            }
            None => value.present = false,
        }
    }
}

/// Write side: mutates the map the record was loaded from.
pub struct WriteContext<'a> {
    map: &'a mut Map,
}

impl<'a> WriteContext<'a> {
    pub fn new(map: &'a mut Map) -> Self {
        Self { map }
    }

    pub fn write_key<C: Conversion>(&mut self, conv: C, value: &mut C::Value, key: &str) {
        let existing = self.map.remove(key);
        let node = conv.write(value, existing);
        self.map.insert(key.to_string(), node);
    }

    pub fn remove_key(&mut self, key: &str) {
        self.map.remove(key);
    }
}

impl SerializationContext for WriteContext<'_> {
    fn set<C: Conversion>(&mut self, conv: C, value: &mut C::Value, key: &str) {
        self.write_key(conv, value, key);
    }

    fn set_optional<C: Conversion>(&mut self, conv: C, value: &mut C::Value, key: &str) {
        self.write_key(conv, value, key);
    }

    fn set_option<C: Conversion>(
        &mut self,
        conv: C,
        value: &mut Option<C::Value>,
        key: &str,
        _optional: bool,
    ) {
        if let Some(value) = value {
            self.write_key(conv, value, key);
        }
    }

    fn set_inherited<C: Conversion>(
        &mut self,
        conv: C,
        value: &mut Inherited<C::Value>,
        key: &str,
        _optional: bool,
    ) {
        if value.present {
            self.write_key(conv, &mut value.value, key);
        } else {
            self.remove_key(key);
        }
    }
}
