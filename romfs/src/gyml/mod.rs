//! Gyml files and their `$parent` inheritance chains.
//!
//! A gyml document may name a parent document of the same type. Properties
//! it leaves out are looked up on the parent, so each level is deserialized
//! with every property path of the whole chain excused from the
//! missing-key check. Resolved files are cached per [`GymlManager`].

pub mod types;

use std::any::Any;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use byml_serialization::{
    collect_property_paths, serialize, BymlObject, ContentErrors, Inherited, PropertyPath,
    PropertyPathSet,
};
use byml_value::{NodeType, Value};
use tracing::debug;

use crate::document::read_document;
use crate::file_ref::{GymlRef, REF_PREFIX};
use crate::format::GYML_FORMAT;
use crate::handler::{GymlLoadingErrorHandler, LoadFailed};
use crate::location::RetrievedFileLocation;
use crate::romfs::{PackInfo, RomFs, SaveError};

pub const PARENT_KEY: &str = "$parent";

/// A gyml record type: its file-name suffix and where new files of the type
/// are saved.
pub trait GymlType: BymlObject + 'static {
    const NAME: &'static str;
    const TYPE_SUFFIX: &'static str;
    const DEFAULT_SAVE_PATH: &'static [&'static str];
}

/// Ref to a new file named `name` in `T`'s default directory.
pub fn default_ref_for<T: GymlType>(name: &str) -> Option<GymlRef<T>> {
    let path = format!(
        "{}{}/{}.{}.gyml",
        REF_PREFIX,
        T::DEFAULT_SAVE_PATH.join("/"),
        name,
        T::TYPE_SUFFIX
    );
    GymlRef::parse(&path).ok()
}

/// One resolved level of an inheritance chain.
pub struct AssetFile<T> {
    path: String,
    location: RetrievedFileLocation,
    document: Value,
    parent: Option<Rc<AssetFile<T>>>,
    data: T,
}

impl<T> AssetFile<T> {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn location(&self) -> &RetrievedFileLocation {
        &self.location
    }

    /// The document as it was read, before inheritance.
    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn parent(&self) -> Option<&Rc<AssetFile<T>>> {
        self.parent.as_ref()
    }

    /// This level's own values; absent properties are not filled in.
    pub fn data(&self) -> &T {
        &self.data
    }

    /// First level, from this one towards the root, that sets the property.
    pub fn get<V>(&self, field: impl Fn(&T) -> &Inherited<V>) -> Option<&V> {
        let mut current = Some(self);
        while let Some(file) = current {
            if let Some(value) = field(&file.data).get() {
                return Some(value);
            }
            current = file.parent.as_deref();
        }
        None
    }

    /// Like [`get`](Self::get) for a property of an inherited sub-object.
    /// Levels that do not set the sub-object at all are skipped.
    pub fn get_nested<'a, O: 'a, V>(
        &'a self,
        outer: impl Fn(&T) -> &Inherited<O>,
        inner: impl Fn(&O) -> &Inherited<V>,
    ) -> Option<&'a V> {
        let mut current = Some(self);
        while let Some(file) = current {
            if let Some(value) = outer(&file.data).get().and_then(|sub| inner(sub).get()) {
                return Some(value);
            }
            current = file.parent.as_deref();
        }
        None
    }

    /// Number of levels from this file to the root of its chain.
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut current = self.parent.as_deref();
        while let Some(file) = current {
            depth += 1;
            current = file.parent.as_deref();
        }
        depth
    }
}

struct CachedGyml {
    file: Rc<dyn Any>,
    type_name: &'static str,
    location: RetrievedFileLocation,
    /// Property paths of this level and all its ancestors.
    paths: Rc<PropertyPathSet>,
    /// Whether the level was checked with only `paths` excused. Ancestors
    /// resolved for a child were checked with the child's paths excused too.
    validated_alone: bool,
}

struct ChainLevel {
    path: String,
    location: RetrievedFileLocation,
    document: Value,
}

/// Loads gyml files and owns the cache of every resolved level.
#[derive(Default)]
pub struct GymlManager {
    cache: HashMap<String, CachedGyml>,
}

impl GymlManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn is_loaded(&self, path: &str) -> bool {
        self.cache.contains_key(path)
    }

    pub fn loaded_location(&self, path: &str) -> Option<&RetrievedFileLocation> {
        self.cache.get(path).map(|cached| &cached.location)
    }

    pub fn load_gyml<T, H>(
        &mut self,
        romfs: &RomFs,
        gyml: &GymlRef<T>,
        handler: &mut H,
        pack: Option<&PackInfo>,
    ) -> Result<Rc<AssetFile<T>>, LoadFailed>
    where
        T: GymlType,
        H: GymlLoadingErrorHandler + ?Sized,
    {
        if let Some((file, _)) = self.cached::<T, H>(gyml.as_str(), handler)? {
            self.validate_alone(&file, handler)?;
            return Ok(file);
        }

        let mut chain: Vec<ChainLevel> = Vec::new();
        let mut ancestor: Option<(Rc<AssetFile<T>>, Rc<PropertyPathSet>)> = None;
        let mut next = gyml.clone();
        loop {
            let loaded = romfs.load_file(&next.romfs_path(), &GYML_FORMAT, handler, pack)?;
            let parent = peek_parent::<T, H>(&loaded.value, handler, &loaded.location)?;
            chain.push(ChainLevel {
                path: next.as_str().to_string(),
                location: loaded.location,
                document: loaded.value,
            });
            let Some(parent) = parent else {
                break;
            };
            if let Some(cycle_index) = chain.iter().position(|level| level.path == parent.as_str()) {
                let described: Vec<(String, RetrievedFileLocation)> = chain
                    .iter()
                    .map(|level| (level.path.clone(), level.location.clone()))
                    .collect();
                handler.on_cyclic_inheritance(&described, cycle_index);
                return Err(LoadFailed);
            }
            if let Some(cached) = self.cached::<T, H>(parent.as_str(), handler)? {
                ancestor = Some(cached);
                break;
            }
            next = parent;
        }

        // Per level: paths of that level and everything above it.
        let mut accumulated = ancestor
            .as_ref()
            .map(|(_, paths)| paths.as_ref().clone())
            .unwrap_or_default();
        let mut level_paths = Vec::with_capacity(chain.len());
        for level in chain.iter().rev() {
            accumulated.extend(collect_property_paths(&level.document));
            level_paths.push(Rc::new(accumulated.clone()));
        }
        let ignore = accumulated;

        let requested = chain.len() - 1;
        let mut parent = ancestor.map(|(file, _)| file);
        for (depth, (level, paths)) in chain.into_iter().rev().zip(level_paths).enumerate() {
            let data = read_document::<T, H>(&level.document, &ignore, handler, &level.location)?;
            debug!(path = %level.path, gyml_type = T::NAME, "gyml resolved");
            let file = Rc::new(AssetFile {
                path: level.path,
                location: level.location,
                document: level.document,
                parent: parent.take(),
                data,
            });
            self.cache.insert(
                file.path.clone(),
                CachedGyml {
                    file: file.clone(),
                    type_name: T::NAME,
                    location: file.location.clone(),
                    paths,
                    validated_alone: depth == requested,
                },
            );
            parent = Some(file);
        }
        parent.ok_or(LoadFailed)
    }

    /// Serializes `data` over the document it was loaded from (if any) and
    /// writes it into the mod directory. The cache is dropped since the
    /// saved file now shadows what was loaded.
    pub fn save_gyml<T: GymlType>(
        &mut self,
        romfs: &RomFs,
        gyml: &GymlRef<T>,
        data: &mut T,
    ) -> Result<PathBuf, SaveError> {
        let original = self
            .cache
            .get(gyml.as_str())
            .and_then(|cached| cached.file.clone().downcast::<AssetFile<T>>().ok())
            .map(|file| file.document.clone());
        let document = serialize(data, original);
        let saved = romfs.save_document(&gyml.romfs_path(), &document, GYML_FORMAT)?;
        self.cache.clear();
        Ok(saved)
    }

    /// Re-checks a level cached as someone's ancestor against its own chain,
    /// so a direct request reports the keys the level itself is missing.
    fn validate_alone<T, H>(&mut self, file: &AssetFile<T>, handler: &mut H) -> Result<(), LoadFailed>
    where
        T: GymlType,
        H: GymlLoadingErrorHandler + ?Sized,
    {
        let Some(cached) = self.cache.get_mut(&file.path) else {
            return Ok(());
        };
        if cached.validated_alone {
            return Ok(());
        }
        read_document::<T, H>(&file.document, &cached.paths, handler, &file.location)?;
        cached.validated_alone = true;
        Ok(())
    }

    fn cached<T, H>(
        &self,
        path: &str,
        handler: &mut H,
    ) -> Result<Option<(Rc<AssetFile<T>>, Rc<PropertyPathSet>)>, LoadFailed>
    where
        T: GymlType,
        H: GymlLoadingErrorHandler + ?Sized,
    {
        let Some(cached) = self.cache.get(path) else {
            return Ok(None);
        };
        match cached.file.clone().downcast::<AssetFile<T>>() {
            Ok(file) => Ok(Some((file, cached.paths.clone()))),
            Err(_) => {
                handler.on_gyml_type_mismatch(path, T::NAME, cached.type_name, &cached.location);
                Err(LoadFailed)
            }
        }
    }
}

/// Reads `$parent` without deserializing the rest of the document.
fn peek_parent<T, H>(
    document: &Value,
    handler: &mut H,
    location: &RetrievedFileLocation,
) -> Result<Option<GymlRef<T>>, LoadFailed>
where
    T: GymlType,
    H: GymlLoadingErrorHandler + ?Sized,
{
    let Some(node) = document.get(PARENT_KEY) else {
        return Ok(None);
    };
    let path = PropertyPath::root().key(PARENT_KEY);
    let mut errors = ContentErrors::new();
    match node.as_str() {
        Some(text) => match GymlRef::<T>::parse(text) {
            Ok(parent) => return Ok(Some(parent)),
            Err(_) => errors.report_invalid_ref_path(path, ".gyml"),
        },
        None => errors.report_unexpected_type(path, NodeType::String),
    }
    handler.on_content_errors(location, &errors);
    Err(LoadFailed)
}
