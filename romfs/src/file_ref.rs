use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use byml_serialization::{Conversion, ReadContext};
use byml_value::{NodeType, Value};
use thiserror::Error;

pub const REF_PREFIX: &str = "Work/";

/// Directories renamed between the production tree and the shipped romfs.
const DIRECTORY_REDIRECTS: &[(&str, &str)] = &[("MapUnit/Map/", "BancMapUnit/")];

/// Suffix pair for one kind of referenced file: the form written inside
/// documents and the form of the file on disk.
pub trait RefKind {
    const PRODUCTION_SUFFIX: &'static str;
    const SHIPPED_SUFFIX: &'static str;
}

#[derive(Debug)]
pub struct MuMapKind;

impl RefKind for MuMapKind {
    const PRODUCTION_SUFFIX: &'static str = ".mumap";
    const SHIPPED_SUFFIX: &'static str = ".bcett.byml.zs";
}

/// Gyml refs are typed by the record they point at.
pub struct GymlKind<T>(PhantomData<fn() -> T>);

impl<T> RefKind for GymlKind<T> {
    const PRODUCTION_SUFFIX: &'static str = ".gyml";
    const SHIPPED_SUFFIX: &'static str = ".bgyml";
}

pub type GymlRef<T> = FileRef<GymlKind<T>>;
pub type MuMapRef = FileRef<MuMapKind>;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FileRefError {
    #[error("ref path '{path}' does not start with '{REF_PREFIX}'")]
    MissingPrefix { path: String },
    #[error("ref path '{path}' does not end with '{expected}'")]
    MissingSuffix { path: String, expected: &'static str },
}

/// A path as written in a document, checked against its kind's prefix and
/// suffix. Never constructed from an unchecked string.
pub struct FileRef<K> {
    path: String,
    _kind: PhantomData<fn() -> K>,
}

impl<K: RefKind> FileRef<K> {
    pub fn parse(path: &str) -> Result<Self, FileRefError> {
        if !path.starts_with(REF_PREFIX) {
            return Err(FileRefError::MissingPrefix {
                path: path.to_string(),
            });
        }
        if !path.ends_with(K::PRODUCTION_SUFFIX) || path.len() <= REF_PREFIX.len() + K::PRODUCTION_SUFFIX.len() {
            return Err(FileRefError::MissingSuffix {
                path: path.to_string(),
                expected: K::PRODUCTION_SUFFIX,
            });
        }
        Ok(Self {
            path: path.to_string(),
            _kind: PhantomData,
        })
    }

    pub fn is_valid(path: &str) -> bool {
        Self::parse(path).is_ok()
    }

    /// Storage path inside a romfs root: prefix dropped, renamed directories
    /// applied, shipped suffix in place of the production one.
    pub fn romfs_path(&self) -> String {
        let middle = &self.path[REF_PREFIX.len()..self.path.len() - K::PRODUCTION_SUFFIX.len()];
        let mut storage = middle.to_string();
        for (production, shipped) in DIRECTORY_REDIRECTS {
            if let Some(rest) = middle.strip_prefix(production) {
                storage = format!("{}{}", shipped, rest);
                break;
            }
        }
        storage.push_str(K::SHIPPED_SUFFIX);
        storage
    }

    /// Last path segment without the production suffix.
    pub fn stem(&self) -> &str {
        let without_suffix = &self.path[..self.path.len() - K::PRODUCTION_SUFFIX.len()];
        without_suffix
            .rsplit('/')
            .next()
            .unwrap_or(without_suffix)
    }
}

impl<K> FileRef<K> {
    pub fn as_str(&self) -> &str {
        &self.path
    }
}

impl<K> Clone for FileRef<K> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K> PartialEq for FileRef<K> {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl<K> Eq for FileRef<K> {}

impl<K> Hash for FileRef<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl<K> fmt::Debug for FileRef<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileRef({})", self.path)
    }
}

impl<K> fmt::Display for FileRef<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

/// String node holding a [`FileRef`]. Invalid paths are reported, not fixed.
pub struct Ref<K>(PhantomData<fn() -> K>);

impl<K> Ref<K> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<K> Clone for Ref<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Ref<K> {}

impl<K: RefKind> Conversion for Ref<K> {
    type Value = FileRef<K>;
    const TAG: Option<NodeType> = Some(NodeType::String);

    fn read(&self, ctx: &mut ReadContext<'_>) -> Option<FileRef<K>> {
        let Some(path) = ctx.node().as_str() else {
            ctx.report_unexpected_type(NodeType::String);
            return None;
        };
        match FileRef::parse(path) {
            Ok(file_ref) => Some(file_ref),
            Err(_) => {
                ctx.report_invalid_ref_path(K::PRODUCTION_SUFFIX);
                None
            }
        }
    }

    fn write(&self, value: &mut FileRef<K>, _existing: Option<Value>) -> Value {
        Value::String(value.path.clone())
    }
}

/// Like [`Ref`], but the empty string is a valid "no entry".
pub struct RefOrEmpty<K>(PhantomData<fn() -> K>);

impl<K> RefOrEmpty<K> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<K> Clone for RefOrEmpty<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for RefOrEmpty<K> {}

impl<K: RefKind> Conversion for RefOrEmpty<K> {
    type Value = Option<FileRef<K>>;
    const TAG: Option<NodeType> = Some(NodeType::String);

    fn read(&self, ctx: &mut ReadContext<'_>) -> Option<Option<FileRef<K>>> {
        if ctx.node().as_str() == Some("") {
            return Some(None);
        }
        Ref::<K>::new().read(ctx).map(Some)
    }

    fn write(&self, value: &mut Option<FileRef<K>>, _existing: Option<Value>) -> Value {
        match value {
            Some(file_ref) => Value::String(file_ref.path.clone()),
            None => Value::String(String::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy;

    #[test]
    fn rejects_missing_prefix_and_suffix() {
        assert_eq!(
            MuMapRef::parse("MapUnit/Map/Course001.mumap"),
            Err(FileRefError::MissingPrefix {
                path: "MapUnit/Map/Course001.mumap".to_string()
            })
        );
        assert_eq!(
            MuMapRef::parse("Work/MapUnit/Map/Course001.gyml"),
            Err(FileRefError::MissingSuffix {
                path: "Work/MapUnit/Map/Course001.gyml".to_string(),
                expected: ".mumap"
            })
        );
        assert!(GymlRef::<Dummy>::parse("Work/.gyml").is_err());
    }

    #[test]
    fn mumap_paths_are_redirected() {
        let mumap = MuMapRef::parse("Work/MapUnit/Map/Course001/Course001_Main.mumap").unwrap();
        assert_eq!(
            mumap.romfs_path(),
            "BancMapUnit/Course001/Course001_Main.bcett.byml.zs"
        );
        assert_eq!(mumap.stem(), "Course001_Main");
    }

    #[test]
    fn gyml_paths_swap_suffix_only() {
        let gyml = GymlRef::<Dummy>::parse(
            "Work/Stage/StageParam/Course001.game__stage__StageParam.gyml",
        )
        .unwrap();
        assert_eq!(
            gyml.romfs_path(),
            "Stage/StageParam/Course001.game__stage__StageParam.bgyml"
        );
    }
}
