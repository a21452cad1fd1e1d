use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use byml_value::Value;

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

pub type PropertyPathSet = HashSet<PropertyPath>;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => write!(f, "{}", key),
            Segment::Index(index) => write!(f, "[{}]", index),
        }
    }
}

#[derive(Debug)]
struct Link {
    segment: Segment,
    parent: Option<Rc<Link>>,
    depth: usize,
    hash: u64,
}

/// Location of a node inside a document, from the root down.
///
/// Paths are persistent: extending one shares the prefix with the original.
/// Equality, ordering and hashing only look at the segments, so two paths
/// that name the same property compare equal however they were built.
#[derive(Clone, Default)]
pub struct PropertyPath {
    head: Option<Rc<Link>>,
}

impl PropertyPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: impl IntoIterator<Item = Segment>) -> Self {
        segments
            .into_iter()
            .fold(Self::root(), |path, segment| path.push(segment))
    }

    pub fn key(&self, key: &str) -> Self {
        self.push(Segment::Key(key.to_string()))
    }

    pub fn index(&self, index: usize) -> Self {
        self.push(Segment::Index(index))
    }

    pub fn push(&self, segment: Segment) -> Self {
        let hash = mix_segment(self.content_hash(), &segment);
        Self {
            head: Some(Rc::new(Link {
                segment,
                parent: self.head.clone(),
                depth: self.len() + 1,
                hash,
            })),
        }
    }

    pub fn len(&self) -> usize {
        self.head.as_ref().map_or(0, |link| link.depth)
    }

    pub fn is_root(&self) -> bool {
        self.head.is_none()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.head.as_ref().map(|link| &link.segment)
    }

    /// Segments ordered from the root down.
    pub fn segments(&self) -> Vec<Segment> {
        let mut segments: Vec<Segment> = self.iter_rev().cloned().collect();
        segments.reverse();
        segments
    }

    fn content_hash(&self) -> u64 {
        self.head.as_ref().map_or(FNV_OFFSET, |link| link.hash)
    }

    fn iter_rev(&self) -> impl Iterator<Item = &Segment> {
        let mut cursor = self.head.as_deref();
        std::iter::from_fn(move || {
            let link = cursor?;
            cursor = link.parent.as_deref();
            Some(&link.segment)
        })
    }
}

fn mix_segment(mut hash: u64, segment: &Segment) -> u64 {
    let (tag, bytes): (u8, Vec<u8>) = match segment {
        Segment::Key(key) => (b'k', key.as_bytes().to_vec()),
        Segment::Index(index) => (b'i', (*index as u64).to_le_bytes().to_vec()),
    };
    for byte in std::iter::once(tag).chain(bytes) {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

impl PartialEq for PropertyPath {
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() || self.content_hash() != other.content_hash() {
            return false;
        }
        self.iter_rev().eq(other.iter_rev())
    }
}

impl Eq for PropertyPath {}

impl Hash for PropertyPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.content_hash().hash(state);
    }
}

impl Ord for PropertyPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.segments().cmp(&other.segments())
    }
}

impl PartialOrd for PropertyPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, "<root>");
        }
        for (position, segment) in self.segments().iter().enumerate() {
            match segment {
                Segment::Key(key) if position > 0 => write!(f, ".{}", key)?,
                other => write!(f, "{}", other)?,
            }
        }
        Ok(())
    }
}

impl fmt::Debug for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyPath({})", self)
    }
}

/// Every concrete node path in `document`, containers included.
pub fn collect_property_paths(document: &Value) -> PropertyPathSet {
    let mut paths = PropertyPathSet::new();
    collect_into(document, &PropertyPath::root(), &mut paths);
    paths
}

fn collect_into(node: &Value, path: &PropertyPath, paths: &mut PropertyPathSet) {
    match node {
        Value::Map(map) => {
            for (key, child) in map {
                let child_path = path.key(key);
                collect_into(child, &child_path, paths);
                paths.insert(child_path);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                let child_path = path.index(index);
                collect_into(child, &child_path, paths);
                paths.insert(child_path);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(path: &PropertyPath) -> u64 {
        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn paths_built_differently_are_equal() {
        let shared = PropertyPath::root().key("Components");
        let a = shared.key("Mumap");
        let b = PropertyPath::from_segments([
            Segment::Key("Components".to_string()),
            Segment::Key("Mumap".to_string()),
        ]);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn key_and_index_segments_differ() {
        let a = PropertyPath::root().key("0");
        let b = PropertyPath::root().index(0);
        assert_ne!(a, b);
    }

    #[test]
    fn display_reads_like_an_accessor() {
        let path = PropertyPath::root().key("Actors").index(1).key("Hash");
        assert_eq!(path.to_string(), "Actors[1].Hash");
        assert_eq!(PropertyPath::root().to_string(), "<root>");
    }

    #[test]
    fn collects_nested_paths() {
        let doc = Value::map([(
            "Rails",
            Value::array([Value::map([("Hash", Value::from(1u64))])]),
        )]);
        let paths = collect_property_paths(&doc);
        assert!(paths.contains(&PropertyPath::root().key("Rails")));
        assert!(paths.contains(&PropertyPath::root().key("Rails").index(0)));
        assert!(paths.contains(&PropertyPath::root().key("Rails").index(0).key("Hash")));
        assert_eq!(paths.len(), 3);
    }
}
