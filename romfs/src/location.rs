use std::fmt;
use std::path::PathBuf;

/// Where a file's bytes were actually found.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RetrievedFileLocation {
    InPack { pack_path: String, inner_path: String },
    InFileSystem { path: PathBuf },
}

impl RetrievedFileLocation {
    pub fn in_pack(pack_path: &str, inner_path: &str) -> Self {
        RetrievedFileLocation::InPack {
            pack_path: pack_path.to_string(),
            inner_path: inner_path.to_string(),
        }
    }

    pub fn in_file_system(path: impl Into<PathBuf>) -> Self {
        RetrievedFileLocation::InFileSystem { path: path.into() }
    }
}

impl fmt::Display for RetrievedFileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrievedFileLocation::InPack {
                pack_path,
                inner_path,
            } => write!(f, "{}:{}", pack_path, inner_path),
            RetrievedFileLocation::InFileSystem { path } => write!(f, "{}", path.display()),
        }
    }
}
