use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Files every romfs carries outside the regular asset tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SystemFile {
    BootupPack,
    ResourceSizeTable,
    AddressTable,
}

impl SystemFile {
    pub fn directory(self) -> &'static str {
        match self {
            SystemFile::BootupPack => "Pack",
            SystemFile::ResourceSizeTable => "System/Resource",
            SystemFile::AddressTable => "System/AddressTable",
        }
    }

    /// File name pattern; a single `*` matches any run of characters.
    pub fn pattern(self) -> &'static str {
        match self {
            SystemFile::BootupPack => "Bootup.Nin_NX_NVN.pack.zs",
            SystemFile::ResourceSizeTable => "ResourceSizeTable.Product.*.rsizetable.zs",
            SystemFile::AddressTable => "Product.*.Nin_NX_NVN.atbl.byml.zs",
        }
    }

    /// Whether a copy in the mod directory replaces the base one.
    pub fn mod_overridable(self) -> bool {
        !matches!(self, SystemFile::AddressTable)
    }
}

impl fmt::Display for SystemFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SystemFile::BootupPack => "bootup pack",
            SystemFile::ResourceSizeTable => "resource size table",
            SystemFile::AddressTable => "address table",
        };
        write!(f, "{}", label)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MissingSystemFile {
    pub directory: PathBuf,
    pub pattern: &'static str,
    pub kind: SystemFile,
    pub directory_exists: bool,
}

impl fmt::Display for MissingSystemFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "missing {}: no file matching {} in {}",
            self.kind,
            self.pattern,
            self.directory.display()
        )?;
        if !self.directory_exists {
            write!(f, " (directory does not exist)")?;
        }
        Ok(())
    }
}

/// Returns the first file in `root/<kind directory>` matching the kind's
/// pattern, in sorted name order.
pub fn find_system_file(root: &Path, kind: SystemFile) -> Result<PathBuf, MissingSystemFile> {
    let directory = root.join(kind.directory());
    let missing = |directory_exists| MissingSystemFile {
        directory: directory.clone(),
        pattern: kind.pattern(),
        kind,
        directory_exists,
    };
    let Ok(read_dir) = fs::read_dir(&directory) else {
        return Err(missing(false));
    };
    let mut names: Vec<String> = read_dir
        .flatten()
        .filter(|entry| entry.file_type().map(|ty| ty.is_file()).unwrap_or(false))
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| matches_pattern(kind.pattern(), name))
        .collect();
    names.sort();
    match names.into_iter().next() {
        Some(name) => Ok(directory.join(name)),
        None => Err(missing(true)),
    }
}

fn matches_pattern(pattern: &str, name: &str) -> bool {
    match pattern.split_once('*') {
        Some((head, tail)) => {
            name.len() >= head.len() + tail.len() && name.starts_with(head) && name.ends_with(tail)
        }
        None => pattern == name,
    }
}
