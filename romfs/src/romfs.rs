use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use byml_value::{DocumentError, NodeType, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::address_table::{AddressTable, AddressTableError};
use crate::codec::{Archive, Codecs, CompressionError};
use crate::format::{DocumentFormat, FileFormat, PackFormat, SizeTableFormat, ADDRESS_TABLE_FORMAT};
use crate::handler::{
    FileLoadingErrorHandler, FileResolutionErrorHandler, LoadFailed, RomFsLoadErrorHandler,
};
use crate::location::RetrievedFileLocation;
use crate::size_table::ResourceSizeTable;
use crate::system::{find_system_file, SystemFile};

/// Directories a base romfs must contain.
pub const REQUIRED_SUB_DIRECTORIES: [&str; 4] = ["BancMapUnit", "Gyml", "Pack", "System"];

/// An opened pack archive and the romfs path it was loaded from.
pub struct PackInfo {
    path: String,
    archive: Box<dyn Archive>,
}

impl PackInfo {
    pub fn new(path: impl Into<String>, archive: Box<dyn Archive>) -> Self {
        Self {
            path: path.into(),
            archive,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn archive(&self) -> &dyn Archive {
        self.archive.as_ref()
    }

    pub fn names(&self) -> Vec<&str> {
        self.archive.names()
    }
}

impl std::fmt::Debug for PackInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackInfo")
            .field("path", &self.path)
            .field("entries", &self.archive.names().len())
            .finish()
    }
}

#[derive(Debug)]
pub struct LoadedFile<T> {
    pub value: T,
    pub location: RetrievedFileLocation,
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("no mod directory to save into")]
    NoModDirectory,
    #[error("unsafe romfs path: {0}")]
    UnsafePath(String),
    #[error("io error writing {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Compression(#[from] CompressionError),
    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// A base romfs dump plus an optional mod overlay.
///
/// Lookups go explicit pack, boot pack, mod directory, base directory, after
/// the address table has had a chance to rewrite the path. Writes only ever
/// touch the mod directory.
pub struct RomFs {
    base: PathBuf,
    mod_dir: Option<PathBuf>,
    codecs: Codecs,
    boot_pack: PackInfo,
    size_table: ResourceSizeTable,
    address_table: AddressTable,
}

impl RomFs {
    pub fn load<H>(
        base: &Path,
        mod_dir: Option<&Path>,
        codecs: Codecs,
        handler: &mut H,
    ) -> Result<Self, LoadFailed>
    where
        H: RomFsLoadErrorHandler + ?Sized,
    {
        let base = absolute_path(base);
        let mod_dir = mod_dir.map(absolute_path);

        if mod_dir.as_deref() == Some(base.as_path()) {
            handler.on_base_and_mod_paths_identical(&base);
            return Err(LoadFailed);
        }
        if !base.is_dir() {
            handler.on_root_directory_not_found(&base);
            return Err(LoadFailed);
        }
        let mut missing_sub_directory = false;
        for sub_directory in REQUIRED_SUB_DIRECTORIES {
            if !base.join(sub_directory).is_dir() {
                handler.on_missing_sub_directory(&base, sub_directory);
                missing_sub_directory = true;
            }
        }
        if missing_sub_directory {
            return Err(LoadFailed);
        }
        if let Some(mod_dir) = &mod_dir {
            if !mod_dir.is_dir() {
                handler.on_root_directory_not_found(mod_dir);
                return Err(LoadFailed);
            }
        }

        let mut system_paths = Vec::new();
        let mut missing_system_file = false;
        for kind in [
            SystemFile::BootupPack,
            SystemFile::ResourceSizeTable,
            SystemFile::AddressTable,
        ] {
            let mod_copy = mod_dir
                .as_deref()
                .filter(|_| kind.mod_overridable())
                .and_then(|mod_dir| find_system_file(mod_dir, kind).ok());
            match find_system_file(&base, kind) {
                Ok(base_copy) => system_paths.push(mod_copy.unwrap_or(base_copy)),
                Err(missing) => {
                    handler.on_missing_system_file(&missing);
                    missing_system_file = true;
                }
            }
        }
        if missing_system_file {
            return Err(LoadFailed);
        }
        let [boot_pack_path, size_table_path, address_table_path] = system_paths.as_slice() else {
            return Err(LoadFailed);
        };

        let archive = read_file_system(boot_pack_path, &PackFormat, &codecs, handler)?;
        let boot_pack = PackInfo::new(system_relative_path(SystemFile::BootupPack, boot_pack_path), archive);
        let size_table = read_file_system(size_table_path, &SizeTableFormat, &codecs, handler)?;
        let address_document =
            read_file_system(address_table_path, &ADDRESS_TABLE_FORMAT, &codecs, handler)?;
        let address_table = match AddressTable::from_document(&address_document) {
            Ok(table) => table,
            Err(err) => {
                let location = RetrievedFileLocation::in_file_system(address_table_path);
                match err {
                    AddressTableError::RootTypeMismatch { actual } => {
                        handler.on_root_type_mismatch(&location, NodeType::Map, actual)
                    }
                    AddressTableError::Content(errors) => {
                        handler.on_content_errors(&location, &errors)
                    }
                }
                return Err(LoadFailed);
            }
        };

        info!(
            base = %base.display(),
            mod_dir = ?mod_dir.as_ref().map(|dir| dir.display().to_string()),
            boot_pack_entries = boot_pack.names().len(),
            size_table_entries = size_table.len(),
            address_table_entries = address_table.len(),
            "romfs loaded"
        );

        Ok(Self {
            base,
            mod_dir,
            codecs,
            boot_pack,
            size_table,
            address_table,
        })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn mod_dir(&self) -> Option<&Path> {
        self.mod_dir.as_deref()
    }

    pub fn codecs(&self) -> &Codecs {
        &self.codecs
    }

    pub fn boot_pack(&self) -> &PackInfo {
        &self.boot_pack
    }

    pub fn size_table(&self) -> &ResourceSizeTable {
        &self.size_table
    }

    pub fn address_table(&self) -> &AddressTable {
        &self.address_table
    }

    pub fn resource_size(&self, path: &str) -> Option<u32> {
        self.size_table.get(path)
    }

    /// Path actually looked up for `path` once the address table is applied.
    pub fn resolve_path<'a>(&'a self, path: &'a str) -> &'a str {
        self.address_table.redirect(path).unwrap_or(path)
    }

    /// Every place `path` would be looked for, in search order.
    pub fn search_locations(
        &self,
        path: &str,
        pack: Option<&PackInfo>,
    ) -> Vec<RetrievedFileLocation> {
        let path = self.resolve_path(path);
        let mut locations: Vec<RetrievedFileLocation> = pack
            .into_iter()
            .chain(std::iter::once(&self.boot_pack))
            .map(|pack| RetrievedFileLocation::in_pack(pack.path(), path))
            .collect();
        for root in self.roots() {
            if let Some(full) = safe_join(root, path) {
                locations.push(RetrievedFileLocation::in_file_system(full));
            }
        }
        locations
    }

    pub fn load_file<F, H>(
        &self,
        path: &str,
        format: &F,
        handler: &mut H,
        pack: Option<&PackInfo>,
    ) -> Result<LoadedFile<F::Output>, LoadFailed>
    where
        F: FileFormat,
        H: FileResolutionErrorHandler + ?Sized,
    {
        let requested = path;
        let path = self.resolve_path(requested);
        if path != requested {
            debug!(requested, redirected = path, "address table redirect");
        }

        let mut searched = Vec::new();
        for pack in pack.into_iter().chain(std::iter::once(&self.boot_pack)) {
            let location = RetrievedFileLocation::in_pack(pack.path(), path);
            match pack.archive().get(path) {
                Some(bytes) => {
                    debug!(path, pack = pack.path(), "resolved in pack");
                    let value = decode(bytes.to_vec(), format, &self.codecs, &location, handler)?;
                    return Ok(LoadedFile { value, location });
                }
                None => {
                    debug!(path, pack = pack.path(), "not in pack");
                    searched.push(location);
                }
            }
        }

        for root in self.roots() {
            let Some(full) = safe_join(root, path) else {
                continue;
            };
            if full.is_file() {
                debug!(path, file = %full.display(), "resolved on disk");
                let value = read_file_system(&full, format, &self.codecs, handler)?;
                return Ok(LoadedFile {
                    value,
                    location: RetrievedFileLocation::in_file_system(full),
                });
            }
            debug!(path, file = %full.display(), "not on disk");
            searched.push(RetrievedFileLocation::in_file_system(full));
        }

        handler.on_file_not_found(path, &searched);
        Err(LoadFailed)
    }

    pub fn load_pack<H>(&self, path: &str, handler: &mut H) -> Result<PackInfo, LoadFailed>
    where
        H: FileResolutionErrorHandler + ?Sized,
    {
        let loaded = self.load_file(path, &PackFormat, handler, None)?;
        Ok(PackInfo::new(path, loaded.value))
    }

    /// Writes `bytes` to `path` under the mod directory, compressing first
    /// when asked to.
    pub fn save_file(&self, path: &str, bytes: &[u8], compressed: bool) -> Result<PathBuf, SaveError> {
        let mod_dir = self.mod_dir.as_ref().ok_or(SaveError::NoModDirectory)?;
        let full = safe_join(mod_dir, path).ok_or_else(|| SaveError::UnsafePath(path.to_string()))?;
        let data = if compressed {
            self.codecs.compression.compress(bytes)?
        } else {
            bytes.to_vec()
        };
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|source| SaveError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&full, data).map_err(|source| SaveError::Io {
            path: full.clone(),
            source,
        })?;
        info!(path, file = %full.display(), "saved to mod romfs");
        Ok(full)
    }

    pub fn save_document(
        &self,
        path: &str,
        document: &Value,
        format: DocumentFormat,
    ) -> Result<PathBuf, SaveError> {
        let bytes = self.codecs.document.serialize(document)?;
        self.save_file(path, &bytes, format.compressed)
    }

    fn roots(&self) -> impl Iterator<Item = &Path> {
        self.mod_dir
            .as_deref()
            .into_iter()
            .chain(std::iter::once(self.base.as_path()))
    }
}

fn read_file_system<F, H>(
    path: &Path,
    format: &F,
    codecs: &Codecs,
    handler: &mut H,
) -> Result<F::Output, LoadFailed>
where
    F: FileFormat,
    H: FileLoadingErrorHandler + ?Sized,
{
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            handler.on_file_read_failed(path, &err);
            return Err(LoadFailed);
        }
    };
    let bytes = if format.compressed() {
        match codecs.compression.decompress(&bytes) {
            Ok(bytes) => bytes,
            Err(err) => {
                handler.on_decompression_failed(path, &err);
                return Err(LoadFailed);
            }
        }
    } else {
        bytes
    };
    let location = RetrievedFileLocation::in_file_system(path);
    decode(bytes, format, codecs, &location, handler)
}

fn decode<F, H>(
    bytes: Vec<u8>,
    format: &F,
    codecs: &Codecs,
    location: &RetrievedFileLocation,
    handler: &mut H,
) -> Result<F::Output, LoadFailed>
where
    F: FileFormat,
    H: FileLoadingErrorHandler + ?Sized,
{
    format.read(codecs, bytes).map_err(|err| {
        handler.on_format_read_failed(location, &err);
        LoadFailed
    })
}

fn system_relative_path(kind: SystemFile, path: &Path) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}/{}", kind.directory(), name)
}

fn absolute_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = fs::canonicalize(path) {
        return canonical;
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|dir| dir.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn safe_join(base: &Path, rel: &str) -> Option<PathBuf> {
    if rel.is_empty() {
        return None;
    }
    let mut out = PathBuf::from(base);
    for component in Path::new(rel).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(out)
}
