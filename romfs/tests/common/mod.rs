#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use byml_value::{DocumentCodec, JsonDocumentCodec, Value};
use romfs::{
    AddressTable, ArchiveCodec, Codecs, Compression, LoadFailed, ResourceSizeTable, RomFs,
    RomFsLoadErrorHandler, ZipArchiveCodec, ZstdCompression,
};
use tempfile::TempDir;

pub const BOOT_PACK: &str = "Pack/Bootup.Nin_NX_NVN.pack.zs";
pub const SIZE_TABLE: &str = "System/Resource/ResourceSizeTable.Product.100.rsizetable.zs";
pub const ADDRESS_TABLE: &str = "System/AddressTable/Product.100.Nin_NX_NVN.atbl.byml.zs";

/// A base romfs (and optionally a mod directory) on disk with valid system
/// files, built in a temp directory.
pub struct RomFsFixture {
    root: TempDir,
    pack_entries: BTreeMap<String, Vec<u8>>,
    redirects: BTreeMap<String, String>,
    size_table: ResourceSizeTable,
    with_mod: bool,
}

impl RomFsFixture {
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
            pack_entries: BTreeMap::new(),
            redirects: BTreeMap::new(),
            size_table: ResourceSizeTable::new(),
            with_mod: false,
        }
    }

    pub fn with_mod(mut self) -> Self {
        self.with_mod = true;
        self
    }

    pub fn pack_entry(mut self, path: &str, bytes: &[u8]) -> Self {
        self.pack_entries.insert(path.to_string(), bytes.to_vec());
        self
    }

    pub fn redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(from.to_string(), to.to_string());
        self
    }

    pub fn resource_size(mut self, path: &str, size: u32) -> Self {
        self.size_table.insert(path, size);
        self
    }

    pub fn build(self) -> Self {
        let base = self.base();
        for sub_directory in romfs::REQUIRED_SUB_DIRECTORIES {
            fs::create_dir_all(base.join(sub_directory)).unwrap();
        }
        if self.with_mod {
            fs::create_dir_all(self.mod_dir()).unwrap();
        }
        let pack = ZipArchiveCodec.build(&self.pack_entries).unwrap();
        self.write_base(BOOT_PACK, &compress(&pack));
        self.write_base(SIZE_TABLE, &compress(&self.size_table.to_bytes()));
        let table = AddressTable::new(self.redirects.clone()).to_document();
        self.write_base(ADDRESS_TABLE, &compress(&json(&table)));
        self
    }

    pub fn base(&self) -> PathBuf {
        self.root.path().join("base")
    }

    pub fn mod_dir(&self) -> PathBuf {
        self.root.path().join("mod")
    }

    pub fn write_base(&self, path: &str, bytes: &[u8]) -> PathBuf {
        write_under(&self.base(), path, bytes)
    }

    pub fn write_mod(&self, path: &str, bytes: &[u8]) -> PathBuf {
        write_under(&self.mod_dir(), path, bytes)
    }

    pub fn write_base_document(&self, path: &str, document: &Value, compressed: bool) -> PathBuf {
        let bytes = json(document);
        if compressed {
            self.write_base(path, &compress(&bytes))
        } else {
            self.write_base(path, &bytes)
        }
    }

    pub fn load<H: RomFsLoadErrorHandler>(&self, handler: &mut H) -> Result<RomFs, LoadFailed> {
        let mod_dir = self.mod_dir();
        let mod_dir = self.with_mod.then_some(mod_dir.as_path());
        RomFs::load(&self.base(), mod_dir, Codecs::default(), handler)
    }
}

fn write_under(root: &Path, path: &str, bytes: &[u8]) -> PathBuf {
    let full = root.join(path);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&full, bytes).unwrap();
    full
}

pub fn json(document: &Value) -> Vec<u8> {
    JsonDocumentCodec.serialize(document).unwrap()
}

pub fn compress(bytes: &[u8]) -> Vec<u8> {
    ZstdCompression::default().compress(bytes).unwrap()
}

pub fn pack(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let entries: BTreeMap<String, Vec<u8>> = entries
        .iter()
        .map(|(name, bytes)| (name.to_string(), bytes.to_vec()))
        .collect();
    compress(&ZipArchiveCodec.build(&entries).unwrap())
}
