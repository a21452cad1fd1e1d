#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use byml_value::{DocumentCodec, JsonDocumentCodec, Value};
use romfs::gyml::types::StageParam;
use romfs::{
    AddressTable, ArchiveCodec, Codecs, Compression, GymlRef, MuMapRef, ResourceSizeTable, RomFs,
    RomFsLoadErrorHandler, ZipArchiveCodec, ZstdCompression,
};
use tempfile::TempDir;

/// A minimal romfs with valid system files; stages and fragments are added
/// through the `write_*` helpers.
pub struct StageFixture {
    root: TempDir,
}

impl StageFixture {
    pub fn new() -> Self {
        let fixture = Self {
            root: tempfile::tempdir().unwrap(),
        };
        for sub_directory in romfs::REQUIRED_SUB_DIRECTORIES {
            fs::create_dir_all(fixture.base().join(sub_directory)).unwrap();
        }
        let pack = ZipArchiveCodec.build(&BTreeMap::new()).unwrap();
        fixture.write("Pack/Bootup.Nin_NX_NVN.pack.zs", &compress(&pack));
        fixture.write(
            "System/Resource/ResourceSizeTable.Product.100.rsizetable.zs",
            &compress(&ResourceSizeTable::new().to_bytes()),
        );
        let table = AddressTable::new(BTreeMap::new()).to_document();
        fixture.write(
            "System/AddressTable/Product.100.Nin_NX_NVN.atbl.byml.zs",
            &compress(&json(&table)),
        );
        fixture
    }

    pub fn base(&self) -> PathBuf {
        self.root.path().join("romfs")
    }

    pub fn load<H: RomFsLoadErrorHandler>(&self, handler: &mut H) -> RomFs {
        RomFs::load(&self.base(), None, Codecs::default(), handler).unwrap()
    }

    fn write(&self, path: &str, bytes: &[u8]) {
        let full = self.base().join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, bytes).unwrap();
    }

    pub fn write_gyml(&self, romfs_path: &str, document: Value) {
        self.write(romfs_path, &json(&document));
    }

    /// StageParam `name` pointing at fragment `mumap`.
    pub fn write_stage(&self, name: &str, category: &str, mumap: Option<&str>) {
        let mut components = Vec::new();
        if let Some(mumap) = mumap {
            components.push(("Mumap", Value::from(mumap_ref(mumap).as_str())));
        }
        self.write_stage_document(
            name,
            Value::map([
                ("Category", Value::from(category)),
                ("Components", Value::map(components)),
            ]),
        );
    }

    pub fn write_stage_document(&self, name: &str, document: Value) {
        self.write_gyml(&stage_ref(name).romfs_path(), document);
    }

    pub fn write_fragment(&self, name: &str, document: Value) {
        self.write(&mumap_ref(name).romfs_path(), &compress(&json(&document)));
    }
}

pub fn stage_ref(name: &str) -> GymlRef<StageParam> {
    GymlRef::parse(&format!(
        "Work/Stage/StageParam/{}.game__stage__StageParam.gyml",
        name
    ))
    .unwrap()
}

pub fn mumap_ref(name: &str) -> MuMapRef {
    MuMapRef::parse(&format!("Work/MapUnit/Map/{}.mumap", name)).unwrap()
}

fn json(document: &Value) -> Vec<u8> {
    JsonDocumentCodec.serialize(document).unwrap()
}

fn compress(bytes: &[u8]) -> Vec<u8> {
    ZstdCompression::default().compress(bytes).unwrap()
}

fn float3(x: f32, y: f32, z: f32) -> Value {
    Value::array([Value::Float(x), Value::Float(y), Value::Float(z)])
}

pub fn actor(hash: u64) -> Value {
    Value::map([
        ("AreaHash", Value::U32(0)),
        ("Hash", Value::U64(hash)),
        ("Gyaml", Value::from("ObjectBlock")),
        ("Name", Value::from("ObjectBlock")),
        ("Layer", Value::from("PlayArea1")),
        ("Rotate", float3(0.0, 0.0, 0.0)),
        ("Scale", float3(1.0, 1.0, 1.0)),
        ("Translate", float3(0.0, 0.0, 0.0)),
    ])
}

pub fn rail(hash: u64, point_hashes: &[u64]) -> Value {
    Value::map([
        ("AreaHash", Value::U32(0)),
        ("Hash", Value::U64(hash)),
        ("Gyaml", Value::from("Rail")),
        ("IsClosed", Value::Bool(false)),
        (
            "Points",
            Value::array(point_hashes.iter().map(|&point| {
                Value::map([
                    ("Hash", Value::U64(point)),
                    ("Translate", float3(0.0, 0.0, 0.0)),
                ])
            })),
        ),
    ])
}

pub fn link(source: u64, destination: u64) -> Value {
    Value::map([
        ("Src", Value::U64(source)),
        ("Dst", Value::U64(destination)),
        ("Name", Value::from("Reference")),
    ])
}

pub fn rail_link(source: u64, rail: u64, point: u64) -> Value {
    Value::map([
        ("Src", Value::U64(source)),
        ("Dst", Value::U64(rail)),
        ("Point", Value::U64(point)),
        ("Name", Value::from("Rail")),
    ])
}

pub fn group(hash: u64, members: &[u64]) -> Value {
    Value::map([
        ("Hash", Value::U64(hash)),
        (
            "Actors",
            Value::array(members.iter().map(|&member| Value::U64(member))),
        ),
    ])
}

/// A fragment document with the required keys plus `extra`.
pub fn fragment(stage: &str, actors: Vec<Value>, extra: Vec<(&str, Value)>) -> Value {
    let mut entries = vec![
        ("Actors", Value::array(actors)),
        ("RootAreaHash", Value::U32(0)),
        ("StageParam", Value::from(stage_ref(stage).as_str())),
    ];
    entries.extend(extra);
    Value::map(entries)
}
