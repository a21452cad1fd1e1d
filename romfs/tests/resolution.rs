mod common;

use std::fs;

use byml_value::Value;
use common::{compress, pack, RomFsFixture, ADDRESS_TABLE, BOOT_PACK};
use romfs::{
    Codecs, CollectingErrorHandler, ErrorReport, RawFormat, RetrievedFileLocation, RomFs,
    SaveError, SystemFile, BCETT_FORMAT,
};

const RAW: RawFormat = RawFormat { compressed: false };

#[test]
fn identical_base_and_mod_are_rejected() {
    let fixture = RomFsFixture::new().build();
    let mut handler = CollectingErrorHandler::new();
    let base = fixture.base();
    let result = RomFs::load(&base, Some(&base), Codecs::default(), &mut handler);
    assert!(result.is_err());
    assert!(matches!(
        handler.reports.as_slice(),
        [ErrorReport::BaseAndModPathsIdentical { .. }]
    ));
}

#[test]
fn every_missing_sub_directory_is_reported() {
    let fixture = RomFsFixture::new();
    fs::create_dir_all(fixture.base()).unwrap();
    fs::create_dir_all(fixture.base().join("Gyml")).unwrap();
    let mut handler = CollectingErrorHandler::new();
    assert!(fixture.load(&mut handler).is_err());
    let missing: Vec<&str> = handler
        .reports
        .iter()
        .filter_map(|report| match report {
            ErrorReport::MissingSubDirectory { sub_directory, .. } => Some(sub_directory.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(missing, vec!["BancMapUnit", "Pack", "System"]);
}

#[test]
fn missing_mod_directory_is_reported_after_base_checks() {
    let fixture = RomFsFixture::new().build();
    let mut handler = CollectingErrorHandler::new();
    let mod_dir = fixture.mod_dir();
    let result = RomFs::load(&fixture.base(), Some(&mod_dir), Codecs::default(), &mut handler);
    assert!(result.is_err());
    assert!(matches!(
        handler.reports.as_slice(),
        [ErrorReport::RootDirectoryNotFound { directory }] if directory.ends_with("mod")
    ));
}

#[test]
fn missing_address_table_is_reported() {
    let fixture = RomFsFixture::new().build();
    fs::remove_file(fixture.base().join(ADDRESS_TABLE)).unwrap();
    let mut handler = CollectingErrorHandler::new();
    assert!(fixture.load(&mut handler).is_err());
    match handler.reports.as_slice() {
        [ErrorReport::MissingSystemFile(missing)] => {
            assert_eq!(missing.kind, SystemFile::AddressTable);
            assert!(missing.directory_exists);
        }
        other => panic!("unexpected reports: {:?}", other),
    }
}

#[test]
fn mod_copy_shadows_base() {
    let fixture = RomFsFixture::new().with_mod().build();
    fixture.write_base("Stage/A.bgyml", b"base");
    fixture.write_mod("Stage/A.bgyml", b"mod");
    fixture.write_base("Stage/B.bgyml", b"base only");
    let mut handler = CollectingErrorHandler::new();
    let romfs = fixture.load(&mut handler).unwrap();

    let loaded = romfs.load_file("Stage/A.bgyml", &RAW, &mut handler, None).unwrap();
    assert_eq!(loaded.value, b"mod");
    assert_eq!(
        loaded.location,
        RetrievedFileLocation::in_file_system(romfs.mod_dir().unwrap().join("Stage/A.bgyml"))
    );
    let loaded = romfs.load_file("Stage/B.bgyml", &RAW, &mut handler, None).unwrap();
    assert_eq!(loaded.value, b"base only");
    assert!(handler.is_empty());
}

#[test]
fn boot_pack_wins_over_file_system() {
    let fixture = RomFsFixture::new()
        .pack_entry("Stage/A.bgyml", b"packed")
        .build();
    fixture.write_base("Stage/A.bgyml", b"loose");
    let mut handler = CollectingErrorHandler::new();
    let romfs = fixture.load(&mut handler).unwrap();
    let loaded = romfs.load_file("Stage/A.bgyml", &RAW, &mut handler, None).unwrap();
    assert_eq!(loaded.value, b"packed");
    assert_eq!(
        loaded.location,
        RetrievedFileLocation::in_pack(BOOT_PACK, "Stage/A.bgyml")
    );
}

#[test]
fn explicit_pack_is_searched_first() {
    let fixture = RomFsFixture::new()
        .pack_entry("Stage/A.bgyml", b"boot")
        .build();
    fixture.write_base(
        "Pack/Stage/Extra.pack.zs",
        &pack(&[("Stage/A.bgyml", b"extra")]),
    );
    let mut handler = CollectingErrorHandler::new();
    let romfs = fixture.load(&mut handler).unwrap();
    let extra = romfs
        .load_pack("Pack/Stage/Extra.pack.zs", &mut handler)
        .unwrap();
    assert_eq!(extra.names(), vec!["Stage/A.bgyml"]);
    let loaded = romfs
        .load_file("Stage/A.bgyml", &RAW, &mut handler, Some(&extra))
        .unwrap();
    assert_eq!(loaded.value, b"extra");
    assert_eq!(
        loaded.location,
        RetrievedFileLocation::in_pack("Pack/Stage/Extra.pack.zs", "Stage/A.bgyml")
    );
}

#[test]
fn redirected_path_is_fetched_and_original_never_searched() {
    let fixture = RomFsFixture::new()
        .redirect("Stage/Old.bgyml", "Stage/New.bgyml")
        .redirect("Stage/Gone.bgyml", "Stage/Nowhere.bgyml")
        .build();
    fixture.write_base("Stage/Old.bgyml", b"old");
    fixture.write_base("Stage/New.bgyml", b"new");
    fixture.write_base("Stage/Gone.bgyml", b"still here");
    let mut handler = CollectingErrorHandler::new();
    let romfs = fixture.load(&mut handler).unwrap();

    let loaded = romfs.load_file("Stage/Old.bgyml", &RAW, &mut handler, None).unwrap();
    assert_eq!(loaded.value, b"new");

    assert!(romfs
        .load_file("Stage/Gone.bgyml", &RAW, &mut handler, None)
        .is_err());
    match handler.reports.as_slice() {
        [ErrorReport::FileNotFound { path, searched }] => {
            assert_eq!(path, "Stage/Nowhere.bgyml");
            assert!(searched
                .iter()
                .all(|location| !location.to_string().contains("Gone")));
        }
        other => panic!("unexpected reports: {:?}", other),
    }
}

#[test]
fn not_found_lists_every_location_in_order() {
    let fixture = RomFsFixture::new().with_mod().build();
    fixture.write_base(
        "Pack/Extra.pack.zs",
        &pack(&[("Stage/Other.bgyml", b"x")]),
    );
    let mut handler = CollectingErrorHandler::new();
    let romfs = fixture.load(&mut handler).unwrap();
    let extra = romfs.load_pack("Pack/Extra.pack.zs", &mut handler).unwrap();

    assert!(romfs
        .load_file("Stage/Missing.bgyml", &RAW, &mut handler, Some(&extra))
        .is_err());
    let expected = vec![
        RetrievedFileLocation::in_pack("Pack/Extra.pack.zs", "Stage/Missing.bgyml"),
        RetrievedFileLocation::in_pack(BOOT_PACK, "Stage/Missing.bgyml"),
        RetrievedFileLocation::in_file_system(romfs.mod_dir().unwrap().join("Stage/Missing.bgyml")),
        RetrievedFileLocation::in_file_system(romfs.base().join("Stage/Missing.bgyml")),
    ];
    assert_eq!(romfs.search_locations("Stage/Missing.bgyml", Some(&extra)), expected);
    match handler.reports.as_slice() {
        [ErrorReport::FileNotFound { searched, .. }] => assert_eq!(searched, &expected),
        other => panic!("unexpected reports: {:?}", other),
    }
}

#[test]
fn decompression_failure_names_absolute_path() {
    let fixture = RomFsFixture::new().build();
    fixture.write_base("BancMapUnit/Broken.bcett.byml.zs", b"not zstd at all");
    let mut handler = CollectingErrorHandler::new();
    let romfs = fixture.load(&mut handler).unwrap();
    assert!(romfs
        .load_file("BancMapUnit/Broken.bcett.byml.zs", &BCETT_FORMAT, &mut handler, None)
        .is_err());
    match handler.reports.as_slice() {
        [ErrorReport::DecompressionFailed { path, .. }] => {
            assert!(path.is_absolute());
            assert_eq!(path, &romfs.base().join("BancMapUnit/Broken.bcett.byml.zs"));
        }
        other => panic!("unexpected reports: {:?}", other),
    }
}

#[test]
fn unparsable_document_reports_location() {
    let fixture = RomFsFixture::new().build();
    fixture.write_base("BancMapUnit/Garbage.bcett.byml.zs", &compress(b"{ nope"));
    let mut handler = CollectingErrorHandler::new();
    let romfs = fixture.load(&mut handler).unwrap();
    assert!(romfs
        .load_file("BancMapUnit/Garbage.bcett.byml.zs", &BCETT_FORMAT, &mut handler, None)
        .is_err());
    assert!(matches!(
        handler.reports.as_slice(),
        [ErrorReport::FormatReadFailed {
            location: RetrievedFileLocation::InFileSystem { .. },
            ..
        }]
    ));
}

#[test]
fn size_table_and_address_table_are_exposed() {
    let fixture = RomFsFixture::new()
        .resource_size("Stage/A.bgyml", 1234)
        .redirect("Stage/A.bgyml", "Stage/B.bgyml")
        .build();
    let mut handler = CollectingErrorHandler::new();
    let romfs = fixture.load(&mut handler).unwrap();
    assert_eq!(romfs.resource_size("Stage/A.bgyml"), Some(1234));
    assert_eq!(romfs.resource_size("Stage/B.bgyml"), None);
    assert_eq!(romfs.resolve_path("Stage/A.bgyml"), "Stage/B.bgyml");
    assert_eq!(romfs.resolve_path("Stage/C.bgyml"), "Stage/C.bgyml");
}

#[test]
fn address_table_is_never_taken_from_mod() {
    let fixture = RomFsFixture::new().with_mod().build();
    let mod_table = Value::map([("Stage/A.bgyml", Value::from("Stage/B.bgyml"))]);
    fixture.write_mod(ADDRESS_TABLE, &compress(&common::json(&mod_table)));
    let mut handler = CollectingErrorHandler::new();
    let romfs = fixture.load(&mut handler).unwrap();
    assert!(romfs.address_table().is_empty());
}

#[test]
fn saves_land_in_mod_directory() {
    let fixture = RomFsFixture::new().with_mod().build();
    fixture.write_base("Stage/A.bgyml", b"base");
    let mut handler = CollectingErrorHandler::new();
    let romfs = fixture.load(&mut handler).unwrap();

    let saved = romfs.save_file("Stage/A.bgyml", b"edited", false).unwrap();
    assert!(saved.starts_with(romfs.mod_dir().unwrap()));
    assert_eq!(fs::read(romfs.base().join("Stage/A.bgyml")).unwrap(), b"base");
    let loaded = romfs.load_file("Stage/A.bgyml", &RAW, &mut handler, None).unwrap();
    assert_eq!(loaded.value, b"edited");

    romfs
        .save_file("Stage/Packed.bin.zs", b"payload", true)
        .unwrap();
    let loaded = romfs
        .load_file(
            "Stage/Packed.bin.zs",
            &RawFormat { compressed: true },
            &mut handler,
            None,
        )
        .unwrap();
    assert_eq!(loaded.value, b"payload");
}

#[test]
fn save_without_mod_directory_fails() {
    let fixture = RomFsFixture::new().build();
    let mut handler = CollectingErrorHandler::new();
    let romfs = fixture.load(&mut handler).unwrap();
    assert!(matches!(
        romfs.save_file("Stage/A.bgyml", b"x", false),
        Err(SaveError::NoModDirectory)
    ));
    assert!(matches!(
        RomFsFixture::new().with_mod().build().load(&mut handler).unwrap().save_file(
            "../escape.bin",
            b"x",
            false
        ),
        Err(SaveError::UnsafePath(_))
    ));
}
