mod common;

use std::rc::Rc;

use byml_serialization::{ContentErrorFlags, PropertyPath};
use byml_value::{DocumentCodec, JsonDocumentCodec, Value};
use common::RomFsFixture;
use romfs::gyml::types::{AreaParam, StageCategory, StageParam, WorldList};
use romfs::{default_ref_for, CollectingErrorHandler, ErrorReport, GymlManager, GymlRef};

fn stage_ref(name: &str) -> GymlRef<StageParam> {
    GymlRef::parse(&format!(
        "Work/Stage/StageParam/{}.game__stage__StageParam.gyml",
        name
    ))
    .unwrap()
}

fn stage_file(name: &str) -> String {
    format!("Stage/StageParam/{}.game__stage__StageParam.bgyml", name)
}

fn write_stage(fixture: &RomFsFixture, name: &str, document: Value) {
    fixture.write_base_document(&stage_file(name), &document, false);
}

fn components(entries: Vec<(&str, Value)>) -> Value {
    Value::map(entries)
}

#[test]
fn properties_are_inherited_from_parent() {
    let fixture = RomFsFixture::new().build();
    write_stage(
        &fixture,
        "Base",
        Value::map([
            ("Category", Value::from("Course")),
            (
                "Components",
                components(vec![
                    ("Mumap", Value::from("Work/MapUnit/Map/Base.mumap")),
                    (
                        "AreaParam",
                        Value::from("Work/Stage/AreaParam/Base.game__stage__AreaParam.gyml"),
                    ),
                ]),
            ),
        ]),
    );
    write_stage(
        &fixture,
        "Child",
        Value::map([
            ("$parent", Value::from(stage_ref("Base").as_str())),
            (
                "Components",
                components(vec![("Mumap", Value::from("Work/MapUnit/Map/Child.mumap"))]),
            ),
        ]),
    );
    let mut handler = CollectingErrorHandler::new();
    let romfs = fixture.load(&mut handler).unwrap();
    let mut manager = GymlManager::new();

    let child = manager
        .load_gyml(&romfs, &stage_ref("Child"), &mut handler, None)
        .unwrap();
    assert!(handler.is_empty(), "{:?}", handler.reports);
    assert_eq!(child.depth(), 2);
    assert_eq!(child.get(|stage| &stage.category), Some(&StageCategory::Course));
    assert!(child.data().category.get().is_none());

    let mumap = child
        .get_nested(|stage| &stage.components, |components| &components.mumap)
        .cloned()
        .flatten()
        .unwrap();
    assert_eq!(mumap.as_str(), "Work/MapUnit/Map/Child.mumap");
    let area = child
        .get_nested(|stage| &stage.components, |components| &components.area_param)
        .cloned()
        .flatten()
        .unwrap();
    assert_eq!(area.stem(), "Base.game__stage__AreaParam");
    assert_eq!(manager.len(), 2);
    assert!(manager.is_loaded(stage_ref("Base").as_str()));
}

#[test]
fn resolved_files_are_shared_from_cache() {
    let fixture = RomFsFixture::new().build();
    write_stage(
        &fixture,
        "Base",
        Value::map([("Category", Value::from("Area"))]),
    );
    write_stage(
        &fixture,
        "Left",
        Value::map([("$parent", Value::from(stage_ref("Base").as_str()))]),
    );
    write_stage(
        &fixture,
        "Right",
        Value::map([("$parent", Value::from(stage_ref("Base").as_str()))]),
    );
    let mut handler = CollectingErrorHandler::new();
    let romfs = fixture.load(&mut handler).unwrap();
    let mut manager = GymlManager::new();

    let left = manager
        .load_gyml(&romfs, &stage_ref("Left"), &mut handler, None)
        .unwrap();
    let right = manager
        .load_gyml(&romfs, &stage_ref("Right"), &mut handler, None)
        .unwrap();
    assert!(Rc::ptr_eq(left.parent().unwrap(), right.parent().unwrap()));
    let again = manager
        .load_gyml(&romfs, &stage_ref("Left"), &mut handler, None)
        .unwrap();
    assert!(Rc::ptr_eq(&left, &again));
    assert_eq!(right.get(|stage| &stage.category), Some(&StageCategory::Area));
}

#[test]
fn cyclic_inheritance_names_the_chain() {
    let fixture = RomFsFixture::new().build();
    write_stage(
        &fixture,
        "A",
        Value::map([
            ("$parent", Value::from(stage_ref("B").as_str())),
            ("Category", Value::from("Course")),
        ]),
    );
    write_stage(
        &fixture,
        "B",
        Value::map([("$parent", Value::from(stage_ref("A").as_str()))]),
    );
    let mut handler = CollectingErrorHandler::new();
    let romfs = fixture.load(&mut handler).unwrap();
    let mut manager = GymlManager::new();

    assert!(manager
        .load_gyml(&romfs, &stage_ref("A"), &mut handler, None)
        .is_err());
    match handler.reports.as_slice() {
        [ErrorReport::CyclicInheritance { chain, cycle_index }] => {
            let paths: Vec<&str> = chain.iter().map(|(path, _)| path.as_str()).collect();
            assert_eq!(paths, vec![stage_ref("A").as_str(), stage_ref("B").as_str()]);
            assert_eq!(*cycle_index, 0);
        }
        other => panic!("unexpected reports: {:?}", other),
    }
    assert!(manager.is_empty());
}

#[test]
fn loading_a_cached_path_as_another_type_fails() {
    let fixture = RomFsFixture::new().build();
    write_stage(
        &fixture,
        "A",
        Value::map([("Category", Value::from("Course"))]),
    );
    let mut handler = CollectingErrorHandler::new();
    let romfs = fixture.load(&mut handler).unwrap();
    let mut manager = GymlManager::new();
    manager
        .load_gyml(&romfs, &stage_ref("A"), &mut handler, None)
        .unwrap();

    let as_area: GymlRef<AreaParam> = GymlRef::parse(stage_ref("A").as_str()).unwrap();
    assert!(manager
        .load_gyml(&romfs, &as_area, &mut handler, None)
        .is_err());
    assert!(matches!(
        handler.reports.as_slice(),
        [ErrorReport::GymlTypeMismatch {
            expected: "AreaParam",
            already_loaded: "StageParam",
            ..
        }]
    ));
}

#[test]
fn invalid_parent_path_is_a_content_error() {
    let fixture = RomFsFixture::new().build();
    write_stage(
        &fixture,
        "A",
        Value::map([
            ("$parent", Value::from("Stage/StageParam/B.bgyml")),
            ("Category", Value::from("Course")),
        ]),
    );
    let mut handler = CollectingErrorHandler::new();
    let romfs = fixture.load(&mut handler).unwrap();
    let mut manager = GymlManager::new();
    assert!(manager
        .load_gyml(&romfs, &stage_ref("A"), &mut handler, None)
        .is_err());
    match handler.reports.as_slice() {
        [ErrorReport::ContentErrors { errors, .. }] => {
            let entry = errors.get(&PropertyPath::root().key("$parent")).unwrap();
            assert!(entry.flags.contains(ContentErrorFlags::INVALID_REF_PATH));
        }
        other => panic!("unexpected reports: {:?}", other),
    }
}

#[test]
fn missing_category_on_chain_root_is_reported() {
    let fixture = RomFsFixture::new().build();
    write_stage(&fixture, "A", Value::map(Vec::<(&str, Value)>::new()));
    let mut handler = CollectingErrorHandler::new();
    let romfs = fixture.load(&mut handler).unwrap();
    let mut manager = GymlManager::new();
    assert!(manager
        .load_gyml(&romfs, &stage_ref("A"), &mut handler, None)
        .is_err());
    match handler.reports.as_slice() {
        [ErrorReport::ContentErrors { errors, .. }] => {
            let entry = errors.get(&PropertyPath::root()).unwrap();
            assert!(entry.flags.contains(ContentErrorFlags::MISSING_KEYS));
            assert_eq!(entry.missing_keys, vec!["Category"]);
        }
        other => panic!("unexpected reports: {:?}", other),
    }
}

#[test]
fn saving_keeps_keys_the_record_does_not_know() {
    let fixture = RomFsFixture::new().with_mod().build();
    write_stage(
        &fixture,
        "A",
        Value::map([
            ("Category", Value::from("Course")),
            ("UnknownSetting", Value::I32(5)),
        ]),
    );
    let mut handler = CollectingErrorHandler::new();
    let romfs = fixture.load(&mut handler).unwrap();
    let mut manager = GymlManager::new();
    let loaded = manager
        .load_gyml(&romfs, &stage_ref("A"), &mut handler, None)
        .unwrap();

    let mut edited = loaded.data().clone();
    edited.category.set(StageCategory::WorldMap);
    let saved = manager
        .save_gyml(&romfs, &stage_ref("A"), &mut edited)
        .unwrap();
    assert!(saved.starts_with(romfs.mod_dir().unwrap()));
    assert!(manager.is_empty());

    let written = JsonDocumentCodec
        .parse(&std::fs::read(&saved).unwrap())
        .unwrap();
    assert_eq!(written.get("Category"), Some(&Value::from("WorldMap")));
    assert_eq!(written.get("UnknownSetting"), Some(&Value::I32(5)));

    let reloaded = manager
        .load_gyml(&romfs, &stage_ref("A"), &mut handler, None)
        .unwrap();
    assert_eq!(
        reloaded.get(|stage| &stage.category),
        Some(&StageCategory::WorldMap)
    );
}

#[test]
fn world_list_keeps_empty_slots() {
    let fixture = RomFsFixture::new().build();
    let list: GymlRef<WorldList> = default_ref_for::<WorldList>("Main").unwrap();
    assert_eq!(
        list.as_str(),
        "Work/Stage/WorldList/Main.game__stage__WorldList.gyml"
    );
    fixture.write_base_document(
        &list.romfs_path(),
        &Value::map([(
            "WorldMapStagePath",
            Value::array([
                Value::from(stage_ref("World1").as_str()),
                Value::from(""),
                Value::from(stage_ref("World3").as_str()),
            ]),
        )]),
        false,
    );
    let mut handler = CollectingErrorHandler::new();
    let romfs = fixture.load(&mut handler).unwrap();
    let mut manager = GymlManager::new();
    let loaded = manager.load_gyml(&romfs, &list, &mut handler, None).unwrap();
    let slots = loaded.get(|list| &list.world_map_stage_path).unwrap();
    assert_eq!(slots.len(), 3);
    assert_eq!(slots[0].as_ref(), Some(&stage_ref("World1")));
    assert!(slots[1].is_none());
    assert_eq!(slots[2].as_ref().map(|r| r.stem()), Some("World3.game__stage__StageParam"));
}

#[test]
fn ancestor_loaded_through_child_is_still_checked_on_its_own() {
    let fixture = RomFsFixture::new().build();
    write_stage(&fixture, "Root", Value::map(Vec::<(&str, Value)>::new()));
    write_stage(
        &fixture,
        "Child",
        Value::map([
            ("$parent", Value::from(stage_ref("Root").as_str())),
            ("Category", Value::from("Course")),
        ]),
    );
    let mut handler = CollectingErrorHandler::new();
    let romfs = fixture.load(&mut handler).unwrap();
    let mut manager = GymlManager::new();

    let child = manager
        .load_gyml(&romfs, &stage_ref("Child"), &mut handler, None)
        .unwrap();
    assert_eq!(child.get(|stage| &stage.category), Some(&StageCategory::Course));
    assert!(handler.is_empty());

    for _ in 0..2 {
        assert!(manager
            .load_gyml(&romfs, &stage_ref("Root"), &mut handler, None)
            .is_err());
        match handler.take().as_slice() {
            [ErrorReport::ContentErrors { errors, .. }] => {
                let entry = errors.get(&PropertyPath::root()).unwrap();
                assert_eq!(entry.missing_keys, vec!["Category"]);
            }
            other => panic!("unexpected reports: {:?}", other),
        }
    }

    // The child is unaffected by its ancestor failing a direct request.
    assert!(manager
        .load_gyml(&romfs, &stage_ref("Child"), &mut handler, None)
        .is_ok());
    assert!(handler.is_empty());
}
