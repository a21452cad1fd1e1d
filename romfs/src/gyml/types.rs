//! The gyml record types the loader knows about.

use std::fmt;

use byml_serialization::{
    byml_enum, ArrayOf, BymlEnum, BymlObject, EnumName, Inherited, Object, OptionOf, PropertyDict,
    SerializationContext, BOOL, FLOAT, PROPERTY_DICT, STRING,
};

use crate::file_ref::{GymlKind, GymlRef, MuMapKind, MuMapRef, Ref, RefOrEmpty};
use crate::gyml::GymlType;

macro_rules! gyml_type {
    ($ty:ident, $suffix:literal, $directory:expr) => {
        impl GymlType for $ty {
            const NAME: &'static str = stringify!($ty);
            const TYPE_SUFFIX: &'static str = $suffix;
            const DEFAULT_SAVE_PATH: &'static [&'static str] = &["Stage", $directory];
        }
    };
}

/// Declares gyml types whose contents are not interpreted yet; their
/// documents are still resolved and their keys survive a save.
macro_rules! opaque_gyml_types {
    ($($ty:ident => $suffix:literal),+ $(,)?) => {
        $(
            #[derive(Clone, Debug, Default, PartialEq)]
            pub struct $ty;

            impl BymlObject for $ty {
                fn serialization<C: SerializationContext>(&mut self, _ctx: &mut C) {}
            }

            gyml_type!($ty, $suffix, stringify!($ty));
        )+
    };
}

byml_enum! {
    #[derive(Default)]
    pub enum StageCategory {
        #[default]
        Invalid = 0,
        Course = 1,
        Course1Area = 2,
        Area = 3,
        Base = 4,
        Demo = 5,
        Title = 6,
        WorldMap = 7,
    }
}

impl fmt::Display for StageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StageParam {
    pub category: Inherited<StageCategory>,
    pub components: Inherited<StageComponents>,
}

impl BymlObject for StageParam {
    fn serialization<C: SerializationContext>(&mut self, ctx: &mut C) {
        ctx.set_inherited(EnumName::<StageCategory>::new(), &mut self.category, "Category", false);
        ctx.set_inherited(
            Object::<StageComponents>::new(),
            &mut self.components,
            "Components",
            true,
        );
    }
}

gyml_type!(StageParam, "game__stage__StageParam", "StageParam");

type InheritedRef<T> = Inherited<Option<GymlRef<T>>>;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StageComponents {
    pub mumap: Inherited<Option<MuMapRef>>,
    pub area_param: InheritedRef<AreaParam>,
    pub bake_source: InheritedRef<BakeSource>,
    pub course_info: InheritedRef<CourseInfo>,
    pub demo_stage_info: InheritedRef<DemoStageInfo>,
    pub map_analysis_info: InheritedRef<MapAnalysisInfo>,
    pub stage_load_info: InheritedRef<StageLoadInfo>,
    pub stage_sequence_info: InheritedRef<StageSequenceInfo>,
    pub world_map_analysis_info: InheritedRef<WorldMapAnalysisInfo>,
    pub world_map_info: InheritedRef<WorldMapInfo>,
}

impl BymlObject for StageComponents {
    fn serialization<C: SerializationContext>(&mut self, ctx: &mut C) {
        ctx.set_inherited(OptionOf(Ref::<MuMapKind>::new()), &mut self.mumap, "Mumap", true);
        ctx.set_inherited(
            OptionOf(Ref::<GymlKind<AreaParam>>::new()),
            &mut self.area_param,
            "AreaParam",
            true,
        );
        ctx.set_inherited(
            OptionOf(Ref::<GymlKind<BakeSource>>::new()),
            &mut self.bake_source,
            "BakeSource",
            true,
        );
        ctx.set_inherited(
            OptionOf(Ref::<GymlKind<CourseInfo>>::new()),
            &mut self.course_info,
            "CourseInfo",
            true,
        );
        ctx.set_inherited(
            OptionOf(Ref::<GymlKind<DemoStageInfo>>::new()),
            &mut self.demo_stage_info,
            "DemoStageInfo",
            true,
        );
        ctx.set_inherited(
            OptionOf(Ref::<GymlKind<MapAnalysisInfo>>::new()),
            &mut self.map_analysis_info,
            "MapAnalysisInfo",
            true,
        );
        ctx.set_inherited(
            OptionOf(Ref::<GymlKind<StageLoadInfo>>::new()),
            &mut self.stage_load_info,
            "StageLoadInfo",
            true,
        );
        ctx.set_inherited(
            OptionOf(Ref::<GymlKind<StageSequenceInfo>>::new()),
            &mut self.stage_sequence_info,
            "StageSequenceInfo",
            true,
        );
        ctx.set_inherited(
            OptionOf(Ref::<GymlKind<WorldMapAnalysisInfo>>::new()),
            &mut self.world_map_analysis_info,
            "WorldMapAnalysisInfo",
            true,
        );
        ctx.set_inherited(
            OptionOf(Ref::<GymlKind<WorldMapInfo>>::new()),
            &mut self.world_map_info,
            "WorldMapInfo",
            true,
        );
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AreaParam {
    pub bgm_type: Inherited<String>,
    pub wonder_bgm_type: Inherited<String>,
    pub env_set_name: Inherited<String>,
    pub environment_sound: Inherited<String>,
    pub environment_sound_efx: Inherited<String>,
    pub is_not_call_water_env_se: Inherited<bool>,
    pub wonder_bgm_start_offset: Inherited<f32>,
    pub skin_param: Inherited<PropertyDict>,
}

impl BymlObject for AreaParam {
    fn serialization<C: SerializationContext>(&mut self, ctx: &mut C) {
        ctx.set_inherited(STRING, &mut self.bgm_type, "BgmType", true);
        ctx.set_inherited(STRING, &mut self.wonder_bgm_type, "WonderBgmType", true);
        ctx.set_inherited(STRING, &mut self.env_set_name, "EnvSetName", true);
        ctx.set_inherited(STRING, &mut self.environment_sound, "EnvironmentSound", true);
        ctx.set_inherited(
            STRING,
            &mut self.environment_sound_efx,
            "EnvironmentSoundEfx",
            true,
        );
        ctx.set_inherited(
            BOOL,
            &mut self.is_not_call_water_env_se,
            "IsNotCallWaterEnvSE",
            true,
        );
        ctx.set_inherited(
            FLOAT,
            &mut self.wonder_bgm_start_offset,
            "WonderBgmStartOffset",
            true,
        );
        ctx.set_inherited(PROPERTY_DICT, &mut self.skin_param, "SkinParam", true);
    }
}

gyml_type!(AreaParam, "game__stage__AreaParam", "AreaParam");

#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorldMapInfo {
    pub course_table: Inherited<Vec<CourseTableEntry>>,
}

impl BymlObject for WorldMapInfo {
    fn serialization<C: SerializationContext>(&mut self, ctx: &mut C) {
        ctx.set_inherited(
            ArrayOf(Object::<CourseTableEntry>::new()),
            &mut self.course_table,
            "CourseTable",
            false,
        );
    }
}

gyml_type!(WorldMapInfo, "game__stage__WorldMapInfo", "WorldMapInfo");

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CourseTableEntry {
    pub key: String,
    pub stage_path: Option<GymlRef<StageParam>>,
}

impl BymlObject for CourseTableEntry {
    fn serialization<C: SerializationContext>(&mut self, ctx: &mut C) {
        ctx.set(STRING, &mut self.key, "Key");
        ctx.set_option(
            Ref::<GymlKind<StageParam>>::new(),
            &mut self.stage_path,
            "StagePath",
            false,
        );
    }
}

/// Top-level list of world maps. Slots may be empty strings in shipped data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorldList {
    pub world_map_stage_path: Inherited<Vec<Option<GymlRef<StageParam>>>>,
}

impl BymlObject for WorldList {
    fn serialization<C: SerializationContext>(&mut self, ctx: &mut C) {
        ctx.set_inherited(
            ArrayOf(RefOrEmpty::<GymlKind<StageParam>>::new()),
            &mut self.world_map_stage_path,
            "WorldMapStagePath",
            false,
        );
    }
}

gyml_type!(WorldList, "game__stage__WorldList", "WorldList");

opaque_gyml_types! {
    BakeSource => "game__stage__BakeSource",
    CourseInfo => "game__stage__CourseInfo",
    DemoStageInfo => "game__stage__DemoStageInfo",
    MapAnalysisInfo => "game__stage__MapAnalysisInfo",
    StageLoadInfo => "game__stage__StageLoadInfo",
    StageSequenceInfo => "game__stage__StageSequenceInfo",
    WorldMapAnalysisInfo => "game__stage__WorldMapAnalysisInfo",
}
