//! Record schema of stage fragment files (`.bcett.byml.zs`) and the report
//! produced when a fragment's hashes do not line up.

use std::fmt;

use byml_serialization::{
    byml_enum, ArrayOf, BymlObject, Enum, Float3, Object, PropertyDict, PropertyPathSet,
    SerializationContext, BOOL, FLOAT3, I32, PROPERTY_DICT, STRING, U32, U64,
};

use crate::document::read_document;
use crate::file_ref::{GymlKind, GymlRef, MuMapRef, Ref};
use crate::format::BCETT_FORMAT;
use crate::gyml::types::StageParam;
use crate::handler::{DocumentLoadingErrorHandler, LoadFailed};
use crate::romfs::{LoadedFile, PackInfo, RomFs};

pub const DEFAULT_SAVE_DIRECTORY: &str = "BancMapUnit";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StageBcett {
    pub actors: Vec<StageActorData>,
    pub rails: Option<Vec<StageRailData>>,
    pub bg_units: Option<Vec<BgUnitData>>,
    pub links: Option<Vec<LinkData>>,
    pub actor_to_rail_links: Option<Vec<ActorToRailLinkData>>,
    pub simultaneous_groups: Option<Vec<SimultaneousGroupData>>,
    pub ref_stages: Option<Vec<GymlRef<StageParam>>>,
    pub root_area_hash: u32,
    pub stage_param: Option<GymlRef<StageParam>>,
}

impl BymlObject for StageBcett {
    fn serialization<C: SerializationContext>(&mut self, ctx: &mut C) {
        ctx.set_array(Object::<StageActorData>::new(), &mut self.actors, "Actors", false);
        ctx.set_option(ArrayOf(Object::<StageRailData>::new()), &mut self.rails, "Rails", true);
        ctx.set_option(ArrayOf(Object::<BgUnitData>::new()), &mut self.bg_units, "BgUnits", true);
        ctx.set_option(ArrayOf(Object::<LinkData>::new()), &mut self.links, "Links", true);
        ctx.set_option(
            ArrayOf(Object::<ActorToRailLinkData>::new()),
            &mut self.actor_to_rail_links,
            "ActorToRailLinks",
            true,
        );
        ctx.set_option(
            ArrayOf(Object::<SimultaneousGroupData>::new()),
            &mut self.simultaneous_groups,
            "SimultaneousGroups",
            true,
        );
        ctx.set_option(
            ArrayOf(Ref::<GymlKind<StageParam>>::new()),
            &mut self.ref_stages,
            "RefStages",
            true,
        );
        ctx.set(U32, &mut self.root_area_hash, "RootAreaHash");
        ctx.set_option(
            Ref::<GymlKind<StageParam>>::new(),
            &mut self.stage_param,
            "StageParam",
            false,
        );
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StageActorData {
    pub area_hash: u32,
    pub hash: u64,
    pub gyaml: String,
    pub name: String,
    pub layer: String,
    pub dynamic: PropertyDict,
    pub rotate: Float3,
    pub scale: Float3,
    pub translate: Float3,
}

impl BymlObject for StageActorData {
    fn serialization<C: SerializationContext>(&mut self, ctx: &mut C) {
        ctx.set(U32, &mut self.area_hash, "AreaHash");
        ctx.set(U64, &mut self.hash, "Hash");
        ctx.set(STRING, &mut self.gyaml, "Gyaml");
        ctx.set(STRING, &mut self.name, "Name");
        ctx.set(STRING, &mut self.layer, "Layer");
        ctx.set_optional(PROPERTY_DICT, &mut self.dynamic, "Dynamic");
        ctx.set(FLOAT3, &mut self.rotate, "Rotate");
        ctx.set(FLOAT3, &mut self.scale, "Scale");
        ctx.set(FLOAT3, &mut self.translate, "Translate");
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StageRailData {
    pub points: Vec<RailPointData>,
    pub area_hash: u32,
    pub hash: u64,
    pub gyaml: String,
    pub is_closed: bool,
    pub dynamic: PropertyDict,
}

impl BymlObject for StageRailData {
    fn serialization<C: SerializationContext>(&mut self, ctx: &mut C) {
        ctx.set_array(Object::<RailPointData>::new(), &mut self.points, "Points", false);
        ctx.set(U32, &mut self.area_hash, "AreaHash");
        ctx.set(U64, &mut self.hash, "Hash");
        ctx.set(STRING, &mut self.gyaml, "Gyaml");
        ctx.set(BOOL, &mut self.is_closed, "IsClosed");
        ctx.set_optional(PROPERTY_DICT, &mut self.dynamic, "Dynamic");
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RailPointData {
    pub hash: Option<u64>,
    pub dynamic: PropertyDict,
    pub translate: Float3,
    pub control1: Option<Float3>,
}

impl BymlObject for RailPointData {
    fn serialization<C: SerializationContext>(&mut self, ctx: &mut C) {
        ctx.set_option(U64, &mut self.hash, "Hash", true);
        ctx.set_optional(PROPERTY_DICT, &mut self.dynamic, "Dynamic");
        ctx.set(FLOAT3, &mut self.translate, "Translate");
        ctx.set_option(FLOAT3, &mut self.control1, "Control1", true);
    }
}

byml_enum! {
    #[derive(Default)]
    pub enum BgUnitModelType {
        #[default]
        Solid = 0,
        SemiSolid = 1,
        NoCollision = 2,
        Bridge = 3,
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BgUnitData {
    pub model_type: BgUnitModelType,
    pub skin_division: i32,
    pub walls: Option<Vec<BgUnitWall>>,
    pub belt_rails: Option<Vec<BgUnitRail>>,
}

impl BymlObject for BgUnitData {
    fn serialization<C: SerializationContext>(&mut self, ctx: &mut C) {
        ctx.set(Enum::<BgUnitModelType>::new(), &mut self.model_type, "ModelType");
        ctx.set(I32, &mut self.skin_division, "SkinDivision");
        ctx.set_option(ArrayOf(Object::<BgUnitWall>::new()), &mut self.walls, "Walls", true);
        ctx.set_option(
            ArrayOf(Object::<BgUnitRail>::new()),
            &mut self.belt_rails,
            "BeltRails",
            true,
        );
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BgUnitWall {
    pub external_rail: BgUnitRail,
    pub internal_rails: Option<Vec<BgUnitRail>>,
}

impl BymlObject for BgUnitWall {
    fn serialization<C: SerializationContext>(&mut self, ctx: &mut C) {
        ctx.set_object(&mut self.external_rail, "ExternalRail");
        ctx.set_option(
            ArrayOf(Object::<BgUnitRail>::new()),
            &mut self.internal_rails,
            "InternalRails",
            true,
        );
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BgUnitRail {
    pub points: Vec<RailPointData>,
    pub is_closed: bool,
}

impl BymlObject for BgUnitRail {
    fn serialization<C: SerializationContext>(&mut self, ctx: &mut C) {
        ctx.set_array(Object::<RailPointData>::new(), &mut self.points, "Points", false);
        ctx.set(BOOL, &mut self.is_closed, "IsClosed");
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkData {
    pub destination: u64,
    pub source: u64,
    pub name: String,
}

impl BymlObject for LinkData {
    fn serialization<C: SerializationContext>(&mut self, ctx: &mut C) {
        ctx.set(U64, &mut self.destination, "Dst");
        ctx.set(U64, &mut self.source, "Src");
        ctx.set(STRING, &mut self.name, "Name");
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActorToRailLinkData {
    pub destination: u64,
    pub source: u64,
    pub point: u64,
    pub name: String,
}

impl BymlObject for ActorToRailLinkData {
    fn serialization<C: SerializationContext>(&mut self, ctx: &mut C) {
        ctx.set(U64, &mut self.destination, "Dst");
        ctx.set(U64, &mut self.source, "Src");
        ctx.set(STRING, &mut self.name, "Name");
        ctx.set(U64, &mut self.point, "Point");
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SimultaneousGroupData {
    pub hash: u64,
    pub actors: Vec<u64>,
}

impl BymlObject for SimultaneousGroupData {
    fn serialization<C: SerializationContext>(&mut self, ctx: &mut C) {
        ctx.set(U64, &mut self.hash, "Hash");
        ctx.set_array(U64, &mut self.actors, "Actors", false);
    }
}

/// Loads and deserializes the fragment a mumap ref points at.
pub fn load_stage_bcett<H>(
    romfs: &RomFs,
    mumap: &MuMapRef,
    handler: &mut H,
    pack: Option<&PackInfo>,
) -> Result<LoadedFile<StageBcett>, LoadFailed>
where
    H: DocumentLoadingErrorHandler + ?Sized,
{
    let loaded = romfs.load_file(&mumap.romfs_path(), &BCETT_FORMAT, handler, pack)?;
    let value = read_document::<StageBcett, _>(
        &loaded.value,
        &PropertyPathSet::new(),
        handler,
        &loaded.location,
    )?;
    Ok(LoadedFile {
        value,
        location: loaded.location,
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Actor,
    Rail,
    RailPoint,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::Actor => "actor",
            EntityKind::Rail => "rail",
            EntityKind::RailPoint => "rail point",
        };
        write!(f, "{}", label)
    }
}

/// Which hash field of which record kind failed to resolve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    LinkSource,
    LinkDestination,
    RailLinkSource,
    RailLinkDestination,
    RailLinkPoint,
    GroupMember,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReferenceKind::LinkSource => "link source actor",
            ReferenceKind::LinkDestination => "link destination actor",
            ReferenceKind::RailLinkSource => "rail link source actor",
            ReferenceKind::RailLinkDestination => "rail link destination rail",
            ReferenceKind::RailLinkPoint => "rail link destination point",
            ReferenceKind::GroupMember => "simultaneous group member",
        };
        write!(f, "{}", label)
    }
}

/// Position of a record in the raw lists of one fragment.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordIndex {
    pub fragment: String,
    pub index: usize,
    /// Position inside the record at `index`: a rail's point or a group's
    /// member.
    pub element: Option<usize>,
}

impl fmt::Display for RecordIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.fragment, self.index)?;
        if let Some(element) = self.element {
            write!(f, "/{}", element)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupAssignment {
    pub fragment: String,
    pub group_index: usize,
    pub member_index: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StageIssue {
    DuplicateHash {
        kind: EntityKind,
        hash: u64,
        occurrences: Vec<RecordIndex>,
    },
    DanglingHashReference {
        kind: ReferenceKind,
        at: RecordIndex,
        missing_hash: u64,
    },
    DuplicateGroupAssignment {
        actor_hash: u64,
        assignments: Vec<GroupAssignment>,
    },
}

impl fmt::Display for StageIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageIssue::DuplicateHash {
                kind,
                hash,
                occurrences,
            } => {
                write!(f, "duplicate {} hash {:#x} at", kind, hash)?;
                for occurrence in occurrences {
                    write!(f, " {}", occurrence)?;
                }
                Ok(())
            }
            StageIssue::DanglingHashReference {
                kind,
                at,
                missing_hash,
            } => write!(f, "{} {:#x} referenced by {} does not exist", kind, missing_hash, at),
            StageIssue::DuplicateGroupAssignment {
                actor_hash,
                assignments,
            } => {
                write!(f, "actor {:#x} is in several simultaneous groups:", actor_hash)?;
                for assignment in assignments {
                    write!(
                        f,
                        " {}#{}/{}",
                        assignment.fragment, assignment.group_index, assignment.member_index
                    )?;
                }
                Ok(())
            }
        }
    }
}

/// Every integrity problem found in one stage load, fragment by fragment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StageValidationReport {
    /// The fragment the load was started for.
    pub fragment: String,
    pub issues: Vec<StageIssue>,
}

impl StageValidationReport {
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

impl fmt::Display for StageValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage {} failed validation ({} issue(s))", self.fragment, self.issues.len())?;
        for issue in &self.issues {
            write!(f, "\n  {}", issue)?;
        }
        Ok(())
    }
}
