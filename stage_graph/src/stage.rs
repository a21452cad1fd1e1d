//! Stages: a StageParam gyml plus the graph of its fragment and every stage
//! that fragment references.

use std::rc::Rc;

use romfs::gyml::types::{CourseTableEntry, StageCategory, StageParam, WorldMapInfo};
use romfs::{
    AssetFile, GymlManager, GymlRef, LoadFailed, MuMapRef, RomFs, StageLoadingErrorHandler,
};
use tracing::info;

use crate::graph::{StageGraph, StageLoadContext};
use crate::mumap::MuMap;

/// What every loaded stage has: its resolved StageParam and its fragment.
pub struct StageBase {
    gyml: GymlRef<StageParam>,
    stage_param: Rc<AssetFile<StageParam>>,
    mumap: MuMap,
}

impl StageBase {
    pub fn gyml_ref(&self) -> &GymlRef<StageParam> {
        &self.gyml
    }

    pub fn stage_param(&self) -> &Rc<AssetFile<StageParam>> {
        &self.stage_param
    }

    pub fn mumap(&self) -> &MuMap {
        &self.mumap
    }

    pub fn category(&self) -> StageCategory {
        category_of(&self.stage_param)
    }
}

/// A stage merged into a course through a fragment's ref stages.
pub struct Area {
    base: StageBase,
}

impl Area {
    pub(crate) fn new(base: StageBase) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &StageBase {
        &self.base
    }
}

pub struct Course {
    base: StageBase,
    single_area: bool,
    areas: Vec<Area>,
    graph: StageGraph,
}

impl Course {
    pub fn base(&self) -> &StageBase {
        &self.base
    }

    pub fn is_single_area(&self) -> bool {
        self.single_area
    }

    /// Referenced stages in merge order, nested references included.
    pub fn areas(&self) -> &[Area] {
        &self.areas
    }

    pub fn graph(&self) -> &StageGraph {
        &self.graph
    }
}

pub struct WorldMap {
    base: StageBase,
    info: Rc<AssetFile<WorldMapInfo>>,
    graph: StageGraph,
}

impl WorldMap {
    pub fn base(&self) -> &StageBase {
        &self.base
    }

    pub fn info(&self) -> &Rc<AssetFile<WorldMapInfo>> {
        &self.info
    }

    pub fn graph(&self) -> &StageGraph {
        &self.graph
    }

    pub fn course_table(&self) -> &[CourseTableEntry] {
        self.info
            .get(|info| &info.course_table)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn course_keys(&self) -> Vec<&str> {
        self.course_table()
            .iter()
            .map(|entry| entry.key.as_str())
            .collect()
    }

    /// `Ok(None)` when `index` is past the end of the course table.
    pub fn load_course<H>(
        &self,
        loader: &mut StageLoader<'_, H>,
        index: usize,
    ) -> Result<Option<Course>, LoadFailed>
    where
        H: StageLoadingErrorHandler + ?Sized,
    {
        let Some(stage) = self
            .course_table()
            .get(index)
            .and_then(|entry| entry.stage_path.clone())
        else {
            return Ok(None);
        };
        loader.load_course(&stage).map(Some)
    }
}

pub enum Stage {
    Course(Course),
    WorldMap(WorldMap),
}

impl Stage {
    pub fn base(&self) -> &StageBase {
        match self {
            Stage::Course(course) => course.base(),
            Stage::WorldMap(world_map) => world_map.base(),
        }
    }

    pub fn graph(&self) -> &StageGraph {
        match self {
            Stage::Course(course) => course.graph(),
            Stage::WorldMap(world_map) => world_map.graph(),
        }
    }
}

/// Loads stages through one romfs, gyml cache and error handler.
pub struct StageLoader<'a, H: ?Sized> {
    pub(crate) romfs: &'a RomFs,
    pub(crate) gymls: &'a mut GymlManager,
    pub(crate) handler: &'a mut H,
}

impl<'a, H: StageLoadingErrorHandler + ?Sized> StageLoader<'a, H> {
    pub fn new(romfs: &'a RomFs, gymls: &'a mut GymlManager, handler: &'a mut H) -> Self {
        Self {
            romfs,
            gymls,
            handler,
        }
    }

    pub fn romfs(&self) -> &RomFs {
        self.romfs
    }

    pub fn handler(&mut self) -> &mut H {
        &mut *self.handler
    }

    /// Dispatches on the StageParam's category.
    pub fn load_stage(&mut self, stage: &GymlRef<StageParam>) -> Result<Stage, LoadFailed> {
        let stage_param = self.load_stage_param(stage)?;
        match category_of(&stage_param) {
            StageCategory::Course => Ok(Stage::Course(self.build_course(stage, false)?)),
            StageCategory::Course1Area => Ok(Stage::Course(self.build_course(stage, true)?)),
            StageCategory::WorldMap => {
                Ok(Stage::WorldMap(self.build_world_map(stage, &stage_param)?))
            }
            other => {
                self.handler
                    .on_unexpected_category(other, None, stage_param.location());
                Err(LoadFailed)
            }
        }
    }

    pub fn load_course(&mut self, stage: &GymlRef<StageParam>) -> Result<Course, LoadFailed> {
        let stage_param = self.load_stage_param(stage)?;
        let single_area = match category_of(&stage_param) {
            StageCategory::Course => false,
            StageCategory::Course1Area => true,
            other => {
                self.handler.on_unexpected_category(
                    other,
                    Some(StageCategory::Course),
                    stage_param.location(),
                );
                return Err(LoadFailed);
            }
        };
        self.build_course(stage, single_area)
    }

    pub fn load_world_map(&mut self, stage: &GymlRef<StageParam>) -> Result<WorldMap, LoadFailed> {
        let stage_param = self.load_stage_param(stage)?;
        let category = category_of(&stage_param);
        if category != StageCategory::WorldMap {
            self.handler.on_unexpected_category(
                category,
                Some(StageCategory::WorldMap),
                stage_param.location(),
            );
            return Err(LoadFailed);
        }
        self.build_world_map(stage, &stage_param)
    }

    fn build_course(
        &mut self,
        stage: &GymlRef<StageParam>,
        single_area: bool,
    ) -> Result<Course, LoadFailed> {
        let mut context = StageLoadContext::new(stage.as_str());
        context.enter_stage(stage.as_str());
        let mut areas = Vec::new();
        let base = self.merge_stage(stage, &mut context, &mut areas)?;
        let graph = self.finish(context)?;
        info!(
            stage = %stage,
            areas = areas.len(),
            actors = graph.actors().len(),
            rails = graph.rails().len(),
            "course loaded"
        );
        Ok(Course {
            base,
            single_area,
            areas,
            graph,
        })
    }

    fn build_world_map(
        &mut self,
        stage: &GymlRef<StageParam>,
        stage_param: &AssetFile<StageParam>,
    ) -> Result<WorldMap, LoadFailed> {
        let mut context = StageLoadContext::new(stage.as_str());
        context.enter_stage(stage.as_str());
        let mut areas = Vec::new();
        let base = self.merge_stage(stage, &mut context, &mut areas)?;
        let graph = self.finish(context)?;

        let info_ref = stage_param
            .get_nested(
                |stage| &stage.components,
                |components| &components.world_map_info,
            )
            .cloned()
            .flatten();
        let Some(info_ref) = info_ref else {
            self.handler
                .on_missing_required_component("WorldMapInfo", stage_param.location());
            return Err(LoadFailed);
        };
        let info = self
            .gymls
            .load_gyml(self.romfs, &info_ref, &mut *self.handler, None)?;
        info!(stage = %stage, actors = graph.actors().len(), "world map loaded");
        Ok(WorldMap { base, info, graph })
    }

    pub(crate) fn merge_stage(
        &mut self,
        stage: &GymlRef<StageParam>,
        context: &mut StageLoadContext,
        areas: &mut Vec<Area>,
    ) -> Result<StageBase, LoadFailed> {
        let stage_param = self.load_stage_param(stage)?;
        let mumap = self.required_mumap(&stage_param)?;
        let mumap = self.merge_fragment(&mumap, context, areas)?;
        Ok(StageBase {
            gyml: stage.clone(),
            stage_param,
            mumap,
        })
    }

    fn load_stage_param(
        &mut self,
        stage: &GymlRef<StageParam>,
    ) -> Result<Rc<AssetFile<StageParam>>, LoadFailed> {
        self.gymls
            .load_gyml(self.romfs, stage, &mut *self.handler, None)
    }

    fn required_mumap(&mut self, stage_param: &AssetFile<StageParam>) -> Result<MuMapRef, LoadFailed> {
        let mumap = stage_param
            .get_nested(|stage| &stage.components, |components| &components.mumap)
            .cloned()
            .flatten();
        mumap.ok_or_else(|| {
            self.handler
                .on_missing_required_component("Mumap", stage_param.location());
            LoadFailed
        })
    }
}

fn category_of(stage_param: &AssetFile<StageParam>) -> StageCategory {
    stage_param
        .get(|stage| &stage.category)
        .copied()
        .unwrap_or_default()
}
