use romfs::gyml::types::StageParam;
use romfs::stage_bcett::StageBcett;
use romfs::{
    load_stage_bcett, GymlRef, LoadFailed, LoadedFile, MuMapRef, StageLoadingErrorHandler,
};
use tracing::debug;

use crate::graph::{FragmentId, StageGraph, StageLoadContext};
use crate::stage::{Area, StageLoader};

/// A stage's own fragment within the graph it was merged into.
#[derive(Clone, Debug, PartialEq)]
pub struct MuMap {
    mumap: MuMapRef,
    fragment: FragmentId,
    ref_stages: Vec<GymlRef<StageParam>>,
}

impl MuMap {
    pub fn mumap_ref(&self) -> &MuMapRef {
        &self.mumap
    }

    pub fn fragment(&self) -> FragmentId {
        self.fragment
    }

    pub fn ref_stages(&self) -> &[GymlRef<StageParam>] {
        &self.ref_stages
    }
}

impl<'a, H: StageLoadingErrorHandler + ?Sized> StageLoader<'a, H> {
    /// Loads one fragment with everything it references and validates the
    /// result as a whole. The fragment's own StageParam counts as merged, so
    /// references back to it are skipped.
    pub fn load_mumap(&mut self, mumap: &MuMapRef) -> Result<(MuMap, StageGraph), LoadFailed> {
        let mut context = StageLoadContext::new(mumap.as_str());
        let loaded = load_stage_bcett(self.romfs, mumap, &mut *self.handler, None)?;
        if let Some(owner) = &loaded.value.stage_param {
            context.enter_stage(owner.as_str());
        }
        let mut areas = Vec::new();
        let root = self.merge_loaded(mumap, loaded, &mut context, &mut areas)?;
        let graph = self.finish(context)?;
        Ok((root, graph))
    }

    /// Referenced stages are merged before the fragment's own records, so
    /// their entities win lookups against later duplicates.
    pub(crate) fn merge_fragment(
        &mut self,
        mumap: &MuMapRef,
        context: &mut StageLoadContext,
        areas: &mut Vec<Area>,
    ) -> Result<MuMap, LoadFailed> {
        let loaded = load_stage_bcett(self.romfs, mumap, &mut *self.handler, None)?;
        self.merge_loaded(mumap, loaded, context, areas)
    }

    fn merge_loaded(
        &mut self,
        mumap: &MuMapRef,
        loaded: LoadedFile<StageBcett>,
        context: &mut StageLoadContext,
        areas: &mut Vec<Area>,
    ) -> Result<MuMap, LoadFailed> {
        let ref_stages = loaded.value.ref_stages.clone().unwrap_or_default();
        for sub_stage in &ref_stages {
            if !context.enter_stage(sub_stage.as_str()) {
                debug!(stage = %sub_stage, "stage already merged, skipping");
                continue;
            }
            let base = self.merge_stage(sub_stage, context, areas)?;
            areas.push(Area::new(base));
        }
        let fragment = context.insert_fragment(mumap.clone(), loaded.location, loaded.value);
        Ok(MuMap {
            mumap: mumap.clone(),
            fragment,
            ref_stages,
        })
    }

    pub(crate) fn finish(&mut self, context: StageLoadContext) -> Result<StageGraph, LoadFailed> {
        context.finish().map_err(|report| {
            self.handler.on_stage_validation_failed(&report);
            LoadFailed
        })
    }
}
