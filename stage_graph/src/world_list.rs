use std::rc::Rc;

use romfs::gyml::types;
use romfs::{AssetFile, GymlRef, LoadFailed, StageLoadingErrorHandler};
use tracing::debug;

use crate::stage::{StageLoader, WorldMap};

/// Every world map of a world list, in slot order. Empty slots stay `None`.
pub struct WorldList {
    gyml: GymlRef<types::WorldList>,
    list: Rc<AssetFile<types::WorldList>>,
    worlds: Vec<Option<WorldMap>>,
}

impl WorldList {
    pub fn gyml_ref(&self) -> &GymlRef<types::WorldList> {
        &self.gyml
    }

    pub fn list(&self) -> &Rc<AssetFile<types::WorldList>> {
        &self.list
    }

    pub fn worlds(&self) -> &[Option<WorldMap>] {
        &self.worlds
    }
}

impl<'a, H: StageLoadingErrorHandler + ?Sized> StageLoader<'a, H> {
    pub fn load_world_list(
        &mut self,
        gyml: &GymlRef<types::WorldList>,
    ) -> Result<WorldList, LoadFailed> {
        let list = self
            .gymls
            .load_gyml(self.romfs, gyml, &mut *self.handler, None)?;
        let slots = list
            .get(|list| &list.world_map_stage_path)
            .cloned()
            .unwrap_or_default();

        let mut worlds = Vec::with_capacity(slots.len());
        for (index, slot) in slots.iter().enumerate() {
            match slot {
                Some(stage) => worlds.push(Some(self.load_world_map(stage)?)),
                None => {
                    debug!(list = %gyml, slot = index, "empty world slot");
                    worlds.push(None);
                }
            }
        }
        Ok(WorldList {
            gyml: gyml.clone(),
            list,
            worlds,
        })
    }
}
