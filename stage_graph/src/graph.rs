//! Hash-keyed object graph built from one or more stage fragments.
//!
//! Entities live in arenas and are addressed by typed ids. Lookups by hash
//! go through tables filled in insertion order, so when two records share a
//! hash both stay stored and the first one inserted answers lookups.

use std::collections::{HashMap, HashSet};

use byml_serialization::{Float3, PropertyDict};
use romfs::gyml::types::StageParam;
use romfs::stage_bcett::{
    ActorToRailLinkData, BgUnitData, LinkData, SimultaneousGroupData, StageActorData,
    StageBcett, StageRailData,
};
use romfs::{GymlRef, MuMapRef, RetrievedFileLocation, StageValidationReport};
use tracing::debug;

use crate::validation::build_report;

macro_rules! arena_id {
    ($($name:ident),+ $(,)?) => {
        $(
            #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(usize);

            impl $name {
                pub fn index(self) -> usize {
                    self.0
                }
            }
        )+
    };
}

arena_id!(FragmentId, ActorId, RailId, PointId, GroupId);

#[derive(Clone, Debug, PartialEq)]
pub struct Actor {
    pub data: StageActorData,
    pub fragment: FragmentId,
}

impl Actor {
    pub fn hash(&self) -> u64 {
        self.data.hash
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Rail {
    pub hash: u64,
    pub area_hash: u32,
    pub gyaml: String,
    pub is_closed: bool,
    pub dynamic: PropertyDict,
    pub points: Vec<PointId>,
    pub fragment: FragmentId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RailPoint {
    pub rail: RailId,
    pub hash: Option<u64>,
    pub translate: Float3,
    pub control1: Option<Float3>,
    pub dynamic: PropertyDict,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    pub source: ActorId,
    pub destination: ActorId,
    pub name: String,
    pub fragment: FragmentId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RailLink {
    pub source: ActorId,
    pub rail: RailId,
    pub point: PointId,
    pub name: String,
    pub fragment: FragmentId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimultaneousGroup {
    pub hash: u64,
    pub members: Vec<ActorId>,
    pub fragment: FragmentId,
}

/// One merged fragment file. Cross-reference records are kept as read so a
/// failed validation can point at their positions.
#[derive(Clone, Debug, PartialEq)]
pub struct Fragment {
    pub mumap: MuMapRef,
    pub location: RetrievedFileLocation,
    pub actors: Vec<ActorId>,
    pub rails: Vec<RailId>,
    pub bg_units: Vec<BgUnitData>,
    pub links: Vec<LinkData>,
    pub rail_links: Vec<ActorToRailLinkData>,
    pub groups: Vec<SimultaneousGroupData>,
    pub ref_stages: Vec<GymlRef<StageParam>>,
    pub root_area_hash: u32,
    pub stage_param: Option<GymlRef<StageParam>>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StageGraph {
    fragments: Vec<Fragment>,
    actors: Vec<Actor>,
    rails: Vec<Rail>,
    points: Vec<RailPoint>,
    links: Vec<Link>,
    rail_links: Vec<RailLink>,
    groups: Vec<SimultaneousGroup>,
    actor_by_hash: HashMap<u64, ActorId>,
    rail_by_hash: HashMap<u64, RailId>,
    point_by_hash: HashMap<(u64, u64), PointId>,
    group_of_actor: HashMap<ActorId, GroupId>,
}

impl StageGraph {
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn fragment(&self, id: FragmentId) -> &Fragment {
        &self.fragments[id.0]
    }

    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    pub fn actor(&self, id: ActorId) -> &Actor {
        &self.actors[id.0]
    }

    pub fn rails(&self) -> &[Rail] {
        &self.rails
    }

    pub fn rail(&self, id: RailId) -> &Rail {
        &self.rails[id.0]
    }

    pub fn point(&self, id: PointId) -> &RailPoint {
        &self.points[id.0]
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn rail_links(&self) -> &[RailLink] {
        &self.rail_links
    }

    pub fn groups(&self) -> &[SimultaneousGroup] {
        &self.groups
    }

    pub fn group(&self, id: GroupId) -> &SimultaneousGroup {
        &self.groups[id.0]
    }

    pub fn actor_by_hash(&self, hash: u64) -> Option<ActorId> {
        self.actor_by_hash.get(&hash).copied()
    }

    pub fn rail_by_hash(&self, hash: u64) -> Option<RailId> {
        self.rail_by_hash.get(&hash).copied()
    }

    pub fn point_by_hash(&self, rail_hash: u64, point_hash: u64) -> Option<PointId> {
        self.point_by_hash.get(&(rail_hash, point_hash)).copied()
    }

    pub fn group_of(&self, actor: ActorId) -> Option<GroupId> {
        self.group_of_actor.get(&actor).copied()
    }

    pub fn links_from(&self, actor: ActorId) -> impl Iterator<Item = &Link> + '_ {
        self.links.iter().filter(move |link| link.source == actor)
    }

    pub fn links_to(&self, actor: ActorId) -> impl Iterator<Item = &Link> + '_ {
        self.links.iter().filter(move |link| link.destination == actor)
    }
}

/// Tables shared by every fragment merged during one stage load.
#[derive(Debug)]
pub struct StageLoadContext {
    root: String,
    graph: StageGraph,
    entered_stages: HashSet<String>,
    flagged: bool,
}

impl StageLoadContext {
    /// `root` names the load in the validation report.
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            graph: StageGraph::default(),
            entered_stages: HashSet::new(),
            flagged: false,
        }
    }

    pub fn graph(&self) -> &StageGraph {
        &self.graph
    }

    pub fn is_flagged(&self) -> bool {
        self.flagged
    }

    /// False if the stage was already merged into this context.
    pub fn enter_stage(&mut self, stage_param: &str) -> bool {
        self.entered_stages.insert(stage_param.to_string())
    }

    /// Moves a fragment's records into the arenas. Duplicate hashes are
    /// flagged; the record is stored but does not replace the lookup entry.
    pub fn insert_fragment(
        &mut self,
        mumap: MuMapRef,
        location: RetrievedFileLocation,
        data: StageBcett,
    ) -> FragmentId {
        let id = FragmentId(self.graph.fragments.len());
        let StageBcett {
            actors,
            rails,
            bg_units,
            links,
            actor_to_rail_links,
            simultaneous_groups,
            ref_stages,
            root_area_hash,
            stage_param,
        } = data;
        debug!(
            fragment = %mumap,
            actors = actors.len(),
            rails = rails.as_ref().map_or(0, Vec::len),
            "merging stage fragment"
        );

        let mut actor_ids = Vec::with_capacity(actors.len());
        for actor in actors {
            actor_ids.push(self.insert_actor(actor, id));
        }
        let rail_ids = rails
            .unwrap_or_default()
            .into_iter()
            .map(|rail| self.insert_rail(rail, id))
            .collect();

        self.graph.fragments.push(Fragment {
            mumap,
            location,
            actors: actor_ids,
            rails: rail_ids,
            bg_units: bg_units.unwrap_or_default(),
            links: links.unwrap_or_default(),
            rail_links: actor_to_rail_links.unwrap_or_default(),
            groups: simultaneous_groups.unwrap_or_default(),
            ref_stages: ref_stages.unwrap_or_default(),
            root_area_hash,
            stage_param,
        });
        id
    }

    fn insert_actor(&mut self, data: StageActorData, fragment: FragmentId) -> ActorId {
        let id = ActorId(self.graph.actors.len());
        if self.graph.actor_by_hash.contains_key(&data.hash) {
            self.flagged = true;
        } else {
            self.graph.actor_by_hash.insert(data.hash, id);
        }
        self.graph.actors.push(Actor { data, fragment });
        id
    }

    fn insert_rail(&mut self, data: StageRailData, fragment: FragmentId) -> RailId {
        let id = RailId(self.graph.rails.len());
        let StageRailData {
            points,
            area_hash,
            hash,
            gyaml,
            is_closed,
            dynamic,
        } = data;
        if self.graph.rail_by_hash.contains_key(&hash) {
            self.flagged = true;
        } else {
            self.graph.rail_by_hash.insert(hash, id);
        }

        let mut point_ids = Vec::with_capacity(points.len());
        for point in points {
            let point_id = PointId(self.graph.points.len());
            if let Some(point_hash) = point.hash {
                let key = (hash, point_hash);
                if self.graph.point_by_hash.contains_key(&key) {
                    self.flagged = true;
                } else {
                    self.graph.point_by_hash.insert(key, point_id);
                }
            }
            self.graph.points.push(RailPoint {
                rail: id,
                hash: point.hash,
                translate: point.translate,
                control1: point.control1,
                dynamic: point.dynamic,
            });
            point_ids.push(point_id);
        }

        self.graph.rails.push(Rail {
            hash,
            area_hash,
            gyaml,
            is_closed,
            dynamic,
            points: point_ids,
            fragment,
        });
        id
    }

    /// Wires every fragment's links, rail links and groups against the
    /// merged tables. Unresolvable references are flagged and left out.
    fn resolve(&mut self) {
        let graph = &mut self.graph;
        let mut flagged = false;
        for (index, fragment) in graph.fragments.iter().enumerate() {
            let fragment_id = FragmentId(index);
            for link in &fragment.links {
                let source = graph.actor_by_hash.get(&link.source);
                let destination = graph.actor_by_hash.get(&link.destination);
                match (source, destination) {
                    (Some(&source), Some(&destination)) => graph.links.push(Link {
                        source,
                        destination,
                        name: link.name.clone(),
                        fragment: fragment_id,
                    }),
                    _ => flagged = true,
                }
            }

            for rail_link in &fragment.rail_links {
                let source = graph.actor_by_hash.get(&rail_link.source);
                let rail = graph.rail_by_hash.get(&rail_link.destination);
                let point = graph
                    .point_by_hash
                    .get(&(rail_link.destination, rail_link.point));
                match (source, rail, point) {
                    (Some(&source), Some(&rail), Some(&point)) => {
                        graph.rail_links.push(RailLink {
                            source,
                            rail,
                            point,
                            name: rail_link.name.clone(),
                            fragment: fragment_id,
                        })
                    }
                    _ => flagged = true,
                }
            }

            for group in &fragment.groups {
                let group_id = GroupId(graph.groups.len());
                let mut members = Vec::with_capacity(group.actors.len());
                for hash in &group.actors {
                    let Some(&actor) = graph.actor_by_hash.get(hash) else {
                        flagged = true;
                        continue;
                    };
                    match graph.group_of_actor.get(&actor) {
                        Some(&owner) if owner != group_id => flagged = true,
                        Some(_) => {}
                        None => {
                            graph.group_of_actor.insert(actor, group_id);
                        }
                    }
                    members.push(actor);
                }
                graph.groups.push(SimultaneousGroup {
                    hash: group.hash,
                    members,
                    fragment: fragment_id,
                });
            }
        }
        if flagged {
            self.flagged = true;
        }
    }

    /// Resolves cross references and hands out the graph, or the itemised
    /// report of everything that was flagged along the way.
    pub fn finish(mut self) -> Result<StageGraph, StageValidationReport> {
        self.resolve();
        if self.flagged {
            return Err(build_report(&self.root, &self.graph));
        }
        Ok(self.graph)
    }
}
