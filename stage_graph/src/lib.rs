//! Stage loading: fragments merged into one validated, hash-keyed graph.
#![forbid(unsafe_code)]

pub mod graph;
pub mod mumap;
pub mod stage;
mod validation;
pub mod world_list;

pub use graph::{
    Actor, ActorId, Fragment, FragmentId, GroupId, Link, PointId, Rail, RailId, RailLink,
    RailPoint, SimultaneousGroup, StageGraph, StageLoadContext,
};
pub use mumap::MuMap;
pub use stage::{Area, Course, Stage, StageBase, StageLoader, WorldMap};
pub use world_list::WorldList;
