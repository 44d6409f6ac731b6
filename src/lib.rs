//! Agent-based city simulation engine
//!
//! A world is a set of cities. Each city overlays scalar resource maps
//! on a grid, owns path graphs whose nodes host stationary units, and
//! is driven by a rule DSL: rules fire on tick boundaries, mutate
//! resources atomically, and spawn agents that carry payloads along
//! shortest paths to accepting units.
//!
//! The engine is a library: front ends build a [`Simulation`], parse a
//! scenario script into its type catalog, construct cities from the
//! catalog, and pump real time through [`Simulation::update`].

pub mod agent;
pub mod city;
pub mod core;
pub mod map;
pub mod path;
pub mod resources;
pub mod rules;
pub mod script;
pub mod simulation;
pub mod unit;

pub use agent::{Agent, AgentType};
pub use city::{City, CityEvent};
pub use crate::core::error::{EngineError, Result};
pub use crate::core::types::{AgentId, NodeId, PathId, UnitId, WayId};
pub use map::{Map, MapType};
pub use path::{Path, PathType, WayType};
pub use resources::{Resource, ResourceBag};
pub use script::{ScriptError, TypeCatalog};
pub use simulation::{NullListener, Simulation, SimulationListener};
pub use unit::{Unit, UnitType};
