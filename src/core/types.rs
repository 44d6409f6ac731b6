//! Core type definitions used throughout the engine

use serde::{Deserialize, Serialize};

/// Identifier of a node within a path's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Identifier of a way within a path's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WayId(pub u32);

/// Identifier of a path within a city
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathId(pub u32);

/// Identifier of a unit within a city
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitId(pub u32);

/// Identifier of an agent within a city (monotonic, never reused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u32);

/// Discrete simulation time unit
pub type Tick = u32;

/// Packed 0xRRGGBB color for renderers
pub type Color = u32;
