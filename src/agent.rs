//! Mobile entities carrying resources along precomputed routes
//!
//! An agent is spawned by a unit rule, walks the way sequence found at
//! spawn time, drops its payload at the destination unit, and is
//! removed. An agent that never found a destination dies on its first
//! update instead.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::config::TICK_INTERVAL;
use crate::core::types::{AgentId, Color, NodeId, PathId, UnitId, WayId};
use crate::path::Path;
use crate::resources::ResourceBag;

/// Type definition for an agent, built by the script parser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentType {
    pub name: String,
    pub color: Color,
    /// World units per simulated second
    pub speed: f32,
}

impl AgentType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: 0xFFFFFF,
            speed: 1.0,
        }
    }
}

/// One directed traversal of a way. Ways are undirected; the leg fixes
/// which endpoint the agent enters from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leg {
    pub way: WayId,
    pub from: NodeId,
    pub to: NodeId,
}

/// Outcome of one agent tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelResult {
    Moving,
    /// Reached the destination node this tick
    Arrived,
    /// Spawned without a reachable destination
    Stranded,
}

/// A live carrier
#[derive(Debug, Clone)]
pub struct Agent {
    id: AgentId,
    ty: AgentType,
    path: PathId,
    start: NodeId,
    route: Vec<Leg>,
    current: usize,
    offset: f32,
    payload: ResourceBag,
    target: String,
    dest: Option<UnitId>,
    done: bool,
}

impl Agent {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: AgentId,
        ty: AgentType,
        path: PathId,
        start: NodeId,
        route: Vec<Leg>,
        payload: ResourceBag,
        target: String,
        dest: Option<UnitId>,
    ) -> Self {
        Self {
            id,
            ty,
            path,
            start,
            route,
            current: 0,
            offset: 0.0,
            payload,
            target,
            dest,
            done: false,
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn agent_type(&self) -> &AgentType {
        &self.ty
    }

    pub fn name(&self) -> &str {
        &self.ty.name
    }

    pub fn color(&self) -> Color {
        self.ty.color
    }

    pub fn path(&self) -> PathId {
        self.path
    }

    /// Label the spawning rule was searching for
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn payload(&self) -> &ResourceBag {
        &self.payload
    }

    pub(crate) fn payload_mut(&mut self) -> &mut ResourceBag {
        &mut self.payload
    }

    /// Destination unit chosen at spawn time, if any was reachable
    pub fn destination(&self) -> Option<UnitId> {
        self.dest
    }

    /// The full route chosen at spawn time
    pub fn legs(&self) -> &[Leg] {
        &self.route
    }

    /// The leg being traversed, if travel is still in progress
    pub fn current_leg(&self) -> Option<Leg> {
        if self.done {
            None
        } else {
            self.route.get(self.current).copied()
        }
    }

    /// Distance already covered along the current leg
    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub(crate) fn is_done(&self) -> bool {
        self.done
    }

    pub(crate) fn mark_done(&mut self) {
        self.done = true;
    }

    /// Advance one tick along the route
    pub(crate) fn advance(&mut self, path: &Path) -> TravelResult {
        if self.dest.is_none() {
            return TravelResult::Stranded;
        }
        if self.current >= self.route.len() {
            return TravelResult::Arrived;
        }

        self.offset += self.ty.speed * TICK_INTERVAL;

        while let Some(leg) = self.route.get(self.current) {
            let magnitude = path.way(leg.way).map(|w| w.magnitude()).unwrap_or(0.0);
            if self.offset < magnitude {
                return TravelResult::Moving;
            }
            self.offset -= magnitude;
            self.current += 1;
        }

        self.offset = 0.0;
        TravelResult::Arrived
    }

    /// World position, interpolated along the current leg
    pub fn position(&self, path: &Path) -> Vec3 {
        let node_pos = |id: NodeId| path.node(id).map(|n| n.position()).unwrap_or(Vec3::ZERO);

        match self.route.get(self.current) {
            Some(leg) => {
                let magnitude = path.way(leg.way).map(|w| w.magnitude()).unwrap_or(0.0);
                if magnitude <= f32::EPSILON {
                    node_pos(leg.from)
                } else {
                    node_pos(leg.from).lerp(node_pos(leg.to), self.offset / magnitude)
                }
            }
            None => node_pos(self.route.last().map(|l| l.to).unwrap_or(self.start)),
        }
    }
}
