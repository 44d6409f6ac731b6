//! City - the world container
//!
//! A city owns its maps, path graphs, units, and agents, plus a global
//! resource bag shared by every rule running inside it. The per-tick
//! update pass is fully deterministic: maps, then units, then agents,
//! each in insertion order.

use std::sync::Arc;

use ahash::AHashMap;
use glam::Vec3;
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::agent::{Agent, AgentType, Leg, TravelResult};
use crate::core::config::GRID_SIZE;
use crate::core::error::{EngineError, Result};
use crate::core::types::{AgentId, NodeId, PathId, UnitId, WayId};
use crate::map::{Map, MapType};
use crate::path::dijkstra::find_route;
use crate::path::{Path, PathType};
use crate::resources::ResourceBag;
use crate::rules::{MapRule, RuleContext};
use crate::unit::{Unit, UnitType};

/// Entity lifecycle notifications buffered during construction and the
/// update pass, drained by the simulation and fed to its listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CityEvent {
    UnitAdded(UnitId),
    AgentAdded(AgentId),
    AgentRemoved(AgentId),
}

pub struct City {
    name: String,
    position: Vec3,
    grid_u: u32,
    grid_v: u32,
    globals: ResourceBag,
    maps: Vec<Map>,
    map_index: AHashMap<String, usize>,
    paths: Vec<Path>,
    path_index: AHashMap<String, usize>,
    units: Vec<Unit>,
    agents: Vec<Agent>,
    next_agent_id: u32,
    events: Vec<CityEvent>,
}

impl City {
    pub fn new(name: impl Into<String>, position: Vec3, grid_u: u32, grid_v: u32) -> Result<Self> {
        if grid_u == 0 || grid_v == 0 {
            return Err(EngineError::InvalidGridSize {
                u: grid_u,
                v: grid_v,
            });
        }
        Ok(Self {
            name: name.into(),
            position,
            grid_u,
            grid_v,
            globals: ResourceBag::new(),
            maps: Vec::new(),
            map_index: AHashMap::new(),
            paths: Vec::new(),
            path_index: AHashMap::new(),
            units: Vec::new(),
            agents: Vec::new(),
            next_agent_id: 0,
            events: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn grid_u(&self) -> u32 {
        self.grid_u
    }

    pub fn grid_v(&self) -> u32 {
        self.grid_v
    }

    pub fn globals(&self) -> &ResourceBag {
        &self.globals
    }

    pub fn globals_mut(&mut self) -> &mut ResourceBag {
        &mut self.globals
    }


    /// Instantiate a map of the given type over this city's grid
    pub fn add_map(&mut self, ty: &MapType) -> Result<&mut Map> {
        if self.map_index.contains_key(&ty.name) {
            return Err(EngineError::Duplicate {
                kind: "map",
                name: ty.name.clone(),
            });
        }
        let map = Map::new(ty.clone(), self.position, self.grid_u, self.grid_v);
        let index = self.maps.len();
        self.map_index.insert(ty.name.clone(), index);
        self.maps.push(map);
        Ok(&mut self.maps[index])
    }

    pub fn map(&self, name: &str) -> Option<&Map> {
        self.map_index.get(name).map(|&i| &self.maps[i])
    }

    pub fn map_mut(&mut self, name: &str) -> Option<&mut Map> {
        match self.map_index.get(name).copied() {
            Some(i) => self.maps.get_mut(i),
            None => None,
        }
    }

    /// Maps in insertion order
    pub fn maps(&self) -> &[Map] {
        &self.maps
    }


    pub fn add_path(&mut self, ty: &PathType) -> Result<PathId> {
        if self.path_index.contains_key(&ty.name) {
            return Err(EngineError::Duplicate {
                kind: "path",
                name: ty.name.clone(),
            });
        }
        let id = PathId(self.paths.len() as u32);
        self.path_index.insert(ty.name.clone(), self.paths.len());
        self.paths.push(Path::new(ty.clone()));
        Ok(id)
    }

    pub fn path(&self, id: PathId) -> Option<&Path> {
        self.paths.get(id.0 as usize)
    }

    pub fn path_mut(&mut self, id: PathId) -> Option<&mut Path> {
        self.paths.get_mut(id.0 as usize)
    }

    pub fn path_id(&self, name: &str) -> Option<PathId> {
        self.path_index.get(name).map(|&i| PathId(i as u32))
    }

    pub fn paths(&self) -> &[Path] {
        &self.paths
    }


    /// Place a unit along a way of a path. `t = 0` and `t = 1` attach to
    /// the existing endpoint nodes; interior values split the way at
    /// that fraction and attach to the new node.
    pub fn add_unit(
        &mut self,
        ty: Arc<UnitType>,
        path_id: PathId,
        way: WayId,
        t: f32,
    ) -> Result<UnitId> {
        if !(0.0..=1.0).contains(&t) {
            return Err(EngineError::PlacementOutOfRange { t });
        }
        let path_name = self
            .path(path_id)
            .map(|p| p.name().to_string())
            .ok_or_else(|| EngineError::NotFound {
                kind: "path",
                name: format!("#{}", path_id.0),
            })?;
        let path = &mut self.paths[path_id.0 as usize];
        let endpoints = path
            .way(way)
            .map(|w| (w.from(), w.to()))
            .ok_or(EngineError::WayNotInPath { path: path_name })?;

        let node = if t == 0.0 {
            endpoints.0
        } else if t == 1.0 {
            endpoints.1
        } else {
            path.split_way(way, t)?
        };

        let id = UnitId(self.units.len() as u32);
        let unit = Unit::new(id, ty, path_id, node);
        if let Some(n) = self.paths[path_id.0 as usize].node_mut(node) {
            n.attach_unit(id);
        }
        self.units.push(unit);
        self.events.push(CityEvent::UnitAdded(id));
        Ok(id)
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id.0 as usize)
    }

    pub(crate) fn unit_resources_mut(&mut self, id: UnitId) -> Option<&mut ResourceBag> {
        self.units.get_mut(id.0 as usize).map(|u| u.resources_mut())
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Whether the unit's node offers at least one way out
    pub fn unit_has_ways(&self, id: UnitId) -> bool {
        self.unit(id)
            .and_then(|u| self.path(u.path()).and_then(|p| p.node(u.node())))
            .map(|n| n.has_ways())
            .unwrap_or(false)
    }


    /// Spawn an agent at a node, searching the node's path for the
    /// nearest unit accepting `(target, payload)`. With no reachable
    /// destination the agent still spawns and dies on its next update,
    /// so add/remove listener callbacks stay paired.
    pub fn add_agent(
        &mut self,
        ty: &AgentType,
        path_id: PathId,
        start: NodeId,
        target: &str,
        payload: ResourceBag,
    ) -> Result<AgentId> {
        let path = self.path(path_id).ok_or_else(|| EngineError::NotFound {
            kind: "path",
            name: format!("#{}", path_id.0),
        })?;
        if path.node(start).is_none() {
            return Err(EngineError::NodeNotInPath {
                path: path.name().to_string(),
            });
        }

        let route = {
            let units = &self.units;
            find_route(path, start, |node_id| {
                path.node(node_id)
                    .map(|node| {
                        node.units()
                            .iter()
                            .any(|&uid| units[uid.0 as usize].accepts(target, &payload))
                    })
                    .unwrap_or(false)
            })
        };

        let (legs, dest) = match route {
            Some(route) => {
                let goal = *route.nodes.last().expect("route has at least the start");
                let dest = path.node(goal).and_then(|node| {
                    node.units()
                        .iter()
                        .copied()
                        .find(|&uid| self.units[uid.0 as usize].accepts(target, &payload))
                });
                let legs = route
                    .nodes
                    .windows(2)
                    .zip(route.ways.iter())
                    .map(|(pair, &way)| Leg {
                        way,
                        from: pair[0],
                        to: pair[1],
                    })
                    .collect();
                (legs, dest)
            }
            None => {
                tracing::debug!(
                    agent = ty.name.as_str(),
                    target,
                    city = self.name.as_str(),
                    "agent spawned with no reachable destination"
                );
                (Vec::new(), None)
            }
        };

        let id = AgentId(self.next_agent_id);
        self.next_agent_id += 1;
        self.agents.push(Agent::new(
            id,
            ty.clone(),
            path_id,
            start,
            legs,
            payload,
            target.to_string(),
            dest,
        ));
        self.events.push(CityEvent::AgentAdded(id));
        Ok(id)
    }

    /// Spawn from a unit's node, used by the `agent` rule command
    pub(crate) fn spawn_agent_from_unit(
        &mut self,
        unit: UnitId,
        ty: &AgentType,
        target: &str,
        payload: ResourceBag,
    ) {
        let Some((path, node)) = self.unit(unit).map(|u| (u.path(), u.node())) else {
            return;
        };
        // The command validated has_ways; a spawn can still fail only if
        // arenas were tampered with, which add_agent reports.
        if let Err(err) = self.add_agent(ty, path, node, target, payload) {
            tracing::warn!(%err, "agent spawn failed");
        }
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id() == id)
    }

    /// Live agents in insertion order
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// World position of an agent
    pub fn agent_position(&self, id: AgentId) -> Option<Vec3> {
        let agent = self.agent(id)?;
        self.path(agent.path()).map(|p| agent.position(p))
    }


    /// Convert a world position to grid coordinates, clamped to bounds
    pub fn world_to_map(&self, world: Vec3) -> (u32, u32) {
        let x = ((world.x - self.position.x) / GRID_SIZE).floor() as i64;
        let y = ((world.y - self.position.y) / GRID_SIZE).floor() as i64;
        (
            x.clamp(0, self.grid_u as i64 - 1) as u32,
            y.clamp(0, self.grid_v as i64 - 1) as u32,
        )
    }

    /// Move the city and everything bound to it
    pub fn translate(&mut self, direction: Vec3) {
        self.position += direction;
        for map in &mut self.maps {
            map.translate(direction);
        }
        for path in &mut self.paths {
            path.translate(direction);
        }
    }


    /// Run one tick: map rules, unit rules, then agent movement.
    /// `rng` is the simulation-owned stream; only stochastic map rules
    /// draw from it.
    pub fn update(&mut self, rng: &mut ChaCha8Rng) {
        self.update_maps(rng);
        self.update_units();
        self.update_agents();
    }

    fn update_maps(&mut self, rng: &mut ChaCha8Rng) {
        for i in 0..self.maps.len() {
            let ticks = self.maps[i].bump_ticks();
            // Later-declared rules take effective priority on a tick
            let rules = self.maps[i].map_type().rules.clone();
            for rule in rules.iter().rev() {
                if rule.rate != 0 && ticks % rule.rate == 0 {
                    self.run_map_rule(rule, rng);
                }
            }
        }
    }

    fn run_map_rule(&mut self, rule: &MapRule, rng: &mut ChaCha8Rng) {
        if rule.random_tiles {
            let mut cells: Vec<(u32, u32)> = (0..self.grid_v)
                .flat_map(|v| (0..self.grid_u).map(move |u| (u, v)))
                .collect();
            cells.shuffle(rng);
            for (u, v) in cells {
                if rng.gen_range(0..100u32) < rule.random_tiles_percent as u32 {
                    let mut ctx = RuleContext {
                        city: self,
                        unit: None,
                        u,
                        v,
                        radius: 0,
                    };
                    rule.execute(&mut ctx);
                }
            }
        } else {
            for v in 0..self.grid_v {
                for u in 0..self.grid_u {
                    let mut ctx = RuleContext {
                        city: self,
                        unit: None,
                        u,
                        v,
                        radius: 0,
                    };
                    rule.execute(&mut ctx);
                }
            }
        }
    }

    fn update_units(&mut self) {
        for i in 0..self.units.len() {
            let ticks = self.units[i].bump_ticks();
            let unit_id = self.units[i].id();
            let radius = self.units[i].unit_type().radius;
            let node = self.units[i].node();
            let path = self.units[i].path();
            let (u, v) = self
                .path(path)
                .and_then(|p| p.node(node))
                .map(|n| self.world_to_map(n.position()))
                .unwrap_or((0, 0));

            let rules = self.units[i].unit_type().rules.clone();
            for rule in rules.iter().rev() {
                if rule.rate != 0 && ticks % rule.rate == 0 {
                    let mut ctx = RuleContext {
                        city: self,
                        unit: Some(unit_id),
                        u,
                        v,
                        radius,
                    };
                    if !rule.execute(&mut ctx) && rule.on_fail.is_none() {
                        tracing::trace!(
                            rule = rule.name.as_str(),
                            unit = unit_id.0,
                            "rule aborted with no fallback"
                        );
                    }
                }
            }
        }
    }

    fn update_agents(&mut self) {
        for i in 0..self.agents.len() {
            if self.agents[i].is_done() {
                continue;
            }
            let path_id = self.agents[i].path();
            let result = {
                let (agents, paths) = (&mut self.agents, &self.paths);
                let agent = &mut agents[i];
                match paths.get(path_id.0 as usize) {
                    Some(path) => agent.advance(path),
                    None => TravelResult::Stranded,
                }
            };

            match result {
                TravelResult::Moving => {}
                TravelResult::Arrived => {
                    let dest = self.agents[i].destination();
                    if let Some(dest) = dest {
                        let (agents, units) = (&mut self.agents, &mut self.units);
                        if let Some(unit) = units.get_mut(dest.0 as usize) {
                            agents[i].payload_mut().transfer_to(unit.resources_mut());
                        }
                    }
                    self.agents[i].mark_done();
                }
                TravelResult::Stranded => {
                    tracing::debug!(agent = self.agents[i].id().0, "stranded agent removed");
                    self.agents[i].mark_done();
                }
            }
        }

        // Removal preserves the insertion order of survivors
        for agent in self.agents.iter().filter(|a| a.is_done()) {
            self.events.push(CityEvent::AgentRemoved(agent.id()));
        }
        self.agents.retain(|a| !a.is_done());
    }

    /// Drain buffered lifecycle events, oldest first
    pub fn take_events(&mut self) -> Vec<CityEvent> {
        std::mem::take(&mut self.events)
    }
}
