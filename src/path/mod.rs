//! Path graph - nodes connected by ways, traversed by agents
//!
//! A path owns arenas of nodes and ways. Cross-references are dense ids
//! into those arenas, so splitting a way or attaching a unit never
//! invalidates outstanding handles.

pub mod dijkstra;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::error::{EngineError, Result};
use crate::core::types::{Color, NodeId, UnitId, WayId};

/// Display metadata for a path, built by the script parser
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathType {
    pub name: String,
    pub color: Color,
}

impl PathType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: 0xFFFFFF,
        }
    }
}

/// Display metadata for a way (a path segment type)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WayType {
    pub name: String,
    pub color: Color,
}

impl WayType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: 0xFFFFFF,
        }
    }
}

/// Vertex of the path graph. Units attach here; agents depart from here.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    position: Vec3,
    ways: Vec<WayId>,
    units: Vec<UnitId>,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn ways(&self) -> &[WayId] {
        &self.ways
    }

    pub fn units(&self) -> &[UnitId] {
        &self.units
    }

    pub fn has_ways(&self) -> bool {
        !self.ways.is_empty()
    }

    pub(crate) fn attach_unit(&mut self, unit: UnitId) {
        self.units.push(unit);
    }
}

/// Edge of the path graph. Traversal is allowed in both directions;
/// `from`/`to` only fix the orientation used for interpolation.
#[derive(Debug, Clone)]
pub struct Way {
    id: WayId,
    ty: WayType,
    from: NodeId,
    to: NodeId,
    magnitude: f32,
}

impl Way {
    pub fn id(&self) -> WayId {
        self.id
    }

    pub fn way_type(&self) -> &WayType {
        &self.ty
    }

    pub fn from(&self) -> NodeId {
        self.from
    }

    pub fn to(&self) -> NodeId {
        self.to
    }

    /// Cached world-space length
    pub fn magnitude(&self) -> f32 {
        self.magnitude
    }

    /// The node on the other end, if `node` is an endpoint at all
    pub fn opposite(&self, node: NodeId) -> Option<NodeId> {
        if node == self.from {
            Some(self.to)
        } else if node == self.to {
            Some(self.from)
        } else {
            None
        }
    }
}

/// A named subgraph of nodes and ways within a city
#[derive(Debug, Clone)]
pub struct Path {
    ty: PathType,
    nodes: Vec<Node>,
    ways: Vec<Way>,
}

impl Path {
    pub fn new(ty: PathType) -> Self {
        Self {
            ty,
            nodes: Vec::new(),
            ways: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.ty.name
    }

    pub fn color(&self) -> Color {
        self.ty.color
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn ways(&self) -> &[Way] {
        &self.ways
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize)
    }

    pub fn way(&self, id: WayId) -> Option<&Way> {
        self.ways.get(id.0 as usize)
    }

    /// Create a node at the given world position
    pub fn add_node(&mut self, position: Vec3) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            id,
            position,
            ways: Vec::new(),
            units: Vec::new(),
        });
        id
    }

    /// Create a way joining two existing nodes
    pub fn add_way(&mut self, ty: &WayType, from: NodeId, to: NodeId) -> Result<WayId> {
        if self.node(from).is_none() || self.node(to).is_none() {
            return Err(EngineError::NodeNotInPath {
                path: self.ty.name.clone(),
            });
        }
        let id = WayId(self.ways.len() as u32);
        let magnitude = (self.nodes[to.0 as usize].position - self.nodes[from.0 as usize].position)
            .length();
        self.ways.push(Way {
            id,
            ty: ty.clone(),
            from,
            to,
            magnitude,
        });
        self.nodes[from.0 as usize].ways.push(id);
        self.nodes[to.0 as usize].ways.push(id);
        Ok(id)
    }

    /// A way joining `a` and `b` in either orientation, lowest id first
    pub fn way_between(&self, a: NodeId, b: NodeId) -> Option<&Way> {
        self.node(a)?
            .ways
            .iter()
            .filter_map(|&w| self.way(w))
            .find(|w| w.opposite(a) == Some(b))
    }

    /// Insert a node at fractional parameter `t` along a way, re-wiring
    /// the original way into two.
    ///
    /// The original way keeps its id and is shortened to end at the new
    /// node; a fresh way covers the remainder. References held by the
    /// old endpoints stay valid. Endpoint parameters are rejected: use
    /// the existing nodes instead.
    pub fn split_way(&mut self, way: WayId, t: f32) -> Result<NodeId> {
        if !(t > 0.0 && t < 1.0) {
            return Err(EngineError::SplitOutOfRange { t });
        }
        let (ty, from, to) = {
            let w = self.way(way).ok_or_else(|| EngineError::WayNotInPath {
                path: self.ty.name.clone(),
            })?;
            (w.ty.clone(), w.from, w.to)
        };

        let p1 = self.nodes[from.0 as usize].position;
        let p2 = self.nodes[to.0 as usize].position;
        let mid = self.add_node(p1.lerp(p2, t));

        // Second half: new node -> original destination
        self.add_way(&ty, mid, to)?;

        // Shorten the original way to end at the new node
        self.nodes[to.0 as usize].ways.retain(|&w| w != way);
        self.nodes[mid.0 as usize].ways.push(way);
        let w = &mut self.ways[way.0 as usize];
        w.to = mid;
        w.magnitude = (self.nodes[mid.0 as usize].position - p1).length();

        Ok(mid)
    }

    /// Move every node, refreshing way magnitudes
    pub fn translate(&mut self, direction: Vec3) {
        for node in &mut self.nodes {
            node.position += direction;
        }
        for i in 0..self.ways.len() {
            let (from, to) = (self.ways[i].from, self.ways[i].to);
            self.ways[i].magnitude = (self.nodes[to.0 as usize].position
                - self.nodes[from.0 as usize].position)
                .length();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn road() -> WayType {
        WayType::new("Road")
    }

    #[test]
    fn add_way_links_both_endpoints() {
        let mut path = Path::new(PathType::new("Road"));
        let a = path.add_node(Vec3::ZERO);
        let b = path.add_node(Vec3::new(3.0, 4.0, 0.0));
        let w = path.add_way(&road(), a, b).unwrap();

        assert_eq!(path.way(w).unwrap().magnitude(), 5.0);
        assert_eq!(path.node(a).unwrap().ways(), &[w]);
        assert_eq!(path.node(b).unwrap().ways(), &[w]);
        assert!(path.node(a).unwrap().has_ways());
    }

    #[test]
    fn add_way_rejects_foreign_nodes() {
        let mut path = Path::new(PathType::new("Road"));
        let a = path.add_node(Vec3::ZERO);
        assert!(path.add_way(&road(), a, NodeId(7)).is_err());
    }

    #[test]
    fn split_way_rejects_endpoints() {
        let mut path = Path::new(PathType::new("Road"));
        let a = path.add_node(Vec3::ZERO);
        let b = path.add_node(Vec3::new(100.0, 0.0, 0.0));
        let w = path.add_way(&road(), a, b).unwrap();

        assert!(path.split_way(w, 0.0).is_err());
        assert!(path.split_way(w, 1.0).is_err());
        assert!(path.split_way(w, 0.5).is_ok());
    }

    #[test]
    fn split_way_rewires_one_way_into_two() {
        let mut path = Path::new(PathType::new("Road"));
        let a = path.add_node(Vec3::ZERO);
        let b = path.add_node(Vec3::new(100.0, 0.0, 0.0));
        let w = path.add_way(&road(), a, b).unwrap();

        let mid = path.split_way(w, 0.3).unwrap();
        assert_eq!(path.node(mid).unwrap().position().x, 30.0);

        // Original way now ends at the new node
        let first = path.way(w).unwrap();
        assert_eq!(first.from(), a);
        assert_eq!(first.to(), mid);
        assert!((first.magnitude() - 30.0).abs() < 1e-4);

        // A second way covers the rest
        let second = path.way_between(mid, b).unwrap();
        assert!((second.magnitude() - 70.0).abs() < 1e-4);
        assert_ne!(second.id(), w);

        // The old destination no longer lists the original way
        assert!(!path.node(b).unwrap().ways().contains(&w));
    }

    #[test]
    fn translate_updates_magnitudes() {
        let mut path = Path::new(PathType::new("Road"));
        let a = path.add_node(Vec3::ZERO);
        let b = path.add_node(Vec3::new(10.0, 0.0, 0.0));
        let w = path.add_way(&road(), a, b).unwrap();

        path.translate(Vec3::new(5.0, 5.0, 0.0));
        assert_eq!(path.node(a).unwrap().position(), Vec3::new(5.0, 5.0, 0.0));
        assert_eq!(path.way(w).unwrap().magnitude(), 10.0);
    }
}
