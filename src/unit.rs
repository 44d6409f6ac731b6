//! Stationary entities bound to path nodes
//!
//! A unit represents a house, a factory, a well - anything that sits at
//! a node, holds resources, and periodically runs rules that may spawn
//! carriers toward other units.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::types::{Color, NodeId, PathId, Tick, UnitId};
use crate::resources::ResourceBag;
use crate::rules::UnitRule;

/// Type definition for a unit, built by the script parser
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitType {
    pub name: String,
    pub color: Color,
    /// Chebyshev radius used by map-targeting commands of this unit's rules
    pub radius: u32,
    /// Search-target labels this unit answers to
    pub targets: Vec<String>,
    /// Capacities and starting amounts, cloned into each instance
    pub resources: ResourceBag,
    pub rules: Vec<Arc<UnitRule>>,
}

impl UnitType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: 0xFFFFFF,
            radius: 1,
            targets: Vec::new(),
            resources: ResourceBag::new(),
            rules: Vec::new(),
        }
    }
}

/// A placed unit: one node, one bag of resources, one tick counter
#[derive(Debug, Clone)]
pub struct Unit {
    id: UnitId,
    ty: Arc<UnitType>,
    path: PathId,
    node: NodeId,
    resources: ResourceBag,
    ticks: Tick,
}

impl Unit {
    pub(crate) fn new(id: UnitId, ty: Arc<UnitType>, path: PathId, node: NodeId) -> Self {
        let resources = ty.resources.clone();
        Self {
            id,
            ty,
            path,
            node,
            resources,
            ticks: 0,
        }
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn unit_type(&self) -> &Arc<UnitType> {
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

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn resources(&self) -> &ResourceBag {
        &self.resources
    }

    pub(crate) fn resources_mut(&mut self) -> &mut ResourceBag {
        &mut self.resources
    }

    pub fn ticks(&self) -> Tick {
        self.ticks
    }

    pub(crate) fn bump_ticks(&mut self) -> Tick {
        self.ticks += 1;
        self.ticks
    }

    /// Whether a carrier searching for `target` could deliver `payload`
    /// here: the label must be listed by the type and every payload
    /// resource must fit.
    pub fn accepts(&self, target: &str, payload: &ResourceBag) -> bool {
        self.ty.targets.iter().any(|t| t == target)
            && payload
                .iter()
                .all(|r| self.resources.can_add(r.name(), r.amount()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn home_type() -> Arc<UnitType> {
        let mut ty = UnitType::new("Home");
        ty.targets.push("People".into());
        ty.resources.add_type("People", 4);
        Arc::new(ty)
    }

    #[test]
    fn instance_clones_the_type_bag() {
        let ty = home_type();
        let mut unit = Unit::new(UnitId(0), ty, PathId(0), NodeId(0));
        unit.resources_mut().add("People", 2);
        assert_eq!(unit.resources().get("People"), 2);
        assert_eq!(unit.unit_type().resources.get("People"), 0);
    }

    #[test]
    fn accepts_needs_matching_target_and_room() {
        let ty = home_type();
        let mut unit = Unit::new(UnitId(0), ty, PathId(0), NodeId(0));

        let mut payload = ResourceBag::new();
        payload.add("People", 1);

        assert!(unit.accepts("People", &payload));
        assert!(!unit.accepts("Workers", &payload));

        unit.resources_mut().add("People", 4);
        assert!(!unit.accepts("People", &payload));
    }
}
