//! Catalog of types declared by a scenario script
//!
//! Built once by the parser and immutable afterwards; cities, units,
//! and agents are instantiated from these definitions. Serializable so
//! front ends can snapshot what a scenario declared.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::agent::AgentType;
use crate::map::MapType;
use crate::path::{PathType, WayType};
use crate::rules::{MapRule, UnitRule};
use crate::unit::UnitType;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeCatalog {
    pub(crate) resources: Vec<String>,
    pub(crate) path_types: Vec<PathType>,
    pub(crate) way_types: Vec<WayType>,
    pub(crate) agent_types: Vec<AgentType>,
    pub(crate) map_types: Vec<MapType>,
    pub(crate) unit_types: Vec<Arc<UnitType>>,
    pub(crate) map_rules: Vec<Arc<MapRule>>,
    pub(crate) unit_rules: Vec<Arc<UnitRule>>,
}

impl TypeCatalog {
    pub fn has_resource(&self, name: &str) -> bool {
        self.resources.iter().any(|r| r == name)
    }

    /// Declared resource names, in declaration order
    pub fn resources(&self) -> &[String] {
        &self.resources
    }

    pub fn path_type(&self, name: &str) -> Option<&PathType> {
        self.path_types.iter().find(|t| t.name == name)
    }

    pub fn way_type(&self, name: &str) -> Option<&WayType> {
        self.way_types.iter().find(|t| t.name == name)
    }

    pub fn agent_type(&self, name: &str) -> Option<&AgentType> {
        self.agent_types.iter().find(|t| t.name == name)
    }

    pub fn map_type(&self, name: &str) -> Option<&MapType> {
        self.map_types.iter().find(|t| t.name == name)
    }

    pub fn unit_type(&self, name: &str) -> Option<&Arc<UnitType>> {
        self.unit_types.iter().find(|t| t.name == name)
    }

    pub fn map_rule(&self, name: &str) -> Option<&Arc<MapRule>> {
        self.map_rules.iter().find(|r| r.name == name)
    }

    pub fn unit_rule(&self, name: &str) -> Option<&Arc<UnitRule>> {
        self.unit_rules.iter().find(|r| r.name == name)
    }

    pub fn map_types(&self) -> &[MapType] {
        &self.map_types
    }

    pub fn unit_types(&self) -> &[Arc<UnitType>] {
        &self.unit_types
    }

    pub fn agent_types(&self) -> &[AgentType] {
        &self.agent_types
    }

    pub fn path_types(&self) -> &[PathType] {
        &self.path_types
    }

    pub fn way_types(&self) -> &[WayType] {
        &self.way_types
    }
}
