//! Rule value targets - where a command reads and writes
//!
//! The three variants form a closed set, so they are a tagged enum
//! rather than trait objects: Local (the unit's own bag), Global (the
//! city bag), and Map (a named grid at the context cell, scattering
//! over the context radius when it is non-zero).

use serde::{Deserialize, Serialize};

use crate::rules::RuleContext;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleValue {
    /// The executing unit's resource bag
    Local(String),
    /// The city-wide resource bag
    Global(String),
    /// A named map at `(ctx.u, ctx.v)` within `ctx.radius`
    Map(String),
}

impl RuleValue {
    /// Current amount seen through this target. Missing units or maps
    /// read as zero.
    pub fn get(&self, ctx: &RuleContext) -> u32 {
        match self {
            RuleValue::Local(name) => ctx
                .unit
                .and_then(|id| ctx.city.unit(id))
                .map(|u| u.resources().get(name))
                .unwrap_or(0),
            RuleValue::Global(name) => ctx.city.globals().get(name),
            RuleValue::Map(name) => match ctx.city.map(name) {
                Some(map) if ctx.radius == 0 => map.get(ctx.u, ctx.v),
                Some(map) => map.sum_radius(ctx.u, ctx.v, ctx.radius),
                None => 0,
            },
        }
    }

    /// True if `n` more would fit. A map rule naming an absent map, or a
    /// local target outside a unit context, can never accept.
    pub fn can_add(&self, ctx: &RuleContext, n: u32) -> bool {
        match self {
            RuleValue::Local(name) => ctx
                .unit
                .and_then(|id| ctx.city.unit(id))
                .map(|u| u.resources().can_add(name, n))
                .unwrap_or(false),
            RuleValue::Global(name) => ctx.city.globals().can_add(name, n),
            RuleValue::Map(name) => match ctx.city.map(name) {
                Some(map) if ctx.radius == 0 => {
                    map.get(ctx.u, ctx.v).saturating_add(n) <= map.capacity()
                }
                Some(map) => map.headroom_radius(ctx.u, ctx.v, ctx.radius) >= n,
                None => false,
            },
        }
    }

    /// True if `n` could be taken out
    pub fn can_remove(&self, ctx: &RuleContext, n: u32) -> bool {
        match self {
            RuleValue::Local(name) => ctx
                .unit
                .and_then(|id| ctx.city.unit(id))
                .map(|u| u.resources().can_remove(name, n))
                .unwrap_or(false),
            RuleValue::Global(name) => ctx.city.globals().can_remove(name, n),
            RuleValue::Map(name) => match ctx.city.map(name) {
                Some(map) if ctx.radius == 0 => map.get(ctx.u, ctx.v) >= n,
                Some(map) => map.sum_radius(ctx.u, ctx.v, ctx.radius) >= n,
                None => false,
            },
        }
    }

    pub fn add(&self, ctx: &mut RuleContext, n: u32) {
        match self {
            RuleValue::Local(name) => {
                if let Some(bag) = ctx.unit.and_then(|id| ctx.city.unit_resources_mut(id)) {
                    bag.add(name, n);
                }
            }
            RuleValue::Global(name) => ctx.city.globals_mut().add(name, n),
            RuleValue::Map(name) => {
                let (u, v, radius) = (ctx.u, ctx.v, ctx.radius);
                if let Some(map) = ctx.city.map_mut(name) {
                    if radius == 0 {
                        map.add(u, v, n);
                    } else {
                        map.add_radius(u, v, radius, n);
                    }
                }
            }
        }
    }

    pub fn remove(&self, ctx: &mut RuleContext, n: u32) {
        match self {
            RuleValue::Local(name) => {
                if let Some(bag) = ctx.unit.and_then(|id| ctx.city.unit_resources_mut(id)) {
                    bag.remove(name, n);
                }
            }
            RuleValue::Global(name) => {
                ctx.city.globals_mut().remove(name, n);
            }
            RuleValue::Map(name) => {
                let (u, v, radius) = (ctx.u, ctx.v, ctx.radius);
                if let Some(map) = ctx.city.map_mut(name) {
                    if radius == 0 {
                        map.remove(u, v, n);
                    } else {
                        map.remove_radius(u, v, radius, n);
                    }
                }
            }
        }
    }

    /// The resource or map name this value addresses
    pub fn name(&self) -> &str {
        match self {
            RuleValue::Local(n) | RuleValue::Global(n) | RuleValue::Map(n) => n,
        }
    }
}
