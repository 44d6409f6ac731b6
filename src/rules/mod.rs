//! Rule system - periodic command batches with all-or-nothing semantics
//!
//! Map rules run per cell of a map; unit rules run against a unit's own
//! bag. Both fire when their rate divides the owner's tick counter and
//! both iterate their commands in reverse declaration order, first
//! validating everything, then executing everything.

pub mod command;
pub mod value;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::city::City;
use crate::core::types::UnitId;
pub use command::{Comparison, RuleCommand};
pub use value::RuleValue;

/// Everything a command needs while it runs: the owning city, the
/// executing unit (if any), and the map cell/radius in effect.
pub struct RuleContext<'a> {
    pub city: &'a mut City,
    pub unit: Option<UnitId>,
    pub u: u32,
    pub v: u32,
    pub radius: u32,
}

/// Validate every command (reverse order); if all pass, execute every
/// command (reverse order). Returns whether the batch applied.
fn run_commands(commands: &[RuleCommand], ctx: &mut RuleContext) -> bool {
    for command in commands.iter().rev() {
        if !command.validate(ctx) {
            return false;
        }
    }
    for command in commands.iter().rev() {
        command.execute(ctx);
    }
    true
}

/// A rule attached to a map type, fired per cell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapRule {
    pub name: String,
    /// Fires when `map_ticks % rate == 0`; 0 disables the rule
    pub rate: u32,
    /// Visit cells in a random permutation instead of sweeping
    pub random_tiles: bool,
    /// Per-cell firing probability in stochastic mode, 0..=100
    pub random_tiles_percent: u8,
    pub commands: Vec<RuleCommand>,
}

impl MapRule {
    pub fn execute(&self, ctx: &mut RuleContext) -> bool {
        run_commands(&self.commands, ctx)
    }
}

/// A rule attached to a unit type, with an optional fallback fired when
/// the primary batch fails validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitRule {
    pub name: String,
    /// Fires when `unit_ticks % rate == 0`; 0 disables the rule
    pub rate: u32,
    pub commands: Vec<RuleCommand>,
    pub on_fail: Option<Arc<UnitRule>>,
}

impl UnitRule {
    /// Run the rule; on validation failure walk the `on_fail` chain.
    /// The parser guarantees the chain is acyclic.
    pub fn execute(&self, ctx: &mut RuleContext) -> bool {
        let mut rule = self;
        loop {
            if run_commands(&rule.commands, ctx) {
                return true;
            }
            match &rule.on_fail {
                Some(fallback) => rule = fallback,
                None => return false,
            }
        }
    }
}
