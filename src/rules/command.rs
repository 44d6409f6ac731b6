//! Rule commands - the operations a rule body is made of
//!
//! Commands are validated and executed in two separate passes so a rule
//! either applies completely or not at all. `validate` must not mutate
//! anything observable.

use serde::{Deserialize, Serialize};

use crate::agent::AgentType;
use crate::resources::ResourceBag;
use crate::rules::RuleContext;
use crate::rules::value::RuleValue;

/// Comparison operator of a `Test` command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    Equals,
    Greater,
    Less,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RuleCommand {
    /// `local|global|map <name> add <n>`
    Add { target: RuleValue, amount: u32 },
    /// `local|global|map <name> remove <n>`
    Remove { target: RuleValue, amount: u32 },
    /// `local|global|map <name> equals|greater|less <n>` - a pure
    /// predicate gating the batch
    Test {
        target: RuleValue,
        comparison: Comparison,
        amount: u32,
    },
    /// `agent <type> to <unit> add [ ... ]` - spawn a carrier on the
    /// executing unit's node
    SpawnAgent {
        agent: AgentType,
        target: String,
        payload: ResourceBag,
    },
}

impl RuleCommand {
    /// Whether this command could apply in the given context
    pub fn validate(&self, ctx: &RuleContext) -> bool {
        match self {
            RuleCommand::Add { target, amount } => target.can_add(ctx, *amount),
            RuleCommand::Remove { target, amount } => target.can_remove(ctx, *amount),
            RuleCommand::Test {
                target,
                comparison,
                amount,
            } => {
                let value = target.get(ctx);
                match comparison {
                    Comparison::Equals => value == *amount,
                    Comparison::Greater => value > *amount,
                    Comparison::Less => value < *amount,
                }
            }
            // A unit on an orphan node has nowhere to send a carrier
            RuleCommand::SpawnAgent { .. } => match ctx.unit {
                Some(id) => ctx.city.unit_has_ways(id),
                None => false,
            },
        }
    }

    /// Apply the command. Callers must have validated the whole batch.
    pub fn execute(&self, ctx: &mut RuleContext) {
        match self {
            RuleCommand::Add { target, amount } => target.add(ctx, *amount),
            RuleCommand::Remove { target, amount } => target.remove(ctx, *amount),
            RuleCommand::Test { .. } => {}
            RuleCommand::SpawnAgent {
                agent,
                target,
                payload,
            } => {
                if let Some(unit) = ctx.unit {
                    ctx.city.spawn_agent_from_unit(unit, agent, target, payload.clone());
                }
            }
        }
    }
}
