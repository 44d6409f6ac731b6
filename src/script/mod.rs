//! Scenario script parser
//!
//! Scripts are whitespace-delimited token streams with top-level
//! sections (`resources`, `maps`, `paths`, `segments`, `agents`,
//! `units`, `rules`), each closed by `end`. Parsing builds a
//! [`TypeCatalog`]; nothing is instantiated until a front end creates
//! cities from it. Rule names referenced from `maps`/`units` and
//! `onFail` targets may be forward references; everything else must be
//! declared before use. Any error aborts the parse with the offending
//! token and section - no partial catalog is handed back.

pub mod catalog;
pub mod scanner;

use std::sync::Arc;

use ahash::AHashMap;
use thiserror::Error;

use crate::agent::AgentType;
use crate::map::MapType;
use crate::path::{PathType, WayType};
use crate::resources::ResourceBag;
use crate::rules::{Comparison, MapRule, RuleCommand, RuleValue, UnitRule};
use crate::unit::UnitType;
pub use catalog::TypeCatalog;
use scanner::Scanner;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("unknown token '{token}' in section '{section}'")]
    UnknownToken { token: String, section: &'static str },

    #[error("unexpected end of script in section '{section}'")]
    UnexpectedEnd { section: &'static str },

    #[error("expected {expected}, found '{found}' in section '{section}'")]
    Expected {
        expected: &'static str,
        found: String,
        section: &'static str,
    },

    #[error("invalid number '{token}' in section '{section}'")]
    InvalidNumber { token: String, section: &'static str },

    #[error("invalid color '{token}' in section '{section}'")]
    InvalidColor { token: String, section: &'static str },

    #[error("{value} is out of range for {what}")]
    OutOfRange { what: &'static str, value: u32 },

    #[error("undefined {kind} '{name}'")]
    Undefined { kind: &'static str, name: String },

    #[error("duplicate {kind} '{name}'")]
    Duplicate { kind: &'static str, name: String },

    #[error("unit '{unit}' lists resource '{resource}' without a matching cap")]
    MissingCap { unit: String, resource: String },

    #[error("unresolvable onFail chain through rule '{rule}'")]
    OnFailCycle { rule: String },

    #[error("empty script")]
    Empty,
}

type ParseResult<T> = std::result::Result<T, ScriptError>;

/// Parse a scenario script into a type catalog
pub fn parse_script(text: &str) -> ParseResult<TypeCatalog> {
    Parser::new(text).run()
}

/// A unit rule before its `onFail` target is resolved
struct UnitRuleDraft {
    name: String,
    rate: u32,
    commands: Vec<RuleCommand>,
    on_fail: Option<String>,
}

/// A unit type before its rule names are resolved
struct UnitTypeDraft {
    name: String,
    color: u32,
    radius: u32,
    targets: Vec<String>,
    resources: ResourceBag,
    rule_names: Vec<String>,
}

struct Parser<'a> {
    scanner: Scanner<'a>,
    section: &'static str,
    resources: Vec<String>,
    path_types: Vec<PathType>,
    way_types: Vec<WayType>,
    agent_types: Vec<AgentType>,
    map_rules: Vec<Arc<MapRule>>,
    unit_rule_drafts: Vec<UnitRuleDraft>,
    map_type_drafts: Vec<(MapType, Vec<String>)>,
    unit_type_drafts: Vec<UnitTypeDraft>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            scanner: Scanner::new(text),
            section: "script",
            resources: Vec::new(),
            path_types: Vec::new(),
            way_types: Vec::new(),
            agent_types: Vec::new(),
            map_rules: Vec::new(),
            unit_rule_drafts: Vec::new(),
            map_type_drafts: Vec::new(),
            unit_type_drafts: Vec::new(),
        }
    }

    fn run(mut self) -> ParseResult<TypeCatalog> {
        let mut saw_section = false;
        while let Some(token) = self.scanner.next_token() {
            saw_section = true;
            match token {
                "resources" => self.parse_resources()?,
                "maps" => self.parse_maps()?,
                "paths" => self.parse_paths()?,
                "segments" => self.parse_segments()?,
                "agents" => self.parse_agents()?,
                "units" => self.parse_units()?,
                "rules" => self.parse_rules()?,
                other => {
                    return Err(ScriptError::UnknownToken {
                        token: other.to_string(),
                        section: "script",
                    })
                }
            }
            self.section = "script";
        }
        if !saw_section {
            return Err(ScriptError::Empty);
        }
        self.finalize()
    }

    // --- low-level helpers --------------------------------------------

    fn expect(&mut self) -> ParseResult<&'a str> {
        self.scanner
            .next_token()
            .ok_or(ScriptError::UnexpectedEnd {
                section: self.section,
            })
    }

    fn to_u32(&self, token: &str) -> ParseResult<u32> {
        token.parse().map_err(|_| ScriptError::InvalidNumber {
            token: token.to_string(),
            section: self.section,
        })
    }

    fn to_percent(&self, token: &str) -> ParseResult<u8> {
        let value = self.to_u32(token)?;
        if value > 100 {
            return Err(ScriptError::OutOfRange {
                what: "randomTilesPercent",
                value,
            });
        }
        Ok(value as u8)
    }

    fn to_f32(&self, token: &str) -> ParseResult<f32> {
        token.parse().map_err(|_| ScriptError::InvalidNumber {
            token: token.to_string(),
            section: self.section,
        })
    }

    fn to_color(&self, token: &str) -> ParseResult<u32> {
        let digits = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        u32::from_str_radix(digits, 16).map_err(|_| ScriptError::InvalidColor {
            token: token.to_string(),
            section: self.section,
        })
    }

    fn to_bool(&self, token: &str) -> ParseResult<bool> {
        match token {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(ScriptError::Expected {
                expected: "'true' or 'false'",
                found: other.to_string(),
                section: self.section,
            }),
        }
    }

    fn check_resource(&self, name: &str) -> ParseResult<()> {
        if self.resources.iter().any(|r| r == name) {
            Ok(())
        } else {
            Err(ScriptError::Undefined {
                kind: "resource",
                name: name.to_string(),
            })
        }
    }

    fn check_duplicate<F>(&self, kind: &'static str, name: &str, exists: F) -> ParseResult<()>
    where
        F: FnOnce() -> bool,
    {
        if exists() {
            Err(ScriptError::Duplicate {
                kind,
                name: name.to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// `[ name name ... ]`
    fn parse_string_array(&mut self) -> ParseResult<Vec<String>> {
        let open = self.expect()?;
        if open != "[" {
            return Err(ScriptError::Expected {
                expected: "'['",
                found: open.to_string(),
                section: self.section,
            });
        }
        let mut items = Vec::new();
        loop {
            let token = self.expect()?;
            if token == "]" {
                return Ok(items);
            }
            items.push(token.to_string());
        }
    }

    /// `[ <resource> <amount> ... ]`, every resource checked against the
    /// declarations
    fn parse_amount_array(&mut self) -> ParseResult<Vec<(String, u32)>> {
        let open = self.expect()?;
        if open != "[" {
            return Err(ScriptError::Expected {
                expected: "'['",
                found: open.to_string(),
                section: self.section,
            });
        }
        let mut items = Vec::new();
        loop {
            let token = self.expect()?;
            if token == "]" {
                return Ok(items);
            }
            self.check_resource(token)?;
            let name = token.to_string();
            let amount = self.expect().and_then(|t| self.to_u32(t))?;
            items.push((name, amount));
        }
    }

    // --- sections -----------------------------------------------------

    fn parse_resources(&mut self) -> ParseResult<()> {
        self.section = "resources";
        loop {
            match self.expect()? {
                "end" => return Ok(()),
                "resource" => {
                    let name = self.expect()?;
                    self.check_duplicate("resource", name, || {
                        self.resources.iter().any(|r| r == name)
                    })?;
                    self.resources.push(name.to_string());
                }
                other => {
                    return Err(ScriptError::UnknownToken {
                        token: other.to_string(),
                        section: self.section,
                    })
                }
            }
        }
    }

    fn parse_paths(&mut self) -> ParseResult<()> {
        self.section = "paths";
        loop {
            match self.expect()? {
                "end" => return Ok(()),
                "path" => {
                    let name = self.expect()?.to_string();
                    self.check_duplicate("path type", &name, || {
                        self.path_types.iter().any(|t| t.name == name)
                    })?;
                    let mut ty = PathType::new(name);
                    loop {
                        let token = self.expect()?;
                        match token {
                            "color" => ty.color = self.expect().and_then(|t| self.to_color(t))?,
                            "path" | "end" => {
                                self.scanner.push_back(token);
                                break;
                            }
                            other => {
                                return Err(ScriptError::UnknownToken {
                                    token: other.to_string(),
                                    section: self.section,
                                })
                            }
                        }
                    }
                    self.path_types.push(ty);
                }
                other => {
                    return Err(ScriptError::UnknownToken {
                        token: other.to_string(),
                        section: self.section,
                    })
                }
            }
        }
    }

    fn parse_segments(&mut self) -> ParseResult<()> {
        self.section = "segments";
        loop {
            match self.expect()? {
                "end" => return Ok(()),
                "segment" => {
                    let name = self.expect()?.to_string();
                    self.check_duplicate("segment type", &name, || {
                        self.way_types.iter().any(|t| t.name == name)
                    })?;
                    let mut ty = WayType::new(name);
                    loop {
                        let token = self.expect()?;
                        match token {
                            "color" => ty.color = self.expect().and_then(|t| self.to_color(t))?,
                            "segment" | "end" => {
                                self.scanner.push_back(token);
                                break;
                            }
                            other => {
                                return Err(ScriptError::UnknownToken {
                                    token: other.to_string(),
                                    section: self.section,
                                })
                            }
                        }
                    }
                    self.way_types.push(ty);
                }
                other => {
                    return Err(ScriptError::UnknownToken {
                        token: other.to_string(),
                        section: self.section,
                    })
                }
            }
        }
    }

    fn parse_agents(&mut self) -> ParseResult<()> {
        self.section = "agents";
        loop {
            match self.expect()? {
                "end" => return Ok(()),
                "agent" => {
                    let name = self.expect()?.to_string();
                    self.check_duplicate("agent type", &name, || {
                        self.agent_types.iter().any(|t| t.name == name)
                    })?;
                    let mut ty = AgentType::new(name);
                    loop {
                        let token = self.expect()?;
                        match token {
                            "color" => ty.color = self.expect().and_then(|t| self.to_color(t))?,
                            "speed" => ty.speed = self.expect().and_then(|t| self.to_f32(t))?,
                            "agent" | "end" => {
                                self.scanner.push_back(token);
                                break;
                            }
                            other => {
                                return Err(ScriptError::UnknownToken {
                                    token: other.to_string(),
                                    section: self.section,
                                })
                            }
                        }
                    }
                    self.agent_types.push(ty);
                }
                other => {
                    return Err(ScriptError::UnknownToken {
                        token: other.to_string(),
                        section: self.section,
                    })
                }
            }
        }
    }

    fn parse_maps(&mut self) -> ParseResult<()> {
        self.section = "maps";
        loop {
            match self.expect()? {
                "end" => return Ok(()),
                "map" => {
                    let name = self.expect()?.to_string();
                    self.check_duplicate("map type", &name, || {
                        self.map_type_drafts.iter().any(|(t, _)| t.name == name)
                    })?;
                    let mut ty = MapType::new(name);
                    let mut rule_names = Vec::new();
                    loop {
                        let token = self.expect()?;
                        match token {
                            "color" => ty.color = self.expect().and_then(|t| self.to_color(t))?,
                            "capacity" => {
                                ty.capacity = self.expect().and_then(|t| self.to_u32(t))?
                            }
                            "rules" => rule_names = self.parse_string_array()?,
                            "map" | "end" => {
                                self.scanner.push_back(token);
                                break;
                            }
                            other => {
                                return Err(ScriptError::UnknownToken {
                                    token: other.to_string(),
                                    section: self.section,
                                })
                            }
                        }
                    }
                    self.map_type_drafts.push((ty, rule_names));
                }
                other => {
                    return Err(ScriptError::UnknownToken {
                        token: other.to_string(),
                        section: self.section,
                    })
                }
            }
        }
    }

    fn parse_units(&mut self) -> ParseResult<()> {
        self.section = "units";
        loop {
            match self.expect()? {
                "end" => return Ok(()),
                "unit" => {
                    let name = self.expect()?.to_string();
                    self.check_duplicate("unit type", &name, || {
                        self.unit_type_drafts.iter().any(|t| t.name == name)
                    })?;

                    let mut color = 0xFFFFFF;
                    let mut radius = 1;
                    let mut targets = Vec::new();
                    let mut rule_names = Vec::new();
                    let mut caps = Vec::new();
                    let mut amounts = Vec::new();

                    loop {
                        let token = self.expect()?;
                        match token {
                            "color" => color = self.expect().and_then(|t| self.to_color(t))?,
                            "mapRadius" => radius = self.expect().and_then(|t| self.to_u32(t))?,
                            "targets" => targets = self.parse_string_array()?,
                            "caps" => caps = self.parse_amount_array()?,
                            "resources" => amounts = self.parse_amount_array()?,
                            "rules" => rule_names = self.parse_string_array()?,
                            "unit" | "end" => {
                                self.scanner.push_back(token);
                                break;
                            }
                            other => {
                                return Err(ScriptError::UnknownToken {
                                    token: other.to_string(),
                                    section: self.section,
                                })
                            }
                        }
                    }

                    // Starting amounts without a declared cap would have
                    // unspecified bounds; reject the script instead
                    let mut bag = ResourceBag::new();
                    for (res, cap) in &caps {
                        bag.add_type(res, *cap);
                    }
                    for (res, amount) in &amounts {
                        if !bag.has_resource(res) {
                            return Err(ScriptError::MissingCap {
                                unit: name,
                                resource: res.clone(),
                            });
                        }
                        bag.add(res, *amount);
                    }

                    self.unit_type_drafts.push(UnitTypeDraft {
                        name,
                        color,
                        radius,
                        targets,
                        resources: bag,
                        rule_names,
                    });
                }
                other => {
                    return Err(ScriptError::UnknownToken {
                        token: other.to_string(),
                        section: self.section,
                    })
                }
            }
        }
    }

    fn parse_rules(&mut self) -> ParseResult<()> {
        self.section = "rules";
        loop {
            match self.expect()? {
                "end" => return Ok(()),
                "mapRule" => self.parse_map_rule()?,
                "unitRule" => self.parse_unit_rule()?,
                other => {
                    return Err(ScriptError::UnknownToken {
                        token: other.to_string(),
                        section: self.section,
                    })
                }
            }
        }
    }

    fn parse_map_rule(&mut self) -> ParseResult<()> {
        self.section = "mapRule";
        let name = self.expect()?.to_string();
        self.check_duplicate("map rule", &name, || {
            self.map_rules.iter().any(|r| r.name == name)
        })?;

        let mut rule = MapRule {
            name,
            rate: 1,
            random_tiles: false,
            random_tiles_percent: 0,
            commands: Vec::new(),
        };

        loop {
            let token = self.expect()?;
            match token {
                "end" => break,
                "rate" => rule.rate = self.expect().and_then(|t| self.to_u32(t))?,
                "randomTiles" => {
                    rule.random_tiles = self.expect().and_then(|t| self.to_bool(t))?
                }
                "randomTilesPercent" => {
                    // The keyword may trail a command line; either way it
                    // configures the rule, not the command
                    rule.random_tiles = true;
                    rule.random_tiles_percent =
                        self.expect().and_then(|t| self.to_percent(t))?;
                }
                first => {
                    let command = self.parse_command(first)?;
                    self.section = "mapRule";
                    rule.commands.push(command);
                }
            }
        }

        self.map_rules.push(Arc::new(rule));
        self.section = "rules";
        Ok(())
    }

    fn parse_unit_rule(&mut self) -> ParseResult<()> {
        self.section = "unitRule";
        let name = self.expect()?.to_string();
        self.check_duplicate("unit rule", &name, || {
            self.unit_rule_drafts.iter().any(|r| r.name == name)
        })?;

        let mut draft = UnitRuleDraft {
            name,
            rate: 1,
            commands: Vec::new(),
            on_fail: None,
        };

        loop {
            let token = self.expect()?;
            match token {
                "end" => break,
                "rate" => draft.rate = self.expect().and_then(|t| self.to_u32(t))?,
                "onFail" => draft.on_fail = Some(self.expect()?.to_string()),
                first => {
                    let command = self.parse_command(first)?;
                    self.section = "unitRule";
                    draft.commands.push(command);
                }
            }
        }

        self.unit_rule_drafts.push(draft);
        self.section = "rules";
        Ok(())
    }

    fn parse_command(&mut self, first: &'a str) -> ParseResult<RuleCommand> {
        self.section = "command";
        let target = match first {
            "local" => {
                let res = self.expect()?;
                self.check_resource(res)?;
                RuleValue::Local(res.to_string())
            }
            "global" => {
                let res = self.expect()?;
                self.check_resource(res)?;
                RuleValue::Global(res.to_string())
            }
            "map" => RuleValue::Map(self.expect()?.to_string()),
            "agent" => return self.parse_agent_command(),
            other => {
                return Err(ScriptError::UnknownToken {
                    token: other.to_string(),
                    section: self.section,
                })
            }
        };

        let op = self.expect()?;
        let amount = self.expect().and_then(|t| self.to_u32(t))?;
        let command = match op {
            "add" => RuleCommand::Add { target, amount },
            "remove" => RuleCommand::Remove { target, amount },
            "greater" => RuleCommand::Test {
                target,
                comparison: Comparison::Greater,
                amount,
            },
            "less" => RuleCommand::Test {
                target,
                comparison: Comparison::Less,
                amount,
            },
            "equals" => RuleCommand::Test {
                target,
                comparison: Comparison::Equals,
                amount,
            },
            other => {
                return Err(ScriptError::UnknownToken {
                    token: other.to_string(),
                    section: self.section,
                })
            }
        };
        Ok(command)
    }

    /// `agent <type> to <unit> add [ <res> <n> ... ]`
    fn parse_agent_command(&mut self) -> ParseResult<RuleCommand> {
        let type_name = self.expect()?;
        let agent = self
            .agent_types
            .iter()
            .find(|t| t.name == type_name)
            .cloned()
            .ok_or_else(|| ScriptError::Undefined {
                kind: "agent type",
                name: type_name.to_string(),
            })?;

        let mut target = String::new();
        loop {
            match self.expect()? {
                "to" => target = self.expect()?.to_string(),
                "add" => {
                    let mut payload = ResourceBag::new();
                    for (res, amount) in self.parse_amount_array()? {
                        payload.add(&res, amount);
                    }
                    return Ok(RuleCommand::SpawnAgent {
                        agent,
                        target,
                        payload,
                    });
                }
                other => {
                    return Err(ScriptError::UnknownToken {
                        token: other.to_string(),
                        section: self.section,
                    })
                }
            }
        }
    }

    // --- end-of-parse resolution --------------------------------------

    fn finalize(self) -> ParseResult<TypeCatalog> {
        let Parser {
            resources,
            path_types,
            way_types,
            agent_types,
            map_rules,
            unit_rule_drafts,
            map_type_drafts,
            unit_type_drafts,
            ..
        } = self;

        let unit_rules = resolve_unit_rules(unit_rule_drafts)?;

        let mut map_types = Vec::with_capacity(map_type_drafts.len());
        for (mut ty, rule_names) in map_type_drafts {
            for rule_name in &rule_names {
                let rule = map_rules
                    .iter()
                    .find(|r| &r.name == rule_name)
                    .cloned()
                    .ok_or_else(|| ScriptError::Undefined {
                        kind: "map rule",
                        name: rule_name.clone(),
                    })?;
                ty.rules.push(rule);
            }
            map_types.push(ty);
        }

        let mut unit_types = Vec::with_capacity(unit_type_drafts.len());
        for draft in unit_type_drafts {
            let mut rules = Vec::with_capacity(draft.rule_names.len());
            for rule_name in &draft.rule_names {
                let rule = unit_rules
                    .iter()
                    .find(|r| &r.name == rule_name)
                    .cloned()
                    .ok_or_else(|| ScriptError::Undefined {
                        kind: "unit rule",
                        name: rule_name.clone(),
                    })?;
                rules.push(rule);
            }
            unit_types.push(Arc::new(UnitType {
                name: draft.name,
                color: draft.color,
                radius: draft.radius,
                targets: draft.targets,
                resources: draft.resources,
                rules,
            }));
        }

        Ok(TypeCatalog {
            resources,
            path_types,
            way_types,
            agent_types,
            map_types,
            unit_types,
            map_rules,
            unit_rules,
        })
    }
}

/// Build unit rules in dependency order so each `onFail` target is an
/// already-built rule. A stalled pass means the chain loops back on
/// itself, which is rejected.
fn resolve_unit_rules(drafts: Vec<UnitRuleDraft>) -> ParseResult<Vec<Arc<UnitRule>>> {
    for draft in &drafts {
        if let Some(target) = &draft.on_fail {
            if !drafts.iter().any(|d| &d.name == target) {
                return Err(ScriptError::Undefined {
                    kind: "unit rule",
                    name: target.clone(),
                });
            }
        }
    }

    let order: Vec<String> = drafts.iter().map(|d| d.name.clone()).collect();
    let mut built: AHashMap<String, Arc<UnitRule>> = AHashMap::new();
    let mut pending = drafts;

    while !pending.is_empty() {
        let mut progressed = false;
        let mut stalled = Vec::new();
        for draft in pending {
            let resolved = match &draft.on_fail {
                None => Some(None),
                Some(target) => built.get(target).cloned().map(Some),
            };
            match resolved {
                Some(on_fail) => {
                    let rule = Arc::new(UnitRule {
                        name: draft.name.clone(),
                        rate: draft.rate,
                        commands: draft.commands,
                        on_fail,
                    });
                    built.insert(draft.name, rule);
                    progressed = true;
                }
                None => stalled.push(draft),
            }
        }
        if !progressed {
            return Err(ScriptError::OnFailCycle {
                rule: stalled[0].name.clone(),
            });
        }
        pending = stalled;
    }

    Ok(order
        .into_iter()
        .map(|name| built.remove(&name).expect("every draft was built"))
        .collect())
}
