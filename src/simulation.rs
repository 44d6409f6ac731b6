//! Fixed-timestep simulation driver
//!
//! Owns the cities, the type catalog built by the script parser, the
//! deterministic RNG stream, and the listener callbacks. Real time fed
//! into `update` is drained in 5 ms ticks, capped per call so a stalled
//! caller cannot trigger an unbounded catch-up burst.

use glam::Vec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::city::{City, CityEvent};
use crate::core::config::{MAX_ITERATIONS_PER_UPDATE, TICK_INTERVAL};
use crate::core::error::{EngineError, Result};
use crate::core::types::{AgentId, UnitId};
use crate::script::{parse_script, TypeCatalog};

/// Callback sink for entity lifecycle events. Ids are the stable
/// handles; a removed agent's id refers to an entry no longer in the
/// city's arena.
pub trait SimulationListener {
    fn on_city_added(&mut self, _city: &City) {}
    fn on_unit_added(&mut self, _city: &City, _unit: UnitId) {}
    fn on_agent_added(&mut self, _city: &City, _agent: AgentId) {}
    fn on_agent_removed(&mut self, _city: &City, _agent: AgentId) {}
}

/// Listener that ignores everything
pub struct NullListener;

impl SimulationListener for NullListener {}

pub struct Simulation {
    grid_u: u32,
    grid_v: u32,
    catalog: TypeCatalog,
    cities: Vec<City>,
    time_budget: f32,
    total_ticks: u64,
    rng: ChaCha8Rng,
    listener: Box<dyn SimulationListener>,
}

impl Simulation {
    /// Simulation over `grid_u x grid_v` maps, RNG seeded with 0
    pub fn new(grid_u: u32, grid_v: u32) -> Self {
        Self::with_seed(grid_u, grid_v, 0)
    }

    /// Simulation with an explicit seed for the stochastic map-rule
    /// stream. Equal seeds and equal update deltas replay identically.
    pub fn with_seed(grid_u: u32, grid_v: u32, seed: u64) -> Self {
        Self {
            grid_u,
            grid_v,
            catalog: TypeCatalog::default(),
            cities: Vec::new(),
            time_budget: 0.0,
            total_ticks: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            listener: Box::new(NullListener),
        }
    }

    /// Replace the listener. There is exactly one sink at a time.
    pub fn set_listener(&mut self, listener: Box<dyn SimulationListener>) {
        self.listener = listener;
    }

    /// Parse a scenario script, replacing the current type catalog
    pub fn parse_str(&mut self, text: &str) -> Result<()> {
        self.catalog = parse_script(text)?;
        Ok(())
    }

    /// Parse a scenario script from a file
    pub fn parse_file(&mut self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let text = std::fs::read_to_string(path)?;
        self.parse_str(&text)
    }

    pub fn types(&self) -> &TypeCatalog {
        &self.catalog
    }

    pub fn grid_u(&self) -> u32 {
        self.grid_u
    }

    pub fn grid_v(&self) -> u32 {
        self.grid_v
    }

    /// Ticks executed since construction
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// Create a city. Duplicate names are construction errors.
    pub fn add_city(&mut self, name: &str, position: Vec3) -> Result<&mut City> {
        if self.cities.iter().any(|c| c.name() == name) {
            return Err(EngineError::Duplicate {
                kind: "city",
                name: name.to_string(),
            });
        }
        let city = City::new(name, position, self.grid_u, self.grid_v)?;
        self.listener.on_city_added(&city);
        let index = self.cities.len();
        self.cities.push(city);
        Ok(&mut self.cities[index])
    }

    pub fn city(&self, name: &str) -> Option<&City> {
        self.cities.iter().find(|c| c.name() == name)
    }

    pub fn city_mut(&mut self, name: &str) -> Option<&mut City> {
        self.cities.iter_mut().find(|c| c.name() == name)
    }

    /// Cities in insertion order
    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    /// Advance simulated time by `delta_seconds` of real time.
    ///
    /// Accumulated time is drained in whole ticks, at most
    /// [`MAX_ITERATIONS_PER_UPDATE`] per call; any backlog beyond one
    /// interval after the cap is dropped.
    pub fn update(&mut self, delta_seconds: f32) {
        self.time_budget += delta_seconds;

        let mut iterations = 0;
        while self.time_budget >= TICK_INTERVAL && iterations < MAX_ITERATIONS_PER_UPDATE {
            self.tick();
            self.time_budget -= TICK_INTERVAL;
            iterations += 1;
        }

        if self.time_budget > TICK_INTERVAL {
            self.time_budget = 0.0;
        }
    }

    /// Run exactly one tick over every city, in insertion order
    pub fn tick(&mut self) {
        self.total_ticks += 1;
        let Self {
            cities,
            rng,
            listener,
            ..
        } = self;
        for city in cities.iter_mut() {
            city.update(rng);
            let events = city.take_events();
            let city = &*city;
            for event in events {
                match event {
                    CityEvent::UnitAdded(id) => listener.on_unit_added(city, id),
                    CityEvent::AgentAdded(id) => listener.on_agent_added(city, id),
                    CityEvent::AgentRemoved(id) => listener.on_agent_removed(city, id),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_drains_whole_ticks() {
        let mut sim = Simulation::new(4, 4);
        sim.add_city("Paris", Vec3::ZERO).unwrap();

        sim.update(TICK_INTERVAL * 3.0);
        assert_eq!(sim.total_ticks(), 3);

        // Sub-interval remainder stays banked
        sim.update(TICK_INTERVAL * 0.5);
        assert_eq!(sim.total_ticks(), 3);
        sim.update(TICK_INTERVAL * 0.5);
        assert_eq!(sim.total_ticks(), 4);
    }

    #[test]
    fn update_caps_catchup_and_drops_backlog() {
        let mut sim = Simulation::new(4, 4);
        sim.add_city("Paris", Vec3::ZERO).unwrap();

        // One second of backlog is 200 ticks; only 20 run and the rest
        // is discarded
        sim.update(1.0);
        assert_eq!(sim.total_ticks(), MAX_ITERATIONS_PER_UPDATE as u64);

        sim.update(0.0);
        assert_eq!(sim.total_ticks(), MAX_ITERATIONS_PER_UPDATE as u64);
    }

    #[test]
    fn duplicate_city_names_are_rejected() {
        let mut sim = Simulation::new(4, 4);
        sim.add_city("Paris", Vec3::ZERO).unwrap();
        assert!(sim.add_city("Paris", Vec3::ZERO).is_err());
    }
}
