//! End-to-end simulation scenarios
//!
//! These tests drive the full engine through the public API: parse a
//! scenario script, build a city from the catalog, and pump ticks.
//! They verify:
//! - map rules sweeping a grid up to capacity
//! - units spawning carriers that deliver payloads over real distances
//! - all-or-nothing rule execution with onFail fallbacks
//! - radius scatter distribution
//! - way splitting leaving placed units where they were
//! - deterministic routing and stochastic-mode reproducibility

use std::sync::{Arc, Mutex};

use glam::Vec3;
use glassbox::core::config::TICK_INTERVAL;
use glassbox::{City, NodeId, PathId, Simulation, SimulationListener, UnitId, WayId};

/// Build a city with one straight road: two nodes `length` apart
fn straight_road(city: &mut City, length: f32) -> (PathId, NodeId, NodeId, WayId) {
    let catalog_path = glassbox::PathType::new("Road");
    let pid = city.add_path(&catalog_path).unwrap();
    let path = city.path_mut(pid).unwrap();
    let a = path.add_node(Vec3::ZERO);
    let b = path.add_node(Vec3::new(length, 0.0, 0.0));
    let w = path
        .add_way(&glassbox::WayType::new("Dirt"), a, b)
        .unwrap();
    (pid, a, b, w)
}

// ============================================================================
// Scenario: a sweep rule fills a map to capacity and stops
// ============================================================================

#[test]
fn water_fills_every_cell_up_to_capacity() {
    let mut sim = Simulation::new(4, 4);
    sim.parse_str(
        r#"
resources resource Water end
rules mapRule AddWater rate 1 map Water add 1 end end
maps map Water capacity 10 rules [ AddWater ] end
"#,
    )
    .unwrap();

    let water_type = sim.types().map_type("Water").unwrap().clone();
    let city = sim.add_city("Paris", Vec3::ZERO).unwrap();
    city.add_map(&water_type).unwrap();

    for _ in 0..10 {
        sim.tick();
    }
    let map = sim.city("Paris").unwrap().map("Water").unwrap();
    for v in 0..4 {
        for u in 0..4 {
            assert_eq!(map.get(u, v), 10, "cell ({u}, {v}) after 10 ticks");
        }
    }

    // Saturated: one more tick changes nothing
    sim.tick();
    let map = sim.city("Paris").unwrap().map("Water").unwrap();
    for v in 0..4 {
        for u in 0..4 {
            assert_eq!(map.get(u, v), 10, "cell ({u}, {v}) after 11 ticks");
        }
    }
}

// ============================================================================
// Scenario: Home sends People to Work over a 100-unit road
// ============================================================================

const PEOPLE_TO_WORK: &str = r#"
resources resource People end
agents agent People color 0xFFFF00 speed 50 end
rules
  unitRule Send
    rate 1
    local People remove 1
    agent People to Work add [ People 1 ]
  end
end
units
  unit Home color 0x00FF00 targets [ Home ] caps [ People 4 ]
    resources [ People 4 ] rules [ Send ]
  unit Work color 0xFF0000 targets [ Work ] caps [ People 100 ]
    resources [ ]
end
"#;

#[test]
fn people_walk_to_work_and_arrive_on_schedule() {
    let mut sim = Simulation::new(8, 8);
    sim.parse_str(PEOPLE_TO_WORK).unwrap();

    let home = sim.types().unit_type("Home").unwrap().clone();
    let work = sim.types().unit_type("Work").unwrap().clone();

    let city = sim.add_city("Paris", Vec3::ZERO).unwrap();
    let (pid, _, _, w) = straight_road(city, 100.0);
    let home_id = city.add_unit(home, pid, w, 0.0).unwrap();
    let work_id = city.add_unit(work, pid, w, 1.0).unwrap();

    // First tick: one carrier dispatched, one person gone from Home
    sim.tick();
    {
        let city = sim.city("Paris").unwrap();
        assert_eq!(city.unit(home_id).unwrap().resources().get("People"), 3);
        assert_eq!(city.agents().len(), 1);
    }

    // Home drains by one per tick until empty; the rule then fails
    // validation and nothing else spawns
    for _ in 1..10 {
        sim.tick();
    }
    {
        let city = sim.city("Paris").unwrap();
        assert_eq!(city.unit(home_id).unwrap().resources().get("People"), 0);
        assert_eq!(city.agents().len(), 4);
    }

    // Speed 50 covers 0.25 units per tick; 100 units take 400 ticks.
    // Nothing arrives before then.
    while sim.total_ticks() < 399 {
        sim.tick();
    }
    assert_eq!(
        sim.city("Paris")
            .unwrap()
            .unit(work_id)
            .unwrap()
            .resources()
            .get("People"),
        0,
        "no arrival before tick 400"
    );

    sim.tick(); // tick 400
    assert_eq!(
        sim.city("Paris")
            .unwrap()
            .unit(work_id)
            .unwrap()
            .resources()
            .get("People"),
        1,
        "first arrival on tick 400"
    );

    // The remaining three follow one tick apart
    for _ in 0..3 {
        sim.tick();
    }
    let city = sim.city("Paris").unwrap();
    assert_eq!(city.unit(work_id).unwrap().resources().get("People"), 4);
    assert!(city.agents().is_empty(), "all carriers delivered and died");
}

#[test]
fn agent_count_never_exceeds_the_supply() {
    let mut sim = Simulation::new(8, 8);
    sim.parse_str(PEOPLE_TO_WORK).unwrap();

    let home = sim.types().unit_type("Home").unwrap().clone();
    let work = sim.types().unit_type("Work").unwrap().clone();
    let city = sim.add_city("Paris", Vec3::ZERO).unwrap();
    let (pid, _, _, w) = straight_road(city, 100.0);
    city.add_unit(home, pid, w, 0.0).unwrap();
    city.add_unit(work, pid, w, 1.0).unwrap();

    for _ in 0..500 {
        sim.tick();
        assert!(sim.city("Paris").unwrap().agents().len() <= 4);
    }
}

// ============================================================================
// Scenario: rules apply completely or not at all
// ============================================================================

#[test]
fn failed_validation_leaves_no_trace() {
    let mut sim = Simulation::new(4, 4);
    sim.parse_str(
        r#"
resources resource Water resource Power end
rules
  unitRule Consume rate 1
    local Water remove 5
    local Power remove 3
  end
end
units
  unit Plant targets [ Plant ] caps [ Water 10 Power 10 ]
    resources [ Water 5 Power 2 ] rules [ Consume ]
end
"#,
    )
    .unwrap();

    let plant = sim.types().unit_type("Plant").unwrap().clone();
    let city = sim.add_city("Paris", Vec3::ZERO).unwrap();
    let (pid, _, _, w) = straight_road(city, 10.0);
    let plant_id = city.add_unit(plant, pid, w, 0.0).unwrap();

    // Power fails validation (2 < 3), so Water must not be touched
    for _ in 0..5 {
        sim.tick();
    }
    let unit = sim.city("Paris").unwrap().unit(plant_id).unwrap();
    assert_eq!(unit.resources().get("Water"), 5);
    assert_eq!(unit.resources().get("Power"), 2);
}

#[test]
fn on_fail_rule_runs_when_the_primary_aborts() {
    let mut sim = Simulation::new(4, 4);
    sim.parse_str(
        r#"
resources resource Water resource Power end
rules
  unitRule Refund rate 1 local Water add 1 end
  unitRule Consume rate 1 onFail Refund
    local Water remove 5
    local Power remove 3
  end
end
units
  unit Plant targets [ Plant ] caps [ Water 10 Power 10 ]
    resources [ Water 5 Power 2 ] rules [ Consume ]
end
"#,
    )
    .unwrap();

    let plant = sim.types().unit_type("Plant").unwrap().clone();
    let city = sim.add_city("Paris", Vec3::ZERO).unwrap();
    let (pid, _, _, w) = straight_road(city, 10.0);
    let plant_id = city.add_unit(plant, pid, w, 0.0).unwrap();

    sim.tick();
    let unit = sim.city("Paris").unwrap().unit(plant_id).unwrap();
    assert_eq!(unit.resources().get("Water"), 6, "fallback added one Water");
    assert_eq!(unit.resources().get("Power"), 2);
}

// ============================================================================
// Scenario: map commands scatter over the unit's radius
// ============================================================================

#[test]
fn radius_scatter_splits_evenly_over_the_disk() {
    let mut sim = Simulation::new(5, 5);
    sim.parse_str(
        r#"
resources resource Grass end
rules unitRule Spread rate 1 map Grass add 9 end end
maps map Grass capacity 10 end
units unit Park mapRadius 1 targets [ Park ] caps [ ] resources [ ] rules [ Spread ] end
"#,
    )
    .unwrap();

    let grass = sim.types().map_type("Grass").unwrap().clone();
    let park = sim.types().unit_type("Park").unwrap().clone();
    let city = sim.add_city("Paris", Vec3::ZERO).unwrap();
    city.add_map(&grass).unwrap();

    // Node at world (2, 2) lands on cell (2, 2)
    let pid = city.add_path(&glassbox::PathType::new("Road")).unwrap();
    let w = {
        let path = city.path_mut(pid).unwrap();
        let a = path.add_node(Vec3::new(2.0, 2.0, 0.0));
        let b = path.add_node(Vec3::new(3.0, 2.0, 0.0));
        path.add_way(&glassbox::WayType::new("Dirt"), a, b).unwrap()
    };
    city.add_unit(park, pid, w, 0.0).unwrap();

    sim.tick();

    let map = sim.city("Paris").unwrap().map("Grass").unwrap();
    // Nine cells in the Chebyshev disk each got floor(9/9) = 1
    for v in 1..=3 {
        for u in 1..=3 {
            assert_eq!(map.get(u, v), 1, "cell ({u}, {v})");
        }
    }
    assert_eq!(map.get(0, 0), 0);
    assert_eq!(map.get(4, 4), 0);
}

// ============================================================================
// Scenario: splitting a way leaves placed units in place
// ============================================================================

#[test]
fn split_way_preserves_unit_position() {
    let mut sim = Simulation::new(8, 8);
    sim.parse_str(
        r#"
resources resource People end
units unit Home targets [ Home ] caps [ People 4 ] resources [ ] end
"#,
    )
    .unwrap();

    let home = sim.types().unit_type("Home").unwrap().clone();
    let city = sim.add_city("Paris", Vec3::ZERO).unwrap();
    let (pid, n0, _, w) = straight_road(city, 100.0);

    // Placing at t = 0.7 splits the way and creates a node at x = 70
    let unit_id = city.add_unit(home, pid, w, 0.7).unwrap();
    let unit_node = city.unit(unit_id).unwrap().node();
    let before = city.path(pid).unwrap().node(unit_node).unwrap().position();
    assert!((before.x - 70.0).abs() < 1e-4);

    // Split the first half (N0 -> unit node, length 70) again
    let mid = city.path_mut(pid).unwrap().split_way(w, 0.5).unwrap();
    let path = city.path(pid).unwrap();
    assert!((path.node(mid).unwrap().position().x - 35.0).abs() < 1e-4);

    // The unit did not move and its node still lists it
    let after = path.node(unit_node).unwrap().position();
    assert_eq!(before, after);
    assert_eq!(path.node(unit_node).unwrap().units(), &[unit_id]);
    assert_eq!(city.unit(unit_id).unwrap().node(), unit_node);

    // The rewired first segment now runs N0 -> mid
    let first = path.way(w).unwrap();
    assert_eq!(first.from(), n0);
    assert_eq!(first.to(), mid);
    assert!((first.magnitude() - 35.0).abs() < 1e-4);
}

// ============================================================================
// Scenario: routing is deterministic across equal-cost alternatives
// ============================================================================

#[test]
fn diamond_routes_always_take_the_same_branch() {
    let mut sim = Simulation::new(8, 8);
    sim.parse_str(
        r#"
resources resource People end
agents agent People speed 10 end
units unit Work targets [ Work ] caps [ People 100 ] resources [ ] end
"#,
    )
    .unwrap();

    let work = sim.types().unit_type("Work").unwrap().clone();
    let people = sim.types().agent_type("People").unwrap().clone();
    let city = sim.add_city("Paris", Vec3::ZERO).unwrap();

    let pid = city.add_path(&glassbox::PathType::new("Road")).unwrap();
    let (start, upper, goal_way) = {
        let path = city.path_mut(pid).unwrap();
        let start = path.add_node(Vec3::ZERO);
        let upper = path.add_node(Vec3::new(5.0, 5.0, 0.0));
        let lower = path.add_node(Vec3::new(5.0, -5.0, 0.0));
        let goal = path.add_node(Vec3::new(10.0, 0.0, 0.0));
        let ty = glassbox::WayType::new("Dirt");
        path.add_way(&ty, start, upper).unwrap();
        path.add_way(&ty, start, lower).unwrap();
        path.add_way(&ty, upper, goal).unwrap();
        let goal_way = path.add_way(&ty, lower, goal).unwrap();
        (start, upper, goal_way)
    };
    city.add_unit(work, pid, goal_way, 1.0).unwrap();

    let mut payload = glassbox::ResourceBag::new();
    payload.add("People", 1);

    let mut first_routes = Vec::new();
    for _ in 0..5 {
        let id = city
            .add_agent(&people, pid, start, "Work", payload.clone())
            .unwrap();
        let agent = city.agent(id).unwrap();
        first_routes.push(agent.legs().to_vec());
    }

    for route in &first_routes {
        assert_eq!(route, &first_routes[0]);
        // Equal-length branches resolve to the lower node id
        assert_eq!(route[0].to, upper);
    }
}

// ============================================================================
// Stochastic mode and determinism
// ============================================================================

fn stochastic_script(percent: u32) -> String {
    format!(
        r#"
resources resource Grass end
rules mapRule Grow rate 1 randomTiles true randomTilesPercent {percent} map Grass add 1 end end
maps map Grass capacity 100 rules [ Grow ] end
"#
    )
}

fn grid_snapshot(city: &City, name: &str, size: u32) -> Vec<u32> {
    let map = city.map(name).unwrap();
    (0..size)
        .flat_map(|v| (0..size).map(move |u| map.get(u, v)))
        .collect()
}

#[test]
fn percent_extremes_fire_never_and_always() {
    for (percent, expected) in [(0u32, 0u32), (100, 1)] {
        let mut sim = Simulation::new(4, 4);
        sim.parse_str(&stochastic_script(percent)).unwrap();
        let grass = sim.types().map_type("Grass").unwrap().clone();
        let city = sim.add_city("Paris", Vec3::ZERO).unwrap();
        city.add_map(&grass).unwrap();

        sim.tick();
        let cells = grid_snapshot(sim.city("Paris").unwrap(), "Grass", 4);
        assert!(
            cells.iter().all(|&c| c == expected),
            "percent {percent} produced {cells:?}"
        );
    }
}

#[test]
fn equal_seeds_replay_identically() {
    let run = |seed: u64| {
        let mut sim = Simulation::with_seed(6, 6, seed);
        sim.parse_str(&stochastic_script(40)).unwrap();
        let grass = sim.types().map_type("Grass").unwrap().clone();
        let city = sim.add_city("Paris", Vec3::ZERO).unwrap();
        city.add_map(&grass).unwrap();
        for _ in 0..25 {
            sim.tick();
        }
        grid_snapshot(sim.city("Paris").unwrap(), "Grass", 6)
    };

    assert_eq!(run(7), run(7));
    assert_ne!(run(7), run(8), "different seeds should diverge");
}

#[test]
fn zero_rate_rules_never_fire() {
    let mut sim = Simulation::new(4, 4);
    sim.parse_str(
        r#"
resources resource Water end
rules mapRule AddWater rate 0 map Water add 1 end end
maps map Water capacity 10 rules [ AddWater ] end
"#,
    )
    .unwrap();

    let water = sim.types().map_type("Water").unwrap().clone();
    let city = sim.add_city("Paris", Vec3::ZERO).unwrap();
    city.add_map(&water).unwrap();

    for _ in 0..50 {
        sim.tick();
    }
    let cells = grid_snapshot(sim.city("Paris").unwrap(), "Water", 4);
    assert!(cells.iter().all(|&c| c == 0));
}

// ============================================================================
// Listener callbacks
// ============================================================================

#[derive(Default)]
struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
}

impl SimulationListener for Recorder {
    fn on_city_added(&mut self, city: &City) {
        self.events.lock().unwrap().push(format!("city:{}", city.name()));
    }
    fn on_unit_added(&mut self, _city: &City, unit: UnitId) {
        self.events.lock().unwrap().push(format!("unit:{}", unit.0));
    }
    fn on_agent_added(&mut self, _city: &City, agent: glassbox::AgentId) {
        self.events.lock().unwrap().push(format!("agent+:{}", agent.0));
    }
    fn on_agent_removed(&mut self, _city: &City, agent: glassbox::AgentId) {
        self.events.lock().unwrap().push(format!("agent-:{}", agent.0));
    }
}

#[test]
fn stranded_agents_fire_paired_callbacks() {
    let mut sim = Simulation::new(8, 8);
    sim.parse_str(
        r#"
resources resource People end
agents agent People speed 10 end
rules unitRule Send rate 1 agent People to Nowhere add [ People 1 ] end end
units unit Home targets [ Home ] caps [ People 4 ] resources [ ] rules [ Send ] end
"#,
    )
    .unwrap();

    let events = Arc::new(Mutex::new(Vec::new()));
    sim.set_listener(Box::new(Recorder {
        events: events.clone(),
    }));

    let home = sim.types().unit_type("Home").unwrap().clone();
    let city = sim.add_city("Paris", Vec3::ZERO).unwrap();
    let (pid, _, _, w) = straight_road(city, 10.0);
    city.add_unit(home, pid, w, 0.0).unwrap();

    // No unit anywhere answers to "Nowhere": the carrier spawns, is
    // marked dead on its first update, and both callbacks fire in order
    sim.tick();

    let log = events.lock().unwrap();
    assert_eq!(log[0], "city:Paris");
    assert!(log.contains(&"unit:0".to_string()));
    assert!(log.contains(&"agent+:0".to_string()));
    assert!(log.contains(&"agent-:0".to_string()));
    let added = log.iter().position(|e| e == "agent+:0").unwrap();
    let removed = log.iter().position(|e| e == "agent-:0").unwrap();
    assert!(added < removed);
}

// ============================================================================
// Invariants over a busy world
// ============================================================================

#[test]
fn capacities_hold_after_every_update() {
    let mut sim = Simulation::new(6, 6);
    sim.parse_str(
        r#"
resources resource People resource Water end
agents agent People speed 400 end
rules
  mapRule Rain rate 2 map Water add 3 end
  unitRule Send rate 3
    local People remove 1
    agent People to Work add [ People 1 ]
  end
  unitRule Restock rate 5 local People add 2 end
end
maps map Water capacity 20 rules [ Rain ] end
units
  unit Home targets [ Home ] caps [ People 6 ] resources [ People 6 ]
    rules [ Send Restock ]
  unit Work targets [ Work ] caps [ People 3 ] resources [ ]
end
"#,
    )
    .unwrap();

    let water = sim.types().map_type("Water").unwrap().clone();
    let home = sim.types().unit_type("Home").unwrap().clone();
    let work = sim.types().unit_type("Work").unwrap().clone();

    let city = sim.add_city("Paris", Vec3::ZERO).unwrap();
    city.add_map(&water).unwrap();
    let (pid, _, _, w) = straight_road(city, 4.0);
    city.add_unit(home, pid, w, 0.0).unwrap();
    city.add_unit(work, pid, w, 1.0).unwrap();

    for _ in 0..300 {
        sim.update(TICK_INTERVAL);
        let city = sim.city("Paris").unwrap();

        for unit in city.units() {
            for r in unit.resources().iter() {
                assert!(r.amount() <= r.capacity());
            }
        }
        let map = city.map("Water").unwrap();
        for v in 0..6 {
            for u in 0..6 {
                assert!(map.get(u, v) <= map.capacity());
            }
        }
        for agent in city.agents() {
            if let Some(leg) = agent.current_leg() {
                let magnitude = city
                    .path(agent.path())
                    .and_then(|p| p.way(leg.way))
                    .map(|w| w.magnitude())
                    .unwrap();
                assert!(agent.offset() >= 0.0 && agent.offset() <= magnitude);
            }
        }
    }
}
