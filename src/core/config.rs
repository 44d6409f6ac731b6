//! Engine constants with documented rationale
//!
//! All fixed timing and spatial constants are collected here so their
//! interactions are visible in one place.

/// Number of simulation ticks per simulated second.
///
/// Rules fire on tick boundaries, so this sets the finest rate at which
/// any rule can run. Agent speeds are expressed in world units per
/// second and divided down by this value each tick.
pub const TICKS_PER_SECOND: f32 = 200.0;

/// Duration of one tick in seconds (5 ms).
pub const TICK_INTERVAL: f32 = 1.0 / TICKS_PER_SECOND;

/// Upper bound on catch-up ticks per `Simulation::update` call.
///
/// Caps worst-case latency when the caller stalls: at most 20 ticks
/// (100 ms of simulated time) are replayed per call, and any remaining
/// backlog is discarded rather than snowballing.
pub const MAX_ITERATIONS_PER_UPDATE: u32 = 20;

/// World-space edge length of one map cell.
pub const GRID_SIZE: f32 = 1.0;
