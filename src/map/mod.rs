//! Scalar resource grids overlaying a city
//!
//! A map stores one `u32` per cell, bounded by the map type's capacity.
//! Rules read and write cells either one at a time or scattered over a
//! Chebyshev disk around a center cell.

pub mod radius;

use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::config::GRID_SIZE;
use crate::core::types::{Color, Tick};
use crate::map::radius::cells_within_radius;
use crate::rules::MapRule;

/// Type definition for a map, built by the script parser
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapType {
    pub name: String,
    pub color: Color,
    /// Upper bound for every cell of this map
    pub capacity: u32,
    pub rules: Vec<Arc<MapRule>>,
}

impl MapType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: 0xFFFFFF,
            capacity: u32::MAX,
            rules: Vec::new(),
        }
    }
}

/// A `u x v` grid of bounded cell values
#[derive(Debug, Clone)]
pub struct Map {
    ty: MapType,
    position: Vec3,
    size_u: u32,
    size_v: u32,
    cells: Vec<u32>,
    ticks: Tick,
}

impl Map {
    pub fn new(ty: MapType, position: Vec3, size_u: u32, size_v: u32) -> Self {
        Self {
            ty,
            position,
            size_u,
            size_v,
            cells: vec![0; (size_u * size_v) as usize],
            ticks: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.ty.name
    }

    pub fn map_type(&self) -> &MapType {
        &self.ty
    }

    pub fn color(&self) -> Color {
        self.ty.color
    }

    pub fn capacity(&self) -> u32 {
        self.ty.capacity
    }

    pub fn size_u(&self) -> u32 {
        self.size_u
    }

    pub fn size_v(&self) -> u32 {
        self.size_v
    }

    pub fn ticks(&self) -> Tick {
        self.ticks
    }

    /// Advance the per-map tick counter, returning the new value
    pub(crate) fn bump_ticks(&mut self) -> Tick {
        self.ticks += 1;
        self.ticks
    }

    #[inline]
    fn index(&self, u: u32, v: u32) -> Option<usize> {
        if u < self.size_u && v < self.size_v {
            Some((v * self.size_u + u) as usize)
        } else {
            None
        }
    }

    /// Cell value, 0 for out-of-bounds coordinates
    pub fn get(&self, u: u32, v: u32) -> u32 {
        self.index(u, v).map(|i| self.cells[i]).unwrap_or(0)
    }

    /// Overwrite a cell, clamped to the capacity
    pub fn set(&mut self, u: u32, v: u32, value: u32) {
        let capacity = self.ty.capacity;
        if let Some(i) = self.index(u, v) {
            self.cells[i] = value.min(capacity);
        }
    }

    /// Add to one cell, saturating at the capacity
    pub fn add(&mut self, u: u32, v: u32, n: u32) {
        let capacity = self.ty.capacity;
        if let Some(i) = self.index(u, v) {
            self.cells[i] = self.cells[i].saturating_add(n).min(capacity);
        }
    }

    /// Remove from one cell, flooring at zero
    pub fn remove(&mut self, u: u32, v: u32, n: u32) {
        if let Some(i) = self.index(u, v) {
            self.cells[i] = self.cells[i].saturating_sub(n);
        }
    }

    /// Sum of all cells inside the Chebyshev disk of `radius` around `(u, v)`
    pub fn sum_radius(&self, u: u32, v: u32, radius: u32) -> u32 {
        cells_within_radius(u, v, radius, self.size_u, self.size_v)
            .into_iter()
            .map(|(cu, cv)| self.get(cu, cv))
            .fold(0u32, |acc, x| acc.saturating_add(x))
    }

    /// Remaining headroom summed over the disk
    pub fn headroom_radius(&self, u: u32, v: u32, radius: u32) -> u32 {
        cells_within_radius(u, v, radius, self.size_u, self.size_v)
            .into_iter()
            .map(|(cu, cv)| self.ty.capacity.saturating_sub(self.get(cu, cv)))
            .fold(0u32, |acc, x| acc.saturating_add(x))
    }

    /// Distribute `n` evenly across the in-bounds disk cells, saturating
    /// each at the capacity. The division remainder is discarded.
    pub fn add_radius(&mut self, u: u32, v: u32, radius: u32, n: u32) {
        let cells = cells_within_radius(u, v, radius, self.size_u, self.size_v);
        if cells.is_empty() {
            return;
        }
        let share = n / cells.len() as u32;
        if share == 0 {
            return;
        }
        for (cu, cv) in cells {
            self.add(cu, cv, share);
        }
    }

    /// Remove `n` spread evenly across the disk, flooring each cell at zero
    pub fn remove_radius(&mut self, u: u32, v: u32, radius: u32, n: u32) {
        let cells = cells_within_radius(u, v, radius, self.size_u, self.size_v);
        if cells.is_empty() {
            return;
        }
        let share = n / cells.len() as u32;
        if share == 0 {
            return;
        }
        for (cu, cv) in cells {
            self.remove(cu, cv, share);
        }
    }

    /// World position of a cell corner relative to the owning city
    pub fn world_position(&self, u: u32, v: u32) -> Vec3 {
        let cu = u.min(self.size_u) as f32;
        let cv = v.min(self.size_v) as f32;
        self.position + Vec3::new(cu * GRID_SIZE, cv * GRID_SIZE, 0.0)
    }

    /// Shift the map origin (used when the owning city moves)
    pub fn translate(&mut self, direction: Vec3) {
        self.position += direction;
    }
}
