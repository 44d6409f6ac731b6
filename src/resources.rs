//! Resource primitives - named scalar quantities held in capacity-bounded bags
//!
//! A [`Resource`] is the basic currency of the simulation: citizens, water,
//! electricity, trash. Bags hold one entry per resource type and preserve
//! insertion order so iteration is deterministic.

use serde::{Deserialize, Serialize};

/// A single named quantity bounded by a capacity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    name: String,
    amount: u32,
    capacity: u32,
}

impl Resource {
    /// Create an empty resource with unlimited capacity
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            amount: 0,
            capacity: u32::MAX,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn has_amount(&self) -> bool {
        self.amount > 0
    }

    /// Increase the amount, saturating at the capacity
    pub fn add(&mut self, n: u32) {
        self.amount = self.amount.saturating_add(n).min(self.capacity);
    }

    /// Decrease the amount, flooring at zero
    pub fn remove(&mut self, n: u32) {
        self.amount = self.amount.saturating_sub(n);
    }

    /// Change the capacity, clamping the current amount down if needed
    pub fn set_capacity(&mut self, capacity: u32) {
        self.capacity = capacity;
        if self.amount > capacity {
            self.amount = capacity;
        }
    }

    /// Move as much as the recipient can take, leaving the rest here
    pub fn transfer_to(&mut self, target: &mut Resource) {
        let moved = self.amount.min(target.capacity.saturating_sub(target.amount));
        self.remove(moved);
        target.add(moved);
    }
}

/// Ordered collection of resources: one entry per type
///
/// Example: House = { Citizen 0/2, Money 1/10, Electricity 3/3 }.
/// Entries are created on first touch with unlimited capacity;
/// `set_capacity` (or the script's `caps` array) bounds them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceBag {
    entries: Vec<Resource>,
}

impl ResourceBag {
    pub fn new() -> Self {
        Self::default()
    }

    fn find(&self, name: &str) -> Option<&Resource> {
        self.entries.iter().find(|r| r.name == name)
    }

    fn find_or_insert(&mut self, name: &str) -> &mut Resource {
        if let Some(i) = self.entries.iter().position(|r| r.name == name) {
            &mut self.entries[i]
        } else {
            self.entries.push(Resource::new(name));
            let last = self.entries.len() - 1;
            &mut self.entries[last]
        }
    }

    /// Declare a resource type with the given capacity
    pub fn add_type(&mut self, name: &str, capacity: u32) {
        self.find_or_insert(name).set_capacity(capacity);
    }

    /// Current amount of the named resource, 0 if absent
    pub fn get(&self, name: &str) -> u32 {
        self.find(name).map(|r| r.amount).unwrap_or(0)
    }

    /// Capacity of the named resource; absent types report unlimited
    /// because an `add` would create them that way
    pub fn capacity(&self, name: &str) -> u32 {
        self.find(name).map(|r| r.capacity).unwrap_or(u32::MAX)
    }

    /// True if `n` more of the named resource would fit without saturating
    pub fn can_add(&self, name: &str, n: u32) -> bool {
        match self.find(name) {
            Some(r) => r.amount.saturating_add(n) <= r.capacity,
            None => true,
        }
    }

    /// True if at least `n` of the named resource is held
    pub fn can_remove(&self, name: &str, n: u32) -> bool {
        self.get(name) >= n
    }

    /// Add `n`, saturating at capacity. Creates the entry on first touch.
    pub fn add(&mut self, name: &str, n: u32) {
        self.find_or_insert(name).add(n);
    }

    /// Remove `n`. Fails (and changes nothing) if the bag holds less.
    pub fn remove(&mut self, name: &str, n: u32) -> bool {
        match self.entries.iter_mut().find(|r| r.name == name) {
            Some(r) if r.amount >= n => {
                r.remove(n);
                true
            }
            _ => false,
        }
    }

    /// Change the capacity of a resource, creating the entry if absent
    pub fn set_capacity(&mut self, name: &str, capacity: u32) {
        self.find_or_insert(name).set_capacity(capacity);
    }

    /// Copy every capacity from another bag onto this one
    pub fn set_capacities(&mut self, capacities: &ResourceBag) {
        for r in &capacities.entries {
            self.set_capacity(&r.name, r.capacity);
        }
    }

    /// Add every amount from another bag into this one
    pub fn add_resources(&mut self, other: &ResourceBag) {
        for r in &other.entries {
            self.add(&r.name, r.amount);
        }
    }

    /// Remove every amount of another bag from this one (best effort per type)
    pub fn remove_resources(&mut self, other: &ResourceBag) {
        for r in &other.entries {
            self.remove(&r.name, r.amount);
        }
    }

    /// Move everything into the recipient, each type limited by the
    /// recipient's remaining capacity
    pub fn transfer_to(&mut self, target: &mut ResourceBag) {
        for i in 0..self.entries.len() {
            let name = self.entries[i].name.clone();
            let dst = target.find_or_insert(&name);
            self.entries[i].transfer_to(dst);
        }
    }

    /// True if every entry holds zero
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|r| !r.has_amount())
    }

    pub fn has_resource(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_saturates_at_capacity() {
        let mut bag = ResourceBag::new();
        bag.add_type("Wood", 50);

        bag.add("Wood", 30);
        assert_eq!(bag.get("Wood"), 30);

        bag.add("Wood", 30);
        assert_eq!(bag.get("Wood"), 50);
    }

    #[test]
    fn remove_fails_when_insufficient() {
        let mut bag = ResourceBag::new();
        bag.add("Stone", 5);

        assert!(!bag.remove("Stone", 6));
        assert_eq!(bag.get("Stone"), 5);

        assert!(bag.remove("Stone", 5));
        assert_eq!(bag.get("Stone"), 0);
        assert!(!bag.remove("Missing", 1));
    }

    #[test]
    fn add_then_remove_round_trips_unless_saturated() {
        let mut bag = ResourceBag::new();
        bag.add_type("Water", 10);
        bag.add("Water", 4);

        bag.add("Water", 3);
        assert!(bag.remove("Water", 3));
        assert_eq!(bag.get("Water"), 4);

        // Saturated add loses the overflow, so the law breaks down
        bag.add("Water", 100);
        assert_eq!(bag.get("Water"), 10);
        assert!(!bag.remove("Water", 100));
    }

    #[test]
    fn can_add_is_strict_and_open_for_new_types() {
        let mut bag = ResourceBag::new();
        bag.add_type("People", 4);
        bag.add("People", 4);

        assert!(!bag.can_add("People", 1));
        assert!(bag.can_add("Anything", 1_000_000));
    }

    #[test]
    fn set_capacity_clamps_amount() {
        let mut bag = ResourceBag::new();
        bag.add("Trash", 9);
        bag.set_capacity("Trash", 3);
        assert_eq!(bag.get("Trash"), 3);
        assert_eq!(bag.capacity("Trash"), 3);
    }

    #[test]
    fn transfer_respects_recipient_capacity() {
        let mut src = ResourceBag::new();
        src.add("Food", 10);

        let mut dst = ResourceBag::new();
        dst.add_type("Food", 6);

        src.transfer_to(&mut dst);
        assert_eq!(dst.get("Food"), 6);
        assert_eq!(src.get("Food"), 4);
        assert!(!src.is_empty());
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut bag = ResourceBag::new();
        bag.add("B", 1);
        bag.add("A", 1);
        bag.add("C", 1);

        let names: Vec<_> = bag.iter().map(|r| r.name().to_string()).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
    }
}
