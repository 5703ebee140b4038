//! Takeaway packages the player fills with burgers
//!
//! Capacity is global: accepting an order rewrites the capacity of every live
//! package, not only the one meant for that order. Two orders in flight with
//! different sizes therefore share whichever capacity was broadcast last.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use log::debug;

use super::types::{PackageId, SimId};

/// Who currently holds a package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageHolder {
    Player,
    DeliverySlot,
    World,
}

/// A package in the simulation
#[derive(Debug, Clone)]
pub struct Package {
    pub id: PackageId,
    capacity: u32,
    fill_count: u32,
    pub holder: PackageHolder,
}

impl Package {
    pub fn new(id: PackageId, capacity: u32) -> Self {
        Self {
            id,
            capacity,
            fill_count: 0,
            holder: PackageHolder::Player,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn fill_count(&self) -> u32 {
        self.fill_count
    }

    /// A package over capacity (after a shrinking broadcast) also counts as full
    pub fn is_full(&self) -> bool {
        self.fill_count >= self.capacity
    }

    /// Put one burger in. Returns false when the package was already full.
    pub fn collect_burger(&mut self) -> bool {
        if self.is_full() {
            return false;
        }
        self.fill_count += 1;
        true
    }

    pub fn set_capacity(&mut self, capacity: u32) {
        self.capacity = capacity;
    }
}

/// Every live package, plus the capacity new packages start with
#[derive(Debug)]
pub struct PackageRegistry {
    packages: BTreeMap<PackageId, Package>,
    global_capacity: u32,
    next_id: usize,
}

impl PackageRegistry {
    pub fn new(initial_capacity: u32) -> Self {
        Self {
            packages: BTreeMap::new(),
            global_capacity: initial_capacity,
            next_id: 0,
        }
    }

    /// Creates an empty package sized to the current global capacity
    pub fn create(&mut self) -> PackageId {
        let id = PackageId(SimId(self.next_id));
        self.next_id += 1;
        self.packages
            .insert(id, Package::new(id, self.global_capacity));
        id
    }

    pub fn get(&self, id: PackageId) -> Option<&Package> {
        self.packages.get(&id)
    }

    pub fn get_mut(&mut self, id: PackageId) -> Option<&mut Package> {
        self.packages.get_mut(&id)
    }

    /// Adds a burger to a package; Ok(false) means it was full
    pub fn add_burger(&mut self, id: PackageId) -> Result<bool> {
        let package = self
            .packages
            .get_mut(&id)
            .with_context(|| format!("{} not found", id))?;
        Ok(package.collect_burger())
    }

    /// Destroys a package. Returns it if it existed.
    pub fn destroy(&mut self, id: PackageId) -> Option<Package> {
        self.packages.remove(&id)
    }

    /// Rewrites the capacity of every live package and of future packages
    pub fn broadcast_capacity(&mut self, capacity: u32) {
        self.global_capacity = capacity;
        for package in self.packages.values_mut() {
            package.set_capacity(capacity);
        }
        debug!(
            "Package capacity set to {} on {} live packages",
            capacity,
            self.packages.len()
        );
    }

    pub fn global_capacity(&self) -> u32 {
        self.global_capacity
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Package> {
        self.packages.values()
    }
}
