//! Core types for the drive-through simulation
//!
//! These are standalone types that don't depend on any engine.

use std::fmt;

/// A unique identifier for simulation entities
/// This is a simple wrapper around a usize for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimId(pub usize);

/// A wrapper type for vehicle IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VehicleId(pub SimId);

/// A wrapper type for package IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageId(pub SimId);

/// Order number. Allocated monotonically by the order book and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderId(pub u64);

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vehicle#{}", self.0 .0)
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "package#{}", self.0 .0)
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "order#{}", self.0)
    }
}

/// A 3D position in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Distance on the ground plane, ignoring height
    pub fn planar_distance(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }

    /// Calculate the angle from this position to another (Y-axis rotation)
    pub fn angle_to(&self, other: &Position) -> f32 {
        let dx = other.x - self.x;
        let dz = other.z - self.z;
        let direction_len = (dx * dx + dz * dz).sqrt();
        if direction_len > 0.0 {
            (dx / direction_len).atan2(dz / direction_len)
        } else {
            0.0
        }
    }

    /// Move towards `target` on the ground plane by at most `step`, keeping height
    pub fn step_towards(&self, target: &Position, step: f32) -> Position {
        let remaining = self.planar_distance(target);
        if remaining <= step || remaining <= f32::EPSILON {
            return Position::new(target.x, self.y, target.z);
        }
        let t = step / remaining;
        Position {
            x: self.x + (target.x - self.x) * t,
            y: self.y,
            z: self.z + (target.z - self.z) * t,
        }
    }
}

/// Unit vector on the ground plane for a Y-axis rotation produced by [`Position::angle_to`]
pub fn heading_vector(angle: f32) -> (f32, f32) {
    (angle.sin(), angle.cos())
}

/// Body colour of a customer car
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl CarColor {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Per-channel comparison within `tolerance`
    pub fn is_similar(&self, other: &CarColor, tolerance: f32) -> bool {
        (self.r - other.r).abs() < tolerance
            && (self.g - other.g).abs() < tolerance
            && (self.b - other.b).abs() < tolerance
    }
}

/// Tolerance used when deciding whether two car colours repeat
pub const COLOR_SIMILARITY_TOLERANCE: f32 = 0.01;

/// Below this speed a braking vehicle snaps to its band target
pub const STOP_SPEED_EPSILON: f32 = 0.05;
