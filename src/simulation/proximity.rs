//! Who is in front of whom
//!
//! Rebuilt once per tick from the previous tick's vehicle positions, so the
//! order in which vehicles update within a tick doesn't matter. Entries are
//! kept sorted by route progress: only vehicles strictly further along can
//! block, so each query scans the tail of the list. Worst case is still
//! O(N²) per tick when everyone is bunched up; fine for a handful of cars, a
//! spatial grid would be needed for hundreds.

use std::collections::HashMap;

use ordered_float::OrderedFloat;
use sorted_vec::SortedVec;

use super::types::{heading_vector, Position, VehicleId};

/// Braking bands, as fractions of the safety radius
pub const FULL_STOP_BAND: f32 = 0.3;
pub const CRAWL_BAND: f32 = 0.7;
/// Speed multipliers inside and beyond the crawl band
pub const CRAWL_SPEED_FACTOR: f32 = 0.3;
pub const CAUTION_SPEED_FACTOR: f32 = 0.6;

/// What the index knows about a vehicle from the previous tick
#[derive(Debug, Clone, Copy)]
pub struct VehicleSnapshot {
    pub id: VehicleId,
    pub position: Position,
    /// Y-axis rotation, as produced by `Position::angle_to`
    pub heading: f32,
    pub progress: f32,
    /// Total distance driven; breaks ties between equal progress
    pub odometer: f32,
}

impl VehicleSnapshot {
    fn right_of_way_key(&self) -> (OrderedFloat<f32>, OrderedFloat<f32>) {
        (OrderedFloat(self.progress), OrderedFloat(self.odometer))
    }
}

type ProgressKey = (OrderedFloat<f32>, OrderedFloat<f32>, VehicleId);

/// Per-tick index of vehicle positions sorted by route progress
pub struct VehicleProximityIndex {
    safety_radius: f32,
    /// Cosine of the forward cone half-angle
    cone_cos: f32,
    by_progress: SortedVec<ProgressKey>,
    snapshots: HashMap<VehicleId, VehicleSnapshot>,
}

impl VehicleProximityIndex {
    pub fn new(safety_radius: f32, cone_half_angle_degrees: f32) -> Self {
        Self {
            safety_radius,
            cone_cos: cone_half_angle_degrees.to_radians().cos(),
            by_progress: SortedVec::new(),
            snapshots: HashMap::new(),
        }
    }

    /// Replace the index contents with this tick's snapshots
    pub fn rebuild<I>(&mut self, snapshots: I)
    where
        I: IntoIterator<Item = VehicleSnapshot>,
    {
        self.by_progress = SortedVec::new();
        self.snapshots.clear();
        for snapshot in snapshots {
            let (progress, odometer) = snapshot.right_of_way_key();
            self.by_progress.insert((progress, odometer, snapshot.id));
            self.snapshots.insert(snapshot.id, snapshot);
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn snapshot(&self, id: VehicleId) -> Option<&VehicleSnapshot> {
        self.snapshots.get(&id)
    }

    pub fn safety_radius(&self) -> f32 {
        self.safety_radius
    }

    /// Closest vehicle that is within the radius, inside the forward cone,
    /// and strictly further along the route
    pub fn nearest_blocker(&self, ego: &VehicleSnapshot) -> Option<(VehicleId, f32)> {
        let ego_key = ego.right_of_way_key();
        let start = self
            .by_progress
            .partition_point(|(progress, odometer, _)| (*progress, *odometer) <= ego_key);

        let (hx, hz) = heading_vector(ego.heading);

        self.by_progress[start..]
            .iter()
            .filter(|(_, _, id)| *id != ego.id)
            .filter_map(|(_, _, id)| self.snapshots.get(id))
            .filter_map(|other| {
                let distance = ego.position.planar_distance(&other.position);
                if distance >= self.safety_radius {
                    return None;
                }
                if distance > f32::EPSILON {
                    let dx = (other.position.x - ego.position.x) / distance;
                    let dz = (other.position.z - ego.position.z) / distance;
                    if hx * dx + hz * dz < self.cone_cos {
                        return None;
                    }
                }
                Some((other.id, distance))
            })
            .min_by_key(|(_, distance)| OrderedFloat(*distance))
    }

    /// Speed multiplier for `ego`: 1.0 with a clear lane, otherwise graded by
    /// how close the nearest blocker is
    pub fn braking_factor(&self, ego: &VehicleSnapshot) -> f32 {
        self.factor_for_gap(self.nearest_blocker(ego).map(|(_, distance)| distance))
    }

    /// Speed multiplier for a blocker `gap` away, or a clear lane on `None`
    pub fn factor_for_gap(&self, gap: Option<f32>) -> f32 {
        match gap {
            None => 1.0,
            Some(distance) if distance < FULL_STOP_BAND * self.safety_radius => 0.0,
            Some(distance) if distance < CRAWL_BAND * self.safety_radius => CRAWL_SPEED_FACTOR,
            Some(_) => CAUTION_SPEED_FACTOR,
        }
    }

    /// Furthest a vehicle may move this tick without entering the full stop
    /// band of a blocker `gap` away
    pub fn max_advance(&self, gap: Option<f32>) -> f32 {
        gap.map_or(f32::INFINITY, |distance| {
            (distance - FULL_STOP_BAND * self.safety_radius).max(0.0)
        })
    }

    /// Braking factor for a vehicle already in the index
    pub fn braking_factor_for(&self, id: VehicleId) -> f32 {
        self.snapshots
            .get(&id)
            .map_or(1.0, |snapshot| self.braking_factor(snapshot))
    }
}
