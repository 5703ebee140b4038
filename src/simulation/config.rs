//! Tunable parameters for a simulation run
//!
//! Defaults mirror the drive-through scene: small orders, a handful of cars,
//! and a patient but not endless customer.

use anyhow::{bail, Result};

use super::types::CarColor;

/// Smallest order a customer places
pub const MIN_BURGERS_PER_ORDER: u32 = 1;
/// Largest order a customer places
pub const MAX_BURGERS_PER_ORDER: u32 = 4;

/// Spawn interval range in seconds
pub const MIN_SPAWN_INTERVAL: f32 = 2.0;
pub const MAX_SPAWN_INTERVAL: f32 = 5.0;
/// Maximum number of cars on the lane at once
pub const MAX_LIVE_VEHICLES: usize = 4;

/// Cruising speed in world units per second
pub const VEHICLE_SPEED: f32 = 5.0;
/// Distance at which a waypoint counts as reached
pub const STOP_DISTANCE: f32 = 0.2;
/// Radius within which a car ahead triggers braking
pub const SAFETY_RADIUS: f32 = 1.5;
/// Half-angle of the forward cone, in degrees
pub const FORWARD_CONE_DEGREES: f32 = 45.0;
/// Fraction of current speed shed per second while braking
pub const DECELERATION_FACTOR: f32 = 8.0;

/// Seconds a customer waits after the order was accepted
pub const PATIENCE_SECS: f32 = 60.0;
/// Seconds after pulling away from the window before the car is idle again
pub const POST_FULFILLMENT_COOLDOWN_SECS: f32 = 1.0;

/// Chance that a newly spawned car reuses the previous colour
pub const REPEAT_COLOR_CHANCE: f32 = 0.2;

/// Random event interval range in seconds
pub const MIN_EVENT_INTERVAL: f32 = 30.0;
pub const MAX_EVENT_INTERVAL: f32 = 90.0;

/// Default body colours for spawned cars
pub const DEFAULT_PALETTE: [CarColor; 5] = [
    CarColor::rgb(0.8, 0.1, 0.1),
    CarColor::rgb(0.1, 0.3, 0.8),
    CarColor::rgb(0.9, 0.9, 0.9),
    CarColor::rgb(0.1, 0.1, 0.1),
    CarColor::rgb(0.2, 0.6, 0.2),
];

/// Configuration for a simulation run
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub min_burgers: u32,
    pub max_burgers: u32,
    pub min_spawn_interval: f32,
    pub max_spawn_interval: f32,
    pub max_vehicles: usize,
    pub vehicle_speed: f32,
    pub stop_distance: f32,
    pub safety_radius: f32,
    pub forward_cone_degrees: f32,
    pub deceleration_factor: f32,
    pub patience_secs: f32,
    pub cooldown_secs: f32,
    pub palette: Vec<CarColor>,
    pub repeat_color_chance: f32,
    pub min_event_interval: f32,
    pub max_event_interval: f32,
    /// Block random events while an order is pending or active
    pub events_check_orders: bool,
    /// Expire orders whose vehicle is gone after this many seconds. `None` keeps them forever.
    pub orphan_ttl: Option<f32>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            min_burgers: MIN_BURGERS_PER_ORDER,
            max_burgers: MAX_BURGERS_PER_ORDER,
            min_spawn_interval: MIN_SPAWN_INTERVAL,
            max_spawn_interval: MAX_SPAWN_INTERVAL,
            max_vehicles: MAX_LIVE_VEHICLES,
            vehicle_speed: VEHICLE_SPEED,
            stop_distance: STOP_DISTANCE,
            safety_radius: SAFETY_RADIUS,
            forward_cone_degrees: FORWARD_CONE_DEGREES,
            deceleration_factor: DECELERATION_FACTOR,
            patience_secs: PATIENCE_SECS,
            cooldown_secs: POST_FULFILLMENT_COOLDOWN_SECS,
            palette: DEFAULT_PALETTE.to_vec(),
            repeat_color_chance: REPEAT_COLOR_CHANCE,
            min_event_interval: MIN_EVENT_INTERVAL,
            max_event_interval: MAX_EVENT_INTERVAL,
            events_check_orders: true,
            orphan_ttl: None,
        }
    }
}

impl SimConfig {
    /// Check that every range is ordered and every quantity is usable
    pub fn validate(&self) -> Result<()> {
        if self.min_burgers == 0 {
            bail!("Orders must contain at least one burger");
        }
        if self.min_burgers > self.max_burgers {
            bail!(
                "Burger range is inverted: {}..={}",
                self.min_burgers,
                self.max_burgers
            );
        }
        if self.min_spawn_interval <= 0.0 || self.min_spawn_interval > self.max_spawn_interval {
            bail!(
                "Invalid spawn interval range: {}..{}",
                self.min_spawn_interval,
                self.max_spawn_interval
            );
        }
        if self.min_event_interval <= 0.0 || self.min_event_interval > self.max_event_interval {
            bail!(
                "Invalid event interval range: {}..{}",
                self.min_event_interval,
                self.max_event_interval
            );
        }
        if self.vehicle_speed <= 0.0 || self.stop_distance <= 0.0 || self.safety_radius <= 0.0 {
            bail!("Speed, stop distance and safety radius must be positive");
        }
        if !(0.0..=180.0).contains(&self.forward_cone_degrees) {
            bail!("Forward cone must be within 0..=180 degrees");
        }
        if self.deceleration_factor <= 0.0 {
            bail!("Deceleration factor must be positive");
        }
        if self.patience_secs <= 0.0 || self.cooldown_secs < 0.0 {
            bail!("Patience must be positive and cooldown non-negative");
        }
        if !(0.0..=1.0).contains(&self.repeat_color_chance) {
            bail!("Repeat colour chance must be within 0..=1");
        }
        if self.palette.is_empty() {
            bail!("Colour palette is empty");
        }
        if let Some(ttl) = self.orphan_ttl {
            if ttl <= 0.0 {
                bail!("Orphan TTL must be positive");
            }
        }
        Ok(())
    }
}
