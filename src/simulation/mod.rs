//! Standalone drive-through simulation module
//!
//! This module contains the order lifecycle and vehicle queue logic. It runs
//! independently of any game engine and can be driven from the console or
//! from tests.

mod config;
mod delivery;
mod order_book;
mod package;
mod player;
mod proximity;
mod route;
mod safe_zone;
mod spawner;
mod stats;
mod types;
mod vehicle;
mod world;

// Re-export public types for external use
pub use config::{
    SimConfig, DECELERATION_FACTOR, DEFAULT_PALETTE, FORWARD_CONE_DEGREES, MAX_BURGERS_PER_ORDER,
    MAX_LIVE_VEHICLES, MIN_BURGERS_PER_ORDER, PATIENCE_SECS, SAFETY_RADIUS, STOP_DISTANCE,
    VEHICLE_SPEED,
};
pub use delivery::{deliver, find_match, DeliveryOutcome};
pub use order_book::{AcceptTarget, Order, OrderBook, OrderError, OrderEvent, OrderState};
pub use package::{Package, PackageHolder, PackageRegistry};
pub use player::{ScriptedPlayer, HAND_OVER_POINT};
pub use proximity::{
    VehicleProximityIndex, VehicleSnapshot, CAUTION_SPEED_FACTOR, CRAWL_BAND, CRAWL_SPEED_FACTOR,
    FULL_STOP_BAND,
};
pub use route::{LaneNetwork, Route};
pub use safe_zone::{EventBlock, EventDecision, RandomEventGate, SafeZone};
pub use spawner::{SpawnCoordinator, SpawnTicket};
pub use stats::SimulationStats;
pub use types::{heading_vector, CarColor, OrderId, PackageId, Position, SimId, VehicleId};
pub use vehicle::{OrderWait, ResumeReason, VehicleAgent, VehicleUpdateResult};
pub use world::{SimWorld, PLAYER_START};
