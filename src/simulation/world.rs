//! Main simulation world that ties everything together
//!
//! This is the entry point for running the drive-through simulation
//! without any engine dependencies. The world owns the order book and hands
//! it by reference to vehicles and to delivery; nothing else holds it.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::config::SimConfig;
use super::delivery::{self, DeliveryOutcome};
use super::order_book::{AcceptTarget, OrderBook, OrderError, OrderEvent};
use super::package::{PackageHolder, PackageRegistry};
use super::proximity::VehicleProximityIndex;
use super::route::Route;
use super::safe_zone::{EventDecision, RandomEventGate, SafeZone};
use super::spawner::SpawnCoordinator;
use super::stats::SimulationStats;
use super::types::{CarColor, OrderId, PackageId, Position, SimId, VehicleId};
use super::vehicle::{OrderWait, ResumeReason, VehicleAgent, VehicleUpdateResult};

/// Where the player stands when a run starts (inside the kitchen)
pub const PLAYER_START: Position = Position {
    x: 0.0,
    y: 0.0,
    z: -3.0,
};

/// The main simulation world
pub struct SimWorld {
    pub config: SimConfig,

    /// Shared by every vehicle
    route: Arc<Route>,

    /// Single source of truth for orders
    pub order_book: OrderBook,

    /// All live packages
    pub packages: PackageRegistry,

    /// All live vehicles. A BTreeMap keeps the per-tick update order stable.
    pub vehicles: BTreeMap<VehicleId, VehicleAgent>,

    proximity: VehicleProximityIndex,
    spawner: SpawnCoordinator,
    event_gate: RandomEventGate,

    pub player_position: Position,

    pub stats: SimulationStats,

    /// Order events not yet picked up by the presentation side
    order_events: Vec<OrderEvent>,

    /// Next ID to assign
    next_id: usize,

    /// Simulation time
    pub time: f32,

    rng: StdRng,
}

impl SimWorld {
    fn new_internal(config: SimConfig, route: Route, mut rng: StdRng) -> Result<Self> {
        config.validate().context("Invalid simulation config")?;

        let spawner = SpawnCoordinator::new(
            config.min_spawn_interval,
            config.max_spawn_interval,
            config.max_vehicles,
            config.palette.clone(),
            config.repeat_color_chance,
            &mut rng,
        );
        let event_gate = RandomEventGate::new(
            config.min_event_interval,
            config.max_event_interval,
            config.events_check_orders,
            &mut rng,
        );

        Ok(Self {
            order_book: OrderBook::new(config.min_burgers, config.max_burgers),
            packages: PackageRegistry::new(config.min_burgers),
            vehicles: BTreeMap::new(),
            proximity: VehicleProximityIndex::new(
                config.safety_radius,
                config.forward_cone_degrees,
            ),
            spawner,
            event_gate,
            route: Arc::new(route),
            player_position: PLAYER_START,
            stats: SimulationStats::default(),
            order_events: Vec::new(),
            next_id: 0,
            time: 0.0,
            rng,
            config,
        })
    }

    pub fn new(config: SimConfig, route: Route) -> Result<Self> {
        Self::new_internal(config, route, StdRng::from_os_rng())
    }

    /// Create a new SimWorld with a seeded RNG for reproducible simulations
    pub fn new_with_seed(config: SimConfig, route: Route, seed: u64) -> Result<Self> {
        Self::new_internal(config, route, StdRng::seed_from_u64(seed))
    }

    /// Create a default test world: the standard lot with a safe kitchen
    pub fn create_test_world(config: SimConfig) -> Result<Self> {
        let world = Self::new(config, Route::drive_thru_loop()?)?;
        Ok(Self::build_test_world(world))
    }

    pub fn create_test_world_with_seed(config: SimConfig, seed: u64) -> Result<Self> {
        let world = Self::new_with_seed(config, Route::drive_thru_loop()?, seed)?;
        Ok(Self::build_test_world(world))
    }

    fn build_test_world(mut world: SimWorld) -> Self {
        world.register_safe_zone(SafeZone::new(
            Position::new(0.0, 1.0, -3.0),
            Position::new(6.0, 4.0, 4.0),
        ));
        world
    }

    fn next_sim_id(&mut self) -> SimId {
        let id = SimId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn proximity(&self) -> &VehicleProximityIndex {
        &self.proximity
    }

    pub fn spawner(&self) -> &SpawnCoordinator {
        &self.spawner
    }

    pub fn is_live(&self, vehicle: VehicleId) -> bool {
        self.vehicles.contains_key(&vehicle)
    }

    pub fn register_safe_zone(&mut self, zone: SafeZone) {
        self.event_gate.register_zone(zone);
    }

    pub fn unregister_safe_zone(&mut self, zone: &SafeZone) {
        self.event_gate.unregister_zone(zone);
    }

    pub fn is_event_allowed(&self) -> bool {
        self.event_gate
            .is_event_allowed(&self.player_position, &self.order_book)
    }

    /// Put a new car at the start of the route
    pub fn spawn_vehicle(&mut self, color: CarColor, is_special: bool) -> VehicleId {
        let id = VehicleId(self.next_sim_id());
        let vehicle = VehicleAgent::new(
            id,
            Arc::clone(&self.route),
            self.config.vehicle_speed,
            color,
            is_special,
        );
        self.vehicles.insert(id, vehicle);

        self.stats.vehicles_spawned += 1;
        if is_special {
            self.stats.special_vehicles += 1;
            info!("Spawned special {} (repeated colour)", id);
        } else {
            debug!("Spawned {}", id);
        }
        id
    }

    /// Remove a vehicle from the simulation. Its subscriptions are dropped
    /// immediately; its order, if any, stays in the book.
    pub fn despawn_vehicle(&mut self, id: VehicleId) -> bool {
        match self.vehicles.remove(&id) {
            Some(mut vehicle) => {
                vehicle.detach(&mut self.order_book);
                self.stats.vehicles_despawned += 1;
                true
            }
            None => false,
        }
    }

    /// The player accepts an order at the till
    pub fn accept_order(&mut self, target: AcceptTarget) -> Result<OrderId, OrderError> {
        let result = self
            .order_book
            .accept_pending(target, self.time, &mut self.packages);
        if let Err(err) = &result {
            debug!("Accept ignored: {}", err);
        }
        self.dispatch_notifications();
        self.collect_order_events();
        result
    }

    /// A fresh package in the player's hands, sized to the current capacity
    pub fn create_package(&mut self) -> PackageId {
        self.packages.create()
    }

    /// Drop one burger into a package. Ok(false) when it was already full.
    pub fn add_burger(&mut self, package: PackageId) -> Result<bool> {
        self.packages.add_burger(package)
    }

    /// Hand a package over at the delivery point
    pub fn deliver_package(&mut self, package_id: PackageId) -> Result<DeliveryOutcome> {
        let package = self
            .packages
            .get_mut(package_id)
            .with_context(|| format!("{} not found", package_id))?;
        let previous_holder = package.holder;
        package.holder = PackageHolder::DeliverySlot;

        let outcome = delivery::deliver(package, &mut self.order_book, self.time);
        match &outcome {
            DeliveryOutcome::Completed(_) => {
                self.packages.destroy(package_id);
            }
            DeliveryOutcome::Failed { .. } => {
                package.holder = PackageHolder::World;
                self.stats.failed_deliveries += 1;
            }
            DeliveryOutcome::NoActiveOrders => {
                package.holder = previous_holder;
            }
        }

        self.dispatch_notifications();
        self.collect_order_events();
        Ok(outcome)
    }

    /// Order events since the last call, for display
    pub fn drain_order_events(&mut self) -> Vec<OrderEvent> {
        std::mem::take(&mut self.order_events)
    }

    /// Pending or active orders whose vehicle is gone
    pub fn orphaned_orders(&self) -> Vec<OrderId> {
        self.order_book
            .orphaned_orders(|vehicle| self.vehicles.contains_key(&vehicle))
    }

    /// Deliver queued order notifications to their subscribers
    fn dispatch_notifications(&mut self) {
        loop {
            let notifications = self.order_book.drain_notifications();
            if notifications.is_empty() {
                break;
            }
            for (vehicle_id, event) in notifications {
                let Some(vehicle) = self.vehicles.get_mut(&vehicle_id) else {
                    continue;
                };
                let result =
                    vehicle.handle_notification(event, &mut self.order_book, &self.config);
                self.record_vehicle_result(vehicle_id, &result);
            }
        }
    }

    fn collect_order_events(&mut self) {
        for event in self.order_book.drain_events() {
            match event {
                OrderEvent::PendingOrderCreated(_) => self.stats.orders_created += 1,
                OrderEvent::OrderAccepted(_) => self.stats.orders_accepted += 1,
                OrderEvent::OrderCompleted(_) => self.stats.orders_completed += 1,
                OrderEvent::OrderAbandoned(_) => self.stats.orders_abandoned += 1,
            }
            self.order_events.push(event);
        }
    }

    fn record_vehicle_result(&mut self, vehicle_id: VehicleId, result: &VehicleUpdateResult) {
        if let VehicleUpdateResult::Resumed { order, reason } = result {
            match reason {
                ResumeReason::Fulfilled => debug!("{} served, pulling away", vehicle_id),
                ResumeReason::PatienceExpired => {
                    self.stats.patience_expired += 1;
                    info!("{} left without {}", vehicle_id, order);
                }
                ResumeReason::OrderLost => warn!("{} lost track of {}", vehicle_id, order),
            }
        }
    }

    /// Update all vehicles in the simulation
    ///
    /// Returns the vehicles that finished or failed and must be removed
    fn update_vehicles(&mut self, delta_secs: f32) -> Vec<(VehicleId, bool)> {
        let mut leaving = Vec::new();

        // Collect IDs to avoid borrow issues
        let vehicle_ids: Vec<VehicleId> = self.vehicles.keys().copied().collect();

        for vehicle_id in vehicle_ids {
            let Some(vehicle) = self.vehicles.get_mut(&vehicle_id) else {
                continue;
            };

            let result = vehicle.update(
                delta_secs,
                &mut self.order_book,
                &self.proximity,
                &self.config,
                self.time,
                &mut self.rng,
            );

            match result {
                Ok(VehicleUpdateResult::Retire) => leaving.push((vehicle_id, true)),
                Ok(result) => self.record_vehicle_result(vehicle_id, &result),
                Err(err) => {
                    warn!("{} failed to update, despawning: {:#}", vehicle_id, err);
                    leaving.push((vehicle_id, false));
                }
            }

            // Same-tick delivery for anything this update triggered
            self.dispatch_notifications();
        }

        leaving
    }

    /// Main simulation tick
    pub fn tick(&mut self, delta_secs: f32) {
        self.time += delta_secs;
        self.stats.elapsed_time = self.time;

        // Anything queued by player commands since the last tick
        self.dispatch_notifications();

        // Every vehicle sees the others where they were at the end of the last tick
        self.proximity
            .rebuild(self.vehicles.values().map(VehicleAgent::snapshot));

        if let Some(ticket) =
            self.spawner
                .tick(delta_secs, self.vehicles.len(), &mut self.rng)
        {
            self.spawn_vehicle(ticket.color, ticket.is_special);
        }

        for (vehicle_id, retired) in self.update_vehicles(delta_secs) {
            if retired {
                if let Some(mut vehicle) = self.vehicles.remove(&vehicle_id) {
                    vehicle.detach(&mut self.order_book);
                    self.stats.vehicles_retired += 1;
                    debug!("{} left the drive-through", vehicle_id);
                }
            } else {
                self.despawn_vehicle(vehicle_id);
            }
        }

        if let Some(ttl) = self.config.orphan_ttl {
            let vehicles = &self.vehicles;
            let expired = self
                .order_book
                .expire_orphans(self.time, ttl, |v| vehicles.contains_key(&v));
            if !expired.is_empty() {
                info!("{} orphaned orders expired", expired.len());
            }
        }

        match self.event_gate.tick(
            delta_secs,
            &self.player_position,
            &self.order_book,
            &mut self.rng,
        ) {
            Some(EventDecision::Triggered) => self.stats.events_triggered += 1,
            Some(EventDecision::Cancelled(_)) => self.stats.events_cancelled += 1,
            None => {}
        }

        self.collect_order_events();
    }

    /// Print a summary of the world state
    pub fn print_summary(&self) {
        println!("=== Drive-Through Summary ===");
        println!("Time: {:.2}s", self.time);
        println!(
            "Vehicles: {}/{}, Packages: {} (capacity {})",
            self.vehicles.len(),
            self.spawner.max_live(),
            self.packages.len(),
            self.packages.global_capacity()
        );
        println!(
            "Orders: {} pending, {} active, {} completed, {} orphaned",
            self.order_book.pending_orders().len(),
            self.order_book.active_orders().len(),
            self.order_book.completed_count(),
            self.orphaned_orders().len()
        );
        println!();

        if !self.order_book.pending_orders().is_empty()
            || !self.order_book.active_orders().is_empty()
        {
            println!("--- Open Orders ---");
            for order in self
                .order_book
                .pending_orders()
                .iter()
                .chain(self.order_book.active_orders())
            {
                println!(
                    "  {}: {} burgers for {} ({:?})",
                    order.id, order.burger_count, order.source, order.state
                );
            }
        }

        if !self.vehicles.is_empty() {
            println!("--- Vehicles ---");
            for vehicle in self.vehicles.values() {
                println!(
                    "  {}: waypoint={}/{}, speed={:.1}, position=({:.1}, {:.1}), state={}",
                    vehicle.id,
                    vehicle.current_waypoint(),
                    self.route.last_index(),
                    vehicle.current_speed(),
                    vehicle.position().x,
                    vehicle.position().z,
                    describe_wait(vehicle.order_wait()),
                );
            }
        }
    }

    /// Draw the lane as one line: `>` driving, `b` braking, `W` waiting at the window
    pub fn draw_lane(&self) {
        const WIDTH: usize = 60;
        let total = self.route.progress(self.route.len(), 0.0);
        let mut lane = vec!['-'; WIDTH];

        let window = self.route.progress(self.route.order_waypoint(), 0.0);
        let window_column = ((window / total) * (WIDTH - 1) as f32) as usize;
        lane[window_column.min(WIDTH - 1)] = '|';

        for vehicle in self.vehicles.values() {
            let column = ((vehicle.progress() / total) * (WIDTH - 1) as f32) as usize;
            let marker = if vehicle.is_waiting() {
                'W'
            } else if vehicle.is_braking() {
                'b'
            } else {
                '>'
            };
            lane[column.min(WIDTH - 1)] = marker;
        }

        println!("[{}]", lane.into_iter().collect::<String>());
    }

    /// Log the end-of-run statistics
    pub fn log_final_report(&self) {
        self.stats
            .log_report(self.vehicles.len(), self.orphaned_orders().len());
    }
}

fn describe_wait(wait: OrderWait) -> String {
    match wait {
        OrderWait::Idle => "driving".to_string(),
        OrderWait::WaitingPendingAcceptance { order } => format!("waiting for {} to be taken", order),
        OrderWait::WaitingFulfillment { order, remaining } => {
            format!("waiting for {} ({:.0}s patience left)", order, remaining)
        }
        OrderWait::CoolingDown { .. } => "pulling away".to_string(),
    }
}
