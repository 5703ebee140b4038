//! Customer vehicle state machine
//!
//! Standalone implementation that doesn't depend on any engine.
//!
//! A vehicle drives its route waypoint by waypoint. At the order waypoint it
//! registers an order and waits: first for the player to accept it, then for
//! a matching delivery or for its patience to run out. Either way it pulls
//! away exactly once and keeps driving until it runs off the end of the route.
//! Braking is evaluated every tick on top of whatever the order state is.

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use rand::Rng;

use super::config::SimConfig;
use super::order_book::{OrderBook, OrderError, OrderEvent, OrderState};
use super::proximity::{VehicleProximityIndex, VehicleSnapshot};
use super::route::Route;
use super::types::{CarColor, OrderId, Position, VehicleId, STOP_SPEED_EPSILON};

/// Order-related sub-state of a vehicle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderWait {
    Idle,
    WaitingPendingAcceptance { order: OrderId },
    /// Patience only counts down once the order has been accepted
    WaitingFulfillment { order: OrderId, remaining: f32 },
    CoolingDown { remaining: f32 },
}

/// Why a waiting vehicle pulled away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeReason {
    Fulfilled,
    PatienceExpired,
    /// The order vanished from the book (expired or unknown)
    OrderLost,
}

/// Result of a vehicle update indicating what action should be taken
#[derive(Debug, Clone, PartialEq)]
pub enum VehicleUpdateResult {
    Continue,
    OrderPlaced(OrderId),
    Resumed { order: OrderId, reason: ResumeReason },
    Retire,
}

/// A customer car in the drive-through
#[derive(Debug, Clone)]
pub struct VehicleAgent {
    pub id: VehicleId,
    pub color: CarColor,
    /// Spawned with the same colour as the car before it
    pub is_special: bool,
    route: Arc<Route>,
    position: Position,
    heading: f32,
    current_waypoint: usize,
    segment_travelled: f32,
    odometer: f32,
    max_speed: f32,
    current_speed: f32,
    braking: bool,
    order_wait: OrderWait,
    retiring: bool,
}

impl VehicleAgent {
    pub fn new(
        id: VehicleId,
        route: Arc<Route>,
        max_speed: f32,
        color: CarColor,
        is_special: bool,
    ) -> Self {
        let position = route.spawn_point();
        let heading = route
            .waypoint(0)
            .map_or(0.0, |first| position.angle_to(first));
        Self {
            id,
            color,
            is_special,
            route,
            position,
            heading,
            current_waypoint: 0,
            segment_travelled: 0.0,
            odometer: 0.0,
            max_speed,
            current_speed: max_speed,
            braking: false,
            order_wait: OrderWait::Idle,
            retiring: false,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn heading(&self) -> f32 {
        self.heading
    }

    pub fn current_waypoint(&self) -> usize {
        self.current_waypoint
    }

    pub fn odometer(&self) -> f32 {
        self.odometer
    }

    pub fn current_speed(&self) -> f32 {
        self.current_speed
    }

    pub fn is_braking(&self) -> bool {
        self.braking
    }

    pub fn order_wait(&self) -> OrderWait {
        self.order_wait
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn progress(&self) -> f32 {
        self.route
            .progress(self.current_waypoint, self.segment_travelled)
    }

    /// The order this vehicle is waiting on, if any
    pub fn current_order(&self) -> Option<OrderId> {
        match self.order_wait {
            OrderWait::WaitingPendingAcceptance { order }
            | OrderWait::WaitingFulfillment { order, .. } => Some(order),
            OrderWait::Idle | OrderWait::CoolingDown { .. } => None,
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.current_order().is_some()
    }

    pub fn snapshot(&self) -> VehicleSnapshot {
        VehicleSnapshot {
            id: self.id,
            position: self.position,
            heading: self.heading,
            progress: self.progress(),
            odometer: self.odometer,
        }
    }

    /// React to a pushed order notification
    pub fn handle_notification(
        &mut self,
        event: OrderEvent,
        book: &mut OrderBook,
        config: &SimConfig,
    ) -> VehicleUpdateResult {
        match (event, self.order_wait) {
            (OrderEvent::OrderAccepted(id), OrderWait::WaitingPendingAcceptance { order })
                if id == order =>
            {
                self.start_patience(order, config);
                VehicleUpdateResult::Continue
            }
            (OrderEvent::OrderCompleted(id), _) if self.current_order() == Some(id) => {
                self.resume(book, config, ResumeReason::Fulfilled)
            }
            (OrderEvent::OrderAbandoned(id), _) if self.current_order() == Some(id) => {
                self.resume(book, config, ResumeReason::OrderLost)
            }
            _ => VehicleUpdateResult::Continue,
        }
    }

    /// Update vehicle movement and order logic for one tick
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        delta_secs: f32,
        book: &mut OrderBook,
        proximity: &VehicleProximityIndex,
        config: &SimConfig,
        now: f32,
        rng: &mut R,
    ) -> Result<VehicleUpdateResult> {
        if self.retiring {
            return Ok(VehicleUpdateResult::Retire);
        }

        let gap = proximity
            .nearest_blocker(&self.snapshot())
            .map(|(_, distance)| distance);
        self.apply_braking(proximity.factor_for_gap(gap), delta_secs, config);

        match self.order_wait {
            OrderWait::WaitingPendingAcceptance { order } => {
                self.current_speed = 0.0;
                return Ok(match book.poll_order_state(order) {
                    Some(OrderState::Pending) => VehicleUpdateResult::Continue,
                    Some(OrderState::Active) => {
                        // Acceptance notification was missed
                        self.start_patience(order, config);
                        VehicleUpdateResult::Continue
                    }
                    Some(OrderState::Completed) => {
                        self.resume(book, config, ResumeReason::Fulfilled)
                    }
                    Some(OrderState::Abandoned) | None => {
                        self.resume(book, config, ResumeReason::OrderLost)
                    }
                });
            }
            OrderWait::WaitingFulfillment { order, remaining } => {
                self.current_speed = 0.0;
                return Ok(match book.poll_order_state(order) {
                    Some(OrderState::Completed) => {
                        self.resume(book, config, ResumeReason::Fulfilled)
                    }
                    Some(OrderState::Abandoned) | None => {
                        self.resume(book, config, ResumeReason::OrderLost)
                    }
                    Some(OrderState::Pending) | Some(OrderState::Active) => {
                        let remaining = remaining - delta_secs;
                        if remaining <= 0.0 {
                            info!("{} ran out of patience waiting for {}", self.id, order);
                            self.resume(book, config, ResumeReason::PatienceExpired)
                        } else {
                            self.order_wait = OrderWait::WaitingFulfillment { order, remaining };
                            VehicleUpdateResult::Continue
                        }
                    }
                });
            }
            OrderWait::CoolingDown { remaining } => {
                let remaining = remaining - delta_secs;
                self.order_wait = if remaining <= 0.0 {
                    OrderWait::Idle
                } else {
                    OrderWait::CoolingDown { remaining }
                };
            }
            OrderWait::Idle => {}
        }

        let target = *self
            .route
            .waypoint(self.current_waypoint)
            .context("Waypoint index outside route")?;

        let distance = self.position.planar_distance(&target);
        if distance > config.stop_distance {
            // Never close the gap to the car ahead further than the stop band
            let step = (self.current_speed * delta_secs)
                .min(distance)
                .min(proximity.max_advance(gap));
            self.heading = self.position.angle_to(&target);
            self.position = self.position.step_towards(&target, step);
            self.segment_travelled += step;
            self.odometer += step;
            return Ok(VehicleUpdateResult::Continue);
        }

        self.arrive_at_waypoint(book, config, now, rng)
    }

    /// Leave the simulation: drop every subscription now, not later
    pub fn detach(&mut self, book: &mut OrderBook) {
        book.unsubscribe(self.id);
        self.order_wait = OrderWait::Idle;
        self.retiring = true;
    }

    fn arrive_at_waypoint<R: Rng + ?Sized>(
        &mut self,
        book: &mut OrderBook,
        config: &SimConfig,
        now: f32,
        rng: &mut R,
    ) -> Result<VehicleUpdateResult> {
        if self.current_waypoint == self.route.order_waypoint()
            && self.order_wait == OrderWait::Idle
        {
            return Ok(self.place_order(book, config, now, rng));
        }

        Ok(self.advance_or_retire())
    }

    fn place_order<R: Rng + ?Sized>(
        &mut self,
        book: &mut OrderBook,
        config: &SimConfig,
        now: f32,
        rng: &mut R,
    ) -> VehicleUpdateResult {
        self.current_speed = 0.0;

        // A vehicle never registers twice; adopt whatever it already has
        let (order, state, placed) = match book.find_by_source(self.id) {
            Some(existing) => (existing.id, existing.state, false),
            None => match book.create_pending(self.id, now, rng) {
                Ok(id) => (id, OrderState::Pending, true),
                Err(OrderError::DuplicateOrderRejected { existing, .. }) => {
                    (existing, OrderState::Pending, false)
                }
                Err(err) => {
                    warn!("{} could not place an order: {}", self.id, err);
                    return self.advance_or_retire();
                }
            },
        };

        book.subscribe(order, self.id);
        self.order_wait = OrderWait::WaitingPendingAcceptance { order };
        if state == OrderState::Active {
            self.start_patience(order, config);
        }

        if placed {
            VehicleUpdateResult::OrderPlaced(order)
        } else {
            debug!("{} re-attached to {}", self.id, order);
            VehicleUpdateResult::Continue
        }
    }

    fn start_patience(&mut self, order: OrderId, config: &SimConfig) {
        self.order_wait = OrderWait::WaitingFulfillment {
            order,
            remaining: config.patience_secs,
        };
    }

    /// Pull away from the window. A no-op unless the vehicle is waiting, so a
    /// notification and a poll observing the same completion advance once.
    fn resume(
        &mut self,
        book: &mut OrderBook,
        config: &SimConfig,
        reason: ResumeReason,
    ) -> VehicleUpdateResult {
        let Some(order) = self.current_order() else {
            return VehicleUpdateResult::Continue;
        };

        book.unsubscribe(self.id);
        self.order_wait = OrderWait::CoolingDown {
            remaining: config.cooldown_secs,
        };
        self.current_speed = self.max_speed;
        if !self.advance() {
            self.retiring = true;
        }

        debug!("{} resumed after {} ({:?})", self.id, order, reason);
        VehicleUpdateResult::Resumed { order, reason }
    }

    /// Graded slowdown from the proximity index, opposing the current speed
    fn apply_braking(&mut self, factor: f32, delta_secs: f32, config: &SimConfig) {
        let target = self.max_speed * factor;
        self.braking = factor < 1.0;

        if self.current_speed > target {
            let impulse = self.current_speed * config.deceleration_factor * delta_secs;
            self.current_speed = (self.current_speed - impulse).max(target);
            if self.current_speed - target < STOP_SPEED_EPSILON {
                self.current_speed = target;
            }
        } else {
            self.current_speed = target;
        }
    }

    fn advance_or_retire(&mut self) -> VehicleUpdateResult {
        if self.advance() {
            VehicleUpdateResult::Continue
        } else {
            self.retiring = true;
            VehicleUpdateResult::Retire
        }
    }

    /// Move on to the next waypoint. Returns false when the route is done;
    /// the index then stays on the last waypoint.
    fn advance(&mut self) -> bool {
        if self.current_waypoint >= self.route.last_index() {
            return false;
        }
        self.current_waypoint += 1;
        self.segment_travelled = 0.0;
        true
    }
}
