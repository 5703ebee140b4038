//! Safe zones and the random event gate
//!
//! Every so often a random event tries to fire. It is held back while the
//! player stands in a safe zone, or while an order is pending or active.

use log::info;
use rand::Rng;

use super::order_book::OrderBook;
use super::types::{OrderId, Position};

/// Axis-aligned box the random event cannot reach into
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafeZone {
    pub center: Position,
    pub size: Position,
}

impl SafeZone {
    pub fn new(center: Position, size: Position) -> Self {
        Self { center, size }
    }

    pub fn min(&self) -> Position {
        Position::new(
            self.center.x - self.size.x / 2.0,
            self.center.y - self.size.y / 2.0,
            self.center.z - self.size.z / 2.0,
        )
    }

    pub fn max(&self) -> Position {
        Position::new(
            self.center.x + self.size.x / 2.0,
            self.center.y + self.size.y / 2.0,
            self.center.z + self.size.z / 2.0,
        )
    }

    /// Bounds are inclusive
    pub fn contains(&self, point: &Position) -> bool {
        let (min, max) = (self.min(), self.max());
        (min.x..=max.x).contains(&point.x)
            && (min.y..=max.y).contains(&point.y)
            && (min.z..=max.z).contains(&point.z)
    }
}

/// Why an event attempt was held back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventBlock {
    InSafeZone,
    OrderInProgress { order: OrderId, burgers: u32 },
}

/// Outcome of an event attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDecision {
    Triggered,
    Cancelled(EventBlock),
}

/// Countdown-driven random event with safety checks
#[derive(Debug, Clone)]
pub struct RandomEventGate {
    zones: Vec<SafeZone>,
    min_interval: f32,
    max_interval: f32,
    check_for_orders: bool,
    countdown: f32,
}

impl RandomEventGate {
    pub fn new<R: Rng + ?Sized>(
        min_interval: f32,
        max_interval: f32,
        check_for_orders: bool,
        rng: &mut R,
    ) -> Self {
        let mut gate = Self {
            zones: Vec::new(),
            min_interval,
            max_interval,
            check_for_orders,
            countdown: 0.0,
        };
        gate.countdown = gate.sample_interval(rng);
        gate
    }

    /// Adding the same zone twice is a no-op
    pub fn register_zone(&mut self, zone: SafeZone) {
        if !self.zones.contains(&zone) {
            self.zones.push(zone);
        }
    }

    pub fn unregister_zone(&mut self, zone: &SafeZone) {
        self.zones.retain(|z| z != zone);
    }

    pub fn zones(&self) -> &[SafeZone] {
        &self.zones
    }

    pub fn countdown(&self) -> f32 {
        self.countdown
    }

    pub fn in_safe_zone(&self, player: &Position) -> bool {
        self.zones.iter().any(|zone| zone.contains(player))
    }

    /// Why an event could not fire right now, if anything blocks it
    pub fn status(&self, player: &Position, book: &OrderBook) -> Option<EventBlock> {
        if self.in_safe_zone(player) {
            return Some(EventBlock::InSafeZone);
        }
        if self.check_for_orders {
            if let Some(order) = book.latest_in_progress() {
                return Some(EventBlock::OrderInProgress {
                    order: order.id,
                    burgers: order.burger_count,
                });
            }
        }
        None
    }

    pub fn is_event_allowed(&self, player: &Position, book: &OrderBook) -> bool {
        self.status(player, book).is_none()
    }

    /// Count down and, when the timer elapses, decide whether the event fires
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        delta_secs: f32,
        player: &Position,
        book: &OrderBook,
        rng: &mut R,
    ) -> Option<EventDecision> {
        self.countdown -= delta_secs;
        if self.countdown > 0.0 {
            return None;
        }
        self.countdown = self.sample_interval(rng);

        let decision = match self.status(player, book) {
            None => EventDecision::Triggered,
            Some(block) => EventDecision::Cancelled(block),
        };
        match decision {
            EventDecision::Triggered => info!("Random event triggered"),
            EventDecision::Cancelled(EventBlock::InSafeZone) => {
                info!("Random event cancelled: player in safe zone")
            }
            EventDecision::Cancelled(EventBlock::OrderInProgress { order, burgers }) => {
                info!(
                    "Random event cancelled: {} in progress ({} burgers)",
                    order, burgers
                )
            }
        }
        Some(decision)
    }

    fn sample_interval<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        if self.max_interval > self.min_interval {
            rng.random_range(self.min_interval..self.max_interval)
        } else {
            self.min_interval
        }
    }
}
