//! Authoritative store of customer orders
//!
//! Orders move strictly `Pending -> Active -> Completed`. The book is owned by
//! the world and passed by reference to whoever needs it; vehicles keep only
//! an `OrderId` and learn about transitions either from the notifications
//! queued for their subscription or by polling [`OrderBook::poll_order_state`].

use std::collections::HashMap;

use log::{debug, info};
use rand::Rng;
use thiserror::Error;

use super::package::PackageRegistry;
use super::types::{OrderId, VehicleId};

/// Lifecycle state of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderState {
    /// Created, awaiting player acceptance
    Pending,
    /// Accepted, awaiting a matching delivery
    Active,
    /// Delivered (terminal)
    Completed,
    /// Expired after its vehicle left without it (terminal)
    Abandoned,
}

/// A request for a number of burgers, tied to one vehicle
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub burger_count: u32,
    pub source: VehicleId,
    pub created_at: f32,
    pub accepted_at: Option<f32>,
    pub closed_at: Option<f32>,
    pub state: OrderState,
}

impl Order {
    /// Seconds from acceptance to completion, once completed
    pub fn time_taken(&self) -> Option<f32> {
        match (self.state, self.accepted_at, self.closed_at) {
            (OrderState::Completed, Some(accepted), Some(closed)) => Some(closed - accepted),
            _ => None,
        }
    }
}

/// State-change notification, delivered to subscribers and to presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderEvent {
    PendingOrderCreated(OrderId),
    OrderAccepted(OrderId),
    OrderCompleted(OrderId),
    OrderAbandoned(OrderId),
}

impl OrderEvent {
    pub fn order_id(&self) -> OrderId {
        match *self {
            OrderEvent::PendingOrderCreated(id)
            | OrderEvent::OrderAccepted(id)
            | OrderEvent::OrderCompleted(id)
            | OrderEvent::OrderAbandoned(id) => id,
        }
    }
}

/// Errors that can occur during order book operations. All are recoverable.
#[derive(Debug, Error, PartialEq)]
pub enum OrderError {
    #[error("{vehicle} already has {existing} in progress")]
    DuplicateOrderRejected {
        vehicle: VehicleId,
        existing: OrderId,
    },

    #[error("{0} not found")]
    OrderNotFound(OrderId),

    #[error("No pending order to accept")]
    NoPendingOrder,
}

/// Which order the player accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptTarget {
    Order(OrderId),
    FirstPending,
}

/// Pending, active and closed orders plus per-order subscriptions
#[derive(Debug)]
pub struct OrderBook {
    min_burgers: u32,
    max_burgers: u32,
    /// Last allocated order number
    order_counter: u64,
    pending: Vec<Order>,
    /// Kept in acceptance order; delivery matching relies on it
    active: Vec<Order>,
    history: Vec<Order>,
    observers: HashMap<OrderId, Vec<VehicleId>>,
    notifications: Vec<(VehicleId, OrderEvent)>,
    events: Vec<OrderEvent>,
}

impl OrderBook {
    /// Burger counts are drawn from `min_burgers..=max_burgers`, so the range
    /// must not be empty. `SimConfig::validate` rejects it before a world is
    /// built.
    pub fn new(min_burgers: u32, max_burgers: u32) -> Self {
        debug_assert!(
            min_burgers <= max_burgers,
            "empty burger range {}..={}",
            min_burgers,
            max_burgers
        );
        Self {
            min_burgers,
            max_burgers,
            order_counter: 0,
            pending: Vec::new(),
            active: Vec::new(),
            history: Vec::new(),
            observers: HashMap::new(),
            notifications: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Register a pending order for `source`.
    ///
    /// Rejected when `source` already has a pending or active order; the
    /// rejection carries the existing id so the caller can adopt it.
    pub fn create_pending<R: Rng + ?Sized>(
        &mut self,
        source: VehicleId,
        now: f32,
        rng: &mut R,
    ) -> Result<OrderId, OrderError> {
        if let Some(existing) = self.find_by_source(source) {
            return Err(OrderError::DuplicateOrderRejected {
                vehicle: source,
                existing: existing.id,
            });
        }

        self.order_counter += 1;
        let id = OrderId(self.order_counter);
        let burger_count = rng.random_range(self.min_burgers..=self.max_burgers);

        self.pending.push(Order {
            id,
            burger_count,
            source,
            created_at: now,
            accepted_at: None,
            closed_at: None,
            state: OrderState::Pending,
        });

        info!("{} placed {} for {} burgers", source, id, burger_count);
        self.emit(OrderEvent::PendingOrderCreated(id));
        Ok(id)
    }

    /// Promote a pending order to active and broadcast its size as the
    /// capacity of every live package.
    pub fn accept_pending(
        &mut self,
        target: AcceptTarget,
        now: f32,
        packages: &mut PackageRegistry,
    ) -> Result<OrderId, OrderError> {
        let index = match target {
            AcceptTarget::Order(id) => self
                .pending
                .iter()
                .position(|o| o.id == id)
                .ok_or(OrderError::OrderNotFound(id))?,
            AcceptTarget::FirstPending => {
                if self.pending.is_empty() {
                    return Err(OrderError::NoPendingOrder);
                }
                0
            }
        };

        let mut order = self.pending.remove(index);
        order.state = OrderState::Active;
        order.accepted_at = Some(now);
        let (id, burger_count) = (order.id, order.burger_count);
        self.active.push(order);

        packages.broadcast_capacity(burger_count);

        info!("{} accepted ({} burgers)", id, burger_count);
        self.emit(OrderEvent::OrderAccepted(id));
        Ok(id)
    }

    /// Close an active order. Any other state is `OrderNotFound` and leaves the book untouched.
    pub fn complete_active(&mut self, id: OrderId, now: f32) -> Result<Order, OrderError> {
        let index = self
            .active
            .iter()
            .position(|o| o.id == id)
            .ok_or(OrderError::OrderNotFound(id))?;

        let mut order = self.active.remove(index);
        order.state = OrderState::Completed;
        order.closed_at = Some(now);
        self.history.push(order.clone());

        info!(
            "{} completed in {:.1}s",
            id,
            order.time_taken().unwrap_or_default()
        );
        self.emit(OrderEvent::OrderCompleted(id));
        self.observers.remove(&id);
        Ok(order)
    }

    /// The pending or active order of `source`, if any
    pub fn find_by_source(&self, source: VehicleId) -> Option<&Order> {
        self.pending
            .iter()
            .chain(self.active.iter())
            .find(|o| o.source == source)
    }

    /// Look an order up in any state
    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.pending
            .iter()
            .chain(self.active.iter())
            .chain(self.history.iter())
            .find(|o| o.id == id)
    }

    /// Pull-side query for vehicles that may have missed a notification
    pub fn poll_order_state(&self, id: OrderId) -> Option<OrderState> {
        self.get(id).map(|o| o.state)
    }

    /// Subscribe `vehicle` to transitions of `id`. Subscribing twice is a no-op.
    pub fn subscribe(&mut self, id: OrderId, vehicle: VehicleId) {
        let subscribers = self.observers.entry(id).or_default();
        if !subscribers.contains(&vehicle) {
            subscribers.push(vehicle);
        }
    }

    /// Drop every subscription `vehicle` holds, plus notifications still queued for it
    pub fn unsubscribe(&mut self, vehicle: VehicleId) {
        self.observers.retain(|_, subscribers| {
            subscribers.retain(|v| *v != vehicle);
            !subscribers.is_empty()
        });
        self.notifications.retain(|(v, _)| *v != vehicle);
    }

    pub fn is_subscribed(&self, vehicle: VehicleId) -> bool {
        self.observers.values().any(|s| s.contains(&vehicle))
    }

    pub fn subscription_count(&self) -> usize {
        self.observers.values().map(Vec::len).sum()
    }

    /// Notifications addressed to subscribers since the last drain
    pub fn drain_notifications(&mut self) -> Vec<(VehicleId, OrderEvent)> {
        std::mem::take(&mut self.notifications)
    }

    /// Every event since the last drain, for display only
    pub fn drain_events(&mut self) -> Vec<OrderEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pending_orders(&self) -> &[Order] {
        &self.pending
    }

    pub fn active_orders(&self) -> &[Order] {
        &self.active
    }

    /// Completed and abandoned orders, oldest first
    pub fn history(&self) -> &[Order] {
        &self.history
    }

    pub fn has_order_in_progress(&self) -> bool {
        !self.pending.is_empty() || !self.active.is_empty()
    }

    /// Most recently created order that is still pending or active
    pub fn latest_in_progress(&self) -> Option<&Order> {
        self.pending
            .iter()
            .chain(self.active.iter())
            .max_by_key(|o| o.id)
    }

    pub fn total_created(&self) -> u64 {
        self.order_counter
    }

    pub fn completed_count(&self) -> usize {
        self.history
            .iter()
            .filter(|o| o.state == OrderState::Completed)
            .count()
    }

    /// Pending or active orders whose vehicle is no longer in the simulation
    pub fn orphaned_orders<F>(&self, is_live: F) -> Vec<OrderId>
    where
        F: Fn(VehicleId) -> bool,
    {
        self.pending
            .iter()
            .chain(self.active.iter())
            .filter(|o| !is_live(o.source))
            .map(|o| o.id)
            .collect()
    }

    /// Move orphaned orders older than `ttl` into history as abandoned
    pub fn expire_orphans<F>(&mut self, now: f32, ttl: f32, is_live: F) -> Vec<OrderId>
    where
        F: Fn(VehicleId) -> bool,
    {
        let expired = |o: &Order| !is_live(o.source) && now - o.created_at >= ttl;

        let mut removed = Vec::new();
        for queue in [&mut self.pending, &mut self.active] {
            let (gone, kept): (Vec<Order>, Vec<Order>) =
                std::mem::take(queue).into_iter().partition(|o| expired(o));
            *queue = kept;
            removed.extend(gone);
        }
        removed.sort_by_key(|o| o.id);

        let mut ids = Vec::with_capacity(removed.len());
        for mut order in removed {
            order.state = OrderState::Abandoned;
            order.closed_at = Some(now);
            ids.push(order.id);
            debug!("{} abandoned after its vehicle left", order.id);
            self.emit(OrderEvent::OrderAbandoned(order.id));
            self.observers.remove(&order.id);
            self.history.push(order);
        }
        ids
    }

    fn emit(&mut self, event: OrderEvent) {
        self.events.push(event);
        if let Some(subscribers) = self.observers.get(&event.order_id()) {
            self.notifications
                .extend(subscribers.iter().map(|v| (*v, event)));
        }
    }
}
