//! Vehicle state machine tests, driven directly against an order book

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use drive_thru_sim::simulation::{
    AcceptTarget, CarColor, OrderBook, OrderEvent, OrderId, OrderState, OrderWait,
    PackageRegistry, Position, ResumeReason, Route, SimConfig, SimId, VehicleAgent, VehicleId,
    VehicleProximityIndex, VehicleSnapshot, VehicleUpdateResult,
};

const DT: f32 = 0.1;

struct Harness {
    book: OrderBook,
    packages: PackageRegistry,
    proximity: VehicleProximityIndex,
    config: SimConfig,
    rng: StdRng,
    time: f32,
}

impl Harness {
    fn new(config: SimConfig) -> Self {
        Self {
            book: OrderBook::new(config.min_burgers, config.max_burgers),
            packages: PackageRegistry::new(config.min_burgers),
            proximity: VehicleProximityIndex::new(config.safety_radius, config.forward_cone_degrees),
            config,
            rng: StdRng::seed_from_u64(11),
            time: 0.0,
        }
    }

    fn step(&mut self, vehicle: &mut VehicleAgent) -> VehicleUpdateResult {
        self.time += DT;
        vehicle
            .update(
                DT,
                &mut self.book,
                &self.proximity,
                &self.config,
                self.time,
                &mut self.rng,
            )
            .unwrap()
    }

    /// Step until the vehicle is waiting at the window; returns every result seen
    fn drive_to_window(&mut self, vehicle: &mut VehicleAgent) -> Vec<VehicleUpdateResult> {
        let mut results = Vec::new();
        for _ in 0..200 {
            results.push(self.step(vehicle));
            if vehicle.is_waiting() {
                return results;
            }
        }
        panic!("vehicle never reached the order window");
    }
}

fn new_vehicle(id: usize) -> VehicleAgent {
    let route = Arc::new(Route::drive_thru_loop().unwrap());
    VehicleAgent::new(
        VehicleId(SimId(id)),
        route,
        5.0,
        CarColor::rgb(0.8, 0.1, 0.1),
        false,
    )
}

#[test]
fn test_vehicle_starts_at_spawn_point() {
    let vehicle = new_vehicle(0);
    assert_eq!(vehicle.position(), Position::new(-12.0, 0.0, 0.0));
    assert_eq!(vehicle.current_waypoint(), 0);
    assert_eq!(vehicle.order_wait(), OrderWait::Idle);
    assert_eq!(vehicle.progress(), 0.0);
}

#[test]
fn test_order_placed_once_at_window() {
    let mut h = Harness::new(SimConfig::default());
    let mut vehicle = new_vehicle(0);

    let results = h.drive_to_window(&mut vehicle);
    let placed: Vec<OrderId> = results
        .iter()
        .filter_map(|r| match r {
            VehicleUpdateResult::OrderPlaced(id) => Some(*id),
            _ => None,
        })
        .collect();
    assert_eq!(placed.len(), 1);
    assert_eq!(vehicle.current_waypoint(), vehicle.route().order_waypoint());
    assert_eq!(vehicle.current_speed(), 0.0);
    assert!(h.book.is_subscribed(vehicle.id));

    // Waiting for acceptance does not spend patience or place more orders
    for _ in 0..300 {
        assert_eq!(h.step(&mut vehicle), VehicleUpdateResult::Continue);
    }
    assert_eq!(
        vehicle.order_wait(),
        OrderWait::WaitingPendingAcceptance { order: placed[0] }
    );

    let created = h
        .book
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, OrderEvent::PendingOrderCreated(_)))
        .count();
    assert_eq!(created, 1);
    assert_eq!(h.book.total_created(), 1);
}

#[test]
fn test_accept_and_deliver_advances_exactly_once() {
    let mut h = Harness::new(SimConfig::default());
    let mut vehicle = new_vehicle(0);
    h.drive_to_window(&mut vehicle);
    let order = vehicle.current_order().unwrap();

    h.book
        .accept_pending(AcceptTarget::Order(order), h.time, &mut h.packages)
        .unwrap();
    for (target, event) in h.book.drain_notifications() {
        assert_eq!(target, vehicle.id);
        vehicle.handle_notification(event, &mut h.book, &h.config);
    }
    assert!(matches!(
        vehicle.order_wait(),
        OrderWait::WaitingFulfillment { order: o, .. } if o == order
    ));

    h.step(&mut vehicle);
    h.book.complete_active(order, h.time).unwrap();
    let notifications = h.book.drain_notifications();
    assert_eq!(
        notifications,
        vec![(vehicle.id, OrderEvent::OrderCompleted(order))]
    );

    let window = vehicle.current_waypoint();
    let result = vehicle.handle_notification(notifications[0].1, &mut h.book, &h.config);
    assert_eq!(
        result,
        VehicleUpdateResult::Resumed {
            order,
            reason: ResumeReason::Fulfilled,
        }
    );
    assert_eq!(vehicle.current_waypoint(), window + 1);
    assert!(!h.book.is_subscribed(vehicle.id));

    // A duplicate notification and the poll on the next update are both no-ops
    assert_eq!(
        vehicle.handle_notification(notifications[0].1, &mut h.book, &h.config),
        VehicleUpdateResult::Continue
    );
    h.step(&mut vehicle);
    assert_eq!(vehicle.current_waypoint(), window + 1);
    assert!(vehicle.current_speed() > 0.0);
}

#[test]
fn test_poll_catches_missed_notifications() {
    let mut h = Harness::new(SimConfig::default());
    let mut vehicle = new_vehicle(0);
    h.drive_to_window(&mut vehicle);
    let order = vehicle.current_order().unwrap();

    h.book
        .accept_pending(AcceptTarget::FirstPending, h.time, &mut h.packages)
        .unwrap();
    h.book.complete_active(order, h.time).unwrap();
    h.book.drain_notifications();

    // Completed without ever seeing OrderAccepted
    assert_eq!(
        h.step(&mut vehicle),
        VehicleUpdateResult::Resumed {
            order,
            reason: ResumeReason::Fulfilled,
        }
    );
    assert_eq!(vehicle.current_waypoint(), vehicle.route().order_waypoint() + 1);
}

#[test]
fn test_patience_expiry_leaves_order_active() {
    let config = SimConfig {
        patience_secs: 1.0,
        ..SimConfig::default()
    };
    let mut h = Harness::new(config);
    let mut vehicle = new_vehicle(0);
    h.drive_to_window(&mut vehicle);
    let order = vehicle.current_order().unwrap();

    h.book
        .accept_pending(AcceptTarget::Order(order), h.time, &mut h.packages)
        .unwrap();
    h.book.drain_notifications();

    let mut resumed = None;
    for _ in 0..30 {
        if let VehicleUpdateResult::Resumed { reason, .. } = h.step(&mut vehicle) {
            resumed = Some(reason);
            break;
        }
    }
    assert_eq!(resumed, Some(ResumeReason::PatienceExpired));

    assert_eq!(h.book.poll_order_state(order), Some(OrderState::Active));
    assert_eq!(h.book.active_orders().len(), 1);
    assert!(!h.book.is_subscribed(vehicle.id));
    assert_eq!(vehicle.current_waypoint(), vehicle.route().order_waypoint() + 1);

    // Completing it later reaches nobody
    h.book.complete_active(order, h.time).unwrap();
    assert!(h.book.drain_notifications().is_empty());
}

#[test]
fn test_existing_order_is_adopted() {
    let mut h = Harness::new(SimConfig::default());
    let mut vehicle = new_vehicle(0);
    let existing = h.book.create_pending(vehicle.id, 0.0, &mut h.rng).unwrap();

    let results = h.drive_to_window(&mut vehicle);
    assert!(!results
        .iter()
        .any(|r| matches!(r, VehicleUpdateResult::OrderPlaced(_))));
    assert_eq!(vehicle.current_order(), Some(existing));
    assert_eq!(h.book.total_created(), 1);
}

#[test]
fn test_detach_unsubscribes_and_retires() {
    let mut h = Harness::new(SimConfig::default());
    let mut vehicle = new_vehicle(0);
    h.drive_to_window(&mut vehicle);
    let order = vehicle.current_order().unwrap();

    vehicle.detach(&mut h.book);
    assert!(!h.book.is_subscribed(vehicle.id));
    assert_eq!(h.book.subscription_count(), 0);
    assert_eq!(h.step(&mut vehicle), VehicleUpdateResult::Retire);

    // The order outlives its vehicle
    assert_eq!(h.book.poll_order_state(order), Some(OrderState::Pending));
    h.book
        .accept_pending(AcceptTarget::Order(order), h.time, &mut h.packages)
        .unwrap();
    assert!(h.book.drain_notifications().is_empty());
}

#[test]
fn test_vehicle_retires_after_last_waypoint() {
    let mut h = Harness::new(SimConfig::default());
    let mut vehicle = new_vehicle(0);
    h.drive_to_window(&mut vehicle);
    let order = vehicle.current_order().unwrap();
    h.book
        .accept_pending(AcceptTarget::Order(order), h.time, &mut h.packages)
        .unwrap();
    h.book.complete_active(order, h.time).unwrap();

    let mut retired = false;
    for _ in 0..300 {
        if h.step(&mut vehicle) == VehicleUpdateResult::Retire {
            retired = true;
            break;
        }
        assert!(vehicle.current_waypoint() <= vehicle.route().last_index());
    }
    assert!(retired);
    assert_eq!(vehicle.current_waypoint(), vehicle.route().last_index());
    let last = vehicle.route().last_index();
    assert_eq!(vehicle.position(), *vehicle.route().waypoint(last).unwrap());
}

#[test]
fn test_braking_behind_stopped_car() {
    let mut h = Harness::new(SimConfig::default());
    let mut vehicle = new_vehicle(0);
    let spawn = vehicle.route().spawn_point();

    let stopped = VehicleSnapshot {
        id: VehicleId(SimId(1)),
        position: Position::new(spawn.x + 0.3, 0.0, 0.0),
        heading: vehicle.heading(),
        progress: 0.3,
        odometer: 0.3,
    };
    h.proximity.rebuild([vehicle.snapshot(), stopped]);

    let mut last_speed = vehicle.current_speed();
    for _ in 0..10 {
        h.step(&mut vehicle);
        assert!(vehicle.is_braking());
        assert!(vehicle.current_speed() <= last_speed);
        last_speed = vehicle.current_speed();
    }
    assert_eq!(vehicle.current_speed(), 0.0);
    assert!(vehicle.position().planar_distance(&stopped.position) > 0.1);
}

#[test]
fn test_progress_is_monotonic() {
    let mut h = Harness::new(SimConfig::default());
    let mut vehicle = new_vehicle(0);
    let mut last = vehicle.progress();
    h.drive_to_window(&mut vehicle);
    assert!(vehicle.progress() > last);
    last = vehicle.progress();

    let order = vehicle.current_order().unwrap();
    h.book
        .accept_pending(AcceptTarget::Order(order), h.time, &mut h.packages)
        .unwrap();
    h.book.complete_active(order, h.time).unwrap();
    for _ in 0..100 {
        if h.step(&mut vehicle) == VehicleUpdateResult::Retire {
            break;
        }
        assert!(vehicle.progress() >= last);
        last = vehicle.progress();
    }
}
