//! Package and delivery matching tests

use rand::rngs::StdRng;
use rand::SeedableRng;

use drive_thru_sim::simulation::{
    deliver, find_match, AcceptTarget, DeliveryOutcome, OrderBook, OrderId, OrderState, Package,
    PackageId, PackageRegistry, SimId, VehicleId,
};

fn vehicle(n: usize) -> VehicleId {
    VehicleId(SimId(n))
}

fn filled(id: usize, capacity: u32, burgers: u32) -> Package {
    let mut package = Package::new(PackageId(SimId(id)), capacity);
    for _ in 0..burgers {
        package.collect_burger();
    }
    package
}

#[test]
fn test_package_fills_up_to_capacity() {
    let mut package = Package::new(PackageId(SimId(0)), 2);
    assert!(!package.is_full());
    assert!(package.collect_burger());
    assert!(package.collect_burger());
    assert!(package.is_full());
    assert!(!package.collect_burger());
    assert_eq!(package.fill_count(), 2);
}

#[test]
fn test_shrunk_package_counts_as_full() {
    let mut package = filled(0, 3, 3);
    package.set_capacity(1);
    assert!(package.is_full());
    assert!(!package.collect_burger());
    assert_eq!(package.fill_count(), 3);
}

#[test]
fn test_registry_add_burger_unknown_package() {
    let mut packages = PackageRegistry::new(2);
    let id = packages.create();
    assert!(packages.add_burger(id).unwrap());
    assert!(packages.add_burger(id).unwrap());
    assert!(!packages.add_burger(id).unwrap());

    assert!(packages.destroy(id).is_some());
    assert!(packages.add_burger(id).is_err());
    assert!(packages.is_empty());
}

#[test]
fn test_equal_counts_complete_oldest_accepted_order() {
    let mut book = OrderBook::new(2, 2);
    let mut packages = PackageRegistry::new(1);
    let mut rng = StdRng::seed_from_u64(1);

    let first = book.create_pending(vehicle(1), 0.0, &mut rng).unwrap();
    let second = book.create_pending(vehicle(2), 0.0, &mut rng).unwrap();
    book.accept_pending(AcceptTarget::Order(first), 0.0, &mut packages)
        .unwrap();
    book.accept_pending(AcceptTarget::Order(second), 0.0, &mut packages)
        .unwrap();

    let package = filled(0, packages.global_capacity(), 2);
    assert_eq!(find_match(&package, book.active_orders()), Some(first));

    match deliver(&package, &mut book, 5.0) {
        DeliveryOutcome::Completed(order) => assert_eq!(order.id, OrderId(1)),
        other => panic!("expected completion, got {:?}", other),
    }
    assert_eq!(book.poll_order_state(second), Some(OrderState::Active));

    // The next identical package serves the remaining order
    match deliver(&package, &mut book, 6.0) {
        DeliveryOutcome::Completed(order) => assert_eq!(order.id, second),
        other => panic!("expected completion, got {:?}", other),
    }
}

#[test]
fn test_partial_package_fails() {
    let mut book = OrderBook::new(3, 3);
    let mut packages = PackageRegistry::new(1);
    let mut rng = StdRng::seed_from_u64(2);

    let id = book.create_pending(vehicle(1), 0.0, &mut rng).unwrap();
    book.accept_pending(AcceptTarget::Order(id), 0.0, &mut packages)
        .unwrap();

    let package = filled(0, 3, 1);
    assert_eq!(
        deliver(&package, &mut book, 1.0),
        DeliveryOutcome::Failed { fill_count: 1 }
    );
    assert_eq!(book.poll_order_state(id), Some(OrderState::Active));
}

#[test]
fn test_full_package_with_wrong_count_fails() {
    let mut book = OrderBook::new(3, 3);
    let mut packages = PackageRegistry::new(1);
    let mut rng = StdRng::seed_from_u64(3);

    let id = book.create_pending(vehicle(1), 0.0, &mut rng).unwrap();
    book.accept_pending(AcceptTarget::Order(id), 0.0, &mut packages)
        .unwrap();

    // Full at two, but the order wants exactly three
    let package = filled(0, 2, 2);
    assert!(package.is_full());
    assert_eq!(find_match(&package, book.active_orders()), None);
    assert_eq!(
        deliver(&package, &mut book, 1.0),
        DeliveryOutcome::Failed { fill_count: 2 }
    );
}

#[test]
fn test_no_active_orders_ignores_package() {
    let mut book = OrderBook::new(1, 4);
    let mut rng = StdRng::seed_from_u64(4);
    book.create_pending(vehicle(1), 0.0, &mut rng).unwrap();

    let package = filled(0, 1, 1);
    assert_eq!(
        deliver(&package, &mut book, 1.0),
        DeliveryOutcome::NoActiveOrders
    );
    assert!(book.drain_events().iter().all(|e| e.order_id() == OrderId(1)));
    assert_eq!(book.completed_count(), 0);
}

#[test]
fn test_package_filled_before_shrinking_broadcast_still_matches() {
    let mut book = OrderBook::new(1, 4);
    let mut packages = PackageRegistry::new(1);
    let mut rng = StdRng::seed_from_u64(5);

    for n in 0..20 {
        book.create_pending(vehicle(n), 0.0, &mut rng).unwrap();
    }
    let pending = book.pending_orders().to_vec();
    let big = pending.iter().max_by_key(|o| o.burger_count).unwrap().clone();
    let small = pending.iter().min_by_key(|o| o.burger_count).unwrap().clone();
    assert!(big.burger_count > small.burger_count);

    book.accept_pending(AcceptTarget::Order(big.id), 0.0, &mut packages)
        .unwrap();
    let package_id = packages.create();
    while packages.add_burger(package_id).unwrap() {}
    assert_eq!(
        packages.get(package_id).unwrap().fill_count(),
        big.burger_count
    );

    // Accepting the smaller order shrinks the package under the first order's feet
    book.accept_pending(AcceptTarget::Order(small.id), 0.0, &mut packages)
        .unwrap();
    let package = packages.get(package_id).unwrap();
    assert_eq!(package.capacity(), small.burger_count);
    assert!(package.is_full());

    match deliver(package, &mut book, 1.0) {
        DeliveryOutcome::Completed(order) => assert_eq!(order.id, big.id),
        other => panic!("expected completion, got {:?}", other),
    }
}
