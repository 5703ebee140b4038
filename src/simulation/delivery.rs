//! Matching delivered packages against active orders

use log::{info, warn};

use super::order_book::{Order, OrderBook};
use super::package::Package;
use super::types::OrderId;

/// What happened to a package dropped at the delivery point
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    /// The package matched and the order is complete; the package is consumed
    Completed(Order),
    /// No active order fits; the package goes back into play
    Failed { fill_count: u32 },
    /// Nothing to deliver against; the package is ignored
    NoActiveOrders,
}

/// Index of the active order a package satisfies.
///
/// The package must be full and hold exactly the order's burger count. When
/// several active orders share that count the oldest accepted one wins.
pub fn find_match(package: &Package, active_orders: &[Order]) -> Option<OrderId> {
    if !package.is_full() {
        return None;
    }
    active_orders
        .iter()
        .find(|order| order.burger_count == package.fill_count())
        .map(|order| order.id)
}

/// Check a package against the book and complete the first matching order
pub fn deliver(package: &Package, book: &mut OrderBook, now: f32) -> DeliveryOutcome {
    if book.active_orders().is_empty() {
        return DeliveryOutcome::NoActiveOrders;
    }

    let Some(order_id) = find_match(package, book.active_orders()) else {
        warn!(
            "{} with {}/{} burgers matches no active order",
            package.id,
            package.fill_count(),
            package.capacity()
        );
        return DeliveryOutcome::Failed {
            fill_count: package.fill_count(),
        };
    };

    match book.complete_active(order_id, now) {
        Ok(order) => {
            info!("{} delivered for {}", package.id, order_id);
            DeliveryOutcome::Completed(order)
        }
        // find_match only returns ids taken from the active list
        Err(_) => DeliveryOutcome::Failed {
            fill_count: package.fill_count(),
        },
    }
}
