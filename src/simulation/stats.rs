//! Running counters for a simulation run

use log::info;

/// Statistics collected while the simulation runs
#[derive(Debug, Clone, Default)]
pub struct SimulationStats {
    pub vehicles_spawned: u32,
    /// Vehicles that drove off the end of the route
    pub vehicles_retired: u32,
    /// Vehicles removed for any other reason
    pub vehicles_despawned: u32,
    pub special_vehicles: u32,
    pub orders_created: u32,
    pub orders_accepted: u32,
    pub orders_completed: u32,
    pub orders_abandoned: u32,
    pub failed_deliveries: u32,
    pub patience_expired: u32,
    pub events_triggered: u32,
    pub events_cancelled: u32,
    pub elapsed_time: f32,
}

impl SimulationStats {
    /// Share of created orders that were delivered, in percent
    pub fn fulfillment_rate(&self) -> f32 {
        if self.orders_created > 0 {
            self.orders_completed as f32 / self.orders_created as f32 * 100.0
        } else {
            0.0
        }
    }

    /// Log the end-of-run report
    pub fn log_report(&self, active_vehicles: usize, orphaned_orders: usize) {
        info!("=== SIMULATION COMPLETE ===");
        info!("Elapsed time: {:.2}s", self.elapsed_time);
        info!("Total vehicles spawned: {}", self.vehicles_spawned);
        info!("Total vehicles retired: {}", self.vehicles_retired);
        info!("Active vehicles: {}", active_vehicles);
        info!("Orders created: {}", self.orders_created);
        info!("Orders accepted: {}", self.orders_accepted);
        info!("Orders completed: {}", self.orders_completed);
        info!("Failed deliveries: {}", self.failed_deliveries);
        info!("Patience expired: {}", self.patience_expired);
        info!("Orphaned orders: {}", orphaned_orders);
        info!(
            "Random events: {} triggered, {} cancelled",
            self.events_triggered, self.events_cancelled
        );
        info!("Fulfillment rate: {:.1}%", self.fulfillment_rate());
    }
}
