//! A scripted stand-in for the player
//!
//! Works one order at a time: takes the first pending order after a short
//! reaction delay, walks back to the kitchen to assemble burgers at a fixed
//! rate, then carries the full package out to the window. Between orders it
//! waits at the window, outside the kitchen's safe zone. It only uses the
//! world's public command surface, the same one an input layer would call.

use anyhow::Result;
use log::debug;

use super::delivery::DeliveryOutcome;
use super::order_book::AcceptTarget;
use super::types::{OrderId, PackageId, Position};
use super::world::{SimWorld, PLAYER_START};

/// Seconds between noticing a pending order and accepting it
pub const DEFAULT_REACTION_SECS: f32 = 2.0;
/// Seconds to assemble one burger
pub const DEFAULT_ASSEMBLY_SECS: f32 = 3.0;
/// Walking speed in world units per second
pub const DEFAULT_WALK_SPEED: f32 = 2.0;

/// Where packages are handed through the window
pub const HAND_OVER_POINT: Position = Position {
    x: 0.0,
    y: 0.0,
    z: -0.5,
};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Stage {
    Idle,
    Accepting { remaining: f32 },
    Assembling {
        order: OrderId,
        package: PackageId,
        remaining: f32,
    },
    Delivering {
        order: OrderId,
        package: PackageId,
    },
}

/// Headless player that keeps the kitchen running
#[derive(Debug, Clone)]
pub struct ScriptedPlayer {
    reaction_secs: f32,
    assembly_secs: f32,
    walk_speed: f32,
    stage: Stage,
    pub deliveries: u32,
}

impl Default for ScriptedPlayer {
    fn default() -> Self {
        Self::new(DEFAULT_REACTION_SECS, DEFAULT_ASSEMBLY_SECS)
    }
}

impl ScriptedPlayer {
    pub fn new(reaction_secs: f32, assembly_secs: f32) -> Self {
        Self {
            reaction_secs,
            assembly_secs,
            walk_speed: DEFAULT_WALK_SPEED,
            stage: Stage::Idle,
            deliveries: 0,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.stage == Stage::Idle
    }

    pub fn tick(&mut self, delta_secs: f32, world: &mut SimWorld) -> Result<()> {
        let target = match self.stage {
            Stage::Idle | Stage::Delivering { .. } => HAND_OVER_POINT,
            Stage::Accepting { .. } | Stage::Assembling { .. } => PLAYER_START,
        };
        world.player_position = world
            .player_position
            .step_towards(&target, self.walk_speed * delta_secs);
        let arrived = world.player_position.planar_distance(&target) <= f32::EPSILON;

        self.stage = match self.stage {
            Stage::Idle => {
                if world.order_book.pending_orders().is_empty() {
                    Stage::Idle
                } else {
                    Stage::Accepting {
                        remaining: self.reaction_secs,
                    }
                }
            }
            Stage::Accepting { remaining } if remaining > delta_secs => Stage::Accepting {
                remaining: remaining - delta_secs,
            },
            Stage::Accepting { .. } => match world.accept_order(AcceptTarget::FirstPending) {
                Ok(order) => Stage::Assembling {
                    order,
                    package: world.create_package(),
                    remaining: self.assembly_secs,
                },
                Err(_) => Stage::Idle,
            },
            // Burgers are only assembled in the kitchen
            Stage::Assembling { .. } if !arrived => self.stage,
            Stage::Assembling {
                order,
                package,
                remaining,
            } if remaining > delta_secs => Stage::Assembling {
                order,
                package,
                remaining: remaining - delta_secs,
            },
            Stage::Assembling { order, package, .. } => {
                world.add_burger(package)?;
                if world.packages.get(package).is_some_and(|p| p.is_full()) {
                    Stage::Delivering { order, package }
                } else {
                    Stage::Assembling {
                        order,
                        package,
                        remaining: self.assembly_secs,
                    }
                }
            }
            Stage::Delivering { .. } if !arrived => self.stage,
            Stage::Delivering { order, package } => self.hand_over(world, order, package)?,
        };
        Ok(())
    }

    fn hand_over(&mut self, world: &mut SimWorld, order: OrderId, package: PackageId) -> Result<Stage> {
        match world.deliver_package(package)? {
            DeliveryOutcome::Completed(done) => {
                self.deliveries += 1;
                debug!("Player delivered {} (working on {})", done.id, order);
            }
            DeliveryOutcome::Failed { fill_count } => {
                // Capacity moved under us; start over with a fresh box
                debug!("Player delivery of {} burgers rejected", fill_count);
                world.packages.destroy(package);
            }
            DeliveryOutcome::NoActiveOrders => {
                world.packages.destroy(package);
            }
        }
        Ok(Stage::Idle)
    }
}
