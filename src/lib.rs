//! Drive-Through Simulation Library
//!
//! Customer cars queue along a lane, order at a window, wait for the player
//! to fill and hand over their order, then drive off.

pub mod simulation;
