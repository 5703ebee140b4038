//! Spawn scheduling for customer cars
//!
//! Pure policy: decides when a car should appear and what colour it gets.
//! The world owns the vehicles and acts on the returned ticket.

use log::debug;
use rand::seq::IndexedRandom;
use rand::Rng;

use super::types::{CarColor, COLOR_SIMILARITY_TOLERANCE};

/// Permission to spawn one car
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnTicket {
    pub color: CarColor,
    /// Same colour as the previous car
    pub is_special: bool,
}

/// Countdown-driven spawner bounded by a live-vehicle ceiling
#[derive(Debug, Clone)]
pub struct SpawnCoordinator {
    min_interval: f32,
    max_interval: f32,
    max_live: usize,
    palette: Vec<CarColor>,
    repeat_color_chance: f32,
    countdown: f32,
    last_color: Option<CarColor>,
}

impl SpawnCoordinator {
    pub fn new<R: Rng + ?Sized>(
        min_interval: f32,
        max_interval: f32,
        max_live: usize,
        palette: Vec<CarColor>,
        repeat_color_chance: f32,
        rng: &mut R,
    ) -> Self {
        let mut spawner = Self {
            min_interval,
            max_interval,
            max_live,
            palette,
            repeat_color_chance,
            countdown: 0.0,
            last_color: None,
        };
        spawner.countdown = spawner.sample_interval(rng);
        spawner
    }

    /// Seconds left until the next spawn attempt
    pub fn countdown(&self) -> f32 {
        self.countdown
    }

    pub fn max_live(&self) -> usize {
        self.max_live
    }

    /// Count down; when the timer elapses and there is room, hand out a ticket.
    /// A full lane skips the attempt and waits a fresh interval.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        delta_secs: f32,
        live_count: usize,
        rng: &mut R,
    ) -> Option<SpawnTicket> {
        self.countdown -= delta_secs;
        if self.countdown > 0.0 {
            return None;
        }
        self.countdown = self.sample_interval(rng);

        if live_count >= self.max_live {
            debug!("Spawn skipped: {} cars already on the lane", live_count);
            return None;
        }

        let color = self.pick_color(rng)?;
        let is_special = self
            .last_color
            .is_some_and(|last| color.is_similar(&last, COLOR_SIMILARITY_TOLERANCE));
        self.last_color = Some(color);

        Some(SpawnTicket { color, is_special })
    }

    fn pick_color<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<CarColor> {
        match self.last_color {
            Some(last) if rng.random::<f32>() < self.repeat_color_chance => Some(last),
            _ => self.palette.choose(rng).copied(),
        }
    }

    fn sample_interval<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        if self.max_interval > self.min_interval {
            rng.random_range(self.min_interval..self.max_interval)
        } else {
            self.min_interval
        }
    }
}
