//! Backpressure stimulus generators.
//!
//! Generators yield `(on, off)` cycle-count pairs describing how long a
//! signal should be held high, then low. [`ReadyToggler`] applies such a
//! pattern to a bus's `ready` wire, one edge at a time, to exercise
//! handshake stalls without a live simulator.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bus::SharedBus;

/// Uniformly random `(on, off)` windows from a seeded generator, so
/// stall patterns are reproducible across test runs.
pub struct RandomToggle {
    rng: StdRng,
    on_range: (u32, u32),
    off_range: (u32, u32),
}

impl RandomToggle {
    pub fn new(seed: u64) -> Self {
        Self::with_ranges(seed, (0, 15), (0, 15))
    }

    pub fn with_ranges(seed: u64, on_range: (u32, u32), off_range: (u32, u32)) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            on_range,
            off_range,
        }
    }
}

impl Iterator for RandomToggle {
    type Item = (u32, u32);

    fn next(&mut self) -> Option<(u32, u32)> {
        let on = self.rng.random_range(self.on_range.0..=self.on_range.1);
        let off = self.rng.random_range(self.off_range.0..=self.off_range.1);
        Some((on, off))
    }
}

/// Deterministic sine-shaped `(on, off)` windows.
pub struct WaveToggle {
    on_amplitude: f64,
    on_period: f64,
    off_amplitude: f64,
    off_period: f64,
    step: u64,
}

impl WaveToggle {
    pub fn new(on_amplitude: u32, on_period: u32, off_amplitude: u32, off_period: u32) -> Self {
        Self {
            on_amplitude: on_amplitude as f64,
            on_period: on_period.max(1) as f64,
            off_amplitude: off_amplitude as f64,
            off_period: off_period.max(1) as f64,
            step: 0,
        }
    }
}

impl Iterator for WaveToggle {
    type Item = (u32, u32);

    fn next(&mut self) -> Option<(u32, u32)> {
        let t = self.step as f64;
        self.step += 1;
        let on = (self.on_amplitude * (2.0 * std::f64::consts::PI * t / self.on_period).sin()).abs();
        let off =
            (self.off_amplitude * (2.0 * std::f64::consts::PI * t / self.off_period).sin()).abs();
        Some((on as u32, off as u32))
    }
}

/// Drives a bus's `ready` wire from an `(on, off)` pattern.
pub struct ReadyToggler<G: Iterator<Item = (u32, u32)>> {
    bus: SharedBus,
    pattern: G,
    high_left: u32,
    low_left: u32,
}

impl<G: Iterator<Item = (u32, u32)>> ReadyToggler<G> {
    pub fn new(bus: SharedBus, pattern: G) -> Self {
        Self {
            bus,
            pattern,
            high_left: 0,
            low_left: 0,
        }
    }

    /// Set `ready` for the coming cycle. Zero-length windows are skipped
    /// so the pattern can never wedge with both counters empty.
    pub fn clock_edge(&mut self) {
        while self.high_left == 0 && self.low_left == 0 {
            match self.pattern.next() {
                Some((on, off)) => {
                    self.high_left = on;
                    self.low_left = off;
                }
                None => {
                    // Pattern exhausted: leave ready high.
                    self.bus.borrow_mut().ready = true;
                    return;
                }
            }
        }

        let mut wires = self.bus.borrow_mut();
        if self.high_left > 0 {
            self.high_left -= 1;
            wires.ready = true;
        } else {
            self.low_left -= 1;
            wires.ready = false;
        }
    }
}
