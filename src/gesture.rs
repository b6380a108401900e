//! Push/pull gesture timing
//!
//! A push & pull control fires one of two commands depending on how long
//! it was held. The timer remembers when each control was pressed and
//! turns the matching release into a [`Gesture`].

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

/// Hold time from which a press/release pair counts as a pull
pub const PUSH_PULL_THRESHOLD: Duration = Duration::from_secs(1);

/// Outcome of a completed press/release pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Push,
    Pull,
}

impl Gesture {
    /// Classify a hold duration
    pub fn from_hold(held: Duration) -> Self {
        if held < PUSH_PULL_THRESHOLD {
            Gesture::Push
        } else {
            Gesture::Pull
        }
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gesture::Push => write!(f, "push"),
            Gesture::Pull => write!(f, "pull"),
        }
    }
}

/// Press timestamps for one device, keyed by control id
///
/// Owned by the device's inbound callback; never shared between threads.
#[derive(Debug, Default)]
pub struct GestureTimer {
    presses: HashMap<u32, Instant>,
}

impl GestureTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a press
    ///
    /// Only the first press counts: a repeated press while the control is
    /// already held keeps the original timestamp.
    pub fn press(&mut self, control_id: u32, at: Instant) {
        self.presses.entry(control_id).or_insert(at);
    }

    /// Consume the press for `control_id` and return how long it was held
    ///
    /// `None` when no press was recorded, which is a normal outcome
    /// (duplicate release, or a press that predates the mapping).
    pub fn release(&mut self, control_id: u32, at: Instant) -> Option<Duration> {
        self.presses
            .remove(&control_id)
            .map(|pressed| at.saturating_duration_since(pressed))
    }

    /// Consume the press and classify the hold
    pub fn complete(&mut self, control_id: u32, at: Instant) -> Option<Gesture> {
        self.release(control_id, at).map(Gesture::from_hold)
    }

    pub fn is_pressed(&self, control_id: u32) -> bool {
        self.presses.contains_key(&control_id)
    }
}
