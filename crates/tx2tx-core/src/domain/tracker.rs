//! Pointer sampling, velocity estimation, and edge-transition detection.
//!
//! The tracker keeps a fixed five-sample ring of `(position, timestamp)`
//! pairs and derives velocity from the oldest and newest samples. A
//! boundary transition fires only when four gates all pass: strict edge
//! contact, velocity above the configured threshold, at least two
//! consecutive samples on the same edge, and continuous edge contact for
//! the dwell interval. The gates keep a single noisy coordinate sample or
//! a slow drift against the edge from switching screens.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::domain::events::ScreenTransition;
use crate::domain::geometry::{Direction, Position, Screen};

/// Number of recent samples kept for velocity calculation.
const POSITION_HISTORY_SIZE: usize = 5;

/// Consecutive samples on the same edge required before a transition.
const EDGE_CONFIRMATION_SAMPLES: usize = 2;

/// Minimum continuous edge contact before a transition, counted from the
/// first sample on the edge.
const EDGE_DWELL: Duration = Duration::from_millis(80);

/// Tracks pointer position and detects screen boundary crossings.
///
/// The tracker does not own the display connection; the engine samples the
/// platform pointer and feeds positions in together with their timestamps,
/// which keeps the gate timing fully controllable in tests.
#[derive(Debug)]
pub struct PointerTracker {
    edge_threshold: i32,
    velocity_threshold: f64,
    history: VecDeque<(Position, Instant)>,
    /// Edge the pointer is continuously touching and when contact began.
    edge_contact: Option<(Direction, Instant)>,
}

impl PointerTracker {
    /// Creates a tracker with the configured thresholds.
    pub fn new(edge_threshold: i32, velocity_threshold: f64) -> Self {
        Self {
            edge_threshold,
            velocity_threshold,
            history: VecDeque::with_capacity(POSITION_HISTORY_SIZE),
            edge_contact: None,
        }
    }

    /// Records one pointer sample and updates the continuous edge-contact
    /// window used for dwell gating.
    pub fn position_record(&mut self, position: Position, screen: &Screen, now: Instant) {
        if self.history.len() == POSITION_HISTORY_SIZE {
            self.history.pop_front();
        }
        self.history.push_back((position, now));

        match edge_direction(position, screen) {
            Some(direction) => {
                let same_edge = matches!(self.edge_contact, Some((d, _)) if d == direction);
                if !same_edge {
                    self.edge_contact = Some((direction, now));
                }
            }
            None => self.edge_contact = None,
        }
    }

    /// Pointer speed in px/s over the sample window, using the Manhattan
    /// distance between the oldest and newest samples. Zero with fewer than
    /// two samples or a non-positive time delta.
    pub fn velocity(&self) -> f64 {
        if self.history.len() < 2 {
            return 0.0;
        }
        let (oldest_pos, oldest_time) = match self.history.front() {
            Some(&sample) => sample,
            None => return 0.0,
        };
        let (newest_pos, newest_time) = match self.history.back() {
            Some(&sample) => sample,
            None => return 0.0,
        };
        let delta = newest_time.saturating_duration_since(oldest_time).as_secs_f64();
        if delta <= 0.0 {
            return 0.0;
        }
        let distance = (newest_pos.x - oldest_pos.x).abs() + (newest_pos.y - oldest_pos.y).abs();
        distance as f64 / delta
    }

    /// Returns `true` when `position` is within the near-edge telemetry
    /// band (used for debug logging only; detection requires strict edge
    /// contact).
    pub fn near_edge(&self, position: Position, screen: &Screen) -> bool {
        let band = self.edge_threshold.max(4);
        position.x <= band
            || position.x >= screen.width() - 1 - band
            || position.y <= band
            || position.y >= screen.height() - 1 - band
    }

    /// Detects an edge transition at `position`.
    ///
    /// Fires only when the position touches a strict edge pixel, velocity
    /// meets the threshold, at least [`EDGE_CONFIRMATION_SAMPLES`] of the
    /// most recent samples sit on that same edge, and continuous contact
    /// with the edge has lasted at least [`EDGE_DWELL`]. At a corner the
    /// first matching edge wins, in LEFT, RIGHT, TOP, BOTTOM order.
    pub fn boundary_detect(
        &self,
        position: Position,
        screen: &Screen,
        now: Instant,
    ) -> Option<ScreenTransition> {
        let direction = edge_direction(position, screen)?;

        if self.velocity() < self.velocity_threshold {
            return None;
        }
        if self.trailing_edge_samples(direction, screen) < EDGE_CONFIRMATION_SAMPLES {
            return None;
        }
        match self.edge_contact {
            Some((contact_dir, since))
                if contact_dir == direction
                    && now.saturating_duration_since(since) >= EDGE_DWELL =>
            {
                Some(ScreenTransition {
                    direction,
                    position,
                })
            }
            _ => None,
        }
    }

    /// Clears the sample ring and the dwell/confirmation accumulators.
    ///
    /// Called after every context transition: a warp teleports the pointer,
    /// and stale samples or edge-contact state from before the warp would
    /// otherwise read as a velocity spike or lingering edge touch and trip
    /// a spurious transition on the next tick.
    pub fn reset(&mut self) {
        self.history.clear();
        self.edge_contact = None;
    }

    /// Counts the unbroken run of most-recent samples sitting on `direction`.
    fn trailing_edge_samples(&self, direction: Direction, screen: &Screen) -> usize {
        self.history
            .iter()
            .rev()
            .take_while(|(pos, _)| edge_direction(*pos, screen) == Some(direction))
            .count()
    }
}

/// Strict-edge contact test. Corner tie-break: LEFT, RIGHT, TOP, BOTTOM.
fn edge_direction(position: Position, screen: &Screen) -> Option<Direction> {
    if position.x <= 0 {
        Some(Direction::Left)
    } else if position.x >= screen.width() - 1 {
        Some(Direction::Right)
    } else if position.y <= 0 {
        Some(Direction::Top)
    } else if position.y >= screen.height() - 1 {
        Some(Direction::Bottom)
    } else {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
