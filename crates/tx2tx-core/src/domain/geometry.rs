//! Screen geometry and the coordinate normalization law.
//!
//! All pointer motion crosses the wire as resolution-independent
//! [`NormalizedPoint`] coordinates in `[0.0, 1.0]`. The capturing side
//! normalizes against its own screen; the injecting side denormalizes
//! against its own. The special value `(-1.0, -1.0)` is the *hide signal*:
//! it is not a coordinate and must never be denormalized.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A 2D pixel position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    /// Creates a position at `(x, y)`.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Screen dimensions. Both axes are at least 1 pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Screen {
    width: i32,
    height: i32,
}

impl Screen {
    /// Creates a screen geometry. Dimensions below 1 are clamped to 1 so
    /// that normalization is always a total function.
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Returns `true` if `pos` lies within the screen bounds.
    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.x < self.width && pos.y >= 0 && pos.y < self.height
    }

    /// Maps a pixel position to resolution-independent coordinates.
    ///
    /// The position is clamped to `[0, width] x [0, height]` first, so the
    /// result always lies in `[0.0, 1.0]` per axis: positions outside the
    /// screen normalize to the nearest in-bound edge.
    pub fn normalize(&self, pos: Position) -> NormalizedPoint {
        let clamped_x = pos.x.clamp(0, self.width) as f64;
        let clamped_y = pos.y.clamp(0, self.height) as f64;
        NormalizedPoint {
            x: clamped_x / self.width as f64,
            y: clamped_y / self.height as f64,
        }
    }

    /// Maps normalized coordinates back to a pixel position on this screen.
    ///
    /// For any in-bounds position `p`, `denormalize(normalize(p))` equals
    /// `p` within one pixel per axis. The hide signal must be filtered out
    /// by the caller before denormalizing (see
    /// [`NormalizedPoint::is_hide_signal`]).
    pub fn denormalize(&self, point: NormalizedPoint) -> Position {
        Position {
            x: (point.x * self.width as f64).round() as i32,
            y: (point.y * self.height as f64).round() as i32,
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Resolution-independent pointer coordinates.
///
/// Valid wire values lie in `[0.0, 1.0]` per axis, except the hide signal
/// `(-1.0, -1.0)` which instructs the receiver to hide its cursor and
/// inject nothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

impl NormalizedPoint {
    /// The cursor-hide instruction sent on REMOTE→CENTER returns.
    pub const HIDE_SIGNAL: NormalizedPoint = NormalizedPoint { x: -1.0, y: -1.0 };

    /// Creates a normalized point at `(x, y)`.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns `true` when either axis is negative. Such a point is the
    /// hide signal, not a coordinate, and must not be denormalized.
    pub fn is_hide_signal(&self) -> bool {
        self.x < 0.0 || self.y < 0.0
    }
}

/// The four screen edges a pointer can cross.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
    Top,
    Bottom,
}

impl Direction {
    /// Lowercase wire/log name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Top => "top",
            Direction::Bottom => "bottom",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which screen currently has input focus: the local server (`Center`) or a
/// remote client in one of the four cardinal positions.
///
/// The four non-center contexts are in bijection with [`Direction`]: the
/// crossing edge determines the context, and each remote context remembers
/// the edge the pointer entered through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenContext {
    Center,
    West,
    East,
    North,
    South,
}

impl ScreenContext {
    /// Maps a boundary-crossing direction to the remote context behind it.
    pub fn from_direction(direction: Direction) -> ScreenContext {
        match direction {
            Direction::Left => ScreenContext::West,
            Direction::Right => ScreenContext::East,
            Direction::Top => ScreenContext::North,
            Direction::Bottom => ScreenContext::South,
        }
    }

    /// The edge the pointer exited through to enter this context, or `None`
    /// for `Center`. Inverse of [`ScreenContext::from_direction`].
    pub fn entry_direction(&self) -> Option<Direction> {
        match self {
            ScreenContext::Center => None,
            ScreenContext::West => Some(Direction::Left),
            ScreenContext::East => Some(Direction::Right),
            ScreenContext::North => Some(Direction::Top),
            ScreenContext::South => Some(Direction::Bottom),
        }
    }

    /// Returns `true` for any context other than `Center`.
    pub fn is_remote(&self) -> bool {
        !matches!(self, ScreenContext::Center)
    }

    /// Lowercase config/log name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScreenContext::Center => "center",
            ScreenContext::West => "west",
            ScreenContext::East => "east",
            ScreenContext::North => "north",
            ScreenContext::South => "south",
        }
    }
}

impl FromStr for ScreenContext {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "center" => Ok(ScreenContext::Center),
            "west" => Ok(ScreenContext::West),
            "east" => Ok(ScreenContext::East),
            "north" => Ok(ScreenContext::North),
            "south" => Ok(ScreenContext::South),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ScreenContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
