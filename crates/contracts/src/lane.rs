//! Lane identifiers and per-lane signal state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ContractError;

/// One of the four approaches to the intersection.
///
/// The declaration order is the fixed round-robin order (N → E → S → W).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    #[serde(alias = "N", alias = "n")]
    North,
    #[serde(alias = "E", alias = "e")]
    East,
    #[serde(alias = "S", alias = "s")]
    South,
    #[serde(alias = "W", alias = "w")]
    West,
}

impl Lane {
    /// All lanes in round-robin order.
    pub const ALL: [Lane; 4] = [Lane::North, Lane::East, Lane::South, Lane::West];

    /// Number of lanes at the intersection.
    pub const COUNT: usize = 4;

    /// Position in [`Lane::ALL`].
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Lane::North => 0,
            Lane::East => 1,
            Lane::South => 2,
            Lane::West => 3,
        }
    }

    /// Inverse of [`Lane::index`]. Out-of-range indices return `None`.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Next lane in the cyclic order N → E → S → W → N.
    #[inline]
    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::COUNT]
    }

    /// Single-letter code used in logs and recordings.
    pub fn code(self) -> &'static str {
        match self {
            Lane::North => "N",
            Lane::East => "E",
            Lane::South => "S",
            Lane::West => "W",
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Lane {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "n" | "north" => Ok(Lane::North),
            "e" | "east" => Ok(Lane::East),
            "s" | "south" => Ok(Lane::South),
            "w" | "west" => Ok(Lane::West),
            _ => Err(ContractError::invalid_lane(s)),
        }
    }
}

/// Signal color shown to one lane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LightState {
    #[default]
    Red,
    Yellow,
    Green,
}

/// Operating mode of the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ControllerMode {
    /// Round-robin cycling
    #[default]
    Normal,
    /// Single-lane emergency override
    Priority,
}

impl fmt::Display for ControllerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerMode::Normal => f.write_str("NORMAL"),
            ControllerMode::Priority => f.write_str("PRIORITY"),
        }
    }
}

/// Light assignment for the whole intersection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneLights {
    pub north: LightState,
    pub east: LightState,
    pub south: LightState,
    pub west: LightState,
}

impl LaneLights {
    /// Every lane RED.
    pub fn all_red() -> Self {
        Self::default()
    }

    /// One lane showing `state`, all others RED.
    pub fn only(lane: Lane, state: LightState) -> Self {
        let mut lights = Self::all_red();
        lights.set(lane, state);
        lights
    }

    pub fn get(&self, lane: Lane) -> LightState {
        match lane {
            Lane::North => self.north,
            Lane::East => self.east,
            Lane::South => self.south,
            Lane::West => self.west,
        }
    }

    pub fn set(&mut self, lane: Lane, state: LightState) {
        match lane {
            Lane::North => self.north = state,
            Lane::East => self.east = state,
            Lane::South => self.south = state,
            Lane::West => self.west = state,
        }
    }

    /// `(lane, state)` pairs in round-robin order.
    pub fn iter(&self) -> impl Iterator<Item = (Lane, LightState)> + '_ {
        Lane::ALL.into_iter().map(move |lane| (lane, self.get(lane)))
    }

    /// Lanes not showing RED.
    pub fn non_red(&self) -> impl Iterator<Item = (Lane, LightState)> + '_ {
        self.iter().filter(|(_, state)| *state != LightState::Red)
    }

    /// The single lane holding right-of-way (GREEN or YELLOW), if any.
    pub fn active(&self) -> Option<(Lane, LightState)> {
        self.non_red().next()
    }

    /// At most one lane is GREEN or YELLOW.
    pub fn is_exclusive(&self) -> bool {
        self.non_red().count() <= 1
    }
}
