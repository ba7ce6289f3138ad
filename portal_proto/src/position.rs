use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Compass slot a resonator occupies on a portal.
///
/// Variant order is the canonical slot order; maps keyed by `Position`
/// iterate (and therefore render) E, NE, N, NW, W, SW, S, SE.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Position {
    E,
    NE,
    N,
    NW,
    W,
    SW,
    S,
    SE,
}

impl Position {
    pub const ALL: [Position; 8] = [
        Position::E,
        Position::NE,
        Position::N,
        Position::NW,
        Position::W,
        Position::SW,
        Position::S,
        Position::SE,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Position::E => "E",
            Position::NE => "NE",
            Position::N => "N",
            Position::NW => "NW",
            Position::W => "W",
            Position::SW => "SW",
            Position::S => "S",
            Position::SE => "SE",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown resonator position '{0}'")]
pub struct UnknownPosition(pub String);

impl FromStr for Position {
    type Err = UnknownPosition;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        Position::ALL
            .into_iter()
            .find(|position| position.as_str() == label)
            .ok_or_else(|| UnknownPosition(label.to_string()))
    }
}
