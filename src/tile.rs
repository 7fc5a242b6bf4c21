use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::Serialize;

use crate::{InspectError, InspectResult};

/// A tile coordinate in `zoom/x/y` form.
///
/// Only the syntax is checked; whether `x` and `y` fit into the grid at `z`
/// is left to the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TileCoord {
    z: u8,
    x: u32,
    y: u32,
}

impl TileCoord {
    /// Creates a coordinate from its components.
    #[must_use]
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Zoom level
    #[must_use]
    pub fn z(&self) -> u8 {
        self.z
    }

    /// Tile column
    #[must_use]
    pub fn x(&self) -> u32 {
        self.x
    }

    /// Tile row
    #[must_use]
    pub fn y(&self) -> u32 {
        self.y
    }
}

fn parse_part<T: FromStr>(part: &str, input: &str) -> InspectResult<T> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(InspectError::InvalidCoordinate(input.to_string()));
    }
    part.parse()
        .map_err(|_| InspectError::InvalidCoordinate(input.to_string()))
}

impl FromStr for TileCoord {
    type Err = InspectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        let (Some(z), Some(x), Some(y), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(InspectError::InvalidCoordinate(s.to_string()));
        };

        Ok(Self {
            z: parse_part(z, s)?,
            x: parse_part(x, s)?,
            y: parse_part(y, s)?,
        })
    }
}

impl Display for TileCoord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}
