//! Block coordinates within a named world

use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer block position in a named world
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub world: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Location {
    /// Create a new location
    pub fn new(world: impl Into<String>, x: i32, y: i32, z: i32) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }

    /// The location offset by the given deltas, in the same world
    ///
    /// Coordinates saturate at the edges of the `i32` range.
    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            world: self.world.clone(),
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            z: self.z.saturating_add(dz),
        }
    }

    /// The block directly above
    pub fn above(&self) -> Self {
        self.offset(0, 1, 0)
    }

    /// Squared euclidean distance, or `None` across worlds
    pub fn distance_squared(&self, other: &Location) -> Option<i64> {
        if self.world != other.world {
            return None;
        }
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        let dz = i64::from(self.z) - i64::from(other.z);
        Some(
            dx.saturating_mul(dx)
                .saturating_add(dy.saturating_mul(dy))
                .saturating_add(dz.saturating_mul(dz)),
        )
    }

    /// Check if `other` lies within `radius` blocks of this location
    pub fn is_within(&self, other: &Location, radius: u32) -> bool {
        let radius = i64::from(radius);
        self.distance_squared(other)
            .is_some_and(|d| d <= radius.saturating_mul(radius))
    }

    /// Every location in the cube of the given radius centered here
    pub fn cube(&self, radius: u32) -> impl Iterator<Item = Location> + '_ {
        let r = i32::try_from(radius).unwrap_or(i32::MAX);
        (-r..=r).flat_map(move |dx| {
            (-r..=r).flat_map(move |dy| (-r..=r).map(move |dz| self.offset(dx, dy, dz)))
        })
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@({}, {}, {})", self.world, self.x, self.y, self.z)
    }
}
