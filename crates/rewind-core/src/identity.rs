//! Identity types for players, entities and queue owners

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

impl PlayerId {
    /// Create a new player ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player:{}", self.0)
    }
}

/// Runtime identifier for an entity living in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Create a new entity ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity:{}", self.0)
    }
}

/// Whoever requested a modification
///
/// Owners are only ever compared for equality: they key the result cache and
/// decide who may cancel or confirm a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Owner {
    /// The server console
    Console,
    /// An online player
    Player(PlayerId),
}

impl Owner {
    /// Owner for a player
    pub fn player(id: u64) -> Self {
        Owner::Player(PlayerId::new(id))
    }

    /// The player behind this owner, if any
    pub fn player_id(&self) -> Option<PlayerId> {
        match self {
            Owner::Player(id) => Some(*id),
            Owner::Console => None,
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Console => write!(f, "console"),
            Owner::Player(id) => write!(f, "{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id() {
        let id = EntityId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(format!("{}", id), "entity:42");
    }

    #[test]
    fn test_owner_display_and_equality() {
        assert_eq!(format!("{}", Owner::Console), "console");
        assert_eq!(format!("{}", Owner::player(7)), "player:7");
        assert_eq!(Owner::player(7), Owner::Player(PlayerId(7)));
        assert_ne!(Owner::player(7), Owner::Console);
        assert_eq!(Owner::Console.player_id(), None);
    }
}
