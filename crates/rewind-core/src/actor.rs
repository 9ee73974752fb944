//! Actors: whoever or whatever caused a recorded change
//!
//! Activities are caused either by a player or by a named non-player cause
//! such as `creeper`, `lava` or `fire`.

use crate::PlayerId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The cause of a recorded activity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Actor {
    /// A player, with the name they had when the activity was recorded
    Player { id: PlayerId, name: String },
    /// A named non-player cause
    Cause(String),
}

impl Actor {
    /// Create a player actor
    pub fn player(id: u64, name: impl Into<String>) -> Self {
        Actor::Player {
            id: PlayerId::new(id),
            name: name.into(),
        }
    }

    /// Create a non-player actor
    pub fn cause(name: impl Into<String>) -> Self {
        Actor::Cause(name.into())
    }

    /// The name used when filtering and reporting
    pub fn name(&self) -> &str {
        match self {
            Actor::Player { name, .. } => name,
            Actor::Cause(name) => name,
        }
    }

    /// Check if this actor is a player
    pub fn is_player(&self) -> bool {
        matches!(self, Actor::Player { .. })
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Player { name, .. } => write!(f, "{}", name),
            Actor::Cause(name) => write!(f, "#{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor() {
        let player = Actor::player(1, "alex");
        assert!(player.is_player());
        assert_eq!(player.name(), "alex");
        assert_eq!(format!("{}", player), "alex");

        let creeper = Actor::cause("creeper");
        assert!(!creeper.is_player());
        assert_eq!(format!("{}", creeper), "#creeper");
    }
}
