//! Error types for rewind-core

use crate::activity::ActionCategory;
use crate::{EntityId, Location, Material};
use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown action type: {0}")]
    UnknownActionType(String),

    #[error("Payload mismatch: {action} expects a {expected:?} payload, got {got:?}")]
    PayloadMismatch {
        action: String,
        expected: ActionCategory,
        got: ActionCategory,
    },

    #[error("Activity source error: {0}")]
    Source(String),

    #[error(transparent)]
    World(#[from] WorldError),
}

/// Failures raised by the live world while a mutation is attempted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorldError {
    #[error("unknown material '{0}'")]
    UnknownMaterial(Material),

    #[error("{0} not found")]
    EntityNotFound(EntityId),

    #[error("no container at {0}")]
    NoContainer(Location),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
