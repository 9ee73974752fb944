//! Rewind Core - Recorded world changes and the live world they apply to
//!
//! This crate provides the data leaves of the rewind engine:
//! - Identities (`PlayerId`, `EntityId`, `Owner`) and actors
//! - Locations and block/entity/item state
//! - `Activity`: one immutable recorded change, tagged with an `ActionType`
//! - `ActivityQuery` and the `ActivitySource` interface used to look them up
//! - `WorldAccess`: the live world surface mutations are applied to
//!
//! Storage, capture and rendering live elsewhere; `MemoryActivitySource` and
//! `InMemoryWorld` exist so the engine can run without them.

mod activity;
mod actor;
mod error;
mod identity;
mod location;
mod memory_world;
mod query;
mod state;
pub mod world;

pub use activity::{ActionCategory, ActionData, ActionType, Activity};
pub use actor::Actor;
pub use error::{Error, Result, WorldError};
pub use identity::{EntityId, Owner, PlayerId};
pub use location::Location;
pub use memory_world::InMemoryWorld;
pub use query::{ActivityQuery, ActivitySource, MemoryActivitySource};
pub use state::{BlockState, EntitySnapshot, EntityType, ItemStack, Material};
pub use world::{WorldAccess, WorldResult};
