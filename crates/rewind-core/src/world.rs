//! The live world as seen by the modification engine
//!
//! Everything the engine mutates goes through [`WorldAccess`]. Calls are made
//! from the single mutation context only, so implementations need no
//! internal locking.

use crate::error::WorldError;
use crate::{BlockState, EntityId, EntitySnapshot, EntityType, ItemStack, Location, Material, Owner};

/// Result type for world mutations
pub type WorldResult<T> = std::result::Result<T, WorldError>;

/// Read and write access to live world state
pub trait WorldAccess {
    /// The live block at a location
    fn block_at(&self, location: &Location) -> BlockState;

    /// Change a block for every observer
    fn set_block(&mut self, location: &Location, state: &BlockState) -> WorldResult<()>;

    /// Show a block to one viewer without changing the world
    ///
    /// Sending the live state back clears the fake representation.
    fn send_block_change(
        &mut self,
        viewer: &Owner,
        location: &Location,
        state: &BlockState,
    ) -> WorldResult<()>;

    fn spawn_entity(&mut self, location: &Location, entity: &EntitySnapshot)
        -> WorldResult<EntityId>;

    /// Entities of the given type standing in the block at `location`
    fn find_entities(&self, location: &Location, kind: &EntityType) -> Vec<EntityId>;

    fn remove_entity(&mut self, id: EntityId) -> WorldResult<EntitySnapshot>;

    /// Entities standing in the block at `location`
    fn entities_in(&self, location: &Location) -> Vec<EntityId>;

    fn move_entity(&mut self, id: EntityId, to: &Location) -> WorldResult<()>;

    /// Drop an item stack on the ground
    fn drop_item(&mut self, location: &Location, item: &ItemStack) -> WorldResult<EntityId>;

    /// Dropped stacks matching `item` in the block at `location`
    fn find_drops(&self, location: &Location, item: &ItemStack) -> Vec<EntityId>;

    /// Dropped stacks within `radius` blocks of `location`
    fn drops_near(&self, location: &Location, radius: u32) -> Vec<EntityId>;

    fn remove_drop(&mut self, id: EntityId) -> WorldResult<ItemStack>;

    /// How many of `material` the container at `location` holds
    ///
    /// Returns `None` when there is no container there.
    fn container_count(&self, location: &Location, material: &Material) -> Option<u32>;

    fn container_add(&mut self, location: &Location, item: &ItemStack) -> WorldResult<()>;

    fn container_remove(&mut self, location: &Location, item: &ItemStack) -> WorldResult<()>;
}
