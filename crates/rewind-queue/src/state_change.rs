//! Captured before/after state of one applied activity

use rewind_core::{BlockState, EntitySnapshot, ItemStack, Location, Owner, WorldAccess, WorldResult};

/// Exactly what one activity changed, or would have changed in a preview
///
/// Only planned results keep their state change; it is what lets a preview
/// be taken back without touching live state.
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    /// A block went from `old` to `new`
    Block {
        location: Location,
        old: BlockState,
        new: BlockState,
    },
    /// An entity was spawned (`present`) or removed
    Entity {
        location: Location,
        entity: EntitySnapshot,
        present: bool,
    },
    /// Items were dropped/added to a container (`present`) or taken away
    Item {
        location: Location,
        item: ItemStack,
        container: bool,
        present: bool,
    },
}

impl StateChange {
    pub fn location(&self) -> &Location {
        match self {
            StateChange::Block { location, .. }
            | StateChange::Entity { location, .. }
            | StateChange::Item { location, .. } => location,
        }
    }

    /// Show `viewer` the state from before this change again
    ///
    /// Previews only ever send fake blocks, so entity and item changes have
    /// nothing to take back. Returns whether anything was re-sent.
    pub fn revert_preview<W: WorldAccess + ?Sized>(
        &self,
        viewer: &Owner,
        world: &mut W,
    ) -> WorldResult<bool> {
        match self {
            StateChange::Block { location, old, .. } => {
                world.send_block_change(viewer, location, old)?;
                Ok(true)
            }
            StateChange::Entity { .. } | StateChange::Item { .. } => Ok(false),
        }
    }
}
