//! In-memory world used by tests, demos and offline tooling

use crate::error::WorldError;
use crate::world::{WorldAccess, WorldResult};
use crate::{BlockState, EntityId, EntitySnapshot, EntityType, ItemStack, Location, Material, Owner};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

/// A world kept entirely in memory
///
/// Unset blocks read as air. Fake blocks sent to a viewer are tracked
/// separately from live state and are cleared when the live block changes.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorld {
    /// Live blocks; air is never stored
    blocks: HashMap<Location, BlockState>,
    /// Per-viewer fake blocks
    views: HashMap<Owner, HashMap<Location, BlockState>>,
    /// Living entities by ID
    entities: IndexMap<EntityId, (Location, EntitySnapshot)>,
    /// Dropped item stacks by ID
    drops: IndexMap<EntityId, (Location, ItemStack)>,
    /// Container contents by location
    containers: HashMap<Location, IndexMap<Material, u32>>,
    /// When set, blocks of other materials are rejected
    known_materials: Option<HashSet<Material>>,
    /// Next entity ID to assign
    next_id: u64,
}

impl InMemoryWorld {
    /// Create an empty world that accepts any material
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept the given materials when setting blocks
    pub fn with_known_materials(mut self, materials: impl IntoIterator<Item = Material>) -> Self {
        let mut known: HashSet<Material> = materials.into_iter().collect();
        known.insert(Material::air());
        self.known_materials = Some(known);
        self
    }

    /// Place a block directly, bypassing material checks
    pub fn put_block(&mut self, location: Location, state: BlockState) {
        if state.is_air() {
            self.blocks.remove(&location);
        } else {
            self.blocks.insert(location, state);
        }
    }

    /// Place an empty container
    pub fn put_container(&mut self, location: Location) {
        self.containers.entry(location).or_default();
    }

    /// The block a viewer currently sees
    pub fn block_seen_by(&self, viewer: &Owner, location: &Location) -> BlockState {
        self.views
            .get(viewer)
            .and_then(|view| view.get(location))
            .cloned()
            .unwrap_or_else(|| self.block_at(location))
    }

    /// Number of fake blocks a viewer currently sees
    pub fn fake_block_count(&self, viewer: &Owner) -> usize {
        self.views.get(viewer).map_or(0, HashMap::len)
    }

    /// Number of non-air blocks
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn entity(&self, id: EntityId) -> Option<(&Location, &EntitySnapshot)> {
        self.entities.get(&id).map(|(l, e)| (l, e))
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn drop_count(&self) -> usize {
        self.drops.len()
    }

    fn next_entity_id(&mut self) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn check_material(&self, material: &Material) -> WorldResult<()> {
        match &self.known_materials {
            Some(known) if !known.contains(material) => {
                Err(WorldError::UnknownMaterial(material.clone()))
            }
            _ => Ok(()),
        }
    }
}

impl WorldAccess for InMemoryWorld {
    fn block_at(&self, location: &Location) -> BlockState {
        self.blocks.get(location).cloned().unwrap_or_default()
    }

    fn set_block(&mut self, location: &Location, state: &BlockState) -> WorldResult<()> {
        self.check_material(&state.material)?;
        self.put_block(location.clone(), state.clone());
        for view in self.views.values_mut() {
            view.remove(location);
        }
        Ok(())
    }

    fn send_block_change(
        &mut self,
        viewer: &Owner,
        location: &Location,
        state: &BlockState,
    ) -> WorldResult<()> {
        self.check_material(&state.material)?;
        if *state == self.block_at(location) {
            if let Some(view) = self.views.get_mut(viewer) {
                view.remove(location);
                if view.is_empty() {
                    self.views.remove(viewer);
                }
            }
        } else {
            self.views
                .entry(*viewer)
                .or_default()
                .insert(location.clone(), state.clone());
        }
        Ok(())
    }

    fn spawn_entity(
        &mut self,
        location: &Location,
        entity: &EntitySnapshot,
    ) -> WorldResult<EntityId> {
        let id = self.next_entity_id();
        self.entities
            .insert(id, (location.clone(), entity.clone()));
        Ok(id)
    }

    fn find_entities(&self, location: &Location, kind: &EntityType) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|(_, (l, e))| l == location && &e.kind == kind)
            .map(|(id, _)| *id)
            .collect()
    }

    fn remove_entity(&mut self, id: EntityId) -> WorldResult<EntitySnapshot> {
        self.entities
            .shift_remove(&id)
            .map(|(_, entity)| entity)
            .ok_or(WorldError::EntityNotFound(id))
    }

    fn entities_in(&self, location: &Location) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|(_, (l, _))| l == location)
            .map(|(id, _)| *id)
            .collect()
    }

    fn move_entity(&mut self, id: EntityId, to: &Location) -> WorldResult<()> {
        let (location, _) = self
            .entities
            .get_mut(&id)
            .ok_or(WorldError::EntityNotFound(id))?;
        *location = to.clone();
        Ok(())
    }

    fn drop_item(&mut self, location: &Location, item: &ItemStack) -> WorldResult<EntityId> {
        let id = self.next_entity_id();
        self.drops.insert(id, (location.clone(), item.clone()));
        Ok(id)
    }

    fn find_drops(&self, location: &Location, item: &ItemStack) -> Vec<EntityId> {
        self.drops
            .iter()
            .filter(|(_, (l, i))| l == location && i == item)
            .map(|(id, _)| *id)
            .collect()
    }

    fn drops_near(&self, location: &Location, radius: u32) -> Vec<EntityId> {
        self.drops
            .iter()
            .filter(|(_, (l, _))| location.is_within(l, radius))
            .map(|(id, _)| *id)
            .collect()
    }

    fn remove_drop(&mut self, id: EntityId) -> WorldResult<ItemStack> {
        self.drops
            .shift_remove(&id)
            .map(|(_, item)| item)
            .ok_or(WorldError::EntityNotFound(id))
    }

    fn container_count(&self, location: &Location, material: &Material) -> Option<u32> {
        self.containers
            .get(location)
            .map(|contents| contents.get(material).copied().unwrap_or(0))
    }

    fn container_add(&mut self, location: &Location, item: &ItemStack) -> WorldResult<()> {
        let contents = self
            .containers
            .get_mut(location)
            .ok_or_else(|| WorldError::NoContainer(location.clone()))?;
        *contents.entry(item.material.clone()).or_insert(0) += item.quantity;
        Ok(())
    }

    fn container_remove(&mut self, location: &Location, item: &ItemStack) -> WorldResult<()> {
        let contents = self
            .containers
            .get_mut(location)
            .ok_or_else(|| WorldError::NoContainer(location.clone()))?;
        if let Some(count) = contents.get_mut(&item.material) {
            *count = count.saturating_sub(item.quantity);
            if *count == 0 {
                contents.shift_remove(&item.material);
            }
        }
        Ok(())
    }
}
