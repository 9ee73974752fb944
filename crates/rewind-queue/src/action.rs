//! Turning one activity into one world change
//!
//! Each activity is first resolved into a [`Transform`], a pure description
//! of the write that would rollback or restore it. Applying the transform is
//! a separate phase that reads live state, decides whether the write is
//! still valid and then either previews it to the owner or commits it.

use crate::queue::Mode;
use crate::result::{SideEffects, SkipReason};
use crate::ruleset::{spawns_subject, ModificationRuleset};
use crate::state_change::StateChange;
use rewind_core::{
    ActionData, Activity, BlockState, EntityId, EntitySnapshot, EntityType, ItemStack, Location,
    Material, Owner, WorldAccess, WorldResult,
};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use tracing::warn;

/// Which way an activity is replayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Undo the activity (rollback)
    Reverse,
    /// Re-apply the activity (restore)
    Forward,
}

/// A single pending world write derived from an activity
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    /// Replace `expected` with `target`
    SetBlock {
        expected: BlockState,
        target: BlockState,
    },
    SpawnEntity(EntitySnapshot),
    /// Remove a matching entity standing at the location
    RemoveEntity(EntitySnapshot),
    DropItem(ItemStack),
    /// Remove a matching dropped stack at the location
    RemoveDrop(ItemStack),
    ContainerAdd(ItemStack),
    ContainerRemove(ItemStack),
    /// Nothing in the world corresponds to this activity
    None,
}

impl Transform {
    /// The write that re-applies `activity`
    pub fn forward(activity: &Activity) -> Self {
        Self::for_direction(activity, Direction::Forward)
    }

    /// The write that undoes `activity`
    pub fn reverse(activity: &Activity) -> Self {
        Self::for_direction(activity, Direction::Reverse)
    }

    pub fn for_direction(activity: &Activity, direction: Direction) -> Self {
        let action_type = activity.action_type();
        match activity.data() {
            ActionData::Block { prior, new } => match direction {
                Direction::Reverse => Transform::SetBlock {
                    expected: new.clone(),
                    target: prior.clone(),
                },
                Direction::Forward => Transform::SetBlock {
                    expected: prior.clone(),
                    target: new.clone(),
                },
            },
            ActionData::Entity { entity } => {
                if spawns_subject(action_type, direction) {
                    Transform::SpawnEntity(entity.clone())
                } else {
                    Transform::RemoveEntity(entity.clone())
                }
            }
            ActionData::Item { item } => {
                let present = spawns_subject(action_type, direction);
                match (action_type.targets_container(), present) {
                    (true, true) => Transform::ContainerAdd(item.clone()),
                    (true, false) => Transform::ContainerRemove(item.clone()),
                    (false, true) => Transform::DropItem(item.clone()),
                    (false, false) => Transform::RemoveDrop(item.clone()),
                }
            }
            ActionData::Generic => Transform::None,
        }
    }

    /// Validate the transform against live state and carry it out
    ///
    /// World errors are returned as-is; the queue records them against the
    /// activity and moves on.
    pub fn apply<W: WorldAccess + ?Sized>(
        &self,
        location: &Location,
        ctx: &mut ApplyContext<'_, W>,
    ) -> WorldResult<ActionOutcome> {
        match self {
            Transform::SetBlock { expected, target } => {
                apply_block(ctx, location, expected, target)
            }
            Transform::SpawnEntity(entity) => {
                match ctx.mode {
                    Mode::Planning => ctx.preview.spawn(location, &entity.kind),
                    Mode::Completing => {
                        ctx.world.spawn_entity(location, entity)?;
                    }
                }
                Ok(entity_change(location, entity, true))
            }
            Transform::RemoveEntity(entity) => {
                let found = ctx
                    .world
                    .find_entities(location, &entity.kind)
                    .into_iter()
                    .find(|id| !ctx.preview.removed_entities.contains(id));
                match (ctx.mode, found) {
                    (Mode::Planning, found) => {
                        if !ctx.preview.take_spawned(location, &entity.kind) {
                            let Some(id) = found else {
                                return Ok(ActionOutcome::Skipped(SkipReason::StateConflict));
                            };
                            ctx.preview.removed_entities.insert(id);
                        }
                    }
                    (Mode::Completing, Some(id)) => {
                        ctx.world.remove_entity(id)?;
                    }
                    (Mode::Completing, None) => {
                        return Ok(ActionOutcome::Skipped(SkipReason::StateConflict));
                    }
                }
                Ok(entity_change(location, entity, false))
            }
            Transform::DropItem(item) => {
                match ctx.mode {
                    Mode::Planning => ctx.preview.drop_item(location, item),
                    Mode::Completing => {
                        ctx.world.drop_item(location, item)?;
                    }
                }
                Ok(item_change(location, item, false, true))
            }
            Transform::RemoveDrop(item) => {
                let found = ctx
                    .world
                    .find_drops(location, item)
                    .into_iter()
                    .find(|id| !ctx.preview.removed_drops.contains(id));
                match (ctx.mode, found) {
                    (Mode::Planning, found) => {
                        if !ctx.preview.take_dropped(location, item) {
                            let Some(id) = found else {
                                return Ok(ActionOutcome::Skipped(SkipReason::StateConflict));
                            };
                            ctx.preview.removed_drops.insert(id);
                        }
                    }
                    (Mode::Completing, Some(id)) => {
                        ctx.world.remove_drop(id)?;
                    }
                    (Mode::Completing, None) => {
                        return Ok(ActionOutcome::Skipped(SkipReason::StateConflict));
                    }
                }
                Ok(item_change(location, item, false, false))
            }
            Transform::ContainerAdd(item) => {
                if ctx.container_count(location, &item.material).is_none() {
                    return Ok(ActionOutcome::Skipped(SkipReason::StateConflict));
                }
                match ctx.mode {
                    Mode::Planning => ctx.preview.adjust_container(location, item, true),
                    Mode::Completing => ctx.world.container_add(location, item)?,
                }
                Ok(item_change(location, item, true, true))
            }
            Transform::ContainerRemove(item) => {
                match ctx.container_count(location, &item.material) {
                    Some(count) if count >= item.quantity => {}
                    _ => return Ok(ActionOutcome::Skipped(SkipReason::StateConflict)),
                }
                match ctx.mode {
                    Mode::Planning => ctx.preview.adjust_container(location, item, false),
                    Mode::Completing => ctx.world.container_remove(location, item)?,
                }
                Ok(item_change(location, item, true, false))
            }
            Transform::None => Ok(ActionOutcome::Skipped(SkipReason::NotApplicable)),
        }
    }
}

/// World state a planning run has already claimed
///
/// Nothing is written to the world while planning, so later activities in
/// the same run read live state through this overlay.
#[derive(Debug, Default)]
struct Preview {
    blocks: HashMap<Location, BlockState>,
    removed_entities: HashSet<EntityId>,
    removed_drops: HashSet<EntityId>,
    spawned: HashMap<(Location, EntityType), u32>,
    dropped: HashMap<(Location, ItemStack), u32>,
    containers: HashMap<(Location, Material), i64>,
}

impl Preview {
    fn spawn(&mut self, location: &Location, kind: &EntityType) {
        *self.spawned.entry((location.clone(), kind.clone())).or_default() += 1;
    }

    fn take_spawned(&mut self, location: &Location, kind: &EntityType) -> bool {
        take_one(&mut self.spawned, &(location.clone(), kind.clone()))
    }

    fn drop_item(&mut self, location: &Location, item: &ItemStack) {
        *self.dropped.entry((location.clone(), item.clone())).or_default() += 1;
    }

    fn take_dropped(&mut self, location: &Location, item: &ItemStack) -> bool {
        take_one(&mut self.dropped, &(location.clone(), item.clone()))
    }

    fn adjust_container(&mut self, location: &Location, item: &ItemStack, add: bool) {
        let delta = i64::from(item.quantity);
        let entry = self
            .containers
            .entry((location.clone(), item.material.clone()))
            .or_default();
        *entry += if add { delta } else { -delta };
    }
}

fn take_one<K: Hash + Eq>(counts: &mut HashMap<K, u32>, key: &K) -> bool {
    match counts.get_mut(key) {
        Some(count) if *count > 0 => {
            *count -= 1;
            true
        }
        _ => false,
    }
}

/// Everything a transform needs while being applied
///
/// One context lives for a whole queue run. In planning mode it remembers
/// what was already shown or claimed for the owner, so later activities are
/// checked against the previewed state rather than live state.
pub struct ApplyContext<'a, W: WorldAccess + ?Sized> {
    world: &'a mut W,
    /// Receives preview block changes
    owner: Owner,
    ruleset: &'a ModificationRuleset,
    mode: Mode,
    effects: SideEffects,
    preview: Preview,
}

impl<'a, W: WorldAccess + ?Sized> ApplyContext<'a, W> {
    pub fn new(
        world: &'a mut W,
        owner: Owner,
        ruleset: &'a ModificationRuleset,
        mode: Mode,
    ) -> Self {
        Self {
            world,
            owner,
            ruleset,
            mode,
            effects: SideEffects::default(),
            preview: Preview::default(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn ruleset(&self) -> &ModificationRuleset {
        self.ruleset
    }

    /// Rule side effects accumulated so far
    pub fn effects(&self) -> SideEffects {
        self.effects
    }

    /// The block as the owner currently sees it
    fn block_at(&self, location: &Location) -> BlockState {
        self.preview
            .blocks
            .get(location)
            .cloned()
            .unwrap_or_else(|| self.world.block_at(location))
    }

    fn container_count(&self, location: &Location, material: &Material) -> Option<u32> {
        let count = self.world.container_count(location, material)?;
        let delta = self
            .preview
            .containers
            .get(&(location.clone(), material.clone()))
            .copied()
            .unwrap_or(0);
        let adjusted = (i64::from(count) + delta).clamp(0, i64::from(u32::MAX));
        Some(u32::try_from(adjusted).unwrap_or(u32::MAX))
    }

    /// Where each entity in `location` would go to get out of a solid block
    ///
    /// Returns `None` if they have no free block within the ruleset's
    /// maximum move distance.
    fn plan_entity_moves(&self, location: &Location) -> Option<Vec<(EntityId, Location)>> {
        let entities: Vec<EntityId> = self
            .world
            .entities_in(location)
            .into_iter()
            .filter(|id| !self.preview.removed_entities.contains(id))
            .collect();
        if entities.is_empty() {
            return Some(Vec::new());
        }

        let max_distance = i32::try_from(self.ruleset.max_move_distance()).unwrap_or(i32::MAX);
        let free = (1..=max_distance)
            .map(|dy| location.offset(0, dy, 0))
            .take_while(|candidate| candidate != location)
            .find(|candidate| self.block_at(candidate).material.is_passable())?;

        Some(entities.into_iter().map(|id| (id, free.clone())).collect())
    }
}

/// Result of applying one transform
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Skipped(SkipReason),
    Changed(StateChange),
}

fn entity_change(location: &Location, entity: &EntitySnapshot, present: bool) -> ActionOutcome {
    ActionOutcome::Changed(StateChange::Entity {
        location: location.clone(),
        entity: entity.clone(),
        present,
    })
}

fn item_change(
    location: &Location,
    item: &ItemStack,
    container: bool,
    present: bool,
) -> ActionOutcome {
    ActionOutcome::Changed(StateChange::Item {
        location: location.clone(),
        item: item.clone(),
        container,
        present,
    })
}

fn apply_block<W: WorldAccess + ?Sized>(
    ctx: &mut ApplyContext<'_, W>,
    location: &Location,
    expected: &BlockState,
    target: &BlockState,
) -> WorldResult<ActionOutcome> {
    let live = ctx.block_at(location);
    if live == *target {
        return Ok(ActionOutcome::Skipped(SkipReason::AlreadyAtTarget));
    }
    if live != *expected && !ctx.ruleset.overwrite() {
        return Ok(ActionOutcome::Skipped(SkipReason::StateConflict));
    }

    let moves = if ctx.ruleset.move_entities() && !target.material.is_passable() {
        match ctx.plan_entity_moves(location) {
            Some(moves) => moves,
            None => return Ok(ActionOutcome::Skipped(SkipReason::BlockedByEntity)),
        }
    } else {
        Vec::new()
    };

    match ctx.mode {
        Mode::Planning => {
            ctx.world.send_block_change(&ctx.owner, location, target)?;
            ctx.preview.blocks.insert(location.clone(), target.clone());
        }
        Mode::Completing => {
            ctx.world.set_block(location, target)?;

            // The block is committed from here on, so rule side effects
            // that fail are logged rather than failing the activity.
            ctx.effects.moved_entities += move_entities(&mut *ctx.world, &moves);
            if !live.is_air() && target.is_air() {
                ctx.effects.removed_blocks += 1;
            }
            if let Some(radius) = ctx.ruleset.remove_drops() {
                ctx.effects.removed_drops += remove_drops_near(&mut *ctx.world, location, radius);
            }
            if let Some(radius) = ctx.ruleset.drain_lava() {
                ctx.effects.drained_lava += drain_lava_near(&mut *ctx.world, location, radius);
            }
        }
    }

    Ok(ActionOutcome::Changed(StateChange::Block {
        location: location.clone(),
        old: live,
        new: target.clone(),
    }))
}

fn move_entities<W: WorldAccess + ?Sized>(
    world: &mut W,
    moves: &[(EntityId, Location)],
) -> usize {
    let mut moved = 0;
    for (id, to) in moves {
        match world.move_entity(*id, to) {
            Ok(()) => moved += 1,
            Err(e) => warn!(entity = %id, to = %to, error = %e, "failed to move entity"),
        }
    }
    moved
}

fn remove_drops_near<W: WorldAccess + ?Sized>(
    world: &mut W,
    location: &Location,
    radius: u32,
) -> usize {
    let mut removed = 0;
    for id in world.drops_near(location, radius) {
        match world.remove_drop(id) {
            Ok(_) => removed += 1,
            Err(e) => warn!(drop = %id, error = %e, "failed to remove drop"),
        }
    }
    removed
}

fn drain_lava_near<W: WorldAccess + ?Sized>(
    world: &mut W,
    location: &Location,
    radius: u32,
) -> usize {
    let lava: Vec<Location> = location
        .cube(radius)
        .filter(|near| near != location && world.block_at(near).material.is_lava())
        .collect();
    let mut drained = 0;
    for near in &lava {
        match world.set_block(near, &BlockState::air()) {
            Ok(()) => drained += 1,
            Err(e) => warn!(location = %near, error = %e, "failed to drain lava"),
        }
    }
    drained
}
