//! Per-invocation modification rules
//!
//! A [`ModificationRuleset`] is built once per queue from configuration and
//! optional per-command overrides, then frozen inside the queue. It is
//! consulted for every activity before any transform runs.

use crate::action::Direction;
use crate::config::EngineConfig;
use crate::result::SkipReason;
use rewind_core::{ActionData, ActionType, Activity, EntityType, Location, Material};
use serde::{Deserialize, Serialize};

/// Options controlling how activities are turned into world changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModificationRuleset {
    /// Apply even when the live block no longer matches the recorded one
    overwrite: bool,
    /// Lift entities out of blocks that become solid
    move_entities: bool,
    /// How far up an entity may be lifted
    max_move_distance: u32,
    /// Remove dropped items around changed blocks
    remove_drops: bool,
    remove_drops_radius: u32,
    /// Replace lava around changed blocks with air
    drain_lava: bool,
    drain_lava_radius: u32,
    /// Materials the engine never places
    block_blacklist: Vec<Material>,
    /// Entity types the engine never spawns
    entity_blacklist: Vec<EntityType>,
    /// Activities farther than this from the query reference are skipped
    max_radius: Option<u32>,
}

impl ModificationRuleset {
    /// Start from the configured defaults
    pub fn from_config(config: &EngineConfig) -> Self {
        config.ruleset.clone()
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_move_entities(mut self, enabled: bool, max_distance: u32) -> Self {
        self.move_entities = enabled;
        self.max_move_distance = max_distance;
        self
    }

    pub fn with_remove_drops(mut self, enabled: bool, radius: u32) -> Self {
        self.remove_drops = enabled;
        self.remove_drops_radius = radius;
        self
    }

    pub fn with_drain_lava(mut self, enabled: bool, radius: u32) -> Self {
        self.drain_lava = enabled;
        self.drain_lava_radius = radius;
        self
    }

    pub fn with_block_blacklist(mut self, materials: impl IntoIterator<Item = Material>) -> Self {
        self.block_blacklist = materials.into_iter().collect();
        self
    }

    pub fn with_entity_blacklist(mut self, kinds: impl IntoIterator<Item = EntityType>) -> Self {
        self.entity_blacklist = kinds.into_iter().collect();
        self
    }

    pub fn with_max_radius(mut self, radius: Option<u32>) -> Self {
        self.max_radius = radius;
        self
    }

    pub fn overwrite(&self) -> bool {
        self.overwrite
    }

    pub fn move_entities(&self) -> bool {
        self.move_entities
    }

    pub fn max_move_distance(&self) -> u32 {
        self.max_move_distance
    }

    /// Drop removal radius, if enabled
    pub fn remove_drops(&self) -> Option<u32> {
        self.remove_drops.then_some(self.remove_drops_radius)
    }

    /// Lava drain radius, if enabled
    pub fn drain_lava(&self) -> Option<u32> {
        self.drain_lava.then_some(self.drain_lava_radius)
    }

    pub fn block_blacklist(&self) -> &[Material] {
        &self.block_blacklist
    }

    pub fn entity_blacklist(&self) -> &[EntityType] {
        &self.entity_blacklist
    }

    pub fn max_radius(&self) -> Option<u32> {
        self.max_radius
    }

    /// Decide whether an activity is excluded before it is transformed
    ///
    /// `reference` is the center of the query that produced the activity.
    pub fn exclusion(
        &self,
        activity: &Activity,
        reference: Option<&Location>,
        direction: Direction,
    ) -> Option<SkipReason> {
        if let (Some(radius), Some(reference)) = (self.max_radius, reference) {
            if !reference.is_within(activity.location(), radius) {
                return Some(SkipReason::OutOfRange);
            }
        }

        match activity.data() {
            ActionData::Block { prior, new } => {
                let target = match direction {
                    Direction::Reverse => prior,
                    Direction::Forward => new,
                };
                if !target.is_air() && self.block_blacklist.contains(&target.material) {
                    return Some(SkipReason::ExcludedMaterial);
                }
            }
            ActionData::Entity { entity } => {
                if spawns_subject(activity.action_type(), direction)
                    && self.entity_blacklist.contains(&entity.kind)
                {
                    return Some(SkipReason::ExcludedEntity);
                }
            }
            ActionData::Item { .. } | ActionData::Generic => {}
        }

        None
    }
}

/// Whether the subject of an entity or item activity exists after the transform
pub(crate) fn spawns_subject(action_type: ActionType, direction: Direction) -> bool {
    match direction {
        Direction::Reverse => action_type.removes_subject(),
        Direction::Forward => !action_type.removes_subject(),
    }
}

impl Default for ModificationRuleset {
    fn default() -> Self {
        Self {
            overwrite: false,
            move_entities: true,
            max_move_distance: 3,
            remove_drops: false,
            remove_drops_radius: 5,
            drain_lava: false,
            drain_lava_radius: 5,
            block_blacklist: vec![Material::new("fire"), Material::new("tnt")],
            entity_blacklist: Vec::new(),
            max_radius: None,
        }
    }
}
