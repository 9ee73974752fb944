//! Activities: immutable records of past world changes
//!
//! An [`Activity`] pairs an [`ActionType`] with a payload ([`ActionData`])
//! whose shape is fixed by the action type's [`ActionCategory`]. Activities
//! are produced by the capture layer and only ever read by the engine.

use crate::error::{Error, Result};
use crate::{Actor, BlockState, EntitySnapshot, ItemStack, Location};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad family an action type belongs to; selects the transform used for it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionCategory {
    Block,
    Entity,
    ItemStack,
    Generic,
}

/// Every kind of change the capture layer records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    BlockBreak,
    BlockPlace,
    BlockBurn,
    BlockExplode,
    BlockFade,
    EntityKill,
    EntitySpawn,
    ItemDrop,
    ItemPickup,
    ItemInsert,
    ItemRemove,
    PlayerChat,
    PlayerCommand,
    PlayerJoin,
}

impl ActionType {
    /// All action types, in declaration order
    pub const ALL: [ActionType; 14] = [
        ActionType::BlockBreak,
        ActionType::BlockPlace,
        ActionType::BlockBurn,
        ActionType::BlockExplode,
        ActionType::BlockFade,
        ActionType::EntityKill,
        ActionType::EntitySpawn,
        ActionType::ItemDrop,
        ActionType::ItemPickup,
        ActionType::ItemInsert,
        ActionType::ItemRemove,
        ActionType::PlayerChat,
        ActionType::PlayerCommand,
        ActionType::PlayerJoin,
    ];

    /// Stable key used in storage and queries
    pub fn key(&self) -> &'static str {
        match self {
            ActionType::BlockBreak => "block-break",
            ActionType::BlockPlace => "block-place",
            ActionType::BlockBurn => "block-burn",
            ActionType::BlockExplode => "block-explode",
            ActionType::BlockFade => "block-fade",
            ActionType::EntityKill => "entity-kill",
            ActionType::EntitySpawn => "entity-spawn",
            ActionType::ItemDrop => "item-drop",
            ActionType::ItemPickup => "item-pickup",
            ActionType::ItemInsert => "item-insert",
            ActionType::ItemRemove => "item-remove",
            ActionType::PlayerChat => "player-chat",
            ActionType::PlayerCommand => "player-command",
            ActionType::PlayerJoin => "player-join",
        }
    }

    /// Look up an action type by key
    pub fn from_key(key: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.key() == key)
            .ok_or_else(|| Error::UnknownActionType(key.to_string()))
    }

    pub fn category(&self) -> ActionCategory {
        match self {
            ActionType::BlockBreak
            | ActionType::BlockPlace
            | ActionType::BlockBurn
            | ActionType::BlockExplode
            | ActionType::BlockFade => ActionCategory::Block,
            ActionType::EntityKill | ActionType::EntitySpawn => ActionCategory::Entity,
            ActionType::ItemDrop
            | ActionType::ItemPickup
            | ActionType::ItemInsert
            | ActionType::ItemRemove => ActionCategory::ItemStack,
            ActionType::PlayerChat | ActionType::PlayerCommand | ActionType::PlayerJoin => {
                ActionCategory::Generic
            }
        }
    }

    /// Whether the engine can roll this action back or restore it
    pub fn is_reversible(&self) -> bool {
        self.category() != ActionCategory::Generic
    }

    /// Whether the recorded event took its subject out of the world
    ///
    /// Kills, pickups and container removals remove their subject; spawns,
    /// drops and insertions add it. Block actions carry both states in their
    /// payload and always return `false`.
    pub fn removes_subject(&self) -> bool {
        matches!(
            self,
            ActionType::EntityKill | ActionType::ItemPickup | ActionType::ItemRemove
        )
    }

    /// Whether the subject is a container's contents rather than a dropped item
    pub fn targets_container(&self) -> bool {
        matches!(self, ActionType::ItemInsert | ActionType::ItemRemove)
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Type-specific payload of an activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionData {
    /// The block before and after the change
    Block { prior: BlockState, new: BlockState },
    /// The entity that was killed or spawned
    Entity { entity: EntitySnapshot },
    /// The items that moved
    Item { item: ItemStack },
    /// No world payload
    Generic,
}

impl ActionData {
    pub fn category(&self) -> ActionCategory {
        match self {
            ActionData::Block { .. } => ActionCategory::Block,
            ActionData::Entity { .. } => ActionCategory::Entity,
            ActionData::Item { .. } => ActionCategory::ItemStack,
            ActionData::Generic => ActionCategory::Generic,
        }
    }
}

/// One recorded world change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    action_type: ActionType,
    timestamp: DateTime<Utc>,
    location: Location,
    actor: Actor,
    #[serde(default)]
    descriptor: Option<String>,
    data: ActionData,
}

impl Activity {
    /// Create an activity, checking the payload against the action type
    pub fn new(
        action_type: ActionType,
        timestamp: DateTime<Utc>,
        location: Location,
        actor: Actor,
        data: ActionData,
    ) -> Result<Self> {
        let activity = Self {
            action_type,
            timestamp,
            location,
            actor,
            descriptor: None,
            data,
        };
        activity.validate()?;
        Ok(activity)
    }

    /// Attach a human-readable descriptor
    pub fn with_descriptor(mut self, descriptor: impl Into<String>) -> Self {
        self.descriptor = Some(descriptor.into());
        self
    }

    /// Check that the payload shape matches the action type
    ///
    /// Deserialized activities bypass [`Activity::new`], so sources should
    /// call this before handing records to the engine.
    pub fn validate(&self) -> Result<()> {
        let expected = self.action_type.category();
        let got = self.data.category();
        if expected != got {
            return Err(Error::PayloadMismatch {
                action: self.action_type.key().to_string(),
                expected,
                got,
            });
        }
        Ok(())
    }

    pub fn action_type(&self) -> ActionType {
        self.action_type
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn descriptor(&self) -> Option<&str> {
        self.descriptor.as_deref()
    }

    pub fn data(&self) -> &ActionData {
        &self.data
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} by {} at {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.action_type,
            self.actor,
            self.location
        )?;
        if let Some(descriptor) = &self.descriptor {
            write!(f, " ({})", descriptor)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_action_type_keys_round_trip() {
        for action in ActionType::ALL {
            assert_eq!(ActionType::from_key(action.key()).unwrap(), action);
        }
        assert!(matches!(
            ActionType::from_key("block-teleport"),
            Err(Error::UnknownActionType(_))
        ));
    }

    #[test]
    fn test_generic_types_are_not_reversible() {
        assert!(!ActionType::PlayerChat.is_reversible());
        assert!(ActionType::BlockBreak.is_reversible());
        assert!(ActionType::EntityKill.removes_subject());
        assert!(!ActionType::EntitySpawn.removes_subject());
    }

    #[test]
    fn test_payload_mismatch_rejected() {
        let result = Activity::new(
            ActionType::BlockBreak,
            at(0),
            Location::new("world", 0, 64, 0),
            Actor::player(1, "alex"),
            ActionData::Generic,
        );
        assert!(matches!(
            result,
            Err(Error::PayloadMismatch {
                expected: ActionCategory::Block,
                got: ActionCategory::Generic,
                ..
            })
        ));
    }

    #[test]
    fn test_activity_from_ron() {
        let activity: Activity = ron::from_str(
            r#"(
                action_type: BlockBreak,
                timestamp: "2024-05-01T12:00:00Z",
                location: (world: "world", x: 1, y: 64, z: -3),
                actor: Player(id: PlayerId(9), name: "griefer"),
                data: Block(
                    prior: (material: "stone"),
                    new: (material: "air"),
                ),
            )"#,
        )
        .unwrap();

        activity.validate().unwrap();
        assert_eq!(activity.action_type(), ActionType::BlockBreak);
        assert_eq!(activity.actor().name(), "griefer");
        assert_eq!(activity.location().z, -3);
        assert!(activity.descriptor().is_none());
    }
}
