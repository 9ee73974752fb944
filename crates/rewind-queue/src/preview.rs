//! Taking back a preview
//!
//! A planning run only ever shows fake blocks to its owner. Cancelling the
//! preview re-sends the recorded prior state of each planned block to that
//! owner; nobody else saw anything, so nothing else needs to change.

use crate::queue::Mode;
use crate::result::ModificationQueueResult;
use rewind_core::{Owner, WorldAccess};
use tracing::{debug, warn};

/// Revert every planned change of `result` in `owner`'s view
///
/// Changes are reverted newest first so a location changed several times
/// ends up showing its state from before the preview. Returns how many
/// changes were re-sent. Results of completing runs are never touched and
/// report zero.
///
/// Callers must evict `result` from the cache first so a preview is only
/// ever reverted once.
pub(crate) fn revert_planned_changes<W: WorldAccess + ?Sized>(
    owner: &Owner,
    result: &ModificationQueueResult,
    world: &mut W,
) -> usize {
    if result.mode() != Mode::Planning {
        debug!(owner = %owner, queue = %result.queue().id, "not a preview, nothing to cancel");
        return 0;
    }

    let mut reverted = 0;
    for entry in result.results().iter().rev().filter(|r| r.is_planned()) {
        let Some(change) = entry.state_change() else {
            continue;
        };
        match change.revert_preview(owner, world) {
            Ok(true) => reverted += 1,
            Ok(false) => {}
            Err(e) => warn!(
                owner = %owner,
                location = %change.location(),
                error = %e,
                "failed to revert previewed change"
            ),
        }
    }

    debug!(owner = %owner, queue = %result.queue().id, reverted, "preview cancelled");
    reverted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{ModificationQueue, QueueId, QueueInfo, QueueKind};
    use crate::ruleset::ModificationRuleset;
    use chrono::Utc;
    use rewind_core::{
        ActionData, ActionType, Activity, ActivityQuery, Actor, BlockState, InMemoryWorld,
        Location,
    };

    fn broke_stone(x: i32) -> Activity {
        Activity::new(
            ActionType::BlockBreak,
            Utc::now(),
            Location::new("world", x, 64, 0),
            Actor::player(2, "griefer"),
            ActionData::Block {
                prior: BlockState::new("stone"),
                new: BlockState::air(),
            },
        )
        .unwrap()
    }

    fn run(world: &mut InMemoryWorld, mode: Mode) -> ModificationQueueResult {
        let info = QueueInfo {
            id: QueueId(1),
            kind: QueueKind::Rollback,
            owner: Owner::player(1),
            query: ActivityQuery::for_modification(),
            ruleset: ModificationRuleset::default(),
        };
        let mut queue = ModificationQueue::new(info, vec![broke_stone(0), broke_stone(1)]);
        queue.apply(world, mode).unwrap()
    }

    #[test]
    fn test_cancel_restores_owner_view() {
        let owner = Owner::player(1);
        let mut world = InMemoryWorld::new();
        let result = run(&mut world, Mode::Planning);
        assert_eq!(world.fake_block_count(&owner), 2);

        assert_eq!(revert_planned_changes(&owner, &result, &mut world), 2);
        assert_eq!(world.fake_block_count(&owner), 0);
        assert_eq!(world.block_count(), 0);
    }

    #[test]
    fn test_completed_results_are_not_revertible() {
        let owner = Owner::player(1);
        let mut world = InMemoryWorld::new();
        let result = run(&mut world, Mode::Completing);
        assert_eq!(world.block_count(), 2);

        assert_eq!(revert_planned_changes(&owner, &result, &mut world), 0);
        assert_eq!(world.block_count(), 2);
        assert_eq!(
            world.block_seen_by(&owner, &Location::new("world", 0, 64, 0)),
            BlockState::new("stone")
        );
    }
}
