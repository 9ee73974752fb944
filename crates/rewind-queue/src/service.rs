//! The modification queue service
//!
//! The service is the only way to create and apply queues. It holds at most
//! one queue at a time; while that queue exists every other request to
//! create one fails with [`Error::QueueUnavailable`]. Finished results are
//! kept per owner in a [`ResultCache`] so previews can be confirmed or
//! cancelled later.
//!
//! # Example
//!
//! ```
//! use rewind_core::{
//!     ActionData, ActionType, Activity, ActivityQuery, Actor, BlockState, InMemoryWorld,
//!     Location, Owner, WorldAccess,
//! };
//! use rewind_queue::{EngineConfig, Mode, ModificationQueueService, ModificationRuleset};
//!
//! let config = EngineConfig::default();
//! let mut service = ModificationQueueService::from_config(&config);
//! let mut world = InMemoryWorld::new();
//!
//! let broken = Activity::new(
//!     ActionType::BlockBreak,
//!     chrono::Utc::now(),
//!     Location::new("world", 0, 64, 0),
//!     Actor::player(2, "griefer"),
//!     ActionData::Block { prior: BlockState::new("stone"), new: BlockState::air() },
//! )?;
//!
//! let owner = Owner::Console;
//! service.new_rollback_queue(
//!     ModificationRuleset::from_config(&config),
//!     owner,
//!     ActivityQuery::for_modification(),
//!     vec![broken],
//! )?;
//! let result = service.apply_current(&mut world, Mode::Completing)?;
//!
//! assert_eq!(result.applied(), 1);
//! assert_eq!(world.block_at(&Location::new("world", 0, 64, 0)), BlockState::new("stone"));
//! assert!(service.queue_available());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::cache::ResultCache;
use crate::config::{EngineConfig, ResultCacheConfig};
use crate::error::{Error, Result};
use crate::preview::revert_planned_changes;
use crate::queue::{Mode, ModificationQueue, QueueId, QueueInfo, QueueKind};
use crate::result::ModificationQueueResult;
use crate::ruleset::ModificationRuleset;
use rewind_core::{Activity, ActivityQuery, Owner, WorldAccess};
use std::sync::Arc;
use tracing::{debug, info};

/// Receives every finished queue result
///
/// Implemented for closures; a channel sender can be registered by wrapping
/// it in one.
pub trait CompletionSink: Send {
    fn on_complete(&mut self, result: Arc<ModificationQueueResult>);
}

impl<F> CompletionSink for F
where
    F: FnMut(Arc<ModificationQueueResult>) + Send,
{
    fn on_complete(&mut self, result: Arc<ModificationQueueResult>) {
        self(result)
    }
}

/// Creates, applies and remembers modification queues
pub struct ModificationQueueService {
    /// The one queue currently held, if any
    current: Option<ModificationQueue>,
    /// Last result per owner
    results: ResultCache,
    next_queue_id: u64,
    sink: Option<Box<dyn CompletionSink>>,
    /// Previews evicted while no world was at hand; reverted on next apply
    stale_previews: Vec<(Owner, Arc<ModificationQueueResult>)>,
}

impl ModificationQueueService {
    /// Create a service with an empty result cache
    pub fn new(cache: &ResultCacheConfig) -> Self {
        Self {
            current: None,
            results: ResultCache::new(cache),
            next_queue_id: 0,
            sink: None,
            stale_previews: Vec::new(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(&config.result_cache)
    }

    /// Register the sink that is told about every finished queue
    pub fn set_completion_sink(&mut self, sink: impl CompletionSink + 'static) {
        self.sink = Some(Box::new(sink));
    }

    /// Whether a new queue can be created right now
    pub fn queue_available(&self) -> bool {
        self.current.is_none()
    }

    pub fn current_queue(&self) -> Option<&ModificationQueue> {
        self.current.as_ref()
    }

    pub fn current_queue_for_owner(&self, owner: &Owner) -> Option<&ModificationQueue> {
        self.current.as_ref().filter(|queue| queue.is_owned_by(owner))
    }

    /// Create a queue undoing `activities`, newest first
    pub fn new_rollback_queue(
        &mut self,
        ruleset: ModificationRuleset,
        owner: Owner,
        query: ActivityQuery,
        activities: Vec<Activity>,
    ) -> Result<&ModificationQueue> {
        self.new_queue(QueueKind::Rollback, ruleset, owner, query, activities)
    }

    /// Create a queue replaying `activities`, oldest first
    pub fn new_restore_queue(
        &mut self,
        ruleset: ModificationRuleset,
        owner: Owner,
        query: ActivityQuery,
        activities: Vec<Activity>,
    ) -> Result<&ModificationQueue> {
        self.new_queue(QueueKind::Restore, ruleset, owner, query, activities)
    }

    fn new_queue(
        &mut self,
        kind: QueueKind,
        ruleset: ModificationRuleset,
        owner: Owner,
        query: ActivityQuery,
        activities: Vec<Activity>,
    ) -> Result<&ModificationQueue> {
        self.ensure_available()?;
        self.forget_result(&owner);

        let info = QueueInfo {
            id: self.next_queue_id(),
            kind,
            owner,
            query,
            ruleset,
        };
        let queue = ModificationQueue::new(info, activities);
        info!(
            queue = %queue.id(),
            owner = %owner,
            kind = %kind,
            activities = queue.activities().len(),
            "modification queue created"
        );

        Ok(self.current.insert(queue))
    }

    /// Drop the held queue if `owner` holds it
    ///
    /// A preview the queue replaced goes back into the cache, so it can
    /// still be confirmed or cancelled. Returns false when there is no queue
    /// or someone else holds it.
    pub fn cancel_queue_for_owner(&mut self, owner: &Owner) -> bool {
        match self.current.take() {
            Some(queue) if queue.is_owned_by(owner) => {
                info!(queue = %queue.id(), owner = %owner, "modification queue cancelled");
                self.restore_stale_preview(owner);
                true
            }
            other => {
                self.current = other;
                false
            }
        }
    }

    /// Remove every trace of `owner`: their queue, their cached result and
    /// any preview they are still looking at
    pub fn clear_everything_for_owner<W: WorldAccess + ?Sized>(
        &mut self,
        owner: &Owner,
        world: &mut W,
    ) {
        self.cancel_queue_for_owner(owner);

        let (stale, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.stale_previews)
            .into_iter()
            .partition(|(stale_owner, _)| stale_owner == owner);
        self.stale_previews = rest;
        for (_, preview) in stale {
            revert_planned_changes(owner, &preview, world);
        }

        if let Some(result) = self.results.remove(owner) {
            if result.mode() == Mode::Planning {
                revert_planned_changes(owner, &result, world);
            }
            debug!(owner = %owner, queue = %result.queue().id, "cleared cached result");
        }
    }

    /// The last result produced for `owner`, unless it has expired
    pub fn queue_result_for_owner(&self, owner: &Owner) -> Option<Arc<ModificationQueueResult>> {
        self.results.get(owner)
    }

    /// Apply the held queue and release it
    ///
    /// The result is cached for the queue's owner and handed to the
    /// completion sink before being returned.
    pub fn apply_current<W: WorldAccess + ?Sized>(
        &mut self,
        world: &mut W,
        mode: Mode,
    ) -> Result<Arc<ModificationQueueResult>> {
        let mut queue = self.current.take().ok_or(Error::NoActiveQueue)?;
        self.revert_stale_previews(world);

        let result = Arc::new(queue.apply(world, mode)?);
        self.complete(Arc::clone(&result));
        Ok(result)
    }

    /// Take back the preview `owner` is looking at
    ///
    /// The preview is evicted before being reverted, so cancelling twice
    /// re-sends nothing the second time. Returns how many changes were
    /// reverted; zero when `owner` has no pending preview.
    pub fn cancel_preview<W: WorldAccess + ?Sized>(
        &mut self,
        owner: &Owner,
        world: &mut W,
    ) -> usize {
        match self.take_preview(owner) {
            Some(preview) => revert_planned_changes(owner, &preview, world),
            None => 0,
        }
    }

    /// Commit the preview `owner` is looking at
    ///
    /// The preview is taken back first, then the same activities are
    /// applied in the same order by a fresh queue of the same kind.
    pub fn confirm_preview<W: WorldAccess + ?Sized>(
        &mut self,
        owner: &Owner,
        world: &mut W,
    ) -> Result<Arc<ModificationQueueResult>> {
        self.ensure_available()?;

        let preview = self
            .take_preview(owner)
            .ok_or(Error::NoPendingPreview(*owner))?;
        revert_planned_changes(owner, &preview, world);

        let activities = preview
            .results()
            .iter()
            .map(|entry| entry.activity().clone())
            .collect();
        let info = QueueInfo {
            id: self.next_queue_id(),
            ..preview.queue().clone()
        };
        info!(
            queue = %info.id,
            preview = %preview.queue().id,
            owner = %owner,
            "confirming preview"
        );
        self.current = Some(ModificationQueue::preordered(info, activities));

        self.apply_current(world, Mode::Completing)
    }

    fn ensure_available(&self) -> Result<()> {
        match &self.current {
            Some(queue) => Err(Error::QueueUnavailable {
                holder: *queue.owner(),
            }),
            None => Ok(()),
        }
    }

    fn next_queue_id(&mut self) -> QueueId {
        self.next_queue_id += 1;
        QueueId(self.next_queue_id)
    }

    /// Evict the cached result for `owner`, keeping previews for later revert
    fn forget_result(&mut self, owner: &Owner) {
        if let Some(result) = self.results.remove(owner) {
            if result.supports_preview_cancel() {
                self.stale_previews.push((*owner, result));
            }
        }
    }

    /// Put a preview evicted by a cancelled queue back into the cache
    fn restore_stale_preview(&mut self, owner: &Owner) {
        if let Some(index) = self.stale_previews.iter().rposition(|(o, _)| o == owner) {
            let (_, preview) = self.stale_previews.remove(index);
            debug!(owner = %owner, queue = %preview.queue().id, "preview restored");
            self.results.insert(*owner, preview);
        }
    }

    /// Evict and return the pending preview of `owner`
    fn take_preview(&mut self, owner: &Owner) -> Option<Arc<ModificationQueueResult>> {
        let preview = self
            .results
            .get(owner)
            .filter(|result| result.supports_preview_cancel())?;
        self.results.remove(owner);
        Some(preview)
    }

    fn revert_stale_previews<W: WorldAccess + ?Sized>(&mut self, world: &mut W) {
        for (owner, preview) in std::mem::take(&mut self.stale_previews) {
            revert_planned_changes(&owner, &preview, world);
        }
    }

    fn complete(&mut self, result: Arc<ModificationQueueResult>) {
        let owner = result.queue().owner;
        self.results.insert(owner, Arc::clone(&result));
        if let Some(sink) = self.sink.as_mut() {
            sink.on_complete(result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{ModificationStatus, SkipReason};
    use chrono::{DateTime, TimeZone, Utc};
    use rewind_core::{
        ActionData, ActionType, Actor, BlockState, EntitySnapshot, InMemoryWorld, ItemStack,
        Location,
    };
    use std::sync::mpsc;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn loc(x: i32) -> Location {
        Location::new("world", x, 64, 0)
    }

    fn block(action: ActionType, prior: &str, new: &str, x: i32, secs: i64) -> Activity {
        Activity::new(
            action,
            at(secs),
            loc(x),
            Actor::player(2, "griefer"),
            ActionData::Block {
                prior: BlockState::new(prior),
                new: BlockState::new(new),
            },
        )
        .unwrap()
    }

    fn dropped(x: i32, secs: i64) -> Activity {
        Activity::new(
            ActionType::ItemDrop,
            at(secs),
            loc(x),
            Actor::player(2, "griefer"),
            ActionData::Item {
                item: ItemStack::new("diamond", 1),
            },
        )
        .unwrap()
    }

    /// Break stone, place dirt where it was, drop an item next to it
    fn grief() -> Vec<Activity> {
        vec![
            block(ActionType::BlockBreak, "stone", "air", 0, 1),
            block(ActionType::BlockPlace, "air", "dirt", 0, 2),
            dropped(1, 3),
        ]
    }

    fn service() -> ModificationQueueService {
        ModificationQueueService::from_config(&EngineConfig::default())
    }

    fn rollback(
        service: &mut ModificationQueueService,
        owner: Owner,
        activities: Vec<Activity>,
    ) -> Result<&ModificationQueue> {
        service.new_rollback_queue(
            ModificationRuleset::default(),
            owner,
            ActivityQuery::for_modification(),
            activities,
        )
    }

    fn stamps(result: &ModificationQueueResult) -> Vec<i64> {
        result
            .results()
            .iter()
            .map(|r| r.activity().timestamp().timestamp())
            .collect()
    }

    #[test]
    fn test_rollback_and_restore_order() {
        let owner = Owner::Console;
        let mut world = InMemoryWorld::new();
        world.put_block(loc(0), BlockState::new("dirt"));
        world.drop_item(&loc(1), &ItemStack::new("diamond", 1)).unwrap();

        let mut service = service();
        rollback(&mut service, owner, grief()).unwrap();
        let result = service.apply_current(&mut world, Mode::Completing).unwrap();
        assert_eq!(stamps(&result), vec![3, 2, 1]);
        assert_eq!(result.applied(), 3);
        assert_eq!(world.block_at(&loc(0)), BlockState::new("stone"));
        assert_eq!(world.drop_count(), 0);

        service
            .new_restore_queue(
                ModificationRuleset::default(),
                owner,
                ActivityQuery::for_modification(),
                grief(),
            )
            .unwrap();
        let result = service.apply_current(&mut world, Mode::Completing).unwrap();
        assert_eq!(stamps(&result), vec![1, 2, 3]);
        assert_eq!(result.applied(), 3);
        assert_eq!(world.block_at(&loc(0)), BlockState::new("dirt"));
        assert_eq!(world.drop_count(), 1);
    }

    #[test]
    fn test_counters_cover_every_activity() {
        let mut world = InMemoryWorld::new();
        world.put_block(loc(0), BlockState::new("dirt"));

        let mut activities = grief();
        activities.push(
            Activity::new(
                ActionType::PlayerChat,
                at(4),
                loc(0),
                Actor::player(2, "griefer"),
                ActionData::Generic,
            )
            .unwrap(),
        );

        let mut service = service();
        for mode in [Mode::Planning, Mode::Completing] {
            rollback(&mut service, Owner::Console, activities.clone()).unwrap();
            let result = service.apply_current(&mut world, mode).unwrap();
            assert_eq!(
                result.applied() + result.skipped() + result.planned(),
                activities.len()
            );
        }
    }

    #[test]
    fn test_single_queue_at_a_time() {
        let mut service = service();
        let alice = Owner::player(1);
        let bob = Owner::player(2);

        assert!(service.queue_available());
        rollback(&mut service, alice, grief()).unwrap();
        assert!(!service.queue_available());

        let err = rollback(&mut service, bob, grief()).unwrap_err();
        assert!(err.is_unavailable());
        assert!(matches!(err, Error::QueueUnavailable { holder } if holder == alice));
        assert_eq!(service.current_queue().map(|q| *q.owner()), Some(alice));
        assert!(service.current_queue_for_owner(&bob).is_none());

        let mut world = InMemoryWorld::new();
        service.apply_current(&mut world, Mode::Planning).unwrap();
        assert!(service.queue_available());
        assert!(rollback(&mut service, bob, grief()).is_ok());
    }

    #[test]
    fn test_cancel_queue_for_owner() {
        let mut service = service();
        let alice = Owner::player(1);
        let bob = Owner::player(2);

        assert!(!service.cancel_queue_for_owner(&alice));

        rollback(&mut service, alice, grief()).unwrap();
        assert!(!service.cancel_queue_for_owner(&bob));
        assert!(!service.queue_available());

        assert!(service.cancel_queue_for_owner(&alice));
        assert!(service.queue_available());
        assert!(service.current_queue().is_none());

        let mut world = InMemoryWorld::new();
        assert!(matches!(
            service.apply_current(&mut world, Mode::Completing),
            Err(Error::NoActiveQueue)
        ));
    }

    #[test]
    fn test_preview_then_clear() {
        let owner = Owner::player(1);
        let mut world = InMemoryWorld::new();
        world.put_block(loc(0), BlockState::new("dirt"));
        let before = world.clone();

        let mut service = service();
        rollback(&mut service, owner, grief()).unwrap();
        let result = service.apply_current(&mut world, Mode::Planning).unwrap();

        assert!(service.queue_available());
        assert!(result.supports_preview_cancel());
        assert_eq!(result.applied(), 0);
        assert_eq!(world.block_at(&loc(0)), before.block_at(&loc(0)));
        assert_eq!(world.block_seen_by(&owner, &loc(0)), BlockState::new("stone"));
        assert_eq!(
            service.queue_result_for_owner(&owner).map(|r| r.queue().id),
            Some(result.queue().id)
        );

        service.clear_everything_for_owner(&owner, &mut world);
        assert_eq!(world.fake_block_count(&owner), 0);
        assert!(service.queue_result_for_owner(&owner).is_none());
    }

    #[test]
    fn test_confirm_preview() {
        let owner = Owner::player(1);
        let mut world = InMemoryWorld::new();
        world.put_block(loc(0), BlockState::new("dirt"));

        let mut service = service();
        assert!(matches!(
            service.confirm_preview(&owner, &mut world),
            Err(Error::NoPendingPreview(_))
        ));

        rollback(&mut service, owner, grief()).unwrap();
        let preview = service.apply_current(&mut world, Mode::Planning).unwrap();

        rollback(&mut service, Owner::Console, Vec::new()).unwrap();
        assert!(service
            .confirm_preview(&owner, &mut world)
            .unwrap_err()
            .is_unavailable());
        service.cancel_queue_for_owner(&Owner::Console);

        let result = service.confirm_preview(&owner, &mut world).unwrap();
        assert_eq!(result.mode(), Mode::Completing);
        assert_ne!(result.queue().id, preview.queue().id);
        assert_eq!(stamps(&result), stamps(&preview));
        assert_eq!(world.block_at(&loc(0)), BlockState::new("stone"));
        assert_eq!(world.fake_block_count(&owner), 0);

        // The confirmed result replaced the preview and cannot be confirmed again
        assert!(matches!(
            service.confirm_preview(&owner, &mut world),
            Err(Error::NoPendingPreview(_))
        ));
    }

    #[test]
    fn test_new_queue_reverts_stale_preview() {
        let owner = Owner::player(1);
        let mut world = InMemoryWorld::new();

        let mut service = service();
        rollback(
            &mut service,
            owner,
            vec![block(ActionType::BlockBreak, "stone", "air", 0, 1)],
        )
        .unwrap();
        service.apply_current(&mut world, Mode::Planning).unwrap();
        assert_eq!(world.fake_block_count(&owner), 1);

        rollback(
            &mut service,
            owner,
            vec![block(ActionType::BlockBreak, "stone", "air", 5, 1)],
        )
        .unwrap();
        assert!(service.queue_result_for_owner(&owner).is_none());

        service.apply_current(&mut world, Mode::Completing).unwrap();
        assert_eq!(world.fake_block_count(&owner), 0);
        assert_eq!(world.block_at(&loc(5)), BlockState::new("stone"));
        assert!(world.block_at(&loc(0)).is_air());
    }

    #[test]
    fn test_cancelled_queue_gives_back_replaced_preview() {
        let owner = Owner::player(1);
        let mut world = InMemoryWorld::new();
        let broke = || vec![block(ActionType::BlockBreak, "stone", "air", 0, 1)];

        let mut service = service();
        rollback(&mut service, owner, broke()).unwrap();
        let preview = service.apply_current(&mut world, Mode::Planning).unwrap();

        rollback(&mut service, owner, broke()).unwrap();
        assert!(service.queue_result_for_owner(&owner).is_none());
        assert!(service.cancel_queue_for_owner(&owner));
        assert_eq!(
            service.queue_result_for_owner(&owner).map(|r| r.queue().id),
            Some(preview.queue().id)
        );

        assert_eq!(service.cancel_preview(&owner, &mut world), 1);
        assert_eq!(world.fake_block_count(&owner), 0);
    }

    #[test]
    fn test_preview_is_cancelled_once() {
        let owner = Owner::player(1);
        let mut world = InMemoryWorld::new();
        world.put_block(loc(0), BlockState::new("dirt"));

        let mut service = service();
        rollback(&mut service, owner, grief()).unwrap();
        service.apply_current(&mut world, Mode::Planning).unwrap();

        assert_eq!(service.cancel_preview(&owner, &mut world), 2);
        assert_eq!(world.fake_block_count(&owner), 0);

        // The real block changes afterwards; a second cancel must not resend
        world.set_block(&loc(0), &BlockState::new("glass")).unwrap();
        assert_eq!(service.cancel_preview(&owner, &mut world), 0);
        assert_eq!(world.block_seen_by(&owner, &loc(0)), BlockState::new("glass"));
        assert!(service.queue_result_for_owner(&owner).is_none());

        // Completed results are left in the cache
        rollback(&mut service, owner, grief()).unwrap();
        service.apply_current(&mut world, Mode::Completing).unwrap();
        assert_eq!(service.cancel_preview(&owner, &mut world), 0);
        assert!(service.queue_result_for_owner(&owner).is_some());
    }

    #[test]
    fn test_preview_agrees_with_confirm_when_blocked() {
        let owner = Owner::player(1);
        let mut world = InMemoryWorld::new();
        world.spawn_entity(&loc(0), &EntitySnapshot::new("sheep")).unwrap();
        for y in 65..=67 {
            world.put_block(Location::new("world", 0, y, 0), BlockState::new("dirt"));
        }

        let mut service = service();
        rollback(
            &mut service,
            owner,
            vec![block(ActionType::BlockBreak, "stone", "air", 0, 1)],
        )
        .unwrap();
        let preview = service.apply_current(&mut world, Mode::Planning).unwrap();
        assert_eq!(preview.planned(), 0);
        assert_eq!(
            preview.results()[0].skip_reason(),
            Some(SkipReason::BlockedByEntity)
        );
        assert_eq!(world.fake_block_count(&owner), 0);

        let confirmed = service.confirm_preview(&owner, &mut world).unwrap();
        assert_eq!(
            confirmed.results()[0].skip_reason(),
            Some(SkipReason::BlockedByEntity)
        );
        assert!(world.block_at(&loc(0)).is_air());
    }

    #[test]
    fn test_completion_sink_sees_every_result() {
        let (tx, rx) = mpsc::channel();
        let mut service = service();
        service.set_completion_sink(move |result: Arc<ModificationQueueResult>| {
            let _ = tx.send(result.queue().id);
        });

        let mut world = InMemoryWorld::new();
        for _ in 0..2 {
            rollback(&mut service, Owner::Console, grief()).unwrap();
            service.apply_current(&mut world, Mode::Planning).unwrap();
        }

        let seen: Vec<QueueId> = rx.try_iter().collect();
        assert_eq!(seen, vec![QueueId(1), QueueId(2)]);
    }

    #[test]
    fn test_skip_reasons_only_on_skipped() {
        let mut world = InMemoryWorld::new();
        world.put_block(loc(0), BlockState::new("dirt"));

        let mut service = service();
        rollback(&mut service, Owner::Console, grief()).unwrap();
        let result = service.apply_current(&mut world, Mode::Completing).unwrap();

        for entry in result.results() {
            match entry.status() {
                ModificationStatus::Skipped => assert!(entry.skip_reason().is_some()),
                _ => assert!(entry.skip_reason().is_none()),
            }
        }
        // The dropped item was never on the ground
        assert_eq!(result.results()[0].skip_reason(), Some(SkipReason::StateConflict));
    }
}
