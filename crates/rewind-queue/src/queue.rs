//! A single rollback or restore run over a fixed list of activities
//!
//! Queues are created and driven by the service. A queue is applied at most
//! once: `Created → Applying → Ended`. Every activity produces exactly one
//! [`ModificationResult`]; a failing activity never stops the run.

use crate::action::{ActionOutcome, ApplyContext, Direction, Transform};
use crate::error::{Error, Result};
use crate::result::{ModificationQueueResult, ModificationResult};
use crate::ruleset::ModificationRuleset;
use rewind_core::{Activity, ActivityQuery, Location, Owner, WorldAccess};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Identifier assigned to each queue by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueueId(pub u64);

impl QueueId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue:{}", self.0)
    }
}

/// Rollback undoes activities newest first; restore replays them oldest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueueKind {
    Rollback,
    Restore,
}

impl QueueKind {
    pub fn direction(&self) -> Direction {
        match self {
            QueueKind::Rollback => Direction::Reverse,
            QueueKind::Restore => Direction::Forward,
        }
    }

    /// Sort activities into processing order
    ///
    /// The sort is stable, so restore keeps input order among equal
    /// timestamps and rollback reverses it.
    pub fn order(&self, activities: &mut [Activity]) {
        activities.sort_by_key(|activity| activity.timestamp());
        if *self == QueueKind::Rollback {
            activities.reverse();
        }
    }
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueKind::Rollback => write!(f, "rollback"),
            QueueKind::Restore => write!(f, "restore"),
        }
    }
}

/// How far a queue goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Preview: block changes are shown to the owner only
    Planning,
    /// Commit changes to the world for everyone
    Completing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Created,
    Applying,
    Ended,
}

/// Everything identifying a queue, carried into its result
#[derive(Debug, Clone)]
pub struct QueueInfo {
    pub id: QueueId,
    pub kind: QueueKind,
    pub owner: Owner,
    pub query: ActivityQuery,
    pub ruleset: ModificationRuleset,
}

/// An ordered batch of activities waiting to be applied
#[derive(Debug)]
pub struct ModificationQueue {
    info: QueueInfo,
    activities: Vec<Activity>,
    state: QueueState,
}

impl ModificationQueue {
    /// Create a queue, sorting activities into the order `info.kind` needs
    pub(crate) fn new(info: QueueInfo, mut activities: Vec<Activity>) -> Self {
        info.kind.order(&mut activities);
        Self::preordered(info, activities)
    }

    /// Create a queue that processes activities exactly in the given order
    pub(crate) fn preordered(info: QueueInfo, activities: Vec<Activity>) -> Self {
        Self {
            info,
            activities,
            state: QueueState::Created,
        }
    }

    pub fn info(&self) -> &QueueInfo {
        &self.info
    }

    pub fn id(&self) -> QueueId {
        self.info.id
    }

    pub fn kind(&self) -> QueueKind {
        self.info.kind
    }

    pub fn owner(&self) -> &Owner {
        &self.info.owner
    }

    pub fn ruleset(&self) -> &ModificationRuleset {
        &self.info.ruleset
    }

    /// Activities in processing order
    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn state(&self) -> QueueState {
        self.state
    }

    pub fn is_owned_by(&self, owner: &Owner) -> bool {
        self.info.owner == *owner
    }

    /// Process every activity in order and build the result
    ///
    /// Only a queue in the `Created` state can be applied; the returned
    /// result is produced exactly once.
    pub(crate) fn apply<W: WorldAccess + ?Sized>(
        &mut self,
        world: &mut W,
        mode: Mode,
    ) -> Result<ModificationQueueResult> {
        if self.state != QueueState::Created {
            return Err(Error::AlreadyApplied(self.info.id));
        }
        self.state = QueueState::Applying;

        info!(
            queue = %self.info.id,
            owner = %self.info.owner,
            kind = %self.info.kind,
            mode = ?mode,
            activities = self.activities.len(),
            "applying modification queue"
        );

        let direction = self.info.kind.direction();
        let reference = self.info.query.reference.as_ref();
        let mut ctx = ApplyContext::new(world, self.info.owner, &self.info.ruleset, mode);
        let results: Vec<ModificationResult> = self
            .activities
            .iter()
            .map(|activity| apply_activity(self.info.id, activity, reference, direction, &mut ctx))
            .collect();
        let effects = ctx.effects();

        self.state = QueueState::Ended;
        let result = ModificationQueueResult::new(mode, self.info.clone(), results, effects);

        info!(
            queue = %self.info.id,
            applied = result.applied(),
            planned = result.planned(),
            skipped = result.skipped(),
            errored = result.errored(),
            "modification queue finished"
        );

        Ok(result)
    }
}

fn apply_activity<W: WorldAccess + ?Sized>(
    queue: QueueId,
    activity: &Activity,
    reference: Option<&Location>,
    direction: Direction,
    ctx: &mut ApplyContext<'_, W>,
) -> ModificationResult {
    if let Some(reason) = ctx.ruleset().exclusion(activity, reference, direction) {
        debug!(queue = %queue, activity = %activity, reason = %reason, "activity excluded");
        return ModificationResult::skipped(activity.clone(), reason);
    }

    let transform = Transform::for_direction(activity, direction);
    match transform.apply(activity.location(), ctx) {
        Ok(ActionOutcome::Skipped(reason)) => {
            debug!(queue = %queue, activity = %activity, reason = %reason, "activity skipped");
            ModificationResult::skipped(activity.clone(), reason)
        }
        Ok(ActionOutcome::Changed(change)) => match ctx.mode() {
            Mode::Planning => ModificationResult::planned(activity.clone(), change),
            Mode::Completing => ModificationResult::applied(activity.clone()),
        },
        Err(e) => {
            warn!(queue = %queue, activity = %activity, error = %e, "activity failed");
            ModificationResult::errored(activity.clone(), e.to_string())
        }
    }
}
