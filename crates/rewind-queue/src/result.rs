//! Per-activity outcomes and the aggregate queue result

use crate::queue::{Mode, QueueInfo};
use crate::state_change::StateChange;
use chrono::{DateTime, Utc};
use rewind_core::Activity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What happened to one activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModificationStatus {
    /// Shown to the owner only; nothing changed for anyone else
    Planned,
    /// Committed to the world
    Applied,
    /// Intentionally not processed; see the skip reason
    Skipped,
    /// Failed unexpectedly; see the error message
    Errored,
}

/// Why an activity was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SkipReason {
    /// No code path handled the activity
    NotImplemented,
    /// The action type cannot be reversed or restored
    NotApplicable,
    /// Live state already matches the target
    AlreadyAtTarget,
    /// Live state no longer matches what was recorded
    StateConflict,
    /// The target material is blacklisted
    ExcludedMaterial,
    /// The entity type is blacklisted
    ExcludedEntity,
    /// The activity lies outside the permitted radius
    OutOfRange,
    /// An entity occupies the block and could not be moved
    BlockedByEntity,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::NotImplemented => "not implemented",
            SkipReason::NotApplicable => "not applicable",
            SkipReason::AlreadyAtTarget => "already at target state",
            SkipReason::StateConflict => "world state changed since recording",
            SkipReason::ExcludedMaterial => "material excluded by rules",
            SkipReason::ExcludedEntity => "entity excluded by rules",
            SkipReason::OutOfRange => "outside permitted radius",
            SkipReason::BlockedByEntity => "blocked by an entity",
        };
        write!(f, "{}", text)
    }
}

/// Outcome of processing one activity
#[derive(Debug, Clone)]
pub struct ModificationResult {
    activity: Activity,
    state_change: Option<StateChange>,
    status: ModificationStatus,
    /// Only meaningful while `status` is `Skipped`
    skip_reason: SkipReason,
    error: Option<String>,
}

impl ModificationResult {
    /// A result nothing has touched yet: skipped, not implemented
    pub fn new(activity: Activity) -> Self {
        Self {
            activity,
            state_change: None,
            status: ModificationStatus::Skipped,
            skip_reason: SkipReason::NotImplemented,
            error: None,
        }
    }

    pub fn skipped(activity: Activity, reason: SkipReason) -> Self {
        Self {
            skip_reason: reason,
            ..Self::new(activity)
        }
    }

    pub fn planned(activity: Activity, change: StateChange) -> Self {
        Self {
            state_change: Some(change),
            status: ModificationStatus::Planned,
            ..Self::new(activity)
        }
    }

    /// Applied results keep no state change; the mutation is final
    pub fn applied(activity: Activity) -> Self {
        Self {
            status: ModificationStatus::Applied,
            ..Self::new(activity)
        }
    }

    pub fn errored(activity: Activity, error: impl Into<String>) -> Self {
        Self {
            status: ModificationStatus::Errored,
            error: Some(error.into()),
            ..Self::new(activity)
        }
    }

    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    pub fn state_change(&self) -> Option<&StateChange> {
        self.state_change.as_ref()
    }

    pub fn status(&self) -> ModificationStatus {
        self.status
    }

    /// The skip reason, present only for skipped results
    pub fn skip_reason(&self) -> Option<SkipReason> {
        (self.status == ModificationStatus::Skipped).then_some(self.skip_reason)
    }

    /// The failure message, present only for errored results
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_planned(&self) -> bool {
        self.status == ModificationStatus::Planned
    }

    pub fn is_applied(&self) -> bool {
        self.status == ModificationStatus::Applied
    }
}

/// Side effects of the rules, summed over a queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideEffects {
    pub moved_entities: usize,
    pub removed_blocks: usize,
    pub removed_drops: usize,
    pub drained_lava: usize,
}

/// Snapshot of a finished queue
///
/// Errored activities are folded into `skipped` for reporting; `errored`
/// tells how many of the skipped ones failed rather than being passed over.
#[derive(Debug, Clone)]
pub struct ModificationQueueResult {
    mode: Mode,
    queue: QueueInfo,
    results: Vec<ModificationResult>,
    applied: usize,
    skipped: usize,
    planned: usize,
    errored: usize,
    side_effects: SideEffects,
    completed_at: DateTime<Utc>,
}

impl ModificationQueueResult {
    pub fn new(
        mode: Mode,
        queue: QueueInfo,
        results: Vec<ModificationResult>,
        side_effects: SideEffects,
    ) -> Self {
        let mut applied = 0;
        let mut skipped = 0;
        let mut planned = 0;
        let mut errored = 0;

        for result in &results {
            match result.status() {
                ModificationStatus::Applied => applied += 1,
                ModificationStatus::Planned => planned += 1,
                ModificationStatus::Skipped => skipped += 1,
                ModificationStatus::Errored => {
                    skipped += 1;
                    errored += 1;
                }
            }
        }

        Self {
            mode,
            queue,
            results,
            applied,
            skipped,
            planned,
            errored,
            side_effects,
            completed_at: Utc::now(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The queue this result came from
    pub fn queue(&self) -> &QueueInfo {
        &self.queue
    }

    /// Per-activity results, in processing order
    pub fn results(&self) -> &[ModificationResult] {
        &self.results
    }

    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Skipped plus errored
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn planned(&self) -> usize {
        self.planned
    }

    pub fn errored(&self) -> usize {
        self.errored
    }

    pub fn side_effects(&self) -> SideEffects {
        self.side_effects
    }

    pub fn moved_entities(&self) -> usize {
        self.side_effects.moved_entities
    }

    pub fn removed_blocks(&self) -> usize {
        self.side_effects.removed_blocks
    }

    pub fn removed_drops(&self) -> usize {
        self.side_effects.removed_drops
    }

    pub fn drained_lava(&self) -> usize {
        self.side_effects.drained_lava
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    /// Whether this result is a preview that can still be cancelled
    pub fn supports_preview_cancel(&self) -> bool {
        self.mode == Mode::Planning
    }
}
