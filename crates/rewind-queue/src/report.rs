//! Human-readable summary of a finished queue

use crate::queue::{Mode, QueueId, QueueKind};
use crate::result::{ModificationQueueResult, ModificationStatus, SideEffects, SkipReason};
use rewind_core::Owner;
use std::collections::BTreeMap;

/// Why activities were left out of a queue run
#[derive(Debug, Clone)]
pub struct QueueReport {
    pub queue: QueueId,
    pub kind: QueueKind,
    pub owner: Owner,
    pub mode: Mode,
    pub applied: usize,
    pub planned: usize,
    /// Skipped activities, errored ones included
    pub skipped: usize,
    /// Number of skipped activities per reason
    pub skips_by_reason: BTreeMap<SkipReason, usize>,
    /// Description and message of every errored activity
    pub errors: Vec<(String, String)>,
    pub side_effects: SideEffects,
}

impl QueueReport {
    pub fn from_result(result: &ModificationQueueResult) -> Self {
        let mut skips_by_reason = BTreeMap::new();
        let mut errors = Vec::new();

        for entry in result.results() {
            if let Some(reason) = entry.skip_reason() {
                *skips_by_reason.entry(reason).or_insert(0) += 1;
            }
            if entry.status() == ModificationStatus::Errored {
                let message = entry.error().unwrap_or("unknown error").to_string();
                errors.push((entry.activity().to_string(), message));
            }
        }

        let queue = result.queue();
        QueueReport {
            queue: queue.id,
            kind: queue.kind,
            owner: queue.owner,
            mode: result.mode(),
            applied: result.applied(),
            planned: result.planned(),
            skipped: result.skipped(),
            skips_by_reason,
            errors,
            side_effects: result.side_effects(),
        }
    }
}

impl std::fmt::Display for QueueReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== {} {} ({:?}) ===", self.kind, self.queue, self.mode)?;
        writeln!(f, "Owner: {}", self.owner)?;
        writeln!(f, "Applied: {}", self.applied)?;
        writeln!(f, "Planned: {}", self.planned)?;
        writeln!(f, "Skipped: {}", self.skipped)?;

        let effects = &self.side_effects;
        if *effects != SideEffects::default() {
            writeln!(
                f,
                "Side effects: {} entities moved, {} blocks removed, {} drops removed, {} lava drained",
                effects.moved_entities,
                effects.removed_blocks,
                effects.removed_drops,
                effects.drained_lava
            )?;
        }

        if !self.skips_by_reason.is_empty() {
            writeln!(f, "\nSkipped by reason:")?;
            for (reason, count) in &self.skips_by_reason {
                writeln!(f, "  {}: {}", reason, count)?;
            }
        }

        if !self.errors.is_empty() {
            writeln!(f, "\nErrors:")?;
            for (activity, message) in &self.errors {
                writeln!(f, "  {}: {}", activity, message)?;
            }
        }

        Ok(())
    }
}
