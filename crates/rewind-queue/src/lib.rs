//! Rewind Queue - Turning recorded activities back into world changes
//!
//! This crate is the modification engine:
//! - `ModificationRuleset`: per-invocation rules, frozen for a run
//! - `Transform`: the write that rolls back or restores one activity
//! - `ModificationQueue`: an ordered, run-once batch of activities
//! - `ModificationQueueService`: single-queue exclusivity, per-owner result
//!   cache, preview confirmation and cancellation
//! - `QueueReport`: why activities were skipped or failed
//! - `MutationContext` / `ActivityFetcher`: async lookup feeding a single
//!   serialized mutation context
//!
//! # Modes
//!
//! A queue runs in one of two modes. `Mode::Planning` shows block changes
//! to the queue owner only and leaves the world untouched; the result can
//! later be cancelled or confirmed. `Mode::Completing` commits every change
//! and runs the ruleset's side effects.

mod action;
mod cache;
mod config;
mod error;
mod preview;
mod queue;
mod report;
mod result;
mod ruleset;
mod service;
mod state_change;
pub mod pipeline;

pub use action::{ActionOutcome, ApplyContext, Direction, Transform};
pub use cache::ResultCache;
pub use config::{EngineConfig, ResultCacheConfig};
pub use error::{Error, Result};
pub use pipeline::{
    ActivityFetcher, ModificationRequest, MutationContext, MutationHandle, MutationJob,
};
pub use queue::{Mode, ModificationQueue, QueueId, QueueInfo, QueueKind, QueueState};
pub use report::QueueReport;
pub use result::{
    ModificationQueueResult, ModificationResult, ModificationStatus, SideEffects, SkipReason,
};
pub use ruleset::ModificationRuleset;
pub use service::{CompletionSink, ModificationQueueService};
pub use state_change::StateChange;
