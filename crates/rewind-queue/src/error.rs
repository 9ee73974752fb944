//! Error types for rewind-queue
//!
//! Only contention and contract violations surface here. Failures of a
//! single activity are recorded in its `ModificationResult` and never turn
//! into an `Error`.

use crate::queue::QueueId;
use rewind_core::Owner;
use thiserror::Error;

/// Result type for rewind-queue operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in rewind-queue
#[derive(Debug, Error)]
pub enum Error {
    /// A queue is already held; the caller should wait and retry
    #[error("a modification queue is already in progress for {holder}")]
    QueueUnavailable {
        /// Owner of the queue currently held
        holder: Owner,
    },

    /// Nothing to apply
    #[error("no modification queue is in progress")]
    NoActiveQueue,

    /// A queue only ever runs once
    #[error("{0} has already been applied")]
    AlreadyApplied(QueueId),

    /// Confirm was requested without a planned result in the cache
    #[error("no preview is pending for {0}")]
    NoPendingPreview(Owner),

    /// Configuration could not be parsed
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Activity lookup failed before a queue was built
    #[error("activity lookup failed: {0}")]
    Source(#[from] rewind_core::Error),

    /// The blocking lookup task panicked or was cancelled
    #[error("activity lookup task failed: {0}")]
    FetchTask(String),

    /// The mutation context stopped before answering
    #[error("mutation context is no longer running")]
    PipelineClosed,
}

impl Error {
    /// Check if this is the "busy, try again later" condition
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::QueueUnavailable { .. })
    }
}

// Compile-time check that Error is Send + Sync so it can cross the pipeline's channels.
fn _assert_error_send_sync<T: Send + Sync>() {}
fn _error_is_send_sync() {
    _assert_error_send_sync::<Error>();
}
