//! Runtime event stream payloads.

use crate::types::Generation;

/// Events emitted from the single-writer view-state loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    /// The view state changed.
    Changed {
        /// Generation after the change.
        generation: Generation,
    },
    /// Storage and history hold at least this generation.
    Persisted {
        /// Highest generation written.
        generation: Generation,
    },
    /// A coalesced write failed; the next change retries.
    PersistFailed {
        /// Generation that could not be written.
        generation: Generation,
        /// Human-readable cause.
        message: String,
    },
}
