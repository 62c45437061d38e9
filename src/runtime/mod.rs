//! Single-writer async runtime and event stream APIs.

/// Quiet-window debouncer used by the persistence worker.
pub mod debounce;
/// Event stream types emitted by the runtime.
pub mod events;
/// Handle and command loop implementation.
pub mod handle;
