//! In-memory view state and its invariants.

/// Vocabulary filters.
pub mod filters;
/// Opacity domains.
pub mod opacity;
/// View-state records.
pub mod state;
/// Authoritative view store.
pub mod store;
