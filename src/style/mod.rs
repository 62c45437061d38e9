//! Declarative map style: document model, expressions, composition.

/// Style composition and validation.
pub mod composer;
/// Style document model.
pub mod document;
/// Paint and layout expressions.
pub mod expr;

pub use composer::{ComposeInput, StyleIssue, compose_style, ensure_renderable, fallback_style, validate};
pub use document::{LayerSpec, LayerType, SourceSpec, StyleDocument};
