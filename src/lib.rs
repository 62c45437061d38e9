//! Map layer and style composition for an archaeological site viewer, with a
//! filter-to-tile-query translator and a shareable, resumable view state.
//!
//! # Examples
//!
//! Composing a style for a filtered view:
//! ```
//! use archeomap::{
//!     core::{filters::{FilterCategory, MapFilters}, opacity::{LayerOpacity, LayerVisibility}},
//!     style::{compose_style, ComposeInput},
//! };
//!
//! let filters = MapFilters::new().with(FilterCategory::Cronologie, ["c1", "c2"]);
//! let style = compose_style(&ComposeInput {
//!     tiles_base: "https://backend.example/functions/v1",
//!     filters: &filters,
//!     visibility: LayerVisibility::default(),
//!     opacity: LayerOpacity::default(),
//! });
//! assert!(style.layer("sites-fill").is_some());
//! ```
//!
//! Runtime usage with a SQLite-backed view state:
//! ```no_run
//! use std::sync::Arc;
//!
//! use archeomap::{
//!     core::store::ViewStore,
//!     op::ViewOp,
//!     persist::{sqlite::SqliteStore, MemoryHistory},
//!     providers::ProviderRegistry,
//!     runtime::handle::{spawn_view_state, RuntimeConfig},
//!     view_state::ViewStateCodec,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let registry = Arc::new(ProviderRegistry::from_env());
//! let codec = ViewStateCodec::new(Arc::clone(&registry));
//! let storage = SqliteStore::open("archeomap.db").expect("open sqlite");
//! let initial = codec.decode("basemap=osm-hot", &storage);
//! let store = ViewStore::new(Arc::clone(&registry), initial);
//! let handle = spawn_view_state(
//!     store,
//!     codec,
//!     Box::new(storage),
//!     Box::new(MemoryHistory::new()),
//!     RuntimeConfig::default(),
//! );
//! handle
//!     .apply(ViewOp::ToggleOverlay { id: "hillshade".into(), enable: None })
//!     .await
//!     .expect("toggle");
//! handle.shutdown().await.expect("shutdown");
//! # }
//! ```
#![deny(missing_docs)]

/// Backend REST, search and geocoding client.
pub mod backend;
/// Viewer configuration.
pub mod config;
/// View state, filters, opacities and the authoritative store.
pub mod core;
/// Live-map mutation through the renderer capability.
pub mod engine;
/// View-state mutation model.
pub mod op;
/// Storage and history sinks.
pub mod persist;
/// Tile provider catalog and registry.
pub mod providers;
/// Filter-to-query translation.
pub mod query;
/// Site records.
pub mod records;
/// Single-writer runtime handle and events.
pub mod runtime;
/// Text search routing and stale-response guarding.
pub mod search;
/// Style document and composition.
pub mod style;
/// Shared primitive types and enums.
pub mod types;
/// URL and storage codec for the view state.
pub mod view_state;
