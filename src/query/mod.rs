//! Filter state translated into backend query parameters.

/// PostgREST-style geometry query.
pub mod rest;
/// Vector tile endpoint URLs.
pub mod tile;

pub use rest::{RestQuery, overlap_conditions};
pub use tile::{tile_query, tile_url_template};
