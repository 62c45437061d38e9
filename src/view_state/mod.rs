//! View-state codec: URL query string and persistent storage.

/// URL + storage combination and validation.
pub mod codec;
/// Storage encoding.
pub mod storage;
/// URL query parameter encoding.
pub mod params;

pub use codec::{DEFAULT_NAMESPACE, ViewStateCodec};
