//! Caches derived from a table: the native index, rebuilt whenever the
//! table changes, and an optional memo of results for repeated queries.

pub mod native;
pub mod results;

pub use native::NativeCache;
pub use results::ResultCache;
