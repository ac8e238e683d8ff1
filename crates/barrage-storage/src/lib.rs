//! # barrage-storage
//!
//! The findings archive: a SQLite-backed store that doubles as a
//! false-positive baseline. Suspicious observations are fingerprinted
//! and inserted only when the fingerprint has never been seen before,
//! so across runs only net-new failure modes surface.

pub mod archive;
pub mod queries;
pub mod schema;

pub use archive::Archive;
