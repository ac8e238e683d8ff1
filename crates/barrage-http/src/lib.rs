//! # barrage-http
//!
//! Wire-side plumbing: submission codecs (form, URL path parameters,
//! JSON), the HTTP probe that reifies transport outcomes into
//! observations, and the valid-case heartbeat sent between injections.

pub mod auth;
pub mod codec;
pub mod heartbeat;
pub mod probe;

pub use auth::{Auth, AuthProvider, StaticAuth};
pub use heartbeat::{check_valid_case, ValidCase, AUTH_SHAPED_STATUSES};
pub use probe::{Probe, ProbeRequest};
