//! # barrage-core
//!
//! Foundation crate for the Barrage HTTP robustness tester.
//! Defines the submission value tree, probe observations, errors,
//! scenario configuration, and runner-host identity.
//! Every other crate in the workspace depends on this.

pub mod config;
pub mod errors;
pub mod logging;
pub mod types;

// Re-export the most commonly used types at the crate root.
pub use config::scenario::{Codec, ScenarioConfig};
pub use errors::{EngineError, ProbeError, StorageError};
pub use types::host::RunnerHost;
pub use types::method::HttpMethod;
pub use types::observation::{Fingerprint, Observation};
pub use types::value::{Node, Value};
