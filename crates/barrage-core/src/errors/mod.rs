//! Error types, one enum per layer.
//!
//! Only conditions that must stop a scenario are errors. Everything the
//! tool exists to observe — timeouts, protocol failures, suspicious
//! status codes — is recorded as data on an `Observation` instead.

pub mod engine_error;
pub mod error_code;
pub mod probe_error;
pub mod storage_error;

pub use engine_error::EngineError;
pub use error_code::BarrageErrorCode;
pub use probe_error::ProbeError;
pub use storage_error::StorageError;
