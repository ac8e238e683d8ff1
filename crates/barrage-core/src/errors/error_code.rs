//! Stable error codes for structured logging.

/// Maps an error to a stable machine-readable code. Codes are part of
/// the log contract and must not change between releases.
pub trait BarrageErrorCode {
    fn error_code(&self) -> &'static str;
}

pub const CONFIG_INVALID: &str = "BRG-CONFIG-INVALID";
pub const TOOLCHAIN_UNAVAILABLE: &str = "BRG-TOOLCHAIN-UNAVAILABLE";
pub const STORAGE_ERROR: &str = "BRG-STORAGE-ERROR";
pub const STORAGE_OPEN_FAILED: &str = "BRG-STORAGE-OPEN-FAILED";
pub const FINDING_UNRECORDED: &str = "BRG-FINDING-UNRECORDED";
pub const PROBE_BAD_URL: &str = "BRG-PROBE-BAD-URL";
pub const HEARTBEAT_FAILED: &str = "BRG-HEARTBEAT-FAILED";
pub const AUTH_REJECTED: &str = "BRG-AUTH-REJECTED";
pub const NEW_FINDINGS: &str = "BRG-NEW-FINDINGS";
