//! Probe errors.
//!
//! The probe reifies every network condition into an `Observation`; the
//! only thing it can fail on is programmer error.

use super::error_code::{self, BarrageErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Malformed target URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

impl BarrageErrorCode for ProbeError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidUrl { .. } => error_code::PROBE_BAD_URL,
        }
    }
}
