//! Run-fatal errors.
//!
//! `EngineError` is the single channel for anything that must abort a
//! scenario: misconfiguration, a missing mutation toolchain, archive
//! failures, and heartbeat failures. A scenario that completes returns
//! `Ok` only when no new findings were produced and none are left
//! unresolved from earlier runs.

use super::error_code::{self, BarrageErrorCode};
use super::{ProbeError, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid scenario configuration: {message}")]
    Config { message: String },

    #[error("Could not execute mutation tool '{tool}': {message}")]
    ToolchainUnavailable { tool: String, message: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    /// The valid case stopped working for a reason other than
    /// authentication, so the rest of the run would be meaningless.
    /// `last_injection` is the most recent injected body, for context.
    #[error(
        "Valid case {method} request to {url} failed after injected submission \
         {last_injection}: {detail}"
    )]
    HeartbeatFailed {
        method: String,
        url: String,
        detail: String,
        last_injection: String,
    },

    /// Two consecutive auth-shaped failures on the heartbeat.
    #[error(
        "Valid case {method} request to {url} failed authorisation twice in a row \
         after injected submission {last_injection}: response status code {status}"
    )]
    AuthRejected {
        method: String,
        url: String,
        status: String,
        last_injection: String,
    },

    /// End-of-run gate: new findings this run, or unresolved rows from
    /// previous runs still flagged `new_issue` in the archive.
    #[error(
        "{new_this_run} new findings stored this run, \
         {unresolved_in_archive} unprocessed findings in the archive"
    )]
    NewFindings {
        new_this_run: usize,
        unresolved_in_archive: usize,
    },
}

impl BarrageErrorCode for EngineError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config { .. } => error_code::CONFIG_INVALID,
            Self::ToolchainUnavailable { .. } => error_code::TOOLCHAIN_UNAVAILABLE,
            Self::Storage(e) => e.error_code(),
            Self::Probe(e) => e.error_code(),
            Self::HeartbeatFailed { .. } => error_code::HEARTBEAT_FAILED,
            Self::AuthRejected { .. } => error_code::AUTH_REJECTED,
            Self::NewFindings { .. } => error_code::NEW_FINDINGS,
        }
    }
}
