//! Probe observations and finding fingerprints.
//!
//! An observation is the record of one dispatched request: what was
//! sent, what came back, and which failure modes were observed. All
//! payload-bearing fields are opaque bytes — fuzzed requests and broken
//! backends both produce data that must never be assumed to be UTF-8.

use chrono::{DateTime, Utc};

/// The record of one probe. Transport faults are data here, not errors:
/// a timeout sets `server_timeout`, any other protocol-level failure
/// sets `server_protocol_error` and leaves the response fields empty.
#[derive(Debug, Clone)]
pub struct Observation {
    pub scenario_id: String,
    pub url: String,
    pub req_method: String,
    pub req_headers: Vec<u8>,
    pub req_body: Vec<u8>,
    /// Stringified status code, `""` when no response arrived.
    pub resp_statuscode: String,
    pub resp_headers: Vec<u8>,
    pub resp_body: Vec<u8>,
    /// Summary of the followed redirect chain.
    pub resp_history: Vec<u8>,
    /// `"<error-kind>: <detail>"`, `""` when none.
    pub server_protocol_error: String,
    pub server_timeout: bool,
    /// Set by the classifier when a body-error pattern matched.
    pub server_error_text_detected: bool,
    /// Comma-joined list of the patterns that matched, `""` when none.
    pub server_error_text_matched: String,
    pub timestamp: DateTime<Utc>,
    pub test_runner_host: String,
}

impl Observation {
    /// A blank observation for a request about to be dispatched.
    /// Response and failure fields start at their "nothing observed"
    /// defaults and are filled in by the probe and the classifier.
    pub fn new(scenario_id: &str, test_runner_host: &str) -> Observation {
        Observation {
            scenario_id: scenario_id.to_string(),
            url: String::new(),
            req_method: String::new(),
            req_headers: Vec::new(),
            req_body: Vec::new(),
            resp_statuscode: String::new(),
            resp_headers: Vec::new(),
            resp_body: Vec::new(),
            resp_history: Vec::new(),
            server_protocol_error: String::new(),
            server_timeout: false,
            server_error_text_detected: false,
            server_error_text_matched: String::new(),
            timestamp: Utc::now(),
            test_runner_host: test_runner_host.to_string(),
        }
    }

    /// The deduplication identity of this observation (§archive).
    pub fn fingerprint(&self) -> Fingerprint<'_> {
        Fingerprint {
            scenario_id: &self.scenario_id,
            req_method: &self.req_method,
            resp_statuscode: &self.resp_statuscode,
            server_protocol_error: &self.server_protocol_error,
            server_timeout: self.server_timeout,
            server_error_text_detected: self.server_error_text_detected,
            server_error_text_matched: &self.server_error_text_matched,
        }
    }

    /// The fatal diagnostic used when a finding cannot be recorded
    /// because no archive is bound. URL and request body are truncated
    /// to 200 bytes so the message stays printable.
    pub fn unrecorded_diagnostic(&self) -> String {
        format!(
            "Response from server failed a check, and no findings archive is in use. \
             scenario_id = {}, error = {}, timeout = {}, status = {}, url = {}, \
             req_method = {}, submission = {}",
            self.scenario_id,
            self.server_protocol_error,
            self.server_timeout,
            self.resp_statuscode,
            truncate_lossy(self.url.as_bytes(), 200),
            self.req_method,
            truncate_lossy(&self.req_body, 200),
        )
    }
}

/// The tuple of fields the archive compares field-by-field to decide
/// whether two findings are the same issue. Empty strings are compared
/// as-is; there is no null/empty distinction on this side of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint<'a> {
    pub scenario_id: &'a str,
    pub req_method: &'a str,
    pub resp_statuscode: &'a str,
    pub server_protocol_error: &'a str,
    pub server_timeout: bool,
    pub server_error_text_detected: bool,
    pub server_error_text_matched: &'a str,
}

fn truncate_lossy(bytes: &[u8], limit: usize) -> String {
    if bytes.len() > limit + 10 {
        format!("{}... (truncated)", String::from_utf8_lossy(&bytes[..limit]))
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}
