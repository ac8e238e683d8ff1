//! Response classification.
//!
//! User-supplied rules, OR-combined, decide whether an observation is
//! suspicious: a reified protocol error, a timeout, a status in the
//! disallowed set (or outside the allowed set), or a body-error regex
//! match. Benign observations are dropped by the caller; nothing here
//! ever errors a run.

use std::collections::BTreeSet;

use barrage_core::{EngineError, Observation};
use regex::bytes::Regex;

/// Body substrings that usually mean the backend broke, for scenarios
/// that do not bring their own list.
pub const DEFAULT_BODY_ERRORS: [&str; 18] = [
    "string",
    "server error",
    "invalid response",
    "bad gateway",
    "internal ASP error",
    "service unavailable",
    "exceeded",
    "premature",
    "fatal error",
    "proxy error",
    "database error",
    "backend error",
    "mysql",
    "root:",
    "parse error",
    "exhausted",
    "warning",
    "denied",
];

/// Compiled classification rules for one scenario.
pub struct Classifier {
    allowed: Option<BTreeSet<u16>>,
    disallowed: Option<BTreeSet<u16>>,
    body_errors: Vec<(String, Regex)>,
}

impl Classifier {
    /// Compile the rule set. Body patterns are matched against raw
    /// response bytes, case-insensitively — responses from broken
    /// backends are not reliably text.
    pub fn new(
        allowed: Option<BTreeSet<u16>>,
        disallowed: Option<BTreeSet<u16>>,
        body_patterns: &[String],
    ) -> Result<Classifier, EngineError> {
        let mut body_errors = Vec::with_capacity(body_patterns.len());
        for pattern in body_patterns {
            let regex =
                Regex::new(&format!("(?i){pattern}")).map_err(|e| EngineError::Config {
                    message: format!("invalid body error pattern '{pattern}': {e}"),
                })?;
            body_errors.push((pattern.clone(), regex));
        }
        Ok(Classifier {
            allowed,
            disallowed,
            body_errors,
        })
    }

    /// The default body-error list as an owned pattern set.
    pub fn default_body_patterns() -> Vec<String> {
        DEFAULT_BODY_ERRORS.iter().map(|p| p.to_string()).collect()
    }

    /// Decide whether the observation is suspicious. On a body-error
    /// match, `server_error_text_detected` is set and the matching
    /// patterns are recorded comma-joined, in rule order.
    pub fn classify(&self, observation: &mut Observation) -> bool {
        if !observation.server_protocol_error.is_empty() {
            return true;
        }
        if observation.server_timeout {
            return true;
        }

        let status: u16 = observation.resp_statuscode.parse().unwrap_or(0);
        if let Some(disallowed) = &self.disallowed {
            if disallowed.contains(&status) {
                return true;
            }
        }
        if let Some(allowed) = &self.allowed {
            if !allowed.contains(&status) {
                return true;
            }
        }

        let matched: Vec<&str> = self
            .body_errors
            .iter()
            .filter(|(_, regex)| regex.is_match(&observation.resp_body))
            .map(|(pattern, _)| pattern.as_str())
            .collect();
        if !matched.is_empty() {
            observation.server_error_text_detected = true;
            observation.server_error_text_matched = matched.join(", ");
            return true;
        }

        false
    }
}
