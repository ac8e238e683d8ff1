//! Per-scenario configuration.
//!
//! Deserialised from TOML with unknown keys rejected at startup.
//! Options that name status-code sets use range specs ("200,205-207")
//! and are expanded by the `effective_*` accessors, which also perform
//! the validation that cannot be expressed in serde.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::ranges::unpack_integer_range;
use crate::errors::EngineError;
use crate::types::method::HttpMethod;

/// How a submission is put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// `application/x-www-form-urlencoded` request body (or query
    /// string for GET).
    Form,
    /// Semicolon-separated URL path parameters.
    UrlParams,
    /// JSON request body.
    Json,
}

impl Codec {
    /// The content type sent when the scenario does not override it.
    pub fn default_content_type(&self) -> &'static str {
        match self {
            Codec::Form | Codec::UrlParams => {
                "application/x-www-form-urlencoded; charset=utf-8"
            }
            Codec::Json => "application/json",
        }
    }
}

/// One scenario's worth of configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    pub scenario_id: String,
    pub target_url: String,
    pub codec: Codec,

    /// Method used for the valid-case submission and heartbeats.
    #[serde(default = "default_method")]
    pub method: String,

    /// Overrides the codec's default content type when set.
    pub content_type: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_s: f64,

    pub proxy_url: Option<String>,

    /// Methods injected with, in fan-out order. Empty means all.
    #[serde(default)]
    pub injection_methods: Vec<String>,

    /// Acceptable heartbeat statuses as a range spec. When unset, any
    /// non-auth-shaped status passes.
    pub valid_cases: Option<String>,

    /// Send a valid-case heartbeat after every injection.
    #[serde(default)]
    pub valid_case_instrumentation: bool,

    /// Fuzz cases generated per key (fuzz mode only).
    #[serde(default = "default_cases_per_key")]
    pub cases_per_key: usize,

    /// Range spec of statuses classified as suspicious.
    pub disallowed_status_codes: Option<String>,

    /// Range spec of the only statuses classified as benign.
    pub allowed_status_codes: Option<String>,

    /// Case-insensitive regexes matched against response bodies.
    #[serde(default)]
    pub body_error_patterns: Vec<String>,

    /// Path to the external mutation binary (fuzz mode only).
    pub mutator_path: Option<String>,

    /// Findings archive location. When unset, any finding aborts the
    /// run with a diagnostic instead of being stored.
    pub archive_url: Option<String>,
}

fn default_method() -> String {
    "POST".to_string()
}

fn default_timeout() -> f64 {
    5.0
}

fn default_cases_per_key() -> usize {
    10
}

impl ScenarioConfig {
    /// Parse from TOML text, rejecting unknown keys.
    pub fn from_toml(text: &str) -> Result<ScenarioConfig, EngineError> {
        let config: ScenarioConfig = toml::from_str(text).map_err(|e| EngineError::Config {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validation beyond what serde can express. Run once at startup so
    /// later accessors cannot fail on user input.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.timeout_s <= 0.0 {
            return Err(EngineError::Config {
                message: format!("invalid timeout value {}", self.timeout_s),
            });
        }
        self.effective_method()?;
        self.effective_injection_methods()?;
        self.effective_valid_cases()?;
        self.effective_disallowed_statuses()?;
        self.effective_allowed_statuses()?;
        Ok(())
    }

    pub fn effective_method(&self) -> Result<HttpMethod, EngineError> {
        HttpMethod::parse(&self.method).ok_or_else(|| EngineError::Config {
            message: format!("unknown HTTP method '{}'", self.method),
        })
    }

    pub fn effective_content_type(&self) -> String {
        self.content_type
            .clone()
            .unwrap_or_else(|| self.codec.default_content_type().to_string())
    }

    /// Injection methods in configured order; all seven when the
    /// scenario does not restrict them.
    pub fn effective_injection_methods(&self) -> Result<Vec<HttpMethod>, EngineError> {
        if self.injection_methods.is_empty() {
            return Ok(HttpMethod::ALL.to_vec());
        }
        self.injection_methods
            .iter()
            .map(|name| {
                HttpMethod::parse(name).ok_or_else(|| EngineError::Config {
                    message: format!("unknown HTTP method '{name}' in injection_methods"),
                })
            })
            .collect()
    }

    pub fn effective_valid_cases(&self) -> Result<Option<BTreeSet<u16>>, EngineError> {
        self.valid_cases.as_deref().map(unpack_integer_range).transpose()
    }

    pub fn effective_disallowed_statuses(&self) -> Result<Option<BTreeSet<u16>>, EngineError> {
        self.disallowed_status_codes
            .as_deref()
            .map(unpack_integer_range)
            .transpose()
    }

    pub fn effective_allowed_statuses(&self) -> Result<Option<BTreeSet<u16>>, EngineError> {
        self.allowed_status_codes
            .as_deref()
            .map(unpack_integer_range)
            .transpose()
    }
}
