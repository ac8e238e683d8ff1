//! Authentication material.
//!
//! Acquisition is pluggable: scenarios supply an `AuthProvider` and the
//! heartbeat asks it for fresh material when the endpoint starts
//! answering with auth-shaped status codes. How the material is
//! obtained (login flows, token services) is the provider's business.

use barrage_core::EngineError;

/// Credential material attached to outgoing requests.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Auth {
    #[default]
    None,
    Basic {
        user: String,
        password: Option<String>,
    },
    Bearer(String),
    /// An arbitrary header, for cookie- or API-key-shaped schemes.
    Header {
        name: String,
        value: String,
    },
}

/// Source of authentication material for one scenario.
pub trait AuthProvider {
    /// Current credentials. With `refresh` set the provider must
    /// discard cached material and acquire new credentials; failures
    /// are fatal to the run.
    fn credentials(&mut self, refresh: bool) -> Result<Auth, EngineError>;
}

/// Fixed credentials that never refresh. The default for scenarios
/// without an authentication flow.
#[derive(Debug, Clone, Default)]
pub struct StaticAuth(pub Auth);

impl AuthProvider for StaticAuth {
    fn credentials(&mut self, _refresh: bool) -> Result<Auth, EngineError> {
        Ok(self.0.clone())
    }
}
