//! Valid-case instrumentation.
//!
//! Between injections, the unmodified submission is sent again. If the
//! endpoint no longer answers it sanely, the remaining run would be
//! meaningless, so anything other than success aborts — with one
//! exception: an auth-shaped status triggers a single credential
//! refresh and retry, because expiring sessions are routine in longer
//! runs. A successful heartbeat is silent.

use std::collections::BTreeSet;

use barrage_core::{EngineError, HttpMethod};
use tracing::debug;

use crate::auth::AuthProvider;
use crate::probe::{Probe, ProbeRequest};

/// Statuses that look like an authentication or authorisation failure
/// rather than a broken endpoint.
pub const AUTH_SHAPED_STATUSES: [u16; 6] = [401, 403, 405, 407, 419, 440];

/// The unmodified submission, pre-encoded by the caller.
#[derive(Debug, Clone, Copy)]
pub struct ValidCase<'a> {
    pub scenario_id: &'a str,
    pub url: &'a str,
    pub method: HttpMethod,
    pub content_type: &'a str,
    pub body: &'a [u8],
    /// Statuses accepted as success. `None` accepts anything that is
    /// not auth-shaped.
    pub acceptable: Option<&'a BTreeSet<u16>>,
}

/// Send the valid case, refreshing credentials once on an auth-shaped
/// status. `last_injection` is quoted in failure diagnostics so the
/// operator can see what preceded the breakage.
pub fn check_valid_case(
    probe: &Probe,
    case: &ValidCase<'_>,
    auth: &mut dyn AuthProvider,
    last_injection: &[u8],
) -> Result<(), EngineError> {
    let mut retried = false;
    loop {
        let credentials = auth.credentials(retried)?;
        let observation = probe.send(&ProbeRequest {
            scenario_id: case.scenario_id,
            url: case.url,
            method: case.method,
            content_type: case.content_type,
            body: case.body,
            auth: &credentials,
            valid_case: true,
        })?;

        if observation.server_timeout {
            return Err(failure(case, last_injection, "request timed out"));
        }
        if !observation.server_protocol_error.is_empty() {
            return Err(failure(
                case,
                last_injection,
                &observation.server_protocol_error,
            ));
        }

        let status: u16 = observation.resp_statuscode.parse().unwrap_or(0);
        if AUTH_SHAPED_STATUSES.contains(&status) {
            if retried {
                return Err(EngineError::AuthRejected {
                    method: case.method.to_string(),
                    url: case.url.to_string(),
                    status: observation.resp_statuscode,
                    last_injection: printable(last_injection),
                });
            }
            debug!(status, "auth-shaped heartbeat status, refreshing credentials");
            retried = true;
            continue;
        }

        if let Some(acceptable) = case.acceptable {
            if !acceptable.contains(&status) {
                return Err(failure(
                    case,
                    last_injection,
                    &format!("response status code {}", observation.resp_statuscode),
                ));
            }
        }
        return Ok(());
    }
}

fn failure(case: &ValidCase<'_>, last_injection: &[u8], detail: &str) -> EngineError {
    EngineError::HeartbeatFailed {
        method: case.method.to_string(),
        url: case.url.to_string(),
        detail: detail.to_string(),
        last_injection: printable(last_injection),
    }
}

fn printable(body: &[u8]) -> String {
    if body.is_empty() {
        return "(none)".to_string();
    }
    let text = String::from_utf8_lossy(body);
    if text.chars().count() > 200 {
        let head: String = text.chars().take(200).collect();
        format!("{head}... (truncated)")
    } else {
        text.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    use barrage_core::RunnerHost;

    use crate::auth::{Auth, StaticAuth};

    fn probe() -> Probe {
        Probe::new(2.0, None, RunnerHost::new("hb.local", "127.0.0.1")).unwrap()
    }

    fn respond_with(server: tiny_http::Server, statuses: Vec<u16>) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            for status in statuses {
                let request = server.recv().unwrap();
                request
                    .respond(tiny_http::Response::empty(tiny_http::StatusCode(status)))
                    .unwrap();
            }
        })
    }

    fn case<'a>(url: &'a str, acceptable: Option<&'a BTreeSet<u16>>) -> ValidCase<'a> {
        ValidCase {
            scenario_id: "hb",
            url,
            method: HttpMethod::Post,
            content_type: "application/json",
            body: b"{\"n\": 1}",
            acceptable,
        }
    }

    #[test]
    fn healthy_endpoint_is_silent() {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let url = format!("http://{}/", server.server_addr().to_ip().unwrap());
        let handle = respond_with(server, vec![200]);

        let mut auth = StaticAuth(Auth::None);
        let accepted: BTreeSet<u16> = [200].into();
        let result = check_valid_case(&probe(), &case(&url, Some(&accepted)), &mut auth, b"");
        handle.join().unwrap();
        assert!(result.is_ok());
    }

    #[test]
    fn single_auth_failure_retries_and_recovers() {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let url = format!("http://{}/", server.server_addr().to_ip().unwrap());
        let handle = respond_with(server, vec![401, 200]);

        let mut auth = StaticAuth(Auth::None);
        let result = check_valid_case(&probe(), &case(&url, None), &mut auth, b"{}");
        handle.join().unwrap();
        assert!(result.is_ok());
    }

    #[test]
    fn two_auth_failures_abort_with_last_injection() {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let url = format!("http://{}/", server.server_addr().to_ip().unwrap());
        let handle = respond_with(server, vec![401, 401]);

        let mut auth = StaticAuth(Auth::None);
        let result = check_valid_case(
            &probe(),
            &case(&url, None),
            &mut auth,
            b"{\"a\": \"' --\"}",
        );
        handle.join().unwrap();
        match result {
            Err(EngineError::AuthRejected {
                status,
                last_injection,
                ..
            }) => {
                assert_eq!(status, "401");
                assert!(last_injection.contains("' --"));
            }
            other => panic!("expected AuthRejected, got {other:?}"),
        }
    }

    #[test]
    fn unacceptable_status_aborts() {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let url = format!("http://{}/", server.server_addr().to_ip().unwrap());
        let handle = respond_with(server, vec![500]);

        let mut auth = StaticAuth(Auth::None);
        let accepted: BTreeSet<u16> = [200].into();
        let result = check_valid_case(&probe(), &case(&url, Some(&accepted)), &mut auth, b"{}");
        handle.join().unwrap();
        assert!(matches!(result, Err(EngineError::HeartbeatFailed { .. })));
    }

    #[test]
    fn unreachable_endpoint_aborts() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = format!("http://127.0.0.1:{port}/");
        let mut auth = StaticAuth(Auth::None);
        let result = check_valid_case(&probe(), &case(&url, None), &mut auth, b"{}");
        assert!(matches!(result, Err(EngineError::HeartbeatFailed { .. })));
    }
}
