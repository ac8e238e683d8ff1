//! The HTTP probe.
//!
//! Builds and dispatches one request per injected submission and
//! reifies whatever happens into an `Observation`. Network conditions
//! are the data this tool exists to collect, so the probe never fails
//! on them: a timeout sets the timeout flag, everything else
//! transport-shaped becomes `server_protocol_error`. The only `Err`
//! this module produces is a malformed base URL, which is a scenario
//! bug, not a measurement.
//!
//! TLS validation is disabled on purpose — the targets are test
//! environments, often with intentionally broken certificates, and the
//! probe must see through them.

use std::time::Duration;

use barrage_core::{HttpMethod, Observation, ProbeError, RunnerHost};
use chrono::Utc;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use tracing::debug;
use url::Url;

use crate::auth::Auth;

/// Redirect hops followed before the chain is reified as a
/// `TooManyRedirects` protocol error.
const MAX_REDIRECTS: usize = 10;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; Barrage HTTP Fuzzer-Injector)";

/// One request about to be dispatched.
#[derive(Debug, Clone, Copy)]
pub struct ProbeRequest<'a> {
    pub scenario_id: &'a str,
    pub url: &'a str,
    pub method: HttpMethod,
    pub content_type: &'a str,
    /// Encoded submission. For GET this is appended directly to the
    /// URL — the caller pre-formats any `?` or `;` prefix.
    pub body: &'a [u8],
    pub auth: &'a Auth,
    /// Marks a heartbeat; adds the instrumentation header.
    pub valid_case: bool,
}

/// A configured probe: one blocking client, redirects handled by hand
/// so the chain can be recorded.
pub struct Probe {
    client: Client,
    timeout: Duration,
    host: RunnerHost,
}

impl Probe {
    pub fn new(
        timeout_s: f64,
        proxy_url: Option<&str>,
        host: RunnerHost,
    ) -> Result<Probe, ProbeError> {
        let mut builder = Client::builder()
            .danger_accept_invalid_certs(true)
            .redirect(Policy::none());
        if let Some(proxy) = proxy_url {
            let proxy = reqwest::Proxy::all(proxy).map_err(|e| ProbeError::InvalidUrl {
                url: proxy.to_string(),
                message: e.to_string(),
            })?;
            builder = builder.proxy(proxy);
        }
        let client = builder.build().map_err(|e| ProbeError::InvalidUrl {
            url: String::new(),
            message: e.to_string(),
        })?;
        Ok(Probe {
            client,
            timeout: Duration::from_secs_f64(timeout_s),
            host,
        })
    }

    pub fn runner_host(&self) -> &RunnerHost {
        &self.host
    }

    /// Dispatch one request. `Err` only for a malformed base URL.
    pub fn send(&self, request: &ProbeRequest<'_>) -> Result<Observation, ProbeError> {
        // The base URL must be well-formed before any payload touches
        // it; failing here is programmer error.
        Url::parse(request.url).map_err(|e| ProbeError::InvalidUrl {
            url: request.url.to_string(),
            message: e.to_string(),
        })?;

        let headers = self.build_headers(request);

        let mut observation = Observation::new(request.scenario_id, self.host.archive_field());
        observation.req_method = request.method.as_str().to_string();
        observation.req_headers = header_json(&headers);
        observation.req_body = request.body.to_vec();
        observation.timestamp = Utc::now();

        // For GET the payload rides in the URL; the composed URL can be
        // arbitrarily broken once fuzzed bytes land in it, and that is
        // an observation, not an error.
        let target = if request.method == HttpMethod::Get {
            let mut composed = request.url.to_string();
            composed.push_str(&String::from_utf8_lossy(request.body));
            composed
        } else {
            request.url.to_string()
        };
        observation.url = target.clone();

        debug!(
            scenario = request.scenario_id,
            method = %request.method,
            valid_case = request.valid_case,
            "dispatching probe"
        );
        self.dispatch(request, headers, target, &mut observation);
        Ok(observation)
    }

    fn build_headers(&self, request: &ProbeRequest<'_>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        insert_header(&mut headers, "content-type", request.content_type);
        insert_header(&mut headers, "cache-control", "no-cache");
        insert_header(&mut headers, "user-agent", USER_AGENT);
        insert_header(&mut headers, "x-abuse", &self.host.abuse_header());
        insert_header(&mut headers, "connection", "close");
        if request.valid_case {
            insert_header(
                &mut headers,
                "x-valid-case-instrumentation",
                "This is a valid request that should succeed",
            );
        }
        headers
    }

    /// Follow the request through redirects, filling the observation.
    fn dispatch(
        &self,
        request: &ProbeRequest<'_>,
        headers: HeaderMap,
        mut target: String,
        observation: &mut Observation,
    ) {
        let mut method = request.method;
        let mut body: Option<Vec<u8>> = match method {
            HttpMethod::Get => None,
            _ => Some(request.body.to_vec()),
        };
        let mut history: Vec<String> = Vec::new();

        for _hop in 0..=MAX_REDIRECTS {
            let mut builder = self
                .client
                .request(to_reqwest_method(method), &target)
                .headers(headers.clone())
                .timeout(self.timeout);
            builder = match request.auth {
                Auth::None => builder,
                Auth::Basic { user, password } => builder.basic_auth(user, password.as_ref()),
                Auth::Bearer(token) => builder.bearer_auth(token),
                Auth::Header { name, value } => builder.header(name.as_str(), value.as_str()),
            };
            if let Some(bytes) = &body {
                builder = builder.body(bytes.clone());
            }

            let response = match builder.send() {
                Ok(response) => response,
                Err(error) => {
                    if error.is_timeout() {
                        observation.server_timeout = true;
                    } else {
                        observation.server_protocol_error =
                            format!("{}: {}", error_kind(&error), error);
                    }
                    return;
                }
            };

            let status = response.status();
            if status.is_redirection() {
                if let Some(location) = response
                    .headers()
                    .get("location")
                    .and_then(|v| v.to_str().ok())
                {
                    if history.len() == MAX_REDIRECTS {
                        observation.server_protocol_error = format!(
                            "TooManyRedirects: exceeded {MAX_REDIRECTS} redirects at {target}"
                        );
                        return;
                    }
                    history.push(format!("<Response [{}] {}>", status.as_u16(), target));
                    target = match Url::parse(&target)
                        .ok()
                        .and_then(|base| base.join(location).ok())
                    {
                        Some(next) => next.to_string(),
                        None => {
                            observation.server_protocol_error =
                                format!("InvalidRedirect: cannot resolve '{location}'");
                            return;
                        }
                    };
                    // Like mainstream HTTP clients, a redirect off a
                    // mutating method re-issues as a bodiless GET,
                    // while 307/308 preserve method and body.
                    if matches!(status.as_u16(), 301 | 302 | 303)
                        && !matches!(method, HttpMethod::Get | HttpMethod::Head)
                    {
                        method = HttpMethod::Get;
                        body = None;
                    }
                    continue;
                }
            }

            observation.resp_statuscode = status.as_u16().to_string();
            observation.resp_headers = header_json(response.headers());
            observation.resp_history = format!("[{}]", history.join(", ")).into_bytes();
            match response.bytes() {
                Ok(bytes) => observation.resp_body = bytes.to_vec(),
                Err(error) => {
                    // Body transfer failed mid-stream; keep the status
                    // and record the failure.
                    if error.is_timeout() {
                        observation.server_timeout = true;
                    } else {
                        observation.server_protocol_error =
                            format!("{}: {}", error_kind(&error), error);
                    }
                }
            }
            return;
        }
    }
}

fn insert_header(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(HeaderName::from_static(name), value);
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
        HttpMethod::Options => reqwest::Method::OPTIONS,
        HttpMethod::Head => reqwest::Method::HEAD,
        HttpMethod::Patch => reqwest::Method::PATCH,
    }
}

/// Stable kind names for protocol errors; part of the finding
/// fingerprint, so renaming one invalidates archives.
fn error_kind(error: &reqwest::Error) -> &'static str {
    if error.is_connect() {
        "ConnectionError"
    } else if error.is_redirect() {
        "RedirectError"
    } else if error.is_body() || error.is_decode() {
        "ProtocolError"
    } else if error.is_builder() {
        "RequestError"
    } else {
        "RequestException"
    }
}

/// Render a header map as a JSON object, the shape archived alongside
/// payload bytes.
fn header_json(headers: &HeaderMap) -> Vec<u8> {
    let mut map = serde_json::Map::new();
    for (name, value) in headers {
        map.insert(
            name.as_str().to_string(),
            serde_json::Value::String(String::from_utf8_lossy(value.as_bytes()).into_owned()),
        );
    }
    serde_json::Value::Object(map).to_string().into_bytes()
}
