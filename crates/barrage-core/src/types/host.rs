//! Identity of the machine running the tests.
//!
//! Captured once at pipeline construction and carried on every
//! observation — never a process-global, so tests can vary it freely.
//! The identity feeds the `X-Abuse` request header (so an operator on
//! the receiving end can tell where the hostile traffic comes from)
//! and the `test_runner_host` archive column.

use std::net::UdpSocket;

/// Hostname, FQDN, and outbound IP of the test runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerHost {
    pub fqdn: String,
    pub ip: String,
}

impl RunnerHost {
    pub fn new(fqdn: &str, ip: &str) -> RunnerHost {
        RunnerHost {
            fqdn: fqdn.to_string(),
            ip: ip.to_string(),
        }
    }

    /// Best-effort detection from the local system. Falls back to
    /// `localhost` / `127.0.0.1` when nothing better is available;
    /// detection must never fail a run.
    pub fn detect() -> RunnerHost {
        let fqdn = local_hostname().unwrap_or_else(|| "localhost".to_string());
        let ip = outbound_ip().unwrap_or_else(|| "127.0.0.1".to_string());
        RunnerHost { fqdn, ip }
    }

    /// Value of the `X-Abuse` header sent with every request.
    pub fn abuse_header(&self) -> String {
        format!(
            "This is an automatically generated robustness test request from {} [{}]",
            self.fqdn, self.ip
        )
    }

    /// Value stored in the archive's `test_runner_host` column.
    pub fn archive_field(&self) -> &str {
        &self.ip
    }
}

fn local_hostname() -> Option<String> {
    if let Ok(name) = std::env::var("HOSTNAME") {
        if !name.is_empty() {
            return Some(name);
        }
    }
    let raw = std::fs::read_to_string("/proc/sys/kernel/hostname").ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// The IP the default route would use. Connecting a UDP socket performs
/// no I/O; it only asks the kernel for a source address.
fn outbound_ip() -> Option<String> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("192.0.2.1:53").ok()?;
    Some(socket.local_addr().ok()?.ip().to_string())
}
