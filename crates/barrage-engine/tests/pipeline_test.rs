//! End-to-end scenario runs against local fault servers.

use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use barrage_core::{Codec, EngineError, RunnerHost, ScenarioConfig, Value};
use barrage_engine::{Classifier, Pipeline};
use barrage_http::{Auth, Probe, ProbeRequest, StaticAuth};
use barrage_storage::queries::fuzzer;
use barrage_storage::Archive;
use tempfile::TempDir;

fn config(url: &str) -> ScenarioConfig {
    ScenarioConfig {
        scenario_id: "e2e".to_string(),
        target_url: url.to_string(),
        codec: Codec::Json,
        method: "POST".to_string(),
        content_type: None,
        timeout_s: 2.0,
        proxy_url: None,
        injection_methods: vec!["POST".to_string()],
        valid_cases: None,
        valid_case_instrumentation: false,
        cases_per_key: 2,
        disallowed_status_codes: None,
        allowed_status_codes: None,
        body_error_patterns: Vec::new(),
        mutator_path: None,
        archive_url: None,
    }
}

fn host() -> RunnerHost {
    RunnerHost::new("e2e.local", "127.0.0.1")
}

fn pipeline(config: ScenarioConfig, archive_url: Option<&str>) -> Pipeline {
    let archive = Archive::open(archive_url).unwrap();
    Pipeline::new(config, archive, Box::new(StaticAuth(Auth::None)), host()).unwrap()
}

/// Serve every incoming request with the status picked by `status_for`,
/// forever. The thread is detached; it dies with the test process.
fn serve_statuses(server: tiny_http::Server, status_for: impl Fn(usize) -> u16 + Send + 'static) {
    thread::spawn(move || {
        let mut index = 0;
        while let Ok(request) = server.recv() {
            let status = status_for(index);
            index += 1;
            let _ = request.respond(tiny_http::Response::empty(tiny_http::StatusCode(status)));
        }
    });
}

/// A Radamsa-shaped stand-in: each output is a case marker plus the
/// concatenated input samples.
fn fake_mutator(dir: &Path) -> PathBuf {
    let path = dir.join("fake-radamsa");
    let script = r#"#!/bin/sh
if [ "$1" = "--help" ]; then exit 0; fi
pattern="$2"; count="$4"; indir="$6"
i=1
while [ "$i" -le "$count" ]; do
    out=$(printf '%s' "$pattern" | sed "s/%n/$i/")
    { printf 'FUZZ-%s-' "$i"; cat "$indir"/*.case; } > "$out"
    i=$((i + 1))
done
"#;
    fs::write(&path, script).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

fn template_n1() -> Rc<Value> {
    Rc::new(Value::map([("n", Value::Int(1))]))
}

// ---- baseline-delta behaviour over a broken backend ----

#[test]
fn always_500_backend_yields_one_row_and_rerun_dedups() {
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let url = format!("http://{}/", server.server_addr().to_ip().unwrap());
    serve_statuses(server, |_| 500);

    let dir = TempDir::new().unwrap();
    let archive_path = dir.path().join("findings.db");
    let archive_url = archive_path.to_str().unwrap().to_string();

    let mut cfg = config(&url);
    cfg.disallowed_status_codes = Some("500".to_string());

    // First run: the whole catalogue provokes the same 500 over and
    // over; exactly one fingerprint lands in the archive.
    let mut run = pipeline(cfg.clone(), Some(&archive_url));
    run.run_static(&[template_n1()]).unwrap();
    assert_eq!(run.new_findings(), 1);
    match run.finish() {
        Err(EngineError::NewFindings {
            new_this_run,
            unresolved_in_archive,
        }) => {
            assert_eq!(new_this_run, 1);
            assert_eq!(unresolved_in_archive, 1);
        }
        other => panic!("expected NewFindings, got {other:?}"),
    }

    // Rerun against the same archive: everything is a known
    // fingerprint now, so nothing new is stored, but the unresolved
    // row still fails the gate.
    let mut rerun = pipeline(cfg, Some(&archive_url));
    rerun.run_static(&[template_n1()]).unwrap();
    assert_eq!(rerun.new_findings(), 0);
    match rerun.finish() {
        Err(EngineError::NewFindings {
            new_this_run,
            unresolved_in_archive,
        }) => {
            assert_eq!(new_this_run, 0);
            assert_eq!(unresolved_in_archive, 1);
        }
        other => panic!("expected NewFindings, got {other:?}"),
    }

    let conn = rusqlite::Connection::open(&archive_path).unwrap();
    let rows = fuzzer::fetch_all(&conn).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].resp_statuscode, "500");
    assert!(rows[0].new_issue);
}

// ---- fuzz mode over a healthy backend ----

#[test]
fn fuzz_mode_clean_backend_passes_the_gate() {
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let url = format!("http://{}/", server.server_addr().to_ip().unwrap());
    serve_statuses(server, |_| 200);

    let dir = TempDir::new().unwrap();
    let mut cfg = config(&url);
    cfg.codec = Codec::Form;
    cfg.mutator_path = Some(fake_mutator(dir.path()).display().to_string());

    let template = Rc::new(Value::map([("a", Value::text("abc"))]));
    let mut run = pipeline(cfg, Some(":memory:"));
    run.run_fuzz(&[template]).unwrap();
    assert_eq!(run.new_findings(), 0);
    run.finish().unwrap();
}

#[test]
fn fuzz_mode_without_mutator_path_is_a_config_error() {
    let mut cfg = config("http://127.0.0.1:9/");
    cfg.archive_url = None;
    let mut run = pipeline(cfg, None);
    let err = run.run_fuzz(&[template_n1()]).unwrap_err();
    assert!(matches!(err, EngineError::Config { .. }));
}

// ---- dispatch ordering ----

#[test]
fn methods_fan_out_in_configured_order() {
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let url = format!("http://{}/", server.server_addr().to_ip().unwrap());

    let (sender, receiver) = std::sync::mpsc::channel::<(String, bool)>();
    thread::spawn(move || {
        while let Ok(request) = server.recv() {
            let valid_case = request
                .headers()
                .iter()
                .any(|h| h.field.equiv("x-valid-case-instrumentation"));
            let _ = sender.send((request.method().to_string().to_uppercase(), valid_case));
            let _ = request.respond(tiny_http::Response::empty(tiny_http::StatusCode(200)));
        }
    });

    let dir = TempDir::new().unwrap();
    let mut cfg = config(&url);
    cfg.codec = Codec::Json;
    cfg.cases_per_key = 1;
    cfg.injection_methods = vec!["POST".to_string(), "GET".to_string()];
    cfg.mutator_path = Some(fake_mutator(dir.path()).display().to_string());

    let mut run = pipeline(cfg, Some(":memory:"));
    run.run_fuzz(&[template_n1()]).unwrap();
    run.finish().unwrap();

    let mut seen = Vec::new();
    while let Ok(entry) = receiver.recv_timeout(Duration::from_millis(500)) {
        seen.push(entry);
    }
    // Initial valid case, then per derivative (key rename, then leaf
    // replacement) POST before GET.
    assert_eq!(
        seen,
        vec![
            ("POST".to_string(), true),
            ("POST".to_string(), false),
            ("GET".to_string(), false),
            ("POST".to_string(), false),
            ("GET".to_string(), false),
        ]
    );
}

// ---- heartbeat integration ----

#[test]
fn repeated_auth_failures_abort_the_run_with_context() {
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let url = format!("http://{}/", server.server_addr().to_ip().unwrap());
    // First request is the initial valid case; everything after is an
    // auth-shaped rejection.
    serve_statuses(server, |index| if index == 0 { 200 } else { 401 });

    let mut cfg = config(&url);
    cfg.valid_case_instrumentation = true;

    let mut run = pipeline(cfg, Some(":memory:"));
    let err = run.run_static(&[template_n1()]).unwrap_err();
    match err {
        EngineError::AuthRejected {
            status,
            last_injection,
            ..
        } => {
            assert_eq!(status, "401");
            // The first catalogue entry was the most recent injection.
            assert!(
                last_injection.contains("A harmless string"),
                "last injection was: {last_injection}"
            );
        }
        other => panic!("expected AuthRejected, got {other:?}"),
    }
}

// ---- fault reification through classify and archive ----

fn classify_and_archive(
    observation: &mut barrage_core::Observation,
    classifier: &Classifier,
    archive_path: &Path,
) {
    assert!(classifier.classify(observation));
    let archive = Archive::open(Some(archive_path.to_str().unwrap())).unwrap();
    assert!(archive.add_if_absent(observation).unwrap());
    archive.close().unwrap();
}

#[test]
fn mid_response_close_is_archived_as_protocol_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buffer = [0u8; 4096];
            let _ = stream.read(&mut buffer);
            let _ = stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 500000\r\n\r\nonly this much");
        }
    });

    let probe = Probe::new(2.0, None, host()).unwrap();
    let url = format!("http://127.0.0.1:{port}/");
    let mut observation = probe
        .send(&ProbeRequest {
            scenario_id: "e2e",
            url: &url,
            method: barrage_core::HttpMethod::Post,
            content_type: "application/json",
            body: b"{\"n\": 1}",
            auth: &Auth::None,
            valid_case: false,
        })
        .unwrap();

    let dir = TempDir::new().unwrap();
    let archive_path = dir.path().join("findings.db");
    let classifier = Classifier::new(None, None, &[]).unwrap();
    classify_and_archive(&mut observation, &classifier, &archive_path);

    let conn = rusqlite::Connection::open(&archive_path).unwrap();
    let rows = fuzzer::fetch_all(&conn).unwrap();
    assert_eq!(rows.len(), 1);
    assert!(!rows[0].server_protocol_error.is_empty());
    assert!(!rows[0].server_timeout);
}

#[test]
fn over_timeout_hang_is_archived_as_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        if let Ok((stream, _)) = listener.accept() {
            thread::sleep(Duration::from_millis(2000));
            drop(stream);
        }
    });

    let probe = Probe::new(0.5, None, host()).unwrap();
    let url = format!("http://127.0.0.1:{port}/");
    let mut observation = probe
        .send(&ProbeRequest {
            scenario_id: "e2e",
            url: &url,
            method: barrage_core::HttpMethod::Post,
            content_type: "application/json",
            body: b"{\"n\": 1}",
            auth: &Auth::None,
            valid_case: false,
        })
        .unwrap();

    let dir = TempDir::new().unwrap();
    let archive_path = dir.path().join("findings.db");
    let classifier = Classifier::new(None, None, &[]).unwrap();
    classify_and_archive(&mut observation, &classifier, &archive_path);

    let conn = rusqlite::Connection::open(&archive_path).unwrap();
    let rows = fuzzer::fetch_all(&conn).unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].server_timeout);
    assert_eq!(rows[0].server_protocol_error, "");
}

#[test]
fn body_error_match_is_archived_with_the_pattern_list() {
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let url = format!("http://{}/", server.server_addr().to_ip().unwrap());
    thread::spawn(move || {
        if let Ok(request) = server.recv() {
            let _ = request.respond(tiny_http::Response::from_string(
                "<html>MySQL warning: something broke</html>",
            ));
        }
    });

    let probe = Probe::new(2.0, None, host()).unwrap();
    let mut observation = probe
        .send(&ProbeRequest {
            scenario_id: "e2e",
            url: &url,
            method: barrage_core::HttpMethod::Post,
            content_type: "application/json",
            body: b"{\"n\": 1}",
            auth: &Auth::None,
            valid_case: false,
        })
        .unwrap();

    let dir = TempDir::new().unwrap();
    let archive_path = dir.path().join("findings.db");
    let classifier = Classifier::new(
        None,
        None,
        &["mysql".to_string(), "warning".to_string()],
    )
    .unwrap();
    classify_and_archive(&mut observation, &classifier, &archive_path);

    let conn = rusqlite::Connection::open(&archive_path).unwrap();
    let rows = fuzzer::fetch_all(&conn).unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].server_error_text_detected);
    assert_eq!(rows[0].server_error_text_matched, "mysql, warning");
}
