//! Archive behaviour: fingerprint dedup, per-field sensitivity, the
//! baseline-delta counters, and the unbound failure mode.

use barrage_core::Observation;
use barrage_storage::queries::fuzzer;
use barrage_storage::queries::scanner::ScannerIssue;
use barrage_storage::Archive;
use tempfile::TempDir;

fn sample_observation() -> Observation {
    let mut observation = Observation::new("scenario-1", "10.0.0.7");
    observation.url = "http://target.test/endpoint".to_string();
    observation.req_method = "POST".to_string();
    observation.req_headers = br#"{"content-type": "application/json"}"#.to_vec();
    observation.req_body = b"{\"n\": 1}".to_vec();
    observation.resp_statuscode = "500".to_string();
    observation.resp_headers = b"{}".to_vec();
    observation.resp_body = b"internal error".to_vec();
    observation.resp_history = b"[]".to_vec();
    observation
}

// ---- open / close ----

#[test]
fn opens_plain_path_and_url_forms() {
    let dir = TempDir::new().unwrap();

    let plain = dir.path().join("a.db");
    Archive::open(Some(plain.to_str().unwrap())).unwrap().close().unwrap();
    assert!(plain.exists());

    let prefixed = format!("sqlite://{}", dir.path().join("b.db").display());
    Archive::open(Some(&prefixed)).unwrap().close().unwrap();
    assert!(dir.path().join("b.db").exists());

    Archive::open(Some(":memory:")).unwrap().close().unwrap();
}

#[test]
fn unopenable_path_is_an_error() {
    let result = Archive::open(Some("/nonexistent-dir/nope/archive.db"));
    assert!(result.is_err());
}

// ---- unbound mode ----

#[test]
fn unbound_archive_treats_everything_as_new_but_cannot_store() {
    let archive = Archive::open(None).unwrap();
    assert!(!archive.is_bound());

    let observation = sample_observation();
    assert!(!archive.known(&observation).unwrap());
    assert_eq!(archive.new_count().unwrap(), 0);

    let error = archive.add_if_absent(&observation).unwrap_err();
    let message = error.to_string();
    assert!(message.contains("scenario-1"));
    assert!(message.contains("500"));
    assert!(message.contains("POST"));
    assert!(message.contains("http://target.test/endpoint"));
}

// ---- dedup ----

#[test]
fn add_if_absent_inserts_once_for_equal_fingerprints() {
    let archive = Archive::open(Some(":memory:")).unwrap();
    let observation = sample_observation();

    assert!(archive.add_if_absent(&observation).unwrap());
    // Different payload, same fingerprint: suppressed.
    let mut rerun = observation.clone();
    rerun.req_body = b"{\"n\": \"' --\"}".to_vec();
    rerun.resp_body = b"different body text".to_vec();
    assert!(!archive.add_if_absent(&rerun).unwrap());

    assert_eq!(archive.new_count().unwrap(), 1);
}

#[test]
fn triaged_rows_still_suppress_recurrences() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("baseline.db");
    let url = path.to_str().unwrap().to_string();

    let archive = Archive::open(Some(&url)).unwrap();
    let observation = sample_observation();
    archive.add_if_absent(&observation).unwrap();
    archive.close().unwrap();

    // Out-of-band triage clears the flag.
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute("UPDATE httpfuzzer_issues SET new_issue = 0", []).unwrap();
    drop(conn);

    let archive = Archive::open(Some(&url)).unwrap();
    assert_eq!(archive.new_count().unwrap(), 0);
    // The fingerprint is still known, so the recurrence does not
    // reappear as a finding.
    assert!(!archive.add_if_absent(&observation).unwrap());
    assert_eq!(archive.new_count().unwrap(), 0);
}

// ---- per-field sensitivity ----

#[test]
fn changing_any_fingerprint_field_produces_a_new_row() {
    let archive = Archive::open(Some(":memory:")).unwrap();
    let mut observation = sample_observation();
    archive.add_if_absent(&observation).unwrap();
    assert!(archive.known(&observation).unwrap());

    observation.scenario_id = "scenario-2".to_string();
    assert!(!archive.known(&observation).unwrap());
    archive.add_if_absent(&observation).unwrap();

    observation.server_protocol_error = "ConnectionError: reset".to_string();
    assert!(!archive.known(&observation).unwrap());
    archive.add_if_absent(&observation).unwrap();

    observation.resp_statuscode = "502".to_string();
    assert!(!archive.known(&observation).unwrap());
    archive.add_if_absent(&observation).unwrap();

    observation.server_timeout = true;
    assert!(!archive.known(&observation).unwrap());
    archive.add_if_absent(&observation).unwrap();

    observation.server_error_text_detected = true;
    assert!(!archive.known(&observation).unwrap());
    archive.add_if_absent(&observation).unwrap();

    observation.server_error_text_matched = "mysql, warning".to_string();
    assert!(!archive.known(&observation).unwrap());
    archive.add_if_absent(&observation).unwrap();

    observation.req_method = "PUT".to_string();
    assert!(!archive.known(&observation).unwrap());
    archive.add_if_absent(&observation).unwrap();

    // The final shape, re-inserted, is now a duplicate.
    assert!(archive.known(&observation).unwrap());
    assert!(!archive.add_if_absent(&observation).unwrap());
    assert_eq!(archive.new_count().unwrap(), 8);
}

// ---- stored field round trip ----

#[test]
fn stored_rows_carry_every_field_verbatim() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fields.db");
    let url = path.to_str().unwrap().to_string();

    let mut observation = sample_observation();
    observation.req_body = vec![0xff, 0x00, 0xfe, b'!'];
    observation.resp_body = vec![0x80, 0x81];
    observation.server_error_text_matched = "mysql".to_string();
    observation.server_error_text_detected = true;

    let archive = Archive::open(Some(&url)).unwrap();
    archive.add(&observation).unwrap();
    archive.close().unwrap();

    let conn = rusqlite::Connection::open(&path).unwrap();
    let rows = fuzzer::fetch_all(&conn).unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert!(row.new_issue);
    assert_eq!(row.test_runner_host, "10.0.0.7");
    assert_eq!(row.scenario_id, "scenario-1");
    assert_eq!(row.url, "http://target.test/endpoint");
    assert_eq!(row.req_method, "POST");
    assert_eq!(row.req_body, vec![0xff, 0x00, 0xfe, b'!']);
    assert_eq!(row.resp_body, vec![0x80, 0x81]);
    assert_eq!(row.resp_statuscode, "500");
    assert!(row.server_error_text_detected);
    assert_eq!(row.server_error_text_matched, "mysql");
    assert!(!row.timestamp.is_empty());
}

#[test]
fn add_always_inserts_even_when_duplicate() {
    let archive = Archive::open(Some(":memory:")).unwrap();
    let observation = sample_observation();
    archive.add(&observation).unwrap();
    archive.add(&observation).unwrap();
    assert_eq!(archive.new_count().unwrap(), 2);
}

// ---- the scanner-side table ----

fn sample_scanner_issue() -> ScannerIssue {
    ScannerIssue {
        timestamp: chrono::Utc::now(),
        test_runner_host: "10.0.0.7".to_string(),
        scenario_id: "scan-1".to_string(),
        url: "http://target.test/".to_string(),
        severity: "High".to_string(),
        issuetype: "5244416".to_string(),
        issuename: "SQL injection".to_string(),
        issuedetail: "parameter 'n'".to_string(),
        confidence: "Firm".to_string(),
        host: "target.test".to_string(),
        port: "80".to_string(),
        protocol: "http".to_string(),
        messages: b"[]".to_vec(),
    }
}

#[test]
fn scanner_table_uses_its_own_fingerprint() {
    let archive = Archive::open(Some(":memory:")).unwrap();
    let issue = sample_scanner_issue();

    assert!(archive.scanner_add_if_absent(&issue).unwrap());
    assert!(!archive.scanner_add_if_absent(&issue).unwrap());
    assert_eq!(archive.scanner_new_count().unwrap(), 1);

    // Same scenario and URL, different issue type: new finding.
    let mut other = sample_scanner_issue();
    other.issuetype = "2097920".to_string();
    assert!(archive.scanner_add_if_absent(&other).unwrap());
    assert_eq!(archive.scanner_new_count().unwrap(), 2);

    // Severity is not part of the fingerprint.
    let mut same = sample_scanner_issue();
    same.severity = "Low".to_string();
    assert!(archive.scanner_known(&same).unwrap());

    // The two tables count independently.
    assert_eq!(archive.new_count().unwrap(), 0);
}

#[test]
fn unbound_archive_rejects_scanner_findings_too() {
    let archive = Archive::open(None).unwrap();
    let error = archive.scanner_add_if_absent(&sample_scanner_issue()).unwrap_err();
    assert!(error.to_string().contains("scan-1"));
}
