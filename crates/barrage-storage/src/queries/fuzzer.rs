//! httpfuzzer_issues table queries.

use barrage_core::{Fingerprint, Observation, StorageError};
use rusqlite::{params, Connection};

/// A stored fuzzer finding, as read back from the archive. Textual
/// columns are decoded lossily on purpose; blobs come back verbatim.
#[derive(Debug, Clone)]
pub struct FuzzerIssueRecord {
    pub issue_no: i64,
    pub new_issue: bool,
    pub timestamp: String,
    pub test_runner_host: String,
    pub scenario_id: String,
    pub url: String,
    pub server_protocol_error: String,
    pub server_timeout: bool,
    pub server_error_text_detected: bool,
    pub server_error_text_matched: String,
    pub req_method: String,
    pub req_headers: Vec<u8>,
    pub req_body: Vec<u8>,
    pub resp_statuscode: String,
    pub resp_headers: Vec<u8>,
    pub resp_body: Vec<u8>,
    pub resp_history: Vec<u8>,
}

/// Insert an observation as a new finding (`new_issue = true`).
pub fn insert_issue(conn: &Connection, observation: &Observation) -> Result<(), StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO httpfuzzer_issues
             (new_issue, timestamp, test_runner_host, scenario_id, url,
              server_protocol_error, server_timeout, server_error_text_detected,
              server_error_text_matched, req_method, req_headers, req_body,
              resp_statuscode, resp_headers, resp_body, resp_history)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        )
        .map_err(sqe)?;
    stmt.execute(params![
        observation.timestamp.to_rfc3339(),
        observation.test_runner_host,
        observation.scenario_id,
        observation.url,
        observation.server_protocol_error,
        observation.server_timeout,
        observation.server_error_text_detected,
        observation.server_error_text_matched,
        observation.req_method,
        observation.req_headers,
        observation.req_body,
        observation.resp_statuscode,
        observation.resp_headers,
        observation.resp_body,
        observation.resp_history,
    ])
    .map_err(sqe)?;
    Ok(())
}

/// Whether any row matches the fingerprint, field by field. The
/// `new_issue` flag is deliberately not part of the comparison: a
/// triaged finding suppresses recurrences exactly like an open one.
pub fn fingerprint_exists(
    conn: &Connection,
    fingerprint: &Fingerprint<'_>,
) -> Result<bool, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT COUNT(*) FROM httpfuzzer_issues
             WHERE scenario_id = ?1
               AND req_method = ?2
               AND resp_statuscode = ?3
               AND server_protocol_error = ?4
               AND server_timeout = ?5
               AND server_error_text_detected = ?6
               AND server_error_text_matched = ?7",
        )
        .map_err(sqe)?;
    let count: i64 = stmt
        .query_row(
            params![
                fingerprint.scenario_id,
                fingerprint.req_method,
                fingerprint.resp_statuscode,
                fingerprint.server_protocol_error,
                fingerprint.server_timeout,
                fingerprint.server_error_text_detected,
                fingerprint.server_error_text_matched,
            ],
            |row| row.get(0),
        )
        .map_err(sqe)?;
    Ok(count > 0)
}

/// Number of rows still flagged as new.
pub fn count_new(conn: &Connection) -> Result<usize, StorageError> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM httpfuzzer_issues WHERE new_issue = 1",
            [],
            |row| row.get(0),
        )
        .map_err(sqe)?;
    Ok(count as usize)
}

/// Every stored finding, oldest first.
pub fn fetch_all(conn: &Connection) -> Result<Vec<FuzzerIssueRecord>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT issue_no, new_issue, timestamp, test_runner_host, scenario_id, url,
                    server_protocol_error, server_timeout, server_error_text_detected,
                    server_error_text_matched, req_method, req_headers, req_body,
                    resp_statuscode, resp_headers, resp_body, resp_history
             FROM httpfuzzer_issues ORDER BY issue_no",
        )
        .map_err(sqe)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(FuzzerIssueRecord {
                issue_no: row.get(0)?,
                new_issue: row.get(1)?,
                timestamp: row.get(2)?,
                test_runner_host: row.get(3)?,
                scenario_id: row.get(4)?,
                url: row.get(5)?,
                server_protocol_error: row.get(6)?,
                server_timeout: row.get(7)?,
                server_error_text_detected: row.get(8)?,
                server_error_text_matched: row.get(9)?,
                req_method: row.get(10)?,
                req_headers: row.get(11)?,
                req_body: row.get(12)?,
                resp_statuscode: row.get(13)?,
                resp_headers: row.get(14)?,
                resp_body: row.get(15)?,
                resp_history: row.get(16)?,
            })
        })
        .map_err(sqe)?;

    let mut result = Vec::new();
    for row in rows {
        result.push(row.map_err(sqe)?);
    }
    Ok(result)
}

fn sqe(e: rusqlite::Error) -> StorageError {
    StorageError::SqliteError { message: e.to_string() }
}
