//! headlessscanner_issues table queries.
//!
//! This table is filled by the proxied-scanner driver, an external
//! collaborator; the archive serves it with its own fingerprint tuple
//! `(scenario_id, url, issuetype)`.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use barrage_core::StorageError;

/// A scanner finding to be archived.
#[derive(Debug, Clone)]
pub struct ScannerIssue {
    pub timestamp: DateTime<Utc>,
    pub test_runner_host: String,
    pub scenario_id: String,
    pub url: String,
    pub severity: String,
    pub issuetype: String,
    pub issuename: String,
    pub issuedetail: String,
    pub confidence: String,
    pub host: String,
    pub port: String,
    pub protocol: String,
    /// Scanner message exchange, opaque and potentially large.
    pub messages: Vec<u8>,
}

/// Insert a scanner issue as a new finding.
pub fn insert_issue(conn: &Connection, issue: &ScannerIssue) -> Result<(), StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO headlessscanner_issues
             (new_issue, timestamp, test_runner_host, scenario_id, url, severity,
              issuetype, issuename, issuedetail, confidence, host, port, protocol, messages)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        )
        .map_err(sqe)?;
    stmt.execute(params![
        issue.timestamp.to_rfc3339(),
        issue.test_runner_host,
        issue.scenario_id,
        issue.url,
        issue.severity,
        issue.issuetype,
        issue.issuename,
        issue.issuedetail,
        issue.confidence,
        issue.host,
        issue.port,
        issue.protocol,
        issue.messages,
    ])
    .map_err(sqe)?;
    Ok(())
}

/// Whether a finding with the same `(scenario_id, url, issuetype)`
/// already exists, regardless of its `new_issue` flag.
pub fn fingerprint_exists(conn: &Connection, issue: &ScannerIssue) -> Result<bool, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT COUNT(*) FROM headlessscanner_issues
             WHERE scenario_id = ?1 AND url = ?2 AND issuetype = ?3",
        )
        .map_err(sqe)?;
    let count: i64 = stmt
        .query_row(
            params![issue.scenario_id, issue.url, issue.issuetype],
            |row| row.get(0),
        )
        .map_err(sqe)?;
    Ok(count > 0)
}

/// Number of scanner rows still flagged as new.
pub fn count_new(conn: &Connection) -> Result<usize, StorageError> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM headlessscanner_issues WHERE new_issue = 1",
            [],
            |row| row.get(0),
        )
        .map_err(sqe)?;
    Ok(count as usize)
}

fn sqe(e: rusqlite::Error) -> StorageError {
    StorageError::SqliteError { message: e.to_string() }
}
