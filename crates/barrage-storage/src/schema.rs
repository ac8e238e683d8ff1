//! Archive schema.
//!
//! Two issue tables share the store: the HTTP fuzzer's own table and
//! the headless-scanner table consumed by the proxied scanner driver.
//! Creation is idempotent and runs at every open.
//!
//! Payload-bearing columns are BLOBs: both the fuzzed requests and the
//! responses of broken backends routinely contain bytes that are not
//! valid in any text encoding.

use rusqlite::Connection;

use barrage_core::StorageError;

const HTTPFUZZER_ISSUES: &str = "
CREATE TABLE IF NOT EXISTS httpfuzzer_issues (
    issue_no                    INTEGER PRIMARY KEY AUTOINCREMENT,
    new_issue                   INTEGER NOT NULL DEFAULT 1,
    timestamp                   TEXT NOT NULL,
    test_runner_host            TEXT NOT NULL,
    scenario_id                 TEXT NOT NULL,
    url                         TEXT NOT NULL,
    server_protocol_error       TEXT NOT NULL DEFAULT '',
    server_timeout              INTEGER NOT NULL DEFAULT 0,
    server_error_text_detected  INTEGER NOT NULL DEFAULT 0,
    server_error_text_matched   TEXT NOT NULL DEFAULT '',
    req_method                  TEXT NOT NULL DEFAULT '',
    req_headers                 BLOB,
    req_body                    BLOB,
    resp_statuscode             TEXT NOT NULL DEFAULT '',
    resp_headers                BLOB,
    resp_body                   BLOB,
    resp_history                BLOB
)";

const HEADLESSSCANNER_ISSUES: &str = "
CREATE TABLE IF NOT EXISTS headlessscanner_issues (
    issue_no          INTEGER PRIMARY KEY AUTOINCREMENT,
    new_issue         INTEGER NOT NULL DEFAULT 1,
    timestamp         TEXT NOT NULL,
    test_runner_host  TEXT NOT NULL,
    scenario_id       TEXT NOT NULL,
    url               TEXT NOT NULL,
    severity          TEXT NOT NULL DEFAULT '',
    issuetype         TEXT NOT NULL DEFAULT '',
    issuename         TEXT NOT NULL DEFAULT '',
    issuedetail       TEXT NOT NULL DEFAULT '',
    confidence        TEXT NOT NULL DEFAULT '',
    host              TEXT NOT NULL DEFAULT '',
    port              TEXT NOT NULL DEFAULT '',
    protocol          TEXT NOT NULL DEFAULT '',
    messages          BLOB
)";

/// Create both issue tables if absent. No effect otherwise.
pub fn create_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute(HTTPFUZZER_ISSUES, [])
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
    conn.execute(HEADLESSSCANNER_ISSUES, [])
        .map_err(|e| StorageError::SqliteError { message: e.to_string() })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creation_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();
        create_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('httpfuzzer_issues', 'headlessscanner_issues')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
    }
}
