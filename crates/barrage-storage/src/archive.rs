//! The findings archive.
//!
//! One SQLite connection per archive, one archive per pipeline —
//! connections are never shared. An archive can also be *unbound* (no
//! URL configured): lookups then report every finding as new, and any
//! attempt to store one fails fatally with a diagnostic, because a
//! finding must never be silently lost.

use rusqlite::Connection;
use tracing::{debug, warn};

use barrage_core::{Observation, StorageError};

use crate::queries::scanner::{self, ScannerIssue};
use crate::queries::fuzzer;
use crate::schema::create_schema;

/// Handle to the findings store.
pub struct Archive {
    conn: Option<Connection>,
}

impl Archive {
    /// Open the archive at `url` and create the schema if absent.
    /// Accepted forms: a filesystem path, `sqlite://<path>`, or
    /// `:memory:`. `None` yields an unbound archive.
    pub fn open(url: Option<&str>) -> Result<Archive, StorageError> {
        let Some(url) = url else {
            debug!("no archive URL configured; findings cannot be stored");
            return Ok(Archive { conn: None });
        };

        let path = url.strip_prefix("sqlite://").unwrap_or(url);
        let conn = if path == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(path)
        }
        .map_err(|e| StorageError::OpenFailed {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        create_schema(&conn)?;
        Ok(Archive { conn: Some(conn) })
    }

    /// Whether a store is actually attached.
    pub fn is_bound(&self) -> bool {
        self.conn.is_some()
    }

    /// Whether an equivalent finding is already archived. Unbound
    /// archives know nothing, so everything is new.
    pub fn known(&self, observation: &Observation) -> Result<bool, StorageError> {
        match &self.conn {
            None => Ok(false),
            Some(conn) => fuzzer::fingerprint_exists(conn, &observation.fingerprint()),
        }
    }

    /// Store a finding unconditionally, flagged as new.
    pub fn add(&self, observation: &Observation) -> Result<(), StorageError> {
        match &self.conn {
            None => Err(StorageError::FindingUnrecorded {
                diagnostic: observation.unrecorded_diagnostic(),
            }),
            Some(conn) => fuzzer::insert_issue(conn, observation),
        }
    }

    /// Store a finding unless its fingerprint is already present.
    /// Returns whether a row was inserted.
    ///
    /// There is no lock across the lookup and the insert; a concurrent
    /// duplicate is possible and acceptable, because `known` collapses
    /// it on the next cycle.
    pub fn add_if_absent(&self, observation: &Observation) -> Result<bool, StorageError> {
        if self.known(observation)? {
            debug!(
                scenario = observation.scenario_id,
                status = observation.resp_statuscode,
                "fingerprint already archived, suppressing"
            );
            return Ok(false);
        }
        self.add(observation)?;
        Ok(true)
    }

    /// Count of findings still flagged `new_issue`. The flag is only
    /// ever cleared by out-of-band triage tooling, never here.
    pub fn new_count(&self) -> Result<usize, StorageError> {
        match &self.conn {
            None => Ok(0),
            Some(conn) => fuzzer::count_new(conn),
        }
    }

    /// Scanner-table counterpart of `known`.
    pub fn scanner_known(&self, issue: &ScannerIssue) -> Result<bool, StorageError> {
        match &self.conn {
            None => Ok(false),
            Some(conn) => scanner::fingerprint_exists(conn, issue),
        }
    }

    /// Scanner-table counterpart of `add_if_absent`.
    pub fn scanner_add_if_absent(&self, issue: &ScannerIssue) -> Result<bool, StorageError> {
        match &self.conn {
            None => Err(StorageError::FindingUnrecorded {
                diagnostic: format!(
                    "Scanner issue found, and no findings archive is in use. \
                     scenario_id = {}, url = {}, issuetype = {}",
                    issue.scenario_id, issue.url, issue.issuetype
                ),
            }),
            Some(conn) => {
                if scanner::fingerprint_exists(conn, issue)? {
                    return Ok(false);
                }
                scanner::insert_issue(conn, issue)?;
                Ok(true)
            }
        }
    }

    /// Scanner-table counterpart of `new_count`.
    pub fn scanner_new_count(&self) -> Result<usize, StorageError> {
        match &self.conn {
            None => Ok(0),
            Some(conn) => scanner::count_new(conn),
        }
    }

    /// Flush and release the handle.
    pub fn close(self) -> Result<(), StorageError> {
        if let Some(conn) = self.conn {
            if let Err((_conn, e)) = conn.close() {
                warn!(error = %e, "archive connection did not close cleanly");
                return Err(StorageError::SqliteError { message: e.to_string() });
            }
        }
        Ok(())
    }
}
