//! History of vault mutations in `<vault_dir>/audit.db`.
//!
//! Each `VaultEvent` becomes one row with typed columns. Aliases and
//! strength labels are recorded; secrets never are.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::errors::{CipherStackError, Result};
use crate::vault::VaultEvent;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS vault_events (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    recorded_at    INTEGER NOT NULL,
    operation      TEXT    NOT NULL CHECK (operation IN ('save', 'rename', 'delete')),
    alias          TEXT    NOT NULL,
    previous_alias TEXT,
    strength_label TEXT,
    replaced       INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS vault_events_recorded_at ON vault_events (recorded_at);
";

/// A stored event and when it happened.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub id: i64,
    pub recorded_at: DateTime<Utc>,
    pub event: VaultEvent,
}

/// Columns of one `vault_events` row before they are checked.
struct RawRow {
    id: i64,
    recorded_at: i64,
    operation: String,
    alias: String,
    previous_alias: Option<String>,
    strength_label: Option<String>,
    replaced: bool,
}

impl RawRow {
    fn into_entry(self) -> Result<AuditEntry> {
        let bad = |what: &str| CipherStackError::AuditError(format!("row {}: {what}", self.id));

        let recorded_at =
            DateTime::from_timestamp(self.recorded_at, 0).ok_or_else(|| bad("timestamp"))?;
        let event = match self.operation.as_str() {
            "save" => VaultEvent::Saved {
                strength_label: self.strength_label.clone().unwrap_or_default(),
                replaced: self.replaced,
                alias: self.alias.clone(),
            },
            "rename" => VaultEvent::Renamed {
                from: self
                    .previous_alias
                    .clone()
                    .ok_or_else(|| bad("rename without previous alias"))?,
                to: self.alias.clone(),
            },
            "delete" => VaultEvent::Deleted {
                alias: self.alias.clone(),
            },
            other => return Err(bad(&format!("operation '{other}'"))),
        };

        Ok(AuditEntry {
            id: self.id,
            recorded_at,
            event,
        })
    }
}

/// Connection to the audit database.
pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    /// Open `<vault_dir>/audit.db`, creating the file and schema if needed.
    /// The directory itself must exist.
    pub fn open(vault_dir: &Path) -> Result<Self> {
        let path = Self::db_path(vault_dir);
        let conn = Connection::open(&path)
            .map_err(|e| CipherStackError::AuditError(format!("open {}: {e}", path.display())))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
        }

        conn.execute_batch(SCHEMA)
            .map_err(|e| CipherStackError::AuditError(format!("schema: {e}")))?;
        Ok(Self { conn })
    }

    pub fn db_path(vault_dir: &Path) -> PathBuf {
        vault_dir.join("audit.db")
    }

    /// Append `event`, stamped with the current time.
    pub fn record(&self, event: &VaultEvent) -> Result<()> {
        let (previous_alias, strength_label, replaced) = match event {
            VaultEvent::Saved {
                strength_label,
                replaced,
                ..
            } => (None, Some(strength_label.as_str()), *replaced),
            VaultEvent::Renamed { from, .. } => (Some(from.as_str()), None, false),
            VaultEvent::Deleted { .. } => (None, None, false),
        };

        self.conn
            .execute(
                "INSERT INTO vault_events
                     (recorded_at, operation, alias, previous_alias, strength_label, replaced)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    Utc::now().timestamp(),
                    event.operation(),
                    event.alias(),
                    previous_alias,
                    strength_label,
                    replaced
                ],
            )
            .map_err(|e| CipherStackError::AuditError(format!("insert: {e}")))?;
        Ok(())
    }

    /// Newest first, at most `limit`, optionally only those at or after
    /// `since` (second resolution).
    pub fn history(&self, limit: usize, since: Option<DateTime<Utc>>) -> Result<Vec<AuditEntry>> {
        let query_err = |e: rusqlite::Error| CipherStackError::AuditError(format!("query: {e}"));

        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, recorded_at, operation, alias, previous_alias, strength_label, replaced
                 FROM vault_events
                 WHERE ?1 IS NULL OR recorded_at >= ?1
                 ORDER BY id DESC
                 LIMIT ?2",
            )
            .map_err(query_err)?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![since.map(|t| t.timestamp()), limit], |row| {
                Ok(RawRow {
                    id: row.get(0)?,
                    recorded_at: row.get(1)?,
                    operation: row.get(2)?,
                    alias: row.get(3)?,
                    previous_alias: row.get(4)?,
                    strength_label: row.get(5)?,
                    replaced: row.get(6)?,
                })
            })
            .map_err(query_err)?;

        rows.map(|row| row.map_err(query_err)?.into_entry())
            .collect()
    }
}

/// Record `event` under `vault_dir`. Failures are traced, never returned:
/// the vault operation has already happened.
pub fn log_audit(vault_dir: &Path, event: &VaultEvent) {
    if let Err(e) = AuditLog::open(vault_dir).and_then(|log| log.record(event)) {
        tracing::warn!(operation = event.operation(), error = %e, "audit log write failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn saved(alias: &str, label: &str, replaced: bool) -> VaultEvent {
        VaultEvent::Saved {
            alias: alias.into(),
            strength_label: label.into(),
            replaced,
        }
    }

    #[test]
    fn events_come_back_typed_newest_first() {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::open(dir.path()).unwrap();

        let events = [
            saved("bank", "Strong", false),
            saved("bank", "Very Strong", true),
            VaultEvent::Renamed {
                from: "bank".into(),
                to: "savings".into(),
            },
            VaultEvent::Deleted {
                alias: "savings".into(),
            },
        ];
        for event in &events {
            log.record(event).unwrap();
        }

        let history: Vec<VaultEvent> = log
            .history(10, None)
            .unwrap()
            .into_iter()
            .map(|e| e.event)
            .collect();
        let expected: Vec<VaultEvent> = events.iter().rev().cloned().collect();
        assert_eq!(history, expected);
    }

    #[test]
    fn limit_and_since_narrow_the_history() {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::open(dir.path()).unwrap();
        for i in 0..5 {
            log.record(&saved(&format!("k{i}"), "Fair", false)).unwrap();
        }

        let last_two = log.history(2, None).unwrap();
        assert_eq!(last_two.len(), 2);
        assert_eq!(last_two[0].event.alias(), "k4");

        let hour_ago = Utc::now() - chrono::Duration::hours(1);
        assert_eq!(log.history(10, Some(hour_ago)).unwrap().len(), 5);
        let next_hour = Utc::now() + chrono::Duration::hours(1);
        assert!(log.history(10, Some(next_hour)).unwrap().is_empty());
    }

    #[test]
    fn unknown_operations_are_refused_by_the_schema() {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::open(dir.path()).unwrap();
        let inserted = log.conn.execute(
            "INSERT INTO vault_events (recorded_at, operation, alias) VALUES (0, 'export', 'x')",
            [],
        );
        assert!(inserted.is_err());
    }

    #[test]
    fn missing_directory_is_an_error_but_logging_is_not() {
        let missing = Path::new("/nonexistent/cipherstack/audit");
        assert!(matches!(
            AuditLog::open(missing),
            Err(CipherStackError::AuditError(_))
        ));
        log_audit(missing, &saved("x", "Weak", false));

        let dir = TempDir::new().unwrap();
        log_audit(dir.path(), &VaultEvent::Deleted { alias: "x".into() });
        let history = AuditLog::open(dir.path()).unwrap().history(5, None).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].event.operation(), "delete");
    }

    #[cfg(unix)]
    #[test]
    fn database_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        AuditLog::open(dir.path()).unwrap();
        let mode = std::fs::metadata(AuditLog::db_path(dir.path()))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
