// 🗄️ Store - the single persistence boundary (SQLite + WAL)
//
// Key space (JSON values in the kv table):
//   staff_accounts          → Vec<Staff>
//   currentUser             → Staff
//   roster_<staffCode>      → Vec<Student>
//   attendance_<staffCode>  → Vec<DailyAttendance>
//
// Every write replaces its key wholesale: last write wins.

use crate::error::Result;
use crate::model::{DailyAttendance, Staff, Student};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const STAFF_ACCOUNTS_KEY: &str = "staff_accounts";
pub const CURRENT_USER_KEY: &str = "currentUser";

pub fn roster_key(staff_code: &str) -> String {
    format!("roster_{}", staff_code)
}

pub fn attendance_key(staff_code: &str) -> String {
    format!("attendance_{}", staff_code)
}

// ============================================================================
// EVENTS (audit trail)
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub staff_code: String,
    pub data: serde_json::Value,
}

impl Event {
    pub fn new(event_type: &str, staff_code: &str, data: serde_json::Value) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            staff_code: staff_code.to_string(),
            data,
        }
    }
}

// ============================================================================
// STORE
// ============================================================================

/// Owns the connection. Passed explicitly to every operation that persists.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the database file and make sure the schema exists
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        // WAL for crash recovery
        conn.pragma_update(None, "journal_mode", "WAL")?;
        setup_database(&conn)?;
        tracing::debug!(path = %path.display(), "store opened");
        Ok(Store { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(Store { conn })
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    // ------------------------------------------------------------------------
    // Raw key-value access
    // ------------------------------------------------------------------------

    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, json, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Staff accounts
    // ------------------------------------------------------------------------

    /// Insert or replace the account with the same code
    pub fn save_staff(&self, staff: &Staff) -> Result<()> {
        let mut accounts = self.get_all_staff()?;
        accounts.retain(|s| s.code != staff.code);
        accounts.push(staff.clone());
        self.set(STAFF_ACCOUNTS_KEY, &accounts)
    }

    pub fn get_staff_by_code(&self, code: &str) -> Result<Option<Staff>> {
        Ok(self.get_all_staff()?.into_iter().find(|s| s.code == code))
    }

    pub fn get_all_staff(&self) -> Result<Vec<Staff>> {
        Ok(self.get(STAFF_ACCOUNTS_KEY)?.unwrap_or_default())
    }

    // ------------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------------

    pub fn set_current_user(&self, staff: &Staff) -> Result<()> {
        self.set(CURRENT_USER_KEY, staff)
    }

    pub fn get_current_user(&self) -> Result<Option<Staff>> {
        self.get(CURRENT_USER_KEY)
    }

    pub fn clear_current_user(&self) -> Result<()> {
        self.remove(CURRENT_USER_KEY)
    }

    // ------------------------------------------------------------------------
    // Roster
    // ------------------------------------------------------------------------

    pub fn save_roster(&self, staff_code: &str, roster: &[Student]) -> Result<()> {
        self.set(&roster_key(staff_code), roster)
    }

    pub fn get_roster(&self, staff_code: &str) -> Result<Vec<Student>> {
        Ok(self.get(&roster_key(staff_code))?.unwrap_or_default())
    }

    // ------------------------------------------------------------------------
    // Attendance
    // ------------------------------------------------------------------------

    /// Replace any snapshot for the same date, then append this one
    pub fn save_attendance(&self, staff_code: &str, attendance: &DailyAttendance) -> Result<()> {
        let mut all = self.get_all_attendance(staff_code)?;
        all.retain(|a| a.date != attendance.date);
        all.push(attendance.clone());
        self.set(&attendance_key(staff_code), &all)
    }

    pub fn get_attendance_by_date(
        &self,
        staff_code: &str,
        date: &str,
    ) -> Result<Option<DailyAttendance>> {
        Ok(self
            .get_all_attendance(staff_code)?
            .into_iter()
            .find(|a| a.date == date))
    }

    pub fn get_all_attendance(&self, staff_code: &str) -> Result<Vec<DailyAttendance>> {
        Ok(self.get(&attendance_key(staff_code))?.unwrap_or_default())
    }

    pub fn get_attendance_in_date_range(
        &self,
        staff_code: &str,
        start: &str,
        end: &str,
    ) -> Result<Vec<DailyAttendance>> {
        let mut all = self.get_all_attendance(staff_code)?;
        all.retain(|a| a.date.as_str() >= start && a.date.as_str() <= end);
        Ok(all)
    }

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    pub fn record_event(&self, event: &Event) -> Result<()> {
        insert_event(&self.conn, event)
    }

    pub fn events_for_staff(&self, staff_code: &str) -> Result<Vec<Event>> {
        get_events_for_staff(&self.conn, staff_code)
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            staff_code TEXT NOT NULL,
            data TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_staff ON events(staff_code, timestamp)",
        [],
    )?;

    Ok(())
}

fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (event_id, timestamp, event_type, staff_code, data)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.staff_code,
            data_json,
        ],
    )?;

    Ok(())
}

/// A TEXT column that was read but could not be parsed
fn conversion_failure<E>(column: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

fn get_events_for_staff(conn: &Connection, staff_code: &str) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, staff_code, data
         FROM events
         WHERE staff_code = ?1
         ORDER BY id DESC",
    )?;

    let events = stmt
        .query_map(params![staff_code], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(4)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                    .map_err(|e| conversion_failure(1, e))?
                    .with_timezone(&Utc),
                event_type: row.get(2)?,
                staff_code: row.get(3)?,
                data: serde_json::from_str(&data_json).map_err(|e| conversion_failure(4, e))?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(events)
}
