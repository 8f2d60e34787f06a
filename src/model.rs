// 📋 Data Model - Staff, Student, DailyAttendance
// Persisted shapes use camelCase keys and short status codes ("P", "AB", "OD")

use crate::error::{AttendanceError, Result};
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Fixed date format. Zero-padded and fixed width, so string order == date order.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// ATTENDANCE STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    #[serde(rename = "P")]
    Present,
    #[serde(rename = "AB")]
    Absent,
    #[serde(rename = "OD")]
    OnDuty,
}

impl AttendanceStatus {
    /// Short code as stored and as shown in report cells
    pub fn code(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "P",
            AttendanceStatus::Absent => "AB",
            AttendanceStatus::OnDuty => "OD",
        }
    }

    /// Human-readable name for display
    pub fn name(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
            AttendanceStatus::OnDuty => "On Duty",
        }
    }
}

// ============================================================================
// STAFF
// ============================================================================

/// Staff account. `code` is the login identifier and the partition key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staff {
    pub id: String,
    pub code: String,
    pub password: String,
}

impl Staff {
    pub fn new(code: &str, password: &str) -> Self {
        Staff {
            id: uuid::Uuid::new_v4().to_string(),
            code: code.to_string(),
            password: password.to_string(),
        }
    }
}

// ============================================================================
// STUDENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    /// Stable identity (UUID)
    pub id: String,
    pub reg_no: String,
    pub name: String,
    pub staff_code: String,
}

impl Student {
    pub fn new(reg_no: &str, name: &str, staff_code: &str) -> Self {
        Student {
            id: uuid::Uuid::new_v4().to_string(),
            reg_no: reg_no.to_string(),
            name: name.to_string(),
            staff_code: staff_code.to_string(),
        }
    }
}

// ============================================================================
// DAILY ATTENDANCE
// ============================================================================

/// Per-status tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub present: usize,
    pub absent: usize,
    pub on_duty: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Absent => self.absent += 1,
            AttendanceStatus::OnDuty => self.on_duty += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.present + self.absent + self.on_duty
    }
}

/// Daily snapshot: the complete status map for one (staffCode, date)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAttendance {
    pub date: String,
    pub staff_code: String,
    /// regNo -> status
    pub records: BTreeMap<String, AttendanceStatus>,
}

impl DailyAttendance {
    pub fn new(date: &str, staff_code: &str, records: BTreeMap<String, AttendanceStatus>) -> Self {
        DailyAttendance {
            date: date.to_string(),
            staff_code: staff_code.to_string(),
            records,
        }
    }

    pub fn status_of(&self, reg_no: &str) -> Option<AttendanceStatus> {
        self.records.get(reg_no).copied()
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for status in self.records.values() {
            counts.record(*status);
        }
        counts
    }

    /// Registration numbers carrying `status`, in regNo order
    pub fn reg_nos_with(&self, status: AttendanceStatus) -> Vec<String> {
        self.records
            .iter()
            .filter(|(_, s)| **s == status)
            .map(|(reg_no, _)| reg_no.clone())
            .collect()
    }

    /// SHA-256 over date and records. Used to tag audit events, not as identity.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.date.as_bytes());
        for (reg_no, status) in &self.records {
            hasher.update(format!("|{}={}", reg_no, status.code()));
        }
        format!("{:x}", hasher.finalize())
    }
}

// ============================================================================
// DATES
// ============================================================================

/// Validate a `yyyy-mm-dd` date: fixed-width shape AND a real calendar day.
pub fn validate_date(date: &str) -> Result<NaiveDate> {
    let bytes = date.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());

    if !shape_ok {
        return Err(AttendanceError::InvalidDate(date.to_string()));
    }

    NaiveDate::parse_from_str(date, DATE_FORMAT)
        .map_err(|_| AttendanceError::InvalidDate(date.to_string()))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn today() -> String {
    format_date(Local::now().date_naive())
}

/// First day of the current month
pub fn start_of_month() -> String {
    let now = Local::now().date_naive();
    format_date(now.with_day(1).unwrap_or(now))
}
