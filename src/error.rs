// ⚠️ Error taxonomy
// Validation errors from CSV import are returned as data (see roster.rs);
// everything here is a precondition failure or an infrastructure failure.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the attendance tracker.
#[derive(Error, Debug)]
pub enum AttendanceError {
    /// Login was attempted without a staff code or password.
    #[error("Please enter both staff code and password")]
    MissingCredentials,

    /// The stored password for this staff code does not match.
    #[error("Invalid password")]
    InvalidPassword,

    /// An operation needs a logged-in staff member.
    #[error("No staff member is logged in")]
    NotLoggedIn,

    /// A date did not match yyyy-mm-dd or is not a calendar date.
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    /// The report range ends before it starts.
    #[error("Start date {start} is after end date {end}")]
    InvalidRange { start: String, end: String },

    /// The range needs more spreadsheet columns than a worksheet holds.
    #[error("Date range has {days} days; a worksheet fits at most {max}")]
    RangeTooLong { days: usize, max: usize },

    /// The roster is empty where students are required.
    #[error("No roster data available")]
    EmptyRoster,

    /// CSV input was blank.
    #[error("Please paste CSV data first")]
    EmptyInput,

    /// The roster import failed validation. Each line error is listed.
    #[error("Roster import failed: {}", .0.join(", "))]
    ImportRejected(Vec<String>),

    /// No snapshot exists for this date.
    #[error("No attendance data found for {0}")]
    NoAttendance(String),

    /// The student is not in the roster.
    #[error("Student not found: {0}")]
    StudentNotFound(String),

    /// Spreadsheet export failed. The detail is logged, not shown.
    #[error("Failed to export Excel report. Please try again.")]
    ExportFailed,

    /// A file could not be read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AttendanceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_import_rejected() {
        let err = AttendanceError::ImportRejected(vec![
            "Line 2: Student name is empty".to_string(),
            "Line 3: Duplicate registration number: 101".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Roster import failed: Line 2: Student name is empty, Line 3: Duplicate registration number: 101"
        );
    }

    #[test]
    fn test_error_display_export_failed_is_generic() {
        let msg = AttendanceError::ExportFailed.to_string();
        assert_eq!(msg, "Failed to export Excel report. Please try again.");
    }

    #[test]
    fn test_error_display_invalid_range() {
        let err = AttendanceError::InvalidRange {
            start: "2024-02-01".to_string(),
            end: "2024-01-01".to_string(),
        };
        assert_eq!(err.to_string(), "Start date 2024-02-01 is after end date 2024-01-01");
    }

    #[test]
    fn test_error_display_range_too_long() {
        let err = AttendanceError::RangeTooLong { days: 18_264, max: 16_379 };
        assert_eq!(err.to_string(), "Date range has 18264 days; a worksheet fits at most 16379");
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: AttendanceError = json_err.into();
        assert!(err.to_string().contains("Failed to parse JSON"));
    }
}
