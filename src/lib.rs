// Attendance Tracker - Core Library
// Roster import, daily marking, reports and spreadsheet export

pub mod error;
pub mod model;
pub mod roster;
pub mod report;
pub mod store;
pub mod session;
pub mod marking;
pub mod dashboard;
pub mod export;

// Re-export commonly used types
pub use error::{AttendanceError, Result};
pub use model::{
    AttendanceStatus, DailyAttendance, Staff, StatusCounts, Student,
    validate_date, today, start_of_month,
};
pub use roster::{
    ImportError, ImportErrorKind, ImportResult,
    parse_roster, export_roster, search_roster, remove_student,
};
pub use report::{
    StudentSummary, ReportMatrix, MatrixRow,
    aggregate, build_matrix, class_totals, dates_in_range, filter_in_range,
};
pub use store::{Event, Store};
pub use session::{LoginOutcome, login, logout, require_user};
pub use marking::{MarkOutcome, mark_attendance, load_saved, parse_reg_no_list};
pub use dashboard::{Dashboard, DaySummary, build_dashboard};
pub use export::{ExportOptions, export_report, report_file_name};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
