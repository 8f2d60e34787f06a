// 📊 Report Aggregator - roster × daily snapshots → per-student totals
// Date range filtering compares ISO strings; dates are validated upstream.

use crate::error::{AttendanceError, Result};
use crate::model::{format_date, validate_date, AttendanceStatus, DailyAttendance, StatusCounts, Student};
use serde::Serialize;

// ============================================================================
// STUDENT SUMMARY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentSummary {
    pub reg_no: String,
    pub name: String,
    /// (date, status) in the order matching snapshots were seen
    pub dates: Vec<(String, AttendanceStatus)>,
    pub total_present: usize,
    pub total_absent: usize,
    pub total_on_duty: usize,
}

impl StudentSummary {
    fn new(student: &Student) -> Self {
        StudentSummary {
            reg_no: student.reg_no.clone(),
            name: student.name.clone(),
            dates: Vec::new(),
            total_present: 0,
            total_absent: 0,
            total_on_duty: 0,
        }
    }

    pub fn status_on(&self, date: &str) -> Option<AttendanceStatus> {
        self.dates
            .iter()
            .find(|(d, _)| d == date)
            .map(|(_, status)| *status)
    }

    /// Record a status for a date. A second status for the same date replaces
    /// the first, so totals count each date at most once.
    fn mark(&mut self, date: &str, status: AttendanceStatus) {
        match self.dates.iter_mut().find(|(d, _)| d == date) {
            Some(entry) => entry.1 = status,
            None => self.dates.push((date.to_string(), status)),
        }
        self.recount();
    }

    fn recount(&mut self) {
        let mut counts = StatusCounts::default();
        for (_, status) in &self.dates {
            counts.record(*status);
        }
        self.total_present = counts.present;
        self.total_absent = counts.absent;
        self.total_on_duty = counts.on_duty;
    }

    pub fn total_marked(&self) -> usize {
        self.total_present + self.total_absent + self.total_on_duty
    }

    /// Date map sorted by date string
    pub fn sorted_dates(&self) -> Vec<(String, AttendanceStatus)> {
        let mut dates = self.dates.clone();
        dates.sort_by(|a, b| a.0.cmp(&b.0));
        dates
    }
}

// ============================================================================
// AGGREGATION
// ============================================================================

fn in_range(date: &str, start: &str, end: &str) -> bool {
    date >= start && date <= end
}

/// Snapshots whose date falls in [start, end]
pub fn filter_in_range<'a>(
    snapshots: &'a [DailyAttendance],
    start: &str,
    end: &str,
) -> Vec<&'a DailyAttendance> {
    snapshots
        .iter()
        .filter(|daily| in_range(&daily.date, start, end))
        .collect()
}

/// One summary per roster student, in roster order.
///
/// Only explicit entries count: a date with no entry for a student is not
/// an implicit absence. Entries for regNos outside the roster are ignored.
pub fn aggregate(
    roster: &[Student],
    snapshots: &[DailyAttendance],
    start: &str,
    end: &str,
) -> Vec<StudentSummary> {
    let relevant = filter_in_range(snapshots, start, end);

    roster
        .iter()
        .map(|student| {
            let mut summary = StudentSummary::new(student);
            for daily in &relevant {
                if let Some(status) = daily.status_of(&student.reg_no) {
                    summary.mark(&daily.date, status);
                }
            }
            summary
        })
        .collect()
}

/// Class-wide sums of the per-student totals
pub fn class_totals(summaries: &[StudentSummary]) -> StatusCounts {
    summaries.iter().fold(StatusCounts::default(), |mut acc, s| {
        acc.present += s.total_present;
        acc.absent += s.total_absent;
        acc.on_duty += s.total_on_duty;
        acc
    })
}

/// Every calendar day from `start` to `end` inclusive. Empty if start > end.
pub fn dates_in_range(start: &str, end: &str) -> Result<Vec<String>> {
    let start_date = validate_date(start)?;
    let end_date = validate_date(end)?;

    Ok(start_date
        .iter_days()
        .take_while(|d| *d <= end_date)
        .map(format_date)
        .collect())
}

/// Validate both ends of a range and their order
pub fn validate_range(start: &str, end: &str) -> Result<()> {
    validate_date(start)?;
    validate_date(end)?;
    if start > end {
        return Err(AttendanceError::InvalidRange {
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// REPORT MATRIX
// ============================================================================

pub const TOTAL_HEADERS: [&str; 3] = ["Total Present", "Total Absent", "Total On Duty"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixRow {
    pub reg_no: String,
    pub name: String,
    /// One cell per matrix date
    pub cells: Vec<Option<AttendanceStatus>>,
    pub totals: StatusCounts,
}

/// Date-indexed status grid for spreadsheet output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportMatrix {
    pub start: String,
    pub end: String,
    pub dates: Vec<String>,
    pub rows: Vec<MatrixRow>,
}

impl ReportMatrix {
    /// `Reg No`, `Name`, every date, then the totals when requested
    pub fn headers(&self, include_summary: bool) -> Vec<String> {
        let mut headers = vec!["Reg No".to_string(), "Name".to_string()];
        headers.extend(self.dates.iter().cloned());
        if include_summary {
            headers.extend(TOTAL_HEADERS.iter().map(|h| h.to_string()));
        }
        headers
    }
}

pub fn build_matrix(
    roster: &[Student],
    snapshots: &[DailyAttendance],
    start: &str,
    end: &str,
) -> Result<ReportMatrix> {
    validate_range(start, end)?;
    let dates = dates_in_range(start, end)?;
    let summaries = aggregate(roster, snapshots, start, end);

    let rows = summaries
        .into_iter()
        .map(|summary| {
            let cells: Vec<Option<AttendanceStatus>> =
                dates.iter().map(|d| summary.status_on(d)).collect();

            let mut totals = StatusCounts::default();
            for status in cells.iter().flatten() {
                totals.record(*status);
            }

            MatrixRow {
                reg_no: summary.reg_no,
                name: summary.name,
                cells,
                totals,
            }
        })
        .collect();

    Ok(ReportMatrix {
        start: start.to_string(),
        end: end.to_string(),
        dates,
        rows,
    })
}
