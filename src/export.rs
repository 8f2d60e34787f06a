// 📤 Spreadsheet Export - report matrix → .xlsx
//
// Any failure inside the workbook write collapses into ExportFailed; the
// detail goes to the log only. The file is written to a temporary sibling
// and renamed, so a failed export never leaves a partial file behind.

use crate::error::{AttendanceError, Result};
use crate::model::{validate_date, AttendanceStatus};
use crate::report::{build_matrix, validate_range, ReportMatrix, TOTAL_HEADERS};
use crate::store::{Event, Store};
use rust_xlsxwriter::{Color, Format, Workbook, XlsxError};
use std::path::{Path, PathBuf};

pub const SHEET_NAME: &str = "Attendance";
pub const MAX_COLUMN_WIDTH: usize = 20;
/// Column limit of an .xlsx worksheet (XFD)
pub const MAX_SHEET_COLUMNS: usize = 16_384;

const HEADER_FILL: u32 = 0xE6F3FF;
const PRESENT_FILL: u32 = 0x22C55E;
const ABSENT_FILL: u32 = 0xEF4444;
const ON_DUTY_FILL: u32 = 0xF59E0B;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Colour status cells by value
    pub include_colors: bool,
    /// Append the three total columns
    pub include_summary: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            include_colors: true,
            include_summary: true,
        }
    }
}

/// `attendance_<staffCode>_<start>_to_<end>.xlsx`
pub fn report_file_name(staff_code: &str, start: &str, end: &str) -> String {
    format!("attendance_{}_{}_to_{}.xlsx", staff_code, start, end)
}

fn status_format(status: AttendanceStatus) -> Format {
    let fill = match status {
        AttendanceStatus::Present => PRESENT_FILL,
        AttendanceStatus::Absent => ABSENT_FILL,
        AttendanceStatus::OnDuty => ON_DUTY_FILL,
    };
    Format::new()
        .set_background_color(Color::RGB(fill))
        .set_font_color(Color::White)
}

/// Cell text for every row, used for column sizing
fn table_text(matrix: &ReportMatrix, include_summary: bool) -> Vec<Vec<String>> {
    let mut table = vec![matrix.headers(include_summary)];
    for row in &matrix.rows {
        let mut line = vec![row.reg_no.clone(), row.name.clone()];
        line.extend(
            row.cells
                .iter()
                .map(|c| c.map(|s| s.code().to_string()).unwrap_or_default()),
        );
        if include_summary {
            line.push(row.totals.present.to_string());
            line.push(row.totals.absent.to_string());
            line.push(row.totals.on_duty.to_string());
        }
        table.push(line);
    }
    table
}

/// Width per column: longest cell text + 2, capped
pub fn column_widths(matrix: &ReportMatrix, include_summary: bool) -> Vec<usize> {
    let table = table_text(matrix, include_summary);
    let columns = table.first().map(Vec::len).unwrap_or(0);

    (0..columns)
        .map(|col| {
            let longest = table
                .iter()
                .filter_map(|line| line.get(col))
                .map(|text| text.chars().count())
                .max()
                .unwrap_or(0);
            (longest + 2).min(MAX_COLUMN_WIDTH)
        })
        .collect()
}

/// Render the workbook to bytes
pub fn write_workbook(
    matrix: &ReportMatrix,
    options: ExportOptions,
) -> std::result::Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(HEADER_FILL));

    for (col, header) in matrix.headers(options.include_summary).iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
    }

    let date_offset = 2u16;
    for (index, row) in matrix.rows.iter().enumerate() {
        let r = (index + 1) as u32;
        worksheet.write_string(r, 0, &row.reg_no)?;
        worksheet.write_string(r, 1, &row.name)?;

        for (offset, cell) in row.cells.iter().enumerate() {
            let col = date_offset + offset as u16;
            match cell {
                Some(status) if options.include_colors => {
                    worksheet.write_string_with_format(r, col, status.code(), &status_format(*status))?;
                }
                Some(status) => {
                    worksheet.write_string(r, col, status.code())?;
                }
                None => {}
            }
        }

        if options.include_summary {
            let totals_col = date_offset + row.cells.len() as u16;
            worksheet.write_number(r, totals_col, row.totals.present as f64)?;
            worksheet.write_number(r, totals_col + 1, row.totals.absent as f64)?;
            worksheet.write_number(r, totals_col + 2, row.totals.on_duty as f64)?;
        }
    }

    for (col, width) in column_widths(matrix, options.include_summary).iter().enumerate() {
        worksheet.set_column_width(col as u16, *width as f64)?;
    }

    workbook.save_to_buffer()
}

/// Most date columns a sheet can hold next to `Reg No`, `Name` and the totals
pub fn max_report_days(include_summary: bool) -> usize {
    let fixed = 2 + if include_summary { TOTAL_HEADERS.len() } else { 0 };
    MAX_SHEET_COLUMNS - fixed
}

/// Reject ranges that cannot fit on one worksheet before any matrix is built
fn check_range_fits(start: &str, end: &str, include_summary: bool) -> Result<()> {
    let days = (validate_date(end)? - validate_date(start)?).num_days() + 1;
    let days = usize::try_from(days).unwrap_or(0);
    let max = max_report_days(include_summary);
    if days > max {
        return Err(AttendanceError::RangeTooLong { days, max });
    }
    Ok(())
}

/// Write bytes to `path` via a temporary sibling and rename
fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("xlsx.tmp");
    if let Err(e) = std::fs::write(&tmp, bytes).and_then(|_| std::fs::rename(&tmp, path)) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

/// Save the matrix as an .xlsx file inside `dir`. Single attempt, no retry.
pub fn save_report(
    matrix: &ReportMatrix,
    staff_code: &str,
    dir: &Path,
    options: ExportOptions,
) -> Result<PathBuf> {
    let path = dir.join(report_file_name(staff_code, &matrix.start, &matrix.end));

    let bytes = write_workbook(matrix, options).map_err(|e| {
        tracing::error!(error = %e, "workbook render failed");
        AttendanceError::ExportFailed
    })?;

    write_atomically(&path, &bytes).map_err(|e| {
        tracing::error!(error = %e, path = %path.display(), "workbook write failed");
        AttendanceError::ExportFailed
    })?;

    Ok(path)
}

/// Build the report for [start, end] from the store and save it
pub fn export_report(
    store: &Store,
    staff_code: &str,
    start: &str,
    end: &str,
    dir: &Path,
    options: ExportOptions,
) -> Result<PathBuf> {
    validate_range(start, end)?;
    check_range_fits(start, end, options.include_summary)?;
    let roster = store.get_roster(staff_code)?;
    if roster.is_empty() {
        return Err(AttendanceError::EmptyRoster);
    }

    let snapshots = store.get_attendance_in_date_range(staff_code, start, end)?;
    let matrix = build_matrix(&roster, &snapshots, start, end)?;
    let path = save_report(&matrix, staff_code, dir, options)?;

    // The file is already in place; a lost audit row must not turn that into an error
    let event = Event::new(
        "report_exported",
        staff_code,
        serde_json::json!({
            "start": start,
            "end": end,
            "students": matrix.rows.len(),
            "file": path.display().to_string(),
        }),
    );
    if let Err(e) = store.record_event(&event) {
        tracing::warn!(error = %e, staff = staff_code, "failed to record export event");
    }
    tracing::info!(staff = staff_code, path = %path.display(), "report exported");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DailyAttendance, Student};
    use std::collections::BTreeMap;

    fn seeded_store() -> Store {
        let store = Store::open_in_memory().unwrap();
        store
            .save_roster(
                "T01",
                &[
                    Student::new("101", "Arun Kumar", "T01"),
                    Student::new("102", "A Student With A Very Long Name", "T01"),
                ],
            )
            .unwrap();

        let mut records = BTreeMap::new();
        records.insert("101".to_string(), AttendanceStatus::Absent);
        records.insert("102".to_string(), AttendanceStatus::Present);
        store
            .save_attendance("T01", &DailyAttendance::new("2024-01-01", "T01", records))
            .unwrap();
        store
    }

    #[test]
    fn test_report_file_name() {
        assert_eq!(
            report_file_name("T01", "2024-01-01", "2024-01-31"),
            "attendance_T01_2024-01-01_to_2024-01-31.xlsx"
        );
    }

    #[test]
    fn test_column_widths_are_capped() {
        let store = seeded_store();
        let roster = store.get_roster("T01").unwrap();
        let snapshots = store.get_all_attendance("T01").unwrap();
        let matrix = build_matrix(&roster, &snapshots, "2024-01-01", "2024-01-02").unwrap();

        let widths = column_widths(&matrix, true);
        assert_eq!(widths.len(), 7);
        // "Reg No" is the longest in column 0
        assert_eq!(widths[0], 8);
        assert_eq!(widths[1], MAX_COLUMN_WIDTH);
        // "2024-01-01"
        assert_eq!(widths[2], 12);
        // "Total On Duty"
        assert_eq!(widths[6], 15);

        assert_eq!(column_widths(&matrix, false).len(), 4);
    }

    #[test]
    fn test_write_workbook_produces_zip() {
        let store = seeded_store();
        let roster = store.get_roster("T01").unwrap();
        let snapshots = store.get_all_attendance("T01").unwrap();
        let matrix = build_matrix(&roster, &snapshots, "2024-01-01", "2024-01-03").unwrap();

        let bytes = write_workbook(&matrix, ExportOptions::default()).unwrap();
        // xlsx is a zip container
        assert_eq!(&bytes[..2], b"PK");

        let plain = ExportOptions {
            include_colors: false,
            include_summary: false,
        };
        assert!(!write_workbook(&matrix, plain).unwrap().is_empty());
    }

    #[test]
    fn test_export_report_writes_file() {
        let store = seeded_store();
        let dir = tempfile::TempDir::new().unwrap();

        let path = export_report(
            &store,
            "T01",
            "2024-01-01",
            "2024-01-31",
            dir.path(),
            ExportOptions::default(),
        )
        .unwrap();

        assert!(path.exists());
        assert!(path.ends_with("attendance_T01_2024-01-01_to_2024-01-31.xlsx"));
        assert!(!path.with_extension("xlsx.tmp").exists());
        assert_eq!(
            store.events_for_staff("T01").unwrap()[0].event_type,
            "report_exported"
        );
    }

    #[test]
    fn test_export_preconditions() {
        let store = Store::open_in_memory().unwrap();
        let dir = tempfile::TempDir::new().unwrap();

        let empty = export_report(&store, "T01", "2024-01-01", "2024-01-31", dir.path(), ExportOptions::default());
        assert!(matches!(empty, Err(AttendanceError::EmptyRoster)));

        let bad_date = export_report(&store, "T01", "", "2024-01-31", dir.path(), ExportOptions::default());
        assert!(matches!(bad_date, Err(AttendanceError::InvalidDate(_))));
    }

    #[test]
    fn test_failed_write_is_generic_and_leaves_nothing() {
        let store = seeded_store();
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");

        let result = export_report(&store, "T01", "2024-01-01", "2024-01-31", &missing, ExportOptions::default());

        assert!(matches!(result, Err(AttendanceError::ExportFailed)));
        assert!(!missing.exists());
    }

    #[test]
    fn test_range_wider_than_a_sheet_is_rejected_up_front() {
        let store = seeded_store();
        let dir = tempfile::TempDir::new().unwrap();

        let result = export_report(&store, "T01", "2000-01-01", "2050-01-01", dir.path(), ExportOptions::default());

        match result {
            Err(AttendanceError::RangeTooLong { days, max }) => {
                assert_eq!(days, 18_264);
                assert_eq!(max, 16_379);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_range_at_column_limit_still_fits() {
        assert_eq!(max_report_days(true), 16_379);
        assert_eq!(max_report_days(false), 16_382);

        // 2000-01-01 + 16_378 days
        assert!(check_range_fits("2000-01-01", "2044-11-03", true).is_ok());
        assert!(matches!(
            check_range_fits("2000-01-01", "2044-11-04", true),
            Err(AttendanceError::RangeTooLong { days: 16_380, .. })
        ));
        assert!(check_range_fits("2000-01-01", "2044-11-04", false).is_ok());
    }

    #[test]
    fn test_export_succeeds_when_event_log_is_unavailable() {
        let store = seeded_store();
        store.connection().execute("DROP TABLE events", []).unwrap();
        let dir = tempfile::TempDir::new().unwrap();

        let path = export_report(
            &store,
            "T01",
            "2024-01-01",
            "2024-01-31",
            dir.path(),
            ExportOptions::default(),
        )
        .unwrap();

        assert!(path.exists());
    }
}
