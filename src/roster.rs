// 📥 Roster Importer - CSV text → validated Student records
// All-or-nothing: a batch either yields every student or every error.

use crate::error::{AttendanceError, Result};
use crate::model::Student;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

// ============================================================================
// IMPORT ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportErrorKind {
    EmptyInput,
    MissingData,
    EmptyRegNo,
    EmptyName,
    Duplicate(String),
    NoStudents,
}

/// One validation failure. `line` is 1-based; batch-level errors have none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportError {
    pub line: Option<usize>,
    pub kind: ImportErrorKind,
}

impl ImportError {
    fn at(line: usize, kind: ImportErrorKind) -> Self {
        ImportError {
            line: Some(line),
            kind,
        }
    }

    fn batch(kind: ImportErrorKind) -> Self {
        ImportError { line: None, kind }
    }
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(line) = self.line {
            write!(f, "Line {}: ", line)?;
        }
        match &self.kind {
            ImportErrorKind::EmptyInput => write!(f, "CSV data is empty"),
            ImportErrorKind::MissingData => {
                write!(f, "Missing data. Expected format: RegNo,Name")
            }
            ImportErrorKind::EmptyRegNo => write!(f, "Registration number is empty"),
            ImportErrorKind::EmptyName => write!(f, "Student name is empty"),
            ImportErrorKind::Duplicate(reg_no) => {
                write!(f, "Duplicate registration number: {}", reg_no)
            }
            ImportErrorKind::NoStudents => write!(f, "No valid student data found"),
        }
    }
}

impl std::error::Error for ImportError {}

pub type ImportResult = std::result::Result<Vec<Student>, Vec<ImportError>>;

/// Render an error list the way it is shown to the user
pub fn error_messages(errors: &[ImportError]) -> Vec<String> {
    errors.iter().map(|e| e.to_string()).collect()
}

// ============================================================================
// PARSE
// ============================================================================

/// Parse `regNo,name[,ignored...]` lines into students owned by `staff_code`.
///
/// Blank lines are skipped. Uniqueness is checked only within this batch,
/// never against a stored roster.
pub fn parse_roster(text: &str, staff_code: &str) -> ImportResult {
    // Spreadsheet tools often prefix exported CSV with a byte-order mark
    let trimmed = text.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return Err(vec![ImportError::batch(ImportErrorKind::EmptyInput)]);
    }

    let mut students = Vec::new();
    let mut errors = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for (index, raw_line) in trimmed.split('\n').enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < 2 {
            errors.push(ImportError::at(line_no, ImportErrorKind::MissingData));
            continue;
        }

        let (reg_no, name) = (fields[0], fields[1]);
        if reg_no.is_empty() {
            errors.push(ImportError::at(line_no, ImportErrorKind::EmptyRegNo));
            continue;
        }
        if name.is_empty() {
            errors.push(ImportError::at(line_no, ImportErrorKind::EmptyName));
            continue;
        }
        if !seen.insert(reg_no) {
            errors.push(ImportError::at(
                line_no,
                ImportErrorKind::Duplicate(reg_no.to_string()),
            ));
            continue;
        }

        students.push(Student::new(reg_no, name, staff_code));
    }

    if !errors.is_empty() {
        tracing::debug!(errors = errors.len(), "roster batch rejected");
        return Err(errors);
    }
    if students.is_empty() {
        return Err(vec![ImportError::batch(ImportErrorKind::NoStudents)]);
    }

    Ok(students)
}

/// Read a roster file as text
pub fn read_roster_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| AttendanceError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

// ============================================================================
// EXPORT
// ============================================================================

/// Serialize students as `regNo,name` lines joined by `\n`.
/// An empty roster yields an empty string.
pub fn export_roster(students: &[Student]) -> Result<String> {
    if students.is_empty() {
        return Ok(String::new());
    }

    // Parsed fields never contain commas, so quoting is never needed and
    // would break the re-import of names containing quote characters.
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Never)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for student in students {
        wtr.write_record([student.reg_no.as_str(), student.name.as_str()])?;
    }

    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    let mut text = String::from_utf8_lossy(&bytes).into_owned();
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

/// Default file name for a roster export
pub fn export_file_name(staff_code: &str, date: &str) -> String {
    format!("roster_{}_{}.csv", staff_code, date)
}

// ============================================================================
// ROSTER EDITS
// ============================================================================

/// Case-insensitive substring match on regNo or name. Empty term keeps all.
pub fn search_roster<'a>(students: &'a [Student], term: &str) -> Vec<&'a Student> {
    let needle = term.to_lowercase();
    students
        .iter()
        .filter(|s| {
            needle.is_empty()
                || s.reg_no.to_lowercase().contains(&needle)
                || s.name.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Roster without `reg_no`. Errors if no such student exists.
pub fn remove_student(students: &[Student], reg_no: &str) -> Result<Vec<Student>> {
    if !students.iter().any(|s| s.reg_no == reg_no) {
        return Err(AttendanceError::StudentNotFound(reg_no.to_string()));
    }
    Ok(students
        .iter()
        .filter(|s| s.reg_no != reg_no)
        .cloned()
        .collect())
}
