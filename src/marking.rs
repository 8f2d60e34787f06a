// ✍️ Marking - absent / on-duty lists → daily snapshot
// Everyone in the roster gets an explicit status. Absent wins over on-duty.

use crate::error::{AttendanceError, Result};
use crate::model::{validate_date, AttendanceStatus, DailyAttendance, Student};
use crate::store::{Event, Store};
use std::collections::BTreeMap;

/// Split a comma-separated regNo list, trimming and dropping empties
pub fn parse_reg_no_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Status each roster student would receive, in roster order
pub fn preview<'a>(
    roster: &'a [Student],
    absent: &[String],
    on_duty: &[String],
) -> Vec<(&'a Student, AttendanceStatus)> {
    roster
        .iter()
        .map(|student| {
            let status = if absent.contains(&student.reg_no) {
                AttendanceStatus::Absent
            } else if on_duty.contains(&student.reg_no) {
                AttendanceStatus::OnDuty
            } else {
                AttendanceStatus::Present
            };
            (student, status)
        })
        .collect()
}

pub fn build_snapshot(
    roster: &[Student],
    date: &str,
    staff_code: &str,
    absent: &[String],
    on_duty: &[String],
) -> DailyAttendance {
    let records: BTreeMap<String, AttendanceStatus> = preview(roster, absent, on_duty)
        .into_iter()
        .map(|(student, status)| (student.reg_no.clone(), status))
        .collect();
    DailyAttendance::new(date, staff_code, records)
}

/// Listed regNos that match nobody in the roster
pub fn unknown_reg_nos(roster: &[Student], listed: &[String]) -> Vec<String> {
    listed
        .iter()
        .filter(|r| !roster.iter().any(|s| &s.reg_no == *r))
        .cloned()
        .collect()
}

#[derive(Debug, Clone)]
pub struct MarkOutcome {
    pub attendance: DailyAttendance,
    /// Listed regNos that were not in the roster and so were ignored
    pub unknown: Vec<String>,
    /// True when an earlier snapshot for the same date was replaced
    pub replaced: bool,
}

/// Build and persist the snapshot for `date`, replacing any earlier one
pub fn mark_attendance(
    store: &Store,
    staff_code: &str,
    date: &str,
    absent: &[String],
    on_duty: &[String],
) -> Result<MarkOutcome> {
    validate_date(date)?;
    let roster = store.get_roster(staff_code)?;
    if roster.is_empty() {
        return Err(AttendanceError::EmptyRoster);
    }

    let attendance = build_snapshot(&roster, date, staff_code, absent, on_duty);
    let mut unknown = unknown_reg_nos(&roster, absent);
    for reg_no in unknown_reg_nos(&roster, on_duty) {
        if !unknown.contains(&reg_no) {
            unknown.push(reg_no);
        }
    }
    if !unknown.is_empty() {
        tracing::warn!(?unknown, "ignoring registration numbers not in roster");
    }

    let replaced = store.get_attendance_by_date(staff_code, date)?.is_some();
    store.save_attendance(staff_code, &attendance)?;

    let counts = attendance.counts();
    store.record_event(&Event::new(
        "attendance_saved",
        staff_code,
        serde_json::json!({
            "date": date,
            "present": counts.present,
            "absent": counts.absent,
            "on_duty": counts.on_duty,
            "replaced": replaced,
            "fingerprint": attendance.fingerprint(),
        }),
    ))?;
    tracing::info!(staff = staff_code, date, replaced, "attendance saved");

    Ok(MarkOutcome {
        attendance,
        unknown,
        replaced,
    })
}

/// The saved snapshot for `date` split back into (absent, on-duty) lists
pub fn load_saved(store: &Store, staff_code: &str, date: &str) -> Result<(Vec<String>, Vec<String>)> {
    validate_date(date)?;
    let saved = store
        .get_attendance_by_date(staff_code, date)?
        .ok_or_else(|| AttendanceError::NoAttendance(date.to_string()))?;

    Ok((
        saved.reg_nos_with(AttendanceStatus::Absent),
        saved.reg_nos_with(AttendanceStatus::OnDuty),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<Student> {
        vec![
            Student::new("101", "Arun", "T01"),
            Student::new("102", "Ganesh", "T01"),
            Student::new("103", "Priya", "T01"),
        ]
    }

    #[test]
    fn test_parse_reg_no_list() {
        assert_eq!(parse_reg_no_list(" 101, ,102 ,"), vec!["101", "102"]);
        assert!(parse_reg_no_list("").is_empty());
    }

    #[test]
    fn test_absent_wins_over_on_duty() {
        let roster = roster();
        let absent = parse_reg_no_list("102");
        let on_duty = parse_reg_no_list("102,103");

        let snapshot = build_snapshot(&roster, "2024-01-01", "T01", &absent, &on_duty);

        assert_eq!(snapshot.status_of("101"), Some(AttendanceStatus::Present));
        assert_eq!(snapshot.status_of("102"), Some(AttendanceStatus::Absent));
        assert_eq!(snapshot.status_of("103"), Some(AttendanceStatus::OnDuty));
        assert_eq!(snapshot.records.len(), 3);
    }

    #[test]
    fn test_mark_twice_replaces_and_load_saved() {
        let store = Store::open_in_memory().unwrap();
        store.save_roster("T01", &roster()).unwrap();

        let first = mark_attendance(&store, "T01", "2024-01-01", &parse_reg_no_list("101"), &[]).unwrap();
        assert!(!first.replaced);

        let second = mark_attendance(
            &store,
            "T01",
            "2024-01-01",
            &parse_reg_no_list("102"),
            &parse_reg_no_list("103,999"),
        )
        .unwrap();
        assert!(second.replaced);
        assert_eq!(second.unknown, vec!["999"]);

        assert_eq!(store.get_all_attendance("T01").unwrap().len(), 1);
        let (absent, on_duty) = load_saved(&store, "T01", "2024-01-01").unwrap();
        assert_eq!(absent, vec!["102"]);
        assert_eq!(on_duty, vec!["103"]);

        let events = store.events_for_staff("T01").unwrap();
        assert_eq!(events[0].data["replaced"], true);
    }

    #[test]
    fn test_mark_preconditions() {
        let store = Store::open_in_memory().unwrap();
        assert!(matches!(
            mark_attendance(&store, "T01", "2024-01-01", &[], &[]),
            Err(AttendanceError::EmptyRoster)
        ));

        store.save_roster("T01", &roster()).unwrap();
        assert!(matches!(
            mark_attendance(&store, "T01", "", &[], &[]),
            Err(AttendanceError::InvalidDate(_))
        ));
        assert!(matches!(
            load_saved(&store, "T01", "2024-05-05"),
            Err(AttendanceError::NoAttendance(_))
        ));
    }
}
