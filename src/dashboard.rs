// 🏠 Dashboard - today's counts and the most recent days
use crate::model::{DailyAttendance, StatusCounts};
use serde::Serialize;

pub const RECENT_DAYS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySummary {
    pub date: String,
    pub counts: StatusCounts,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub roster_size: usize,
    pub today: StatusCounts,
    /// Newest saved first
    pub recent: Vec<DaySummary>,
}

pub fn build_dashboard(roster_size: usize, attendance: &[DailyAttendance], today: &str) -> Dashboard {
    let today_counts = attendance
        .iter()
        .find(|a| a.date == today)
        .map(DailyAttendance::counts)
        .unwrap_or_default();

    // Saved order, last five, newest save first
    let recent = attendance
        .iter()
        .rev()
        .take(RECENT_DAYS)
        .map(|a| DaySummary {
            date: a.date.clone(),
            counts: a.counts(),
            total: a.records.len(),
        })
        .collect();

    Dashboard {
        roster_size,
        today: today_counts,
        recent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AttendanceStatus;
    use std::collections::BTreeMap;

    fn daily(date: &str, absent: usize) -> DailyAttendance {
        let mut records = BTreeMap::new();
        for i in 0..3 {
            let status = if i < absent {
                AttendanceStatus::Absent
            } else {
                AttendanceStatus::Present
            };
            records.insert(format!("10{}", i), status);
        }
        DailyAttendance::new(date, "T01", records)
    }

    #[test]
    fn test_today_counts() {
        let attendance = vec![daily("2024-01-01", 0), daily("2024-01-02", 2)];
        let dashboard = build_dashboard(3, &attendance, "2024-01-02");

        assert_eq!(dashboard.today.absent, 2);
        assert_eq!(dashboard.today.present, 1);
        assert_eq!(dashboard.recent[0].date, "2024-01-02");
    }

    #[test]
    fn test_no_attendance_today() {
        let dashboard = build_dashboard(0, &[], "2024-01-02");
        assert_eq!(dashboard.today, StatusCounts::default());
        assert!(dashboard.recent.is_empty());
    }

    #[test]
    fn test_recent_is_capped() {
        let attendance: Vec<DailyAttendance> = (1..=7)
            .map(|d| daily(&format!("2024-01-0{}", d), 1))
            .collect();
        let dashboard = build_dashboard(3, &attendance, "2024-01-07");

        assert_eq!(dashboard.recent.len(), RECENT_DAYS);
        assert_eq!(dashboard.recent[0].date, "2024-01-07");
        assert_eq!(dashboard.recent[4].date, "2024-01-03");
        assert_eq!(dashboard.recent[0].total, 3);
    }
}
