mod bootstrap;
mod cli;

use anyhow::{Context, Result};
use attendance_tracker::{
    build_dashboard, error::AttendanceError, export, marking, report, report::StudentSummary,
    roster, session, start_of_month, store::Event, today, AttendanceStatus, ExportOptions, Store,
};
use clap::Parser;
use cli::{Cli, Command, RosterCommand};
use std::io::Read;
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();
    bootstrap::setup_logging(&cli.log_level)?;

    let db_path = cli.db.clone().unwrap_or_else(bootstrap::default_db_path);
    tracing::debug!(db = %db_path.display(), "opening store");
    let store = Store::open(&db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    run(&store, cli.command)
}

fn run(store: &Store, command: Command) -> Result<()> {
    match command {
        Command::Login { code, password } => {
            let outcome = session::login(store, &code, &password)?;
            println!("✓ {}", outcome.message());
        }
        Command::Logout => match session::logout(store)? {
            Some(staff) => println!("✓ Logged out {} successfully!", staff.code),
            None => println!("Nobody is logged in"),
        },
        Command::Whoami => {
            let staff = session::require_user(store)?;
            println!("{}", staff.code);
        }
        Command::Roster(cmd) => run_roster(store, cmd)?,
        Command::Mark { date, absent, on_duty } => {
            let staff = session::require_user(store)?;
            let date = date.unwrap_or_else(today);
            let outcome = marking::mark_attendance(
                store,
                &staff.code,
                &date,
                &marking::parse_reg_no_list(&absent),
                &marking::parse_reg_no_list(&on_duty),
            )?;

            let counts = outcome.attendance.counts();
            if outcome.replaced {
                println!("✓ Attendance for {} replaced", date);
            } else {
                println!("✓ Attendance saved successfully!");
            }
            println!(
                "  Present: {}  Absent: {}  On Duty: {}",
                counts.present, counts.absent, counts.on_duty
            );
            if !outcome.unknown.is_empty() {
                eprintln!("⚠️  Not in roster, ignored: {}", outcome.unknown.join(","));
            }
        }
        Command::Show { date } => {
            let staff = session::require_user(store)?;
            let date = date.unwrap_or_else(today);
            let (absent, on_duty) = marking::load_saved(store, &staff.code, &date)?;
            println!("{:<8} {}", "Date:", date);
            println!("{:<8} {}", format!("{}:", AttendanceStatus::Absent.name()), absent.join(","));
            println!("{:<8} {}", format!("{}:", AttendanceStatus::OnDuty.name()), on_duty.join(","));
        }
        Command::Report { start, end } => {
            let staff = session::require_user(store)?;
            let start = start.unwrap_or_else(start_of_month);
            let end = end.unwrap_or_else(today);
            report::validate_range(&start, &end)?;

            let roster = store.get_roster(&staff.code)?;
            let snapshots = store.get_attendance_in_date_range(&staff.code, &start, &end)?;
            let summaries = report::aggregate(&roster, &snapshots, &start, &end);

            for line in report_lines(&start, &end, &summaries) {
                println!("{}", line);
            }
        }
        Command::Export { start, end, output_dir, no_colors, no_summary } => {
            let staff = session::require_user(store)?;
            let start = start.unwrap_or_else(start_of_month);
            let end = end.unwrap_or_else(today);
            let options = ExportOptions {
                include_colors: !no_colors,
                include_summary: !no_summary,
            };
            let path = export::export_report(store, &staff.code, &start, &end, &output_dir, options)?;
            println!("✓ Excel report exported successfully: {}", path.display());
        }
        Command::Dashboard => {
            let staff = session::require_user(store)?;
            let roster = store.get_roster(&staff.code)?;
            let attendance = store.get_all_attendance(&staff.code)?;
            let dashboard = build_dashboard(roster.len(), &attendance, &today());

            println!("Students: {}", dashboard.roster_size);
            println!(
                "Today:    Present {}  Absent {}  On Duty {}",
                dashboard.today.present, dashboard.today.absent, dashboard.today.on_duty
            );
            if dashboard.recent.is_empty() {
                println!("No attendance recorded yet");
            }
            for day in &dashboard.recent {
                println!(
                    "  {}  P {:>3}  AB {:>3}  OD {:>3}  / {}",
                    day.date, day.counts.present, day.counts.absent, day.counts.on_duty, day.total
                );
            }
        }
    }

    Ok(())
}

fn run_roster(store: &Store, command: RosterCommand) -> Result<()> {
    let staff = session::require_user(store)?;

    match command {
        RosterCommand::Import { file } => {
            let text = read_input(&file)?;
            if text.trim().is_empty() {
                return Err(AttendanceError::EmptyInput.into());
            }

            let students = roster::parse_roster(&text, &staff.code)
                .map_err(|errors| AttendanceError::ImportRejected(roster::error_messages(&errors)))?;

            store.save_roster(&staff.code, &students)?;
            store.record_event(&Event::new(
                "roster_imported",
                &staff.code,
                serde_json::json!({ "count": students.len() }),
            ))?;
            tracing::info!(staff = %staff.code, count = students.len(), "roster imported");
            println!("✓ Imported {} students successfully!", students.len());
        }
        RosterCommand::Export { output } => {
            let students = store.get_roster(&staff.code)?;
            if students.is_empty() {
                return Err(AttendanceError::EmptyRoster.into());
            }
            let text = roster::export_roster(&students)?;

            let output = output
                .unwrap_or_else(|| roster::export_file_name(&staff.code, &today()).into());
            if output.as_os_str() == "-" {
                println!("{}", text);
            } else {
                std::fs::write(&output, &text)
                    .with_context(|| format!("Failed to write {}", output.display()))?;
                println!("✓ Roster exported successfully: {}", output.display());
            }
        }
        RosterCommand::List { search } => {
            let students = store.get_roster(&staff.code)?;
            let matches = roster::search_roster(&students, search.as_deref().unwrap_or(""));
            for s in &matches {
                println!("{:<12} {}", s.reg_no, s.name);
            }
            println!("{} of {} students", matches.len(), students.len());
        }
        RosterCommand::Remove { reg_no } => {
            let students = store.get_roster(&staff.code)?;
            let remaining = roster::remove_student(&students, &reg_no)?;
            store.save_roster(&staff.code, &remaining)?;
            store.record_event(&Event::new(
                "student_removed",
                &staff.code,
                serde_json::json!({ "reg_no": reg_no }),
            ))?;
            println!("✓ Student removed successfully!");
        }
        RosterCommand::Clear { yes } => {
            if !yes {
                anyhow::bail!("Refusing to clear the roster without --yes");
            }
            store.save_roster(&staff.code, &[])?;
            store.record_event(&Event::new("roster_cleared", &staff.code, serde_json::json!({})))?;
            println!("✓ Roster cleared successfully!");
        }
    }

    Ok(())
}

/// Per-student totals table followed by the class-wide sums
fn report_lines(start: &str, end: &str, summaries: &[StudentSummary]) -> Vec<String> {
    let mut lines = vec![format!("Attendance {} to {}", start, end)];
    if summaries.is_empty() {
        lines.push("No data available for the selected date range.".to_string());
        return lines;
    }

    lines.push(format!(
        "{:<12} {:<24} {:>7} {:>7} {:>7}",
        "Reg No",
        "Name",
        AttendanceStatus::Present.name(),
        AttendanceStatus::Absent.name(),
        AttendanceStatus::OnDuty.name()
    ));
    for s in summaries {
        lines.push(format!(
            "{:<12} {:<24} {:>7} {:>7} {:>7}",
            s.reg_no, s.name, s.total_present, s.total_absent, s.total_on_duty
        ));
    }

    let totals = report::class_totals(summaries);
    lines.push(format!(
        "{:<37} {:>7} {:>7} {:>7}",
        "Total", totals.present, totals.absent, totals.on_duty
    ));
    lines
}

/// Read a file, or stdin for "-"
fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read roster from stdin")?;
        return Ok(text);
    }
    Ok(roster::read_roster_file(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_import_then_report_flow() {
        let dir = tempfile::TempDir::new().unwrap();
        let csv_path = dir.path().join("class.csv");
        std::fs::write(&csv_path, "101,Arun Kumar\n102,Ganesh Raj\n").unwrap();

        let store = Store::open_in_memory().unwrap();
        session::login(&store, "T01", "pw").unwrap();

        run(&store, Command::Roster(RosterCommand::Import { file: csv_path })).unwrap();
        assert_eq!(store.get_roster("T01").unwrap().len(), 2);

        run(
            &store,
            Command::Mark {
                date: Some("2024-01-01".to_string()),
                absent: "101".to_string(),
                on_duty: String::new(),
            },
        )
        .unwrap();

        let roster = store.get_roster("T01").unwrap();
        let snapshots = store.get_all_attendance("T01").unwrap();
        let summaries = report::aggregate(&roster, &snapshots, "2024-01-01", "2024-01-01");
        assert_eq!(summaries[0].total_absent, 1);
        assert_eq!(summaries[1].total_present, 1);
    }

    #[test]
    fn test_rejected_import_keeps_existing_roster() {
        let dir = tempfile::TempDir::new().unwrap();
        let good = dir.path().join("good.csv");
        let bad = dir.path().join("bad.csv");
        std::fs::write(&good, "101,Arun Kumar").unwrap();
        std::fs::write(&bad, "201,New\n201,Dup").unwrap();

        let store = Store::open_in_memory().unwrap();
        session::login(&store, "T01", "pw").unwrap();
        run(&store, Command::Roster(RosterCommand::Import { file: good })).unwrap();

        let err = run(&store, Command::Roster(RosterCommand::Import { file: bad })).unwrap_err();
        assert!(err.to_string().contains("Line 2: Duplicate registration number: 201"));

        let roster = store.get_roster("T01").unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].reg_no, "101");
    }

    #[test]
    fn test_commands_require_login() {
        let store = Store::open_in_memory().unwrap();
        let err = run(&store, Command::Dashboard).unwrap_err();
        assert!(err.downcast_ref::<AttendanceError>().is_some());
    }

    #[test]
    fn test_clear_requires_confirmation() {
        let store = Store::open_in_memory().unwrap();
        session::login(&store, "T01", "pw").unwrap();
        store
            .save_roster("T01", &[attendance_tracker::Student::new("101", "Arun", "T01")])
            .unwrap();

        assert!(run(&store, Command::Roster(RosterCommand::Clear { yes: false })).is_err());
        assert_eq!(store.get_roster("T01").unwrap().len(), 1);

        run(&store, Command::Roster(RosterCommand::Clear { yes: true })).unwrap();
        assert!(store.get_roster("T01").unwrap().is_empty());
    }

    #[test]
    fn test_report_lines_end_with_class_totals() {
        let roster = vec![
            attendance_tracker::Student::new("101", "Arun Kumar", "T01"),
            attendance_tracker::Student::new("102", "Ganesh Raj", "T01"),
        ];
        let mut records = std::collections::BTreeMap::new();
        records.insert("101".to_string(), AttendanceStatus::Absent);
        records.insert("102".to_string(), AttendanceStatus::OnDuty);
        let snapshots = vec![attendance_tracker::DailyAttendance::new("2024-01-01", "T01", records)];

        let summaries = report::aggregate(&roster, &snapshots, "2024-01-01", "2024-01-31");
        let lines = report_lines("2024-01-01", "2024-01-31", &summaries);

        assert_eq!(lines.len(), 5);
        assert!(lines[1].contains("Present") && lines[1].contains("On Duty"));
        let total: Vec<&str> = lines[4].split_whitespace().collect();
        assert_eq!(total, vec!["Total", "0", "1", "1"]);
    }

    #[test]
    fn test_empty_report_says_no_data() {
        let lines = report_lines("2024-01-01", "2024-01-31", &[]);
        assert_eq!(
            lines,
            vec![
                "Attendance 2024-01-01 to 2024-01-31".to_string(),
                "No data available for the selected date range.".to_string(),
            ]
        );
    }
}
