use clap::{Parser, Subcommand};
use std::path::PathBuf;

// ── Cli ────────────────────────────────────────────────────────────────────────

/// Class attendance tracking: rosters, daily marking and reports
#[derive(Parser, Debug)]
#[command(name = "attendance", version)]
pub struct Cli {
    /// Database file
    #[arg(long, env = "ATTENDANCE_DB", global = true)]
    pub db: Option<PathBuf>,

    /// Logging level
    #[arg(
        long,
        default_value = "WARNING",
        global = true,
        value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"]
    )]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in, creating the account on first use
    Login { code: String, password: String },

    /// End the current session
    Logout,

    /// Show the logged-in staff code
    Whoami,

    /// Manage the class roster
    #[command(subcommand)]
    Roster(RosterCommand),

    /// Save attendance for a date; everyone not listed is present
    Mark {
        /// Date (yyyy-mm-dd), defaults to today
        #[arg(long)]
        date: Option<String>,

        /// Comma-separated absent registration numbers
        #[arg(long, default_value = "")]
        absent: String,

        /// Comma-separated on-duty registration numbers
        #[arg(long, default_value = "")]
        on_duty: String,
    },

    /// Show the saved attendance for a date
    Show {
        #[arg(long)]
        date: Option<String>,
    },

    /// Print per-student totals for a date range
    Report {
        /// Defaults to the first day of this month
        #[arg(long)]
        start: Option<String>,

        /// Defaults to today
        #[arg(long)]
        end: Option<String>,
    },

    /// Write the attendance report as an .xlsx workbook
    Export {
        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        end: Option<String>,

        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Do not colour status cells
        #[arg(long)]
        no_colors: bool,

        /// Leave out the total columns
        #[arg(long)]
        no_summary: bool,
    },

    /// Today's counts and recent days
    Dashboard,
}

#[derive(Subcommand, Debug)]
pub enum RosterCommand {
    /// Replace the roster from a `regNo,name` file ("-" reads stdin)
    Import { file: PathBuf },

    /// Write the roster as `regNo,name` lines
    Export {
        /// Output file, "-" for stdout. Defaults to roster_<code>_<date>.csv
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// List students
    List {
        /// Filter by registration number or name
        #[arg(long)]
        search: Option<String>,
    },

    /// Remove one student
    Remove { reg_no: String },

    /// Remove every student
    Clear {
        /// Confirm; the roster cannot be recovered
        #[arg(long)]
        yes: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mark() {
        let cli = Cli::parse_from([
            "attendance", "mark", "--date", "2024-01-01", "--absent", "101,102",
        ]);
        match cli.command {
            Command::Mark { date, absent, on_duty } => {
                assert_eq!(date.as_deref(), Some("2024-01-01"));
                assert_eq!(absent, "101,102");
                assert_eq!(on_duty, "");
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(cli.log_level, "WARNING");
    }

    #[test]
    fn test_parse_roster_import_with_global_db() {
        let cli = Cli::parse_from(["attendance", "roster", "import", "class.csv", "--db", "/tmp/a.db"]);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/a.db")));
        assert!(matches!(
            cli.command,
            Command::Roster(RosterCommand::Import { .. })
        ));
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let result = Cli::try_parse_from(["attendance", "--log-level", "LOUD", "whoami"]);
        assert!(result.is_err());
    }
}
