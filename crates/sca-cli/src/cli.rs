//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Dining service attendance.
///
/// Opens and closes dining services, records who ate at each one and
/// reports attendance per company.
#[derive(Debug, Parser)]
#[command(name = "sca", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Open, close and list dining services.
    #[command(subcommand)]
    Service(ServiceAction),

    /// Show today's running service and its latest registrations.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Record attendance.
    #[command(subcommand)]
    Register(RegisterAction),

    /// Attendance reports.
    #[command(subcommand)]
    Report(ReportAction),

    /// Seed places, companies and employees.
    #[command(subcommand)]
    Directory(DirectoryAction),
}

/// Service lifecycle actions.
#[derive(Debug, Subcommand)]
pub enum ServiceAction {
    /// Open a service at a place, dated today.
    Open {
        /// Place id.
        #[arg(long)]
        place: i64,

        /// Projected headcount (0-1000).
        #[arg(long)]
        projection: Option<i64>,

        /// Invited guests expected at the service.
        #[arg(long, default_value_t = 0)]
        guests: u32,
    },

    /// Close a service with explicit tallies.
    Close {
        /// Service id.
        service: i64,

        /// Total diners.
        #[arg(long)]
        diners: u32,

        /// Total guests.
        #[arg(long)]
        guests: u32,

        /// Duration in minutes (at least 1).
        #[arg(long, default_value_t = 1)]
        duration: i64,
    },

    /// Close a service counting its registrations as diners.
    Finalize {
        /// Service id.
        service: i64,

        /// Total guests.
        #[arg(long, default_value_t = 0)]
        guests: u32,

        /// Duration in minutes. Values below 1 are raised to 1.
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        duration: i64,
    },

    /// List services.
    List {
        /// First date (YYYY-MM-DD). Defaults to the first of the current month.
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Only services at this place.
        #[arg(long)]
        place: Option<i64>,

        /// List every service regardless of date.
        #[arg(long, conflicts_with_all = ["from", "to", "place"])]
        all: bool,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Close open services left over from previous days.
    Reconcile,
}

/// Attendance recording actions.
///
/// Each action targets today's running service unless `--service` is given.
#[derive(Debug, Subcommand)]
pub enum RegisterAction {
    /// Register the employee holding a scanned credential.
    Scan {
        /// Credential as read by the badge reader.
        credential: String,

        /// Service id.
        #[arg(long)]
        service: Option<i64>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Register several employees by id.
    Employees {
        /// Employee ids.
        #[arg(required = true)]
        ids: Vec<i64>,

        /// Service id.
        #[arg(long)]
        service: Option<i64>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Register a guest billed to a company.
    Guest {
        /// Company id.
        #[arg(long)]
        company: i64,

        /// Service id.
        #[arg(long)]
        service: Option<i64>,
    },

    /// List active employees who have not registered yet.
    Pending {
        /// Service id.
        #[arg(long)]
        service: Option<i64>,

        /// Only employees of this company.
        #[arg(long)]
        company: Option<i64>,

        /// Only names containing this text.
        #[arg(long)]
        name: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Reporting actions.
#[derive(Debug, Subcommand)]
pub enum ReportAction {
    /// Employee and attendance figures for a company this month.
    Company {
        /// Company id.
        company: i64,

        /// Report as of this date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        as_of: Option<NaiveDate>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Registrations against a service's projection.
    Coverage {
        /// Service id.
        service: i64,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Directory seeding actions.
#[derive(Debug, Subcommand)]
pub enum DirectoryAction {
    /// Add a place.
    AddPlace {
        name: String,

        /// Store the place as inactive.
        #[arg(long)]
        inactive: bool,
    },

    /// Add a company.
    AddCompany {
        name: String,

        /// Store the company as inactive.
        #[arg(long)]
        inactive: bool,
    },

    /// Add an employee.
    AddEmployee {
        /// Badge credential.
        credential: String,

        first_name: String,

        last_name: String,

        /// Company id.
        #[arg(long)]
        company: i64,

        /// Store the employee as inactive.
        #[arg(long)]
        inactive: bool,
    },
}
