use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sca_cli::commands::service::Selection;
use sca_cli::commands::{directory, register, report, service, status};
use sca_cli::{
    Cli, Commands, Config, DirectoryAction, RegisterAction, ReportAction, ServiceAction,
};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(sca_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = sca_db::Database::open(&config.database_path).with_context(|| {
        format!("failed to open {}", config.database_path.display())
    })?;
    Ok((db, config))
}

#[expect(
    clippy::too_many_lines,
    reason = "CLI command dispatch is inherently verbose"
)]
fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let (mut db, config) = open_database(cli.config.as_deref())?;
    let now = Local::now().naive_local();
    let today = now.date();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::Service(action) => match action {
            ServiceAction::Open {
                place,
                projection,
                guests,
            } => service::open(&mut out, &mut db, *place, *projection, *guests, today)?,
            ServiceAction::Close {
                service: id,
                diners,
                guests,
                duration,
            } => service::close(&mut out, &mut db, *id, *diners, *guests, *duration)?,
            ServiceAction::Finalize {
                service: id,
                guests,
                duration,
            } => service::finalize(&mut out, &mut db, *id, *guests, *duration)?,
            ServiceAction::List {
                from,
                to,
                place,
                all,
                json,
            } => {
                let selection = if *all {
                    Selection::All
                } else {
                    Selection::Range {
                        from: *from,
                        to: *to,
                        place: *place,
                    }
                };
                service::list(&mut out, &mut db, selection, today, *json)?;
            }
            ServiceAction::Reconcile => service::reconcile(&mut out, &mut db, today)?,
        },
        Commands::Status { json } => {
            status::run(&mut out, &db, today, config.recent_registrations, *json)?;
        }
        Commands::Register(action) => match action {
            RegisterAction::Scan {
                credential,
                service,
                json,
            } => register::scan(&mut out, &mut db, credential, *service, now, *json)?,
            RegisterAction::Employees { ids, service, json } => {
                register::employees(&mut out, &mut db, ids, *service, now, *json)?;
            }
            RegisterAction::Guest { company, service } => {
                register::guest(&mut out, &mut db, *company, *service, now)?;
            }
            RegisterAction::Pending {
                service,
                company,
                name,
                json,
            } => register::pending(
                &mut out,
                &mut db,
                *service,
                *company,
                name.as_deref(),
                now,
                *json,
            )?,
        },
        Commands::Report(action) => match action {
            ReportAction::Company {
                company,
                as_of,
                json,
            } => report::company(&mut out, &db, *company, as_of.unwrap_or(today), *json)?,
            ReportAction::Coverage { service, json } => {
                report::coverage(&mut out, &db, *service, *json)?;
            }
        },
        Commands::Directory(action) => match action {
            DirectoryAction::AddPlace { name, inactive } => {
                directory::add_place(&mut out, &mut db, name, !inactive)?;
            }
            DirectoryAction::AddCompany { name, inactive } => {
                directory::add_company(&mut out, &mut db, name, !inactive)?;
            }
            DirectoryAction::AddEmployee {
                credential,
                first_name,
                last_name,
                company,
                inactive,
            } => directory::add_employee(
                &mut out,
                &mut db,
                credential,
                first_name,
                last_name,
                *company,
                !inactive,
            )?,
        },
    }

    out.flush()?;
    Ok(())
}
