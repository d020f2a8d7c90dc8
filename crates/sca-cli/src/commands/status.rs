//! Status command showing today's running service.

use std::io::Write;

use anyhow::Result;
use chrono::NaiveDate;

use sca_core::model::format_time_of_day;
use sca_core::{Reports, ServiceOverview};
use sca_db::Database;

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    today: NaiveDate,
    recent_limit: usize,
    json: bool,
) -> Result<()> {
    let overview = Reports::new(db).service_overview(today, recent_limit)?;

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&overview)?)?;
    } else {
        write_overview(writer, &overview)?;
    }
    Ok(())
}

fn write_overview<W: Write>(writer: &mut W, overview: &ServiceOverview) -> Result<()> {
    let Some(service) = &overview.service else {
        writeln!(writer, "No service running today.")?;
        return Ok(());
    };

    writeln!(
        writer,
        "Service {} at place {} ({})",
        service.id, service.place_id, service.date
    )?;
    writeln!(writer, "Registered: {}", overview.registered)?;
    if let Some(coverage) = overview.coverage {
        writeln!(
            writer,
            "Coverage: {:.1}% ({} pending)",
            coverage.percentage, coverage.pending
        )?;
    }

    if overview.recent.is_empty() {
        writeln!(writer, "No registrations yet.")?;
        return Ok(());
    }

    writeln!(writer, "Recent:")?;
    for entry in &overview.recent {
        let name = entry.employee_name.as_deref().unwrap_or("(guest)");
        let company = entry.company_name.as_deref().unwrap_or("-");
        writeln!(
            writer,
            "- {}  {name} / {company}",
            format_time_of_day(entry.registration.time)
        )?;
    }
    Ok(())
}
