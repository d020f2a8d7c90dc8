//! Attendance reports.

use std::io::Write;

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;

use sca_core::{
    AttendanceError, CompanyId, CompanyStats, Coverage, DirectoryStore, RegistrationStore,
    Reports, ServiceId, ServiceStore,
};
use sca_db::Database;

/// Company statistics with the company's display name.
#[derive(Debug, Serialize)]
pub struct CompanyReport {
    pub company_id: CompanyId,
    pub company_name: String,
    pub as_of: NaiveDate,
    #[serde(flatten)]
    pub stats: CompanyStats,
}

/// Registrations against a service's projection.
#[derive(Debug, Serialize)]
pub struct CoverageReport {
    pub service_id: ServiceId,
    pub registered: u32,
    pub projected_headcount: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage: Option<Coverage>,
}

pub fn company<W: Write>(
    writer: &mut W,
    db: &Database,
    company: i64,
    as_of: NaiveDate,
    json: bool,
) -> Result<()> {
    let company_id = CompanyId::new(company);
    let company_name = db
        .find_company_by_id(company_id)?
        .map(|company| company.name)
        .ok_or_else(|| AttendanceError::not_found("company", company_id))?;
    let stats = Reports::new(db).company_stats(company_id, as_of)?;
    let report = CompanyReport {
        company_id,
        company_name,
        as_of,
        stats,
    };

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
        return Ok(());
    }

    writeln!(writer, "{} (as of {})", report.company_name, report.as_of)?;
    writeln!(
        writer,
        "Employees: {} ({} inactive)",
        report.stats.total_employees, report.stats.inactive_employees
    )?;
    writeln!(
        writer,
        "Attendance this month: {}",
        report.stats.attendance_this_month
    )?;
    writeln!(writer, "Average per day: {:.1}", report.stats.average_per_day)?;
    Ok(())
}

pub fn coverage<W: Write>(writer: &mut W, db: &Database, service: i64, json: bool) -> Result<()> {
    let service_id = ServiceId::new(service);
    let service = db
        .find_service(service_id)?
        .ok_or_else(|| AttendanceError::not_found("service", service_id))?;
    let report = CoverageReport {
        service_id,
        registered: db.count_for_service(service_id)?,
        projected_headcount: service.projected_headcount,
        coverage: Reports::new(db).coverage_for(&service)?,
    };

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
        return Ok(());
    }

    match (report.coverage, report.projected_headcount) {
        (Some(coverage), Some(projected)) => writeln!(
            writer,
            "Service {}: {} of {projected} projected ({:.1}%), {} pending",
            report.service_id, report.registered, coverage.percentage, coverage.pending
        )?,
        _ => writeln!(
            writer,
            "Service {}: {} registered, no projection",
            report.service_id, report.registered
        )?,
    }
    Ok(())
}
