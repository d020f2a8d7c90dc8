//! Attendance recording commands.
//!
//! Every command targets today's running service unless a service id is
//! given. The place is always taken from the service itself.

use std::io::Write;

use anyhow::Result;
use chrono::NaiveDateTime;

use sca_core::{AttendanceRecorder, BatchSummary, CompanyId, EmployeeId};
use sca_db::Database;

use super::util::resolve_service;

pub fn scan<W: Write>(
    writer: &mut W,
    db: &mut Database,
    credential: &str,
    service: Option<i64>,
    now: NaiveDateTime,
    json: bool,
) -> Result<()> {
    let service = resolve_service(db, service, now.date())?;
    let confirmation = AttendanceRecorder::new(db).register_by_credential_at(
        credential,
        service.id,
        service.place_id,
        now,
    )?;

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&confirmation)?)?;
    } else {
        writeln!(
            writer,
            "Registered {} ({}) at {}",
            confirmation.employee_name,
            confirmation.company_name,
            confirmation.formatted_time()
        )?;
    }
    Ok(())
}

pub fn employees<W: Write>(
    writer: &mut W,
    db: &mut Database,
    ids: &[i64],
    service: Option<i64>,
    now: NaiveDateTime,
    json: bool,
) -> Result<()> {
    let service = resolve_service(db, service, now.date())?;
    let ids: Vec<EmployeeId> = ids.iter().copied().map(EmployeeId::new).collect();
    let outcome =
        AttendanceRecorder::new(db).register_batch_at(&ids, service.id, service.place_id, now);
    let summary = BatchSummary::from(&outcome);

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&summary)?)?;
        return Ok(());
    }

    writeln!(
        writer,
        "Registered {} of {} employee(s) in service {}",
        summary.count,
        ids.len(),
        service.id
    )?;
    for rejection in &summary.rejected {
        writeln!(
            writer,
            "- skipped employee {}: {}",
            rejection.employee_id, rejection.reason
        )?;
    }
    Ok(())
}

pub fn guest<W: Write>(
    writer: &mut W,
    db: &mut Database,
    company: i64,
    service: Option<i64>,
    now: NaiveDateTime,
) -> Result<()> {
    let service = resolve_service(db, service, now.date())?;
    let registration = AttendanceRecorder::new(db).register_guest_at(
        CompanyId::new(company),
        service.id,
        service.place_id,
        now,
    )?;
    writeln!(
        writer,
        "Registered guest for company {} in service {}",
        registration.company_id, registration.service_id
    )?;
    Ok(())
}

pub fn pending<W: Write>(
    writer: &mut W,
    db: &mut Database,
    service: Option<i64>,
    company: Option<i64>,
    name: Option<&str>,
    now: NaiveDateTime,
    json: bool,
) -> Result<()> {
    let service = resolve_service(db, service, now.date())?;
    let employees = AttendanceRecorder::new(db).pending_employees(
        service.id,
        company.map(CompanyId::new),
        name,
    )?;

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&employees)?)?;
        return Ok(());
    }

    if employees.is_empty() {
        writeln!(writer, "Everyone has registered in service {}.", service.id)?;
        return Ok(());
    }
    for employee in &employees {
        writeln!(
            writer,
            "{:<6}  {:<10}  {}",
            employee.id.to_string(),
            employee.credential.as_str(),
            employee.full_name()
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;
    use insta::assert_snapshot;
    use sca_core::{Credential, ServiceId, SessionLedger};
    use sca_db::NewEmployee;

    struct Seed {
        db: Database,
        company: CompanyId,
    }

    fn seeded() -> Seed {
        let mut db = Database::open_in_memory().unwrap();
        let place = db.insert_place("Comedor", true).unwrap();
        let company = db.insert_company("Acme", true).unwrap();
        for (credential, first, last, active) in [
            ("rf001", "Ana", "Pérez", true),
            ("rf002", "Bruno", "Díaz", true),
            ("rf003", "Carla", "Ruiz", false),
        ] {
            db.insert_employee(&NewEmployee {
                credential: Credential::new(credential).unwrap(),
                first_name: first.to_string(),
                last_name: last.to_string(),
                company_id: company,
                active,
            })
            .unwrap();
        }
        SessionLedger::new(&mut db)
            .open_service_at(place, Some(50), 0, today())
            .unwrap();
        Seed { db, company }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn noon() -> NaiveDateTime {
        today().and_hms_opt(12, 15, 42).unwrap()
    }

    fn output(buffer: Vec<u8>) -> String {
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn scan_confirms_registration() {
        let mut seed = seeded();
        let mut out = Vec::new();
        scan(&mut out, &mut seed.db, " rf001 ", None, noon(), false).unwrap();
        assert_snapshot!(output(out), @"Registered Ana Pérez (Acme) at 12:15");
    }

    #[test]
    fn rescan_is_rejected() {
        let mut seed = seeded();
        scan(&mut Vec::new(), &mut seed.db, "RF001", None, noon(), false).unwrap();
        let err = scan(&mut Vec::new(), &mut seed.db, "rf001", None, noon(), false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "employee 1 is already registered in service 1"
        );
    }

    #[test]
    fn scan_json_uses_short_time() {
        let mut seed = seeded();
        let mut out = Vec::new();
        scan(&mut out, &mut seed.db, "rf002", None, noon(), true).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["employee_name"], "Bruno Díaz");
        assert_eq!(value["company_name"], "Acme");
        assert_eq!(value["time"], "12:15");
    }

    #[test]
    fn scan_without_running_service_fails() {
        let mut seed = seeded();
        let tomorrow = noon() + chrono::Duration::days(1);
        let err = scan(&mut Vec::new(), &mut seed.db, "rf001", None, tomorrow, false).unwrap_err();
        assert!(err.to_string().starts_with("no service is running today"));
    }

    #[test]
    fn employees_reports_skipped_ids() {
        let mut seed = seeded();
        scan(&mut Vec::new(), &mut seed.db, "rf002", None, noon(), false).unwrap();

        let mut out = Vec::new();
        employees(&mut out, &mut seed.db, &[1, 2, 3, 9], None, noon(), false).unwrap();
        assert_snapshot!(output(out), @r"
        Registered 1 of 4 employee(s) in service 1
        - skipped employee 2: employee 2 is already registered in service 1
        - skipped employee 3: employee 3 is inactive
        - skipped employee 9: employee 9 not found
        ");
    }

    #[test]
    fn employees_json_summary() {
        let mut seed = seeded();
        let mut out = Vec::new();
        employees(&mut out, &mut seed.db, &[1, 2], Some(1), noon(), true).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["count"], 2);
        assert_eq!(value["rejected"], serde_json::json!([]));
    }

    #[test]
    fn guests_can_repeat() {
        let mut seed = seeded();
        for _ in 0..2 {
            let mut out = Vec::new();
            guest(&mut out, &mut seed.db, seed.company.get(), None, noon()).unwrap();
            insta::allow_duplicates! {
                assert_snapshot!(output(out), @"Registered guest for company 1 in service 1");
            }
        }
        assert_eq!(
            AttendanceRecorder::new(&mut seed.db)
                .count_for_service(ServiceId::new(1))
                .unwrap(),
            2
        );
    }

    #[test]
    fn pending_lists_active_unregistered_employees() {
        let mut seed = seeded();
        scan(&mut Vec::new(), &mut seed.db, "rf001", None, noon(), false).unwrap();

        let mut out = Vec::new();
        pending(&mut out, &mut seed.db, None, None, None, noon(), false).unwrap();
        assert_snapshot!(output(out), @"2       RF002       Bruno Díaz");

        scan(&mut Vec::new(), &mut seed.db, "rf002", None, noon(), false).unwrap();
        let mut out = Vec::new();
        pending(&mut out, &mut seed.db, Some(1), Some(1), None, noon(), false).unwrap();
        assert_snapshot!(output(out), @"Everyone has registered in service 1.");
    }
}
