//! Service lifecycle commands.
//!
//! Opening dates the service with the caller's `today`; listing shows the
//! current month unless a range or `--all` is given.

use std::io::Write;

use anyhow::Result;
use chrono::NaiveDate;

use sca_core::reporting::month_start;
use sca_core::{DurationMinutes, PlaceId, Service, ServiceId, SessionLedger};
use sca_db::Database;

use super::util::or_dash;

pub fn open<W: Write>(
    writer: &mut W,
    db: &mut Database,
    place: i64,
    projection: Option<i64>,
    guests: u32,
    today: NaiveDate,
) -> Result<()> {
    let id =
        SessionLedger::new(db).open_service_at(PlaceId::new(place), projection, guests, today)?;
    writeln!(writer, "Opened service {id} at place {place} for {today}")?;
    Ok(())
}

pub fn close<W: Write>(
    writer: &mut W,
    db: &mut Database,
    service: i64,
    diners: u32,
    guests: u32,
    duration: i64,
) -> Result<()> {
    let id = ServiceId::new(service);
    SessionLedger::new(db).close_service(id, diners, guests, duration)?;
    writeln!(
        writer,
        "Closed service {id}: {diners} diners, {guests} guests, {duration} min"
    )?;
    Ok(())
}

pub fn finalize<W: Write>(
    writer: &mut W,
    db: &mut Database,
    service: i64,
    guests: u32,
    duration: i64,
) -> Result<()> {
    let id = ServiceId::new(service);
    let duration = DurationMinutes::clamped(duration);
    let tallies = SessionLedger::new(db).finalize_service(id, guests, duration)?;
    writeln!(
        writer,
        "Finalized service {id}: {} diners, {} guests, {} min",
        tallies.total_diners,
        tallies.total_guests,
        tallies.duration.value()
    )?;
    Ok(())
}

pub fn reconcile<W: Write>(writer: &mut W, db: &mut Database, today: NaiveDate) -> Result<()> {
    let closed = SessionLedger::new(db).close_stale_services(today)?;
    writeln!(writer, "Closed {closed} stale service(s)")?;
    Ok(())
}

/// Which services `sca service list` shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    All,
    Range {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        place: Option<i64>,
    },
}

pub fn list<W: Write>(
    writer: &mut W,
    db: &mut Database,
    selection: Selection,
    today: NaiveDate,
    json: bool,
) -> Result<()> {
    let ledger = SessionLedger::new(db);
    let services = match selection {
        Selection::All => ledger.list_services()?,
        Selection::Range { from, to, place } => ledger.list_services_in_range(
            from.unwrap_or_else(|| month_start(today)),
            to.unwrap_or(today),
            place.map(PlaceId::new),
        )?,
    };

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&services)?)?;
    } else {
        write!(writer, "{}", format_services(&services))?;
    }
    Ok(())
}

/// Formats services as a table, newest first.
pub fn format_services(services: &[Service]) -> String {
    use std::fmt::Write;

    let mut output = String::new();
    if services.is_empty() {
        output.push_str("No services found.\n");
        return output;
    }

    let _ = writeln!(
        output,
        "{:<4}  {:<10}  {:>5}  {:<6}  {:>9}  {:>6}  {:>6}  {:>5}",
        "ID", "Date", "Place", "State", "Projected", "Diners", "Guests", "Total"
    );
    for service in services {
        let (diners, guests, total) = if service.is_open() {
            (None, None, None)
        } else {
            (
                Some(service.total_diners),
                Some(service.total_guests),
                Some(service.total_general()),
            )
        };
        let _ = writeln!(
            output,
            "{:<4}  {:<10}  {:>5}  {:<6}  {:>9}  {:>6}  {:>6}  {:>5}",
            service.id.to_string(),
            service.date.to_string(),
            service.place_id.to_string(),
            service.state().as_str(),
            or_dash(service.projected_headcount),
            or_dash(diners),
            or_dash(guests),
            or_dash(total),
        );
    }
    output
}
