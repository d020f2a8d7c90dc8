//! Directory seeding commands.
//!
//! Master data is normally maintained elsewhere; these commands exist so a
//! fresh database can be populated from the shell.

use std::io::Write;

use anyhow::{Context, Result};

use sca_core::{CompanyId, Credential};
use sca_db::{Database, NewEmployee};

pub fn add_place<W: Write>(
    writer: &mut W,
    db: &mut Database,
    name: &str,
    active: bool,
) -> Result<()> {
    let name = required(name, "place name")?;
    let id = db.insert_place(name, active)?;
    writeln!(writer, "Added place {id}: {name}{}", suffix(active))?;
    Ok(())
}

pub fn add_company<W: Write>(
    writer: &mut W,
    db: &mut Database,
    name: &str,
    active: bool,
) -> Result<()> {
    let name = required(name, "company name")?;
    let id = db.insert_company(name, active)?;
    writeln!(writer, "Added company {id}: {name}{}", suffix(active))?;
    Ok(())
}

pub fn add_employee<W: Write>(
    writer: &mut W,
    db: &mut Database,
    credential: &str,
    first_name: &str,
    last_name: &str,
    company: i64,
    active: bool,
) -> Result<()> {
    let employee = NewEmployee {
        credential: Credential::new(credential).context("invalid credential")?,
        first_name: required(first_name, "first name")?.to_string(),
        last_name: required(last_name, "last name")?.to_string(),
        company_id: CompanyId::new(company),
        active,
    };
    let id = db.insert_employee(&employee)?;
    writeln!(
        writer,
        "Added employee {id}: {} {} ({}){}",
        employee.first_name,
        employee.last_name,
        employee.credential,
        suffix(active)
    )?;
    Ok(())
}

fn required<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        anyhow::bail!("{field} must not be empty");
    }
    Ok(value)
}

const fn suffix(active: bool) -> &'static str {
    if active { "" } else { " [inactive]" }
}
