//! Shared utilities for CLI commands.

use anyhow::{Context, Result};
use chrono::NaiveDate;

use sca_core::{Service, ServiceId, SessionLedger};
use sca_db::Database;

/// Resolves the service a command acts on.
///
/// An explicit id wins; otherwise today's running service is used.
pub fn resolve_service(
    db: &mut Database,
    service: Option<i64>,
    today: NaiveDate,
) -> Result<Service> {
    let ledger = SessionLedger::new(db);
    match service {
        Some(id) => Ok(ledger.find_service(ServiceId::new(id))?),
        None => ledger.current_service(today)?.context(
            "no service is running today. Open one with 'sca service open' or pass --service",
        ),
    }
}

/// Formats an optional count, using `-` when absent.
pub fn or_dash(value: Option<u32>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
