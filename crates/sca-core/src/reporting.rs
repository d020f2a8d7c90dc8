//! Read-only statistics over services and registrations.

use std::cmp::Ordering;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::error::AttendanceError;
use crate::model::{RegistrationEntry, Service};
use crate::store::AttendanceStore;
use crate::types::CompanyId;

/// Attendance figures for a company's current month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyStats {
    pub total_employees: u32,
    pub inactive_employees: u32,
    pub attendance_this_month: u32,
    pub average_per_day: f64,
}

/// How much of a service's projection has shown up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coverage {
    pub percentage: f64,
    pub pending: u32,
}

/// Snapshot of today's running service for the status screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceOverview {
    pub service: Option<Service>,
    pub registered: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage: Option<Coverage>,
    pub recent: Vec<RegistrationEntry>,
}

/// Coverage of a service's projection, if it has a positive projection.
pub fn service_coverage(service: &Service, registrations: u32) -> Option<Coverage> {
    let projected = service.projected_headcount.filter(|p| *p > 0)?;
    Some(Coverage {
        percentage: f64::from(registrations) / f64::from(projected) * 100.0,
        pending: projected.saturating_sub(registrations),
    })
}

/// Average attendance per elapsed day of the month, rounded to one decimal.
///
/// The first day of the month counts as one elapsed day. Midpoints round
/// half to even on the exact quotient, so `0.25` becomes `0.2`.
pub fn average_per_day(attendance: u32, as_of: NaiveDate) -> f64 {
    let days = u64::from(as_of.day().max(1));
    let tenths = u64::from(attendance) * 10;
    let (quotient, remainder) = (tenths / days, tenths % days);
    let rounded = match (remainder * 2).cmp(&days) {
        Ordering::Less => quotient,
        Ordering::Greater => quotient + 1,
        Ordering::Equal => quotient + quotient % 2,
    };
    f64::from(u32::try_from(rounded).unwrap_or(u32::MAX)) / 10.0
}

/// First day of `date`'s month.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Read-only reports over an attendance store.
pub struct Reports<'a, S> {
    store: &'a S,
}

impl<'a, S: AttendanceStore> Reports<'a, S> {
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Employee and attendance figures for `company_id` over the month of `as_of`.
    pub fn company_stats(
        &self,
        company_id: CompanyId,
        as_of: NaiveDate,
    ) -> Result<CompanyStats, AttendanceError> {
        if self.store.find_company_by_id(company_id)?.is_none() {
            return Err(AttendanceError::not_found("company", company_id));
        }

        let employees = self.store.list_employees(Some(company_id))?;
        let total_employees = count(employees.len());
        let inactive_employees = count(employees.iter().filter(|e| !e.active).count());

        let attendance = self
            .store
            .list_for_company_in_range(company_id, month_start(as_of), as_of)?;
        let attendance_this_month = count(attendance.len());

        Ok(CompanyStats {
            total_employees,
            inactive_employees,
            attendance_this_month,
            average_per_day: average_per_day(attendance_this_month, as_of),
        })
    }

    /// Coverage for a stored service, counting its registrations.
    pub fn coverage_for(&self, service: &Service) -> Result<Option<Coverage>, AttendanceError> {
        let registrations = self.store.count_for_service(service.id)?;
        Ok(service_coverage(service, registrations))
    }

    /// Today's running service with its most recent registrations.
    ///
    /// A service left open from a previous day is not reported as running.
    pub fn service_overview(
        &self,
        today: NaiveDate,
        recent_limit: usize,
    ) -> Result<ServiceOverview, AttendanceError> {
        let Some(service) = self
            .store
            .list_open_services()?
            .into_iter()
            .find(|s| s.is_actionable_on(today))
        else {
            return Ok(ServiceOverview {
                service: None,
                registered: 0,
                coverage: None,
                recent: Vec::new(),
            });
        };

        let mut recent = self.store.list_for_service(service.id)?;
        let registered = count(recent.len());
        recent.truncate(recent_limit);

        Ok(ServiceOverview {
            coverage: service_coverage(&service, registered),
            service: Some(service),
            registered,
            recent,
        })
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::types::{PlaceId, ServiceId};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn service_with_projection(projected_headcount: Option<u32>) -> Service {
        Service {
            id: ServiceId::new(1),
            place_id: PlaceId::new(1),
            date: date(2025, 3, 10),
            projected_headcount,
            invited_guests: None,
            duration_minutes: None,
            total_diners: 0,
            total_guests: 0,
        }
    }

    #[test]
    #[expect(clippy::float_cmp, reason = "exact values are representable")]
    fn coverage_against_projection() {
        let coverage = service_coverage(&service_with_projection(Some(100)), 25).unwrap();
        assert_eq!(coverage.percentage, 25.0);
        assert_eq!(coverage.pending, 75);
    }

    #[test]
    fn coverage_pending_never_negative() {
        let coverage = service_coverage(&service_with_projection(Some(10)), 14).unwrap();
        assert_eq!(coverage.pending, 0);
        assert!(coverage.percentage > 100.0);
    }

    #[test]
    fn coverage_absent_without_positive_projection() {
        assert!(service_coverage(&service_with_projection(None), 5).is_none());
        assert!(service_coverage(&service_with_projection(Some(0)), 5).is_none());
    }

    #[test]
    #[expect(clippy::float_cmp, reason = "rounded to one decimal")]
    fn average_per_day_uses_elapsed_days() {
        assert_eq!(average_per_day(9, date(2025, 3, 3)), 3.0);
        assert_eq!(average_per_day(5, date(2025, 3, 1)), 5.0);
        assert_eq!(average_per_day(10, date(2025, 3, 3)), 3.3);
        assert_eq!(average_per_day(0, date(2025, 3, 20)), 0.0);
    }

    #[test]
    #[expect(clippy::float_cmp, reason = "rounded to one decimal")]
    fn average_per_day_rounds_half_to_even() {
        assert_eq!(average_per_day(1, date(2025, 3, 4)), 0.2);
        assert_eq!(average_per_day(3, date(2025, 3, 4)), 0.8);
        assert_eq!(average_per_day(1, date(2025, 3, 20)), 0.0);
        assert_eq!(average_per_day(3, date(2025, 3, 20)), 0.2);
        assert_eq!(average_per_day(7, date(2025, 3, 4)), 1.8);
    }

    #[test]
    fn month_start_is_first_day() {
        assert_eq!(month_start(date(2024, 2, 29)), date(2024, 2, 1));
        assert_eq!(month_start(date(2025, 1, 1)), date(2025, 1, 1));
    }
}
