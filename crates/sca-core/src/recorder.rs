//! Attendance recorder: registrations against open services.

use std::collections::HashSet;

use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::error::AttendanceError;
use crate::model::{Confirmation, Employee, NewRegistration, Registration, RegistrationEntry};
use crate::store::{AttendanceStore, RegistrationStore};
use crate::types::{CompanyId, Credential, EmployeeId, PlaceId, ServiceId, ValidationError};

/// Company name shown when the employee's company row is missing or unreadable.
const UNKNOWN_COMPANY: &str = "-";

/// Records attendance, enforcing one registration per employee and service.
pub struct AttendanceRecorder<'a, S> {
    store: &'a mut S,
}

/// An id that could not be registered in a batch, with the reason.
#[derive(Debug)]
pub struct BatchRejection {
    pub employee_id: EmployeeId,
    pub error: AttendanceError,
}

/// Per-item results of [`AttendanceRecorder::register_batch`].
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub registered: Vec<Registration>,
    pub rejected: Vec<BatchRejection>,
}

impl BatchOutcome {
    /// Number of ids that were registered.
    pub fn count(&self) -> usize {
        self.registered.len()
    }
}

/// Serializable summary of a batch, for presentation.
#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub count: usize,
    pub rejected: Vec<RejectionSummary>,
}

#[derive(Debug, Serialize)]
pub struct RejectionSummary {
    pub employee_id: EmployeeId,
    pub reason: String,
}

impl From<&BatchOutcome> for BatchSummary {
    fn from(outcome: &BatchOutcome) -> Self {
        Self {
            count: outcome.count(),
            rejected: outcome
                .rejected
                .iter()
                .map(|rejection| RejectionSummary {
                    employee_id: rejection.employee_id,
                    reason: rejection.error.to_string(),
                })
                .collect(),
        }
    }
}

impl<'a, S> AttendanceRecorder<'a, S> {
    pub const fn new(store: &'a mut S) -> Self {
        Self { store }
    }
}

impl<S: RegistrationStore> AttendanceRecorder<'_, S> {
    pub fn count_for_service(&self, service_id: ServiceId) -> Result<u32, AttendanceError> {
        self.store.count_for_service(service_id)
    }

    /// Registrations for a service with display names, newest first.
    pub fn list_for_service(
        &self,
        service_id: ServiceId,
    ) -> Result<Vec<RegistrationEntry>, AttendanceError> {
        self.store.list_for_service(service_id)
    }

    pub fn is_registered(
        &self,
        employee_id: EmployeeId,
        service_id: ServiceId,
    ) -> Result<bool, AttendanceError> {
        self.store.is_registered(employee_id, service_id)
    }

    /// Registrations billed to a company, both bounds inclusive.
    pub fn list_for_company_in_range(
        &self,
        company_id: CompanyId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Registration>, AttendanceError> {
        if to < from {
            return Ok(Vec::new());
        }
        self.store.list_for_company_in_range(company_id, from, to)
    }
}

impl<S: AttendanceStore> AttendanceRecorder<'_, S> {
    /// Registers an employee now.
    pub fn register(
        &mut self,
        employee_id: EmployeeId,
        company_id: CompanyId,
        service_id: ServiceId,
        place_id: PlaceId,
    ) -> Result<Registration, AttendanceError> {
        self.register_at(employee_id, company_id, service_id, place_id, now())
    }

    /// Registers an employee at the given instant.
    ///
    /// `company_id` comes from the caller's own employee lookup and is stored
    /// as given, so the row keeps the company the employee had at scan time.
    pub fn register_at(
        &mut self,
        employee_id: EmployeeId,
        company_id: CompanyId,
        service_id: ServiceId,
        place_id: PlaceId,
        now: NaiveDateTime,
    ) -> Result<Registration, AttendanceError> {
        let employee = self
            .store
            .find_employee_by_id(employee_id)?
            .ok_or_else(|| AttendanceError::not_found("employee", employee_id))?;
        self.register_employee(&employee, company_id, service_id, place_id, now)
    }

    /// Registers the employee holding `credential` now.
    pub fn register_by_credential(
        &mut self,
        credential: &str,
        service_id: ServiceId,
        place_id: PlaceId,
    ) -> Result<Confirmation, AttendanceError> {
        self.register_by_credential_at(credential, service_id, place_id, now())
    }

    /// Resolves a scanned credential and registers its employee.
    ///
    /// The credential is normalized before lookup, so `" rf001 "` and
    /// `"RF001"` name the same employee.
    pub fn register_by_credential_at(
        &mut self,
        credential: &str,
        service_id: ServiceId,
        place_id: PlaceId,
        now: NaiveDateTime,
    ) -> Result<Confirmation, AttendanceError> {
        let credential = Credential::new(credential)?;
        let employee = self
            .store
            .find_employee_by_credential(&credential)?
            .ok_or_else(|| AttendanceError::not_found("credential", &credential))?;

        let registration =
            self.register_employee(&employee, employee.company_id, service_id, place_id, now)?;

        // The row is already committed; a failed lookup only degrades the name.
        let company_name = match self.store.find_company_by_id(employee.company_id) {
            Ok(Some(company)) => company.name,
            Ok(None) => UNKNOWN_COMPANY.to_string(),
            Err(err) => {
                tracing::warn!(
                    registration_id = %registration.id,
                    company_id = %employee.company_id,
                    error = %err,
                    "company lookup failed after registering"
                );
                UNKNOWN_COMPANY.to_string()
            }
        };

        Ok(Confirmation {
            employee_name: employee.full_name(),
            company_name,
            time: registration.time,
        })
    }

    /// Records a manually entered guest billed to `company_id`.
    ///
    /// Guests have no employee, so the per-employee uniqueness rule does not
    /// apply and any number of guests may be recorded.
    pub fn register_guest_at(
        &mut self,
        company_id: CompanyId,
        service_id: ServiceId,
        place_id: PlaceId,
        now: NaiveDateTime,
    ) -> Result<Registration, AttendanceError> {
        if self.store.find_company_by_id(company_id)?.is_none() {
            return Err(AttendanceError::not_found("company", company_id));
        }
        self.require_open_service(service_id, place_id)?;

        let registration = self.store.insert_registration(&NewRegistration {
            employee_id: None,
            company_id,
            service_id,
            place_id,
            date: now.date(),
            time: now.time(),
        })?;
        tracing::debug!(
            registration_id = %registration.id,
            company_id = %company_id,
            service_id = %service_id,
            "registered guest"
        );
        Ok(registration)
    }

    pub fn register_guest(
        &mut self,
        company_id: CompanyId,
        service_id: ServiceId,
        place_id: PlaceId,
    ) -> Result<Registration, AttendanceError> {
        self.register_guest_at(company_id, service_id, place_id, now())
    }

    /// Registers several employees now. See [`Self::register_batch_at`].
    pub fn register_batch(
        &mut self,
        employee_ids: &[EmployeeId],
        service_id: ServiceId,
        place_id: PlaceId,
    ) -> BatchOutcome {
        self.register_batch_at(employee_ids, service_id, place_id, now())
    }

    /// Registers each employee independently.
    ///
    /// Every id is attempted as its own write. A rejected id (unknown,
    /// inactive, already registered) is recorded in the outcome and does not
    /// affect the others.
    pub fn register_batch_at(
        &mut self,
        employee_ids: &[EmployeeId],
        service_id: ServiceId,
        place_id: PlaceId,
        now: NaiveDateTime,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for &employee_id in employee_ids {
            let result = self
                .store
                .find_employee_by_id(employee_id)
                .and_then(|employee| {
                    employee.ok_or_else(|| AttendanceError::not_found("employee", employee_id))
                })
                .and_then(|employee| {
                    self.register_employee(
                        &employee,
                        employee.company_id,
                        service_id,
                        place_id,
                        now,
                    )
                });
            match result {
                Ok(registration) => outcome.registered.push(registration),
                Err(error) => {
                    tracing::warn!(
                        employee_id = %employee_id,
                        service_id = %service_id,
                        error = %error,
                        "skipping batch registration"
                    );
                    outcome.rejected.push(BatchRejection { employee_id, error });
                }
            }
        }
        tracing::debug!(
            service_id = %service_id,
            registered = outcome.count(),
            rejected = outcome.rejected.len(),
            "batch registration finished"
        );
        outcome
    }

    /// Active employees without a registration in the service.
    ///
    /// Optionally restricted to one company and to names containing `name`
    /// (case-insensitive).
    pub fn pending_employees(
        &self,
        service_id: ServiceId,
        company: Option<CompanyId>,
        name: Option<&str>,
    ) -> Result<Vec<Employee>, AttendanceError> {
        let registered: HashSet<EmployeeId> = self
            .store
            .list_for_service(service_id)?
            .into_iter()
            .filter_map(|entry| entry.registration.employee_id)
            .collect();
        let needle = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_lowercase);

        Ok(self
            .store
            .list_employees(company)?
            .into_iter()
            .filter(|employee| employee.active && !registered.contains(&employee.id))
            .filter(|employee| {
                needle
                    .as_deref()
                    .is_none_or(|n| employee.full_name().to_lowercase().contains(n))
            })
            .collect())
    }

    fn register_employee(
        &mut self,
        employee: &Employee,
        company_id: CompanyId,
        service_id: ServiceId,
        place_id: PlaceId,
        now: NaiveDateTime,
    ) -> Result<Registration, AttendanceError> {
        if !employee.active {
            return Err(AttendanceError::inactive("employee", employee.id));
        }
        if employee.company_id != company_id {
            tracing::debug!(
                employee_id = %employee.id,
                directory_company = %employee.company_id,
                requested_company = %company_id,
                "registering under caller-supplied company"
            );
        }
        self.require_open_service(service_id, place_id)?;

        let registration = self.store.insert_registration(&NewRegistration {
            employee_id: Some(employee.id),
            company_id,
            service_id,
            place_id,
            date: now.date(),
            time: now.time(),
        })?;
        tracing::debug!(
            registration_id = %registration.id,
            employee_id = %employee.id,
            service_id = %service_id,
            "registered employee"
        );
        Ok(registration)
    }

    fn require_open_service(
        &self,
        service_id: ServiceId,
        place_id: PlaceId,
    ) -> Result<(), AttendanceError> {
        let service = self
            .store
            .find_service(service_id)?
            .ok_or_else(|| AttendanceError::not_found("service", service_id))?;
        if !service.is_open() {
            return Err(AttendanceError::State {
                service_id,
                state: service.state(),
            });
        }
        if service.place_id != place_id {
            return Err(ValidationError::PlaceMismatch {
                service_id,
                expected: service.place_id,
                actual: place_id,
            }
            .into());
        }
        Ok(())
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}
