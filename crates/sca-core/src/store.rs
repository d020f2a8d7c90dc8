//! Persistence seams used by the ledger, the recorder and the reports.
//!
//! Implementations must enforce the two uniqueness rules atomically at the
//! storage boundary rather than relying on the callers' pre-checks:
//! - [`ServiceStore::insert_open_service`] fails with
//!   [`AttendanceError::Conflict`] when the place already has an open service.
//! - [`RegistrationStore::insert_registration`] fails with
//!   [`AttendanceError::Duplicate`] when the employee already has a row for
//!   the service. Guest rows are exempt.

use chrono::NaiveDate;

use crate::error::AttendanceError;
use crate::model::{
    Company, Employee, NewRegistration, NewService, Place, Registration, RegistrationEntry,
    Service, ServiceTallies,
};
use crate::types::{CompanyId, Credential, EmployeeId, PlaceId, ServiceId};

/// Read-only lookups over master data owned elsewhere.
pub trait DirectoryStore {
    fn find_employee_by_credential(
        &self,
        credential: &Credential,
    ) -> Result<Option<Employee>, AttendanceError>;

    fn find_employee_by_id(&self, id: EmployeeId) -> Result<Option<Employee>, AttendanceError>;

    fn find_company_by_id(&self, id: CompanyId) -> Result<Option<Company>, AttendanceError>;

    fn find_place_by_id(&self, id: PlaceId) -> Result<Option<Place>, AttendanceError>;

    fn list_active_places(&self) -> Result<Vec<Place>, AttendanceError>;

    /// Lists employees, active or not, optionally restricted to one company.
    fn list_employees(&self, company: Option<CompanyId>)
    -> Result<Vec<Employee>, AttendanceError>;
}

/// Storage for dining services.
pub trait ServiceStore {
    /// Inserts a service in the open state and returns its id.
    fn insert_open_service(&mut self, service: &NewService) -> Result<ServiceId, AttendanceError>;

    /// Stores final tallies, but only if the service is still open.
    ///
    /// Fails with `NotFound` for an unknown id and `State` for a service that
    /// is already closed, leaving the stored tallies untouched.
    fn close_service(
        &mut self,
        id: ServiceId,
        tallies: &ServiceTallies,
    ) -> Result<(), AttendanceError>;

    fn find_service(&self, id: ServiceId) -> Result<Option<Service>, AttendanceError>;

    fn find_open_service_for_place(
        &self,
        place: PlaceId,
    ) -> Result<Option<Service>, AttendanceError>;

    /// Latest service by date, then by id.
    fn most_recent_service(&self) -> Result<Option<Service>, AttendanceError>;

    /// All open services, most recently opened first.
    fn list_open_services(&self) -> Result<Vec<Service>, AttendanceError>;

    /// Services dated within `[from, to]`, newest first.
    fn list_services_in_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        place: Option<PlaceId>,
    ) -> Result<Vec<Service>, AttendanceError>;

    /// Every service, newest first.
    fn list_services(&self) -> Result<Vec<Service>, AttendanceError>;
}

/// Append-only storage for registrations.
pub trait RegistrationStore {
    fn insert_registration(
        &mut self,
        registration: &NewRegistration,
    ) -> Result<Registration, AttendanceError>;

    /// Every row for the service, guests included.
    fn count_for_service(&self, service: ServiceId) -> Result<u32, AttendanceError>;

    /// Rows for the service that belong to an employee.
    fn count_employees_for_service(&self, service: ServiceId) -> Result<u32, AttendanceError>;

    /// Registrations for a service with display names, newest first.
    fn list_for_service(&self, service: ServiceId)
    -> Result<Vec<RegistrationEntry>, AttendanceError>;

    fn is_registered(
        &self,
        employee: EmployeeId,
        service: ServiceId,
    ) -> Result<bool, AttendanceError>;

    /// Registrations billed to a company dated within `[from, to]`.
    fn list_for_company_in_range(
        &self,
        company: CompanyId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Registration>, AttendanceError>;
}

/// A store that backs every attendance operation.
pub trait AttendanceStore: DirectoryStore + ServiceStore + RegistrationStore {}

impl<T> AttendanceStore for T where T: DirectoryStore + ServiceStore + RegistrationStore {}
