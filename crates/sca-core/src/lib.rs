//! Core domain logic for dining service attendance.
//!
//! This crate contains the fundamental types and logic for:
//! - Session ledger: opening and closing dining services, one open per place
//! - Attendance recorder: registrations against open services
//! - Reporting: company statistics and projection coverage
//!
//! Persistence is abstracted behind the traits in [`store`].

mod error;
pub mod ledger;
pub mod model;
pub mod recorder;
pub mod reporting;
pub mod store;
pub mod types;

pub use error::AttendanceError;
pub use ledger::SessionLedger;
pub use model::{
    Company, Confirmation, Employee, NewRegistration, NewService, Place, Registration,
    RegistrationEntry, Service, ServiceTallies,
};
pub use recorder::{AttendanceRecorder, BatchOutcome, BatchRejection, BatchSummary};
pub use reporting::{CompanyStats, Coverage, Reports, ServiceOverview, service_coverage};
pub use store::{AttendanceStore, DirectoryStore, RegistrationStore, ServiceStore};
pub use types::{
    CompanyId, Credential, DurationMinutes, EmployeeId, PlaceId, ProjectedHeadcount,
    RegistrationId, ServiceId, ServiceState, ValidationError,
};
