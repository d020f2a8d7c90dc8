//! Error taxonomy shared by the ledger, the recorder and the stores.

use thiserror::Error;

use crate::types::{EmployeeId, PlaceId, ServiceId, ServiceState, ValidationError};

/// Errors surfaced by attendance operations.
///
/// Stores translate backend failures into these variants, so callers never
/// inspect storage-specific error codes.
#[derive(Debug, Error)]
pub enum AttendanceError {
    /// Bad input shape or range.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A referenced entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// The place already has an open service.
    #[error("place {place_id} already has an open service")]
    Conflict { place_id: PlaceId },

    /// The employee is already registered in the service.
    #[error("employee {employee_id} is already registered in service {service_id}")]
    Duplicate {
        employee_id: EmployeeId,
        service_id: ServiceId,
    },

    /// The referenced entity is disabled.
    #[error("{entity} {id} is inactive")]
    Inactive { entity: &'static str, id: String },

    /// The operation is not valid for the service's lifecycle state.
    #[error("service {service_id} is {state}")]
    State {
        service_id: ServiceId,
        state: ServiceState,
    },

    /// The backing store failed for a reason unrelated to business rules.
    #[error("storage error: {0}")]
    Storage(String),
}

impl AttendanceError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn inactive(entity: &'static str, id: impl ToString) -> Self {
        Self::Inactive {
            entity,
            id: id.to_string(),
        }
    }

    /// Whether this error is an expected steady-state rejection
    /// (duplicate scan, disabled badge, unknown id) rather than a failure.
    pub const fn is_rejection(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}
