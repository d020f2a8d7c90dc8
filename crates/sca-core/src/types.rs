//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound for a service's projected headcount.
pub const MAX_PROJECTED_HEADCOUNT: u32 = 1000;

/// Validation errors for core types and operation inputs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// The projected headcount was outside the accepted range.
    #[error("projected headcount must be between 0 and {MAX_PROJECTED_HEADCOUNT}, got {value}")]
    ProjectionOutOfRange { value: i64 },

    /// A finalized service needs a positive duration.
    #[error("duration must be at least 1 minute, got {value}")]
    NonPositiveDuration { value: i64 },

    /// The registration targets a place other than the service's place.
    #[error("service {service_id} runs at place {expected}, not place {actual}")]
    PlaceMismatch {
        service_id: ServiceId,
        expected: PlaceId,
        actual: PlaceId,
    },

    /// Invalid service state value.
    #[error("invalid service state: {value}")]
    InvalidServiceState { value: String },
}

/// Generates an integer ID newtype with common trait implementations.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw row identifier.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw row identifier.
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Identifier of a place where services run.
    PlaceId
);

define_id!(
    /// Identifier of a company.
    CompanyId
);

define_id!(
    /// Identifier of an employee.
    EmployeeId
);

define_id!(
    /// Identifier of a dining service.
    ServiceId
);

define_id!(
    /// Identifier of a registration row.
    RegistrationId
);

/// A normalized RFID credential.
///
/// Credentials are trimmed and upper-cased on construction, so two
/// credentials are equal exactly when their normalized forms are equal.
/// The same constructor is used when employees are stored and when scans are
/// looked up.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Credential(String);

impl Credential {
    /// Normalizes and validates a raw credential.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ValidationError> {
        let normalized = raw.as_ref().trim().to_uppercase();
        if normalized.is_empty() {
            return Err(ValidationError::Empty {
                field: "credential",
            });
        }
        Ok(Self(normalized))
    }

    /// Returns the normalized credential.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Credential {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Credential> for String {
    fn from(credential: Credential) -> Self {
        credential.0
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Credential {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Expected number of diners for a service, in `0..=1000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProjectedHeadcount(u32);

impl ProjectedHeadcount {
    /// Creates a projection, rejecting values outside `0..=1000`.
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        u32::try_from(value)
            .ok()
            .filter(|v| *v <= MAX_PROJECTED_HEADCOUNT)
            .map(Self)
            .ok_or(ValidationError::ProjectionOutOfRange { value })
    }

    pub const fn value(self) -> u32 {
        self.0
    }
}

/// Length of a finalized service in minutes. Always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DurationMinutes(u32);

impl DurationMinutes {
    /// Creates a duration, rejecting zero and negative values.
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        u32::try_from(value)
            .ok()
            .filter(|v| *v >= 1)
            .map(Self)
            .ok_or(ValidationError::NonPositiveDuration { value })
    }

    /// Creates a duration, raising anything below 1 to 1.
    ///
    /// Values above `u32::MAX` saturate.
    pub fn clamped(value: i64) -> Self {
        let value = u32::try_from(value.max(1)).unwrap_or(u32::MAX);
        Self(value)
    }

    pub const fn value(self) -> u32 {
        self.0
    }
}

impl Default for DurationMinutes {
    fn default() -> Self {
        Self(1)
    }
}

/// Lifecycle state of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    /// Accepting registrations.
    Open,
    /// Finalized with tallies; immutable.
    Closed,
}

impl ServiceState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ServiceState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(ValidationError::InvalidServiceState {
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_is_trimmed_and_uppercased() {
        let credential = Credential::new(" rf001 ").unwrap();
        assert_eq!(credential.as_str(), "RF001");
        assert_eq!(credential, Credential::new("RF001").unwrap());
        assert_eq!(credential, Credential::new("rf001").unwrap());
    }

    #[test]
    fn credential_rejects_blank() {
        let err = Credential::new("   ").unwrap_err();
        assert_eq!(err, ValidationError::Empty { field: "credential" });
        assert_eq!(err.to_string(), "credential cannot be empty");
    }

    #[test]
    fn credential_serde_normalizes() {
        let credential: Credential = serde_json::from_str("\"ab12\"").unwrap();
        assert_eq!(credential.as_str(), "AB12");
        assert!(serde_json::from_str::<Credential>("\"\"").is_err());
    }

    #[test]
    fn projection_validates_range() {
        assert_eq!(ProjectedHeadcount::new(0).unwrap().value(), 0);
        assert_eq!(ProjectedHeadcount::new(1000).unwrap().value(), 1000);
        assert_eq!(
            ProjectedHeadcount::new(1001),
            Err(ValidationError::ProjectionOutOfRange { value: 1001 })
        );
        assert_eq!(
            ProjectedHeadcount::new(-1),
            Err(ValidationError::ProjectionOutOfRange { value: -1 })
        );
    }

    #[test]
    fn duration_rejects_zero_and_negative() {
        assert!(DurationMinutes::new(0).is_err());
        assert!(DurationMinutes::new(-5).is_err());
        assert_eq!(DurationMinutes::new(45).unwrap().value(), 45);
    }

    #[test]
    fn duration_clamped_raises_to_one() {
        assert_eq!(DurationMinutes::clamped(0).value(), 1);
        assert_eq!(DurationMinutes::clamped(-10).value(), 1);
        assert_eq!(DurationMinutes::clamped(30).value(), 30);
        assert_eq!(DurationMinutes::default().value(), 1);
    }

    #[test]
    fn service_state_roundtrip() {
        for state in [ServiceState::Open, ServiceState::Closed] {
            let parsed: ServiceState = state.as_str().parse().unwrap();
            assert_eq!(parsed, state);
        }
        let err = "paused".parse::<ServiceState>().unwrap_err();
        assert_eq!(err.to_string(), "invalid service state: paused");
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = ServiceId::new(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        assert_eq!(id.to_string(), "42");
        assert_eq!(i64::from(id), 42);
    }
}
