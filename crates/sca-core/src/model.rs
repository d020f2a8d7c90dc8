//! Directory records, dining services and registrations.

use chrono::{NaiveDate, NaiveTime};
use serde::{Serialize, Serializer};

use crate::types::{
    CompanyId, Credential, DurationMinutes, EmployeeId, PlaceId, ProjectedHeadcount,
    RegistrationId, ServiceId, ServiceState,
};

/// A location where dining services run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Place {
    pub id: PlaceId,
    pub name: String,
    pub active: bool,
}

/// A company whose employees attend services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub active: bool,
}

/// An employee identified by an RFID credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub credential: Credential,
    pub first_name: String,
    pub last_name: String,
    pub company_id: CompanyId,
    pub active: bool,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A dining session at a place.
///
/// A service without a duration is open; storing the duration closes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Service {
    pub id: ServiceId,
    pub place_id: PlaceId,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projected_headcount: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invited_guests: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    pub total_diners: u32,
    pub total_guests: u32,
}

impl Service {
    pub const fn state(&self) -> ServiceState {
        if self.duration_minutes.is_some() {
            ServiceState::Closed
        } else {
            ServiceState::Open
        }
    }

    pub const fn is_open(&self) -> bool {
        self.duration_minutes.is_none()
    }

    /// Diners plus guests, as recorded when the service was closed.
    pub const fn total_general(&self) -> u32 {
        self.total_diners.saturating_add(self.total_guests)
    }

    /// Whether registrations may be taken against this service today.
    ///
    /// An open service left over from a previous day is not actionable.
    pub fn is_actionable_on(&self, today: NaiveDate) -> bool {
        self.is_open() && self.date == today
    }
}

/// Insert payload for a service in the open state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewService {
    pub place_id: PlaceId,
    pub date: NaiveDate,
    pub projected_headcount: Option<ProjectedHeadcount>,
    pub invited_guests: u32,
}

/// Final figures stored when a service closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceTallies {
    pub total_diners: u32,
    pub total_guests: u32,
    pub duration: DurationMinutes,
}

/// One attendance event.
///
/// Guest rows carry no employee but still name the company they are billed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub id: RegistrationId,
    pub employee_id: Option<EmployeeId>,
    pub company_id: CompanyId,
    pub service_id: ServiceId,
    pub place_id: PlaceId,
    pub date: NaiveDate,
    #[serde(serialize_with = "serialize_time_of_day")]
    pub time: NaiveTime,
}

impl Registration {
    pub const fn is_guest(&self) -> bool {
        self.employee_id.is_none()
    }
}

/// Insert payload for a registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRegistration {
    pub employee_id: Option<EmployeeId>,
    pub company_id: CompanyId,
    pub service_id: ServiceId,
    pub place_id: PlaceId,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

/// A registration with display names attached by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationEntry {
    #[serde(flatten)]
    pub registration: Registration,
    pub employee_name: Option<String>,
    pub company_name: Option<String>,
}

/// Result of a credential scan, shown to the person at the reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Confirmation {
    pub employee_name: String,
    pub company_name: String,
    #[serde(serialize_with = "serialize_time_of_day")]
    pub time: NaiveTime,
}

impl Confirmation {
    pub fn formatted_time(&self) -> String {
        format_time_of_day(self.time)
    }
}

/// Formats a time of day as `HH:MM`.
pub fn format_time_of_day(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

fn serialize_time_of_day<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_time_of_day(*time))
}
