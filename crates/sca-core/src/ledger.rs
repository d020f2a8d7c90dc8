//! Session ledger: opening, closing and reconciling dining services.

use chrono::{Local, NaiveDate};

use crate::error::AttendanceError;
use crate::model::{NewService, Service, ServiceTallies};
use crate::store::{DirectoryStore, RegistrationStore, ServiceStore};
use crate::types::{DurationMinutes, PlaceId, ProjectedHeadcount, ServiceId};

/// Owns the open/closed lifecycle of services.
///
/// Each place has at most one open service. The open row itself is the
/// "current service"; nothing is cached in memory between calls.
pub struct SessionLedger<'a, S> {
    store: &'a mut S,
}

impl<'a, S> SessionLedger<'a, S> {
    pub const fn new(store: &'a mut S) -> Self {
        Self { store }
    }
}

impl<S: ServiceStore> SessionLedger<'_, S> {
    pub fn open_service_for_place(
        &self,
        place_id: PlaceId,
    ) -> Result<Option<Service>, AttendanceError> {
        self.store.find_open_service_for_place(place_id)
    }

    /// Returns the latest service, whatever its state or date.
    ///
    /// Callers deciding whether a session is running today should use
    /// [`Service::is_actionable_on`] or [`Self::current_service`].
    pub fn most_recent_service(&self) -> Result<Option<Service>, AttendanceError> {
        self.store.most_recent_service()
    }

    /// Returns the most recently opened open service across all places.
    pub fn global_open_service(&self) -> Result<Option<Service>, AttendanceError> {
        let open = self.store.list_open_services()?;
        if open.len() > 1 {
            tracing::debug!(open = open.len(), "several places have open services");
        }
        Ok(open.into_iter().next())
    }

    /// Returns the most recently opened service that is open and dated `today`.
    ///
    /// A later service at another place that has already closed does not
    /// hide one that is still running.
    pub fn current_service(&self, today: NaiveDate) -> Result<Option<Service>, AttendanceError> {
        Ok(self
            .store
            .list_open_services()?
            .into_iter()
            .find(|service| service.is_actionable_on(today)))
    }

    pub fn find_service(&self, id: ServiceId) -> Result<Service, AttendanceError> {
        self.store
            .find_service(id)?
            .ok_or_else(|| AttendanceError::not_found("service", id))
    }

    pub fn list_services(&self) -> Result<Vec<Service>, AttendanceError> {
        self.store.list_services()
    }

    /// Lists services dated within `[from, to]`, optionally for one place.
    pub fn list_services_in_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        place: Option<PlaceId>,
    ) -> Result<Vec<Service>, AttendanceError> {
        if to < from {
            return Ok(Vec::new());
        }
        self.store.list_services_in_range(from, to, place)
    }

    /// Closes an open service with final tallies.
    ///
    /// `duration_minutes` below 1 is rejected; callers that accept free-form
    /// input normalize it with [`DurationMinutes::clamped`] first.
    pub fn close_service(
        &mut self,
        id: ServiceId,
        total_diners: u32,
        total_guests: u32,
        duration_minutes: i64,
    ) -> Result<(), AttendanceError> {
        let duration = DurationMinutes::new(duration_minutes)?;
        let tallies = ServiceTallies {
            total_diners,
            total_guests,
            duration,
        };
        self.store.close_service(id, &tallies)?;
        tracing::debug!(
            service_id = %id,
            total_diners,
            total_guests,
            duration_minutes = duration.value(),
            "closed service"
        );
        Ok(())
    }
}

impl<S: DirectoryStore + ServiceStore> SessionLedger<'_, S> {
    /// Opens a service dated today at an active place.
    pub fn open_service(
        &mut self,
        place_id: PlaceId,
        projected_headcount: Option<i64>,
        invited_guests: u32,
    ) -> Result<ServiceId, AttendanceError> {
        let today = Local::now().date_naive();
        self.open_service_at(place_id, projected_headcount, invited_guests, today)
    }

    /// Opens a service dated `today`.
    ///
    /// The store's open-per-place constraint backs the conflict pre-check, so
    /// two concurrent opens for one place cannot both succeed.
    pub fn open_service_at(
        &mut self,
        place_id: PlaceId,
        projected_headcount: Option<i64>,
        invited_guests: u32,
        today: NaiveDate,
    ) -> Result<ServiceId, AttendanceError> {
        self.require_active_place(place_id)?;

        if self.store.find_open_service_for_place(place_id)?.is_some() {
            return Err(AttendanceError::Conflict { place_id });
        }

        let projected_headcount = projected_headcount
            .map(ProjectedHeadcount::new)
            .transpose()?;

        let service = NewService {
            place_id,
            date: today,
            projected_headcount,
            invited_guests,
        };
        let id = self.store.insert_open_service(&service)?;
        tracing::debug!(
            service_id = %id,
            place_id = %place_id,
            projected = ?projected_headcount.map(ProjectedHeadcount::value),
            "opened service"
        );
        Ok(id)
    }

    fn require_active_place(&self, place_id: PlaceId) -> Result<(), AttendanceError> {
        match self.store.find_place_by_id(place_id)? {
            Some(place) if place.active => Ok(()),
            Some(_) => Err(AttendanceError::inactive("place", place_id)),
            None => Err(AttendanceError::not_found("place", place_id)),
        }
    }
}

impl<S: ServiceStore + RegistrationStore> SessionLedger<'_, S> {
    /// Closes a service using its employee registrations as the diner total.
    ///
    /// Guest rows never count as diners. The stored guest total is the larger
    /// of `total_guests` and the number of guest rows.
    pub fn finalize_service(
        &mut self,
        id: ServiceId,
        total_guests: u32,
        duration: DurationMinutes,
    ) -> Result<ServiceTallies, AttendanceError> {
        let total_diners = self.store.count_employees_for_service(id)?;
        let guest_rows = self
            .store
            .count_for_service(id)?
            .saturating_sub(total_diners);
        let tallies = ServiceTallies {
            total_diners,
            total_guests: total_guests.max(guest_rows),
            duration,
        };
        self.close_service(
            id,
            tallies.total_diners,
            tallies.total_guests,
            i64::from(duration.value()),
        )?;
        Ok(tallies)
    }

    /// Closes every open service dated before `today`.
    ///
    /// Each stale service is finalized with its invited guests and a
    /// one-minute duration. A service closed by someone else in the meantime
    /// is skipped. Returns the number of services this call closed.
    pub fn close_stale_services(&mut self, today: NaiveDate) -> Result<usize, AttendanceError> {
        let stale: Vec<Service> = self
            .store
            .list_open_services()?
            .into_iter()
            .filter(|service| service.date < today)
            .collect();

        let mut closed = 0;
        for service in stale {
            tracing::warn!(
                service_id = %service.id,
                date = %service.date,
                "closing stale open service"
            );
            let guests = service.invited_guests.unwrap_or(0);
            match self.finalize_service(service.id, guests, DurationMinutes::default()) {
                Ok(_) => closed += 1,
                Err(AttendanceError::State { .. }) => {
                    tracing::debug!(service_id = %service.id, "service already closed");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(closed)
    }
}
