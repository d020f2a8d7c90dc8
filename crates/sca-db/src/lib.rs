//! Storage layer for dining service attendance.
//!
//! Provides persistence for places, companies, employees, services and
//! registrations using `rusqlite`, and implements the `sca-core` store traits.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! Concurrent request handlers should each open their own `Database` on the
//! same file. The uniqueness rules below hold across connections because they
//! are enforced by SQLite itself.
//!
//! # Schema
//!
//! ## Uniqueness
//!
//! - `idx_services_open_place`: a partial unique index on `services(place_id)`
//!   over rows with no `duration_minutes`, so a place has at most one open
//!   service.
//! - `idx_registrations_employee_service`: a partial unique index on
//!   `registrations(employee_id, service_id)` over rows with an employee, so an
//!   employee registers at most once per service while guest rows are exempt.
//! - `employees.credential` is unique and always stored in normalized form.
//!
//! Closing a service is a conditional update on `duration_minutes IS NULL`,
//! so a service closes exactly once.
//!
//! ## Date Format
//!
//! Dates are stored as TEXT `YYYY-MM-DD` and times of day as TEXT `HH:MM:SS`.
//! Lexicographic ordering matches chronological ordering for both.

use std::path::Path;

use chrono::{NaiveDate, NaiveTime, Timelike};
use rusqlite::types::Type;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Params, Row, params};
use thiserror::Error;

use sca_core::{
    AttendanceError, Company, CompanyId, Credential, DirectoryStore, Employee, EmployeeId,
    NewRegistration, NewService, Place, PlaceId, ProjectedHeadcount, Registration,
    RegistrationEntry, RegistrationId, RegistrationStore, Service, ServiceId, ServiceState,
    ServiceStore, ServiceTallies,
};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

const SERVICE_COLUMNS: &str = "id, place_id, date, projected_headcount, invited_guests, \
     duration_minutes, total_diners, total_guests";
const REGISTRATION_COLUMNS: &str =
    "r.id, r.employee_id, r.company_id, r.service_id, r.place_id, r.date, r.time";
const EMPLOYEE_COLUMNS: &str = "id, credential, first_name, last_name, company_id, active";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Another employee already holds the credential.
    #[error("credential already assigned: {credential}")]
    DuplicateCredential { credential: Credential },
    /// A row references a company that does not exist.
    #[error("company {0} not found")]
    UnknownCompany(CompanyId),
}

impl From<DbError> for AttendanceError {
    fn from(err: DbError) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// An employee ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEmployee {
    pub credential: Credential,
    pub first_name: String,
    pub last_name: String,
    pub company_id: CompanyId,
    pub active: bool,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        tracing::debug!(path = %path.display(), "opened database");
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS places (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1
            );

            CREATE TABLE IF NOT EXISTS companies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1
            );

            -- credential: trimmed, upper-cased RFID token
            CREATE TABLE IF NOT EXISTS employees (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                credential TEXT NOT NULL UNIQUE,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                company_id INTEGER NOT NULL,
                active INTEGER NOT NULL DEFAULT 1,
                FOREIGN KEY (company_id) REFERENCES companies(id) ON DELETE RESTRICT
            );

            CREATE INDEX IF NOT EXISTS idx_employees_company ON employees(company_id);

            -- duration_minutes: NULL while open, >= 1 once closed
            CREATE TABLE IF NOT EXISTS services (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                place_id INTEGER NOT NULL,
                date TEXT NOT NULL,
                projected_headcount INTEGER CHECK (projected_headcount BETWEEN 0 AND 1000),
                invited_guests INTEGER CHECK (invited_guests >= 0),
                duration_minutes INTEGER CHECK (duration_minutes >= 1),
                total_diners INTEGER NOT NULL DEFAULT 0,
                total_guests INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (place_id) REFERENCES places(id) ON DELETE RESTRICT
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_services_open_place
                ON services(place_id) WHERE duration_minutes IS NULL;
            CREATE INDEX IF NOT EXISTS idx_services_date_place ON services(date, place_id);

            -- employee_id: NULL for manually entered guests
            CREATE TABLE IF NOT EXISTS registrations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                employee_id INTEGER,
                company_id INTEGER NOT NULL,
                service_id INTEGER NOT NULL,
                place_id INTEGER NOT NULL,
                date TEXT NOT NULL,
                time TEXT NOT NULL,
                FOREIGN KEY (employee_id) REFERENCES employees(id) ON DELETE SET NULL,
                FOREIGN KEY (company_id) REFERENCES companies(id) ON DELETE RESTRICT,
                FOREIGN KEY (service_id) REFERENCES services(id) ON DELETE RESTRICT,
                FOREIGN KEY (place_id) REFERENCES places(id) ON DELETE RESTRICT
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_registrations_employee_service
                ON registrations(employee_id, service_id) WHERE employee_id IS NOT NULL;
            CREATE INDEX IF NOT EXISTS idx_registrations_date ON registrations(date);
            CREATE INDEX IF NOT EXISTS idx_registrations_company ON registrations(company_id);
            CREATE INDEX IF NOT EXISTS idx_registrations_service ON registrations(service_id);
            CREATE INDEX IF NOT EXISTS idx_registrations_place ON registrations(place_id);
            ",
        )?;
        Ok(())
    }

    /// Inserts a place and returns its id.
    pub fn insert_place(&mut self, name: &str, active: bool) -> Result<PlaceId, DbError> {
        self.conn.execute(
            "INSERT INTO places (name, active) VALUES (?, ?)",
            params![name, active],
        )?;
        Ok(PlaceId::new(self.conn.last_insert_rowid()))
    }

    /// Inserts a company and returns its id.
    pub fn insert_company(&mut self, name: &str, active: bool) -> Result<CompanyId, DbError> {
        self.conn.execute(
            "INSERT INTO companies (name, active) VALUES (?, ?)",
            params![name, active],
        )?;
        Ok(CompanyId::new(self.conn.last_insert_rowid()))
    }

    /// Inserts an employee and returns its id.
    ///
    /// The credential is already normalized by [`Credential`], so uniqueness
    /// holds regardless of how it was typed.
    pub fn insert_employee(&mut self, employee: &NewEmployee) -> Result<EmployeeId, DbError> {
        let result = self.conn.execute(
            "
            INSERT INTO employees (credential, first_name, last_name, company_id, active)
            VALUES (?, ?, ?, ?, ?)
            ",
            params![
                employee.credential.as_str(),
                employee.first_name,
                employee.last_name,
                employee.company_id.get(),
                employee.active,
            ],
        );
        match result {
            Ok(_) => Ok(EmployeeId::new(self.conn.last_insert_rowid())),
            Err(err) => match constraint_violation(&err) {
                Some(Constraint::Unique) => Err(DbError::DuplicateCredential {
                    credential: employee.credential.clone(),
                }),
                Some(Constraint::ForeignKey) => Err(DbError::UnknownCompany(employee.company_id)),
                None => Err(err.into()),
            },
        }
    }

    fn query_services<P: Params>(&self, sql: &str, params: P) -> Result<Vec<Service>, DbError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, service_from_row)?;
        let mut services = Vec::new();
        for row in rows {
            services.push(row?);
        }
        Ok(services)
    }

    fn query_service<P: Params>(&self, sql: &str, params: P) -> Result<Option<Service>, DbError> {
        Ok(self
            .conn
            .query_row(sql, params, service_from_row)
            .optional()?)
    }

    fn query_employees<P: Params>(&self, sql: &str, params: P) -> Result<Vec<Employee>, DbError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, employee_from_row)?;
        let mut employees = Vec::new();
        for row in rows {
            employees.push(row?);
        }
        Ok(employees)
    }

    fn query_employee<P: Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Option<Employee>, DbError> {
        Ok(self
            .conn
            .query_row(sql, params, employee_from_row)
            .optional()?)
    }

    fn query_place(&self, id: PlaceId) -> Result<Option<Place>, DbError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, active FROM places WHERE id = ?",
                [id.get()],
                |row| {
                    Ok(Place {
                        id: PlaceId::new(row.get(0)?),
                        name: row.get(1)?,
                        active: row.get(2)?,
                    })
                },
            )
            .optional()?)
    }

    fn query_active_places(&self) -> Result<Vec<Place>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, active FROM places WHERE active = 1 ORDER BY name ASC, id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Place {
                id: PlaceId::new(row.get(0)?),
                name: row.get(1)?,
                active: row.get(2)?,
            })
        })?;
        let mut places = Vec::new();
        for row in rows {
            places.push(row?);
        }
        Ok(places)
    }

    fn query_company(&self, id: CompanyId) -> Result<Option<Company>, DbError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, active FROM companies WHERE id = ?",
                [id.get()],
                |row| {
                    Ok(Company {
                        id: CompanyId::new(row.get(0)?),
                        name: row.get(1)?,
                        active: row.get(2)?,
                    })
                },
            )
            .optional()?)
    }

    fn query_registration_entries(
        &self,
        service: ServiceId,
    ) -> Result<Vec<RegistrationEntry>, DbError> {
        let sql = format!(
            "
            SELECT {REGISTRATION_COLUMNS},
                   e.first_name || ' ' || e.last_name AS employee_name,
                   c.name AS company_name
            FROM registrations r
            LEFT JOIN employees e ON e.id = r.employee_id
            LEFT JOIN companies c ON c.id = r.company_id
            WHERE r.service_id = ?
            ORDER BY r.date DESC, r.time DESC, r.id DESC
            "
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([service.get()], |row| {
            Ok(RegistrationEntry {
                registration: registration_from_row(row)?,
                employee_name: row.get(7)?,
                company_name: row.get(8)?,
            })
        })?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    fn query_company_registrations(
        &self,
        company: CompanyId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Registration>, DbError> {
        let sql = format!(
            "
            SELECT {REGISTRATION_COLUMNS}
            FROM registrations r
            WHERE r.company_id = ? AND r.date >= ? AND r.date <= ?
            ORDER BY r.date ASC, r.time ASC, r.id ASC
            "
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![company.get(), format_date(from), format_date(to)],
            registration_from_row,
        )?;
        let mut registrations = Vec::new();
        for row in rows {
            registrations.push(row?);
        }
        Ok(registrations)
    }

    fn exists(&self, table: &str, id: i64) -> Result<bool, DbError> {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?)");
        Ok(self.conn.query_row(&sql, [id], |row| row.get(0))?)
    }

    /// Names the missing parent of a registration that failed a foreign key.
    fn missing_registration_parent(&self, registration: &NewRegistration) -> AttendanceError {
        let checks = [
            ("service", "services", registration.service_id.get()),
            ("company", "companies", registration.company_id.get()),
            ("place", "places", registration.place_id.get()),
        ];
        for (entity, table, id) in checks {
            match self.exists(table, id) {
                Ok(true) => {}
                Ok(false) => return AttendanceError::not_found(entity, id),
                Err(err) => return err.into(),
            }
        }
        if let Some(employee_id) = registration.employee_id {
            return AttendanceError::not_found("employee", employee_id);
        }
        AttendanceError::Storage("registration references a missing row".to_string())
    }
}

impl DirectoryStore for Database {
    fn find_employee_by_credential(
        &self,
        credential: &Credential,
    ) -> Result<Option<Employee>, AttendanceError> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE credential = ?");
        Ok(self.query_employee(&sql, [credential.as_str()])?)
    }

    fn find_employee_by_id(&self, id: EmployeeId) -> Result<Option<Employee>, AttendanceError> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?");
        Ok(self.query_employee(&sql, [id.get()])?)
    }

    fn find_company_by_id(&self, id: CompanyId) -> Result<Option<Company>, AttendanceError> {
        Ok(self.query_company(id)?)
    }

    fn find_place_by_id(&self, id: PlaceId) -> Result<Option<Place>, AttendanceError> {
        Ok(self.query_place(id)?)
    }

    fn list_active_places(&self) -> Result<Vec<Place>, AttendanceError> {
        Ok(self.query_active_places()?)
    }

    fn list_employees(
        &self,
        company: Option<CompanyId>,
    ) -> Result<Vec<Employee>, AttendanceError> {
        let employees = match company {
            Some(company) => {
                let sql = format!(
                    "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE company_id = ? \
                     ORDER BY last_name ASC, first_name ASC, id ASC"
                );
                self.query_employees(&sql, [company.get()])?
            }
            None => {
                let sql = format!(
                    "SELECT {EMPLOYEE_COLUMNS} FROM employees \
                     ORDER BY last_name ASC, first_name ASC, id ASC"
                );
                self.query_employees(&sql, [])?
            }
        };
        Ok(employees)
    }
}

impl ServiceStore for Database {
    fn insert_open_service(&mut self, service: &NewService) -> Result<ServiceId, AttendanceError> {
        let result = self.conn.execute(
            "
            INSERT INTO services (place_id, date, projected_headcount, invited_guests)
            VALUES (?, ?, ?, ?)
            ",
            params![
                service.place_id.get(),
                format_date(service.date),
                service.projected_headcount.map(ProjectedHeadcount::value),
                service.invited_guests,
            ],
        );
        match result {
            Ok(_) => Ok(ServiceId::new(self.conn.last_insert_rowid())),
            Err(err) => match constraint_violation(&err) {
                Some(Constraint::Unique) => {
                    tracing::debug!(
                        place_id = %service.place_id,
                        "open service index rejected insert"
                    );
                    Err(AttendanceError::Conflict {
                        place_id: service.place_id,
                    })
                }
                Some(Constraint::ForeignKey) => {
                    Err(AttendanceError::not_found("place", service.place_id))
                }
                None => Err(DbError::from(err).into()),
            },
        }
    }

    fn close_service(
        &mut self,
        id: ServiceId,
        tallies: &ServiceTallies,
    ) -> Result<(), AttendanceError> {
        let updated = self
            .conn
            .execute(
                "
                UPDATE services
                SET total_diners = ?, total_guests = ?, duration_minutes = ?
                WHERE id = ? AND duration_minutes IS NULL
                ",
                params![
                    tallies.total_diners,
                    tallies.total_guests,
                    tallies.duration.value(),
                    id.get(),
                ],
            )
            .map_err(DbError::from)?;
        if updated == 1 {
            return Ok(());
        }
        if self.exists("services", id.get())? {
            Err(AttendanceError::State {
                service_id: id,
                state: ServiceState::Closed,
            })
        } else {
            Err(AttendanceError::not_found("service", id))
        }
    }

    fn find_service(&self, id: ServiceId) -> Result<Option<Service>, AttendanceError> {
        let sql = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ?");
        Ok(self.query_service(&sql, [id.get()])?)
    }

    fn find_open_service_for_place(
        &self,
        place: PlaceId,
    ) -> Result<Option<Service>, AttendanceError> {
        let sql = format!(
            "SELECT {SERVICE_COLUMNS} FROM services \
             WHERE place_id = ? AND duration_minutes IS NULL"
        );
        Ok(self.query_service(&sql, [place.get()])?)
    }

    fn most_recent_service(&self) -> Result<Option<Service>, AttendanceError> {
        let sql =
            format!("SELECT {SERVICE_COLUMNS} FROM services ORDER BY date DESC, id DESC LIMIT 1");
        Ok(self.query_service(&sql, [])?)
    }

    fn list_open_services(&self) -> Result<Vec<Service>, AttendanceError> {
        let sql = format!(
            "SELECT {SERVICE_COLUMNS} FROM services \
             WHERE duration_minutes IS NULL ORDER BY id DESC"
        );
        Ok(self.query_services(&sql, [])?)
    }

    fn list_services_in_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        place: Option<PlaceId>,
    ) -> Result<Vec<Service>, AttendanceError> {
        let sql = format!(
            "SELECT {SERVICE_COLUMNS} FROM services \
             WHERE date >= ?1 AND date <= ?2 AND (?3 IS NULL OR place_id = ?3) \
             ORDER BY date DESC, id DESC"
        );
        Ok(self.query_services(
            &sql,
            params![format_date(from), format_date(to), place.map(PlaceId::get)],
        )?)
    }

    fn list_services(&self) -> Result<Vec<Service>, AttendanceError> {
        let sql = format!("SELECT {SERVICE_COLUMNS} FROM services ORDER BY date DESC, id DESC");
        Ok(self.query_services(&sql, [])?)
    }
}

impl RegistrationStore for Database {
    fn insert_registration(
        &mut self,
        registration: &NewRegistration,
    ) -> Result<Registration, AttendanceError> {
        let time = whole_seconds(registration.time);
        let result = self.conn.execute(
            "
            INSERT INTO registrations (employee_id, company_id, service_id, place_id, date, time)
            VALUES (?, ?, ?, ?, ?, ?)
            ",
            params![
                registration.employee_id.map(EmployeeId::get),
                registration.company_id.get(),
                registration.service_id.get(),
                registration.place_id.get(),
                format_date(registration.date),
                format_time(time),
            ],
        );
        match result {
            Ok(_) => Ok(Registration {
                id: RegistrationId::new(self.conn.last_insert_rowid()),
                employee_id: registration.employee_id,
                company_id: registration.company_id,
                service_id: registration.service_id,
                place_id: registration.place_id,
                date: registration.date,
                time,
            }),
            Err(err) => match (constraint_violation(&err), registration.employee_id) {
                (Some(Constraint::Unique), Some(employee_id)) => Err(AttendanceError::Duplicate {
                    employee_id,
                    service_id: registration.service_id,
                }),
                (Some(Constraint::ForeignKey), _) => {
                    Err(self.missing_registration_parent(registration))
                }
                _ => Err(DbError::from(err).into()),
            },
        }
    }

    fn count_for_service(&self, service: ServiceId) -> Result<u32, AttendanceError> {
        let count = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM registrations WHERE service_id = ?",
                [service.get()],
                |row| row.get(0),
            )
            .map_err(DbError::from)?;
        Ok(count)
    }

    fn count_employees_for_service(&self, service: ServiceId) -> Result<u32, AttendanceError> {
        let count = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM registrations
                 WHERE service_id = ? AND employee_id IS NOT NULL",
                [service.get()],
                |row| row.get(0),
            )
            .map_err(DbError::from)?;
        Ok(count)
    }

    fn list_for_service(
        &self,
        service: ServiceId,
    ) -> Result<Vec<RegistrationEntry>, AttendanceError> {
        Ok(self.query_registration_entries(service)?)
    }

    fn is_registered(
        &self,
        employee: EmployeeId,
        service: ServiceId,
    ) -> Result<bool, AttendanceError> {
        let registered = self
            .conn
            .query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM registrations WHERE employee_id = ? AND service_id = ?
                )",
                [employee.get(), service.get()],
                |row| row.get(0),
            )
            .map_err(DbError::from)?;
        Ok(registered)
    }

    fn list_for_company_in_range(
        &self,
        company: CompanyId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Registration>, AttendanceError> {
        Ok(self.query_company_registrations(company, from, to)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Constraint {
    Unique,
    ForeignKey,
}

/// Classifies a constraint failure reported by SQLite.
fn constraint_violation(err: &rusqlite::Error) -> Option<Constraint> {
    let rusqlite::Error::SqliteFailure(failure, _) = err else {
        return None;
    };
    if failure.code != ErrorCode::ConstraintViolation {
        return None;
    }
    match failure.extended_code {
        rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
            Some(Constraint::Unique)
        }
        rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Some(Constraint::ForeignKey),
        _ => None,
    }
}

fn service_from_row(row: &Row<'_>) -> rusqlite::Result<Service> {
    Ok(Service {
        id: ServiceId::new(row.get(0)?),
        place_id: PlaceId::new(row.get(1)?),
        date: date_column(row, 2)?,
        projected_headcount: row.get(3)?,
        invited_guests: row.get(4)?,
        duration_minutes: row.get(5)?,
        total_diners: row.get(6)?,
        total_guests: row.get(7)?,
    })
}

fn registration_from_row(row: &Row<'_>) -> rusqlite::Result<Registration> {
    Ok(Registration {
        id: RegistrationId::new(row.get(0)?),
        employee_id: row.get::<_, Option<i64>>(1)?.map(EmployeeId::new),
        company_id: CompanyId::new(row.get(2)?),
        service_id: ServiceId::new(row.get(3)?),
        place_id: PlaceId::new(row.get(4)?),
        date: date_column(row, 5)?,
        time: time_column(row, 6)?,
    })
}

fn employee_from_row(row: &Row<'_>) -> rusqlite::Result<Employee> {
    let credential: String = row.get(1)?;
    let credential = Credential::new(credential)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(err)))?;
    Ok(Employee {
        id: EmployeeId::new(row.get(0)?),
        credential,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        company_id: CompanyId::new(row.get(4)?),
        active: row.get(5)?,
    })
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let value: String = row.get(idx)?;
    NaiveDate::parse_from_str(&value, DATE_FORMAT)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

fn time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveTime> {
    let value: String = row.get(idx)?;
    NaiveTime::parse_from_str(&value, TIME_FORMAT)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

fn whole_seconds(time: NaiveTime) -> NaiveTime {
    time.with_nanosecond(0).unwrap_or(time)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;

    use sca_core::DurationMinutes;

    #[test]
    fn open_in_memory_database() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn schema_matches_data_model() {
        let db = Database::open_in_memory().expect("open in-memory db");

        assert_eq!(
            table_columns(&db.conn, "services"),
            vec![
                "id",
                "place_id",
                "date",
                "projected_headcount",
                "invited_guests",
                "duration_minutes",
                "total_diners",
                "total_guests",
            ]
        );
        assert_eq!(
            table_columns(&db.conn, "registrations"),
            vec![
                "id",
                "employee_id",
                "company_id",
                "service_id",
                "place_id",
                "date",
                "time",
            ]
        );

        let service_indexes = index_names(&db.conn, "services");
        assert!(service_indexes.contains("idx_services_open_place"));
        assert!(service_indexes.contains("idx_services_date_place"));

        let registration_indexes = index_names(&db.conn, "registrations");
        for name in [
            "idx_registrations_employee_service",
            "idx_registrations_date",
            "idx_registrations_company",
            "idx_registrations_service",
            "idx_registrations_place",
        ] {
            assert!(registration_indexes.contains(name), "missing index {name}");
        }

        let mut registration_fks = foreign_keys(&db.conn, "registrations");
        registration_fks.sort();
        assert_eq!(
            registration_fks,
            vec![
                (
                    "company_id".to_string(),
                    "companies".to_string(),
                    "RESTRICT".to_string()
                ),
                (
                    "employee_id".to_string(),
                    "employees".to_string(),
                    "SET NULL".to_string()
                ),
                (
                    "place_id".to_string(),
                    "places".to_string(),
                    "RESTRICT".to_string()
                ),
                (
                    "service_id".to_string(),
                    "services".to_string(),
                    "RESTRICT".to_string()
                ),
            ]
        );
    }

    #[test]
    fn file_database_persists_across_connections() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("sca.db");

        let place = {
            let mut db = Database::open(&path).unwrap();
            let place = db.insert_place("Comedor", true).unwrap();
            db.insert_open_service(&new_service(place)).unwrap();
            place
        };

        let db = Database::open(&path).unwrap();
        let open = db.find_open_service_for_place(place).unwrap();
        assert_eq!(open.map(|s| s.date), Some(date(2025, 3, 10)));
    }

    #[test]
    fn open_service_index_holds_across_connections() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("sca.db");
        let mut first = Database::open(&path).unwrap();
        let mut second = Database::open(&path).unwrap();
        let place = first.insert_place("Comedor", true).unwrap();

        first.insert_open_service(&new_service(place)).unwrap();
        let err = second.insert_open_service(&new_service(place)).unwrap_err();
        assert!(matches!(err, AttendanceError::Conflict { .. }));
    }

    #[test]
    fn init_is_idempotent() {
        let db = Database::open_in_memory().expect("open in-memory db");
        db.init().expect("second init");
    }

    #[test]
    fn insert_employee_rejects_duplicate_normalized_credential() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let company = db.insert_company("Acme", true).unwrap();
        db.insert_employee(&new_employee("rf001", company)).unwrap();

        let err = db
            .insert_employee(&new_employee(" RF001 ", company))
            .unwrap_err();
        assert!(matches!(err, DbError::DuplicateCredential { .. }));
        assert_eq!(err.to_string(), "credential already assigned: RF001");
    }

    #[test]
    fn insert_employee_rejects_unknown_company() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let err = db
            .insert_employee(&new_employee("rf001", CompanyId::new(99)))
            .unwrap_err();
        assert!(matches!(err, DbError::UnknownCompany(id) if id == CompanyId::new(99)));
    }

    #[test]
    fn credential_lookup_uses_normalized_form() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let company = db.insert_company("Acme", true).unwrap();
        let id = db.insert_employee(&new_employee(" rf001", company)).unwrap();

        let found = db
            .find_employee_by_credential(&Credential::new("Rf001 ").unwrap())
            .unwrap()
            .expect("employee by credential");
        assert_eq!(found.id, id);
        assert_eq!(found.credential.as_str(), "RF001");
    }

    #[test]
    fn open_service_index_rejects_second_open_service() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let place = db.insert_place("Comedor", true).unwrap();
        let service = new_service(place);

        db.insert_open_service(&service).unwrap();
        let err = db.insert_open_service(&service).unwrap_err();
        assert!(matches!(err, AttendanceError::Conflict { place_id } if place_id == place));

        let open: i64 = db
            .conn
            .query_row(
                "SELECT COUNT(*) FROM services WHERE duration_minutes IS NULL",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(open, 1);
    }

    #[test]
    fn closed_service_frees_the_place() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let place = db.insert_place("Comedor", true).unwrap();
        let first = db.insert_open_service(&new_service(place)).unwrap();
        db.close_service(first, &tallies(10, 2, 30)).unwrap();

        let second = db.insert_open_service(&new_service(place)).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn close_service_is_conditional_on_open_state() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let place = db.insert_place("Comedor", true).unwrap();
        let id = db.insert_open_service(&new_service(place)).unwrap();

        db.close_service(id, &tallies(10, 2, 30)).unwrap();
        let err = db.close_service(id, &tallies(99, 99, 99)).unwrap_err();
        assert!(matches!(
            err,
            AttendanceError::State {
                state: ServiceState::Closed,
                ..
            }
        ));

        let service = db.find_service(id).unwrap().unwrap();
        assert_eq!(service.total_diners, 10);
        assert_eq!(service.total_guests, 2);
        assert_eq!(service.duration_minutes, Some(30));

        let err = db
            .close_service(ServiceId::new(404), &tallies(0, 0, 1))
            .unwrap_err();
        assert!(matches!(err, AttendanceError::NotFound { entity: "service", .. }));
    }

    #[test]
    fn registration_index_exempts_guests() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let place = db.insert_place("Comedor", true).unwrap();
        let company = db.insert_company("Acme", true).unwrap();
        let employee = db.insert_employee(&new_employee("rf001", company)).unwrap();
        let service = db.insert_open_service(&new_service(place)).unwrap();

        let row = |employee_id| NewRegistration {
            employee_id,
            company_id: company,
            service_id: service,
            place_id: place,
            date: date(2025, 3, 10),
            time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        };

        db.insert_registration(&row(Some(employee))).unwrap();
        let err = db.insert_registration(&row(Some(employee))).unwrap_err();
        assert!(matches!(err, AttendanceError::Duplicate { .. }));

        db.insert_registration(&row(None)).unwrap();
        db.insert_registration(&row(None)).unwrap();
        assert_eq!(db.count_for_service(service).unwrap(), 3);
        assert_eq!(db.count_employees_for_service(service).unwrap(), 1);
        assert!(db.is_registered(employee, service).unwrap());
    }

    #[test]
    fn registration_with_missing_company_names_the_company() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let place = db.insert_place("Comedor", true).unwrap();
        let service = db.insert_open_service(&new_service(place)).unwrap();

        let err = db
            .insert_registration(&NewRegistration {
                employee_id: None,
                company_id: CompanyId::new(77),
                service_id: service,
                place_id: place,
                date: date(2025, 3, 10),
                time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            })
            .unwrap_err();
        assert!(matches!(err, AttendanceError::NotFound { entity: "company", .. }));
    }

    #[test]
    fn registration_time_is_stored_to_the_second() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let place = db.insert_place("Comedor", true).unwrap();
        let company = db.insert_company("Acme", true).unwrap();
        let service = db.insert_open_service(&new_service(place)).unwrap();

        let stored = db
            .insert_registration(&NewRegistration {
                employee_id: None,
                company_id: company,
                service_id: service,
                place_id: place,
                date: date(2025, 3, 10),
                time: NaiveTime::from_hms_milli_opt(12, 30, 15, 750).unwrap(),
            })
            .unwrap();
        assert_eq!(stored.time, NaiveTime::from_hms_opt(12, 30, 15).unwrap());

        let listed = db.list_for_service(service).unwrap();
        assert_eq!(listed[0].registration, stored);
        assert_eq!(listed[0].company_name.as_deref(), Some("Acme"));
        assert_eq!(listed[0].employee_name, None);
    }

    #[test]
    fn services_in_range_filter_by_place() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let north = db.insert_place("Norte", true).unwrap();
        let south = db.insert_place("Sur", true).unwrap();

        for (place, day) in [(north, 3), (south, 4), (north, 9)] {
            let id = db
                .insert_open_service(&NewService {
                    date: date(2025, 3, day),
                    ..new_service(place)
                })
                .unwrap();
            db.close_service(id, &tallies(1, 0, 10)).unwrap();
        }

        let all = db
            .list_services_in_range(date(2025, 3, 1), date(2025, 3, 31), None)
            .unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].date, date(2025, 3, 9));

        let north_only = db
            .list_services_in_range(date(2025, 3, 3), date(2025, 3, 4), Some(north))
            .unwrap();
        assert_eq!(north_only.len(), 1);
        assert_eq!(north_only[0].place_id, north);
    }

    #[test]
    fn deleting_employee_keeps_registration_history() {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        let place = db.insert_place("Comedor", true).unwrap();
        let company = db.insert_company("Acme", true).unwrap();
        let employee = db.insert_employee(&new_employee("rf001", company)).unwrap();
        let service = db.insert_open_service(&new_service(place)).unwrap();
        db.insert_registration(&NewRegistration {
            employee_id: Some(employee),
            company_id: company,
            service_id: service,
            place_id: place,
            date: date(2025, 3, 10),
            time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        })
        .unwrap();

        db.conn
            .execute("DELETE FROM employees WHERE id = ?", [employee.get()])
            .unwrap();

        let entries = db.list_for_service(service).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].registration.is_guest());
        assert_eq!(entries[0].registration.company_id, company);
    }

    fn new_employee(credential: &str, company_id: CompanyId) -> NewEmployee {
        NewEmployee {
            credential: Credential::new(credential).unwrap(),
            first_name: "Ana".to_string(),
            last_name: "Pérez".to_string(),
            company_id,
            active: true,
        }
    }

    fn new_service(place_id: PlaceId) -> NewService {
        NewService {
            place_id,
            date: date(2025, 3, 10),
            projected_headcount: Some(ProjectedHeadcount::new(100).unwrap()),
            invited_guests: 0,
        }
    }

    fn tallies(total_diners: u32, total_guests: u32, minutes: i64) -> ServiceTallies {
        ServiceTallies {
            total_diners,
            total_guests,
            duration: DurationMinutes::new(minutes).unwrap(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .unwrap();
        stmt.query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .map(Result::unwrap)
            .collect()
    }

    fn index_names(conn: &Connection, table: &str) -> HashSet<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA index_list({table})"))
            .unwrap();
        stmt.query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .map(Result::unwrap)
            .collect()
    }

    fn foreign_keys(conn: &Connection, table: &str) -> Vec<(String, String, String)> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA foreign_key_list({table})"))
            .unwrap();
        stmt.query_map([], |row| {
            let from: String = row.get(3)?;
            let target: String = row.get(2)?;
            let on_delete: String = row.get(6)?;
            Ok((from, target, on_delete))
        })
        .unwrap()
        .map(Result::unwrap)
        .collect()
    }
}
