use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SchedulingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }
}

/// Contact fields supplied with a booking request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDetails {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl BookingDetails {
    pub fn new(name: &str, email: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            phone: None,
            notes: None,
        }
    }

    pub fn validate(&self) -> Result<(), SchedulingError> {
        if self.name.trim().is_empty() {
            return Err(SchedulingError::InvalidRequest("contact name is required".to_string()));
        }
        let email = self.email.trim();
        if email.is_empty() {
            return Err(SchedulingError::InvalidRequest("contact email is required".to_string()));
        }
        if !email.contains('@') {
            return Err(SchedulingError::InvalidRequest(format!(
                "contact email '{}' is not an address",
                email
            )));
        }
        Ok(())
    }
}

/// Read-only view of a stored booking, used for conflict checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingAppointment {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl ExistingAppointment {
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self { start_time, end_time }
    }
}

/// A candidate bookable interval. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub calendar_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i64,
    pub status: AppointmentStatus,
    pub contact: BookingDetails,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    pub fn new(
        calendar_id: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        contact: BookingDetails,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            calendar_id: calendar_id.to_string(),
            start_time,
            end_time,
            duration_minutes: (end_time - start_time).num_minutes(),
            status: AppointmentStatus::Scheduled,
            contact,
            created_at,
        }
    }

    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    pub fn as_existing(&self) -> ExistingAppointment {
        ExistingAppointment::new(self.start_time, self.end_time)
    }
}
