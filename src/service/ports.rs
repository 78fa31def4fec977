use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{DispatchError, StoreError};
use crate::models::appointment::{Appointment, BookingDetails, ExistingAppointment};
use crate::models::calendar::CalendarConfig;
use crate::models::reminder::ReminderJob;

#[async_trait]
pub trait CalendarSettingsProvider: Send + Sync {
    /// Fails with `StoreError::NotFound` for an unknown calendar.
    async fn get_calendar_config(&self, calendar_id: &str) -> Result<CalendarConfig, StoreError>;
}

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Non-cancelled appointments of the calendar overlapping `[start, end)`.
    async fn list_appointments(
        &self,
        calendar_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ExistingAppointment>, StoreError>;

    /// Atomic insert. Must return `StoreError::Conflict` when the interval
    /// overlaps any non-cancelled appointment of the same calendar, even
    /// under concurrent calls.
    async fn create_appointment(
        &self,
        calendar_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        details: &BookingDetails,
    ) -> Result<Appointment, StoreError>;

    async fn get_appointment(&self, appointment_id: &str) -> Result<Appointment, StoreError>;

    async fn cancel_appointment(&self, appointment_id: &str) -> Result<Appointment, StoreError>;
}

#[async_trait]
pub trait ReminderDispatcher: Send + Sync {
    async fn enqueue_reminder(&self, job: ReminderJob) -> Result<(), DispatchError>;

    /// Drop pending jobs of a cancelled appointment.
    async fn cancel_reminders(&self, _appointment_id: &str) -> Result<(), DispatchError> {
        Ok(())
    }
}
