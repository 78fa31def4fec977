use std::future::Future;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::error::{SchedulingError, StoreError};
use crate::models::appointment::{Appointment, BookingDetails, TimeSlot};
use crate::models::calendar::CalendarConfig;
use crate::models::reminder::ReminderOffset;
use crate::service::availability::compute_available_slots;
use crate::service::ports::{AppointmentStore, CalendarSettingsProvider, ReminderDispatcher};
use crate::service::reminder_service::ReminderService;

pub const DEFAULT_CALL_TIMEOUT: StdDuration = StdDuration::from_secs(5);
pub const MAX_RANGE_DAYS: i64 = 62;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub calendar_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub details: BookingDetails,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Availability {
    pub config: CalendarConfig,
    pub slots: Vec<TimeSlot>,
}

/// Availability queries and the booking pipeline over injected collaborators:
/// fetch settings, re-validate against fresh appointments, persist, then
/// schedule reminders.
pub struct BookingCoordinator {
    settings: Arc<dyn CalendarSettingsProvider>,
    store: Arc<dyn AppointmentStore>,
    reminders: ReminderService,
    call_timeout: StdDuration,
}

impl BookingCoordinator {
    pub fn new(
        settings: Arc<dyn CalendarSettingsProvider>,
        store: Arc<dyn AppointmentStore>,
        dispatcher: Arc<dyn ReminderDispatcher>,
        offsets: Vec<ReminderOffset>,
    ) -> Self {
        Self {
            settings,
            store,
            reminders: ReminderService::new(dispatcher, offsets),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: StdDuration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    async fn call<T, F>(&self, what: &str, fut: F) -> Result<T, SchedulingError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match timeout(self.call_timeout, fut).await {
            Ok(result) => result.map_err(SchedulingError::from),
            Err(_) => Err(SchedulingError::Unavailable(format!(
                "{} timed out after {:?}",
                what, self.call_timeout
            ))),
        }
    }

    pub async fn calendar_settings(&self, calendar_id: &str) -> Result<CalendarConfig, SchedulingError> {
        self.call("calendar settings", self.settings.get_calendar_config(calendar_id))
            .await
    }

    /// Bookable slots in `[start, end)` that begin after `now`.
    pub async fn available_slots(
        &self,
        calendar_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Availability, SchedulingError> {
        if end <= start {
            return Err(SchedulingError::InvalidRequest(
                "range end must be after range start".to_string(),
            ));
        }
        if end - start > Duration::days(MAX_RANGE_DAYS) {
            return Err(SchedulingError::InvalidRequest(format!(
                "range cannot span more than {} days",
                MAX_RANGE_DAYS
            )));
        }

        let config = self.calendar_settings(calendar_id).await?;
        let existing = self
            .call("appointment listing", self.store.list_appointments(calendar_id, start, end))
            .await?;
        let slots = compute_available_slots(&config, &existing, start, end)?
            .into_iter()
            .filter(|slot| slot.start > now)
            .collect();
        Ok(Availability { config, slots })
    }

    pub async fn book_slot(
        &self,
        request: &BookingRequest,
        now: DateTime<Utc>,
    ) -> Result<Appointment, SchedulingError> {
        let config = self.calendar_settings(&request.calendar_id).await?;
        self.book_with_config(&config, request.start, request.end, &request.details, now)
            .await
    }

    pub async fn book_with_config(
        &self,
        config: &CalendarConfig,
        requested_start: DateTime<Utc>,
        requested_end: DateTime<Utc>,
        details: &BookingDetails,
        now: DateTime<Utc>,
    ) -> Result<Appointment, SchedulingError> {
        details.validate()?;
        config.validate()?;
        if requested_end <= requested_start {
            return Err(SchedulingError::InvalidRequest(
                "appointment end must be after its start".to_string(),
            ));
        }
        if requested_end - requested_start != Duration::minutes(config.slot_duration_minutes) {
            return Err(SchedulingError::InvalidRequest(format!(
                "appointments on this calendar last {} minutes",
                config.slot_duration_minutes
            )));
        }
        if requested_start <= now {
            return Err(SchedulingError::InvalidRequest(
                "appointment must start in the future".to_string(),
            ));
        }

        // Fresh listing on every attempt; earlier availability may be stale.
        let existing = self
            .call(
                "appointment listing",
                self.store
                    .list_appointments(&config.calendar_id, requested_start, requested_end),
            )
            .await?;
        let still_free = compute_available_slots(config, &existing, requested_start, requested_end)?
            .iter()
            .any(|slot| slot.start == requested_start);
        if !still_free {
            info!(
                calendar_id = %config.calendar_id,
                start = %requested_start,
                "requested slot failed re-validation"
            );
            return Err(SchedulingError::SlotNoLongerAvailable);
        }

        let appointment = self
            .call(
                "appointment insert",
                self.store.create_appointment(
                    &config.calendar_id,
                    requested_start,
                    requested_end,
                    details,
                ),
            )
            .await
            .inspect_err(|err| {
                if *err == SchedulingError::SlotNoLongerAvailable {
                    info!(calendar_id = %config.calendar_id, start = %requested_start, "lost booking race at insert");
                }
            })?;
        info!(
            appointment_id = %appointment.id,
            calendar_id = %appointment.calendar_id,
            start = %appointment.start_time,
            "appointment booked"
        );

        self.notify_booked(&appointment, now).await;
        Ok(appointment)
    }

    /// Runs only after the insert is confirmed; never fails the booking.
    async fn notify_booked(&self, appointment: &Appointment, now: DateTime<Utc>) {
        let notifications = async {
            self.reminders.confirm(appointment, now).await;
            self.reminders.schedule(appointment, now).await
        };
        match timeout(self.call_timeout, notifications).await {
            Ok(scheduled) => info!(appointment_id = %appointment.id, scheduled, "reminders scheduled"),
            Err(_) => warn!(appointment_id = %appointment.id, "reminder scheduling timed out"),
        }
    }

    pub async fn cancel_appointment(&self, appointment_id: &str) -> Result<Appointment, SchedulingError> {
        let appointment = self
            .call("appointment cancel", self.store.cancel_appointment(appointment_id))
            .await?;
        info!(appointment_id = %appointment.id, calendar_id = %appointment.calendar_id, "appointment cancelled");
        if timeout(self.call_timeout, self.reminders.cancel(appointment_id))
            .await
            .is_err()
        {
            warn!(%appointment_id, "dropping pending reminders timed out");
        }
        Ok(appointment)
    }

    pub async fn get_appointment(&self, appointment_id: &str) -> Result<Appointment, SchedulingError> {
        self.call("appointment lookup", self.store.get_appointment(appointment_id))
            .await
    }
}
