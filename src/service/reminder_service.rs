use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::models::appointment::Appointment;
use crate::models::reminder::{ReminderJob, ReminderKind, ReminderOffset};
use crate::service::ports::ReminderDispatcher;

/// One job per offset whose fire time is still ahead of `now`, earliest
/// first. Elapsed offsets are dropped silently: a late booking simply gets
/// fewer reminders.
pub fn schedule_reminders(
    appointment: &Appointment,
    offsets: &[ReminderOffset],
    now: DateTime<Utc>,
) -> Vec<ReminderJob> {
    let mut jobs: Vec<ReminderJob> = offsets
        .iter()
        .filter_map(|offset| {
            let fire_at = appointment.start_time.checked_sub_signed(offset.as_duration())?;
            (fire_at > now).then(|| {
                ReminderJob::for_appointment(appointment, ReminderKind::Before(*offset), fire_at)
            })
        })
        .collect();
    jobs.sort_by_key(|job| job.fire_at);
    jobs
}

pub struct ReminderService {
    dispatcher: Arc<dyn ReminderDispatcher>,
    offsets: Vec<ReminderOffset>,
}

impl ReminderService {
    pub fn new(dispatcher: Arc<dyn ReminderDispatcher>, offsets: Vec<ReminderOffset>) -> Self {
        Self { dispatcher, offsets }
    }

    pub fn offsets(&self) -> &[ReminderOffset] {
        &self.offsets
    }

    /// Computes and enqueues reminders. Returns how many were accepted by the
    /// dispatcher; enqueue failures are logged and skipped.
    pub async fn schedule(&self, appointment: &Appointment, now: DateTime<Utc>) -> usize {
        let jobs = schedule_reminders(appointment, &self.offsets, now);
        if jobs.is_empty() {
            debug!(appointment_id = %appointment.id, "all reminder offsets already elapsed");
        }
        let mut accepted = 0;
        for job in jobs {
            let kind = job.kind;
            let fire_at = job.fire_at;
            match self.dispatcher.enqueue_reminder(job).await {
                Ok(()) => {
                    debug!(appointment_id = %appointment.id, %kind, %fire_at, "reminder scheduled");
                    accepted += 1;
                }
                Err(err) => {
                    warn!(appointment_id = %appointment.id, %kind, error = %err, "failed to enqueue reminder");
                }
            }
        }
        accepted
    }

    /// Best-effort booking confirmation, delivered immediately.
    pub async fn confirm(&self, appointment: &Appointment, now: DateTime<Utc>) -> bool {
        let job = ReminderJob::for_appointment(appointment, ReminderKind::Confirmation, now);
        match self.dispatcher.enqueue_reminder(job).await {
            Ok(()) => true,
            Err(err) => {
                warn!(appointment_id = %appointment.id, error = %err, "failed to enqueue confirmation");
                false
            }
        }
    }

    pub async fn cancel(&self, appointment_id: &str) {
        if let Err(err) = self.dispatcher.cancel_reminders(appointment_id).await {
            warn!(%appointment_id, error = %err, "failed to drop pending reminders");
        }
    }
}
