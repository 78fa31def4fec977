use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard};

use crate::db::{load_db, save_db, DBError, DB};
use crate::error::DispatchError;
use crate::models::reminder::ReminderJob;
use crate::service::ports::ReminderDispatcher;

/// Pending reminder jobs awaiting delivery by the reminder loop.
pub struct ReminderQueue {
    jobs: Mutex<DB<ReminderJob>>,
    location: Option<String>,
}

impl ReminderQueue {
    pub fn in_memory() -> Self {
        Self {
            jobs: Mutex::new(DB::new()),
            location: None,
        }
    }

    pub fn open(location: &str) -> Result<Self, DBError> {
        Ok(Self {
            jobs: Mutex::new(load_db(location)?),
            location: Some(location.to_string()),
        })
    }

    pub async fn lock(&self) -> MutexGuard<'_, DB<ReminderJob>> {
        self.jobs.lock().await
    }

    pub fn save(&self, jobs: &DB<ReminderJob>) -> Result<(), DBError> {
        match &self.location {
            Some(location) => save_db(location, jobs),
            None => Ok(()),
        }
    }

    /// Pending jobs ordered by fire time.
    pub async fn pending(&self) -> Vec<ReminderJob> {
        let jobs = self.jobs.lock().await;
        let mut pending: Vec<ReminderJob> = jobs.values().cloned().collect();
        pending.sort_by_key(|job| job.fire_at);
        pending
    }

    pub async fn due(&self, now: DateTime<Utc>) -> Vec<ReminderJob> {
        let mut due = self.pending().await;
        due.retain(|job| job.is_due(now));
        due
    }
}

#[async_trait]
impl ReminderDispatcher for ReminderQueue {
    async fn enqueue_reminder(&self, job: ReminderJob) -> Result<(), DispatchError> {
        let mut jobs = self.jobs.lock().await;
        let id = job.id.clone();
        jobs.insert(id.clone(), job);
        if let Err(err) = self.save(&jobs) {
            jobs.remove(&id);
            return Err(DispatchError::Unavailable(err.to_string()));
        }
        Ok(())
    }

    async fn cancel_reminders(&self, appointment_id: &str) -> Result<(), DispatchError> {
        let mut jobs = self.jobs.lock().await;
        let dropped: Vec<String> = jobs
            .values()
            .filter(|job| job.appointment_id == appointment_id)
            .map(|job| job.id.clone())
            .collect();
        if dropped.is_empty() {
            return Ok(());
        }
        let removed: Vec<ReminderJob> = dropped.iter().filter_map(|id| jobs.remove(id)).collect();
        if let Err(err) = self.save(&jobs) {
            for job in removed {
                jobs.insert(job.id.clone(), job);
            }
            return Err(DispatchError::Unavailable(err.to_string()));
        }
        Ok(())
    }
}
