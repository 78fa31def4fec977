use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::clients::message_sender::MessageSender;
use crate::models::reminder::ReminderJob;
use crate::service::notification_service::NotificationService;
use crate::storage::reminder_queue::ReminderQueue;

pub async fn run_reminder_loop(
    queue: Arc<ReminderQueue>,
    sender: Arc<dyn MessageSender>,
    poll_interval: Duration,
) {
    loop {
        sleep(poll_interval).await;
        if let Err(err) = reminder_tick(&queue, sender.as_ref(), Utc::now()).await {
            warn!(error = %err, "reminder tick failed");
        }
    }
}

enum Outcome {
    Delivered,
    Partial(Vec<String>),
    Failed,
}

/// Sends every job due at `now` and removes the ones delivered. The queue
/// lock is not held while sending. A recipient that failed is retried on
/// the next tick; recipients that succeeded are not sent to again.
/// Returns the number of jobs fully delivered.
pub async fn reminder_tick<S: MessageSender + ?Sized>(
    queue: &ReminderQueue,
    sender: &S,
    now: DateTime<Utc>,
) -> Result<usize, String> {
    let due = queue.due(now).await;
    if due.is_empty() {
        return Ok(0);
    }

    let mut outcomes = Vec::with_capacity(due.len());
    for job in due {
        let outcome = deliver(&job, sender, now).await;
        outcomes.push((job, outcome));
    }

    let mut jobs = queue.lock().await;
    let mut delivered = 0;
    for (job, outcome) in outcomes {
        match outcome {
            Outcome::Delivered => {
                debug!(job_id = %job.id, appointment_id = %job.appointment_id, kind = %job.kind, "reminder delivered");
                jobs.remove(&job.id);
                delivered += 1;
            }
            Outcome::Partial(reached) => {
                // Cancelled while sending: nothing left to update.
                if let Some(stored) = jobs.get_mut(&job.id) {
                    stored.delivered_to = reached;
                }
            }
            Outcome::Failed => {}
        }
    }
    queue.save(&jobs).map_err(|e| e.to_string())?;
    Ok(delivered)
}

async fn deliver<S: MessageSender + ?Sized>(job: &ReminderJob, sender: &S, now: DateTime<Utc>) -> Outcome {
    let body = NotificationService::build_message(job, now);
    let mut reached = job.delivered_to.clone();
    let mut failed = false;
    for recipient in NotificationService::recipients(job) {
        if reached.contains(&recipient) {
            continue;
        }
        match sender.send_message(&recipient, &body).await {
            Ok(()) => reached.push(recipient),
            Err(err) => {
                warn!(job_id = %job.id, %recipient, error = %err, "reminder delivery failed");
                failed = true;
            }
        }
    }
    if !failed {
        Outcome::Delivered
    } else if reached.len() > job.delivered_to.len() {
        Outcome::Partial(reached)
    } else {
        Outcome::Failed
    }
}
