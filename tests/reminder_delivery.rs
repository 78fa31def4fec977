use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::Mutex;

use appointmentEngine::clients::message_sender::MessageSender;
use appointmentEngine::models::appointment::{Appointment, BookingDetails};
use appointmentEngine::models::reminder::{ReminderJob, ReminderKind, ReminderOffset};
use appointmentEngine::service::ports::ReminderDispatcher;
use appointmentEngine::storage::reminder_queue::ReminderQueue;
use appointmentEngine::tasks::reminder_loop::reminder_tick;

struct SlowSender {
    delay: StdDuration,
}

#[async_trait]
impl MessageSender for SlowSender {
    async fn send_message(&self, _recipient: &str, _content: &str) -> Result<(), String> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

struct MockSender {
    sent: Mutex<Vec<(String, String)>>,
    unreachable: HashSet<String>,
}

impl MockSender {
    fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            unreachable: HashSet::new(),
        }
    }

    fn failing_for(recipient: &str) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            unreachable: HashSet::from([recipient.to_string()]),
        }
    }
}

#[async_trait]
impl MessageSender for MockSender {
    async fn send_message(&self, recipient: &str, content: &str) -> Result<(), String> {
        if self.unreachable.contains(recipient) {
            return Err(format!("{} bounced", recipient));
        }
        self.sent
            .lock()
            .await
            .push((recipient.to_string(), content.to_string()));
        Ok(())
    }
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap()
}

fn appointment(email: &str, phone: Option<&str>) -> Appointment {
    let mut contact = BookingDetails::new("Grace", email);
    contact.phone = phone.map(str::to_string);
    Appointment::new(
        "sales",
        start(),
        start() + Duration::minutes(30),
        contact,
        start() - Duration::days(3),
    )
}

async fn enqueue(queue: &ReminderQueue, apt: &Appointment, offset_hours: i64) {
    let fire_at = apt.start_time - Duration::hours(offset_hours);
    queue
        .enqueue_reminder(ReminderJob::for_appointment(
            apt,
            ReminderKind::Before(ReminderOffset::hours(offset_hours)),
            fire_at,
        ))
        .await
        .unwrap();
}

#[tokio::test]
async fn tick_delivers_due_reminders_and_keeps_future_ones() {
    let queue = ReminderQueue::in_memory();
    let apt = appointment("grace@example.com", None);
    enqueue(&queue, &apt, 24).await;
    enqueue(&queue, &apt, 1).await;
    let sender = MockSender::new();

    let now = start() - Duration::hours(20);
    let delivered = reminder_tick(&queue, &sender, now).await.unwrap();

    assert_eq!(delivered, 1);
    let sent = sender.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "grace@example.com");
    assert!(sent[0].1.contains("Hi Grace"));
    assert!(sent[0].1.contains("in 20 hour(s)"));

    let pending = queue.pending().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].kind, ReminderKind::Before(ReminderOffset::hours(1)));
}

#[tokio::test]
async fn tick_sends_to_phone_as_well_as_email() {
    let queue = ReminderQueue::in_memory();
    let apt = appointment("grace@example.com", Some("+15550100"));
    enqueue(&queue, &apt, 1).await;
    let sender = MockSender::new();

    let delivered = reminder_tick(&queue, &sender, start() - Duration::hours(1))
        .await
        .unwrap();

    assert_eq!(delivered, 1);
    let recipients: Vec<String> = sender.sent.lock().await.iter().map(|(to, _)| to.clone()).collect();
    assert_eq!(recipients, vec!["grace@example.com", "+15550100"]);
    assert!(queue.pending().await.is_empty());
}

#[tokio::test]
async fn failed_delivery_stays_queued_for_next_tick() {
    let queue = ReminderQueue::in_memory();
    let apt = appointment("bounce@example.com", None);
    enqueue(&queue, &apt, 1).await;
    let now = start() - Duration::minutes(30);

    let failing = MockSender::failing_for("bounce@example.com");
    assert_eq!(reminder_tick(&queue, &failing, now).await.unwrap(), 0);
    assert_eq!(queue.pending().await.len(), 1);

    let working = MockSender::new();
    assert_eq!(reminder_tick(&queue, &working, now).await.unwrap(), 1);
    assert!(queue.pending().await.is_empty());
}

#[tokio::test]
async fn nothing_due_sends_nothing() {
    let queue = ReminderQueue::in_memory();
    let apt = appointment("grace@example.com", None);
    enqueue(&queue, &apt, 24).await;
    let sender = MockSender::new();

    let delivered = reminder_tick(&queue, &sender, start() - Duration::days(2))
        .await
        .unwrap();
    assert_eq!(delivered, 0);
    assert!(sender.sent.lock().await.is_empty());
    assert_eq!(queue.pending().await.len(), 1);
}

#[tokio::test]
async fn enqueue_is_not_blocked_by_slow_delivery() {
    let queue = Arc::new(ReminderQueue::in_memory());
    let apt = appointment("grace@example.com", None);
    enqueue(&queue, &apt, 1).await;
    let now = start() - Duration::minutes(30);

    let tick = tokio::spawn({
        let queue = queue.clone();
        async move {
            let sender = SlowSender {
                delay: StdDuration::from_millis(500),
            };
            reminder_tick(&queue, &sender, now).await
        }
    });
    tokio::time::sleep(StdDuration::from_millis(50)).await;

    let later = appointment("grace@example.com", None);
    let job = ReminderJob::for_appointment(&later, ReminderKind::Confirmation, now + Duration::hours(1));
    let queued = tokio::time::timeout(StdDuration::from_millis(100), queue.enqueue_reminder(job)).await;
    assert!(matches!(queued, Ok(Ok(()))));

    assert_eq!(tick.await.unwrap().unwrap(), 1);
    let pending = queue.pending().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].appointment_id, later.id);
}

#[tokio::test]
async fn partial_delivery_only_retries_the_failed_recipient() {
    let queue = ReminderQueue::in_memory();
    let apt = appointment("grace@example.com", Some("+15550100"));
    enqueue(&queue, &apt, 1).await;
    let now = start() - Duration::minutes(30);

    let phone_down = MockSender::failing_for("+15550100");
    assert_eq!(reminder_tick(&queue, &phone_down, now).await.unwrap(), 0);
    let pending = queue.pending().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].delivered_to, vec!["grace@example.com".to_string()]);

    let working = MockSender::new();
    assert_eq!(reminder_tick(&queue, &working, now).await.unwrap(), 1);
    let recipients: Vec<String> = working.sent.lock().await.iter().map(|(to, _)| to.clone()).collect();
    assert_eq!(recipients, vec!["+15550100"]);
    assert!(queue.pending().await.is_empty());
}
