use chrono::{DateTime, Utc};

use crate::models::reminder::{ReminderJob, ReminderKind};

pub struct NotificationService;

impl NotificationService {
    pub fn build_message(job: &ReminderJob, now: DateTime<Utc>) -> String {
        let name = match job.contact.name.trim() {
            "" => "there",
            name => name,
        };
        let when = format!(
            "{} at {} UTC",
            job.appointment_start.format("%A, %B %-d %Y"),
            job.appointment_start.format("%H:%M")
        );
        match job.kind {
            ReminderKind::Confirmation => format!(
                "Hi {}, your appointment on {} is confirmed. Reply CANCEL to cancel.",
                name, when
            ),
            ReminderKind::Before(_) => {
                let remaining = job.appointment_start - now;
                let lead = if remaining.num_hours() >= 1 {
                    format!("in {} hour(s)", remaining.num_hours())
                } else if remaining.num_minutes() >= 1 {
                    format!("in {} minute(s)", remaining.num_minutes())
                } else {
                    "now".to_string()
                };
                format!(
                    "Hi {}, this is a reminder that your appointment is {} ({}).",
                    name, lead, when
                )
            }
        }
    }

    /// Email first, then phone for SMS when one was given.
    pub fn recipients(job: &ReminderJob) -> Vec<String> {
        let mut recipients = vec![job.contact.email.trim().to_string()];
        if let Some(phone) = job.contact.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            recipients.push(phone.to_string());
        }
        recipients
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::appointment::{Appointment, BookingDetails};
    use crate::models::reminder::ReminderOffset;
    use chrono::{Duration, TimeZone};

    fn job(kind: ReminderKind, phone: Option<&str>) -> ReminderJob {
        let start = Utc.with_ymd_and_hms(2026, 2, 10, 12, 0, 0).unwrap();
        let mut contact = BookingDetails::new("Ada", "ada@example.com");
        contact.phone = phone.map(str::to_string);
        let apt = Appointment::new("cal-1", start, start + Duration::minutes(30), contact, start);
        ReminderJob::for_appointment(&apt, kind, start - Duration::days(1))
    }

    #[test]
    fn reminder_mentions_time_remaining_and_slot() {
        let job = job(ReminderKind::Before(ReminderOffset::hours(24)), None);
        let msg = NotificationService::build_message(&job, job.fire_at);
        assert!(msg.contains("Hi Ada"));
        assert!(msg.contains("in 24 hour(s)"));
        assert!(msg.contains("Tuesday, February 10 2026 at 12:00 UTC"));
    }

    #[test]
    fn confirmation_offers_cancel() {
        let job = job(ReminderKind::Confirmation, None);
        let msg = NotificationService::build_message(&job, job.fire_at);
        assert!(msg.contains("is confirmed"));
        assert!(msg.contains("Reply CANCEL"));
    }

    #[test]
    fn recipients_include_phone_when_present() {
        assert_eq!(
            NotificationService::recipients(&job(ReminderKind::Confirmation, Some(" +15550100 "))),
            vec!["ada@example.com".to_string(), "+15550100".to_string()]
        );
        assert_eq!(
            NotificationService::recipients(&job(ReminderKind::Confirmation, Some(""))),
            vec!["ada@example.com".to_string()]
        );
    }
}
