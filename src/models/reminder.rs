use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::appointment::{Appointment, BookingDetails};

/// Longest lead time a reminder may have.
pub const MAX_OFFSET_MINUTES: i64 = 365 * 24 * 60;

/// How long before an appointment a reminder fires, e.g. `24h` or `90m`.
/// Always within `0..=MAX_OFFSET_MINUTES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReminderOffset {
    minutes: i64,
}

impl ReminderOffset {
    pub fn minutes(minutes: i64) -> Self {
        Self {
            minutes: minutes.clamp(0, MAX_OFFSET_MINUTES),
        }
    }

    pub fn hours(hours: i64) -> Self {
        Self::minutes(hours.saturating_mul(60))
    }

    pub fn days(days: i64) -> Self {
        Self::minutes(days.saturating_mul(24 * 60))
    }

    pub fn as_duration(&self) -> Duration {
        Duration::minutes(self.minutes)
    }

    /// Offsets the booking flow uses unless configured otherwise.
    pub fn defaults() -> Vec<ReminderOffset> {
        vec![ReminderOffset::hours(24), ReminderOffset::hours(1)]
    }

    pub fn parse_list(value: &str) -> Result<Vec<ReminderOffset>, String> {
        value
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl fmt::Display for ReminderOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.minutes % 60 == 0 {
            write!(f, "{}h", self.minutes / 60)
        } else {
            write!(f, "{}m", self.minutes)
        }
    }
}

impl FromStr for ReminderOffset {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        let invalid = || format!("Invalid reminder offset '{}': expected e.g. 24h, 90m or 2d", value);
        let Some((unit_at, _)) = value.char_indices().last() else {
            return Err(invalid());
        };
        let (amount, unit) = value.split_at(unit_at);
        let amount: i64 = amount.parse().map_err(|_| invalid())?;
        if amount <= 0 {
            return Err(invalid());
        }
        let per_unit = match unit {
            "m" => 1,
            "h" => 60,
            "d" => 24 * 60,
            _ => return Err(invalid()),
        };
        match amount.checked_mul(per_unit) {
            Some(minutes) if minutes <= MAX_OFFSET_MINUTES => Ok(ReminderOffset::minutes(minutes)),
            _ => Err(format!(
                "Reminder offset '{}' is longer than the 365 day maximum",
                value
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ReminderKind {
    /// Sent right after a booking is stored.
    Confirmation,
    Before(ReminderOffset),
}

impl fmt::Display for ReminderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReminderKind::Confirmation => write!(f, "confirmation"),
            ReminderKind::Before(offset) => write!(f, "{}", offset),
        }
    }
}

impl TryFrom<String> for ReminderKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "confirmation" {
            return Ok(ReminderKind::Confirmation);
        }
        value.parse().map(ReminderKind::Before)
    }
}

impl From<ReminderKind> for String {
    fn from(kind: ReminderKind) -> Self {
        kind.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderJob {
    pub id: String,
    pub appointment_id: String,
    pub calendar_id: String,
    pub kind: ReminderKind,
    pub fire_at: DateTime<Utc>,
    pub appointment_start: DateTime<Utc>,
    pub contact: BookingDetails,
    /// Recipients that already received this job, so a retry after a
    /// partial failure only goes to the rest.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delivered_to: Vec<String>,
}

impl ReminderJob {
    pub fn for_appointment(appointment: &Appointment, kind: ReminderKind, fire_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            appointment_id: appointment.id.clone(),
            calendar_id: appointment.calendar_id.clone(),
            kind,
            fire_at,
            appointment_start: appointment.start_time,
            contact: appointment.contact.clone(),
            delivered_to: Vec::new(),
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.fire_at <= now
    }
}
