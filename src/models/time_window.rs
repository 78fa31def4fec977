use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::SchedulingError;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// "HH:MM" -> minutes since midnight.
pub fn parse_wall_clock(value: &str) -> Result<u32, SchedulingError> {
    let invalid = || SchedulingError::InvalidTimeFormat(value.to_string());
    let Some((hours, minutes)) = value.trim().split_once(':') else {
        return Err(invalid());
    };
    let parse_field = |field: &str| -> Result<u32, SchedulingError> {
        if field.is_empty() || field.len() > 2 || !field.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        field.parse::<u32>().map_err(|_| invalid())
    };
    let hours = parse_field(hours)?;
    let minutes = parse_field(minutes)?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    Ok(hours * 60 + minutes)
}

pub fn format_wall_clock(minutes_of_day: u32) -> String {
    format!("{:02}:{:02}", minutes_of_day / 60, minutes_of_day % 60)
}

/// Half-open overlap test: `[a_start, a_end)` against `[b_start, b_end)`.
/// Touching intervals do not overlap.
pub fn intervals_overlap<T: PartialOrd>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    a_start < b_end && b_start < a_end
}

/// Opening window for a single weekday, in minutes of the local day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WallClockRange", into = "WallClockRange")]
pub struct WallClockWindow {
    start: u32,
    end: u32,
}

impl WallClockWindow {
    pub fn new(start: u32, end: u32) -> Result<Self, SchedulingError> {
        if start >= MINUTES_PER_DAY || end > MINUTES_PER_DAY {
            return Err(SchedulingError::InvalidConfig(format!(
                "business hours {}-{} exceed the day",
                start, end
            )));
        }
        if start >= end {
            return Err(SchedulingError::InvalidConfig(format!(
                "business hours start {} must be before end {}",
                format_wall_clock(start),
                format_wall_clock(end)
            )));
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, SchedulingError> {
        Self::new(parse_wall_clock(start)?, parse_wall_clock(end)?)
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn contains_minute(&self, minute_of_day: u32) -> bool {
        self.start <= minute_of_day && minute_of_day < self.end
    }
}

/// Wire shape of a window: `{"start": "09:00", "end": "17:00"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WallClockRange {
    pub start: String,
    pub end: String,
}

impl TryFrom<WallClockRange> for WallClockWindow {
    type Error = SchedulingError;

    fn try_from(range: WallClockRange) -> Result<Self, Self::Error> {
        WallClockWindow::parse(&range.start, &range.end)
    }
}

impl From<WallClockWindow> for WallClockRange {
    fn from(window: WallClockWindow) -> Self {
        WallClockRange {
            start: format_wall_clock(window.start),
            end: format_wall_clock(window.end),
        }
    }
}

pub fn minute_of_day_in(instant: DateTime<Utc>, timezone: &Tz) -> u32 {
    let local = instant.with_timezone(timezone);
    local.hour() * 60 + local.minute()
}

/// False when the day is closed; otherwise tests the instant's local
/// minute of day against `[start, end)`.
pub fn is_within_business_hours(
    instant: DateTime<Utc>,
    hours: Option<&WallClockWindow>,
    timezone: &Tz,
) -> bool {
    match hours {
        Some(window) => window.contains_minute(minute_of_day_in(instant, timezone)),
        None => false,
    }
}
