use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::SchedulingError;
use crate::models::time_window::{WallClockRange, WallClockWindow, MINUTES_PER_DAY};

pub const DEFAULT_SLOT_DURATION_MINUTES: i64 = 30;
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// Opening hours per weekday, indexed 0 = Sunday .. 6 = Saturday.
/// `None` means the calendar is closed that day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusinessHours {
    days: [Option<WallClockWindow>; 7],
}

impl BusinessHours {
    pub fn closed() -> Self {
        Self::default()
    }

    /// Monday to Friday with the same window, weekends closed.
    pub fn weekdays(window: WallClockWindow) -> Self {
        let mut hours = Self::closed();
        for day in 1..=5 {
            hours.days[day] = Some(window);
        }
        hours
    }

    pub fn with_day(mut self, weekday: usize, window: Option<WallClockWindow>) -> Self {
        if let Some(slot) = self.days.get_mut(weekday) {
            *slot = window;
        }
        self
    }

    pub fn for_index(&self, weekday: usize) -> Option<&WallClockWindow> {
        self.days.get(weekday).and_then(|day| day.as_ref())
    }

    pub fn for_weekday(&self, weekday: Weekday) -> Option<&WallClockWindow> {
        self.for_index(weekday.num_days_from_sunday() as usize)
    }

    pub fn is_closed_every_day(&self) -> bool {
        self.days.iter().all(Option::is_none)
    }
}

/// Immutable snapshot of a calendar's booking rules.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarConfig {
    pub calendar_id: String,
    pub business_hours: BusinessHours,
    pub slot_duration_minutes: i64,
    pub buffer_minutes: i64,
    pub timezone: Tz,
}

impl CalendarConfig {
    pub fn new(calendar_id: &str, business_hours: BusinessHours, timezone: Tz) -> Self {
        Self {
            calendar_id: calendar_id.to_string(),
            business_hours,
            slot_duration_minutes: DEFAULT_SLOT_DURATION_MINUTES,
            buffer_minutes: 0,
            timezone,
        }
    }

    pub fn with_slot_duration(mut self, minutes: i64) -> Self {
        self.slot_duration_minutes = minutes;
        self
    }

    pub fn with_buffer(mut self, minutes: i64) -> Self {
        self.buffer_minutes = minutes;
        self
    }

    pub fn validate(&self) -> Result<(), SchedulingError> {
        if self.slot_duration_minutes <= 0 {
            return Err(SchedulingError::InvalidConfig(format!(
                "slot duration must be positive, got {}",
                self.slot_duration_minutes
            )));
        }
        if self.buffer_minutes < 0 {
            return Err(SchedulingError::InvalidConfig(format!(
                "buffer time cannot be negative, got {}",
                self.buffer_minutes
            )));
        }
        // Neither can exceed a day: no business window is longer.
        let day = i64::from(MINUTES_PER_DAY);
        if self.slot_duration_minutes > day {
            return Err(SchedulingError::InvalidConfig(format!(
                "slot duration cannot exceed {} minutes, got {}",
                day, self.slot_duration_minutes
            )));
        }
        if self.buffer_minutes > day {
            return Err(SchedulingError::InvalidConfig(format!(
                "buffer time cannot exceed {} minutes, got {}",
                day, self.buffer_minutes
            )));
        }
        Ok(())
    }

    pub fn hours_on(&self, instant: DateTime<Utc>) -> Option<&WallClockWindow> {
        self.business_hours
            .for_weekday(instant.with_timezone(&self.timezone).weekday())
    }

    pub fn to_settings(&self) -> CalendarSettings {
        let business_hours = (0..7)
            .map(|day| {
                (
                    day.to_string(),
                    self.business_hours.for_index(day).map(|w| WallClockRange::from(*w)),
                )
            })
            .collect();
        CalendarSettings {
            business_hours,
            slot_duration: Some(self.slot_duration_minutes),
            buffer_time: Some(self.buffer_minutes),
            timezone: Some(self.timezone.name().to_string()),
        }
    }
}

/// Settings as stored in the calendars file:
///
/// ```json
/// {"businessHours": {"0": null, "1": {"start": "09:00", "end": "17:00"}},
///  "slotDuration": 30, "bufferTime": 0, "timezone": "America/New_York"}
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarSettings {
    #[serde(default)]
    pub business_hours: BTreeMap<String, Option<WallClockRange>>,
    #[serde(default)]
    pub slot_duration: Option<i64>,
    #[serde(default)]
    pub buffer_time: Option<i64>,
    #[serde(default)]
    pub timezone: Option<String>,
}

impl CalendarSettings {
    pub fn into_config(self, calendar_id: &str) -> Result<CalendarConfig, SchedulingError> {
        let mut hours = BusinessHours::closed();
        for (key, range) in self.business_hours {
            let day = key
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|day| *day < 7)
                .ok_or_else(|| {
                    SchedulingError::InvalidConfig(format!(
                        "weekday key '{}' must be between 0 (Sunday) and 6 (Saturday)",
                        key
                    ))
                })?;
            let window = match range {
                Some(range) => Some(WallClockWindow::try_from(range)?),
                None => None,
            };
            hours = hours.with_day(day, window);
        }

        let timezone_name = self.timezone.unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone: Tz = timezone_name.parse().map_err(|_| {
            SchedulingError::InvalidConfig(format!("unknown timezone '{}'", timezone_name))
        })?;

        let config = CalendarConfig {
            calendar_id: calendar_id.to_string(),
            business_hours: hours,
            slot_duration_minutes: self.slot_duration.unwrap_or(DEFAULT_SLOT_DURATION_MINUTES),
            buffer_minutes: self.buffer_time.unwrap_or(0),
            timezone,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<CalendarConfig, SchedulingError> {
        let settings: CalendarSettings = serde_json::from_str(json).unwrap();
        settings.into_config("cal-1")
    }

    #[test]
    fn settings_fill_defaults_and_close_missing_days() {
        let config = parse(r#"{"businessHours": {"1": {"start": "09:00", "end": "17:00"}, "0": null}}"#)
            .unwrap();
        assert_eq!(config.slot_duration_minutes, 30);
        assert_eq!(config.buffer_minutes, 0);
        assert_eq!(config.timezone, chrono_tz::UTC);
        assert!(config.business_hours.for_weekday(Weekday::Mon).is_some());
        assert!(config.business_hours.for_weekday(Weekday::Sun).is_none());
        assert!(config.business_hours.for_weekday(Weekday::Tue).is_none());
    }

    #[test]
    fn settings_reject_bad_values() {
        assert!(matches!(
            parse(r#"{"businessHours": {"1": {"start": "9am", "end": "17:00"}}}"#),
            Err(SchedulingError::InvalidTimeFormat(_))
        ));
        assert!(matches!(
            parse(r#"{"businessHours": {"1": {"start": "17:00", "end": "09:00"}}}"#),
            Err(SchedulingError::InvalidConfig(_))
        ));
        assert!(matches!(
            parse(r#"{"businessHours": {"7": null}}"#),
            Err(SchedulingError::InvalidConfig(_))
        ));
        assert!(matches!(
            parse(r#"{"slotDuration": 0}"#),
            Err(SchedulingError::InvalidConfig(_))
        ));
        assert!(matches!(
            parse(r#"{"bufferTime": -5}"#),
            Err(SchedulingError::InvalidConfig(_))
        ));
        assert!(matches!(
            parse(r#"{"timezone": "Mars/Olympus"}"#),
            Err(SchedulingError::InvalidConfig(_))
        ));
    }

    #[test]
    fn settings_reject_durations_longer_than_a_day() {
        assert!(matches!(
            parse(r#"{"slotDuration": 1000000000000}"#),
            Err(SchedulingError::InvalidConfig(_))
        ));
        assert!(matches!(
            parse(r#"{"bufferTime": 9223372036854775807}"#),
            Err(SchedulingError::InvalidConfig(_))
        ));
        assert!(parse(r#"{"slotDuration": 1440, "bufferTime": 1440}"#).is_ok());
    }

    #[test]
    fn to_settings_lists_every_weekday() {
        let window = WallClockWindow::parse("09:00", "17:00").unwrap();
        let config = CalendarConfig::new("cal-1", BusinessHours::weekdays(window), chrono_tz::America::New_York)
            .with_buffer(15);
        let settings = config.to_settings();
        assert_eq!(settings.business_hours.len(), 7);
        assert!(settings.business_hours["0"].is_none());
        assert_eq!(settings.business_hours["3"].as_ref().unwrap().start, "09:00");
        assert_eq!(settings.timezone.as_deref(), Some("America/New_York"));

        let again = settings.into_config("cal-1").unwrap();
        assert_eq!(again, config);
    }
}
