use std::collections::HashMap;
use std::fs;

use async_trait::async_trait;

use crate::error::{SchedulingError, StoreError};
use crate::models::calendar::{BusinessHours, CalendarConfig, CalendarSettings};
use crate::models::time_window::WallClockWindow;
use crate::service::ports::CalendarSettingsProvider;

pub const DEMO_CALENDAR_ID: &str = "default";

/// Calendar settings loaded once from a JSON document keyed by calendar id.
/// Every entry is validated up front, so lookups only fail with `NotFound`.
#[derive(Debug, Clone, Default)]
pub struct FileSettingsProvider {
    calendars: HashMap<String, CalendarConfig>,
}

impl FileSettingsProvider {
    pub fn from_configs(configs: Vec<CalendarConfig>) -> Self {
        Self {
            calendars: configs
                .into_iter()
                .map(|config| (config.calendar_id.clone(), config))
                .collect(),
        }
    }

    pub fn from_json(content: &str) -> Result<Self, SchedulingError> {
        let raw: HashMap<String, CalendarSettings> = serde_json::from_str(content)
            .map_err(|e| SchedulingError::InvalidConfig(format!("calendars file: {}", e)))?;
        let mut calendars = HashMap::new();
        for (calendar_id, settings) in raw {
            let config = settings.into_config(&calendar_id)?;
            calendars.insert(calendar_id, config);
        }
        Ok(Self { calendars })
    }

    pub fn from_file(path: &str) -> Result<Self, SchedulingError> {
        let content = fs::read_to_string(path)
            .map_err(|e| SchedulingError::InvalidConfig(format!("cannot read {}: {}", path, e)))?;
        Self::from_json(&content)
    }

    /// Weekdays 09:00-17:00 New York time, 30 minute slots, no buffer.
    pub fn demo() -> Self {
        let hours = WallClockWindow::new(9 * 60, 17 * 60)
            .map(BusinessHours::weekdays)
            .unwrap_or_default();
        Self::from_configs(vec![CalendarConfig::new(
            DEMO_CALENDAR_ID,
            hours,
            chrono_tz::America::New_York,
        )])
    }

    pub fn calendar_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.calendars.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl CalendarSettingsProvider for FileSettingsProvider {
    async fn get_calendar_config(&self, calendar_id: &str) -> Result<CalendarConfig, StoreError> {
        self.calendars
            .get(calendar_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("calendar {}", calendar_id)))
    }
}
