use std::collections::HashMap;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::time::Duration;

use appointmentEngine::models::reminder::ReminderOffset;

pub const DEFAULT_RUN_MODE: &str = "cli";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3030";
pub const DEFAULT_DB_LOCATION: &str = "./data";
pub const DEFAULT_CALENDARS_FILE: &str = "./calendars.json";
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_REMINDER_POLL_SECS: u64 = 30;

#[derive(Debug, Default, Clone)]
pub struct AppConfig {
    values: HashMap<String, String>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self, String> {
        let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
        Self::parse(&content)
    }

    /// `KEY=value` lines; blank lines and `#` comments are skipped, an
    /// optional `export ` prefix and surrounding quotes are stripped.
    pub fn parse(content: &str) -> Result<Self, String> {
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(format!("Invalid config line {}: {}", idx + 1, line));
            };
            let key = key.trim();
            let mut value = value.trim().to_string();
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = value[1..value.len() - 1].to_string();
            }
            values.insert(key.to_string(), value);
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Api,
    Cli,
}

/// Typed process settings. File values win over environment variables.
#[derive(Debug, Clone)]
pub struct Settings {
    pub run_mode: RunMode,
    pub bind_addr: SocketAddr,
    pub db_location: String,
    pub calendars_file: String,
    pub reminder_offsets: Vec<ReminderOffset>,
    pub call_timeout: Duration,
    pub notify_webhook_url: Option<String>,
    pub reminder_poll_interval: Duration,
}

impl Settings {
    pub fn load(config: &AppConfig) -> Result<Self, String> {
        Self::resolve(|key| config.get(key).or_else(|| env::var(key).ok()))
    }

    pub fn resolve<F>(get_prop: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get_or = |key: &str, default: &str| {
            get_prop(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let run_mode = match get_or("RUN_MODE", DEFAULT_RUN_MODE).as_str() {
            "api" => RunMode::Api,
            "cli" => RunMode::Cli,
            other => return Err(format!("Invalid run mode {}", other)),
        };
        let bind_addr = get_or("BIND_ADDR", DEFAULT_BIND_ADDR)
            .parse::<SocketAddr>()
            .map_err(|e| format!("Invalid BIND_ADDR: {}", e))?;
        let reminder_offsets = match get_prop("REMINDER_OFFSETS").filter(|v| !v.trim().is_empty()) {
            Some(value) => ReminderOffset::parse_list(&value)?,
            None => ReminderOffset::defaults(),
        };
        let call_timeout_secs = parse_secs(&get_or("CALL_TIMEOUT_SECS", ""), DEFAULT_CALL_TIMEOUT_SECS, "CALL_TIMEOUT_SECS")?;
        let poll_secs = parse_secs(&get_or("REMINDER_POLL_SECS", ""), DEFAULT_REMINDER_POLL_SECS, "REMINDER_POLL_SECS")?;

        Ok(Self {
            run_mode,
            bind_addr,
            db_location: get_or("DB_LOCATION", DEFAULT_DB_LOCATION),
            calendars_file: get_or("CALENDARS_FILE", DEFAULT_CALENDARS_FILE),
            reminder_offsets,
            call_timeout: Duration::from_secs(call_timeout_secs),
            notify_webhook_url: get_prop("NOTIFY_WEBHOOK_URL").filter(|v| !v.trim().is_empty()),
            reminder_poll_interval: Duration::from_secs(poll_secs),
        })
    }

    pub fn appointments_location(&self) -> String {
        format!("{}/appointments", self.db_location.trim_end_matches('/'))
    }

    pub fn reminders_location(&self) -> String {
        format!("{}/reminders", self.db_location.trim_end_matches('/'))
    }
}

fn parse_secs(value: &str, default: u64, key: &str) -> Result<u64, String> {
    if value.is_empty() {
        return Ok(default);
    }
    match value.parse::<u64>() {
        Ok(0) | Err(_) => Err(format!("{} must be a positive number of seconds, got {}", key, value)),
        Ok(secs) => Ok(secs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_from(pairs: &[(&str, &str)]) -> Result<Settings, String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::resolve(|key| map.get(key).cloned())
    }

    #[test]
    fn parses_key_value_lines() {
        let config = AppConfig::parse(
            "# comment\nexport RUN_MODE=api\nBIND_ADDR = \"0.0.0.0:8080\"\n\nDB_LOCATION='/tmp/x'\n",
        )
        .unwrap();
        assert_eq!(config.get("RUN_MODE").as_deref(), Some("api"));
        assert_eq!(config.get("BIND_ADDR").as_deref(), Some("0.0.0.0:8080"));
        assert_eq!(config.get("DB_LOCATION").as_deref(), Some("/tmp/x"));
    }

    #[test]
    fn rejects_line_without_equals() {
        let err = AppConfig::parse("RUN_MODE\n").unwrap_err();
        assert!(err.contains("line 1"));
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let settings = settings_from(&[]).unwrap();
        assert_eq!(settings.run_mode, RunMode::Cli);
        assert_eq!(settings.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(settings.reminder_offsets, ReminderOffset::defaults());
        assert_eq!(settings.call_timeout, Duration::from_secs(5));
        assert_eq!(settings.reminder_poll_interval, Duration::from_secs(30));
        assert!(settings.notify_webhook_url.is_none());
        assert_eq!(settings.appointments_location(), "./data/appointments");
    }

    #[test]
    fn reads_overrides() {
        let settings = settings_from(&[
            ("RUN_MODE", "api"),
            ("REMINDER_OFFSETS", "2d, 30m"),
            ("CALL_TIMEOUT_SECS", "2"),
            ("NOTIFY_WEBHOOK_URL", "http://localhost:9000/notify"),
            ("DB_LOCATION", "/var/lib/appointments/"),
        ])
        .unwrap();
        assert_eq!(settings.run_mode, RunMode::Api);
        assert_eq!(
            settings.reminder_offsets,
            vec![ReminderOffset::days(2), ReminderOffset::minutes(30)]
        );
        assert_eq!(settings.call_timeout, Duration::from_secs(2));
        assert_eq!(settings.reminders_location(), "/var/lib/appointments/reminders");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(settings_from(&[("RUN_MODE", "bot")]).is_err());
        assert!(settings_from(&[("BIND_ADDR", "localhost")]).is_err());
        assert!(settings_from(&[("CALL_TIMEOUT_SECS", "0")]).is_err());
        assert!(settings_from(&[("REMINDER_OFFSETS", "soon")]).is_err());
    }
}
