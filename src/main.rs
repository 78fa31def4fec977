#![allow(non_snake_case)]

mod cli;
mod config;

use std::env;
use std::path::Path;
use std::process;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use appointmentEngine::clients::message_sender::{LogSender, MessageSender, WebhookSender};
use appointmentEngine::runtime;
use appointmentEngine::service::booking::BookingCoordinator;
use appointmentEngine::storage::appointments::LocalAppointmentStore;
use appointmentEngine::storage::reminder_queue::ReminderQueue;
use appointmentEngine::storage::settings::FileSettingsProvider;

use crate::config::{AppConfig, RunMode, Settings};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match env::var("CONFIG_FILE") {
        Ok(path) => AppConfig::from_file(&path).unwrap_or_else(|e| {
            warn!(%path, error = %e, "unable to read config file, using environment only");
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    };
    let settings = match Settings::load(&config) {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            process::exit(2);
        }
    };

    let calendars = if Path::new(&settings.calendars_file).exists() {
        match FileSettingsProvider::from_file(&settings.calendars_file) {
            Ok(calendars) => calendars,
            Err(e) => {
                error!(file = %settings.calendars_file, error = %e, "unable to load calendars");
                process::exit(2);
            }
        }
    } else {
        warn!(file = %settings.calendars_file, "calendars file not found, serving the demo calendar");
        FileSettingsProvider::demo()
    };
    info!(calendars = ?calendars.calendar_ids(), "calendars loaded");

    let store = match LocalAppointmentStore::open(&settings.appointments_location()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!(error = %e, "unable to load appointments");
            process::exit(1);
        }
    };
    let queue = match ReminderQueue::open(&settings.reminders_location()) {
        Ok(queue) => Arc::new(queue),
        Err(e) => {
            error!(error = %e, "unable to load reminder queue");
            process::exit(1);
        }
    };

    let coordinator = Arc::new(
        BookingCoordinator::new(
            Arc::new(calendars),
            store,
            queue.clone(),
            settings.reminder_offsets.clone(),
        )
        .with_call_timeout(settings.call_timeout),
    );

    match settings.run_mode {
        RunMode::Api => {
            let sender: Arc<dyn MessageSender> = match &settings.notify_webhook_url {
                Some(url) => match WebhookSender::new(url.clone(), settings.call_timeout) {
                    Ok(sender) => Arc::new(sender),
                    Err(e) => {
                        error!(error = %e, "unable to build notification client");
                        process::exit(1);
                    }
                },
                None => Arc::new(LogSender),
            };
            runtime::run_api(
                coordinator,
                queue,
                sender,
                settings.bind_addr,
                settings.reminder_poll_interval,
            )
            .await;
        }
        RunMode::Cli => cli::cli(coordinator).await,
    }
}
