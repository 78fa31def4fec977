use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use inquire::Text;
use serde::Serialize;

use appointmentEngine::error::SchedulingError;
use appointmentEngine::models::appointment::BookingDetails;
use appointmentEngine::service::booking::{BookingCoordinator, BookingRequest};

#[derive(Parser)]
#[command(about = "Query availability and manage bookings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List bookable slots between two instants.
    Slots {
        calendar_id: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Book a slot. `end` defaults to the calendar's slot duration.
    Book {
        calendar_id: String,
        start: DateTime<Utc>,
        #[arg(long)]
        end: Option<DateTime<Utc>>,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Book a slot, asking for contact details interactively.
    BookPrompt {
        calendar_id: String,
        start: DateTime<Utc>,
    },
    Cancel {
        appointment_id: String,
    },
    Show {
        appointment_id: String,
    },
    Settings {
        calendar_id: String,
    },
}

pub async fn cli(coordinator: Arc<BookingCoordinator>) {
    // Fine to exit here on bad arguments
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Slots {
            calendar_id,
            start,
            end,
        } => coordinator
            .available_slots(&calendar_id, start, end, Utc::now())
            .await
            .map(|availability| {
                println!(
                    "{} ({}): {} slot(s)",
                    availability.config.calendar_id,
                    availability.config.timezone.name(),
                    availability.slots.len()
                );
                for slot in availability.slots {
                    println!("  {} - {}", slot.start.to_rfc3339(), slot.end.to_rfc3339());
                }
            }),
        Commands::Book {
            calendar_id,
            start,
            end,
            name,
            email,
            phone,
            notes,
        } => {
            let details = BookingDetails {
                name,
                email,
                phone,
                notes,
            };
            book(&coordinator, &calendar_id, start, end, details).await
        }
        Commands::BookPrompt { calendar_id, start } => match prompt_details() {
            Ok(details) => book(&coordinator, &calendar_id, start, None, details).await,
            Err(e) => {
                println!("No contact details supplied: {}", e);
                return;
            }
        },
        Commands::Cancel { appointment_id } => coordinator
            .cancel_appointment(&appointment_id)
            .await
            .map(|appointment| print_json(&appointment)),
        Commands::Show { appointment_id } => coordinator
            .get_appointment(&appointment_id)
            .await
            .map(|appointment| print_json(&appointment)),
        Commands::Settings { calendar_id } => coordinator
            .calendar_settings(&calendar_id)
            .await
            .map(|config| print_json(&config.to_settings())),
    };

    if let Err(e) = result {
        println!("Request failed ({}): {}", e.code(), e);
    }
}

async fn book(
    coordinator: &BookingCoordinator,
    calendar_id: &str,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
    details: BookingDetails,
) -> Result<(), SchedulingError> {
    let end = match end {
        Some(end) => end,
        None => {
            let config = coordinator.calendar_settings(calendar_id).await?;
            start + Duration::minutes(config.slot_duration_minutes)
        }
    };
    let request = BookingRequest {
        calendar_id: calendar_id.to_string(),
        start,
        end,
        details,
    };
    let appointment = coordinator.book_slot(&request, Utc::now()).await?;
    println!("Booked appointment {}", appointment.id);
    print_json(&appointment);
    Ok(())
}

fn prompt_details() -> Result<BookingDetails, Box<dyn std::error::Error>> {
    let name = Text::new("Your name:").prompt()?;
    let email = Text::new("Email address:").prompt()?;
    let phone = Text::new("Phone (optional):").prompt()?;
    let notes = Text::new("Notes (optional):").prompt()?;
    let optional = |value: String| Some(value.trim().to_string()).filter(|v| !v.is_empty());
    Ok(BookingDetails {
        name,
        email,
        phone: optional(phone),
        notes: optional(notes),
    })
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => println!("Unable to render output: {}", e),
    }
}
