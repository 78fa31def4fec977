pub mod appointments;
pub mod reminder_queue;
pub mod settings;
