pub mod appointment;
pub mod calendar;
pub mod reminder;
pub mod time_window;
