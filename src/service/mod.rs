pub mod availability;
pub mod booking;
pub mod notification_service;
pub mod ports;
pub mod reminder_service;
