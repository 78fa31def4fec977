pub mod message_sender;
