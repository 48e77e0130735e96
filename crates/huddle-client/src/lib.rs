pub mod commands;
pub mod connection;
pub mod display;
pub mod error;
