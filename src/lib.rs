pub mod config;
pub mod display;
pub mod error;
pub mod hass;
pub mod server;
pub mod ui;
