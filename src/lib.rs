//! Intake bot: client registration wizard and order-status lookups over a
//! spreadsheet-backed client table.

pub mod bot;
pub mod channels;
pub mod config;
pub mod error;
pub mod menu;
pub mod query;
pub mod store;
pub mod wizard;
