//! Toggles a WireGuard tunnel service off on trusted networks and on
//! everywhere else, keyed on the default gateway.

pub mod app;
pub mod cli;
pub mod cmdline;
pub mod config;
pub mod error;
pub mod gateway;
pub mod installer;
pub mod matcher;
pub mod platform;
pub mod registry;
pub mod report;
pub mod signal;
pub mod task;
pub mod toggle;
