//! Control panel and worker for the hello-pi appliance service.
//!
//! The two processes share nothing but a JSON file: the panel writes it and
//! restarts the systemd unit, the worker re-reads it every cycle.

pub mod app;
pub mod cli;
pub mod config;
pub mod logging;
pub mod report;
pub mod worker;
