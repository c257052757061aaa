//! Core domain + application logic for the open-government disclosure notifier.
//!
//! Framework-agnostic: HTTP and Telegram live behind ports (traits) implemented
//! in adapter crates.

pub mod collector;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod portal;
pub mod ports;

pub use errors::{Error, Result};
