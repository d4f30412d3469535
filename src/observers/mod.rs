//! # Built-in event observers.
//!
//! Optional helpers that consume scheduler events. Enabled with the
//! `logging` feature.

mod log;

pub use log::LogWriter;
