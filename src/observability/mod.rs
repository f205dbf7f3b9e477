//! Observability for the table store
//!
//! - Structured logging (JSON lines)
//! - Typed events
//! - Per-store counters
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on store state
//! 3. No background threads
//! 4. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use bidsgrid::observability::{emit, Event};
//!
//! emit(Event::ColumnAdded, &[("field", "Age"), ("rows", "42")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Logs an event at its own severity
pub fn emit(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
