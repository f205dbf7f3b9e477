//! Ingestion subsystem
//!
//! Raw rows enter the store only through this boundary. Discovery and
//! reading of sidecar files live behind `IngestionAdapter`; parse failures
//! of single items travel as `InvalidItem`s, never as errors.

mod adapter;
mod document;

pub use adapter::{
    format_invalid_items, IngestionAdapter, IngestionBatch, IngestionReport, InvalidItem,
};
pub use document::JsonDocument;
