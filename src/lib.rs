//! bidsgrid - A validated, schema-driven tabular store for BIDS sidecar metadata
//!
//! Rows (one per imaging subject/session) hold typed cells whose columns come
//! from a field registry. Every mutation re-validates the affected cells and
//! publishes a new immutable snapshot carrying a per-field, per-row error
//! index.

pub mod config;
pub mod core;
pub mod index;
pub mod ingest;
pub mod observability;
pub mod schema;
pub mod table;

pub use crate::config::{GridConfig, RemoveColumnPolicy};
pub use crate::core::{GridError, GridResult, RawRow, Row, RowId};
pub use crate::index::ErrorIndex;
pub use crate::schema::{FieldDescriptor, FieldKind, FieldRegistry};
pub use crate::table::{LoadOptions, TableSnapshot, TableStore};
