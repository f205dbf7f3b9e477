//! # Core types
//!
//! Identifiers, rows and the error taxonomy shared by every subsystem.

pub mod error;
pub mod ids;
pub mod row;

pub use error::{GridError, GridResult, Severity};
pub use ids::RowId;
pub use row::{RawRow, Row};
