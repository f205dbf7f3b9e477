//! Error index subsystem
//!
//! The error index is derived state: it mirrors the latest validation
//! results of the table and is never the source of truth.
//!
//! # Design Principles
//!
//! - Derived state: rebuilt from validation results, updated incrementally
//! - Copy-on-write: operations return new values, old ones stay intact
//! - Deterministic: BTreeMap iteration order
//!
//! # Invariants
//!
//! - A field key exists only while at least one row fails that field
//! - Every referenced row exists in the table that published the index

mod error_index;

pub use error_index::{ErrorIndex, FieldErrors};
