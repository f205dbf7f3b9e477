//! Field schema registry and row validator
//!
//! Every column of a table is described by a `FieldDescriptor` held in a
//! `FieldRegistry`. The `RowValidator` checks cell values against those
//! descriptors and reports failures as data (`ValidationResult`), never as
//! errors.
//!
//! # Design Principles
//!
//! - Registry is immutable once built
//! - Field kinds form a closed set, matched exhaustively
//! - No implicit coercion of values
//! - Validation is per field and deterministic

mod builtin;
mod registry;
mod types;
mod validator;
mod violation;

pub use builtin::{BASENAME_FIELD, FILE_FIELD};
pub use registry::{FieldRegistry, ID_FIELD};
pub use types::{EnumOption, FieldConstraints, FieldDescriptor, FieldKind};
pub use validator::RowValidator;
pub use violation::{FieldResults, FieldViolation, RowResults, ValidationResult, ViolationKind};
