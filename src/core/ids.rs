//! RowId - Stable row identity
//!
//! A row keeps the same identifier for its whole lifetime in a table:
//! - Assigned by ingestion (the `ID` field of a raw row)
//! - Never changed by edits or re-validation
//! - Unique across one loaded table

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of one row (one subject/session) in the table.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(u64);

impl RowId {
    /// Creates a new RowId with the given value.
    #[inline]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying value.
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Reads a RowId from a JSON cell value.
    ///
    /// Only non-negative integers are accepted; `7.0` and `"7"` are not.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        value.as_u64().map(Self)
    }

    /// The JSON representation stored in the row's `ID` cell.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::from(self.0)
    }
}

impl From<u64> for RowId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
