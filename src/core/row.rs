//! Row - one subject/session record
//!
//! A row maps field names to JSON cell values. The `ID` cell always mirrors
//! the row's identifier and cannot be rewritten through this type.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use super::error::{GridError, GridResult};
use super::ids::RowId;
use crate::schema::ID_FIELD;

/// One raw row as produced by ingestion: keys are field names.
pub type RawRow = Map<String, Value>;

/// A table row
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    id: RowId,
    values: BTreeMap<String, Value>,
}

impl Row {
    /// Create a row holding only its identifier
    pub fn new(id: RowId) -> Self {
        let mut values = BTreeMap::new();
        values.insert(ID_FIELD.to_string(), id.to_json());
        Self { id, values }
    }

    /// Build a row from a raw ingestion record.
    ///
    /// `position` is only used for error reporting.
    pub fn from_raw(raw: RawRow, position: usize) -> GridResult<Self> {
        let id = raw
            .get(ID_FIELD)
            .and_then(RowId::from_json)
            .ok_or(GridError::MissingRowId(position))?;

        Ok(Self {
            id,
            values: raw.into_iter().collect(),
        })
    }

    /// Builder-style insert
    pub fn with(mut self, field: impl Into<String>, value: Value) -> GridResult<Self> {
        self.insert(field, value)?;
        Ok(self)
    }

    /// Set a cell. The `ID` cell is protected.
    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> GridResult<Option<Value>> {
        let field = field.into();
        if field == ID_FIELD {
            return Err(GridError::protected_field(field));
        }
        Ok(self.values.insert(field, value))
    }

    /// Row identifier
    pub fn id(&self) -> RowId {
        self.id
    }

    /// Get a cell value
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Check if the row carries a field
    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    /// Field names carried by this row, sorted
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// All cells
    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Number of cells, `ID` included
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// JSON object form of the row
    pub fn to_json(&self) -> Value {
        Value::Object(self.values.clone().into_iter().collect())
    }

    pub(crate) fn set_unchecked(&mut self, field: &str, value: Value) {
        self.values.insert(field.to_string(), value);
    }

    pub(crate) fn retain_fields<F: Fn(&str) -> bool>(&mut self, keep: F) {
        self.values.retain(|k, _| k == ID_FIELD || keep(k));
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.values.serialize(serializer)
    }
}
