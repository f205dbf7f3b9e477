//! Error index
//!
//! Maps field -> (row id -> message) for every currently failing cell.
//!
//! # API
//!
//! - `from_results(results)` - Build from a full validation pass
//! - `apply_validation(row, results)` - Merge one row's field results
//! - `remove_row(row)` - Drop a row from every field
//! - `remove_field(field)` - Drop a field entirely
//! - `with_field(field, errors)` - Install a whole field map at once
//!
//! Every operation returns a new index. Maps are persistent (`im::OrdMap`):
//! cloning is O(1) and a single-cell update is O(log n) in the number of
//! failing rows. Per-field maps sit behind `Arc`, so a field untouched by an
//! operation keeps its pointer identity and observers can detect changes
//! with `same_field_as`.

use std::collections::BTreeMap;
use std::sync::Arc;

use im::OrdMap;
use serde::Serialize;

use crate::core::RowId;
use crate::schema::{FieldResults, RowResults, ValidationResult};

/// Errors of one field, by row
pub type FieldErrors = OrdMap<RowId, String>;

/// Derived index of current validation failures.
///
/// Invariant: no field maps to an empty row map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorIndex {
    fields: OrdMap<String, Arc<FieldErrors>>,
}

impl ErrorIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from a full validation pass.
    pub fn from_results(results: &RowResults) -> Self {
        let mut fields: BTreeMap<&str, FieldErrors> = BTreeMap::new();
        for (row, field_results) in results {
            for (field, result) in field_results {
                if let ValidationResult::Invalid(violation) = result {
                    fields
                        .entry(field.as_str())
                        .or_default()
                        .insert(*row, violation.message.clone());
                }
            }
        }
        Self {
            fields: fields
                .into_iter()
                .map(|(field, errors)| (field.to_string(), Arc::new(errors)))
                .collect(),
        }
    }

    /// Merges one row's field results.
    ///
    /// Invalid results insert or overwrite `index[field][row]`; valid results
    /// clear it and prune the field if it becomes empty. Fields absent from
    /// `results` are left as they are, as are entries whose message does not
    /// change.
    pub fn apply_validation(&self, row: RowId, results: &FieldResults) -> Self {
        let mut fields = self.fields.clone();

        for (field, result) in results {
            let current = fields.get(field.as_str());
            match result {
                ValidationResult::Invalid(violation) => {
                    if current.and_then(|errors| errors.get(&row)) == Some(&violation.message) {
                        continue;
                    }
                    let errors = current
                        .map(|errors| errors.update(row, violation.message.clone()))
                        .unwrap_or_else(|| FieldErrors::unit(row, violation.message.clone()));
                    fields.insert(field.clone(), Arc::new(errors));
                }
                ValidationResult::Valid => {
                    let errors = match current {
                        Some(errors) if errors.contains_key(&row) => errors.without(&row),
                        _ => continue,
                    };
                    set_field(&mut fields, field, errors);
                }
            }
        }

        Self { fields }
    }

    /// Strips a row from every field, pruning emptied fields.
    pub fn remove_row(&self, row: RowId) -> Self {
        let mut fields = self.fields.clone();
        for (field, errors) in self.fields.iter() {
            if errors.contains_key(&row) {
                set_field(&mut fields, field, errors.without(&row));
            }
        }
        Self { fields }
    }

    /// Drops a field entirely.
    pub fn remove_field(&self, field: &str) -> Self {
        if !self.fields.contains_key(field) {
            return self.clone();
        }
        Self {
            fields: self.fields.without(field),
        }
    }

    /// Replaces one field's map wholesale. An empty map removes the field.
    pub fn with_field(&self, field: &str, errors: FieldErrors) -> Self {
        let mut fields = self.fields.clone();
        set_field(&mut fields, field, errors);
        Self { fields }
    }

    /// Message for one cell, if it is failing
    pub fn get(&self, field: &str, row: RowId) -> Option<&str> {
        self.fields
            .get(field)
            .and_then(|errors| errors.get(&row))
            .map(String::as_str)
    }

    /// All failing rows of one field
    pub fn field(&self, field: &str) -> Option<&FieldErrors> {
        self.fields.get(field).map(Arc::as_ref)
    }

    /// Names of fields with at least one failure
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Iterate (field, errors) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldErrors)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// Every failing field of one row with its message
    pub fn errors_for_row(&self, row: RowId) -> BTreeMap<&str, &str> {
        self.fields
            .iter()
            .filter_map(|(field, errors)| {
                errors.get(&row).map(|msg| (field.as_str(), msg.as_str()))
            })
            .collect()
    }

    /// Check if a row fails any field
    pub fn row_has_errors(&self, row: RowId) -> bool {
        self.fields.values().any(|errors| errors.contains_key(&row))
    }

    /// Check if a field has failures
    pub fn contains_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// True iff `field` refers to the very same map in both indexes
    /// (or is absent from both).
    pub fn same_field_as(&self, other: &ErrorIndex, field: &str) -> bool {
        match (self.fields.get(field), other.fields.get(field)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Number of failing fields
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Number of failing cells
    pub fn error_count(&self) -> usize {
        self.fields.values().map(|errors| errors.len()).sum()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn set_field(fields: &mut OrdMap<String, Arc<FieldErrors>>, field: &str, errors: FieldErrors) {
    if errors.is_empty() {
        fields.remove(field);
    } else {
        fields.insert(field.to_string(), Arc::new(errors));
    }
}
