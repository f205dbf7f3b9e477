//! Immutable table views
//!
//! A snapshot bundles the column set, the rows and the error index of one
//! published version. Rows live in a persistent `im::Vector` of `Arc`-shared
//! rows, so replacing one row after a cell edit is O(log n) and leaves every
//! other row shared with the previous snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use im::Vector;
use serde_json::{json, Value};

use crate::core::{Row, RowId};
use crate::index::ErrorIndex;

/// One published state of a table
#[derive(Debug, Clone)]
pub struct TableSnapshot {
    version: u64,
    published_at: DateTime<Utc>,
    columns: Arc<Vec<String>>,
    rows: Vector<Arc<Row>>,
    positions: Arc<HashMap<RowId, usize>>,
    errors: Arc<ErrorIndex>,
}

impl TableSnapshot {
    /// Empty table holding only the given columns
    pub(crate) fn empty(columns: Vec<String>) -> Self {
        Self {
            version: 0,
            published_at: Utc::now(),
            columns: Arc::new(columns),
            rows: Vector::new(),
            positions: Arc::new(HashMap::new()),
            errors: Arc::new(ErrorIndex::new()),
        }
    }

    /// Assembles a snapshot from already consistent parts.
    pub(crate) fn from_parts(
        version: u64,
        columns: Arc<Vec<String>>,
        rows: Vector<Arc<Row>>,
        positions: Arc<HashMap<RowId, usize>>,
        errors: Arc<ErrorIndex>,
    ) -> Self {
        Self {
            version,
            published_at: Utc::now(),
            columns,
            rows,
            positions,
            errors,
        }
    }

    /// Monotonic version, 0 for the initial empty table
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Publication time
    pub fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }

    /// Ordered column set
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Check if a column is part of the column set
    pub fn has_column(&self, field: &str) -> bool {
        self.columns.iter().any(|c| c == field)
    }

    /// Rows in load order
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter().map(|r| r.as_ref())
    }

    /// Look up a row by identifier
    pub fn row(&self, id: RowId) -> Option<&Row> {
        self.positions
            .get(&id)
            .and_then(|&i| self.rows.get(i))
            .map(|r| r.as_ref())
    }

    /// Check if a row exists
    pub fn contains_row(&self, id: RowId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Current validation failures
    pub fn errors(&self) -> &ErrorIndex {
        &self.errors
    }

    /// True when no cell is failing
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns whether both snapshots share the same error index value
    pub fn same_errors_as(&self, other: &TableSnapshot) -> bool {
        Arc::ptr_eq(&self.errors, &other.errors)
    }

    /// JSON export: `{ version, published_at, columns, rows, errors }`
    pub fn to_json(&self) -> Value {
        json!({
            "version": self.version,
            "published_at": self.published_at.to_rfc3339(),
            "columns": self.columns.as_ref(),
            "rows": self.rows.iter().map(|r| r.to_json()).collect::<Vec<_>>(),
            "errors": serde_json::to_value(self.errors.as_ref()).unwrap_or(Value::Null),
        })
    }

    pub(crate) fn columns_arc(&self) -> &Arc<Vec<String>> {
        &self.columns
    }

    pub(crate) fn row_vector(&self) -> &Vector<Arc<Row>> {
        &self.rows
    }

    pub(crate) fn positions_arc(&self) -> &Arc<HashMap<RowId, usize>> {
        &self.positions
    }

    pub(crate) fn errors_arc(&self) -> &Arc<ErrorIndex> {
        &self.errors
    }

    pub(crate) fn position(&self, id: RowId) -> Option<usize> {
        self.positions.get(&id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldResults, ValidationResult, ViolationKind};

    fn sample() -> TableSnapshot {
        let rows: Vector<Arc<Row>> = (1..=3)
            .map(|i| {
                Arc::new(
                    Row::new(RowId::new(i))
                        .with("Age", json!(i * 10))
                        .unwrap(),
                )
            })
            .collect();
        let positions = rows
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id(), i))
            .collect();

        let mut results = FieldResults::new();
        results.insert(
            "Age".into(),
            ValidationResult::invalid(ViolationKind::OutOfRange, "Age too high"),
        );
        let errors = ErrorIndex::new().apply_validation(RowId::new(2), &results);

        TableSnapshot::from_parts(
            4,
            Arc::new(vec!["ID".into(), "Age".into()]),
            rows,
            Arc::new(positions),
            Arc::new(errors),
        )
    }

    #[test]
    fn test_empty_snapshot() {
        let snap = TableSnapshot::empty(vec!["ID".into()]);
        assert_eq!(snap.version(), 0);
        assert!(snap.is_empty());
        assert!(snap.is_valid());
        assert_eq!(snap.columns(), ["ID".to_string()]);
    }

    #[test]
    fn test_row_lookup() {
        let snap = sample();
        assert_eq!(snap.row_count(), 3);
        assert_eq!(snap.row(RowId::new(2)).unwrap().get("Age"), Some(&json!(20)));
        assert!(snap.row(RowId::new(9)).is_none());
        let ids: Vec<u64> = snap.rows().map(|r| r.id().value()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_validity() {
        let snap = sample();
        assert!(!snap.is_valid());
        assert_eq!(snap.errors().get("Age", RowId::new(2)), Some("Age too high"));
    }

    #[test]
    fn test_to_json_shape() {
        let value = sample().to_json();
        assert_eq!(value["version"], 4);
        assert_eq!(value["columns"], json!(["ID", "Age"]));
        assert_eq!(value["rows"][0], json!({ "ID": 1, "Age": 10 }));
        assert_eq!(value["errors"], json!({ "Age": { "2": "Age too high" } }));
        assert!(value["published_at"].is_string());
    }
}
