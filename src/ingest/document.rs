//! JSON table documents
//!
//! ```json
//! {
//!   "columns": ["ID", "File", "EchoTime"],
//!   "rows": [ { "ID": 1, "File": "sub-01_asl.json", "EchoTime": 0.012 } ]
//! }
//! ```
//!
//! Rows that are not objects or carry no unsigned integer `ID` are skipped
//! and reported as invalid items. Without a `columns` array the column set
//! is the union of row keys in first-seen order.

use serde_json::Value;

use super::adapter::{IngestionBatch, InvalidItem};
use crate::core::{GridError, GridResult, RawRow, RowId};
use crate::schema::ID_FIELD;

/// Parser for JSON table documents
pub struct JsonDocument;

impl JsonDocument {
    /// Parses a document into an ingestion batch.
    ///
    /// # Errors
    ///
    /// `Ingestion` when the text is not JSON or the document shape is wrong.
    pub fn parse(text: &str) -> GridResult<IngestionBatch> {
        let document: Value = serde_json::from_str(text)?;
        let object = document
            .as_object()
            .ok_or_else(|| GridError::Ingestion("document must be a JSON object".into()))?;

        let raw_rows = match object.get("rows") {
            Some(Value::Array(rows)) => rows.as_slice(),
            Some(_) => return Err(GridError::Ingestion("'rows' must be an array".into())),
            None => &[],
        };

        let mut batch = IngestionBatch::default();
        for (position, value) in raw_rows.iter().enumerate() {
            match parse_row(value) {
                Ok(row) => batch.rows.push(row),
                Err(reason) => batch
                    .invalid_items
                    .push(InvalidItem::new(format!("row {}", position), reason)),
            }
        }

        batch.columns = match object.get("columns") {
            Some(Value::Array(columns)) => columns
                .iter()
                .map(|c| {
                    c.as_str().map(str::to_string).ok_or_else(|| {
                        GridError::Ingestion(format!("column name must be a string, got {}", c))
                    })
                })
                .collect::<GridResult<Vec<_>>>()?,
            Some(_) => return Err(GridError::Ingestion("'columns' must be an array".into())),
            None => columns_from_rows(&batch.rows),
        };

        Ok(batch)
    }
}

fn parse_row(value: &Value) -> Result<RawRow, String> {
    let row = value
        .as_object()
        .ok_or_else(|| format!("expected an object, got {}", value))?;
    match row.get(ID_FIELD) {
        Some(id) if RowId::from_json(id).is_some() => Ok(row.clone()),
        Some(id) => Err(format!("ID must be an unsigned integer, got {}", id)),
        None => Err("missing ID".to_string()),
    }
}

fn columns_from_rows(rows: &[RawRow]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}
