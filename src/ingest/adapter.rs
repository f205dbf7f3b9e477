//! Ingestion boundary
//!
//! The store never discovers or reads sidecar files itself. An adapter turns
//! a study root into raw rows plus a side list of items it could not read.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::{GridResult, RawRow};

/// Source of raw rows for a study root
pub trait IngestionAdapter {
    /// Reads every row below `study_root`.
    ///
    /// Per-item failures belong in `IngestionBatch::invalid_items`; an `Err`
    /// means the study root as a whole could not be read.
    fn fetch(&self, study_root: &Path) -> GridResult<IngestionBatch>;
}

impl<F> IngestionAdapter for F
where
    F: Fn(&Path) -> GridResult<IngestionBatch>,
{
    fn fetch(&self, study_root: &Path) -> GridResult<IngestionBatch> {
        self(study_root)
    }
}

/// One item the adapter could not turn into a row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidItem {
    /// File path or other locator of the item
    pub item: String,
    /// Why it was skipped
    pub reason: String,
}

impl InvalidItem {
    pub fn new(item: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for InvalidItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.item, self.reason)
    }
}

/// Output of one adapter fetch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestionBatch {
    /// Column set of the batch
    #[serde(default)]
    pub columns: Vec<String>,
    /// Raw rows, one object per row
    #[serde(default)]
    pub rows: Vec<RawRow>,
    /// Items skipped by the adapter
    #[serde(default)]
    pub invalid_items: Vec<InvalidItem>,
}

impl IngestionBatch {
    pub fn new(columns: Vec<String>, rows: Vec<RawRow>) -> Self {
        Self {
            columns,
            rows,
            invalid_items: Vec::new(),
        }
    }

    /// Builder-style invalid item
    pub fn with_invalid(mut self, item: InvalidItem) -> Self {
        self.invalid_items.push(item);
        self
    }
}

/// Outcome of `TableStore::set_study_root`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestionReport {
    /// Root now backing the table, `None` once cleared
    pub study_root: Option<PathBuf>,
    /// Rows in the published table
    pub rows_loaded: usize,
    /// Version of the published snapshot
    pub version: u64,
    /// Items the adapter skipped
    pub invalid_items: Vec<InvalidItem>,
}

impl IngestionReport {
    pub fn has_invalid_items(&self) -> bool {
        !self.invalid_items.is_empty()
    }

    /// Notification text for the skipped items, if there are any
    pub fn summary(&self) -> Option<String> {
        format_invalid_items(&self.invalid_items)
    }
}

/// Renders skipped items for a notification layer.
///
/// Returns `None` when nothing was skipped.
pub fn format_invalid_items(items: &[InvalidItem]) -> Option<String> {
    if items.is_empty() {
        return None;
    }
    let noun = if items.len() == 1 { "item" } else { "items" };
    let mut text = format!("Could not load {} {}:", items.len(), noun);
    for item in items {
        text.push_str("\n- ");
        text.push_str(&item.to_string());
    }
    Some(text)
}
