//! Table store and mutation protocol
//!
//! # Protocol
//!
//! Every mutation runs under the writer lock:
//!
//! 1. Read the current snapshot
//! 2. Build a draft of the next columns, rows and error index
//! 3. On success publish the draft as a new snapshot, then notify listeners
//!
//! A failing step 2 publishes nothing: readers keep the previous `Arc`.
//! A panicking listener runs after the swap, so the writer lock it poisons
//! still guards a consistent table and is recovered by the next mutation.
//!
//! # Invariants
//!
//! - Every row holds exactly the column set
//! - The column set contains every Misc field, without duplicates
//! - The error index only references current columns and rows

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use im::Vector;
use serde_json::Value;

use super::snapshot::TableSnapshot;
use super::subscription::{Listener, ListenerSet, SubscriptionId};
use crate::config::{GridConfig, RemoveColumnPolicy};
use crate::core::{GridError, GridResult, RawRow, Row, RowId};
use crate::index::{ErrorIndex, FieldErrors};
use crate::ingest::{IngestionAdapter, IngestionBatch, IngestionReport};
use crate::observability::{emit, Event, MetricsRegistry, MetricsSnapshot};
use crate::schema::{FieldDescriptor, FieldRegistry, FieldResults, RowValidator, ID_FIELD};

/// Per-call load settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Fail with `EmptyDataset` when no rows are given
    pub require_non_empty: bool,
}

impl LoadOptions {
    /// Options rejecting empty datasets
    pub fn require_non_empty() -> Self {
        Self {
            require_non_empty: true,
        }
    }
}

/// Next state of the table, not yet published
struct Draft {
    columns: Arc<Vec<String>>,
    rows: Vector<Arc<Row>>,
    positions: Arc<HashMap<RowId, usize>>,
    errors: Arc<ErrorIndex>,
    validated: u64,
    detail: Vec<(&'static str, String)>,
}

/// In-memory validated table
///
/// One writer at a time; any number of readers holding snapshots.
pub struct TableStore {
    registry: Arc<FieldRegistry>,
    config: GridConfig,
    current: RwLock<Arc<TableSnapshot>>,
    writer: Mutex<()>,
    listeners: RwLock<ListenerSet>,
    study_root: RwLock<Option<PathBuf>>,
    metrics: MetricsRegistry,
}

impl TableStore {
    /// Create a store with default configuration
    pub fn new(registry: FieldRegistry) -> Self {
        Self::with_config(registry, GridConfig::default())
    }

    /// Create a store with explicit configuration
    pub fn with_config(registry: FieldRegistry, config: GridConfig) -> Self {
        let columns = misc_columns(&registry);
        let store = Self {
            registry: Arc::new(registry),
            config,
            current: RwLock::new(Arc::new(TableSnapshot::empty(columns))),
            writer: Mutex::new(()),
            listeners: RwLock::new(ListenerSet::default()),
            study_root: RwLock::new(None),
            metrics: MetricsRegistry::new(),
        };
        emit(
            Event::StoreCreated,
            &[("fields", &store.registry.len().to_string())],
        );
        store
    }

    /// Build registry and store from configuration.
    ///
    /// Also applies the configured log threshold.
    pub fn from_config(config: GridConfig) -> GridResult<Self> {
        config.validate()?;
        config.apply_logging();
        let registry = config.build_registry()?;
        Ok(Self::with_config(registry, config))
    }

    /// Field registry every column and cell is checked against
    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    /// Configuration the store was built with
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Counter values of this store
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Study root backing the current table, if any
    pub fn study_root(&self) -> Option<PathBuf> {
        self.study_root
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<TableSnapshot> {
        // The slot only ever holds a whole snapshot, so a poisoned lock
        // still guards a consistent value.
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Descriptors of the current column set, in column order
    pub fn column_descriptors(&self) -> GridResult<Vec<&FieldDescriptor>> {
        let snapshot = self.snapshot();
        snapshot
            .columns()
            .iter()
            .map(|c| self.registry.describe(c))
            .collect()
    }

    // ==================================================================
    // Subscriptions
    // ==================================================================

    /// Registers a listener called with every newly published snapshot.
    ///
    /// # Errors
    ///
    /// `Config` when `max_listeners` listeners are already registered.
    pub fn subscribe<F>(&self, listener: F) -> GridResult<SubscriptionId>
    where
        F: Fn(&Arc<TableSnapshot>) + Send + Sync + 'static,
    {
        let mut listeners = self
            .listeners
            .write()
            .map_err(|_| GridError::internal("Lock poisoned"))?;
        if listeners.len() >= self.config.max_listeners {
            return Err(GridError::config(format!(
                "listener limit of {} reached",
                self.config.max_listeners
            )));
        }
        let listener: Listener = Arc::new(listener);
        let id = listeners.add(listener);
        emit(Event::ListenerAdded, &[("subscription", &id.to_string())]);
        Ok(id)
    }

    /// Removes a listener. Returns false if the id was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> GridResult<bool> {
        let removed = self
            .listeners
            .write()
            .map_err(|_| GridError::internal("Lock poisoned"))?
            .remove(id);
        if removed {
            emit(Event::ListenerRemoved, &[("subscription", &id.to_string())]);
        }
        Ok(removed)
    }

    // ==================================================================
    // Mutations
    // ==================================================================

    /// Replaces columns and rows wholesale, using configured load options.
    pub fn load(&self, rows: Vec<RawRow>, columns: Vec<String>) -> GridResult<Arc<TableSnapshot>> {
        self.load_with(rows, columns, self.default_load_options())
    }

    /// Replaces columns and rows wholesale.
    ///
    /// Missing Misc columns are prepended, rows missing a column receive the
    /// descriptor default and keys outside the column set are dropped.
    ///
    /// # Errors
    ///
    /// - `EmptyDataset` if `options.require_non_empty` and no rows are given
    /// - `UnknownField` for an unregistered column
    /// - `DuplicateColumn` if a column is listed twice
    /// - `MissingRowId` / `DuplicateRow` for unusable identifiers
    pub fn load_with(
        &self,
        rows: Vec<RawRow>,
        columns: Vec<String>,
        options: LoadOptions,
    ) -> GridResult<Arc<TableSnapshot>> {
        let _writer = self.lock_writer();
        let current = self.snapshot();
        let draft = self.draft_load(rows, columns, options);
        self.publish(Event::TableLoaded, "load", &current, draft)
    }

    /// Resets to the empty table holding only Misc columns.
    pub fn clear(&self) -> GridResult<Arc<TableSnapshot>> {
        let _writer = self.lock_writer();
        let current = self.snapshot();
        let snapshot = self.commit(Event::TableCleared, "clear", &current, Ok(self.draft_empty()))?;
        self.set_root(None);
        self.notify(&snapshot);
        Ok(snapshot)
    }

    /// Appends a column, filling every row with `default` (or the
    /// descriptor default when `None`). Only the new field is validated.
    ///
    /// # Errors
    ///
    /// - `UnknownField` if the name is not registered
    /// - `ProtectedField` for Misc fields
    /// - `DuplicateColumn` if the column is already present
    pub fn add_column(&self, name: &str, default: Option<Value>) -> GridResult<Arc<TableSnapshot>> {
        let _writer = self.lock_writer();
        let current = self.snapshot();
        let draft = self.draft_add_column(&current, name, default);
        self.publish(Event::ColumnAdded, "add_column", &current, draft)
    }

    /// Removes one column. See `remove_columns`.
    pub fn remove_column(&self, name: &str) -> GridResult<Arc<TableSnapshot>> {
        self.remove_columns(&[name])
    }

    /// Strips columns from the column set, every row and the error index.
    ///
    /// Registered names that are not currently columns are ignored. The
    /// remaining fields are re-validated according to
    /// `GridConfig::remove_column_policy`.
    ///
    /// # Errors
    ///
    /// - `UnknownField` if a name is not registered
    /// - `ProtectedField` for Misc fields
    pub fn remove_columns<S: AsRef<str>>(&self, names: &[S]) -> GridResult<Arc<TableSnapshot>> {
        let _writer = self.lock_writer();
        let current = self.snapshot();
        let draft = self.draft_remove_columns(&current, names);
        self.publish(Event::ColumnsRemoved, "remove_columns", &current, draft)
    }

    /// Replaces one cell and re-validates that cell only.
    ///
    /// # Errors
    ///
    /// - `ProtectedField` when editing `ID`
    /// - `UnknownField` if the field is unregistered or not a column
    /// - `RowNotFound` if no row has the identifier
    pub fn edit_cell(&self, row: RowId, field: &str, value: Value) -> GridResult<Arc<TableSnapshot>> {
        let _writer = self.lock_writer();
        let current = self.snapshot();
        let draft = self.draft_edit_cell(&current, row, field, value);
        self.publish(Event::CellEdited, "edit_cell", &current, draft)
    }

    /// Replaces a whole row and re-validates it.
    ///
    /// Columns missing from `row` receive the descriptor default.
    ///
    /// # Errors
    ///
    /// - `RowNotFound` if no row has the identifier
    /// - `UnknownField` for an unregistered key
    /// - `ColumnMismatch` for a registered key outside the column set
    pub fn edit_row(&self, row: Row) -> GridResult<Arc<TableSnapshot>> {
        let _writer = self.lock_writer();
        let current = self.snapshot();
        let draft = self.draft_edit_row(&current, row);
        self.publish(Event::RowEdited, "edit_row", &current, draft)
    }

    /// Fetches `root` through `adapter` and loads the result.
    ///
    /// An empty path clears the table. Items the adapter skipped are
    /// returned in the report; they never fail the call.
    pub fn set_study_root<A>(&self, root: impl AsRef<Path>, adapter: &A) -> GridResult<IngestionReport>
    where
        A: IngestionAdapter + ?Sized,
    {
        let root = root.as_ref();
        let _writer = self.lock_writer();
        let current = self.snapshot();

        if root.as_os_str().is_empty() {
            let snapshot =
                self.commit(Event::TableCleared, "set_study_root", &current, Ok(self.draft_empty()))?;
            self.set_root(None);
            emit(Event::StudyRootChanged, &[("root", "")]);
            self.notify(&snapshot);
            return Ok(IngestionReport {
                study_root: None,
                rows_loaded: 0,
                version: snapshot.version(),
                invalid_items: Vec::new(),
            });
        }

        let root_text = root.display().to_string();
        let IngestionBatch {
            columns,
            rows,
            invalid_items,
        } = match adapter.fetch(root) {
            Ok(batch) => batch,
            Err(err) => {
                self.reject("set_study_root", &err);
                return Err(err);
            }
        };

        if !invalid_items.is_empty() {
            self.metrics.add_invalid_items(invalid_items.len() as u64);
            emit(
                Event::IngestionItemsSkipped,
                &[
                    ("count", &invalid_items.len().to_string()),
                    ("root", &root_text),
                ],
            );
        }

        let draft = self.draft_load(rows, columns, self.default_load_options());
        let snapshot = self.commit(Event::TableLoaded, "set_study_root", &current, draft)?;
        self.set_root(Some(root.to_path_buf()));
        emit(Event::StudyRootChanged, &[("root", &root_text)]);
        self.notify(&snapshot);

        Ok(IngestionReport {
            study_root: Some(root.to_path_buf()),
            rows_loaded: snapshot.row_count(),
            version: snapshot.version(),
            invalid_items,
        })
    }

    // ==================================================================
    // Drafts
    // ==================================================================

    fn draft_empty(&self) -> Draft {
        Draft {
            columns: Arc::new(misc_columns(&self.registry)),
            rows: Vector::new(),
            positions: Arc::new(HashMap::new()),
            errors: Arc::new(ErrorIndex::new()),
            validated: 0,
            detail: Vec::new(),
        }
    }

    fn draft_load(
        &self,
        raw_rows: Vec<RawRow>,
        columns: Vec<String>,
        options: LoadOptions,
    ) -> GridResult<Draft> {
        if options.require_non_empty && raw_rows.is_empty() {
            return Err(GridError::EmptyDataset);
        }

        let columns = self.normalize_columns(columns)?;
        let column_set: HashSet<&str> = columns.iter().map(String::as_str).collect();

        let mut rows = Vec::with_capacity(raw_rows.len());
        let mut positions = HashMap::with_capacity(raw_rows.len());
        let mut stripped = 0usize;

        for (position, raw) in raw_rows.into_iter().enumerate() {
            let mut row = Row::from_raw(raw, position)?;
            if positions.insert(row.id(), position).is_some() {
                return Err(GridError::DuplicateRow(row.id()));
            }
            let before = row.len();
            row.retain_fields(|f| column_set.contains(f));
            stripped += before - row.len();
            self.fill_defaults(&mut row, &columns)?;
            rows.push(Arc::new(row));
        }

        let results = RowValidator::new(&self.registry)
            .validate_rows(&columns, rows.iter().map(|r| r.as_ref()))?;
        let errors = ErrorIndex::from_results(&results);

        Ok(Draft {
            validated: (rows.len() * columns.len()) as u64,
            detail: vec![("stripped", stripped.to_string())],
            columns: Arc::new(columns),
            rows: Vector::from(rows),
            positions: Arc::new(positions),
            errors: Arc::new(errors),
        })
    }

    fn draft_add_column(
        &self,
        current: &TableSnapshot,
        name: &str,
        default: Option<Value>,
    ) -> GridResult<Draft> {
        let descriptor = self.registry.describe(name)?;
        if descriptor.is_misc() {
            return Err(GridError::protected_field(name));
        }
        if current.has_column(name) {
            return Err(GridError::DuplicateColumn(name.to_string()));
        }

        let value = default.unwrap_or_else(|| descriptor.default_value.clone());
        let mut columns = current.columns().to_vec();
        columns.push(name.to_string());

        let rows: Vector<Arc<Row>> = current
            .rows()
            .map(|r| {
                let mut row = r.clone();
                row.set_unchecked(name, value.clone());
                Arc::new(row)
            })
            .collect();

        // Every row holds the same value: check it once and install the
        // whole field map in one step. Other fields keep their maps.
        let errors = match RowValidator::validate_field(descriptor, &value).message() {
            Some(message) => {
                let failing: FieldErrors = rows
                    .iter()
                    .map(|r| (r.id(), message.to_string()))
                    .collect();
                Arc::new(current.errors().with_field(name, failing))
            }
            None => Arc::clone(current.errors_arc()),
        };

        Ok(Draft {
            validated: 1,
            detail: vec![("field", name.to_string())],
            columns: Arc::new(columns),
            rows,
            positions: Arc::clone(current.positions_arc()),
            errors,
        })
    }

    fn draft_remove_columns<S: AsRef<str>>(
        &self,
        current: &TableSnapshot,
        names: &[S],
    ) -> GridResult<Draft> {
        let mut removed: Vec<&str> = Vec::new();
        for name in names {
            let name = name.as_ref();
            if self.registry.describe(name)?.is_misc() {
                return Err(GridError::protected_field(name));
            }
            if current.has_column(name) && !removed.contains(&name) {
                removed.push(name);
            }
        }
        let is_removed = |field: &str| removed.iter().any(|r| *r == field);

        let columns: Vec<String> = current
            .columns()
            .iter()
            .filter(|c| !is_removed(c.as_str()))
            .cloned()
            .collect();

        let rows: Vector<Arc<Row>> = current
            .rows()
            .map(|r| {
                let mut row = r.clone();
                row.retain_fields(|f| !is_removed(f));
                Arc::new(row)
            })
            .collect();

        let mut errors = current.errors().clone();
        for name in &removed {
            errors = errors.remove_field(name);
        }

        let mut validated = 0u64;
        if self.config.remove_column_policy == RemoveColumnPolicy::FullRevalidate {
            let validator = RowValidator::new(&self.registry);
            for row in &rows {
                let results = validator.validate_row(&columns, row)?;
                validated += results.len() as u64;
                errors = errors.apply_validation(row.id(), &results);
            }
        }

        Ok(Draft {
            validated,
            detail: vec![("fields", removed.join(","))],
            columns: Arc::new(columns),
            rows,
            positions: Arc::clone(current.positions_arc()),
            errors: Arc::new(errors),
        })
    }

    fn draft_edit_cell(
        &self,
        current: &TableSnapshot,
        row: RowId,
        field: &str,
        value: Value,
    ) -> GridResult<Draft> {
        if field == ID_FIELD {
            return Err(GridError::protected_field(field));
        }
        let descriptor = self.registry.describe(field)?;
        if !current.has_column(field) {
            return Err(GridError::unknown_field(field));
        }
        let position = current.position(row).ok_or(GridError::RowNotFound(row))?;
        let existing = current
            .row_vector()
            .get(position)
            .ok_or(GridError::RowNotFound(row))?;

        let mut results = FieldResults::new();
        results.insert(field.to_string(), RowValidator::validate_field(descriptor, &value));

        let mut updated = existing.as_ref().clone();
        updated.set_unchecked(field, value);
        let mut rows = current.row_vector().clone();
        rows.set(position, Arc::new(updated));

        Ok(Draft {
            validated: 1,
            detail: vec![("field", field.to_string()), ("row", row.to_string())],
            columns: Arc::clone(current.columns_arc()),
            rows,
            positions: Arc::clone(current.positions_arc()),
            errors: Arc::new(current.errors().apply_validation(row, &results)),
        })
    }

    fn draft_edit_row(&self, current: &TableSnapshot, mut row: Row) -> GridResult<Draft> {
        let id = row.id();
        let position = current.position(id).ok_or(GridError::RowNotFound(id))?;

        for key in row.fields() {
            if current.has_column(key) {
                continue;
            }
            if !self.registry.contains(key) {
                return Err(GridError::unknown_field(key));
            }
            return Err(GridError::ColumnMismatch {
                row: id,
                reason: format!("'{}' is not a column", key),
            });
        }
        self.fill_defaults(&mut row, current.columns())?;

        let results = RowValidator::new(&self.registry).validate_row(current.columns(), &row)?;
        let errors = current.errors().apply_validation(id, &results);

        let mut rows = current.row_vector().clone();
        rows.set(position, Arc::new(row));

        Ok(Draft {
            validated: results.len() as u64,
            detail: vec![("row", id.to_string())],
            columns: Arc::clone(current.columns_arc()),
            rows,
            positions: Arc::clone(current.positions_arc()),
            errors: Arc::new(errors),
        })
    }

    // ==================================================================
    // Helpers
    // ==================================================================

    /// Resolves every column, rejects duplicates and prepends missing Misc
    /// columns in registry order.
    fn normalize_columns(&self, columns: Vec<String>) -> GridResult<Vec<String>> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(columns.len());
        for column in &columns {
            self.registry.describe(column)?;
            if !seen.insert(column.as_str()) {
                return Err(GridError::DuplicateColumn(column.clone()));
            }
        }

        let mut normalized: Vec<String> = self
            .registry
            .misc_fields()
            .into_iter()
            .filter(|m| !seen.contains(m))
            .map(str::to_string)
            .collect();
        normalized.extend(columns);
        Ok(normalized)
    }

    fn fill_defaults<S: AsRef<str>>(&self, row: &mut Row, columns: &[S]) -> GridResult<()> {
        for column in columns {
            let column = column.as_ref();
            if !row.contains(column) {
                let descriptor = self.registry.describe(column)?;
                row.set_unchecked(column, descriptor.default_value.clone());
            }
        }
        Ok(())
    }

    fn default_load_options(&self) -> LoadOptions {
        LoadOptions {
            require_non_empty: self.config.require_non_empty_load,
        }
    }

    /// Serializes mutations. Poisoning only happens after a snapshot has
    /// been swapped in, so the guard is taken over as is.
    fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_root(&self, root: Option<PathBuf>) {
        *self.study_root.write().unwrap_or_else(PoisonError::into_inner) = root;
    }

    /// Commits a draft and notifies listeners.
    fn publish(
        &self,
        event: Event,
        op: &'static str,
        current: &TableSnapshot,
        draft: GridResult<Draft>,
    ) -> GridResult<Arc<TableSnapshot>> {
        let snapshot = self.commit(event, op, current, draft)?;
        self.notify(&snapshot);
        Ok(snapshot)
    }

    /// Swaps a successful draft in as the current snapshot.
    fn commit(
        &self,
        event: Event,
        op: &'static str,
        current: &TableSnapshot,
        draft: GridResult<Draft>,
    ) -> GridResult<Arc<TableSnapshot>> {
        let draft = match draft {
            Ok(draft) => draft,
            Err(err) => {
                self.reject(op, &err);
                return Err(err);
            }
        };

        let snapshot = Arc::new(TableSnapshot::from_parts(
            current.version() + 1,
            draft.columns,
            draft.rows,
            draft.positions,
            draft.errors,
        ));
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&snapshot);

        self.metrics.add_fields_validated(draft.validated);
        self.metrics.increment_mutations_applied();
        self.metrics.increment_snapshots_published();

        let mut fields: Vec<(&str, String)> = vec![
            ("op", op.to_string()),
            ("version", snapshot.version().to_string()),
            ("rows", snapshot.row_count().to_string()),
            ("columns", snapshot.columns().len().to_string()),
            ("errors", snapshot.errors().error_count().to_string()),
        ];
        fields.extend(draft.detail);
        let borrowed: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        emit(event, &borrowed);

        Ok(snapshot)
    }

    fn reject(&self, op: &str, err: &GridError) {
        self.metrics.increment_mutations_rejected();
        emit(
            Event::MutationRejected,
            &[("code", err.code()), ("error", &err.to_string()), ("op", op)],
        );
    }

    fn notify(&self, snapshot: &Arc<TableSnapshot>) {
        let callbacks = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .callbacks();
        for callback in &callbacks {
            callback(snapshot);
        }
        self.metrics.add_notifications(callbacks.len() as u64);
    }
}

impl std::fmt::Debug for TableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("TableStore")
            .field("version", &snapshot.version())
            .field("columns", &snapshot.columns())
            .field("rows", &snapshot.row_count())
            .finish()
    }
}

fn misc_columns(registry: &FieldRegistry) -> Vec<String> {
    registry
        .misc_fields()
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::EnumOption;
    use serde_json::json;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> FieldRegistry {
        FieldRegistry::new(vec![
            FieldDescriptor::misc("ID"),
            FieldDescriptor::misc("File"),
            FieldDescriptor::text("Name", true, ""),
            FieldDescriptor::numerical("Age", Some(0.0), Some(120.0), Some(1.0), 30.0),
            FieldDescriptor::enumeration(
                "Sex",
                vec![EnumOption::plain("M"), EnumOption::plain("F")],
                "M",
            ),
            FieldDescriptor::boolean("Consent", false),
        ])
        .unwrap()
    }

    fn raw(value: Value) -> RawRow {
        value.as_object().cloned().unwrap()
    }

    fn loaded() -> TableStore {
        let store = TableStore::new(registry());
        store
            .load(
                vec![
                    raw(json!({ "ID": 1, "File": "a.json", "Name": "ann", "Age": 40 })),
                    raw(json!({ "ID": 2, "File": "b.json", "Name": "", "Age": 50 })),
                ],
                vec!["ID".into(), "File".into(), "Name".into(), "Age".into()],
            )
            .unwrap();
        store
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = TableStore::new(registry());
        let snap = store.snapshot();
        assert_eq!(snap.version(), 0);
        assert_eq!(snap.columns(), ["ID".to_string(), "File".to_string()]);
        assert!(snap.is_empty());
        assert!(snap.is_valid());
    }

    #[test]
    fn test_load_validates_all_rows() {
        let store = loaded();
        let snap = store.snapshot();
        assert_eq!(snap.version(), 1);
        assert_eq!(snap.row_count(), 2);
        assert_eq!(snap.errors().get("Name", RowId::new(2)), Some("Name is required"));
        assert_eq!(snap.errors().error_count(), 1);
    }

    #[test]
    fn test_load_prepends_misc_and_fills_defaults() {
        let store = TableStore::new(registry());
        let snap = store
            .load(vec![raw(json!({ "ID": 5, "Extra": 1 }))], vec!["Age".into()])
            .unwrap();
        assert_eq!(
            snap.columns(),
            ["ID".to_string(), "File".to_string(), "Age".to_string()]
        );
        let row = snap.row(RowId::new(5)).unwrap();
        assert_eq!(row.get("Age"), Some(&json!(30.0)));
        assert_eq!(row.get("File"), Some(&Value::Null));
        assert!(!row.contains("Extra"));
    }

    #[test]
    fn test_load_structural_errors() {
        let store = TableStore::new(registry());
        assert_eq!(
            store.load(vec![], vec!["Weight".into()]).unwrap_err(),
            GridError::unknown_field("Weight")
        );
        assert_eq!(
            store
                .load(vec![], vec!["Age".into(), "Age".into()])
                .unwrap_err(),
            GridError::DuplicateColumn("Age".into())
        );
        assert_eq!(
            store
                .load(vec![raw(json!({ "ID": 1 })), raw(json!({ "ID": 1 }))], vec![])
                .unwrap_err(),
            GridError::DuplicateRow(RowId::new(1))
        );
        assert_eq!(
            store
                .load(vec![raw(json!({ "Age": 1 }))], vec![])
                .unwrap_err(),
            GridError::MissingRowId(0)
        );
        assert_eq!(store.snapshot().version(), 0);
        assert_eq!(store.metrics().mutations_rejected, 4);
    }

    #[test]
    fn test_load_require_non_empty() {
        let store = TableStore::new(registry());
        let err = store
            .load_with(vec![], vec![], LoadOptions::require_non_empty())
            .unwrap_err();
        assert_eq!(err, GridError::EmptyDataset);
        assert!(store.load(vec![], vec![]).is_ok());
    }

    #[test]
    fn test_add_column_checks() {
        let store = loaded();
        assert_eq!(
            store.add_column("Weight", None).unwrap_err(),
            GridError::unknown_field("Weight")
        );
        assert_eq!(
            store.add_column("File", None).unwrap_err(),
            GridError::protected_field("File")
        );
        assert_eq!(
            store.add_column("Age", None).unwrap_err(),
            GridError::DuplicateColumn("Age".into())
        );
    }

    #[test]
    fn test_add_column_invalid_default_flags_every_row() {
        let store = loaded();
        let snap = store.add_column("Sex", Some(json!("X"))).unwrap();
        let sex = snap.errors().field("Sex").unwrap();
        assert_eq!(sex.len(), 2);
        assert!(snap.rows().all(|r| r.get("Sex") == Some(&json!("X"))));
    }

    #[test]
    fn test_add_column_invalid_default_single_pass() {
        let store = TableStore::new(registry());
        let rows = (1..=500).map(|i| raw(json!({ "ID": i }))).collect();
        store.load(rows, vec![]).unwrap();
        let before = store.metrics().fields_validated;

        let snap = store.add_column("Age", Some(json!(-3))).unwrap();
        let age = snap.errors().field("Age").unwrap();
        assert_eq!(age.len(), 500);
        assert!(age.values().all(|m| m == "Age must be between 0 and 120 (got -3)"));
        assert_eq!(store.metrics().fields_validated - before, 1);
    }

    #[test]
    fn test_add_column_uses_descriptor_default() {
        let store = loaded();
        let snap = store.add_column("Consent", None).unwrap();
        assert!(snap.rows().all(|r| r.get("Consent") == Some(&json!(false))));
        assert!(!snap.errors().contains_field("Consent"));
    }

    #[test]
    fn test_remove_columns_checks() {
        let store = loaded();
        assert_eq!(
            store.remove_column("ID").unwrap_err(),
            GridError::protected_field("ID")
        );
        assert_eq!(
            store.remove_column("Weight").unwrap_err(),
            GridError::unknown_field("Weight")
        );
    }

    #[test]
    fn test_remove_columns_strips_rows_and_errors() {
        let store = loaded();
        let snap = store.remove_columns(&["Name", "Sex"]).unwrap();
        assert!(!snap.has_column("Name"));
        assert!(snap.rows().all(|r| !r.contains("Name")));
        assert!(snap.is_valid());
    }

    #[test]
    fn test_remove_column_policies_agree() {
        let field_local = TableStore::with_config(
            registry(),
            GridConfig {
                remove_column_policy: RemoveColumnPolicy::FieldLocal,
                ..GridConfig::default()
            },
        );
        let full = loaded();
        let rows = vec![
            raw(json!({ "ID": 1, "Name": "", "Age": 400 })),
            raw(json!({ "ID": 2, "Name": "bo", "Age": 3.5 })),
        ];
        let columns: Vec<String> = vec!["Name".into(), "Age".into()];
        field_local.load(rows.clone(), columns.clone()).unwrap();
        full.load(rows, columns).unwrap();

        let a = field_local.remove_column("Name").unwrap();
        let b = full.remove_column("Name").unwrap();
        assert_eq!(a.errors(), b.errors());
        assert_eq!(a.errors().field_count(), 1);
    }

    #[test]
    fn test_edit_cell_checks() {
        let store = loaded();
        assert_eq!(
            store.edit_cell(RowId::new(1), "ID", json!(9)).unwrap_err(),
            GridError::protected_field("ID")
        );
        assert_eq!(
            store.edit_cell(RowId::new(1), "Sex", json!("M")).unwrap_err(),
            GridError::unknown_field("Sex")
        );
        assert_eq!(
            store.edit_cell(RowId::new(9), "Age", json!(3)).unwrap_err(),
            GridError::RowNotFound(RowId::new(9))
        );
    }

    #[test]
    fn test_edit_cell_fixes_error() {
        let store = loaded();
        let snap = store.edit_cell(RowId::new(2), "Name", json!("bea")).unwrap();
        assert!(snap.is_valid());
        assert_eq!(snap.row(RowId::new(2)).unwrap().get("Name"), Some(&json!("bea")));
        assert_eq!(snap.version(), 2);
    }

    #[test]
    fn test_edit_cell_shares_untouched_rows() {
        let store = loaded();
        let before = store.snapshot();
        let after = store.edit_cell(RowId::new(2), "Age", json!(51)).unwrap();

        let (old, new) = (before.row_vector(), after.row_vector());
        assert!(Arc::ptr_eq(&old[0], &new[0]));
        assert!(!Arc::ptr_eq(&old[1], &new[1]));
        assert!(Arc::ptr_eq(before.positions_arc(), after.positions_arc()));
        assert!(Arc::ptr_eq(before.columns_arc(), after.columns_arc()));
        assert_eq!(before.row(RowId::new(2)).unwrap().get("Age"), Some(&json!(50)));
    }

    #[test]
    fn test_edit_row() {
        let store = loaded();
        let row = Row::new(RowId::new(1)).with("Age", json!(130)).unwrap();
        let snap = store.edit_row(row).unwrap();
        let edited = snap.row(RowId::new(1)).unwrap();
        assert_eq!(edited.get("Name"), Some(&json!("")));
        assert_eq!(edited.get("File"), Some(&Value::Null));
        assert!(snap.errors().get("Age", RowId::new(1)).is_some());
        assert!(snap.errors().get("Name", RowId::new(1)).is_some());
    }

    #[test]
    fn test_edit_row_key_checks() {
        let store = loaded();
        let unknown = Row::new(RowId::new(1)).with("Weight", json!(1)).unwrap();
        assert_eq!(
            store.edit_row(unknown).unwrap_err(),
            GridError::unknown_field("Weight")
        );

        let outside = Row::new(RowId::new(1)).with("Sex", json!("F")).unwrap();
        assert!(matches!(
            store.edit_row(outside).unwrap_err(),
            GridError::ColumnMismatch { .. }
        ));
    }

    #[test]
    fn test_subscribers_receive_snapshots() {
        let store = TableStore::new(registry());
        let seen = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&seen);
        let id = store
            .subscribe(move |snap| {
                s.store(snap.version() as usize, Ordering::SeqCst);
            })
            .unwrap();

        store.load(vec![], vec![]).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        let _ = store.add_column("Weight", None);
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        assert!(store.unsubscribe(id).unwrap());
        store.clear().unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(store.metrics().notifications_sent, 1);
    }

    #[test]
    fn test_panicking_listener_does_not_wedge_store() {
        let store = loaded();
        let id = store.subscribe(|_| panic!("listener failed")).unwrap();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            store.edit_cell(RowId::new(1), "Age", json!(42))
        }));
        assert!(outcome.is_err());
        assert_eq!(store.snapshot().version(), 2);

        assert!(store.unsubscribe(id).unwrap());
        let snap = store.edit_cell(RowId::new(1), "Age", json!(43)).unwrap();
        assert_eq!(snap.version(), 3);
        assert!(store.clear().is_ok());
    }

    #[test]
    fn test_listener_limit() {
        let store = TableStore::with_config(
            registry(),
            GridConfig {
                max_listeners: 1,
                ..GridConfig::default()
            },
        );
        store.subscribe(|_| {}).unwrap();
        assert!(matches!(store.subscribe(|_| {}), Err(GridError::Config(_))));
    }

    #[test]
    fn test_column_descriptors() {
        let store = loaded();
        let names: Vec<&str> = store
            .column_descriptors()
            .unwrap()
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["ID", "File", "Name", "Age"]);
    }

    #[test]
    fn test_metrics_count_mutations() {
        let store = loaded();
        store.edit_cell(RowId::new(1), "Age", json!(41)).unwrap();
        let metrics = store.metrics();
        assert_eq!(metrics.mutations_applied, 2);
        assert_eq!(metrics.snapshots_published, 2);
        assert_eq!(metrics.fields_validated, 9);
    }
}
