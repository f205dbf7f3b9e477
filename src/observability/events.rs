//! Observable store events
//!
//! Events are explicit and typed; the logger only ever receives their
//! canonical names.

use std::fmt;

use super::logger::Severity;

/// Observable events of a table store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Setup
    /// Configuration loaded
    ConfigLoaded,
    /// Field registry built
    RegistryLoaded,
    /// Store constructed
    StoreCreated,

    // Mutations
    /// Full table replaced
    TableLoaded,
    /// Table reset to the empty state
    TableCleared,
    /// Column appended
    ColumnAdded,
    /// Columns stripped
    ColumnsRemoved,
    /// One cell replaced
    CellEdited,
    /// One row replaced
    RowEdited,
    /// Mutation refused with a structural error
    MutationRejected,

    // Ingestion
    /// Study root changed
    StudyRootChanged,
    /// Ingestion reported unreadable items
    IngestionItemsSkipped,

    // Subscribers
    /// Listener registered
    ListenerAdded,
    /// Listener removed
    ListenerRemoved,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::RegistryLoaded => "REGISTRY_LOADED",
            Event::StoreCreated => "STORE_CREATED",

            Event::TableLoaded => "TABLE_LOADED",
            Event::TableCleared => "TABLE_CLEARED",
            Event::ColumnAdded => "COLUMN_ADDED",
            Event::ColumnsRemoved => "COLUMNS_REMOVED",
            Event::CellEdited => "CELL_EDITED",
            Event::RowEdited => "ROW_EDITED",
            Event::MutationRejected => "MUTATION_REJECTED",

            Event::StudyRootChanged => "STUDY_ROOT_CHANGED",
            Event::IngestionItemsSkipped => "INGESTION_ITEMS_SKIPPED",

            Event::ListenerAdded => "LISTENER_ADDED",
            Event::ListenerRemoved => "LISTENER_REMOVED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::CellEdited | Event::ListenerAdded | Event::ListenerRemoved => Severity::Trace,
            Event::MutationRejected | Event::IngestionItemsSkipped => Severity::Warn,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
