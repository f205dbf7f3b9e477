//! Table subsystem
//!
//! Owns the column set, the rows and the error index of one table, and
//! publishes them together as immutable snapshots.
//!
//! # Usage
//!
//! ```ignore
//! use bidsgrid::schema::FieldRegistry;
//! use bidsgrid::table::TableStore;
//!
//! let store = TableStore::new(FieldRegistry::bids_default()?);
//! store.subscribe(|snapshot| render(snapshot))?;
//! store.load(rows, columns)?;
//! store.edit_cell(RowId::new(7), "EchoTime", json!(0.012))?;
//! ```

mod snapshot;
mod store;
mod subscription;

pub use snapshot::TableSnapshot;
pub use store::{LoadOptions, TableStore};
pub use subscription::{Listener, SubscriptionId};
