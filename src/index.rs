//! Transactional inverted index.
//!
//! - [`posting`] - postings and posting lists
//! - [`snapshot`] - immutable point-in-time index views and their file format
//! - [`store`] - the durable [`store::IndexStore`] that publishes snapshots
//! - [`writer`] - write transactions with commit and rollback
//!
//! Readers load the current snapshot with a single atomic pointer read and
//! never block. At most one [`writer::WriteTransaction`] is live at a time;
//! its commit builds the successor snapshot copy-on-write, persists it and
//! only then publishes it.

pub mod posting;
pub mod snapshot;
pub mod store;
pub mod writer;

pub use posting::{Posting, PostingList};
pub use snapshot::{Snapshot, fetch_document, lookup};
pub use store::{IndexStore, StoreConfig, StoreStats};
pub use writer::WriteTransaction;
