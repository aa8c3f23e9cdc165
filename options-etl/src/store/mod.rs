//! Persistence for priced options.

pub mod sqlite;

pub use sqlite::{OptionSink, SqliteStore, StoreError, StoredOption};
