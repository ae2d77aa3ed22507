//! Media Tracker library
//!
//! Personal media collection tracking: the backend server pieces (accounts,
//! SQLite store, HTTP API) and the client pieces (guest and remote
//! collections, session handling, metadata lookups).

pub mod account;
pub mod backend_store;
pub mod collection;
pub mod config;
pub mod error;
pub mod media;
pub mod metadata;
pub mod server;
pub mod sqlite_persistence;

pub use backend_store::{MediaStore, SqliteBackendStore};
pub use collection::{Collection, CollectionStore};
pub use error::{TrackerError, TrackerResult};
pub use server::{make_app, run_server, RequestsLoggingLevel};
