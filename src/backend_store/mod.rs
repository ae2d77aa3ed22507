mod media_store;
mod schema;
mod sqlite_backend_store;

pub use media_store::MediaStore;
pub use schema::VERSIONED_SCHEMAS;
pub use sqlite_backend_store::SqliteBackendStore;
