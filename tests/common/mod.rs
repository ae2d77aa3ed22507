//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestServer, TEST_EMAIL, TEST_PASS};
//!
//! #[tokio::test]
//! async fn test_signed_in_list() {
//!     let server = TestServer::spawn().await;
//!     let client = server.signed_in_client(TEST_EMAIL, TEST_PASS).await;
//!
//!     assert!(client.collection.list(&Default::default()).await.unwrap().is_empty());
//! }
//! ```

mod client;
mod constants;
mod fixtures;
mod server;

pub use client::TestClient;
pub use constants::*;
pub use fixtures::{assert_entry_matches_draft, full_series_draft};
pub use server::TestServer;
