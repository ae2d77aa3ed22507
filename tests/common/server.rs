//! Test server lifecycle management
//!
//! Each test gets an isolated backend with its own temporary database.

use super::constants::*;
use super::client::TestClient;
use media_tracker::server::{RequestsLoggingLevel, ServerConfig};
use media_tracker::{make_app, SqliteBackendStore};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Running backend. Dropping it shuts the server down and removes the database.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The backend store, for inspecting rows directly
    pub store: Arc<SqliteBackendStore>,

    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new backend on a random port and waits until it answers.
    pub async fn spawn() -> Self {
        let temp_db_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(
            SqliteBackendStore::new(temp_db_dir.path().join("tracker.db"))
                .expect("Failed to open backend store"),
        );

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            port,
            frontend_dir_path: None,
        };
        let app = make_app(config, store.clone(), store.clone());

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            store,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };
        server.wait_for_ready().await;
        server
    }

    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);
        while start.elapsed() < timeout {
            if let Ok(response) = client.get(format!("{}/", self.base_url)).send().await {
                if response.status().is_success() {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_MS)).await;
        }
        panic!("Server did not become ready within {:?}", timeout);
    }

    /// A client with empty local storage, neither signed in nor in guest mode.
    pub fn client(&self) -> TestClient {
        TestClient::new(&self.base_url)
    }

    /// A client in guest mode.
    pub fn guest_client(&self) -> TestClient {
        let client = self.client();
        client
            .collection
            .session()
            .enter_guest_mode()
            .expect("Failed to enter guest mode");
        client
    }

    /// A client signed in to a freshly registered account.
    pub async fn signed_in_client(&self, email: &str, password: &str) -> TestClient {
        let client = self.client();
        let session = client.collection.session();
        session
            .register(email, password, None)
            .await
            .expect("Failed to register");
        session
            .sign_in(email, password)
            .await
            .expect("Failed to sign in");
        client
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
