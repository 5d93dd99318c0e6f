//! Test server harness for E2E testing
//!
//! Provides `TestIdentityServer` for spawning real Identity Service instances
//! in tests, backed by an in-memory store the test can inspect.

use identity_service::config::{Config, WriteMode};
use identity_service::observability::metrics::init_metrics_recorder;
use identity_service::repositories::InMemoryIdentityStore;
use identity_service::routes::{self, AppState};
use identity_service::services::IdentityResolver;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

/// Global metrics handle shared by every test server in the process.
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            // Another test binary component may already own the global recorder.
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the Identity Service in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health_flow_e2e() -> Result<()> {
///     let server = TestIdentityServer::spawn().await?;
///
///     let response = reqwest::get(&format!("{}/health", server.url())).await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestIdentityServer {
    addr: SocketAddr,
    store: Arc<InMemoryIdentityStore>,
    config: Config,
    _handle: JoinHandle<()>,
}

impl TestIdentityServer {
    /// Spawn a server with an empty in-memory store in create-if-absent mode.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with(Arc::new(InMemoryIdentityStore::new()), WriteMode::CreateIfAbsent).await
    }

    /// Spawn a server over the given store and write mode.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    ///
    /// # Returns
    /// * `Ok(TestIdentityServer)` - Running server instance
    /// * `Err(anyhow::Error)` - If server spawn fails
    pub async fn spawn_with(
        store: Arc<InMemoryIdentityStore>,
        write_mode: WriteMode,
    ) -> Result<Self, anyhow::Error> {
        let write_mode_var = match write_mode {
            WriteMode::CreateIfAbsent => "create_if_absent",
            WriteMode::Overwrite => "overwrite",
        };

        // Build configuration for test environment
        let vars = HashMap::from([
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("STORE_BACKEND".to_string(), "memory".to_string()),
            ("IDENTITY_WRITE_MODE".to_string(), write_mode_var.to_string()),
            ("DRAIN_SECONDS".to_string(), "0".to_string()),
        ]);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let resolver = Arc::new(IdentityResolver::new(store.clone(), config.write_mode));
        let state = Arc::new(AppState {
            config: config.clone(),
            resolver,
        });

        // Build routes using identity-service's real route builder
        let app = routes::build_routes(state, test_metrics_handle());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        // Spawn server in background
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            store,
            config,
            _handle: handle,
        })
    }

    /// Get the in-memory store backing the server.
    pub fn store(&self) -> &Arc<InMemoryIdentityStore> {
        &self.store
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for TestIdentityServer {
    fn drop(&mut self) {
        // Abort the HTTP server task when the test completes.
        self._handle.abort();
    }
}
