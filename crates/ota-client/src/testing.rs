//! Test utilities for ota-client
//!
//! Runs an axum router on a random local port and hands out a client bound
//! to it, so tests can stand in for the catalog backend.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::config::ClientConfig;
use crate::{OtaClient, Result};

/// Path prefix the test client uses, matching the real backend layout
pub const API_PREFIX: &str = "/api";

/// A test server that automatically shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: OtaClient,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Start serving `router` under [`API_PREFIX`]
    ///
    /// # Example
    ///
    /// ```ignore
    /// use axum::{routing::get, Json, Router};
    /// use ota_client::testing::TestServer;
    ///
    /// let router = Router::new().route("/car-types/", get(|| async { Json(Vec::<String>::new()) }));
    /// let server = TestServer::start(router).await?;
    /// let car_types = server.client.car_types().list().await?;
    /// ```
    pub async fn start(router: axum::Router) -> Result<Self> {
        Self::start_with_config(router, |config| config).await
    }

    /// Start with a client configuration adjusted by `configure`
    pub async fn start_with_config<F>(router: axum::Router, configure: F) -> Result<Self>
    where
        F: FnOnce(ClientConfig) -> ClientConfig,
    {
        // Bind to any available port
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let app = axum::Router::new().nest(API_PREFIX, router);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        // Give server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        let config = configure(
            ClientConfig::builder(format!("http://{}{}", addr, API_PREFIX))
                .request_timeout_ms(5_000)
                .connect_timeout_ms(2_000)
                .build(),
        );
        let client = OtaClient::with_config(config)?;

        Ok(Self {
            addr,
            client,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Get the base URL of the test server, including the API prefix
    pub fn base_url(&self) -> String {
        format!("http://{}{}", self.addr, API_PREFIX)
    }

    /// Get a reference to the client
    pub fn client(&self) -> &OtaClient {
        &self.client
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Wait for a condition with timeout
pub async fn wait_for<F, Fut>(condition: F, timeout: Duration) -> bool
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;

    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    false
}
