//! OTA Catalog Client Library
//!
//! Typed HTTP client for the OTA firmware catalog backend: car types, ECUs,
//! firmware versions and vehicle service/download requests.
//!
//! # Example
//!
//! ```rust,no_run
//! use ota_client::OtaClient;
//! use ota_core::{CarTypeDraft, HexSource, LocalHexFile};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = OtaClient::new("http://localhost:5000/api")?;
//!
//!     // Read side
//!     let car_types = client.car_types().list().await?;
//!     let ecus = client.ecus().for_car_type("sedan").await?;
//!
//!     // Build a car type locally, then upload its firmware and save it
//!     let mut draft = CarTypeDraft::new("Sedan", "M1");
//!     draft.add_new_ecu("ECU-A", "V1")?;
//!     let hex = LocalHexFile::from_path("firmware/ecu-a-1.0.hex")?;
//!     draft.add_version(0, "1.0", HexSource::pending(hex), &["coupe"])?;
//!     client.submit_draft(&mut draft).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Polling
//!
//! [`DownloadMonitor`] refreshes the active downloads list on a fixed
//! interval while auto-refresh is on. [`Latest`] keeps only the newest
//! response of a repeated query.
//!
//! # Testing
//!
//! The `testing` module runs an axum router as a stand-in backend:
//!
//! ```rust,ignore
//! use ota_client::testing::TestServer;
//!
//! let server = TestServer::start(router).await?;
//! let stats = server.client.car_types().statistics().await?;
//! ```

mod client;
mod config;
mod error;
pub mod poll;
pub mod resources;
pub mod sequence;
pub mod testing;
mod transport;

pub use client::OtaClient;
pub use config::{
    ClientConfig, ClientConfigBuilder, ConfigError, ConnectionConfig, PollingConfig,
    TimeoutsConfig, DEFAULT_BASE_URL,
};
pub use error::{OtaClientError, Result};
pub use poll::{DownloadMonitor, MonitorUpdate, PollHandle};
pub use sequence::{Latest, RequestSequencer, Ticket};
pub use transport::Transport;

// Re-export core types for convenience
pub use ota_core;
