//! OTA backend client

use async_trait::async_trait;
use ota_core::{CarTypeDraft, DraftMode, FirmwareUploader, MessageResponse, UploadRequest};
use tracing::{info, instrument};
use url::Url;

use crate::config::{ClientConfig, DEFAULT_BASE_URL};
use crate::error::{OtaClientError, Result};
use crate::poll::DownloadMonitor;
use crate::resources::{CarTypesClient, EcusClient, RequestsClient, VersionsClient};
use crate::transport::Transport;

/// OTA firmware catalog client
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct OtaClient {
    transport: Transport,
    config: ClientConfig,
}

impl OtaClient {
    /// Create a client for `base_url` with default timeouts
    ///
    /// # Arguments
    /// * `base_url` - Backend API root, including its path prefix
    ///   (e.g., "http://localhost:5000/api")
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(ClientConfig::builder(base_url).build())
    }

    /// Create a client for the build-time default backend
    pub fn from_default_url() -> Result<Self> {
        Self::new(DEFAULT_BASE_URL)
    }

    /// Create a client from a full configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let transport = Transport::new(&config)?;
        info!("OTA client created for {}", transport.base_url());
        Ok(Self { transport, config })
    }

    /// Create a client from a YAML config file
    pub fn from_yaml_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let config = ClientConfig::from_yaml_file(path)
            .map_err(|e| OtaClientError::Config(e.to_string()))?;
        Self::with_config(config)
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        self.transport.base_url()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    // =========================================================================
    // Resource clients
    // =========================================================================

    pub fn car_types(&self) -> CarTypesClient<'_> {
        CarTypesClient::new(&self.transport)
    }

    pub fn ecus(&self) -> EcusClient<'_> {
        EcusClient::new(&self.transport)
    }

    pub fn versions(&self) -> VersionsClient<'_> {
        VersionsClient::new(&self.transport)
    }

    pub fn requests(&self) -> RequestsClient<'_> {
        RequestsClient::new(&self.transport)
    }

    /// Active downloads monitor using the configured poll interval
    pub fn download_monitor(&self) -> DownloadMonitor {
        DownloadMonitor::new(self.clone(), self.config.active_downloads_interval())
    }

    // =========================================================================
    // Draft workflow
    // =========================================================================

    /// Load an existing car type as an edit-mode draft
    #[instrument(skip(self))]
    pub async fn load_draft(&self, name: &str) -> Result<CarTypeDraft> {
        let car_type = self.car_types().get(name).await?;
        Ok(CarTypeDraft::from_car_type(&car_type))
    }

    /// Upload pending firmware files and persist the draft
    ///
    /// Creates the car type for a new draft, or replaces it under its
    /// original name when editing. On success the draft continues in edit
    /// mode with resolved file paths; on failure it is left as it was.
    #[instrument(skip(self, draft), fields(name = %draft.name()))]
    pub async fn submit_draft(&self, draft: &mut CarTypeDraft) -> Result<MessageResponse> {
        let payload = draft.to_submission_payload(self).await?;

        let response = match draft.mode() {
            DraftMode::Create => self.car_types().create(&payload).await?,
            DraftMode::Edit { original_name } => {
                self.car_types().update(original_name, &payload).await?
            }
        };

        info!("Car type {} saved", payload.name);
        draft.finish_submit(&payload);
        Ok(response)
    }
}

#[async_trait]
impl FirmwareUploader for OtaClient {
    type Error = OtaClientError;

    async fn upload(&self, request: UploadRequest) -> Result<String> {
        let uploaded = self.versions().upload(request).await?;
        Ok(uploaded.version.hex_file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = OtaClient::new("http://localhost:5000/api");
        assert!(client.is_ok());
    }

    #[test]
    fn test_invalid_url() {
        let client = OtaClient::new("not a url");
        assert!(client.is_err());
    }

    #[test]
    fn test_default_url_parses() {
        let client = OtaClient::from_default_url().unwrap();
        assert!(client.base_url().host_str().is_some());
    }
}
