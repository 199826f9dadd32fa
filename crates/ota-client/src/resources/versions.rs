//! `/versions` endpoints, including firmware transfer

use bytes::Bytes;
use ota_core::{CompatibleVersion, FirmwareVersion, UploadRequest, UploadedVersion, VersionDetail};
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use tracing::{info, instrument};

use crate::error::{OtaClientError, Result};
use crate::transport::Transport;

const VERSIONS: &str = "versions";

/// Default chunk size for streamed reads
pub const DEFAULT_CHUNK_SIZE: u64 = 1024;

#[derive(Debug, Serialize)]
struct ChunkQuery {
    chunk_size: u64,
    offset: u64,
}

/// Firmware version operations
#[derive(Debug, Clone, Copy)]
pub struct VersionsClient<'a> {
    transport: &'a Transport,
}

impl<'a> VersionsClient<'a> {
    pub(crate) fn new(transport: &'a Transport) -> Self {
        Self { transport }
    }

    /// All versions of an ECU
    #[instrument(skip(self))]
    pub async fn for_ecu(&self, ecu_name: &str, ecu_model: &str) -> Result<Vec<FirmwareVersion>> {
        self.transport
            .get(&[VERSIONS, "ecu", ecu_name, ecu_model])
            .await
    }

    #[instrument(skip(self))]
    pub async fn get(
        &self,
        ecu_name: &str,
        ecu_model: &str,
        version_number: &str,
    ) -> Result<VersionDetail> {
        self.transport
            .get(&[VERSIONS, "ecu", ecu_name, ecu_model, version_number])
            .await
    }

    /// Download the complete firmware image
    #[instrument(skip(self))]
    pub async fn download(
        &self,
        ecu_name: &str,
        ecu_model: &str,
        version_number: &str,
    ) -> Result<Bytes> {
        let data = self
            .transport
            .download::<()>(
                &[VERSIONS, "download", ecu_name, ecu_model, version_number],
                None,
            )
            .await?;
        info!("Downloaded {} bytes", data.len());
        Ok(data)
    }

    /// Read one chunk of a firmware image
    #[instrument(skip(self))]
    pub async fn stream_chunk(
        &self,
        ecu_name: &str,
        ecu_model: &str,
        version_number: &str,
        chunk_size: u64,
        offset: u64,
    ) -> Result<Bytes> {
        let query = ChunkQuery { chunk_size, offset };
        self.transport
            .download(
                &[VERSIONS, "stream", ecu_name, ecu_model, version_number],
                Some(&query),
            )
            .await
    }

    /// Versions whose compatibility list names the car type
    #[instrument(skip(self))]
    pub async fn compatible(&self, car_type: &str) -> Result<Vec<CompatibleVersion>> {
        self.transport
            .get(&[VERSIONS, "compatible", car_type])
            .await
    }

    /// Upload a firmware file to durable storage
    ///
    /// Sends the multipart fields `file`, `ecuName`, `ecuModel`,
    /// `versionNumber` and `compatibleCarTypes` (a JSON array string).
    #[instrument(
        skip(self, request),
        fields(
            ecu = %request.ecu_name,
            model = %request.ecu_model,
            version = %request.version_number
        )
    )]
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadedVersion> {
        let data = tokio::fs::read(&request.file.path).await?;
        info!(
            "Uploading {} ({} bytes)",
            request.file.file_name,
            data.len()
        );

        let compatible = serde_json::to_string(&request.compatible_car_types)
            .map_err(|e| OtaClientError::Parse(e.to_string()))?;
        let file = Part::bytes(data)
            .file_name(request.file.file_name)
            .mime_str("application/octet-stream")?;

        let form = Form::new()
            .part("file", file)
            .text("ecuName", request.ecu_name)
            .text("ecuModel", request.ecu_model)
            .text("versionNumber", request.version_number)
            .text("compatibleCarTypes", compatible);

        self.transport
            .post_multipart(&[VERSIONS, "upload-to-azure"], form)
            .await
    }
}
