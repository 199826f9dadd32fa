//! `/requests` endpoints for service and download tracking

use ota_core::{
    DownloadRequest, DownloadRequestCreated, DownloadStatusUpdate, MessageResponse,
    NewDownloadRequest, NewServiceRequest, RequestStatus, RequestsForCar, ServiceRequest,
};
use tracing::instrument;

use crate::error::Result;
use crate::transport::Transport;

const REQUESTS: &str = "requests";

/// Service and download request operations
#[derive(Debug, Clone, Copy)]
pub struct RequestsClient<'a> {
    transport: &'a Transport,
}

impl<'a> RequestsClient<'a> {
    pub(crate) fn new(transport: &'a Transport) -> Self {
        Self { transport }
    }

    #[instrument(skip(self, request), fields(car_id = %request.car_id))]
    pub async fn create_service(&self, request: &NewServiceRequest) -> Result<MessageResponse> {
        self.transport
            .post(&[REQUESTS, "service"], request)
            .await
    }

    #[instrument(skip(self, request), fields(car_id = %request.car_id))]
    pub async fn create_download(
        &self,
        request: &NewDownloadRequest,
    ) -> Result<DownloadRequestCreated> {
        self.transport
            .post(&[REQUESTS, "download"], request)
            .await
    }

    /// Report progress or a state change of a vehicle's download
    #[instrument(skip(self))]
    pub async fn update_download_status(
        &self,
        car_id: &str,
        status: RequestStatus,
        transferred_size: Option<u64>,
    ) -> Result<MessageResponse> {
        let body = DownloadStatusUpdate {
            status,
            transferred_size,
        };
        self.transport
            .put(&[REQUESTS, "download", car_id, "status"], &body)
            .await
    }

    /// Every request recorded for one vehicle
    #[instrument(skip(self))]
    pub async fn for_car(&self, car_id: &str) -> Result<RequestsForCar> {
        self.transport.get(&[REQUESTS, "car", car_id]).await
    }

    #[instrument(skip(self))]
    pub async fn service_by_status(&self, status: RequestStatus) -> Result<Vec<ServiceRequest>> {
        self.transport
            .get(&[REQUESTS, "service", "status", status.as_str()])
            .await
    }

    #[instrument(skip(self))]
    pub async fn download_by_status(&self, status: RequestStatus) -> Result<Vec<DownloadRequest>> {
        self.transport
            .get(&[REQUESTS, "download", "status", status.as_str()])
            .await
    }

    /// Downloads that are pending or in progress
    #[instrument(skip(self))]
    pub async fn active_downloads(&self) -> Result<Vec<DownloadRequest>> {
        self.transport
            .get(&[REQUESTS, "download", "active"])
            .await
    }
}
