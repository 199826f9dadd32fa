//! `/car-types` endpoints

use ota_core::{
    CarType, CarTypeByEcu, CarTypePatch, CarTypeStatistics, CarTypeSummary, MessageResponse,
};
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::transport::Transport;

const CAR_TYPES: &str = "car-types";

/// Car type catalog operations
#[derive(Debug, Clone, Copy)]
pub struct CarTypesClient<'a> {
    transport: &'a Transport,
}

impl<'a> CarTypesClient<'a> {
    pub(crate) fn new(transport: &'a Transport) -> Self {
        Self { transport }
    }

    /// List all car types
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<CarTypeSummary>> {
        let car_types: Vec<CarTypeSummary> = self.transport.get(&[CAR_TYPES]).await?;
        debug!("Fetched {} car types", car_types.len());
        Ok(car_types)
    }

    /// Get a car type with its full ECU and version tree
    #[instrument(skip(self))]
    pub async fn get(&self, name: &str) -> Result<CarType> {
        self.transport.get(&[CAR_TYPES, name]).await
    }

    /// Get a car type by model number
    #[instrument(skip(self))]
    pub async fn get_by_model(&self, model_number: &str) -> Result<CarType> {
        self.transport
            .get(&[CAR_TYPES, "model", model_number])
            .await
    }

    #[instrument(skip(self, car_type), fields(name = %car_type.name))]
    pub async fn create(&self, car_type: &CarType) -> Result<MessageResponse> {
        info!("Creating car type with {} ECUs", car_type.ecus.len());
        self.transport.post(&[CAR_TYPES], car_type).await
    }

    /// Replace the car type stored under `name`
    #[instrument(skip(self, car_type))]
    pub async fn update(&self, name: &str, car_type: &CarType) -> Result<MessageResponse> {
        info!("Updating car type with {} ECUs", car_type.ecus.len());
        self.transport.put(&[CAR_TYPES, name], car_type).await
    }

    #[instrument(skip(self))]
    pub async fn patch(&self, name: &str, patch: &CarTypePatch) -> Result<MessageResponse> {
        self.transport.patch(&[CAR_TYPES, name], patch).await
    }

    /// Delete a car type; the backend decides what else goes with it
    #[instrument(skip(self))]
    pub async fn delete(&self, name: &str) -> Result<MessageResponse> {
        info!("Deleting car type");
        self.transport.delete(&[CAR_TYPES, name]).await
    }

    #[instrument(skip(self))]
    pub async fn statistics(&self) -> Result<CarTypeStatistics> {
        self.transport.get(&[CAR_TYPES, "statistics"]).await
    }

    /// Car types that carry an ECU with the given name
    #[instrument(skip(self))]
    pub async fn by_ecu(&self, ecu_name: &str) -> Result<Vec<CarTypeByEcu>> {
        self.transport.get(&[CAR_TYPES, "by-ecu", ecu_name]).await
    }
}
