//! `/ecus` endpoints

use ota_core::{CompatibleEcu, Ecu, EcuSummary};
use tracing::instrument;

use crate::error::Result;
use crate::transport::Transport;

const ECUS: &str = "ecus";

/// ECU inventory operations
#[derive(Debug, Clone, Copy)]
pub struct EcusClient<'a> {
    transport: &'a Transport,
}

impl<'a> EcusClient<'a> {
    pub(crate) fn new(transport: &'a Transport) -> Self {
        Self { transport }
    }

    /// List every ECU with its versions
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Ecu>> {
        self.transport.get(&[ECUS]).await
    }

    /// ECUs installed in a car type, without version details
    #[instrument(skip(self))]
    pub async fn for_car_type(&self, car_type: &str) -> Result<Vec<EcuSummary>> {
        self.transport.get(&[ECUS, "car-type", car_type]).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, name: &str, model_number: &str) -> Result<Ecu> {
        self.transport.get(&[ECUS, name, model_number]).await
    }

    /// ECUs having at least one version compatible with a car type
    #[instrument(skip(self))]
    pub async fn compatible(&self, car_type: &str) -> Result<Vec<CompatibleEcu>> {
        self.transport.get(&[ECUS, "compatible", car_type]).await
    }
}
