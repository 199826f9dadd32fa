//! Resource clients, one per backend endpoint family
//!
//! Each client borrows the [`Transport`](crate::Transport) of its
//! [`OtaClient`](crate::OtaClient) and fires exactly one request per call.

mod car_types;
mod ecus;
mod requests;
mod versions;

pub use car_types::CarTypesClient;
pub use ecus::EcusClient;
pub use requests::RequestsClient;
pub use versions::{VersionsClient, DEFAULT_CHUNK_SIZE};
