//! Wire models for the OTA backend

mod catalog;
mod request;

pub use catalog::*;
pub use request::*;
