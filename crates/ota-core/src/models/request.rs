//! Service and download request models

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a service or download request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 5] = [
        Self::Pending,
        Self::InProgress,
        Self::Completed,
        Self::Failed,
        Self::Cancelled,
    ];

    /// Wire representation (also used as a path segment)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether no further transitions are expected
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| format!("Invalid status value: {}", s))
    }
}

/// Kind of service requested by a vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceType {
    #[default]
    Diagnostics,
    Repair,
    Maintenance,
    Update,
    Other,
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Diagnostics => "DIAGNOSTICS",
            Self::Repair => "REPAIR",
            Self::Maintenance => "MAINTENANCE",
            Self::Update => "UPDATE",
            Self::Other => "OTHER",
        };
        f.write_str(s)
    }
}

/// A service request raised by a vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub car_id: String,
    #[serde(default)]
    pub car_type: String,
    pub status: RequestStatus,
    #[serde(default)]
    pub service_type: ServiceType,
    /// Timestamp as sent by the backend (ISO-8601, usually without offset)
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ServiceRequest {
    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp.as_deref().and_then(parse_timestamp)
    }
}

/// Reference to one firmware version inside a download request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecu_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecu_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hex_file_path: Option<String>,
}

/// A firmware download in flight to one vehicle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub car_id: String,
    #[serde(default)]
    pub car_type: String,
    pub status: RequestStatus,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub required_versions: Vec<VersionRef>,
    #[serde(default)]
    pub old_versions: Vec<VersionRef>,
    /// Total bytes to transfer
    #[serde(default)]
    pub total_size: u64,
    /// Bytes transferred so far
    #[serde(default)]
    pub transferred_size: u64,
}

impl DownloadRequest {
    /// Transfer progress in percent (0 when the total size is unknown)
    pub fn progress_percent(&self) -> f64 {
        if self.total_size == 0 {
            return 0.0;
        }
        let percent = self.transferred_size as f64 / self.total_size as f64 * 100.0;
        percent.min(100.0)
    }

    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp.as_deref().and_then(parse_timestamp)
    }
}

/// Body of `POST /requests/service/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewServiceRequest {
    pub car_id: String,
    pub car_type: String,
    pub service_type: ServiceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Body of `POST /requests/download/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDownloadRequest {
    pub car_id: String,
    pub car_type: String,
    pub required_versions: Vec<VersionRef>,
    #[serde(default)]
    pub old_versions: Vec<VersionRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// Response of `POST /requests/download/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRequestCreated {
    #[serde(default)]
    pub message: Option<String>,
    pub request_id: String,
    #[serde(default)]
    pub total_size: u64,
}

/// Body of `PUT /requests/download/{car_id}/status/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadStatusUpdate {
    pub status: RequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transferred_size: Option<u64>,
}

/// All requests recorded for one vehicle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestsForCar {
    #[serde(default)]
    pub service_requests: Vec<ServiceRequest>,
    #[serde(default)]
    pub download_requests: Vec<DownloadRequest>,
}

/// Parse a backend timestamp, with or without UTC offset
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()
}

/// Human-readable byte count (1024 base, at most two decimals)
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let exponent = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exponent as i32);

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[exponent])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&RequestStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
        assert_eq!(
            "in-progress".parse::<RequestStatus>().unwrap(),
            RequestStatus::InProgress
        );
        assert!("done".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn test_progress_percent() {
        let json = r#"{
            "car_id": "car-1",
            "status": "IN_PROGRESS",
            "total_size": 2048,
            "transferred_size": 512
        }"#;
        let download: DownloadRequest = serde_json::from_str(json).unwrap();
        assert_eq!(download.progress_percent(), 25.0);

        let empty = DownloadRequest {
            total_size: 0,
            ..download
        };
        assert_eq!(empty.progress_percent(), 0.0);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 Bytes");
        assert_eq!(format_bytes(512), "512 Bytes");
        assert_eq!(format_bytes(1024), "1 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5 MB");
    }

    #[test]
    fn test_parse_timestamp() {
        assert!(parse_timestamp("2024-03-01T10:15:30.123456").is_some());
        assert!(parse_timestamp("2024-03-01T10:15:30Z").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
