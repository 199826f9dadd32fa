//! Output formatting for ota-cli (table, json, csv)

use clap::ValueEnum;
use colored::Colorize;
use ota_core::models::{format_bytes, DownloadRequest, ServiceRequest};
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }

    /// Parse a config file value, falling back to a table
    pub fn from_config(value: &str) -> Self {
        <Self as ValueEnum>::from_str(value, true).unwrap_or_default()
    }
}

/// Context for output rendering
pub struct OutputContext {
    pub format: OutputFormat,
    pub quiet: bool,
}

impl OutputContext {
    pub fn new(format: OutputFormat, no_color: bool, quiet: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format, quiet }
    }

    /// Print a success message (unless in quiet mode)
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg.green());
        }
    }

    /// Print an info message (unless in quiet mode)
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg);
        }
    }

    pub fn warn(&self, msg: &str) {
        eprintln!("{}", msg.yellow());
    }

    pub fn error(&self, msg: &str) {
        eprintln!("{}", msg.red());
    }

    /// Print rows in the configured format
    pub fn print<T: Tabled + Serialize>(&self, data: &[T]) {
        match self.format {
            OutputFormat::Table => {
                if data.is_empty() {
                    if !self.quiet {
                        println!("No data");
                    }
                } else {
                    println!("{}", Table::new(data));
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(data).unwrap_or_else(|_| "[]".to_string())
                );
            }
            OutputFormat::Csv => print!("{}", to_csv(data)),
        }
    }

    /// Print key-value pairs (detail views)
    pub fn print_kv(&self, pairs: &[(&str, String)]) {
        match self.format {
            OutputFormat::Table => {
                for (key, value) in pairs {
                    println!("{}: {}", key.bold(), value);
                }
            }
            OutputFormat::Json => {
                let map: serde_json::Map<String, serde_json::Value> = pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.clone())))
                    .collect();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&map).unwrap_or_else(|_| "{}".to_string())
                );
            }
            OutputFormat::Csv => {
                let keys: Vec<&str> = pairs.iter().map(|(k, _)| *k).collect();
                println!("{}", keys.join(","));
                let values: Vec<String> = pairs.iter().map(|(_, v)| escape_csv(v)).collect();
                println!("{}", values.join(","));
            }
        }
    }

    /// Print a raw serializable value as JSON, or a table of rows otherwise
    pub fn print_json_or<T: Serialize, R: Tabled + Serialize>(&self, value: &T, rows: &[R]) {
        if self.format == OutputFormat::Json {
            println!(
                "{}",
                serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
            );
        } else {
            self.print(rows);
        }
    }
}

/// Render rows as CSV, header taken from the first row
fn to_csv<T: Serialize>(data: &[T]) -> String {
    let Some(first) = data.first() else {
        return String::new();
    };

    let mut out = String::new();
    if let Ok(serde_json::Value::Object(map)) = serde_json::to_value(first) {
        let headers: Vec<&str> = map.keys().map(|s| s.as_str()).collect();
        out.push_str(&headers.join(","));
        out.push('\n');

        for item in data {
            if let Ok(serde_json::Value::Object(row)) = serde_json::to_value(item) {
                let values: Vec<String> = headers
                    .iter()
                    .map(|h| {
                        row.get(*h)
                            .map(|v| match v {
                                serde_json::Value::String(s) => escape_csv(s),
                                other => escape_csv(&other.to_string()),
                            })
                            .unwrap_or_default()
                    })
                    .collect();
                out.push_str(&values.join(","));
                out.push('\n');
            }
        }
    }
    out
}

fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

// =============================================================================
// Display types for various commands
// =============================================================================

/// Car type line for `car-types list`
#[derive(Debug, Tabled, Serialize)]
pub struct CarTypeRow {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Model")]
    pub model_number: String,
    #[tabled(rename = "Manufactured")]
    pub manufactured_count: u64,
    #[tabled(rename = "Car IDs")]
    pub car_ids: usize,
    #[tabled(rename = "ECUs")]
    pub ecus: usize,
}

/// Per car type statistics line
#[derive(Debug, Tabled, Serialize)]
pub struct StatRow {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Model")]
    pub model_number: String,
    #[tabled(rename = "Manufactured")]
    pub manufactured_count: u64,
    #[tabled(rename = "Car IDs")]
    pub car_ids: usize,
    #[tabled(rename = "ECUs")]
    pub ecus: usize,
}

/// ECU line; `versions` is a count or a version list depending on the view
#[derive(Debug, Tabled, Serialize)]
pub struct EcuRow {
    #[tabled(rename = "#")]
    pub index: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Model")]
    pub model_number: String,
    #[tabled(rename = "Versions")]
    pub versions: String,
}

/// Firmware version line
#[derive(Debug, Tabled, Serialize)]
pub struct VersionRow {
    #[tabled(rename = "#")]
    pub index: String,
    #[tabled(rename = "Version")]
    pub version_number: String,
    #[tabled(rename = "Compatible")]
    pub compatible_car_types: String,
    #[tabled(rename = "File")]
    pub file: String,
}

/// Firmware compatible with a car type
#[derive(Debug, Tabled, Serialize)]
pub struct CompatibleVersionRow {
    #[tabled(rename = "ECU")]
    pub ecu_name: String,
    #[tabled(rename = "ECU Model")]
    pub ecu_model: String,
    #[tabled(rename = "Version")]
    pub version_number: String,
    #[tabled(rename = "File")]
    pub hex_file_path: String,
}

/// Service request line
#[derive(Debug, Tabled, Serialize)]
pub struct ServiceRequestRow {
    #[tabled(rename = "Car ID")]
    pub car_id: String,
    #[tabled(rename = "Car Type")]
    pub car_type: String,
    #[tabled(rename = "Service")]
    pub service_type: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Time")]
    pub timestamp: String,
}

impl From<&ServiceRequest> for ServiceRequestRow {
    fn from(r: &ServiceRequest) -> Self {
        Self {
            car_id: r.car_id.clone(),
            car_type: r.car_type.clone(),
            service_type: r.service_type.to_string(),
            status: r.status.to_string(),
            timestamp: r
                .parsed_timestamp()
                .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
                .or_else(|| r.timestamp.clone())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Download request line with transfer progress
#[derive(Debug, Tabled, Serialize)]
pub struct DownloadRow {
    #[tabled(rename = "Car ID")]
    pub car_id: String,
    #[tabled(rename = "Car Type")]
    pub car_type: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Progress")]
    pub progress: String,
    #[tabled(rename = "Transferred")]
    pub transferred: String,
    #[tabled(rename = "Versions")]
    pub versions: usize,
}

impl From<&DownloadRequest> for DownloadRow {
    fn from(r: &DownloadRequest) -> Self {
        Self {
            car_id: r.car_id.clone(),
            car_type: r.car_type.clone(),
            status: r.status.to_string(),
            progress: format!("{:.1}%", r.progress_percent()),
            transferred: format!(
                "{} / {}",
                format_bytes(r.transferred_size),
                format_bytes(r.total_size)
            ),
            versions: r.required_versions.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_csv_escapes_and_orders_by_first_row() {
        let rows = vec![
            CompatibleVersionRow {
                ecu_name: "Body, Control".into(),
                ecu_model: "BC-1".into(),
                version_number: "1.0".into(),
                hex_file_path: "say \"hi\"".into(),
            },
            CompatibleVersionRow {
                ecu_name: "Engine".into(),
                ecu_model: "EN-2".into(),
                version_number: "2.0".into(),
                hex_file_path: "blob".into(),
            },
        ];

        let csv = to_csv(&rows);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("ecu_name"));
        assert!(lines[1].contains("\"Body, Control\""));
        assert!(lines[1].contains("\"say \"\"hi\"\"\""));
        assert!(lines[2].contains("Engine"));
    }

    #[test]
    fn test_csv_empty() {
        let rows: Vec<StatRow> = Vec::new();
        assert_eq!(to_csv(&rows), "");
    }

    #[test]
    fn test_output_format_from_config() {
        assert_eq!(OutputFormat::from_config("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::from_config("CSV"), OutputFormat::Csv);
        assert_eq!(OutputFormat::from_config("yaml"), OutputFormat::Table);
        assert_eq!(OutputFormat::Csv.as_str(), "csv");
    }
}
