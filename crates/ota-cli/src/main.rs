//! OTA CLI - Command-line console for the OTA firmware catalog
//!
//! Browse car types, ECUs and firmware versions, build car types as local
//! drafts with pending firmware uploads, and follow vehicle downloads.

mod commands;
mod config;
mod draft_file;
mod filter;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ota_client::{ClientConfig, OtaClient};
use ota_core::{CarTypePatch, DraftCommand, RequestStatus};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::commands::requests::RequestKind;
use crate::config::{Config, MergedConfig};
use crate::draft_file::{DraftFile, DEFAULT_DRAFT_FILE};
use crate::filter::ListFilter;
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "ota-cli")]
#[command(author, version, about = "OTA Firmware Catalog Console")]
#[command(propagate_version = true)]
struct Cli {
    /// Backend API root (defaults to the build-time URL)
    #[arg(short, long, env = "OTA_SERVER")]
    server: Option<String>,

    /// Configuration file path
    #[arg(short, long, env = "OTA_CONFIG")]
    config: Option<PathBuf>,

    /// YAML client config (timeouts, poll interval)
    #[arg(long, env = "OTA_CLIENT_CONFIG")]
    client_config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Car type catalog
    #[command(subcommand)]
    CarTypes(CarTypeCommands),

    /// ECU inventory
    #[command(subcommand)]
    Ecus(EcuCommands),

    /// Firmware versions
    #[command(subcommand)]
    Versions(VersionCommands),

    /// Service and download requests
    #[command(subcommand)]
    Requests(RequestCommands),

    /// Build a car type locally and save it
    Draft {
        /// Draft file
        #[arg(short, long, env = "OTA_DRAFT_FILE", default_value = DEFAULT_DRAFT_FILE)]
        file: PathBuf,

        #[command(subcommand)]
        action: DraftCommands,
    },
}

#[derive(Subcommand)]
enum CarTypeCommands {
    /// List all car types
    List {
        /// Keep entries containing this text (case-insensitive)
        #[arg(long)]
        search: Option<String>,
    },

    /// Show a car type with its ECUs
    Show {
        /// Car type name
        name: String,
    },

    /// Find a car type by model number
    ByModel {
        model: String,
    },

    /// Manufacturing statistics
    Stats,

    /// Car types using an ECU
    ByEcu {
        /// ECU name
        ecu: String,

        /// Keep entries containing this text (case-insensitive)
        #[arg(long)]
        search: Option<String>,
    },

    /// Update scalar fields of a car type
    Set {
        name: String,

        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        count: Option<u64>,

        /// Replace the car IDs (comma separated)
        #[arg(long, value_delimiter = ',')]
        car_ids: Option<Vec<String>>,
    },

    /// Delete a car type
    Delete {
        name: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum EcuCommands {
    /// List all ECUs
    List {
        /// Keep entries containing this text (case-insensitive)
        #[arg(long)]
        search: Option<String>,
    },

    /// ECUs of a car type
    ForCarType {
        car_type: String,

        /// Keep entries containing this text (case-insensitive)
        #[arg(long)]
        search: Option<String>,
    },

    /// Show an ECU with its versions
    Show {
        name: String,
        model: String,
    },

    /// ECUs with firmware compatible with a car type
    Compatible {
        car_type: String,

        /// Keep entries containing this text (case-insensitive)
        #[arg(long)]
        search: Option<String>,
    },
}

#[derive(Subcommand)]
enum VersionCommands {
    /// Versions of an ECU
    List {
        ecu: String,
        model: String,

        /// Keep entries containing this text (case-insensitive)
        #[arg(long)]
        search: Option<String>,
    },

    /// Show one version
    Show {
        ecu: String,
        model: String,
        #[arg(value_name = "VERSION")]
        version_number: String,
    },

    /// Download a firmware image
    Download {
        ecu: String,
        model: String,
        #[arg(value_name = "VERSION")]
        version_number: String,

        /// Output file
        #[arg(long = "out")]
        out: Option<PathBuf>,

        /// Fetch in chunks of this many bytes
        #[arg(long, num_args = 0..=1, default_missing_value = "1024")]
        chunked: Option<u64>,
    },

    /// Firmware compatible with a car type
    Compatible {
        car_type: String,

        /// Keep entries containing this text (case-insensitive)
        #[arg(long)]
        search: Option<String>,
    },

    /// Upload a firmware file for an ECU
    Upload {
        ecu: String,
        model: String,
        #[arg(value_name = "VERSION")]
        version_number: String,

        /// Firmware file
        file: PathBuf,

        /// Car type the firmware is released for; always compatible
        #[arg(long)]
        car_type: Option<String>,

        /// Further compatible car types (comma separated)
        #[arg(long, value_delimiter = ',')]
        compatible: Vec<String>,
    },
}

#[derive(Subcommand)]
enum RequestCommands {
    /// All requests of a vehicle
    ForCar {
        car_id: String,

        /// Keep requests whose car ID, car type or IP address contains this text
        #[arg(long)]
        search: Option<String>,

        /// Keep requests in this status
        #[arg(long)]
        status: Option<RequestStatus>,
    },

    /// Requests in a given status
    ByStatus {
        #[arg(value_enum)]
        kind: RequestKind,

        /// PENDING, IN_PROGRESS, COMPLETED, FAILED or CANCELLED
        status: RequestStatus,

        /// Keep requests whose car ID, car type or IP address contains this text
        #[arg(long)]
        search: Option<String>,
    },

    /// Downloads currently in progress
    Active {
        /// Keep downloads whose car ID, car type or IP address contains this text
        #[arg(long)]
        search: Option<String>,

        /// Keep downloads in this status
        #[arg(long)]
        status: Option<RequestStatus>,
    },

    /// Refresh active downloads until Ctrl+C
    Watch {
        /// Poll interval in milliseconds
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Report download progress of a vehicle
    UpdateStatus {
        car_id: String,
        status: RequestStatus,

        /// Bytes transferred so far
        #[arg(long)]
        transferred: Option<u64>,
    },
}

#[derive(Subcommand)]
enum DraftCommands {
    /// Start a draft for a new car type
    New {
        name: String,
        model: String,

        /// Replace an existing draft file
        #[arg(long)]
        force: bool,
    },

    /// Start a draft from an existing car type
    Edit {
        name: String,

        #[arg(long)]
        force: bool,
    },

    /// Show the draft
    Show,

    /// Change car type fields
    Set {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        model: Option<String>,

        /// Manufactured count; non-numeric input counts as 0
        #[arg(long, allow_hyphen_values = true)]
        count: Option<String>,
    },

    /// Add a car ID
    AddCarId {
        id: String,
    },

    /// Remove a car ID
    RemoveCarId {
        id: String,
    },

    /// Add an ECU
    AddEcu {
        name: String,
        model: String,

        /// Copy the ECU and its versions from the catalog
        #[arg(long)]
        existing: bool,
    },

    /// Remove the ECU at a position
    RemoveEcu {
        index: usize,
    },

    /// Select the ECU whose versions are edited
    Select {
        index: usize,
    },

    /// Clear the ECU selection
    Cancel,

    /// Add a firmware version
    AddVersion {
        #[arg(value_name = "VERSION")]
        version_number: String,

        /// ECU position (defaults to the selected ECU)
        #[arg(long)]
        ecu: Option<usize>,

        /// Local firmware file, uploaded on submit
        #[arg(long, conflicts_with = "hex_path")]
        file: Option<PathBuf>,

        /// Path of firmware already in storage
        #[arg(long)]
        hex_path: Option<String>,

        /// Compatible car types (comma separated)
        #[arg(long, value_delimiter = ',')]
        compatible: Vec<String>,
    },

    /// Remove a firmware version
    RemoveVersion {
        ecu: usize,
        #[arg(value_name = "VERSION")]
        version_index: usize,
    },

    /// Car types a new version of an ECU may target
    Choices {
        ecu: usize,
    },

    /// Apply a JSON list of draft commands
    Apply {
        commands: PathBuf,
    },

    /// Upload pending firmware and save the car type
    Submit,

    /// Delete the draft file
    Discard,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    // Load config file
    let config = if let Some(config_path) = &cli.config {
        Config::load_from(config_path)?
    } else {
        Config::load().unwrap_or_default()
    };

    // Merge CLI args with config
    let merged = config.merge_with_args(
        cli.server.as_deref(),
        cli.output.map(|o| o.as_str()),
        cli.no_color,
        cli.client_config.as_deref(),
    );

    let ctx = OutputContext::new(
        OutputFormat::from_config(&merged.output),
        merged.no_color,
        cli.quiet,
    );

    if let Err(e) = run(cli.command, &merged, &ctx).await {
        ctx.error(&format!("Error: {:#}", e));
        std::process::exit(1);
    }
    Ok(())
}

async fn run(command: Commands, merged: &MergedConfig, ctx: &OutputContext) -> Result<()> {
    match command {
        Commands::CarTypes(cmd) => {
            let client = create_client(merged)?;
            match cmd {
                CarTypeCommands::List { search } => {
                    commands::car_types::list(&client, search.as_deref(), ctx).await?
                }
                CarTypeCommands::Show { name } => {
                    commands::car_types::show(&client, &name, ctx).await?
                }
                CarTypeCommands::ByModel { model } => {
                    commands::car_types::show_by_model(&client, &model, ctx).await?
                }
                CarTypeCommands::Stats => commands::car_types::stats(&client, ctx).await?,
                CarTypeCommands::ByEcu { ecu, search } => {
                    commands::car_types::by_ecu(&client, &ecu, search.as_deref(), ctx).await?
                }
                CarTypeCommands::Set {
                    name,
                    model,
                    count,
                    car_ids,
                } => {
                    let patch = CarTypePatch {
                        model_number: model,
                        manufactured_count: count,
                        car_ids,
                    };
                    commands::car_types::patch(&client, &name, patch, ctx).await?
                }
                CarTypeCommands::Delete { name, yes } => {
                    commands::car_types::delete(&client, &name, yes, ctx).await?
                }
            }
        }

        Commands::Ecus(cmd) => {
            let client = create_client(merged)?;
            match cmd {
                EcuCommands::List { search } => {
                    commands::ecus::list(&client, search.as_deref(), ctx).await?
                }
                EcuCommands::ForCarType { car_type, search } => {
                    commands::ecus::for_car_type(&client, &car_type, search.as_deref(), ctx)
                        .await?
                }
                EcuCommands::Show { name, model } => {
                    commands::ecus::show(&client, &name, &model, ctx).await?
                }
                EcuCommands::Compatible { car_type, search } => {
                    commands::ecus::compatible(&client, &car_type, search.as_deref(), ctx).await?
                }
            }
        }

        Commands::Versions(cmd) => {
            let client = create_client(merged)?;
            match cmd {
                VersionCommands::List { ecu, model, search } => {
                    commands::versions::list(&client, &ecu, &model, search.as_deref(), ctx).await?
                }
                VersionCommands::Show {
                    ecu,
                    model,
                    version_number,
                } => commands::versions::show(&client, &ecu, &model, &version_number, ctx).await?,
                VersionCommands::Download {
                    ecu,
                    model,
                    version_number,
                    out,
                    chunked,
                } => {
                    commands::versions::download(
                        &client,
                        &ecu,
                        &model,
                        &version_number,
                        out.as_deref(),
                        chunked,
                        ctx,
                    )
                    .await?
                }
                VersionCommands::Compatible { car_type, search } => {
                    commands::versions::compatible(&client, &car_type, search.as_deref(), ctx)
                        .await?
                }
                VersionCommands::Upload {
                    ecu,
                    model,
                    version_number,
                    file,
                    car_type,
                    compatible,
                } => {
                    let compatible = commands::split_list(&compatible);
                    commands::versions::upload(
                        &client,
                        &ecu,
                        &model,
                        &version_number,
                        &file,
                        car_type.as_deref(),
                        compatible,
                        ctx,
                    )
                    .await?;
                }
            }
        }

        Commands::Requests(cmd) => {
            let client = create_client(merged)?;
            match cmd {
                RequestCommands::ForCar {
                    car_id,
                    search,
                    status,
                } => {
                    let filter = ListFilter {
                        search: search.as_deref(),
                        status,
                    };
                    commands::requests::for_car(&client, &car_id, filter, ctx).await?
                }
                RequestCommands::ByStatus {
                    kind,
                    status,
                    search,
                } => {
                    commands::requests::by_status(&client, kind, status, search.as_deref(), ctx)
                        .await?
                }
                RequestCommands::Active { search, status } => {
                    let filter = ListFilter {
                        search: search.as_deref(),
                        status,
                    };
                    commands::requests::active(&client, filter, ctx).await?
                }
                RequestCommands::Watch { interval } => {
                    commands::requests::watch(&client, interval, ctx).await?
                }
                RequestCommands::UpdateStatus {
                    car_id,
                    status,
                    transferred,
                } => {
                    commands::requests::update_status(&client, &car_id, status, transferred, ctx)
                        .await?
                }
            }
        }

        Commands::Draft { file, action } => {
            let file = DraftFile::new(file);
            run_draft(action, &file, merged, ctx).await?;
        }
    }

    Ok(())
}

async fn run_draft(
    action: DraftCommands,
    file: &DraftFile,
    merged: &MergedConfig,
    ctx: &OutputContext,
) -> Result<()> {
    use commands::draft;

    match action {
        DraftCommands::New { name, model, force } => draft::new(file, &name, &model, force, ctx)?,
        DraftCommands::Edit { name, force } => {
            let client = create_client(merged)?;
            draft::edit(&client, file, &name, force, ctx).await?
        }
        DraftCommands::Show => draft::show(file, ctx)?,
        DraftCommands::Set { name, model, count } => {
            let changes = draft::field_commands(name, model, count.as_deref());
            if changes.is_empty() {
                ctx.warn("Nothing to change");
            } else {
                draft::update(file, changes, ctx)?;
            }
        }
        DraftCommands::AddCarId { id } => {
            draft::update(file, vec![DraftCommand::AddCarId(id)], ctx)?;
        }
        DraftCommands::RemoveCarId { id } => {
            draft::update(file, vec![DraftCommand::RemoveCarId(id)], ctx)?;
        }
        DraftCommands::AddEcu {
            name,
            model,
            existing,
        } => {
            if existing {
                let client = create_client(merged)?;
                draft::add_existing_ecu(&client, file, &name, &model, ctx).await?;
            } else {
                draft::update(
                    file,
                    vec![DraftCommand::AddNewEcu {
                        name,
                        model_number: model,
                    }],
                    ctx,
                )?;
            }
        }
        DraftCommands::RemoveEcu { index } => {
            draft::update(file, vec![DraftCommand::RemoveEcu(index)], ctx)?;
        }
        DraftCommands::Select { index } => {
            draft::update(file, vec![DraftCommand::SelectEcu(index)], ctx)?;
        }
        DraftCommands::Cancel => draft::cancel(file, ctx)?,
        DraftCommands::AddVersion {
            version_number,
            ecu,
            file: hex_file,
            hex_path,
            compatible,
        } => {
            draft::add_version(
                file,
                ecu,
                &version_number,
                hex_file.as_deref(),
                hex_path.as_deref(),
                commands::split_list(&compatible),
                ctx,
            )?;
        }
        DraftCommands::RemoveVersion { ecu, version_index } => {
            draft::update(
                file,
                vec![DraftCommand::RemoveVersion {
                    ecu_index: ecu,
                    version_index,
                }],
                ctx,
            )?;
        }
        DraftCommands::Choices { ecu } => {
            let client = create_client(merged)?;
            draft::choices(&client, file, ecu, ctx).await?
        }
        DraftCommands::Apply { commands } => {
            draft::apply(file, &commands, ctx)?;
        }
        DraftCommands::Submit => {
            let client = create_client(merged)?;
            draft::submit(&client, file, ctx).await?
        }
        DraftCommands::Discard => draft::discard(file, ctx)?,
    }
    Ok(())
}

/// Create an OTA client from the merged configuration
///
/// A YAML client config supplies timeouts and the poll interval; an
/// explicitly given server still overrides its base URL.
fn create_client(merged: &MergedConfig) -> Result<OtaClient> {
    let config = match &merged.client_config {
        Some(path) => {
            let mut config = ClientConfig::from_yaml_file(path).with_context(|| {
                format!("Failed to load client config: {}", path.display())
            })?;
            if merged.server_explicit {
                config.connection.base_url = merged.server.clone();
            }
            config
        }
        None => ClientConfig::builder(&merged.server).build(),
    };

    OtaClient::with_config(config).context("Failed to create OTA client")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_draft_add_version() {
        let cli = Cli::try_parse_from([
            "ota-cli",
            "draft",
            "--file",
            "sedan.json",
            "add-version",
            "1.0",
            "--file",
            "fw.hex",
            "--compatible",
            "coupe,suv",
        ])
        .unwrap();

        match cli.command {
            Commands::Draft {
                file,
                action:
                    DraftCommands::AddVersion {
                        version_number,
                        ecu,
                        file: hex_file,
                        compatible,
                        ..
                    },
            } => {
                assert_eq!(file, PathBuf::from("sedan.json"));
                assert_eq!(version_number, "1.0");
                assert_eq!(ecu, None);
                assert_eq!(hex_file, Some(PathBuf::from("fw.hex")));
                assert_eq!(compatible, vec!["coupe", "suv"]);
            }
            _ => panic!("expected draft add-version"),
        }
    }

    #[test]
    fn test_parse_request_status() {
        let cli = Cli::try_parse_from([
            "ota-cli",
            "requests",
            "update-status",
            "VIN-1",
            "in_progress",
            "--transferred",
            "512",
        ])
        .unwrap();

        match cli.command {
            Commands::Requests(RequestCommands::UpdateStatus {
                status,
                transferred,
                ..
            }) => {
                assert_eq!(status, RequestStatus::InProgress);
                assert_eq!(transferred, Some(512));
            }
            _ => panic!("expected requests update-status"),
        }
    }

    #[test]
    fn test_version_subcommands_take_version_argument() {
        let cli = Cli::try_parse_from([
            "ota-cli", "versions", "upload", "Engine", "EN-2", "1.0", "fw.hex", "--car-type", "sedan",
        ])
        .unwrap();
        match cli.command {
            Commands::Versions(VersionCommands::Upload {
                version_number,
                car_type,
                compatible,
                ..
            }) => {
                assert_eq!(version_number, "1.0");
                assert_eq!(car_type.as_deref(), Some("sedan"));
                assert!(compatible.is_empty());
            }
            _ => panic!("expected versions upload"),
        }

        let cli =
            Cli::try_parse_from(["ota-cli", "versions", "show", "Engine", "EN-2", "1.0"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Versions(VersionCommands::Show { ref version_number, .. }) if version_number == "1.0"
        ));

        let cli = Cli::try_parse_from(["ota-cli", "draft", "remove-version", "0", "2"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Draft {
                action: DraftCommands::RemoveVersion {
                    ecu: 0,
                    version_index: 2
                },
                ..
            }
        ));

        let err = Cli::try_parse_from(["ota-cli", "versions", "show", "--version"])
            .err()
            .unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_parse_request_filters() {
        let cli = Cli::try_parse_from([
            "ota-cli", "requests", "active", "--search", "10.0.0", "--status", "completed",
        ])
        .unwrap();

        match cli.command {
            Commands::Requests(RequestCommands::Active { search, status }) => {
                assert_eq!(search.as_deref(), Some("10.0.0"));
                assert_eq!(status, Some(RequestStatus::Completed));
            }
            _ => panic!("expected requests active"),
        }

        let cli = Cli::try_parse_from(["ota-cli", "car-types", "list", "--search", "sed"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::CarTypes(CarTypeCommands::List { search: Some(ref s) }) if s == "sed"
        ));
    }

    #[test]
    fn test_version_add_rejects_both_sources() {
        let result = Cli::try_parse_from([
            "ota-cli",
            "draft",
            "add-version",
            "1.0",
            "--file",
            "fw.hex",
            "--hex-path",
            "https://blob/fw.hex",
        ]);
        assert!(result.is_err());
    }
}
