//! Draft commands - build a car type locally, then upload and save it
//!
//! Each invocation loads the draft file, applies one or more
//! [`DraftCommand`]s and writes the result back. A rejected command prints a
//! warning and leaves the file as it was.

use anyhow::{Context, Result};
use ota_client::OtaClient;
use ota_core::{
    coerce_count, CarType, CarTypeDraft, DraftCommand, DraftError, DraftMode, HexSource,
    LocalHexFile,
};
use std::path::Path;

use super::spinner;
use crate::draft_file::DraftFile;
use crate::output::{EcuRow, OutputContext, OutputFormat, VersionRow};

/// Start a draft for a new car type
pub fn new(
    file: &DraftFile,
    name: &str,
    model: &str,
    force: bool,
    ctx: &OutputContext,
) -> Result<()> {
    let draft = CarTypeDraft::new(name, model);
    file.create(&draft, force)?;
    ctx.success(&format!(
        "New car type draft {} saved to {}",
        name,
        file.path().display()
    ));
    Ok(())
}

/// Start a draft from an existing car type
pub async fn edit(
    client: &OtaClient,
    file: &DraftFile,
    name: &str,
    force: bool,
    ctx: &OutputContext,
) -> Result<()> {
    let draft = client
        .load_draft(name)
        .await
        .with_context(|| format!("Failed to load car type {}", name))?;
    file.create(&draft, force)?;
    ctx.success(&format!(
        "Editing {} ({} ECUs) in {}",
        draft.name(),
        draft.ecus().len(),
        file.path().display()
    ));
    Ok(())
}

/// Print the draft
pub fn show(file: &DraftFile, ctx: &OutputContext) -> Result<()> {
    let draft = file.load()?;

    if ctx.format == OutputFormat::Json {
        println!(
            "{}",
            serde_json::to_string_pretty(&draft).context("Failed to serialize draft")?
        );
        return Ok(());
    }

    let mode = match draft.mode() {
        DraftMode::Create => "new".to_string(),
        DraftMode::Edit { original_name } => format!("editing {}", original_name),
    };
    ctx.print_kv(&[
        ("Name", draft.name().to_string()),
        ("Model", draft.model_number().to_string()),
        ("Manufactured", draft.manufactured_count().to_string()),
        ("Car IDs", draft.car_ids().join(", ")),
        ("Mode", mode),
        ("Pending uploads", draft.pending_uploads().to_string()),
    ]);

    ctx.info("\nECUs:");
    ctx.print(&ecu_rows(&draft));

    if let Some(index) = draft.selection().index() {
        ctx.info(&format!("\nVersions of ECU {}:", index));
        ctx.print(&version_rows(&draft, index));
    }
    Ok(())
}

/// Apply commands to the draft file
///
/// Returns `false` when a command was rejected; nothing is written then.
pub fn update(file: &DraftFile, commands: Vec<DraftCommand>, ctx: &OutputContext) -> Result<bool> {
    let mut draft = file.load()?;
    match draft.apply_all(commands) {
        Ok(applied) => {
            file.save(&draft)?;
            ctx.success(&format!("Draft updated ({} change(s))", applied));
            Ok(true)
        }
        Err(e) => {
            ctx.warn(&e.to_string());
            Ok(false)
        }
    }
}

/// Commands for `draft set`
pub fn field_commands(
    name: Option<String>,
    model: Option<String>,
    count: Option<&str>,
) -> Vec<DraftCommand> {
    let mut commands = Vec::new();
    if let Some(name) = name {
        commands.push(DraftCommand::SetName(name));
    }
    if let Some(model) = model {
        commands.push(DraftCommand::SetModelNumber(model));
    }
    if let Some(count) = count {
        let count = i64::try_from(coerce_count(count)).unwrap_or(i64::MAX);
        commands.push(DraftCommand::SetManufacturedCount(count));
    }
    commands
}

/// Attach a catalog ECU together with its firmware history
pub async fn add_existing_ecu(
    client: &OtaClient,
    file: &DraftFile,
    name: &str,
    model: &str,
    ctx: &OutputContext,
) -> Result<bool> {
    let ecu = client
        .ecus()
        .get(name, model)
        .await
        .with_context(|| format!("Failed to fetch ECU {} ({})", name, model))?;
    update(file, vec![DraftCommand::AddExistingEcu(ecu)], ctx)
}

/// Add a firmware version to an ECU of the draft
///
/// Without `ecu_index` the selected ECU is used. A local file is uploaded
/// on submit; a `hex_path` refers to firmware already in storage.
pub fn add_version(
    file: &DraftFile,
    ecu_index: Option<usize>,
    version_number: &str,
    hex_file: Option<&Path>,
    hex_path: Option<&str>,
    compatible_car_types: Vec<String>,
    ctx: &OutputContext,
) -> Result<bool> {
    let draft = file.load()?;
    let Some(ecu_index) = ecu_index.or_else(|| draft.selection().index()) else {
        ctx.warn(&DraftError::NoEcuSelected.to_string());
        return Ok(false);
    };

    let source = match (hex_file, hex_path) {
        (Some(path), _) => HexSource::pending(
            LocalHexFile::from_path(path)
                .with_context(|| format!("Failed to read firmware file: {}", path.display()))?,
        ),
        (None, Some(hex_path)) => HexSource::resolved(hex_path),
        (None, None) => HexSource::resolved(""),
    };

    update(
        file,
        vec![DraftCommand::AddVersion {
            ecu_index,
            version_number: version_number.to_string(),
            source,
            compatible_car_types,
        }],
        ctx,
    )
}

/// Apply a JSON list of commands from a file
pub fn apply(file: &DraftFile, commands: &Path, ctx: &OutputContext) -> Result<bool> {
    let content = std::fs::read_to_string(commands)
        .with_context(|| format!("Failed to read commands file: {}", commands.display()))?;
    let commands: Vec<DraftCommand> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse commands file: {}", commands.display()))?;
    update(file, commands, ctx)
}

/// Car types a new version of the given ECU may be marked compatible with
pub async fn choices(
    client: &OtaClient,
    file: &DraftFile,
    ecu_index: usize,
    ctx: &OutputContext,
) -> Result<()> {
    let draft = file.load()?;
    let catalog = fetch_catalog(client).await?;

    match draft.compatibility_choices(ecu_index, &catalog) {
        Ok(choices) => {
            let choices: Vec<String> = choices.into_iter().collect();
            if ctx.format == OutputFormat::Json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&choices).unwrap_or_else(|_| "[]".to_string())
                );
            } else {
                for choice in choices {
                    println!("{}", choice);
                }
            }
        }
        Err(e) => ctx.warn(&e.to_string()),
    }
    Ok(())
}

async fn fetch_catalog(client: &OtaClient) -> Result<Vec<CarType>> {
    let summaries = client
        .car_types()
        .list()
        .await
        .context("Failed to fetch car types")?;

    let mut catalog = Vec::with_capacity(summaries.len());
    for summary in summaries {
        let car_type = client
            .car_types()
            .get(&summary.name)
            .await
            .with_context(|| format!("Failed to fetch car type {}", summary.name))?;
        catalog.push(car_type);
    }
    Ok(catalog)
}

/// Upload pending firmware and save the car type
///
/// The draft file is rewritten only after the backend accepted the car type.
pub async fn submit(client: &OtaClient, file: &DraftFile, ctx: &OutputContext) -> Result<()> {
    let mut draft = file.load()?;
    if let Err(e) = draft.validate_for_submit() {
        ctx.warn(&e.to_string());
        return Ok(());
    }

    let pending = draft.pending_uploads();
    let msg = if pending > 0 {
        format!("Uploading {} firmware file(s) and saving...", pending)
    } else {
        "Saving...".to_string()
    };

    let pb = spinner(msg, ctx.quiet);
    let result = client.submit_draft(&mut draft).await;
    pb.finish_and_clear();
    let response = result.context("Failed to save car type")?;

    file.save(&draft)?;
    ctx.success(
        response
            .message
            .as_deref()
            .unwrap_or("Car type saved successfully"),
    );
    Ok(())
}

/// Leave the version editor
pub fn cancel(file: &DraftFile, ctx: &OutputContext) -> Result<()> {
    let mut draft = file.load()?;
    draft.cancel();
    file.save(&draft)?;
    ctx.info("ECU selection cleared");
    Ok(())
}

pub fn discard(file: &DraftFile, ctx: &OutputContext) -> Result<()> {
    file.discard()?;
    ctx.info(&format!("Removed {}", file.path().display()));
    Ok(())
}

fn ecu_rows(draft: &CarTypeDraft) -> Vec<EcuRow> {
    draft
        .ecus()
        .iter()
        .enumerate()
        .map(|(i, ecu)| EcuRow {
            index: if draft.selection().is_selected(i) {
                format!("*{}", i)
            } else {
                i.to_string()
            },
            name: ecu.name.clone(),
            model_number: ecu.model_number.clone(),
            versions: ecu
                .versions
                .iter()
                .map(|v| v.version_number.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect()
}

fn version_rows(draft: &CarTypeDraft, ecu_index: usize) -> Vec<VersionRow> {
    let Some(ecu) = draft.ecus().get(ecu_index) else {
        return Vec::new();
    };
    ecu.versions
        .iter()
        .enumerate()
        .map(|(i, v)| VersionRow {
            index: i.to_string(),
            version_number: v.version_number.clone(),
            compatible_car_types: v.compatible_car_types.join(", "),
            file: match &v.source {
                HexSource::Pending { hex_file } => format!(
                    "{} (pending, {})",
                    hex_file.file_name,
                    ota_core::format_bytes(hex_file.size)
                ),
                HexSource::Resolved { hex_file_path } => hex_file_path.clone(),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft_file::DEFAULT_DRAFT_FILE;
    use ota_client::testing::TestServer;
    use pretty_assertions::assert_eq;

    fn quiet() -> OutputContext {
        OutputContext::new(OutputFormat::Table, true, true)
    }

    fn draft_file(dir: &tempfile::TempDir) -> DraftFile {
        let file = DraftFile::new(dir.path().join(DEFAULT_DRAFT_FILE));
        new(&file, "Sedan", "M1", false, &quiet()).unwrap();
        file
    }

    #[test]
    fn test_update_persists_applied_commands() {
        let dir = tempfile::tempdir().unwrap();
        let file = draft_file(&dir);

        let applied = update(
            &file,
            vec![
                DraftCommand::AddCarId("VIN-1".into()),
                DraftCommand::AddNewEcu {
                    name: "Engine".into(),
                    model_number: "EN-2".into(),
                },
                DraftCommand::SelectEcu(0),
            ],
            &quiet(),
        )
        .unwrap();
        assert!(applied);

        let draft = file.load().unwrap();
        assert_eq!(draft.car_ids(), ["VIN-1".to_string()]);
        assert_eq!(draft.selection().index(), Some(0));
    }

    #[test]
    fn test_rejected_command_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let file = draft_file(&dir);
        update(&file, vec![DraftCommand::AddCarId("VIN-1".into())], &quiet()).unwrap();
        let before = std::fs::read_to_string(file.path()).unwrap();

        let applied = update(
            &file,
            vec![
                DraftCommand::AddCarId("VIN-2".into()),
                DraftCommand::AddCarId("VIN-1".into()),
            ],
            &quiet(),
        )
        .unwrap();
        assert!(!applied);
        assert_eq!(std::fs::read_to_string(file.path()).unwrap(), before);
    }

    #[test]
    fn test_add_version_uses_selection() {
        let dir = tempfile::tempdir().unwrap();
        let file = draft_file(&dir);
        let hex = dir.path().join("engine-1.0.hex");
        std::fs::write(&hex, b":00000001FF").unwrap();

        assert!(!add_version(&file, None, "1.0", Some(&hex), None, vec![], &quiet()).unwrap());

        update(
            &file,
            vec![
                DraftCommand::AddNewEcu {
                    name: "Engine".into(),
                    model_number: "EN-2".into(),
                },
                DraftCommand::SelectEcu(0),
            ],
            &quiet(),
        )
        .unwrap();
        assert!(add_version(
            &file,
            None,
            "1.0",
            Some(&hex),
            None,
            vec!["Coupe".into()],
            &quiet()
        )
        .unwrap());

        let draft = file.load().unwrap();
        let version = &draft.ecus()[0].versions[0];
        assert_eq!(version.compatible_car_types, vec!["coupe", "sedan"]);
        assert_eq!(draft.pending_uploads(), 1);

        let rows = version_rows(&draft, 0);
        assert_eq!(rows[0].file, "engine-1.0.hex (pending, 11 Bytes)");
    }

    #[test]
    fn test_add_version_without_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = draft_file(&dir);
        update(
            &file,
            vec![DraftCommand::AddNewEcu {
                name: "Engine".into(),
                model_number: "EN-2".into(),
            }],
            &quiet(),
        )
        .unwrap();

        assert!(!add_version(&file, Some(0), "1.0", None, None, vec![], &quiet()).unwrap());
        assert!(file.load().unwrap().ecus()[0].versions.is_empty());
    }

    #[test]
    fn test_field_commands_coerce_count() {
        let commands = field_commands(None, Some("M2".into()), Some("-4"));
        assert_eq!(
            commands,
            vec![
                DraftCommand::SetModelNumber("M2".into()),
                DraftCommand::SetManufacturedCount(0),
            ]
        );
        assert_eq!(
            field_commands(None, None, Some("12 units")),
            vec![DraftCommand::SetManufacturedCount(12)]
        );
    }

    #[test]
    fn test_apply_commands_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = draft_file(&dir);
        let commands = dir.path().join("commands.json");
        std::fs::write(
            &commands,
            r#"[
                {"op": "add_new_ecu", "value": {"name": "Engine", "model_number": "EN-2"}},
                {"op": "add_version", "value": {
                    "ecu_index": 0,
                    "version_number": "2.0",
                    "source": {"hex_file_path": "https://blob/engine-2.0.hex"}
                }}
            ]"#,
        )
        .unwrap();

        assert!(apply(&file, &commands, &quiet()).unwrap());
        let payload = file.load().unwrap().to_payload().unwrap();
        assert_eq!(
            payload.ecus[0].versions[0].hex_file_path,
            "https://blob/engine-2.0.hex"
        );
        assert_eq!(payload.ecus[0].versions[0].compatible_car_types, vec!["sedan"]);
    }

    #[test]
    fn test_cancel_clears_selection() {
        let dir = tempfile::tempdir().unwrap();
        let file = draft_file(&dir);
        update(
            &file,
            vec![
                DraftCommand::AddNewEcu {
                    name: "Engine".into(),
                    model_number: "EN-2".into(),
                },
                DraftCommand::SelectEcu(0),
            ],
            &quiet(),
        )
        .unwrap();

        cancel(&file, &quiet()).unwrap();
        assert_eq!(file.load().unwrap().selection().index(), None);
        assert_eq!(ecu_rows(&file.load().unwrap())[0].index, "0");
    }

    fn backend(create_status: axum::http::StatusCode) -> axum::Router {
        use axum::routing::post;
        use axum::Json;
        use serde_json::json;

        axum::Router::new()
            .route(
                "/versions/upload-to-azure",
                post(|| async {
                    (
                        axum::http::StatusCode::CREATED,
                        Json(json!({
                            "message": "Firmware uploaded successfully",
                            "version": {
                                "version_number": "1.0",
                                "hex_file_path": "https://blob.example/engine-1.0.hex",
                                "compatible_car_types": ["sedan"]
                            }
                        })),
                    )
                }),
            )
            .route(
                "/car-types/",
                post(move || async move {
                    (create_status, Json(json!({"message": "Car type created successfully"})))
                }),
            )
    }

    fn pending_draft(dir: &tempfile::TempDir) -> DraftFile {
        let file = draft_file(dir);
        let hex = dir.path().join("engine-1.0.hex");
        std::fs::write(&hex, b":00000001FF").unwrap();
        update(
            &file,
            vec![DraftCommand::AddNewEcu {
                name: "Engine".into(),
                model_number: "EN-2".into(),
            }],
            &quiet(),
        )
        .unwrap();
        assert!(add_version(&file, Some(0), "1.0", Some(&hex), None, vec![], &quiet()).unwrap());
        file
    }

    #[tokio::test]
    async fn test_submit_saves_accepted_car_type() {
        let dir = tempfile::tempdir().unwrap();
        let file = pending_draft(&dir);
        let server = TestServer::start(backend(axum::http::StatusCode::CREATED))
            .await
            .unwrap();

        submit(&server.client, &file, &quiet()).await.unwrap();

        let draft = file.load().unwrap();
        assert_eq!(
            draft.mode(),
            &DraftMode::Edit {
                original_name: "Sedan".into()
            }
        );
        assert_eq!(draft.pending_uploads(), 0);
        assert_eq!(
            draft.to_payload().unwrap().ecus[0].versions[0].hex_file_path,
            "https://blob.example/engine-1.0.hex"
        );
    }

    #[tokio::test]
    async fn test_rejected_submit_keeps_draft_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = pending_draft(&dir);
        let before = std::fs::read_to_string(file.path()).unwrap();
        let server = TestServer::start(backend(axum::http::StatusCode::CONFLICT))
            .await
            .unwrap();

        assert!(submit(&server.client, &file, &quiet()).await.is_err());
        assert_eq!(std::fs::read_to_string(file.path()).unwrap(), before);
        assert_eq!(file.load().unwrap().pending_uploads(), 1);
    }
}
