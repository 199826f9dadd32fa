//! Firmware version commands - history, download and upload

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use ota_client::OtaClient;
use ota_core::{format_bytes, DraftError, LocalHexFile, UploadRequest};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::spinner;
use crate::filter::ListFilter;
use crate::output::{CompatibleVersionRow, OutputContext, OutputFormat, VersionRow};

/// Versions released for one ECU
pub async fn list(
    client: &OtaClient,
    ecu: &str,
    model: &str,
    search: Option<&str>,
    ctx: &OutputContext,
) -> Result<()> {
    let versions = client
        .versions()
        .for_ecu(ecu, model)
        .await
        .with_context(|| format!("Failed to fetch versions of ECU {} ({})", ecu, model))?;
    let versions = ListFilter::search(search).apply(versions);

    let rows: Vec<VersionRow> = versions
        .iter()
        .enumerate()
        .map(|(i, v)| VersionRow {
            index: i.to_string(),
            version_number: v.version_number.clone(),
            compatible_car_types: v.compatible_car_types.join(", "),
            file: v.hex_file_path.clone(),
        })
        .collect();

    ctx.print_json_or(&versions, &rows);
    Ok(())
}

/// Detail of one version, including the stored file size
pub async fn show(
    client: &OtaClient,
    ecu: &str,
    model: &str,
    version: &str,
    ctx: &OutputContext,
) -> Result<()> {
    let detail = client
        .versions()
        .get(ecu, model, version)
        .await
        .with_context(|| format!("Failed to fetch version {} of ECU {} ({})", version, ecu, model))?;

    if ctx.format == OutputFormat::Json {
        println!(
            "{}",
            serde_json::to_string_pretty(&detail).unwrap_or_else(|_| "{}".to_string())
        );
        return Ok(());
    }

    ctx.print_kv(&[
        ("Version", detail.version.version_number.clone()),
        ("Compatible", detail.version.compatible_car_types.join(", ")),
        ("File", detail.version.hex_file_path.clone()),
        (
            "Size",
            detail
                .file_size
                .map(format_bytes)
                .unwrap_or_else(|| "unknown".to_string()),
        ),
    ]);
    Ok(())
}

/// Firmware versions compatible with a car type
pub async fn compatible(
    client: &OtaClient,
    car_type: &str,
    search: Option<&str>,
    ctx: &OutputContext,
) -> Result<()> {
    let versions = client
        .versions()
        .compatible(car_type)
        .await
        .with_context(|| format!("Failed to fetch versions compatible with {}", car_type))?;
    let versions = ListFilter::search(search).apply(versions);

    let rows: Vec<CompatibleVersionRow> = versions
        .into_iter()
        .map(|v| CompatibleVersionRow {
            ecu_name: v.ecu_name,
            ecu_model: v.ecu_model,
            version_number: v.version_number,
            hex_file_path: v.hex_file_path,
        })
        .collect();

    ctx.print(&rows);
    Ok(())
}

/// Save a firmware image to disk
///
/// With `chunk_size` the image is fetched through the stream endpoint one
/// chunk at a time; otherwise in a single request.
pub async fn download(
    client: &OtaClient,
    ecu: &str,
    model: &str,
    version: &str,
    out: Option<&Path>,
    chunk_size: Option<u64>,
    ctx: &OutputContext,
) -> Result<()> {
    let out: PathBuf = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(format!("{}_{}_{}.hex", ecu, model, version)));

    let written = match chunk_size {
        None => {
            let pb = spinner(format!("Downloading {} {}...", ecu, version), ctx.quiet);
            let data = client
                .versions()
                .download(ecu, model, version)
                .await
                .context("Failed to download firmware")?;
            pb.finish_and_clear();
            std::fs::write(&out, &data)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            data.len() as u64
        }
        Some(chunk_size) => {
            download_chunked(client, ecu, model, version, &out, chunk_size.max(1), ctx).await?
        }
    };

    ctx.success(&format!(
        "Saved {} to {}",
        format_bytes(written),
        out.display()
    ));
    Ok(())
}

async fn download_chunked(
    client: &OtaClient,
    ecu: &str,
    model: &str,
    version: &str,
    out: &Path,
    chunk_size: u64,
    ctx: &OutputContext,
) -> Result<u64> {
    let total = client
        .versions()
        .get(ecu, model, version)
        .await
        .ok()
        .and_then(|d| d.file_size);

    let pb = match (total, ctx.quiet) {
        (_, true) => ProgressBar::hidden(),
        (Some(total), false) => {
            let pb = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
            {
                pb.set_style(style.progress_chars("=>-"));
            }
            pb
        }
        (None, false) => ProgressBar::new_spinner(),
    };

    let mut file = std::fs::File::create(out)
        .with_context(|| format!("Failed to create {}", out.display()))?;
    let mut offset = 0u64;

    loop {
        let chunk = client
            .versions()
            .stream_chunk(ecu, model, version, chunk_size, offset)
            .await
            .with_context(|| format!("Failed to fetch chunk at offset {}", offset))?;
        if chunk.is_empty() {
            break;
        }

        file.write_all(&chunk)
            .with_context(|| format!("Failed to write {}", out.display()))?;
        offset += chunk.len() as u64;
        pb.set_position(offset);

        if (chunk.len() as u64) < chunk_size {
            break;
        }
    }

    pb.finish_and_clear();
    Ok(offset)
}

/// Upload one firmware file outside of a draft
///
/// `source_car_type` is always part of the compatible set. Returns `false`
/// without contacting the backend when the upload is rejected locally.
#[allow(clippy::too_many_arguments)]
pub async fn upload(
    client: &OtaClient,
    ecu: &str,
    model: &str,
    version: &str,
    file: &Path,
    source_car_type: Option<&str>,
    compatible_car_types: Vec<String>,
    ctx: &OutputContext,
) -> Result<bool> {
    let hex = LocalHexFile::from_path(file)
        .with_context(|| format!("Failed to read firmware file: {}", file.display()))?;

    let request = match UploadRequest::standalone(
        ecu,
        model,
        version,
        hex,
        source_car_type,
        &compatible_car_types,
    ) {
        Ok(request) => request,
        Err(DraftError::NoCompatibleCarType) => {
            ctx.warn(&format!(
                "{}; `car-types by-ecu {}` lists car types using this ECU",
                DraftError::NoCompatibleCarType,
                ecu
            ));
            return Ok(false);
        }
        Err(e) => {
            ctx.warn(&e.to_string());
            return Ok(false);
        }
    };

    ctx.info(&format!(
        "Firmware {} ({}) for {}",
        request.file.file_name,
        format_bytes(request.file.size),
        request.compatible_car_types.join(", ")
    ));

    let pb = spinner("Uploading...", ctx.quiet);
    let uploaded = client.versions().upload(request).await;
    pb.finish_and_clear();
    let uploaded = uploaded.context("Failed to upload firmware")?;

    ctx.success(
        uploaded
            .message
            .as_deref()
            .unwrap_or("Firmware uploaded successfully"),
    );
    ctx.print_kv(&[
        ("Version", uploaded.version.version_number.clone()),
        ("File", uploaded.version.hex_file_path.clone()),
        (
            "Compatible",
            uploaded.version.compatible_car_types.join(", "),
        ),
    ]);
    Ok(true)
}
