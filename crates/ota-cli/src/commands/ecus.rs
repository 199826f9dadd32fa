//! ECU commands - inventory and compatibility lookups

use anyhow::{Context, Result};
use ota_client::OtaClient;

use crate::filter::ListFilter;
use crate::output::{EcuRow, OutputContext, OutputFormat, VersionRow};

/// List every ECU in the catalog
pub async fn list(client: &OtaClient, search: Option<&str>, ctx: &OutputContext) -> Result<()> {
    let ecus = client.ecus().list().await.context("Failed to fetch ECUs")?;
    let ecus = ListFilter::search(search).apply(ecus);

    let rows: Vec<EcuRow> = ecus
        .iter()
        .enumerate()
        .map(|(i, ecu)| EcuRow {
            index: i.to_string(),
            name: ecu.name.clone(),
            model_number: ecu.model_number.clone(),
            versions: ecu.versions.len().to_string(),
        })
        .collect();

    ctx.print_json_or(&ecus, &rows);
    Ok(())
}

/// ECUs installed in one car type
pub async fn for_car_type(
    client: &OtaClient,
    car_type: &str,
    search: Option<&str>,
    ctx: &OutputContext,
) -> Result<()> {
    let ecus = client
        .ecus()
        .for_car_type(car_type)
        .await
        .with_context(|| format!("Failed to fetch ECUs of car type {}", car_type))?;
    let ecus = ListFilter::search(search).apply(ecus);

    let rows: Vec<EcuRow> = ecus
        .into_iter()
        .enumerate()
        .map(|(i, ecu)| EcuRow {
            index: i.to_string(),
            name: ecu.name,
            model_number: ecu.model_number,
            versions: ecu.versions_count.to_string(),
        })
        .collect();

    ctx.print(&rows);
    Ok(())
}

/// One ECU with its firmware history
pub async fn show(client: &OtaClient, name: &str, model: &str, ctx: &OutputContext) -> Result<()> {
    let ecu = client
        .ecus()
        .get(name, model)
        .await
        .with_context(|| format!("Failed to fetch ECU {} ({})", name, model))?;

    if ctx.format == OutputFormat::Json {
        println!(
            "{}",
            serde_json::to_string_pretty(&ecu).unwrap_or_else(|_| "{}".to_string())
        );
        return Ok(());
    }

    ctx.print_kv(&[
        ("Name", ecu.name.clone()),
        ("Model", ecu.model_number.clone()),
    ]);
    ctx.info("");

    let rows: Vec<VersionRow> = ecu
        .versions
        .iter()
        .enumerate()
        .map(|(i, v)| VersionRow {
            index: i.to_string(),
            version_number: v.version_number.clone(),
            compatible_car_types: v.compatible_car_types.join(", "),
            file: v.hex_file_path.clone(),
        })
        .collect();
    ctx.print(&rows);
    Ok(())
}

/// ECUs with firmware compatible with a car type
pub async fn compatible(
    client: &OtaClient,
    car_type: &str,
    search: Option<&str>,
    ctx: &OutputContext,
) -> Result<()> {
    let ecus = client
        .ecus()
        .compatible(car_type)
        .await
        .with_context(|| format!("Failed to fetch ECUs compatible with {}", car_type))?;
    let ecus = ListFilter::search(search).apply(ecus);

    let rows: Vec<EcuRow> = ecus
        .into_iter()
        .enumerate()
        .map(|(i, ecu)| EcuRow {
            index: i.to_string(),
            name: ecu.name,
            model_number: ecu.model_number,
            versions: ecu.compatible_versions.join(", "),
        })
        .collect();

    ctx.print(&rows);
    Ok(())
}
