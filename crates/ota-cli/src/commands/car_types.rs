//! Car type commands - catalog list, detail, statistics and deletion

use anyhow::{Context, Result};
use ota_client::OtaClient;
use ota_core::{CarType, CarTypePatch};

use super::confirm;
use crate::filter::ListFilter;
use crate::output::{CarTypeRow, EcuRow, OutputContext, OutputFormat, StatRow};

/// List all car types
pub async fn list(client: &OtaClient, search: Option<&str>, ctx: &OutputContext) -> Result<()> {
    let car_types = client
        .car_types()
        .list()
        .await
        .context("Failed to fetch car types")?;
    let car_types = ListFilter::search(search).apply(car_types);

    let rows: Vec<CarTypeRow> = car_types
        .into_iter()
        .map(|c| CarTypeRow {
            car_ids: c.car_ids_count.max(c.car_ids.len()),
            name: c.name,
            model_number: c.model_number,
            manufactured_count: c.manufactured_count,
            ecus: c.ecus_count,
        })
        .collect();

    ctx.print(&rows);
    Ok(())
}

/// Show one car type with its ECUs
pub async fn show(client: &OtaClient, name: &str, ctx: &OutputContext) -> Result<()> {
    let car_type = client
        .car_types()
        .get(name)
        .await
        .with_context(|| format!("Failed to fetch car type {}", name))?;

    print_car_type(&car_type, ctx);
    Ok(())
}

/// Look up a car type by model number
pub async fn show_by_model(client: &OtaClient, model: &str, ctx: &OutputContext) -> Result<()> {
    let car_type = client
        .car_types()
        .get_by_model(model)
        .await
        .with_context(|| format!("Failed to fetch car type with model {}", model))?;

    print_car_type(&car_type, ctx);
    Ok(())
}

fn print_car_type(car_type: &CarType, ctx: &OutputContext) {
    if ctx.format == OutputFormat::Json {
        println!(
            "{}",
            serde_json::to_string_pretty(car_type).unwrap_or_else(|_| "{}".to_string())
        );
        return;
    }

    ctx.print_kv(&[
        ("Name", car_type.name.clone()),
        ("Model", car_type.model_number.clone()),
        ("Manufactured", car_type.manufactured_count.to_string()),
        ("Car IDs", car_type.car_ids.join(", ")),
    ]);

    let rows: Vec<EcuRow> = car_type
        .ecus
        .iter()
        .enumerate()
        .map(|(i, ecu)| EcuRow {
            index: i.to_string(),
            name: ecu.name.clone(),
            model_number: ecu.model_number.clone(),
            versions: ecu
                .versions
                .iter()
                .map(|v| v.version_number.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect();
    ctx.info("");
    ctx.print(&rows);
}

/// Aggregate numbers over all car types
pub async fn stats(client: &OtaClient, ctx: &OutputContext) -> Result<()> {
    let stats = client
        .car_types()
        .statistics()
        .await
        .context("Failed to fetch statistics")?;

    let rows: Vec<StatRow> = stats
        .car_type_details
        .iter()
        .map(|s| StatRow {
            name: s.name.clone(),
            model_number: s.model_number.clone(),
            manufactured_count: s.manufactured_count,
            car_ids: s.car_ids_count,
            ecus: s.ecu_count,
        })
        .collect();

    if ctx.format == OutputFormat::Json {
        ctx.print_json_or(&stats, &rows);
        return Ok(());
    }

    ctx.print_kv(&[
        ("Car types", stats.total_car_types.to_string()),
        ("Manufactured", stats.total_manufactured.to_string()),
    ]);
    ctx.info("");
    ctx.print(&rows);
    Ok(())
}

/// Car types that include an ECU with the given name
pub async fn by_ecu(
    client: &OtaClient,
    ecu_name: &str,
    search: Option<&str>,
    ctx: &OutputContext,
) -> Result<()> {
    let car_types = client
        .car_types()
        .by_ecu(ecu_name)
        .await
        .with_context(|| format!("Failed to fetch car types using ECU {}", ecu_name))?;
    let car_types = ListFilter::search(search).apply(car_types);

    let rows: Vec<CarTypeRow> = car_types
        .into_iter()
        .map(|c| CarTypeRow {
            name: c.name,
            model_number: c.model_number,
            manufactured_count: c.manufactured_count,
            car_ids: c.car_ids_count,
            ecus: c.ecus.len(),
        })
        .collect();

    ctx.print(&rows);
    Ok(())
}

/// Change scalar fields without replacing the ECU list
pub async fn patch(
    client: &OtaClient,
    name: &str,
    patch: CarTypePatch,
    ctx: &OutputContext,
) -> Result<()> {
    if patch.is_empty() {
        ctx.warn("Nothing to update");
        return Ok(());
    }

    let response = client
        .car_types()
        .patch(name, &patch)
        .await
        .with_context(|| format!("Failed to update car type {}", name))?;

    ctx.success(
        response
            .message
            .as_deref()
            .unwrap_or("Car type updated successfully"),
    );
    Ok(())
}

/// Delete a car type, then show the remaining list
///
/// Versions and ECUs owned by other car types are left alone; the backend
/// decides what the deletion removes.
pub async fn delete(client: &OtaClient, name: &str, yes: bool, ctx: &OutputContext) -> Result<()> {
    if !yes && !confirm(&format!("Delete car type {}?", name))? {
        ctx.info("Aborted");
        return Ok(());
    }

    let response = client
        .car_types()
        .delete(name)
        .await
        .with_context(|| format!("Failed to delete car type {}", name))?;

    ctx.success(
        response
            .message
            .as_deref()
            .unwrap_or("Car type deleted successfully"),
    );

    list(client, None, ctx).await
}
