//! Request commands - service and download tracking

use anyhow::{Context, Result};
use clap::ValueEnum;
use ota_client::{DownloadMonitor, MonitorUpdate, OtaClient};
use ota_core::{DownloadRequest, RequestStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::filter::ListFilter;
use crate::output::{DownloadRow, OutputContext, OutputFormat, ServiceRequestRow};

/// Request family
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RequestKind {
    Service,
    Download,
}

/// Every request recorded for one vehicle
pub async fn for_car(
    client: &OtaClient,
    car_id: &str,
    filter: ListFilter<'_>,
    ctx: &OutputContext,
) -> Result<()> {
    let mut requests = client
        .requests()
        .for_car(car_id)
        .await
        .with_context(|| format!("Failed to fetch requests of car {}", car_id))?;
    requests.service_requests = filter.apply(requests.service_requests);
    requests.download_requests = filter.apply(requests.download_requests);

    if ctx.format == OutputFormat::Json {
        println!(
            "{}",
            serde_json::to_string_pretty(&requests).unwrap_or_else(|_| "{}".to_string())
        );
        return Ok(());
    }

    ctx.info("Service requests:");
    let service: Vec<ServiceRequestRow> = requests
        .service_requests
        .iter()
        .map(ServiceRequestRow::from)
        .collect();
    ctx.print(&service);

    ctx.info("\nDownload requests:");
    print_downloads(&requests.download_requests, ctx);
    Ok(())
}

/// Requests of one family in the given status
pub async fn by_status(
    client: &OtaClient,
    kind: RequestKind,
    status: RequestStatus,
    search: Option<&str>,
    ctx: &OutputContext,
) -> Result<()> {
    let filter = ListFilter::search(search);
    match kind {
        RequestKind::Service => {
            let requests = client
                .requests()
                .service_by_status(status)
                .await
                .with_context(|| format!("Failed to fetch {} service requests", status))?;
            let requests = filter.apply(requests);
            let rows: Vec<ServiceRequestRow> =
                requests.iter().map(ServiceRequestRow::from).collect();
            ctx.print(&rows);
        }
        RequestKind::Download => {
            let requests = client
                .requests()
                .download_by_status(status)
                .await
                .with_context(|| format!("Failed to fetch {} download requests", status))?;
            let requests = filter.apply(requests);
            print_downloads(&requests, ctx);
        }
    }
    Ok(())
}

/// Downloads currently in progress
pub async fn active(client: &OtaClient, filter: ListFilter<'_>, ctx: &OutputContext) -> Result<()> {
    let downloads = client
        .requests()
        .active_downloads()
        .await
        .context("Failed to fetch active downloads")?;
    let downloads = filter.apply(downloads);
    print_downloads(&downloads, ctx);
    Ok(())
}

/// Keep the active downloads view fresh until Ctrl+C
pub async fn watch(client: &OtaClient, interval: Option<u64>, ctx: &OutputContext) -> Result<()> {
    let mut monitor = match interval {
        Some(ms) => DownloadMonitor::new(client.clone(), Duration::from_millis(ms)),
        None => client.download_monitor(),
    };

    ctx.info(&format!(
        "Refreshing active downloads every {:?}",
        monitor.interval()
    ));
    ctx.info("Press Ctrl+C to stop");

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let mut updates = monitor.subscribe();
    monitor.set_auto_refresh(true);

    while running.load(Ordering::SeqCst) {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let update = updates.borrow_and_update().clone();
                match update {
                    MonitorUpdate::Idle => {}
                    MonitorUpdate::Downloads(downloads) => {
                        if ctx.format == OutputFormat::Table && !ctx.quiet {
                            println!();
                        }
                        print_downloads(&downloads, ctx);
                    }
                    MonitorUpdate::Failed(message) => {
                        ctx.error(&format!("Failed to refresh: {}", message));
                    }
                }
            }
            _ = tokio::time::sleep(Duration::from_millis(100)) => {}
        }
    }

    monitor.set_auto_refresh(false);
    ctx.info("\nStopped");
    Ok(())
}

/// Report transfer progress or a state change for a vehicle's download
pub async fn update_status(
    client: &OtaClient,
    car_id: &str,
    status: RequestStatus,
    transferred_size: Option<u64>,
    ctx: &OutputContext,
) -> Result<()> {
    let response = client
        .requests()
        .update_download_status(car_id, status, transferred_size)
        .await
        .with_context(|| format!("Failed to update download status of car {}", car_id))?;

    ctx.success(
        response
            .message
            .as_deref()
            .unwrap_or("Download status updated"),
    );
    Ok(())
}

fn print_downloads(downloads: &[DownloadRequest], ctx: &OutputContext) {
    if ctx.format == OutputFormat::Json {
        println!(
            "{}",
            serde_json::to_string_pretty(downloads).unwrap_or_else(|_| "[]".to_string())
        );
        return;
    }
    let rows: Vec<DownloadRow> = downloads.iter().map(DownloadRow::from).collect();
    ctx.print(&rows);
}
