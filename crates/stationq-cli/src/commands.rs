//! Command handlers for the stationq CLI

use std::sync::Arc;

use tracing::{info, warn};

use stationq_channel::ChannelCredentials;
use stationq_core::{
    ConnectionStatus, EntryId, QueueApi, QueueEntry, StationId, StationSummary, StationqError,
};
use stationq_runtime::{HttpQueueApi, QueueSnapshot, Reconciler, StationSession};

use crate::cli::Commands;
use crate::config::AppConfig;
use crate::error::{CliError, Result};

/// Command dispatcher for handling CLI commands
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Execute a CLI command
    pub async fn execute(command: Commands, config: AppConfig) -> Result<()> {
        let api: Arc<dyn QueueApi> =
            Arc::new(HttpQueueApi::new(&config.api_config(), config.token())?);

        match command {
            Commands::Watch { station } => Self::handle_watch(api, &config, station.into()).await,
            Commands::Queue { station, json } => {
                let reconciler = Self::selected(api, station.into()).await?;
                let snapshot = reconciler.snapshot();
                if json {
                    println!("{}", serde_json::to_string_pretty(&snapshot.entries)?);
                } else {
                    print_queue(&snapshot);
                }
                Ok(())
            }
            Commands::Summaries { json } => {
                let summaries = api.fetch_summaries().await.map_err(StationqError::from)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&summaries)?);
                } else {
                    print_summaries(&summaries);
                }
                Ok(())
            }
            Commands::Move { station, from, to } => {
                let from = queue_index(from)?;
                let to = queue_index(to)?;
                let reconciler = Self::selected(api, station.into()).await?;
                reconciler.reorder(from, to).await?;
                print_queue(&reconciler.snapshot());
                Ok(())
            }
            Commands::Delete { station, entry } => {
                let reconciler = Self::selected(api, station.into()).await?;
                reconciler.delete(&EntryId::from(entry.as_str())).await?;
                println!("Removed {entry}");
                print_queue(&reconciler.snapshot());
                Ok(())
            }
            Commands::Add {
                station,
                vehicle,
                name,
            } => {
                let name = name.unwrap_or_else(|| station.clone());
                let reconciler = Self::selected(api, station.into()).await?;
                let entry = reconciler.add_vehicle(&vehicle, &name).await?;
                println!("Queued {} at position {}", label(&entry), entry.queue_position);
                print_queue(&reconciler.snapshot());
                Ok(())
            }
        }
    }

    /// Follow a station until Ctrl+C
    async fn handle_watch(
        api: Arc<dyn QueueApi>,
        config: &AppConfig,
        station: StationId,
    ) -> Result<()> {
        let credentials = match config.token() {
            Some(token) => ChannelCredentials::bearer(token),
            None => ChannelCredentials::anonymous(),
        };
        let mut session = StationSession::new(api, config.channel_config(), credentials);
        session.start(station.clone()).await?;

        let mut snapshots = session.reconciler().subscribe();
        let mut status = session.subscribe_status();
        let mut summaries = session.reconciler().subscribe_summaries();
        info!("Watching {station}... Press Ctrl+C to stop");
        print_queue(&snapshots.borrow_and_update());

        loop {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    if let Err(e) = signal {
                        warn!("Failed to listen for Ctrl+C: {}", e);
                    }
                    break;
                }
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = snapshots.borrow_and_update().clone();
                    if !snapshot.reordering {
                        print_queue(&snapshot);
                    }
                }
                changed = summaries.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = summaries.borrow_and_update().clone();
                    print_summaries(&current);
                }
                changed = status.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = *status.borrow_and_update();
                    report_status(&current);
                }
            }
        }

        session.shutdown().await;
        Ok(())
    }

    async fn selected(api: Arc<dyn QueueApi>, station: StationId) -> Result<Reconciler> {
        let reconciler = Reconciler::new(api);
        reconciler.select_station(station).await?;
        Ok(reconciler)
    }
}

/// Convert a 1-based queue position to an index
fn queue_index(position: usize) -> Result<usize> {
    position
        .checked_sub(1)
        .ok_or_else(|| CliError::InvalidArgument("queue positions start at 1".to_string()))
}

/// Plate when known, entry id otherwise
fn label(entry: &QueueEntry) -> &str {
    if entry.license_plate.is_empty() {
        entry.id.as_str()
    } else {
        &entry.license_plate
    }
}

fn print_queue(snapshot: &QueueSnapshot) {
    let Some(station) = &snapshot.station else {
        println!("No station selected");
        return;
    };
    println!("Queue for {} ({} vehicles)", station, snapshot.entries.len());
    for entry in &snapshot.entries {
        println!(
            "  {:>3}. {:<16} {:>2}/{:<2} seats  {:<10} {}",
            entry.queue_position,
            label(entry),
            entry.available_seats,
            entry.total_seats,
            entry.status,
            entry.id
        );
    }
}

fn print_summaries(summaries: &[StationSummary]) {
    if summaries.is_empty() {
        println!("No stations");
        return;
    }
    for summary in summaries {
        println!(
            "  {:<20} {:>3} vehicles  {:>4}/{:<4} seats  {:.2}",
            summary.destination_name,
            summary.total_vehicles,
            summary.available_seats,
            summary.total_seats,
            summary.base_price
        );
    }
}

fn report_status(status: &ConnectionStatus) {
    if status.gave_up {
        warn!("Push connection gave up reconnecting");
    } else if status.connected {
        info!("Connected (latency {} ms)", status.latency_ms);
    } else {
        warn!("Disconnected, reconnecting");
    }
}
