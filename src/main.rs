mod adapter;
mod api;
mod balancer;
mod cli;
mod losses;
mod measurement;
mod prelude;
mod quantity;
mod series;
mod tables;

use std::{fs, time::Duration};

use chrono::Local;
use clap::Parser;
use itertools::Itertools;

use crate::{
    adapter::{adapt_incidents, adapt_metrics},
    api::{Api, MetricsQuery},
    balancer::{MeasurementNode, balance, detect_anomalies, estimate_missing},
    cli::{Args, Command, ReconcileArgs, ReportArgs, WatchArgs},
    losses::calculate_losses,
    prelude::*,
    series::{aggregate, filter_by_time_range},
    tables::{
        build_flow_table, build_incidents_table, build_losses_table, build_measurements_table,
    },
};

#[tokio::main]
async fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    match Args::parse().command {
        Command::Watch(args) => watch(&args).await,
        Command::Report(args) => {
            let api = Api::try_new(args.backend.base_url.clone(), args.backend.timeout())?;
            run_cycle(&api, &args).await
        }
        Command::Reconcile(args) => reconcile(&args),
    }
}

/// Re-run the report cycle on a fixed cadence. A failed cycle degrades to
/// "no data" for that tick and the loop keeps going.
async fn watch(args: &WatchArgs) -> Result {
    let api =
        Api::try_new(args.report.backend.base_url.clone(), args.report.backend.timeout())?;
    let mut interval = tokio::time::interval(Duration::from_secs(args.poll_interval_secs));
    loop {
        interval.tick().await;
        if let Err(error) = run_cycle(&api, &args.report).await {
            warn!("poll cycle failed: {error:#}");
        }
    }
}

async fn run_cycle(api: &Api, args: &ReportArgs) -> Result {
    let query = MetricsQuery {
        machine_id: args.backend.machine_id.clone(),
        from_time: Some(Local::now() - args.time_range.window()),
        ..MetricsQuery::default()
    };
    let rows = api.get_energy_metrics(&query).await?;
    let n_machines = rows.iter().filter_map(|row| row.machine_id.as_deref()).unique().count();
    info!(n_machines, "adapting rows");

    let measurements = filter_by_time_range(&adapt_metrics(&rows), args.time_range);
    let aggregated = aggregate(&measurements, args.granularity);
    println!("{}", build_measurements_table(&aggregated, args.granularity));
    println!("{}", build_losses_table(&calculate_losses(&aggregated)));

    let incidents =
        adapt_incidents(&api.get_energy_incidents(args.backend.machine_id.as_deref()).await?);
    if !incidents.is_empty() {
        println!("{}", build_incidents_table(&incidents));
    }
    Ok(())
}

fn reconcile(args: &ReconcileArgs) -> Result {
    let nodes: Vec<MeasurementNode> = serde_json::from_str(
        &fs::read_to_string(&args.nodes)
            .with_context(|| format!("failed to read {}", args.nodes.display()))?,
    )?;
    let historical: Vec<Vec<MeasurementNode>> = match &args.history {
        Some(path) => serde_json::from_str(
            &fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?,
        )?,
        None => Vec::new(),
    };

    let balanced = balance(&estimate_missing(&nodes, &historical));
    let anomalies = detect_anomalies(&balanced, &historical, args.anomaly_threshold_percent);
    if !anomalies.is_empty() {
        warn!(n_anomalies = anomalies.len(), "readings stray from their historical baseline");
    }
    println!("{}", build_flow_table(&balanced, &anomalies));
    Ok(())
}
