use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};
use reqwest::Url;

use crate::{
    balancer::DEFAULT_ANOMALY_THRESHOLD_PERCENT,
    series::{Granularity, TimeRange},
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Poll the backend and re-render the dashboard on a fixed cadence.
    Watch(WatchArgs),

    /// Fetch once and render a single report.
    Report(ReportArgs),

    /// Reconcile an energy-flow tree read from file: estimate missing
    /// readings, balance parents with children, flag anomalies.
    Reconcile(ReconcileArgs),
}

#[derive(Parser)]
pub struct BackendArgs {
    /// Backend service base URL. For example: `http://localhost:3000/api`.
    #[clap(long = "backend-base-url", env = "BACKEND_BASE_URL")]
    pub base_url: Url,

    /// Request timeout in seconds.
    #[clap(long = "backend-timeout-secs", default_value = "10", env = "BACKEND_TIMEOUT_SECS")]
    pub timeout_secs: u64,

    /// Restrict to a single machine.
    #[clap(long = "machine-id", env = "MACHINE_ID")]
    pub machine_id: Option<String>,
}

impl BackendArgs {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Parser)]
pub struct ReportArgs {
    #[clap(flatten)]
    pub backend: BackendArgs,

    /// Display window.
    #[clap(long = "time-range", value_enum, default_value = "day", env = "TIME_RANGE")]
    pub time_range: TimeRange,

    /// Aggregation bucket size.
    #[clap(long, value_enum, default_value = "hourly", env = "GRANULARITY")]
    pub granularity: Granularity,
}

#[derive(Parser)]
pub struct WatchArgs {
    #[clap(flatten)]
    pub report: ReportArgs,

    /// Polling interval in seconds.
    #[clap(long = "poll-interval-secs", default_value = "30", env = "POLL_INTERVAL_SECS")]
    pub poll_interval_secs: u64,
}

#[derive(Parser)]
pub struct ReconcileArgs {
    /// JSON file with the current flow-tree nodes.
    #[clap(long, env = "NODES_PATH")]
    pub nodes: PathBuf,

    /// JSON file with historical node snapshots (an array of node arrays).
    #[clap(long, env = "HISTORY_PATH")]
    pub history: Option<PathBuf>,

    /// Anomaly threshold in percent of the historical mean.
    #[clap(
        long = "anomaly-threshold-percent",
        default_value_t = DEFAULT_ANOMALY_THRESHOLD_PERCENT,
        env = "ANOMALY_THRESHOLD_PERCENT"
    )]
    pub anomaly_threshold_percent: f64,
}
