//! Docker client module using bollard.
//!
//! One shared client, plus the handful of runtime calls the CLI needs.
//! Every failure is folded into the crate error taxonomy here, at the
//! boundary, and propagated unchanged.

use std::collections::HashMap;
use std::sync::OnceLock;

use bollard::Docker;
use bollard::container::LogOutput;
use bollard::models::ContainerStatsResponse;
use bollard::query_parameters::{
    InspectContainerOptions, InspectContainerOptionsBuilder, ListContainersOptions,
    ListContainersOptionsBuilder, LogsOptions, LogsOptionsBuilder, StatsOptions,
    StatsOptionsBuilder,
};
use chrono::Utc;
use futures_util::StreamExt;
use serde::Serialize;

use crate::container::{ContainerDetail, ContainerInfo};
use crate::error::Error;
use crate::logs::{LogEntry, StreamKind, entry_from_frame};

/// Hard cap on the number of log lines fetched per call.
pub const MAX_LOG_TAIL: u32 = 1000;

static DOCKER_CLIENT: OnceLock<Docker> = OnceLock::new();

/// Get a reference to the shared Docker client.
///
/// Lazily initialized on first use; connects with the default method
/// (Unix socket on Linux/macOS, named pipe on Windows).
pub fn get_docker() -> &'static Docker {
    DOCKER_CLIENT.get_or_init(|| {
        Docker::connect_with_local_defaults().expect("Failed to connect to Docker daemon")
    })
}

pub async fn ping() -> bool {
    get_docker().ping().await.is_ok()
}

pub async fn version() -> Option<String> {
    match get_docker().version().await {
        Ok(version) => version.version,
        Err(e) => {
            log::error!("failed to query Docker version: {e}");
            None
        }
    }
}

pub async fn list_containers(
    all: bool,
    filters: &[(String, String)],
) -> Result<Vec<ContainerInfo>, Error> {
    let mut builder = ListContainersOptionsBuilder::new().all(all);
    if !filters.is_empty() {
        builder = builder.filters(&filter_map(filters));
    }
    let options: ListContainersOptions = builder.build();
    let summaries = get_docker()
        .list_containers(Some(options))
        .await
        .map_err(Error::from)?;
    Ok(summaries.into_iter().map(ContainerInfo::from_summary).collect())
}

/// The daemon expects each filter key to carry a list of values; repeated
/// keys on the command line accumulate.
fn filter_map(filters: &[(String, String)]) -> HashMap<String, Vec<String>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for (key, value) in filters {
        map.entry(key.clone()).or_default().push(value.clone());
    }
    map
}

pub async fn inspect_container(container_id: &str) -> Result<ContainerDetail, Error> {
    let options: InspectContainerOptions = InspectContainerOptionsBuilder::new().build();
    let inspect = get_docker()
        .inspect_container(container_id, Some(options))
        .await
        .map_err(Error::from)?;
    Ok(ContainerDetail::from_inspect(inspect))
}

/// One point-in-time stats sample. Docker embeds the previous snapshot in
/// the response, so a single sample is enough for the delta metrics.
pub async fn container_stats(container_id: &str) -> Result<ContainerStatsResponse, Error> {
    let options: StatsOptions = StatsOptionsBuilder::new().stream(false).build();
    let mut stream = get_docker().stats(container_id, Some(options));
    match stream.next().await {
        Some(Ok(raw)) => Ok(raw),
        Some(Err(e)) => Err(e.into()),
        None => Err(Error::Internal(format!(
            "no stats sample returned for container {container_id}"
        ))),
    }
}

/// Optional daemon-side time window, in unix seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogWindow {
    pub since: Option<i64>,
    pub until: Option<i64>,
}

/// Fetches recent log lines, demultiplexed into discrete entries.
///
/// bollard delivers the stream already split into frames; each frame goes
/// through the same payload decoding as the raw-buffer path.
pub async fn container_logs(
    container_id: &str,
    tail: u32,
    timestamps: bool,
    window: LogWindow,
) -> Result<Vec<LogEntry>, Error> {
    let tail = tail.min(MAX_LOG_TAIL);
    let mut builder = LogsOptionsBuilder::new()
        .stdout(true)
        .stderr(true)
        .timestamps(timestamps)
        .tail(&tail.to_string());
    if let Some(since) = window.since {
        builder = builder.since(since as i32);
    }
    if let Some(until) = window.until {
        builder = builder.until(until as i32);
    }
    let options: LogsOptions = builder.build();
    let mut stream = get_docker().logs(container_id, Some(options));

    let mut entries = Vec::new();
    while let Some(frame) = stream.next().await {
        match frame.map_err(Error::from)? {
            LogOutput::StdOut { message } | LogOutput::Console { message } => {
                entries.push(entry_from_frame(StreamKind::Stdout, &message, timestamps));
            }
            LogOutput::StdErr { message } => {
                entries.push(entry_from_frame(StreamKind::Stderr, &message, timestamps));
            }
            LogOutput::StdIn { .. } => {}
        }
    }
    Ok(entries)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    pub status: HealthStatus,
    pub docker_connected: bool,
    pub docker_version: Option<String>,
    pub timestamp: String,
    pub message: String,
}

pub async fn health_check() -> HealthCheck {
    let connected = ping().await;
    let docker_version = if connected { version().await } else { None };
    let (status, message) = match (connected, docker_version.as_deref()) {
        (true, Some(v)) => (HealthStatus::Healthy, format!("Connected to Docker {v}")),
        (true, None) => (
            HealthStatus::Degraded,
            "Connected to Docker but the version query failed".to_string(),
        ),
        (false, _) => (
            HealthStatus::Unhealthy,
            "Cannot reach the Docker daemon. Is it running?".to_string(),
        ),
    };
    HealthCheck {
        status,
        docker_connected: connected,
        docker_version,
        timestamp: Utc::now().to_rfc3339(),
        message,
    }
}
