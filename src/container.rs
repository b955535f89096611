//! Observed-container data model mapped from the bollard API types.

use std::collections::HashMap;

use bollard::models::{ContainerInspectResponse, ContainerSummary, PortMap, PortSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state as reported by the Docker daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Running,
    Exited,
    Paused,
    Restarting,
    Dead,
    Created,
    Removing,
}

impl ContainerState {
    /// The daemon reports state as free text; anything unrecognized is
    /// treated as exited.
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "running" => Self::Running,
            "paused" => Self::Paused,
            "restarting" => Self::Restarting,
            "dead" => Self::Dead,
            "created" => Self::Created,
            "removing" => Self::Removing,
            _ => Self::Exited,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerInfo {
    /// 12-character short id.
    pub id: String,
    /// Container name with the leading slash stripped.
    pub name: String,
    pub image: String,
    pub state: ContainerState,
    pub status: String,
    pub created: String,
    /// "port/proto" -> bound host port, if published.
    pub ports: HashMap<String, Option<String>>,
    pub labels: HashMap<String, String>,
}

impl ContainerInfo {
    pub fn from_summary(summary: ContainerSummary) -> Self {
        let raw_state = summary
            .state
            .as_ref()
            .map(|s| s.to_string())
            .unwrap_or_default();
        Self {
            id: short_id(summary.id.as_deref().unwrap_or_default()),
            name: summary
                .names
                .as_deref()
                .and_then(|names| names.first())
                .map(|name| name.trim_start_matches('/').to_string())
                .unwrap_or_default(),
            image: summary.image.unwrap_or_default(),
            state: ContainerState::parse(&raw_state),
            status: summary.status.unwrap_or_default(),
            created: summary
                .created
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
                .map(|created| created.to_rfc3339())
                .unwrap_or_default(),
            ports: ports_from_list(summary.ports.unwrap_or_default()),
            labels: summary.labels.unwrap_or_default(),
        }
    }
}

/// Inspect result: the summary shape plus the fields the diagnosis engine
/// needs (restart count, exit code, start time).
#[derive(Debug, Clone)]
pub struct ContainerDetail {
    pub info: ContainerInfo,
    pub restart_count: u64,
    /// Only meaningful for containers that are not running.
    pub exit_code: Option<i64>,
    pub started_at: Option<String>,
}

impl ContainerDetail {
    pub fn from_inspect(inspect: ContainerInspectResponse) -> Self {
        let state = inspect.state.unwrap_or_default();
        let running = state.running.unwrap_or(false);
        let raw_state = state.status.as_ref().map(|s| s.to_string()).unwrap_or_default();
        let config = inspect.config.unwrap_or_default();
        let info = ContainerInfo {
            id: short_id(inspect.id.as_deref().unwrap_or_default()),
            name: inspect
                .name
                .as_deref()
                .unwrap_or_default()
                .trim_start_matches('/')
                .to_string(),
            image: config.image.unwrap_or_default(),
            state: ContainerState::parse(&raw_state),
            status: raw_state,
            created: inspect.created.unwrap_or_default(),
            ports: inspect
                .network_settings
                .and_then(|settings| settings.ports)
                .map(ports_from_map)
                .unwrap_or_default(),
            labels: config.labels.unwrap_or_default(),
        };
        Self {
            info,
            restart_count: inspect.restart_count.unwrap_or(0).max(0) as u64,
            exit_code: if running { None } else { state.exit_code },
            started_at: if running { state.started_at } else { None },
        }
    }
}

fn short_id(id: &str) -> String {
    id.chars().take(12).collect()
}

fn ports_from_list(ports: Vec<PortSummary>) -> HashMap<String, Option<String>> {
    ports
        .into_iter()
        .map(|port| {
            let proto = port
                .typ
                .map(|t| t.to_string())
                .unwrap_or_else(|| "tcp".to_string());
            let key = format!("{}/{proto}", port.private_port);
            (key, port.public_port.map(|p| p.to_string()))
        })
        .collect()
}

fn ports_from_map(ports: PortMap) -> HashMap<String, Option<String>> {
    ports
        .into_iter()
        .map(|(key, bindings)| {
            let host_port = bindings
                .unwrap_or_default()
                .into_iter()
                .next()
                .and_then(|binding| binding.host_port);
            (key, host_port)
        })
        .collect()
}

/// Renders elapsed time since an RFC3339 start as "1d 2h 3m".
pub fn format_uptime(started_at: &str, now: DateTime<Utc>) -> Option<String> {
    let started = DateTime::parse_from_rfc3339(started_at).ok()?;
    let elapsed = now.signed_duration_since(started);
    if elapsed.num_seconds() < 0 {
        return None;
    }
    let days = elapsed.num_days();
    let hours = elapsed.num_hours() % 24;
    let minutes = elapsed.num_minutes() % 60;
    if days > 0 {
        Some(format!("{days}d {hours}h {minutes}m"))
    } else if hours > 0 {
        Some(format!("{hours}h {minutes}m"))
    } else {
        Some(format!("{minutes}m"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_states() {
        assert_eq!(ContainerState::parse("running"), ContainerState::Running);
        assert_eq!(ContainerState::parse("Running"), ContainerState::Running);
        assert_eq!(ContainerState::parse("paused"), ContainerState::Paused);
        assert_eq!(ContainerState::parse("created"), ContainerState::Created);
    }

    #[test]
    fn unknown_state_falls_back_to_exited() {
        assert_eq!(ContainerState::parse("teleporting"), ContainerState::Exited);
        assert_eq!(ContainerState::parse(""), ContainerState::Exited);
    }

    #[test]
    fn summary_mapping_strips_name_slash_and_shortens_id() {
        let summary = ContainerSummary {
            id: Some("0123456789abcdef0123456789abcdef".to_string()),
            names: Some(vec!["/web-1".to_string()]),
            image: Some("nginx:1.25".to_string()),
            status: Some("Up 2 hours".to_string()),
            created: Some(1_700_000_000),
            ..Default::default()
        };
        let info = ContainerInfo::from_summary(summary);
        assert_eq!(info.id, "0123456789ab");
        assert_eq!(info.name, "web-1");
        assert_eq!(info.image, "nginx:1.25");
        assert!(info.created.starts_with("2023-11-14T"));
    }

    #[test]
    fn uptime_formatting() {
        let now = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            format_uptime("2024-05-01T11:45:00Z", now).as_deref(),
            Some("15m")
        );
        assert_eq!(
            format_uptime("2024-05-01T08:30:00Z", now).as_deref(),
            Some("3h 30m")
        );
        assert_eq!(
            format_uptime("2024-04-29T10:00:00Z", now).as_deref(),
            Some("2d 2h 0m")
        );
        assert_eq!(format_uptime("not a timestamp", now), None);
        // A start time in the future renders nothing.
        assert_eq!(format_uptime("2024-05-01T12:30:00Z", now), None);
    }
}
