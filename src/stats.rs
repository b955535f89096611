//! Point-in-time resource metrics derived from Docker's cumulative counters.
//!
//! The daemon embeds the previous sample (`precpu_stats`) in every stats
//! response, so a single response carries both snapshots needed for the
//! delta computation. Absent numeric fields default to zero before any
//! arithmetic happens.

use bollard::models::ContainerStatsResponse;
use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStats {
    pub container_id: String,
    pub container_name: String,
    pub timestamp: String,
    pub cpu_percent: f64,
    pub cpu_count: u32,
    pub memory_usage_bytes: u64,
    pub memory_limit_bytes: u64,
    pub memory_percent: f64,
    pub network_rx_bytes: u64,
    pub network_tx_bytes: u64,
    pub block_read_bytes: u64,
    pub block_write_bytes: u64,
}

impl ContainerStats {
    pub fn from_raw(raw: &ContainerStatsResponse, container_id: &str, container_name: &str) -> Self {
        let cpu = raw.cpu_stats.as_ref();
        let precpu = raw.precpu_stats.as_ref();

        let cpu_total = cpu
            .and_then(|c| c.cpu_usage.as_ref())
            .and_then(|usage| usage.total_usage)
            .unwrap_or(0);
        let precpu_total = precpu
            .and_then(|c| c.cpu_usage.as_ref())
            .and_then(|usage| usage.total_usage)
            .unwrap_or(0);
        let system = cpu.and_then(|c| c.system_cpu_usage).unwrap_or(0);
        let presystem = precpu.and_then(|c| c.system_cpu_usage).unwrap_or(0);
        let cpu_count = cpu.and_then(|c| c.online_cpus).unwrap_or(1);

        let cpu_delta = cpu_total as f64 - precpu_total as f64;
        let system_delta = system as f64 - presystem as f64;
        // Guards clock skew and the missing first sample.
        let cpu_percent = if system_delta > 0.0 {
            cpu_delta / system_delta * cpu_count as f64 * 100.0
        } else {
            0.0
        };

        let memory = raw.memory_stats.as_ref();
        let memory_usage = memory.and_then(|m| m.usage).unwrap_or(0);
        let memory_limit = memory.and_then(|m| m.limit).unwrap_or(0);
        let memory_percent = if memory_limit > 0 {
            memory_usage as f64 / memory_limit as f64 * 100.0
        } else {
            0.0
        };

        let mut network_rx = 0;
        let mut network_tx = 0;
        if let Some(networks) = raw.networks.as_ref() {
            for net in networks.values() {
                network_rx += net.rx_bytes.unwrap_or(0);
                network_tx += net.tx_bytes.unwrap_or(0);
            }
        }

        let mut block_read = 0;
        let mut block_write = 0;
        if let Some(entries) = raw
            .blkio_stats
            .as_ref()
            .and_then(|blkio| blkio.io_service_bytes_recursive.as_ref())
        {
            for entry in entries {
                let op = entry.op.as_deref().unwrap_or_default();
                if op.eq_ignore_ascii_case("read") {
                    block_read += entry.value.unwrap_or(0);
                } else if op.eq_ignore_ascii_case("write") {
                    block_write += entry.value.unwrap_or(0);
                }
            }
        }

        Self {
            container_id: container_id.to_string(),
            container_name: container_name.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            cpu_percent: round2(cpu_percent),
            cpu_count,
            memory_usage_bytes: memory_usage,
            memory_limit_bytes: memory_limit,
            memory_percent: round2(memory_percent),
            network_rx_bytes: network_rx,
            network_tx_bytes: network_tx,
            block_read_bytes: block_read,
            block_write_bytes: block_write,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::{
        ContainerBlkioStatEntry, ContainerBlkioStats, ContainerCpuStats, ContainerCpuUsage,
        ContainerMemoryStats, ContainerNetworkStats,
    };
    use std::collections::HashMap;

    fn cpu_stats(total: u64, system: u64, online_cpus: Option<u32>) -> ContainerCpuStats {
        ContainerCpuStats {
            cpu_usage: Some(ContainerCpuUsage {
                total_usage: Some(total),
                ..Default::default()
            }),
            system_cpu_usage: Some(system),
            online_cpus,
            ..Default::default()
        }
    }

    #[test]
    fn cpu_percent_from_counter_deltas() {
        let raw = ContainerStatsResponse {
            cpu_stats: Some(cpu_stats(400, 2_000, Some(4))),
            precpu_stats: Some(cpu_stats(200, 1_000, None)),
            ..Default::default()
        };
        let stats = ContainerStats::from_raw(&raw, "abc", "web");
        // (200 / 1000) * 4 * 100
        assert_eq!(stats.cpu_percent, 80.0);
        assert_eq!(stats.cpu_count, 4);
    }

    #[test]
    fn cpu_percent_is_zero_without_system_delta() {
        let raw = ContainerStatsResponse {
            cpu_stats: Some(cpu_stats(400, 1_000, Some(2))),
            precpu_stats: Some(cpu_stats(200, 1_000, None)),
            ..Default::default()
        };
        assert_eq!(ContainerStats::from_raw(&raw, "abc", "web").cpu_percent, 0.0);

        // Clock skew: system counter moved backwards.
        let raw = ContainerStatsResponse {
            cpu_stats: Some(cpu_stats(400, 500, Some(2))),
            precpu_stats: Some(cpu_stats(200, 1_000, None)),
            ..Default::default()
        };
        assert_eq!(ContainerStats::from_raw(&raw, "abc", "web").cpu_percent, 0.0);
    }

    #[test]
    fn online_cpus_defaults_to_one() {
        let raw = ContainerStatsResponse {
            cpu_stats: Some(cpu_stats(300, 2_000, None)),
            precpu_stats: Some(cpu_stats(100, 1_000, None)),
            ..Default::default()
        };
        let stats = ContainerStats::from_raw(&raw, "abc", "web");
        assert_eq!(stats.cpu_count, 1);
        assert_eq!(stats.cpu_percent, 20.0);
    }

    #[test]
    fn memory_percent_and_zero_limit_guard() {
        let raw = ContainerStatsResponse {
            memory_stats: Some(ContainerMemoryStats {
                usage: Some(512),
                limit: Some(2048),
                ..Default::default()
            }),
            ..Default::default()
        };
        let stats = ContainerStats::from_raw(&raw, "abc", "web");
        assert_eq!(stats.memory_percent, 25.0);
        assert_eq!(stats.memory_usage_bytes, 512);
        assert_eq!(stats.memory_limit_bytes, 2048);

        let raw = ContainerStatsResponse {
            memory_stats: Some(ContainerMemoryStats {
                usage: Some(512),
                limit: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(ContainerStats::from_raw(&raw, "abc", "web").memory_percent, 0.0);
    }

    #[test]
    fn network_counters_sum_across_interfaces() {
        let mut networks = HashMap::new();
        networks.insert(
            "eth0".to_string(),
            ContainerNetworkStats {
                rx_bytes: Some(100),
                tx_bytes: Some(10),
                ..Default::default()
            },
        );
        networks.insert(
            "eth1".to_string(),
            ContainerNetworkStats {
                rx_bytes: Some(50),
                tx_bytes: None,
                ..Default::default()
            },
        );
        let raw = ContainerStatsResponse {
            networks: Some(networks),
            ..Default::default()
        };
        let stats = ContainerStats::from_raw(&raw, "abc", "web");
        assert_eq!(stats.network_rx_bytes, 150);
        assert_eq!(stats.network_tx_bytes, 10);
    }

    #[test]
    fn block_io_sums_read_and_write_ops_case_insensitively() {
        let entry = |op: &str, value: u64| ContainerBlkioStatEntry {
            op: Some(op.to_string()),
            value: Some(value),
            ..Default::default()
        };
        let raw = ContainerStatsResponse {
            blkio_stats: Some(ContainerBlkioStats {
                io_service_bytes_recursive: Some(vec![
                    entry("Read", 100),
                    entry("read", 50),
                    entry("Write", 30),
                    entry("sync", 999),
                ]),
                ..Default::default()
            }),
            ..Default::default()
        };
        let stats = ContainerStats::from_raw(&raw, "abc", "web");
        assert_eq!(stats.block_read_bytes, 150);
        assert_eq!(stats.block_write_bytes, 30);
    }

    #[test]
    fn empty_response_defaults_to_zeroes() {
        let stats = ContainerStats::from_raw(&ContainerStatsResponse::default(), "abc", "web");
        assert_eq!(stats.cpu_percent, 0.0);
        assert_eq!(stats.memory_percent, 0.0);
        assert_eq!(stats.network_rx_bytes, 0);
        assert_eq!(stats.block_write_bytes, 0);
    }

    #[test]
    fn percentages_round_half_up_to_two_decimals() {
        assert_eq!(round2(33.333_33), 33.33);
        assert_eq!(round2(33.336), 33.34);
        // 0.875 is exactly representable, so this pins the half-up rule.
        assert_eq!(round2(0.875), 0.88);
        assert_eq!(round2(0.004_9), 0.0);
        assert_eq!(round2(99.999), 100.0);
    }
}
