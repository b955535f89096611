//! Caller-supplied presentation templates.
//!
//! The diagnosis and drift engines work over structured enums and evidence
//! only; every user-facing string they emit is rendered through this
//! catalog. The default catalog is English, and a YAML file with the same
//! shape can be injected to swap the locale without touching the engines.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageCatalog {
    pub high_cpu: String,
    pub high_memory: String,
    pub restart_loop: String,
    pub exit_error: String,
    pub oom_killed: String,
    pub log_error: String,
    pub healthy: String,

    pub cause_memory_limit: String,
    pub cause_memory_limit_evidence: Vec<String>,
    pub cause_crash_loop: String,
    pub cause_crash_loop_evidence: Vec<String>,
    pub cause_cpu_bound: String,
    pub cause_cpu_bound_evidence: Vec<String>,

    pub suggest_increase_memory: String,
    pub suggest_increase_memory_rationale: String,
    pub suggest_check_logs: String,
    pub suggest_check_logs_rationale: String,
    pub suggest_optimize_resources: String,
    pub suggest_optimize_resources_rationale: String,

    pub heading_symptoms: String,
    pub heading_causes: String,
    pub heading_suggestions: String,

    pub drift_not_running: String,
    pub drift_replica_mismatch: String,
    pub drift_image_mismatch: String,
    pub drift_extra_container: String,
    pub drift_synced: String,
    pub drift_summary: String,
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self {
            high_cpu: "CPU usage is high: {percent}%".to_string(),
            high_memory: "Memory usage is high: {percent}%".to_string(),
            restart_loop: "Container restarted {count} times".to_string(),
            exit_error: "Container exited with non-zero code {code}".to_string(),
            oom_killed: "Container was killed by the kernel OOM killer".to_string(),
            log_error: "Found {count} error entries in recent logs".to_string(),
            healthy: "Container appears healthy".to_string(),

            cause_memory_limit: "Container was terminated after exceeding its memory limit"
                .to_string(),
            cause_memory_limit_evidence: vec![
                "OOM kill detected in logs".to_string(),
                "High memory usage".to_string(),
            ],
            cause_crash_loop: "Application is crashing repeatedly".to_string(),
            cause_crash_loop_evidence: vec![
                "Abnormal exit detected".to_string(),
                "Repeated restarts".to_string(),
            ],
            cause_cpu_bound: "A CPU-intensive task or an infinite loop may be running".to_string(),
            cause_cpu_bound_evidence: vec!["High CPU usage".to_string()],

            suggest_increase_memory: "Increase the container memory limit".to_string(),
            suggest_increase_memory_rationale:
                "The container keeps exceeding its current memory limit".to_string(),
            suggest_check_logs: "Inspect container logs for the root cause".to_string(),
            suggest_check_logs_rationale:
                "The restart loop points at a recurring failure that needs identifying".to_string(),
            suggest_optimize_resources: "Profile and optimize resource usage".to_string(),
            suggest_optimize_resources_rationale:
                "Lower resource usage would improve stability and performance".to_string(),

            heading_symptoms: "Symptoms".to_string(),
            heading_causes: "Likely causes".to_string(),
            heading_suggestions: "Suggested actions".to_string(),

            drift_not_running: "Service {service} has no running container".to_string(),
            drift_replica_mismatch: "Service {service} runs {actual} of {expected} replicas"
                .to_string(),
            drift_image_mismatch: "Service {service} runs a different image than declared"
                .to_string(),
            drift_extra_container: "Container {container} is not declared in the compose file"
                .to_string(),
            drift_synced: "All services match the compose file".to_string(),
            drift_summary: "Drift detected: {details}".to_string(),
        }
    }
}

/// Substitutes `{name}` placeholders. Unknown placeholders are left intact
/// so a broken locale file degrades visibly instead of panicking.
pub fn render(template: &str, args: &[(&str, String)]) -> String {
    let mut out = template.to_string();
    for (key, value) in args {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}
