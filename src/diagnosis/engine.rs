//! The diagnosis engine: symptoms, cause inference, suggestions.

use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;
use serde_json::json;

use super::causes::{CAUSE_RULES, CauseKind, Guard};
use super::thresholds::Thresholds;
use super::types::{
    DiagnosisReport, DiagnosisResult, LikelyCause, Severity, Suggestion, SuggestionUrgency,
    Symptom, SymptomType,
};
use crate::container::{ContainerDetail, format_uptime};
use crate::logs::LogEntry;
use crate::messages::{MessageCatalog, render};
use crate::stats::ContainerStats;

const MAX_SAMPLE_ERRORS: usize = 3;

fn oom_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)oomkilled|out of memory").expect("oom pattern is valid"))
}

fn error_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)error|exception|fatal|panic|fail").expect("error pattern is valid")
    })
}

pub struct DiagnosisInput<'a> {
    /// None when the container is not running; CPU and memory checks are
    /// then skipped entirely rather than treated as healthy.
    pub stats: Option<&'a ContainerStats>,
    pub logs: &'a [LogEntry],
    pub restart_count: u64,
    pub exit_code: Option<i64>,
}

pub struct DiagnosisEngine {
    thresholds: Thresholds,
    catalog: MessageCatalog,
}

impl DiagnosisEngine {
    pub fn new(thresholds: Thresholds, catalog: MessageCatalog) -> Self {
        Self {
            thresholds,
            catalog,
        }
    }

    /// Pure over its input: identical inputs yield identical results modulo
    /// the `detected_at` timestamps.
    pub fn diagnose(&self, input: &DiagnosisInput<'_>) -> DiagnosisResult {
        let detected_at = Utc::now().to_rfc3339();
        let mut symptoms = Vec::new();

        if let Some(stats) = input.stats {
            if let Some(symptom) = self.check_cpu(stats, &detected_at) {
                symptoms.push(symptom);
            }
            if let Some(symptom) = self.check_memory(stats, &detected_at) {
                symptoms.push(symptom);
            }
        }
        if let Some(symptom) = self.check_restarts(input.restart_count, &detected_at) {
            symptoms.push(symptom);
        }
        if let Some(code) = input.exit_code
            && code != 0
        {
            symptoms.push(self.exit_error_symptom(code, &detected_at));
        }
        symptoms.extend(self.check_logs(input.logs, &detected_at));

        let likely_causes = self.analyze_causes(&symptoms);
        let suggestions = self.generate_suggestions(&symptoms);

        DiagnosisResult {
            symptoms,
            likely_causes,
            suggestions,
        }
    }

    fn check_cpu(&self, stats: &ContainerStats, detected_at: &str) -> Option<Symptom> {
        let (severity, threshold) = self.thresholds.cpu.evaluate(stats.cpu_percent)?;
        Some(Symptom {
            symptom_type: SymptomType::HighCpu,
            severity,
            description: render(
                &self.catalog.high_cpu,
                &[("percent", format!("{:.1}", stats.cpu_percent))],
            ),
            evidence: json!({ "cpuPercent": stats.cpu_percent, "threshold": threshold }),
            detected_at: detected_at.to_string(),
        })
    }

    fn check_memory(&self, stats: &ContainerStats, detected_at: &str) -> Option<Symptom> {
        let (severity, threshold) = self.thresholds.memory.evaluate(stats.memory_percent)?;
        Some(Symptom {
            symptom_type: SymptomType::HighMemory,
            severity,
            description: render(
                &self.catalog.high_memory,
                &[("percent", format!("{:.1}", stats.memory_percent))],
            ),
            evidence: json!({ "memoryPercent": stats.memory_percent, "threshold": threshold }),
            detected_at: detected_at.to_string(),
        })
    }

    fn check_restarts(&self, restart_count: u64, detected_at: &str) -> Option<Symptom> {
        // Inclusive comparison: a restart count is already a completed
        // count, not a sampled rate.
        let (severity, threshold) = self
            .thresholds
            .restarts
            .evaluate_inclusive(restart_count as f64)?;
        Some(Symptom {
            symptom_type: SymptomType::RestartLoop,
            severity,
            description: render(
                &self.catalog.restart_loop,
                &[("count", restart_count.to_string())],
            ),
            evidence: json!({ "restartCount": restart_count, "threshold": threshold }),
            detected_at: detected_at.to_string(),
        })
    }

    fn exit_error_symptom(&self, code: i64, detected_at: &str) -> Symptom {
        Symptom {
            symptom_type: SymptomType::ExitError,
            severity: Severity::Error,
            description: render(&self.catalog.exit_error, &[("code", code.to_string())]),
            evidence: json!({ "exitCode": code }),
            detected_at: detected_at.to_string(),
        }
    }

    fn check_logs(&self, logs: &[LogEntry], detected_at: &str) -> Vec<Symptom> {
        let mut symptoms = Vec::new();

        let oom_count = logs
            .iter()
            .filter(|entry| oom_pattern().is_match(&entry.message))
            .count();
        if oom_count > 0 {
            symptoms.push(Symptom {
                symptom_type: SymptomType::OomKilled,
                severity: Severity::Critical,
                description: self.catalog.oom_killed.clone(),
                evidence: json!({ "occurrences": oom_count }),
                detected_at: detected_at.to_string(),
            });
        }

        let error_entries: Vec<&LogEntry> = logs
            .iter()
            .filter(|entry| error_pattern().is_match(&entry.message))
            .collect();
        if !error_entries.is_empty() {
            let samples: Vec<&LogEntry> = error_entries
                .iter()
                .take(MAX_SAMPLE_ERRORS)
                .copied()
                .collect();
            symptoms.push(Symptom {
                symptom_type: SymptomType::LogError,
                severity: Severity::Warning,
                description: render(
                    &self.catalog.log_error,
                    &[("count", error_entries.len().to_string())],
                ),
                evidence: json!({
                    "errorCount": error_entries.len(),
                    "sampleErrors": samples,
                }),
                detected_at: detected_at.to_string(),
            });
        }

        symptoms
    }

    fn analyze_causes(&self, symptoms: &[Symptom]) -> Vec<LikelyCause> {
        let present =
            |symptom_type: SymptomType| symptoms.iter().any(|s| s.symptom_type == symptom_type);

        let mut causes = Vec::new();
        for rule in CAUSE_RULES {
            if rule.guard == Guard::OnlyIfNoPriorCause && !causes.is_empty() {
                continue;
            }
            if !rule.requires.iter().all(|required| present(*required)) {
                continue;
            }
            let (description, evidence) = match rule.kind {
                CauseKind::MemoryLimitExceeded => (
                    self.catalog.cause_memory_limit.clone(),
                    self.catalog.cause_memory_limit_evidence.clone(),
                ),
                CauseKind::CrashLoop => (
                    self.catalog.cause_crash_loop.clone(),
                    self.catalog.cause_crash_loop_evidence.clone(),
                ),
                CauseKind::CpuBound => (
                    self.catalog.cause_cpu_bound.clone(),
                    self.catalog.cause_cpu_bound_evidence.clone(),
                ),
            };
            causes.push(LikelyCause {
                description,
                confidence: rule.confidence,
                evidence,
                related_symptoms: rule.requires.to_vec(),
            });
        }
        causes
    }

    fn generate_suggestions(&self, symptoms: &[Symptom]) -> Vec<Suggestion> {
        let present =
            |symptom_type: SymptomType| symptoms.iter().any(|s| s.symptom_type == symptom_type);

        let mut suggestions = Vec::new();
        if present(SymptomType::OomKilled) {
            suggestions.push(Suggestion {
                urgency: SuggestionUrgency::Immediate,
                action: self.catalog.suggest_increase_memory.clone(),
                rationale: self.catalog.suggest_increase_memory_rationale.clone(),
                command: None,
            });
        }
        if present(SymptomType::RestartLoop) {
            suggestions.push(Suggestion {
                urgency: SuggestionUrgency::Immediate,
                action: self.catalog.suggest_check_logs.clone(),
                rationale: self.catalog.suggest_check_logs_rationale.clone(),
                command: None,
            });
        }
        if present(SymptomType::HighCpu) || present(SymptomType::HighMemory) {
            suggestions.push(Suggestion {
                urgency: SuggestionUrgency::ShortTerm,
                action: self.catalog.suggest_optimize_resources.clone(),
                rationale: self.catalog.suggest_optimize_resources_rationale.clone(),
                command: None,
            });
        }
        suggestions
    }

    /// First symptom plus first cause, or the healthy message.
    pub fn summary(&self, result: &DiagnosisResult) -> String {
        let Some(top_symptom) = result.symptoms.first() else {
            return self.catalog.healthy.clone();
        };
        match result.likely_causes.first() {
            Some(top_cause) => format!("{}. {}", top_symptom.description, top_cause.description),
            None => top_symptom.description.clone(),
        }
    }

    /// Numbered symptom/cause/suggestion sections for human readers.
    pub fn detailed_explanation(&self, result: &DiagnosisResult) -> String {
        let mut parts = Vec::new();

        if !result.symptoms.is_empty() {
            parts.push(format!("## {}", self.catalog.heading_symptoms));
            for (i, symptom) in result.symptoms.iter().enumerate() {
                parts.push(format!(
                    "{}. [{}] {}",
                    i + 1,
                    symptom.severity.as_str().to_uppercase(),
                    symptom.description
                ));
            }
        }

        if !result.likely_causes.is_empty() {
            parts.push(format!("\n## {}", self.catalog.heading_causes));
            for (i, cause) in result.likely_causes.iter().enumerate() {
                parts.push(format!(
                    "{}. {} (confidence: {:.0}%)",
                    i + 1,
                    cause.description,
                    cause.confidence * 100.0
                ));
            }
        }

        if !result.suggestions.is_empty() {
            parts.push(format!("\n## {}", self.catalog.heading_suggestions));
            for (i, suggestion) in result.suggestions.iter().enumerate() {
                parts.push(format!(
                    "{}. [{}] {}",
                    i + 1,
                    suggestion.urgency.as_str().to_uppercase(),
                    suggestion.action
                ));
            }
        }

        parts.join("\n")
    }

    pub fn report(&self, detail: &ContainerDetail, result: DiagnosisResult) -> DiagnosisReport {
        let now = Utc::now();
        DiagnosisReport {
            container_id: detail.info.id.clone(),
            container_name: detail.info.name.clone(),
            timestamp: now.to_rfc3339(),
            state: detail.info.state,
            uptime: detail
                .started_at
                .as_deref()
                .and_then(|started| format_uptime(started, now)),
            summary: self.summary(&result),
            detailed_explanation: self.detailed_explanation(&result),
            symptoms: result.symptoms,
            likely_causes: result.likely_causes,
            suggestions: result.suggestions,
        }
    }
}
