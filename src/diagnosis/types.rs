//! Report shapes produced by the diagnosis engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::container::ContainerState;

/// Totally ordered: info < warning < error < critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymptomType {
    HighCpu,
    HighMemory,
    OomKilled,
    RestartLoop,
    ExitError,
    LogError,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Symptom {
    #[serde(rename = "type")]
    pub symptom_type: SymptomType,
    pub severity: Severity,
    pub description: String,
    pub evidence: Value,
    pub detected_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikelyCause {
    pub description: String,
    pub confidence: f64,
    pub evidence: Vec<String>,
    pub related_symptoms: Vec<SymptomType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionUrgency {
    Immediate,
    ShortTerm,
    LongTerm,
}

impl SuggestionUrgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionUrgency::Immediate => "immediate",
            SuggestionUrgency::ShortTerm => "short_term",
            SuggestionUrgency::LongTerm => "long_term",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub urgency: SuggestionUrgency,
    pub action: String,
    pub rationale: String,
    pub command: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisResult {
    pub symptoms: Vec<Symptom>,
    pub likely_causes: Vec<LikelyCause>,
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisReport {
    pub container_id: String,
    pub container_name: String,
    pub timestamp: String,
    pub state: ContainerState,
    pub uptime: Option<String>,
    pub symptoms: Vec<Symptom>,
    pub likely_causes: Vec<LikelyCause>,
    pub suggestions: Vec<Suggestion>,
    pub summary: String,
    pub detailed_explanation: String,
}
