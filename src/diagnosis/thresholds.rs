//! Injectable tier tables for metric and restart-count evaluation.

use serde::{Deserialize, Serialize};

use super::types::Severity;
use crate::error::Error;

/// Warning < error < critical breakpoints for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierTable {
    pub warning: f64,
    pub error: f64,
    pub critical: f64,
}

impl TierTable {
    /// Highest tier whose breakpoint the value strictly exceeds, together
    /// with that breakpoint. Critical is checked first so exactly one tier
    /// can match.
    pub fn evaluate(&self, value: f64) -> Option<(Severity, f64)> {
        if value > self.critical {
            Some((Severity::Critical, self.critical))
        } else if value > self.error {
            Some((Severity::Error, self.error))
        } else if value > self.warning {
            Some((Severity::Warning, self.warning))
        } else {
            None
        }
    }

    /// Inclusive variant for values that are already completed counts
    /// rather than sampled rates: the breakpoint itself triggers.
    pub fn evaluate_inclusive(&self, value: f64) -> Option<(Severity, f64)> {
        if value >= self.critical {
            Some((Severity::Critical, self.critical))
        } else if value >= self.error {
            Some((Severity::Error, self.error))
        } else if value >= self.warning {
            Some((Severity::Warning, self.warning))
        } else {
            None
        }
    }

    fn is_increasing(&self) -> bool {
        self.warning < self.error && self.error < self.critical
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub cpu: TierTable,
    pub memory: TierTable,
    pub restarts: TierTable,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu: TierTable {
                warning: 70.0,
                error: 85.0,
                critical: 95.0,
            },
            memory: TierTable {
                warning: 75.0,
                error: 85.0,
                critical: 95.0,
            },
            restarts: TierTable {
                warning: 2.0,
                error: 3.0,
                critical: 5.0,
            },
        }
    }
}

impl Thresholds {
    /// Breakpoints must strictly increase per metric; a table violating
    /// that would make tier selection ambiguous.
    pub fn validate(&self) -> Result<(), Error> {
        for (name, table) in [
            ("cpu", &self.cpu),
            ("memory", &self.memory),
            ("restarts", &self.restarts),
        ] {
            if !table.is_increasing() {
                return Err(Error::Parse(format!(
                    "{name} thresholds: warning < error < critical must hold"
                )));
            }
        }
        Ok(())
    }
}
