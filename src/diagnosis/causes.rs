//! Ordered cause-inference rules, expressed as data.
//!
//! Each rule names the symptom types that must all be present, a guard, a
//! fixed confidence, and the cause it asserts. Evaluating the table in
//! order reproduces the intended precedence without nested conditionals,
//! and new rules slot in without touching control flow.

use super::types::SymptomType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    Always,
    /// Suppressed when an earlier rule already produced a cause.
    OnlyIfNoPriorCause,
}

/// Identifies which catalog templates describe the cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CauseKind {
    MemoryLimitExceeded,
    CrashLoop,
    CpuBound,
}

#[derive(Debug, Clone, Copy)]
pub struct CauseRule {
    pub requires: &'static [SymptomType],
    pub guard: Guard,
    pub confidence: f64,
    pub kind: CauseKind,
}

pub const CAUSE_RULES: &[CauseRule] = &[
    CauseRule {
        requires: &[SymptomType::OomKilled, SymptomType::HighMemory],
        guard: Guard::Always,
        confidence: 0.95,
        kind: CauseKind::MemoryLimitExceeded,
    },
    CauseRule {
        requires: &[SymptomType::RestartLoop, SymptomType::ExitError],
        guard: Guard::Always,
        confidence: 0.9,
        kind: CauseKind::CrashLoop,
    },
    CauseRule {
        requires: &[SymptomType::HighCpu],
        guard: Guard::OnlyIfNoPriorCause,
        confidence: 0.7,
        kind: CauseKind::CpuBound,
    },
];
