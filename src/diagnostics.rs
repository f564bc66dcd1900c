//! C8 — the diagnostic collector (§4.14): turns raw peephole-match events
//! into classified, severity-ranked diagnostics, optionally drafted as
//! structured issues. Lives alongside the peephole pass that feeds it
//! rather than as global mutable state (§9 design notes).

use serde::{Deserialize, Serialize};

use crate::asm::PeepholeMatch;
use crate::common::Id;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RootCause {
    CodegenInefficiency,
    MissedMirOpt,
    SemanticRedundancy,
    SuspiciousPair,
    TemplateInefficiency,
    Unknown,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Suspicious,
    Bug,
}

/// What a pattern name implies about root cause, severity, suggested fix,
/// and whether the rewrite was safe to apply automatically. Patterns not
/// listed here fall back to `Unknown`/`Info`.
fn classify(pattern: &str) -> (RootCause, Severity, &'static str, bool) {
    match pattern {
        "load-zero-to-xor" | "add-one-to-inc" | "sub-one-to-dec" | "cp-zero-to-or-a" => (
            RootCause::CodegenInefficiency,
            Severity::Info,
            "use the cheaper equivalent form directly at codegen time",
            true,
        ),
        "push-pop-cancel" | "double-ex-de-hl-cancel" | "neg-neg-cancel" | "scf-ccf-to-or-a" => (
            RootCause::SemanticRedundancy,
            Severity::Warning,
            "the two instructions cancel; avoid emitting the pair",
            true,
        ),
        "ld-d-h-e-l-ex-drops-the-exchange" | "ld-hl-imm-split-to-de" => (
            RootCause::MissedMirOpt,
            Severity::Warning,
            "MIR-level register allocation could have picked registers avoiding this shuffle",
            true,
        ),
        "add-hl-hl-fast-shift" | "inc-sp-twice-stack-drop" => (
            RootCause::TemplateInefficiency,
            Severity::Info,
            "already optimal; annotated so future sweeps don't re-flag it",
            false,
        ),
        "conditional-skip-inversion" => (
            RootCause::SuspiciousPair,
            Severity::Suspicious,
            "a skip-then-jump idiom this dense usually indicates a missed structured branch",
            false,
        ),
        _ => (RootCause::Unknown, Severity::Info, "no classification on record for this pattern", false),
    }
}

/// One classified diagnostic, derived from a [`PeepholeMatch`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    pub pattern: String,
    pub function: Option<Id>,
    pub line: usize,
    pub context: Vec<String>,
    pub root_cause: RootCause,
    pub severity: Severity,
    pub suggested_fix: &'static str,
    pub auto_fixable: bool,
}

/// A structured issue draft for a diagnostic severe enough to warrant
/// filing (Suspicious or Bug).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IssueDraft {
    pub title: String,
    pub body: String,
}

impl Diagnostic {
    fn from_match(m: &PeepholeMatch, function: Option<Id>, buffer_lines: &[String]) -> Self {
        let (root_cause, severity, suggested_fix, auto_fixable) = classify(m.pattern);
        let lo = m.line.saturating_sub(5);
        let hi = (m.line + 5).min(buffer_lines.len());
        let context = buffer_lines[lo..hi].to_vec();
        Diagnostic {
            pattern: m.pattern.to_string(),
            function,
            line: m.line,
            context,
            root_cause,
            severity,
            suggested_fix,
            auto_fixable,
        }
    }

    pub fn to_issue_draft(&self) -> Option<IssueDraft> {
        if self.severity < Severity::Suspicious {
            return None;
        }
        let title = format!("peephole pattern `{}` flagged as {:?}", self.pattern, self.root_cause);
        let body = format!(
            "Pattern `{}` fired at line {}{}.\nSuggested fix: {}\nContext:\n{}",
            self.pattern,
            self.line,
            self.function.map(|f| format!(" in function `{f}`")).unwrap_or_default(),
            self.suggested_fix,
            self.context.join("\n"),
        );
        Some(IssueDraft { title, body })
    }
}

/// Accumulates diagnostics across one or more peephole runs.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticCollector {
    events: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        DiagnosticCollector::default()
    }

    /// Classify and record every match observed while rewriting
    /// `buffer_lines` (the canonical-form lines the matches indexed into),
    /// optionally scoped to `function`.
    pub fn record(&mut self, matches: &[PeepholeMatch], function: Option<Id>, buffer_lines: &[String]) {
        self.events.extend(
            matches
                .iter()
                .map(|m| Diagnostic::from_match(m, function, buffer_lines)),
        );
    }

    pub fn events(&self) -> &[Diagnostic] {
        &self.events
    }

    pub fn issue_drafts(&self) -> Vec<IssueDraft> {
        self.events.iter().filter_map(Diagnostic::to_issue_draft).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_cancellation_pattern_is_classified_as_semantic_redundancy() {
        let mut collector = DiagnosticCollector::new();
        let matches = vec![PeepholeMatch { pattern: "push-pop-cancel", line: 0 }];
        collector.record(&matches, None, &["PUSH BC".to_string(), "POP BC".to_string()]);
        assert_eq!(collector.events()[0].root_cause, RootCause::SemanticRedundancy);
        assert!(collector.events()[0].auto_fixable);
    }

    #[test]
    fn only_suspicious_or_worse_events_become_issue_drafts() {
        let mut collector = DiagnosticCollector::new();
        let matches = vec![
            PeepholeMatch { pattern: "load-zero-to-xor", line: 0 },
            PeepholeMatch { pattern: "conditional-skip-inversion", line: 1 },
        ];
        collector.record(&matches, None, &["LD A,0".to_string(), "JR NZ,$+5".to_string()]);
        assert_eq!(collector.issue_drafts().len(), 1);
    }
}
