//! Human and JSON summaries of detection and merge runs.

use std::fmt::{self, Write as _};

use serde::Serialize;

use canvas_merge_core::{Conflict, DetectionReport, MergeResult, MergeTarget, StrategyKind};

/// What a merge run did, without the resolved document.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeSummary {
    pub success: bool,
    pub target: MergeTarget,
    pub conflicts: usize,
    pub applied: usize,
    pub confidence: f64,
    pub needs_manual_review: bool,
    pub resolutions: Vec<ResolutionLine>,
}

/// One resolution as shown in a summary.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionLine {
    pub code: String,
    pub node_id: String,
    pub path: String,
    pub strategy: StrategyKind,
    pub confidence: f64,
    pub applied: bool,
    pub explanation: String,
}

impl MergeSummary {
    #[must_use]
    pub fn new(result: &MergeResult, target: MergeTarget) -> Self {
        Self {
            success: result.success,
            target,
            conflicts: result.resolutions.len(),
            applied: result.applied_count(),
            confidence: result.confidence,
            needs_manual_review: result.needs_manual_review,
            resolutions: result
                .resolutions
                .iter()
                .map(|r| ResolutionLine {
                    code: r.conflict.code.to_string(),
                    node_id: r.conflict.node_id.to_string(),
                    path: r.conflict.path.to_string(),
                    strategy: r.strategy,
                    confidence: r.confidence,
                    applied: r.applied,
                    explanation: r.explanation.clone(),
                })
                .collect(),
        }
    }
}

impl fmt::Display for MergeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "merged into {}: {} conflict(s), {} applied, {} unresolved, confidence {:.2}",
            self.target,
            self.conflicts,
            self.applied,
            self.conflicts - self.applied,
            self.confidence
        )?;
        for line in &self.resolutions {
            let mark = if line.applied { "applied " } else { "REVIEW  " };
            writeln!(
                f,
                "  {mark}{:<18} {} via {} ({:.2}): {}",
                line.code, line.path, line.strategy, line.confidence, line.explanation
            )?;
        }
        if !self.success {
            writeln!(f, "merge failed: unresolved conflicts remain")?;
        }
        Ok(())
    }
}

/// Plain-text rendering of a detection report.
#[must_use]
pub fn render_detection(report: &DetectionReport) -> String {
    let mut out = String::new();
    if report.is_clean() {
        out.push_str("no conflicts\n");
    }
    for conflict in &report.conflicts {
        let _ = writeln!(out, "{}", conflict_line(conflict));
    }
    for warning in &report.warnings {
        let _ = writeln!(out, "warning: {warning}");
    }
    out
}

fn conflict_line(conflict: &Conflict) -> String {
    format!(
        "{:<7} {:<18} {}: {}",
        conflict.severity, conflict.code, conflict.path, conflict.message
    )
}
