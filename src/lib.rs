//! canvas-merge library crate.
//!
//! The merge itself lives in `canvas-merge-core`; this crate adds file-based
//! configuration, document I/O, reporting and logging setup, and the
//! one-call [`merge_documents`] pipeline used by the `canvas-merge` binary.

pub mod config;
pub mod report;
pub mod telemetry;

use std::path::Path;

use anyhow::{Context as _, Result};
use tracing::instrument;

pub use canvas_merge_core as core;
pub use config::MergeConfig;
pub use report::MergeSummary;

use canvas_merge_core::{DetectionReport, Document, MergeContext, MergeResult};

/// Detect conflicts between `local` and `remote` relative to `base` using the
/// passes enabled in `config`.
///
/// # Errors
/// Fails if any version repeats a node identity or has a node without one.
pub fn detect_conflicts(
    base: &Document,
    local: &Document,
    remote: &Document,
    config: &MergeConfig,
) -> Result<DetectionReport> {
    Ok(canvas_merge_core::detect(
        base,
        local,
        remote,
        &config.detect_options(),
    )?)
}

/// Detect, resolve and apply in one call, driving the asynchronous engine
/// on the current thread.
///
/// The returned document is a resolved copy of the configured target
/// version; the inputs are never modified.
///
/// # Errors
/// Fails on invalid configuration, malformed documents, a selected strategy
/// with no implementation, or a conflict that no longer fits the target
/// document. Conflicts merely left unresolved are reported through
/// [`MergeResult::unresolved`], not as errors.
#[instrument(skip_all, fields(target = %config.resolve.target))]
pub fn merge_documents(
    base: &Document,
    local: &Document,
    remote: &Document,
    config: &MergeConfig,
) -> Result<MergeResult> {
    let report = detect_conflicts(base, local, remote, config)?;
    for warning in &report.warnings {
        tracing::warn!(%warning, "detection warning");
    }

    let engine = config.engine()?;
    let context = MergeContext::new(base, local, remote, config.resolve.target);
    Ok(engine.resolve_conflicts_blocking(&report.conflicts, &context)?)
}

/// Read a JSON document from `path`.
///
/// # Errors
/// Fails if the file cannot be read or is not a valid document.
pub fn read_document(path: &Path) -> Result<Document> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("{} is not a valid document", path.display()))
}

/// Write `document` to `path` as pretty-printed JSON.
///
/// # Errors
/// Fails if the file cannot be written.
pub fn write_document(path: &Path, document: &Document) -> Result<()> {
    let mut json = serde_json::to_string_pretty(document).context("failed to serialize document")?;
    json.push('\n');
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}
