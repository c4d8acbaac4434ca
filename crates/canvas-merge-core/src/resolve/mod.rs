//! Conflict resolution: strategies, the resolution engine, and application of
//! resolved values to the target document.
//!
//! ```text
//! Conflict ──select──▶ StrategyKind ──resolve──▶ MergeResolution ──apply──▶ target copy
//!            override                 strategy      applied = !review
//!            → default table                          && confidence >= threshold
//!            → fallback                               && auto_resolve
//! ```

mod apply;
mod engine;
pub mod strategy;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use engine::{ResolutionEngine, aggregate_confidence, default_strategy};
pub use strategy::{Average, ConfidenceTable, Manual, PreferSide, ResolutionStrategy, StrategyRegistry};

use crate::model::conflict::{Conflict, ConflictCode, ConflictValue, StrategyKind, UnknownName};
use crate::model::document::Document;

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Which document receives the resolved values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeTarget {
    #[default]
    Local,
    Remote,
}

impl fmt::Display for MergeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Local => "local",
            Self::Remote => "remote",
        })
    }
}

impl FromStr for MergeTarget {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            _ => Err(UnknownName {
                kind: "merge target",
                value: s.to_owned(),
            }),
        }
    }
}

/// The three document versions of one merge and the side being written to.
#[derive(Clone, Copy, Debug)]
pub struct MergeContext<'a> {
    pub base: &'a Document,
    pub local: &'a Document,
    pub remote: &'a Document,
    pub target: MergeTarget,
}

impl<'a> MergeContext<'a> {
    #[must_use]
    pub const fn new(base: &'a Document, local: &'a Document, remote: &'a Document, target: MergeTarget) -> Self {
        Self {
            base,
            local,
            remote,
            target,
        }
    }

    /// The document resolutions are applied to (as a copy).
    #[must_use]
    pub const fn target_document(&self) -> &'a Document {
        match self.target {
            MergeTarget::Local => self.local,
            MergeTarget::Remote => self.remote,
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Chooses a strategy for conflicts that neither an override nor the default
/// table covers.
pub type FallbackFn = Arc<dyn Fn(&Conflict) -> StrategyKind + Send + Sync>;

/// Engine configuration.
#[derive(Clone)]
pub struct ResolveOptions {
    /// Apply resolutions automatically at all.
    pub auto_resolve: bool,
    /// Minimum strategy confidence for automatic application.
    pub min_confidence: f64,
    /// Per-code strategy, consulted before the default table.
    pub overrides: BTreeMap<ConflictCode, StrategyKind>,
    /// Consulted last; `None` means manual.
    pub fallback: Option<FallbackFn>,
    /// Report `success == false` when anything is left unresolved.
    pub fail_on_unresolved: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            auto_resolve: true,
            min_confidence: 0.7,
            overrides: BTreeMap::new(),
            fallback: None,
            fail_on_unresolved: false,
        }
    }
}

impl ResolveOptions {
    /// Use `kind` for every conflict not otherwise covered.
    #[must_use]
    pub fn with_fallback_kind(mut self, kind: StrategyKind) -> Self {
        self.fallback = Some(Arc::new(move |_: &Conflict| kind));
        self
    }

    #[must_use]
    pub fn with_override(mut self, code: ConflictCode, kind: StrategyKind) -> Self {
        self.overrides.insert(code, kind);
        self
    }
}

impl fmt::Debug for ResolveOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveOptions")
            .field("auto_resolve", &self.auto_resolve)
            .field("min_confidence", &self.min_confidence)
            .field("overrides", &self.overrides)
            .field("fallback", &self.fallback.as_ref().map(|_| "<fn>"))
            .field("fail_on_unresolved", &self.fail_on_unresolved)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// One conflict together with how it was resolved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResolution {
    pub conflict: Conflict,
    pub strategy: StrategyKind,
    /// Value written into the target; absent means "remove".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_value: Option<ConflictValue>,
    pub confidence: f64,
    pub requires_review: bool,
    pub explanation: String,
    /// Set by the engine once the value is in the target document.
    pub applied: bool,
}

impl MergeResolution {
    /// An unapplied resolution. `confidence` is clamped to `[0, 1]`; NaN counts as 0.
    #[must_use]
    pub fn new(
        conflict: Conflict,
        strategy: StrategyKind,
        resolved_value: Option<ConflictValue>,
        confidence: f64,
        requires_review: bool,
        explanation: String,
    ) -> Self {
        Self {
            conflict,
            strategy,
            resolved_value,
            confidence: unit_confidence(confidence),
            requires_review,
            explanation,
            applied: false,
        }
    }
}

/// `value` clamped to `[0, 1]`, with NaN mapped to 0.
#[must_use]
pub const fn unit_confidence(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

/// Outcome of [`ResolutionEngine::resolve_conflicts`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResult {
    /// `false` only when conflicts are left unresolved and the caller asked
    /// for that to count as failure.
    pub success: bool,
    pub document: Document,
    pub resolutions: Vec<MergeResolution>,
    /// Conflicts whose resolution was not applied.
    pub unresolved: Vec<Conflict>,
    /// Aggregate confidence in `[0, 1]`.
    pub confidence: f64,
    pub needs_manual_review: bool,
}

impl MergeResult {
    /// Number of resolutions written into the document.
    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.resolutions.iter().filter(|r| r.applied).count()
    }
}
