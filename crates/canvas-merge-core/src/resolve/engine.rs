//! The resolution engine: strategy selection, application and the aggregate
//! confidence of a merge.

use tracing::{debug, info, instrument, warn};

use super::apply::{ApplyError, apply};
use super::strategy::{ConfidenceTable, ResolutionStrategy, StrategyRegistry};
use super::{MergeContext, MergeResolution, MergeResult, ResolveOptions, unit_confidence};
use crate::error::MergeError;
use crate::model::conflict::{Conflict, ConflictCode, StrategyKind};

/// Built-in strategy table. Codes without an entry go to the fallback.
#[must_use]
pub const fn default_strategy(code: ConflictCode) -> Option<StrategyKind> {
    match code {
        ConflictCode::Order | ConflictCode::Visibility => Some(StrategyKind::PreferLocal),
        ConflictCode::Name => Some(StrategyKind::PreferRemote),
        ConflictCode::DeleteModify
        | ConflictCode::AddAdd
        | ConflictCode::MoveMove
        | ConflictCode::Geometry
        | ConflictCode::Layout
        | ConflictCode::Style
        | ConflictCode::Text
        | ConflictCode::ComponentProps => None,
    }
}

/// Aggregate confidence of a set of resolutions.
///
/// Applied resolutions count once at full confidence; unapplied ones count
/// twice at half confidence, so unresolved conflicts dominate the result:
///
/// ```text
/// (Σ applied + 0.5 · Σ unapplied) / (|applied| + 2 · |unapplied|)
/// ```
///
/// Each confidence is read through [`unit_confidence`], so the result stays
/// in `[0, 1]` even for hand-built resolutions. It is `1.0` for an empty set.
#[must_use]
pub fn aggregate_confidence(resolutions: &[MergeResolution]) -> f64 {
    let (total, weight) = resolutions.iter().fold((0.0, 0.0), |(total, weight), r| {
        let confidence = unit_confidence(r.confidence);
        if r.applied {
            (total + confidence, weight + 1.0)
        } else {
            (total + 0.5 * confidence, weight + 2.0)
        }
    });
    if weight <= 0.0 {
        return 1.0;
    }
    unit_confidence(total / weight)
}

/// Resolves detected conflicts against one target document.
#[derive(Debug)]
pub struct ResolutionEngine {
    registry: StrategyRegistry,
    options: ResolveOptions,
}

impl ResolutionEngine {
    /// An engine with the built-in strategies at the confidences in `table`.
    #[must_use]
    pub fn new(options: ResolveOptions, table: &ConfidenceTable) -> Self {
        Self::with_registry(options, StrategyRegistry::builtin(table))
    }

    #[must_use]
    pub const fn with_registry(options: ResolveOptions, registry: StrategyRegistry) -> Self {
        Self { registry, options }
    }

    #[must_use]
    pub const fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Register additional strategies, e.g. an implementation of `merge`.
    pub const fn registry_mut(&mut self) -> &mut StrategyRegistry {
        &mut self.registry
    }

    /// Strategy for `conflict`: override, then default table, then fallback.
    #[must_use]
    pub fn select(&self, conflict: &Conflict) -> StrategyKind {
        self.options
            .overrides
            .get(&conflict.code)
            .copied()
            .or_else(|| default_strategy(conflict.code))
            .unwrap_or_else(|| {
                self.options
                    .fallback
                    .as_ref()
                    .map_or(StrategyKind::Manual, |fallback| fallback(conflict))
            })
    }

    /// Resolve `conflicts` in order and apply what qualifies to a copy of the
    /// target document. Later resolutions see the effect of earlier ones.
    ///
    /// # Errors
    /// [`MergeError::StrategyNotImplemented`] when a selected strategy has no
    /// implementation, and [`MergeError::OrderMismatch`] or
    /// [`MergeError::MalformedPath`] when a conflict no longer fits the target
    /// document. Recoverable application failures are not errors: the
    /// resolution is left unapplied.
    #[instrument(skip_all, fields(conflicts = conflicts.len(), target = %context.target))]
    pub async fn resolve_conflicts(
        &self,
        conflicts: &[Conflict],
        context: &MergeContext<'_>,
    ) -> Result<MergeResult, MergeError> {
        let mut document = context.target_document().clone();
        let mut resolutions = Vec::with_capacity(conflicts.len());

        for conflict in conflicts {
            let mut resolution = self.resolve_one(conflict, context).await?;
            if self.qualifies(&resolution) {
                match apply(&mut document, &resolution) {
                    Ok(()) => resolution.applied = true,
                    Err(ApplyError::Skipped(err)) => {
                        warn!(code = %conflict.code, node = %conflict.node_id, error = %err, "resolution not applied");
                        resolution.explanation = format!("{}; not applied: {err}", resolution.explanation);
                    }
                    Err(ApplyError::Fatal(err)) => return Err(err),
                }
            }
            debug!(
                code = %conflict.code,
                node = %conflict.node_id,
                strategy = %resolution.strategy,
                confidence = resolution.confidence,
                applied = resolution.applied,
                "resolved conflict"
            );
            resolutions.push(resolution);
        }

        let unresolved: Vec<Conflict> = resolutions
            .iter()
            .filter(|r| !r.applied)
            .map(|r| r.conflict.clone())
            .collect();
        let confidence = aggregate_confidence(&resolutions);
        let needs_manual_review = !unresolved.is_empty();
        let success = !needs_manual_review || !self.options.fail_on_unresolved;
        info!(
            applied = resolutions.len() - unresolved.len(),
            unresolved = unresolved.len(),
            confidence,
            success,
            "resolution finished"
        );
        Ok(MergeResult {
            success,
            document,
            resolutions,
            unresolved,
            confidence,
            needs_manual_review,
        })
    }

    /// [`resolve_conflicts`](Self::resolve_conflicts) on the current thread.
    ///
    /// # Errors
    /// As [`resolve_conflicts`](Self::resolve_conflicts).
    pub fn resolve_conflicts_blocking(
        &self,
        conflicts: &[Conflict],
        context: &MergeContext<'_>,
    ) -> Result<MergeResult, MergeError> {
        futures::executor::block_on(self.resolve_conflicts(conflicts, context))
    }

    async fn resolve_one(&self, conflict: &Conflict, context: &MergeContext<'_>) -> Result<MergeResolution, MergeError> {
        let kind = self.select(conflict);
        let strategy = self.strategy(kind, conflict)?;
        let mut resolution = if strategy.can_resolve(conflict) {
            strategy.resolve(conflict, context).await
        } else {
            let mut manual = self.strategy(StrategyKind::Manual, conflict)?.resolve(conflict, context).await;
            manual.explanation = format!("{kind} cannot resolve {}; {}", conflict.code, manual.explanation);
            manual
        };
        resolution.applied = false;
        Ok(resolution)
    }

    fn strategy(&self, kind: StrategyKind, conflict: &Conflict) -> Result<&dyn ResolutionStrategy, MergeError> {
        self.registry
            .get(kind)
            .ok_or(MergeError::StrategyNotImplemented {
                strategy: kind,
                code: conflict.code,
            })
    }

    fn qualifies(&self, resolution: &MergeResolution) -> bool {
        self.options.auto_resolve && !resolution.requires_review && resolution.confidence >= self.options.min_confidence
    }
}
