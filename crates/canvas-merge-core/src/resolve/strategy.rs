//! Resolution strategies.
//!
//! A strategy turns one [`Conflict`] into a [`MergeResolution`]: the value to
//! write into the target document, a confidence, and whether a human has to
//! look at it. Strategies never apply anything; the engine decides that.
//!
//! | Strategy | Confidence | Resolved value |
//! |----------|-----------:|----------------|
//! | `prefer-local` | 0.7 | local side |
//! | `prefer-remote` | 0.8 | remote side |
//! | `prefer-base` | 0.6 | base side |
//! | `average` | 0.6 | midpoint of numeric payloads |
//! | `merge` | 0.5 | no built-in implementation |
//! | `manual` | 0.0 | none, always needs review |

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{MergeContext, MergeResolution};
use crate::model::conflict::{Conflict, ConflictValue, StrategyKind};
use crate::model::document::Rect;

/// Resolves conflicts of the kinds it accepts.
///
/// The contract is asynchronous so that a strategy may consult an external
/// service. The built-in strategies never suspend.
#[async_trait]
pub trait ResolutionStrategy: Send + Sync {
    /// The name this strategy is registered and selected under.
    fn kind(&self) -> StrategyKind;

    /// Whether [`resolve`](Self::resolve) produces a meaningful value for `conflict`.
    fn can_resolve(&self, conflict: &Conflict) -> bool;

    /// Produce a resolution. `applied` must be left `false`.
    async fn resolve(&self, conflict: &Conflict, context: &MergeContext<'_>) -> MergeResolution;
}

// ---------------------------------------------------------------------------
// Confidence table
// ---------------------------------------------------------------------------

/// Confidence reported by each built-in strategy.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfidenceTable {
    pub prefer_local: f64,
    pub prefer_remote: f64,
    pub prefer_base: f64,
    pub average: f64,
    pub merge: f64,
    pub manual: f64,
}

impl Default for ConfidenceTable {
    fn default() -> Self {
        Self {
            prefer_local: 0.7,
            prefer_remote: 0.8,
            prefer_base: 0.6,
            average: 0.6,
            merge: 0.5,
            manual: 0.0,
        }
    }
}

impl ConfidenceTable {
    #[must_use]
    pub const fn get(&self, kind: StrategyKind) -> f64 {
        match kind {
            StrategyKind::PreferLocal => self.prefer_local,
            StrategyKind::PreferRemote => self.prefer_remote,
            StrategyKind::PreferBase => self.prefer_base,
            StrategyKind::Average => self.average,
            StrategyKind::Merge => self.merge,
            StrategyKind::Manual => self.manual,
        }
    }
}

// ---------------------------------------------------------------------------
// Built-in strategies
// ---------------------------------------------------------------------------

/// Which side a [`PreferSide`] strategy copies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Local,
    Remote,
    Base,
}

impl Side {
    const fn kind(self) -> StrategyKind {
        match self {
            Self::Local => StrategyKind::PreferLocal,
            Self::Remote => StrategyKind::PreferRemote,
            Self::Base => StrategyKind::PreferBase,
        }
    }

    const fn pick(self, conflict: &Conflict) -> Option<&ConflictValue> {
        match self {
            Self::Local => conflict.local.as_ref(),
            Self::Remote => conflict.remote.as_ref(),
            Self::Base => conflict.base.as_ref(),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Local => "local",
            Self::Remote => "remote",
            Self::Base => "base",
        })
    }
}

/// Takes one side's value verbatim. An absent value means "absent in the result".
#[derive(Clone, Copy, Debug)]
pub struct PreferSide {
    side: Side,
    confidence: f64,
}

impl PreferSide {
    #[must_use]
    pub const fn local(confidence: f64) -> Self {
        Self {
            side: Side::Local,
            confidence,
        }
    }

    #[must_use]
    pub const fn remote(confidence: f64) -> Self {
        Self {
            side: Side::Remote,
            confidence,
        }
    }

    #[must_use]
    pub const fn base(confidence: f64) -> Self {
        Self {
            side: Side::Base,
            confidence,
        }
    }
}

#[async_trait]
impl ResolutionStrategy for PreferSide {
    fn kind(&self) -> StrategyKind {
        self.side.kind()
    }

    fn can_resolve(&self, _conflict: &Conflict) -> bool {
        true
    }

    async fn resolve(&self, conflict: &Conflict, _context: &MergeContext<'_>) -> MergeResolution {
        let value = self.side.pick(conflict).cloned();
        let explanation = if value.is_some() {
            format!("kept the {} value", self.side)
        } else {
            format!("kept the {} state, where the value is absent", self.side)
        };
        MergeResolution::new(conflict.clone(), self.kind(), value, self.confidence, false, explanation)
    }
}

/// Midpoint of two numeric payloads: frame rectangles or opacity.
#[derive(Clone, Copy, Debug)]
pub struct Average {
    confidence: f64,
}

impl Average {
    #[must_use]
    pub const fn new(confidence: f64) -> Self {
        Self { confidence }
    }

    fn midpoint(local: &ConflictValue, remote: &ConflictValue) -> Option<ConflictValue> {
        match (local, remote) {
            (ConflictValue::Frame(l), ConflictValue::Frame(r)) => Some(ConflictValue::Frame(Rect::new(
                f64::midpoint(l.x, r.x),
                f64::midpoint(l.y, r.y),
                f64::midpoint(l.width, r.width),
                f64::midpoint(l.height, r.height),
            ))),
            (ConflictValue::Opacity(l), ConflictValue::Opacity(r)) => Some(ConflictValue::Opacity(f64::midpoint(*l, *r))),
            _ => None,
        }
    }
}

#[async_trait]
impl ResolutionStrategy for Average {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Average
    }

    fn can_resolve(&self, conflict: &Conflict) -> bool {
        matches!(
            (&conflict.local, &conflict.remote),
            (Some(ConflictValue::Frame(_)), Some(ConflictValue::Frame(_)))
                | (Some(ConflictValue::Opacity(_)), Some(ConflictValue::Opacity(_)))
        )
    }

    async fn resolve(&self, conflict: &Conflict, _context: &MergeContext<'_>) -> MergeResolution {
        let value = match (&conflict.local, &conflict.remote) {
            (Some(local), Some(remote)) => Self::midpoint(local, remote),
            _ => None,
        };
        // Only reachable when called without `can_resolve`.
        let Some(value) = value else {
            return Manual::new(0.0)
                .review(conflict, "average needs numeric values on both sides".to_owned());
        };
        MergeResolution::new(
            conflict.clone(),
            StrategyKind::Average,
            Some(value),
            self.confidence,
            false,
            "averaged the local and remote values".to_owned(),
        )
    }
}

/// Leaves the conflict for a human.
#[derive(Clone, Copy, Debug)]
pub struct Manual {
    confidence: f64,
}

impl Manual {
    #[must_use]
    pub const fn new(confidence: f64) -> Self {
        Self { confidence }
    }

    pub(crate) fn review(self, conflict: &Conflict, explanation: String) -> MergeResolution {
        MergeResolution::new(conflict.clone(), StrategyKind::Manual, None, self.confidence, true, explanation)
    }
}

#[async_trait]
impl ResolutionStrategy for Manual {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Manual
    }

    fn can_resolve(&self, _conflict: &Conflict) -> bool {
        true
    }

    async fn resolve(&self, conflict: &Conflict, _context: &MergeContext<'_>) -> MergeResolution {
        self.review(conflict, format!("{} requires manual review: {}", conflict.code, conflict.message))
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Strategies available to the engine, keyed by [`StrategyKind`].
///
/// `merge` has no built-in implementation; hosts may [`register`](Self::register) one.
#[derive(Default)]
pub struct StrategyRegistry {
    strategies: BTreeMap<StrategyKind, Box<dyn ResolutionStrategy>>,
}

impl StrategyRegistry {
    /// Every built-in strategy, with confidences from `table`.
    #[must_use]
    pub fn builtin(table: &ConfidenceTable) -> Self {
        let mut registry = Self::default();
        registry.register(Box::new(PreferSide::local(table.prefer_local)));
        registry.register(Box::new(PreferSide::remote(table.prefer_remote)));
        registry.register(Box::new(PreferSide::base(table.prefer_base)));
        registry.register(Box::new(Average::new(table.average)));
        registry.register(Box::new(Manual::new(table.manual)));
        registry
    }

    /// Add or replace the strategy registered under its [`kind`](ResolutionStrategy::kind).
    pub fn register(&mut self, strategy: Box<dyn ResolutionStrategy>) {
        self.strategies.insert(strategy.kind(), strategy);
    }

    #[must_use]
    pub fn get(&self, kind: StrategyKind) -> Option<&dyn ResolutionStrategy> {
        self.strategies.get(&kind).map(AsRef::as_ref)
    }

    /// Registered strategy names, sorted.
    pub fn kinds(&self) -> impl Iterator<Item = StrategyKind> + '_ {
        self.strategies.keys().copied()
    }
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.kinds()).finish()
    }
}
