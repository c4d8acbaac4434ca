//! Merge configuration (`canvas-merge.toml`).
//!
//! ```toml
//! [detect]
//! structural = true
//! property = true
//! content = true
//! metadata = true
//!
//! [resolve]
//! auto_resolve = true
//! min_confidence = 0.7
//! fail_on_unresolved = false
//! target = "local"
//! fallback = "manual"
//!
//! [resolve.overrides]
//! "P-GEOMETRY" = "prefer-remote"
//!
//! [confidence]
//! prefer_remote = 0.8
//! ```
//!
//! Every section and key is optional. A missing file means all defaults.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use canvas_merge_core::detect::DetectOptions;
use canvas_merge_core::model::{ConflictCode, StrategyKind};
use canvas_merge_core::resolve::{ConfidenceTable, MergeTarget, ResolutionEngine, ResolveOptions};

/// Default file name looked up by the command-line front end.
pub const DEFAULT_CONFIG_FILE: &str = "canvas-merge.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level merge configuration.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeConfig {
    /// Which detection passes run.
    #[serde(default)]
    pub detect: DetectOptions,

    /// Strategy selection and application.
    #[serde(default)]
    pub resolve: ResolveConfig,

    /// Confidence reported by each built-in strategy.
    #[serde(default)]
    pub confidence: ConfidenceTable,
}

// ---------------------------------------------------------------------------
// ResolveConfig
// ---------------------------------------------------------------------------

/// `[resolve]` section.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolveConfig {
    /// Apply confident resolutions automatically.
    #[serde(default = "default_auto_resolve")]
    pub auto_resolve: bool,

    /// Minimum confidence for automatic application (0.0 to 1.0).
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Treat anything left unresolved as a failed merge.
    #[serde(default)]
    pub fail_on_unresolved: bool,

    /// The document resolved values are written into.
    #[serde(default)]
    pub target: MergeTarget,

    /// Strategy for conflict codes not covered by an override or the
    /// built-in table.
    #[serde(default = "default_fallback")]
    pub fallback: StrategyKind,

    /// Strategy per conflict code, e.g. `"P-GEOMETRY" = "prefer-remote"`.
    #[serde(default)]
    pub overrides: BTreeMap<String, StrategyKind>,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            auto_resolve: default_auto_resolve(),
            min_confidence: default_min_confidence(),
            fail_on_unresolved: false,
            target: MergeTarget::default(),
            fallback: default_fallback(),
            overrides: BTreeMap::new(),
        }
    }
}

const fn default_auto_resolve() -> bool {
    true
}

const fn default_min_confidence() -> f64 {
    0.7
}

const fn default_fallback() -> StrategyKind {
    StrategyKind::Manual
}

// ---------------------------------------------------------------------------
// Conversion into engine options
// ---------------------------------------------------------------------------

impl MergeConfig {
    /// Detection options for the core.
    #[must_use]
    pub const fn detect_options(&self) -> DetectOptions {
        self.detect
    }

    /// Resolution options for the core.
    ///
    /// # Errors
    /// Returns `ConfigError` for an unknown conflict code in
    /// `[resolve.overrides]`, a threshold or `[confidence]` entry outside
    /// `0.0..=1.0` (NaN included), or a strategy with no implementation.
    pub fn resolve_options(&self) -> Result<ResolveOptions, ConfigError> {
        let resolve = &self.resolve;
        if !(0.0..=1.0).contains(&resolve.min_confidence) {
            return Err(ConfigError::new(format!(
                "resolve.min_confidence must be between 0.0 and 1.0, got {}",
                resolve.min_confidence
            )));
        }
        for kind in StrategyKind::ALL {
            let value = self.confidence.get(kind);
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::new(format!(
                    "confidence.{}: must be between 0.0 and 1.0, got {value}",
                    kind.as_str().replace('-', "_")
                )));
            }
        }
        reject_unimplemented("resolve.fallback", resolve.fallback)?;

        let mut overrides = BTreeMap::new();
        for (code, &kind) in &resolve.overrides {
            let code: ConflictCode = code
                .parse()
                .map_err(|e| ConfigError::new(format!("resolve.overrides: {e}")))?;
            reject_unimplemented(&format!("resolve.overrides.\"{code}\""), kind)?;
            overrides.insert(code, kind);
        }

        Ok(ResolveOptions {
            auto_resolve: resolve.auto_resolve,
            min_confidence: resolve.min_confidence,
            overrides,
            fail_on_unresolved: resolve.fail_on_unresolved,
            ..ResolveOptions::default()
        }
        .with_fallback_kind(resolve.fallback))
    }

    /// A resolution engine with the built-in strategies.
    ///
    /// # Errors
    /// As [`resolve_options`](Self::resolve_options).
    pub fn engine(&self) -> Result<ResolutionEngine, ConfigError> {
        Ok(ResolutionEngine::new(self.resolve_options()?, &self.confidence))
    }
}

/// `merge` is named in the confidence table but has no built-in
/// implementation, so selecting it from configuration can never work.
fn reject_unimplemented(key: &str, kind: StrategyKind) -> Result<(), ConfigError> {
    if kind == StrategyKind::Merge {
        return Err(ConfigError::new(format!(
            "{key}: strategy `{kind}` has no implementation"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Error loading a merge configuration file.
#[derive(Debug)]
pub struct ConfigError {
    /// The path that was being loaded (if available).
    pub path: Option<PathBuf>,
    /// Human-readable message with line-level detail when possible.
    pub message: String,
}

impl ConfigError {
    fn new(message: String) -> Self {
        Self { path: None, message }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = &self.path {
            write!(f, "{}: {}", p.display(), self.message)
        } else {
            write!(f, "config error: {}", self.message)
        }
    }
}

impl std::error::Error for ConfigError {}

impl MergeConfig {
    /// Load configuration from a TOML file.
    ///
    /// - If the file does not exist, returns all defaults (not an error).
    /// - If the file exists but is invalid, returns a [`ConfigError`] with
    ///   line-level detail.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O errors (other than not-found), parse
    /// errors, or settings rejected by [`resolve_options`](Self::resolve_options).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    message: format!("could not read file: {e}"),
                });
            }
        };
        Self::parse(&contents).map_err(|mut e| {
            e.path = Some(path.to_owned());
            e
        })
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigError` on invalid TOML, unknown fields, or invalid settings.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| {
            let mut message = e.message().to_owned();
            if let Some(span) = e.span() {
                let line = toml_str[..span.start].chars().filter(|&c| c == '\n').count() + 1;
                message = format!("line {line}: {message}");
            }
            ConfigError::new(message)
        })?;
        config.resolve_options()?;
        Ok(config)
    }
}
