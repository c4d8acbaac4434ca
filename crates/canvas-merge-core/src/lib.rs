//! Three-way merge core for layered design documents.
//!
//! A document is a list of artboards, each a tree of identity-carrying nodes.
//! Given a common ancestor (`base`) and two divergent edits (`local`,
//! `remote`), this crate
//!
//! 1. indexes each version by node identity ([`index`]),
//! 2. detects structural, property, content and metadata conflicts
//!    ([`detect`]),
//! 3. resolves them with configurable strategies and applies the confident
//!    ones to a copy of the target version ([`ResolutionEngine`]).
//!
//! Independently of merging, [`ops`] offers reversible node operations
//! (create, update, delete, move) that return forward and inverse patch lists
//! for undo/redo, built on the small patch interpreter in [`patch`].
//!
//! Nothing here performs I/O or installs a tracing subscriber; events are
//! emitted through `tracing` for the host to collect.

pub mod detect;
pub mod error;
pub mod id;
pub mod index;
pub mod model;
pub mod ops;
pub mod patch;
pub mod resolve;

pub use detect::{DetectOptions, DetectionReport, detect};
pub use error::{IndexError, MergeError, OperationError, PatchError};
pub use id::{IdGenerator, SequenceGenerator, UlidGenerator};
pub use index::{NodeIndex, NodeSnapshot, index};
pub use model::{Conflict, ConflictCode, ConflictValue, Document, Node, NodeId, NodePath, StrategyKind};
pub use ops::{FoundNode, OperationResult, create_node, delete_node, find_node_by_id, move_node, update_node};
pub use patch::{PatchOp, apply_patch};
pub use resolve::{
    ConfidenceTable, MergeContext, MergeResolution, MergeResult, MergeTarget, ResolutionEngine, ResolutionStrategy,
    ResolveOptions, StrategyRegistry,
};
