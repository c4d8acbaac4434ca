//! Error types for the merge core.
//!
//! Two tiers:
//!
//! - **Recoverable** ([`PatchError`], [`OperationError`]): expected outcomes such
//!   as a missing node or an out-of-range index. Callers branch on them.
//! - **Fatal** ([`IndexError`], [`MergeError`]): the inputs are mutually
//!   inconsistent (missing identities, a sibling order that no longer matches
//!   the document, a strategy with no implementation). These abort the merge.

use thiserror::Error;

use crate::model::conflict::{ConflictCode, StrategyKind};
use crate::model::document::NodeId;
use crate::model::path::NodePath;

/// Errors raised while indexing a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// A node has an empty identity.
    #[error("node at {path} has no identity")]
    MissingIdentity {
        /// Where the node sits.
        path: NodePath,
    },

    /// The same identity occurs at two places in one document.
    #[error("node `{id}` appears at both {first} and {second}")]
    DuplicateIdentity {
        id: NodeId,
        first: NodePath,
        second: NodePath,
    },
}

/// Errors from the patch interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    /// The pointer string is not a valid absolute pointer.
    #[error("invalid pointer `{pointer}`")]
    InvalidPointer { pointer: String },

    /// Nothing exists at the pointer (or at its parent).
    #[error("no value at `{pointer}`")]
    NotFound { pointer: String },

    /// An array index is past the end of the array.
    #[error("index {index} out of bounds at `{pointer}` (length {len})")]
    IndexOutOfBounds {
        pointer: String,
        index: usize,
        len: usize,
    },

    /// An array was addressed with something that is not an index.
    #[error("`{segment}` is not an array index at `{pointer}`")]
    InvalidIndex { pointer: String, segment: String },

    /// The parent of the target is neither an object nor an array.
    #[error("parent of `{pointer}` is not a container")]
    NotAContainer { pointer: String },

    /// The document root itself cannot be removed.
    #[error("cannot remove the document root")]
    RootRemoval,

    /// The patched value no longer has the document shape.
    #[error("patched document is malformed: {message}")]
    Malformed { message: String },
}

/// Errors from node operations (`create`, `update`, `delete`, `move`).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OperationError {
    #[error("node `{id}` not found")]
    NodeNotFound { id: NodeId },

    /// The parent path does not address a node array.
    #[error("{path} is not a node array")]
    ParentNotArray { path: NodePath },

    #[error("index {index} out of bounds for {path} (length {len})")]
    IndexOutOfBounds {
        path: NodePath,
        index: usize,
        len: usize,
    },

    /// An update tried to change a field that cannot be changed in place.
    #[error("cannot update `{field}`: {reason}")]
    InvalidUpdate { field: String, reason: String },

    /// A node cannot be moved into its own subtree.
    #[error("cannot move node `{id}` into its own subtree")]
    MoveIntoSelf { id: NodeId },

    #[error(transparent)]
    Patch(#[from] PatchError),
}

/// Fatal errors that abort conflict detection or resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("indexing failed: {0}")]
    Index(#[from] IndexError),

    /// The strategy table selected a strategy that has no implementation.
    #[error("strategy `{strategy}` selected for {code} has no implementation; configure a different strategy")]
    StrategyNotImplemented {
        strategy: StrategyKind,
        code: ConflictCode,
    },

    /// An `S-ORDER` resolution no longer matches the live children array.
    #[error("sibling order for `{parent}` does not match the document: {reason}")]
    OrderMismatch { parent: NodeId, reason: String },

    /// A conflict path that cannot be navigated at all.
    #[error("malformed path {path}: {reason}")]
    MalformedPath { path: NodePath, reason: String },
}
