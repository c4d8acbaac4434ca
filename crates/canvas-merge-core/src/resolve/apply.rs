//! Writing resolved values into the working copy of the target document.
//!
//! Nodes are located by identity, not by the detection-time path: the path
//! only contributes its field part (`["style", "fills"]`) and, for nodes that
//! have to be re-inserted, the slot they occupied. Earlier resolutions may
//! have moved things around, so identity is the only stable address.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use super::MergeResolution;
use crate::error::{MergeError, OperationError, PatchError};
use crate::model::conflict::{Conflict, ConflictCode, ConflictValue};
use crate::model::document::{Document, Node};
use crate::model::path::{CHILDREN, NodePath, PathSegment};
use crate::ops::{delete_node, find_node_by_id, find_node_mut, move_node, node_at};
use crate::patch::{self, PatchOp};

/// Why a resolution could not be applied.
#[derive(Debug)]
pub(super) enum ApplyError {
    /// The resolution stays unapplied; the merge goes on.
    Skipped(OperationError),
    /// The documents and the conflict list disagree; the merge aborts.
    Fatal(MergeError),
}

impl From<OperationError> for ApplyError {
    fn from(err: OperationError) -> Self {
        Self::Skipped(err)
    }
}

impl From<PatchError> for ApplyError {
    fn from(err: PatchError) -> Self {
        Self::Skipped(OperationError::Patch(err))
    }
}

impl From<MergeError> for ApplyError {
    fn from(err: MergeError) -> Self {
        Self::Fatal(err)
    }
}

/// Write `resolution`'s value into `doc`.
pub(super) fn apply(doc: &mut Document, resolution: &MergeResolution) -> Result<(), ApplyError> {
    let conflict = &resolution.conflict;
    let value = resolution.resolved_value.as_ref();
    match conflict.code {
        ConflictCode::Order => reorder(doc, conflict, value).map_err(ApplyError::Fatal),
        ConflictCode::DeleteModify | ConflictCode::AddAdd => place_node(doc, conflict, value),
        ConflictCode::MoveMove => reparent(doc, conflict, value),
        ConflictCode::Geometry
        | ConflictCode::Visibility
        | ConflictCode::Layout
        | ConflictCode::Style
        | ConflictCode::Text
        | ConflictCode::ComponentProps
        | ConflictCode::Name => set_field(doc, conflict, value),
    }
}

fn wrong_payload(expected: &str) -> ApplyError {
    ApplyError::Skipped(OperationError::InvalidUpdate {
        field: "value".to_owned(),
        reason: format!("expected {expected}"),
    })
}

// ---------------------------------------------------------------------------
// S-ORDER
// ---------------------------------------------------------------------------

/// Rewrite the parent's children to the resolved order. All or nothing.
fn reorder(doc: &mut Document, conflict: &Conflict, value: Option<&ConflictValue>) -> Result<(), MergeError> {
    let mismatch = |reason: String| MergeError::OrderMismatch {
        parent: conflict.node_id.clone(),
        reason,
    };
    let Some(ConflictValue::Order(order)) = value else {
        return Err(mismatch("resolved value is not a sibling order".to_owned()));
    };
    let parent = find_node_mut(doc, &conflict.node_id)
        .ok_or_else(|| mismatch("parent is not in the target document".to_owned()))?;
    let children = parent
        .children
        .as_mut()
        .ok_or_else(|| mismatch("parent has no children".to_owned()))?;
    if order.len() != children.len() {
        return Err(mismatch(format!(
            "order lists {} children, the document has {}",
            order.len(),
            children.len()
        )));
    }

    let mut positions = Vec::with_capacity(order.len());
    let mut seen = BTreeSet::new();
    for id in order {
        let position = children
            .iter()
            .position(|child| &child.id == id)
            .ok_or_else(|| mismatch(format!("child `{id}` is not in the document")))?;
        if !seen.insert(position) {
            return Err(mismatch(format!("child `{id}` is listed twice")));
        }
        positions.push(position);
    }

    let mut slots: Vec<Option<Node>> = std::mem::take(children).into_iter().map(Some).collect();
    *children = positions
        .into_iter()
        .filter_map(|p| slots.get_mut(p).and_then(Option::take))
        .collect();
    Ok(())
}

// ---------------------------------------------------------------------------
// S-DEL-MOD / S-ADD-ADD
// ---------------------------------------------------------------------------

/// Replace the node by identity, insert it at the conflict slot if the
/// target lacks it, or delete it when the resolved value is absent.
fn place_node(doc: &mut Document, conflict: &Conflict, value: Option<&ConflictValue>) -> Result<(), ApplyError> {
    match value {
        Some(ConflictValue::Node(node)) => {
            if let Some(existing) = find_node_mut(doc, &node.id) {
                existing.clone_from(node);
                return Ok(());
            }
            insert_at(doc, &conflict.path, node.as_ref().clone())
        }
        Some(_) => Err(wrong_payload("a node")),
        None => {
            if find_node_by_id(doc, &conflict.node_id).is_some() {
                *doc = delete_node(doc, &conflict.node_id)?.document;
            }
            Ok(())
        }
    }
}

fn insert_at(doc: &mut Document, path: &NodePath, node: Node) -> Result<(), ApplyError> {
    let malformed = |reason: &str| MergeError::MalformedPath {
        path: path.clone(),
        reason: reason.to_owned(),
    };
    let (array_path, index) = path
        .split_last_index()
        .ok_or_else(|| malformed("does not end in a node index"))?;
    if array_path.is_empty() {
        let index = index.min(doc.artboards.len());
        doc.artboards.insert(index, node);
        return Ok(());
    }

    let (owner_path, field) = array_path.split_node_prefix();
    if field.segments() != [PathSegment::Field(CHILDREN.to_owned())] {
        return Err(malformed("does not address a children array").into());
    }
    let owner_id = node_at(doc, &owner_path)
        .map(|owner| owner.id.clone())
        .ok_or_else(|| OperationError::ParentNotArray {
            path: array_path.clone(),
        })?;
    let owner = find_node_mut(doc, &owner_id).ok_or(OperationError::NodeNotFound { id: owner_id })?;
    if owner.children.is_none() && !owner.kind.is_container() {
        return Err(OperationError::ParentNotArray { path: array_path }.into());
    }
    let children = owner.children.get_or_insert_with(Vec::new);
    children.insert(index.min(children.len()), node);
    Ok(())
}

// ---------------------------------------------------------------------------
// S-MOVE-MOVE
// ---------------------------------------------------------------------------

/// Move the node to the end of the resolved parent's children, or to the
/// artboard list when the resolved parent is absent.
fn reparent(doc: &mut Document, conflict: &Conflict, value: Option<&ConflictValue>) -> Result<(), ApplyError> {
    let destination = match value {
        Some(ConflictValue::Parent(parent)) => Some(parent),
        Some(_) => return Err(wrong_payload("a parent identity")),
        None => None,
    };
    let id = &conflict.node_id;
    let found = find_node_by_id(doc, id).ok_or_else(|| OperationError::NodeNotFound { id: id.clone() })?;
    let current = owner_path(&found.path)
        .and_then(|path| node_at(doc, &path))
        .map(|owner| owner.id.clone());
    if current.as_ref() == destination {
        return Ok(());
    }

    let (array_path, len) = match destination {
        Some(parent) => {
            let owner = find_node_by_id(doc, parent).ok_or_else(|| OperationError::NodeNotFound { id: parent.clone() })?;
            (owner.path.children(), owner.node.children().len())
        }
        None => (NodePath::root(), doc.artboards.len()),
    };
    *doc = move_node(doc, id, &array_path, len)?.document;
    Ok(())
}

/// Path of the node owning the node at `path`, or `None` for a root.
fn owner_path(path: &NodePath) -> Option<NodePath> {
    let segments = path.segments();
    (segments.len() > 2).then(|| NodePath::from_segments(segments[..segments.len() - 2].to_vec()))
}

// ---------------------------------------------------------------------------
// Field conflicts
// ---------------------------------------------------------------------------

/// Set (or remove) the field addressed by the conflict path's field part on
/// the node with the conflict's identity. Missing intermediate objects are
/// created.
fn set_field(doc: &mut Document, conflict: &Conflict, value: Option<&ConflictValue>) -> Result<(), ApplyError> {
    let (_, suffix) = conflict.path.split_node_prefix();
    if suffix.segments().first().is_none_or(|s| s.as_index().is_some()) {
        return Err(MergeError::MalformedPath {
            path: conflict.path.clone(),
            reason: "does not address a node field".to_owned(),
        }
        .into());
    }
    let node = find_node_mut(doc, &conflict.node_id).ok_or_else(|| OperationError::NodeNotFound {
        id: conflict.node_id.clone(),
    })?;

    let mut tree = serde_json::to_value(&*node).map_err(malformed)?;
    let pointer = suffix.to_pointer();
    let mut ops = Vec::new();
    for depth in 1..suffix.len() {
        let prefix = NodePath::from_segments(suffix.segments()[..depth].to_vec()).to_pointer();
        if patch::get(&tree, &prefix).is_none() {
            ops.push(PatchOp::add(prefix, Value::Object(Map::new())));
        }
    }
    match value {
        Some(value) => ops.push(PatchOp::add(pointer, value.to_json().map_err(malformed)?)),
        None if patch::get(&tree, &pointer).is_some() => ops.push(PatchOp::remove(pointer)),
        None => {}
    }

    patch::apply_to_value(&mut tree, &ops)?;
    *node = serde_json::from_value(tree).map_err(malformed)?;
    Ok(())
}

fn malformed(err: serde_json::Error) -> PatchError {
    PatchError::Malformed {
        message: err.to_string(),
    }
}
