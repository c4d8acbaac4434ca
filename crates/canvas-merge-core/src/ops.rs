//! Node operations on immutable documents.
//!
//! Every mutating operation returns a new [`Document`] together with the
//! forward patch list that produced it and the inverse list that undoes it.
//! Applying `patches` to the input and then `inverse_patches` to the result
//! yields a document equal to the input, so an editor can implement undo and
//! redo by replaying stored patch lists.
//!
//! Expected failures (missing node, bad parent path, index out of range) are
//! returned as [`OperationError`]; nothing here panics on user data.

use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::error::{OperationError, PatchError};
use crate::id::IdGenerator;
use crate::model::document::{Document, Node, NodeId};
use crate::model::path::{CHILDREN, NodePath, PathSegment};
use crate::patch::{PatchOp, apply_patch};

/// A node located by [`find_node_by_id`].
#[derive(Clone, Debug, PartialEq)]
pub struct FoundNode<'a> {
    pub node: &'a Node,
    pub path: NodePath,
    /// Index of the artboard that owns the node.
    pub artboard_index: usize,
}

/// Outcome of a mutating operation.
#[derive(Clone, Debug, PartialEq)]
pub struct OperationResult {
    /// The node the operation acted on (the new node for `create`).
    pub node_id: NodeId,
    pub document: Document,
    pub patches: Vec<PatchOp>,
    pub inverse_patches: Vec<PatchOp>,
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Depth-first search for `id` across every artboard.
#[must_use]
pub fn find_node_by_id<'a>(document: &'a Document, id: &NodeId) -> Option<FoundNode<'a>> {
    document.artboards.iter().enumerate().find_map(|(i, artboard)| {
        find_in(artboard, id, NodePath::artboard(i)).map(|(node, path)| FoundNode {
            node,
            path,
            artboard_index: i,
        })
    })
}

fn find_in<'a>(node: &'a Node, id: &NodeId, path: NodePath) -> Option<(&'a Node, NodePath)> {
    if &node.id == id {
        return Some((node, path));
    }
    node.children()
        .iter()
        .enumerate()
        .find_map(|(i, child)| find_in(child, id, path.child(i)))
}

/// Mutable variant of [`find_node_by_id`], without path bookkeeping.
pub(crate) fn find_node_mut<'a>(document: &'a mut Document, id: &NodeId) -> Option<&'a mut Node> {
    document.artboards.iter_mut().find_map(|artboard| find_in_mut(artboard, id))
}

fn find_in_mut<'a>(node: &'a mut Node, id: &NodeId) -> Option<&'a mut Node> {
    if &node.id == id {
        return Some(node);
    }
    node.children
        .as_mut()?
        .iter_mut()
        .find_map(|child| find_in_mut(child, id))
}

/// The node addressed by a node path (`[artboard, ("children", i)*]`).
#[must_use]
pub fn node_at<'a>(document: &'a Document, path: &NodePath) -> Option<&'a Node> {
    let (first, rest) = path.segments().split_first()?;
    let mut node = document.artboards.get(first.as_index()?)?;
    for hop in rest.chunks(2) {
        match hop {
            [field, PathSegment::Index(i)] if field.is_field(CHILDREN) => {
                node = node.children().get(*i)?;
            }
            _ => return None,
        }
    }
    Some(node)
}

/// A node array addressed by a parent path.
struct NodeArray<'a> {
    /// The array's own path (`[]` for the artboard list).
    path: NodePath,
    nodes: &'a [Node],
    /// The owning container has no `children` field yet.
    missing: bool,
}

impl NodeArray<'_> {
    /// Patches that create the array if needed, and their inverses (in undo order).
    fn ensure(&self) -> (Vec<PatchOp>, Vec<PatchOp>) {
        if self.missing {
            (
                vec![PatchOp::add(self.path.to_pointer(), Value::Array(Vec::new()))],
                vec![PatchOp::remove(self.path.to_pointer())],
            )
        } else {
            (Vec::new(), Vec::new())
        }
    }
}

fn node_array<'a>(document: &'a Document, parent_path: &NodePath) -> Result<NodeArray<'a>, OperationError> {
    if parent_path.is_empty() {
        return Ok(NodeArray {
            path: NodePath::root(),
            nodes: &document.artboards,
            missing: false,
        });
    }
    let not_array = || OperationError::ParentNotArray {
        path: parent_path.clone(),
    };
    let (node_path, field) = parent_path.split_node_prefix();
    if field.segments() != [PathSegment::Field(CHILDREN.to_owned())] {
        return Err(not_array());
    }
    let owner = node_at(document, &node_path).ok_or_else(not_array)?;
    match &owner.children {
        Some(children) => Ok(NodeArray {
            path: parent_path.clone(),
            nodes: children,
            missing: false,
        }),
        None if owner.kind.is_container() => Ok(NodeArray {
            path: parent_path.clone(),
            nodes: &[],
            missing: true,
        }),
        None => Err(not_array()),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, OperationError> {
    serde_json::to_value(value).map_err(|e| {
        OperationError::Patch(PatchError::Malformed {
            message: e.to_string(),
        })
    })
}

// ---------------------------------------------------------------------------
// create
// ---------------------------------------------------------------------------

/// Append `node` to the node array at `parent_path` under a fresh identity.
///
/// `parent_path` addresses a `children` array (`[0, "children"]`) or, when
/// empty, the artboard list. Any identity already on `node` is replaced.
///
/// # Errors
/// [`OperationError::ParentNotArray`] when `parent_path` does not address a
/// node array.
#[instrument(skip_all, fields(parent = %parent_path))]
pub fn create_node(
    document: &Document,
    parent_path: &NodePath,
    mut node: Node,
    ids: &dyn IdGenerator,
) -> Result<OperationResult, OperationError> {
    let array = node_array(document, parent_path)?;
    node.id = ids.next_id();
    let slot = array.path.slot_pointer(Some(array.nodes.len()));

    let (mut patches, mut inverse_patches) = array.ensure();
    patches.push(PatchOp::add(slot.clone(), to_json(&node)?));
    inverse_patches.insert(0, PatchOp::remove(slot));

    let document = apply_patch(document, &patches)?;
    debug!(node = %node.id, "created node");
    Ok(OperationResult {
        node_id: node.id,
        document,
        patches,
        inverse_patches,
    })
}

// ---------------------------------------------------------------------------
// update
// ---------------------------------------------------------------------------

/// Apply field-level `updates` (camelCase node field → new value) to a node.
///
/// One patch is emitted per field whose value actually changes. A `null`
/// value removes an optional field. Inverse patches carry the prior values.
///
/// # Errors
/// [`OperationError::NodeNotFound`] if `id` is absent,
/// [`OperationError::InvalidUpdate`] for an attempt to change the identity
/// or a key that is not a node field (see [`Node::FIELDS`]), and [`OperationError::Patch`] if a value does not fit the node shape.
#[instrument(skip_all, fields(node = %id))]
pub fn update_node(
    document: &Document,
    id: &NodeId,
    updates: &Map<String, Value>,
) -> Result<OperationResult, OperationError> {
    let found = find_node_by_id(document, id).ok_or_else(|| OperationError::NodeNotFound { id: id.clone() })?;
    if updates.contains_key("id") {
        return Err(OperationError::InvalidUpdate {
            field: "id".to_owned(),
            reason: "node identity is immutable".to_owned(),
        });
    }
    if let Some(field) = updates.keys().find(|key| !Node::FIELDS.contains(&key.as_str())) {
        return Err(OperationError::InvalidUpdate {
            field: field.clone(),
            reason: "not a node field".to_owned(),
        });
    }
    let prior = to_json(found.node)?;

    let mut patches = Vec::new();
    let mut inverse_patches = Vec::new();
    for (field, next) in updates {
        let pointer = found.path.field(field).to_pointer();
        match (prior.get(field), next) {
            (None, Value::Null) => {}
            (Some(old), next) if old == next => {}
            (Some(old), Value::Null) => {
                patches.push(PatchOp::remove(pointer.clone()));
                inverse_patches.push(PatchOp::add(pointer, old.clone()));
            }
            (Some(old), next) => {
                patches.push(PatchOp::replace(pointer.clone(), next.clone()));
                inverse_patches.push(PatchOp::replace(pointer, old.clone()));
            }
            (None, next) => {
                patches.push(PatchOp::add(pointer.clone(), next.clone()));
                inverse_patches.push(PatchOp::remove(pointer));
            }
        }
    }
    inverse_patches.reverse();

    let document = apply_patch(document, &patches)?;
    debug!(changed = patches.len(), "updated node");
    Ok(OperationResult {
        node_id: id.clone(),
        document,
        patches,
        inverse_patches,
    })
}

// ---------------------------------------------------------------------------
// delete
// ---------------------------------------------------------------------------

/// Remove a node (and its subtree).
///
/// # Errors
/// [`OperationError::NodeNotFound`] if `id` is absent.
#[instrument(skip_all, fields(node = %id))]
pub fn delete_node(document: &Document, id: &NodeId) -> Result<OperationResult, OperationError> {
    let found = find_node_by_id(document, id).ok_or_else(|| OperationError::NodeNotFound { id: id.clone() })?;
    let pointer = found.path.to_pointer();
    let prior = to_json(found.node)?;

    let patches = vec![PatchOp::remove(pointer.clone())];
    let inverse_patches = vec![PatchOp::add(pointer, prior)];
    let document = apply_patch(document, &patches)?;
    debug!("deleted node");
    Ok(OperationResult {
        node_id: id.clone(),
        document,
        patches,
        inverse_patches,
    })
}

// ---------------------------------------------------------------------------
// move
// ---------------------------------------------------------------------------

/// Move a node to position `new_index` of the node array at `new_parent_path`.
///
/// `new_parent_path` and `new_index` are read against the input document,
/// with the node itself already taken out of its old array (so moving within
/// one array uses indices of the array without the moved node).
///
/// # Errors
/// [`OperationError::NodeNotFound`], [`OperationError::ParentNotArray`],
/// [`OperationError::MoveIntoSelf`] or [`OperationError::IndexOutOfBounds`].
#[instrument(skip_all, fields(node = %id, parent = %new_parent_path, index = new_index))]
pub fn move_node(
    document: &Document,
    id: &NodeId,
    new_parent_path: &NodePath,
    new_index: usize,
) -> Result<OperationResult, OperationError> {
    let found = find_node_by_id(document, id).ok_or_else(|| OperationError::NodeNotFound { id: id.clone() })?;
    let (owner_path, _) = new_parent_path.split_node_prefix();
    if !new_parent_path.is_empty() && (owner_path == found.path || found.path.is_ancestor_of(&owner_path)) {
        return Err(OperationError::MoveIntoSelf { id: id.clone() });
    }
    let target = node_array(document, new_parent_path)?;
    let (old_array, old_index) = found
        .path
        .split_last_index()
        .ok_or_else(|| OperationError::ParentNotArray {
            path: found.path.clone(),
        })?;

    let same_array = old_array == target.path;
    let len_after_removal = target.nodes.len() - usize::from(same_array);
    if new_index > len_after_removal {
        return Err(OperationError::IndexOutOfBounds {
            path: new_parent_path.clone(),
            index: new_index,
            len: len_after_removal,
        });
    }

    let shifted = NodeArray {
        path: shift_after_removal(&target.path, &old_array, old_index),
        nodes: target.nodes,
        missing: target.missing,
    };
    let old_pointer = found.path.to_pointer();
    let new_pointer = shifted.path.slot_pointer(Some(new_index));
    let value = to_json(found.node)?;

    let (ensure, unensure) = shifted.ensure();
    let mut patches = vec![PatchOp::remove(old_pointer.clone())];
    patches.extend(ensure);
    patches.push(PatchOp::add(new_pointer.clone(), value.clone()));

    let mut inverse_patches = vec![PatchOp::remove(new_pointer)];
    inverse_patches.extend(unensure);
    inverse_patches.push(PatchOp::add(old_pointer, value));

    let document = apply_patch(document, &patches)?;
    debug!(from = %found.path, "moved node");
    Ok(OperationResult {
        node_id: id.clone(),
        document,
        patches,
        inverse_patches,
    })
}

/// Rewrite `path` as it reads once the element at `removed_index` of
/// `removed_from` is gone.
fn shift_after_removal(path: &NodePath, removed_from: &NodePath, removed_index: usize) -> NodePath {
    let depth = removed_from.len();
    let segments = path.segments();
    let inside = segments.len() > depth && segments[..depth] == *removed_from.segments();
    match segments.get(depth) {
        Some(PathSegment::Index(i)) if inside && *i > removed_index => {
            let mut shifted = segments.to_vec();
            shifted[depth] = PathSegment::Index(i - 1);
            NodePath::from_segments(shifted)
        }
        _ => path.clone(),
    }
}
