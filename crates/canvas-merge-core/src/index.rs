//! Node indexer: flattens one document into identity-addressed snapshots.
//!
//! The index borrows from the document it was built from and is rebuilt for
//! every merge. It records, for each node, where it sits ([`NodePath`]) and
//! which node owns it, plus each parent's children in document order.

use std::collections::BTreeMap;

use crate::error::IndexError;
use crate::model::document::{Document, Node, NodeId};
use crate::model::path::NodePath;

/// One node as seen in one document version.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeSnapshot<'a> {
    pub id: &'a NodeId,
    pub node: &'a Node,
    pub path: NodePath,
    /// `None` for artboard-level root nodes.
    pub parent: Option<&'a NodeId>,
}

impl NodeSnapshot<'_> {
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Flattened view of one document.
#[derive(Clone, Debug, Default)]
pub struct NodeIndex<'a> {
    nodes: BTreeMap<&'a NodeId, NodeSnapshot<'a>>,
    children: BTreeMap<&'a NodeId, Vec<&'a NodeId>>,
}

impl<'a> NodeIndex<'a> {
    /// Look up a node by identity.
    #[must_use]
    pub fn get(&self, id: &NodeId) -> Option<&NodeSnapshot<'a>> {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of indexed nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All identities in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &'a NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// All snapshots in identity order.
    pub fn snapshots(&self) -> impl Iterator<Item = &NodeSnapshot<'a>> {
        self.nodes.values()
    }

    /// Identities of every node that owns at least one child.
    pub fn parents(&self) -> impl Iterator<Item = &'a NodeId> + '_ {
        self.children.keys().copied()
    }

    /// Child identities of `parent`, in document order.
    #[must_use]
    pub fn children_of(&self, parent: &NodeId) -> Option<&[&'a NodeId]> {
        self.children.get(parent).map(Vec::as_slice)
    }

    /// Child snapshots of `parent`, in document order.
    pub fn child_snapshots(&self, parent: &NodeId) -> impl Iterator<Item = &NodeSnapshot<'a>> {
        self.children
            .get(parent)
            .into_iter()
            .flatten()
            .filter_map(|id| self.nodes.get(*id))
    }
}

/// Build the index for `document`.
///
/// # Errors
/// Returns [`IndexError::MissingIdentity`] for a node with an empty identity
/// and [`IndexError::DuplicateIdentity`] when an identity occurs twice.
pub fn index(document: &Document) -> Result<NodeIndex<'_>, IndexError> {
    let mut out = NodeIndex::default();
    for (i, artboard) in document.artboards.iter().enumerate() {
        visit(&mut out, artboard, NodePath::artboard(i), None)?;
    }
    Ok(out)
}

fn visit<'a>(
    out: &mut NodeIndex<'a>,
    node: &'a Node,
    path: NodePath,
    parent: Option<&'a NodeId>,
) -> Result<(), IndexError> {
    if node.id.is_empty() {
        return Err(IndexError::MissingIdentity { path });
    }
    if let Some(existing) = out.nodes.get(&node.id) {
        return Err(IndexError::DuplicateIdentity {
            id: node.id.clone(),
            first: existing.path.clone(),
            second: path,
        });
    }
    if let Some(parent) = parent {
        out.children.entry(parent).or_default().push(&node.id);
    }
    out.nodes.insert(
        &node.id,
        NodeSnapshot {
            id: &node.id,
            node,
            path: path.clone(),
            parent,
        },
    );
    for (i, child) in node.children().iter().enumerate() {
        visit(out, child, path.child(i), Some(&node.id))?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::all, clippy::pedantic, clippy::nursery)]
pub(crate) mod tests {
    use super::*;
    use crate::model::document::{NodeType, Rect};
    use crate::ops::node_at;

    fn leaf(id: &str) -> Node {
        Node::new(id, NodeType::Vector, id, Rect::default())
    }

    fn sample() -> Document {
        Document::new(vec![
            Node::frame(
                "A1",
                "Artboard",
                Rect::default(),
                vec![
                    leaf("N1"),
                    Node::frame("F1", "Card", Rect::default(), vec![leaf("N2"), leaf("N3")]),
                ],
            ),
            Node::frame("A2", "Second", Rect::default(), vec![]),
        ])
    }

    #[test]
    fn records_paths_and_parents() {
        let doc = sample();
        let idx = index(&doc).unwrap();
        assert_eq!(idx.len(), 6);

        let n3 = idx.get(&"N3".into()).unwrap();
        assert_eq!(n3.path, NodePath::artboard(0).child(1).child(1));
        assert_eq!(n3.parent.map(NodeId::as_str), Some("F1"));

        let a2 = idx.get(&"A2".into()).unwrap();
        assert!(a2.is_root());
        assert_eq!(a2.path, NodePath::artboard(1));
    }

    #[test]
    fn groups_children_in_document_order() {
        let doc = sample();
        let idx = index(&doc).unwrap();
        let kids: Vec<_> = idx.children_of(&"A1".into()).unwrap().iter().map(|id| id.as_str()).collect();
        assert_eq!(kids, vec!["N1", "F1"]);
        // Empty containers do not appear as parents.
        assert!(idx.children_of(&"A2".into()).is_none());
        let snaps: Vec<_> = idx.child_snapshots(&"F1".into()).map(|s| s.id.as_str()).collect();
        assert_eq!(snaps, vec!["N2", "N3"]);
    }

    #[test]
    fn empty_identity_is_rejected() {
        let doc = Document::new(vec![Node::frame("A", "a", Rect::default(), vec![leaf("")])]);
        let err = index(&doc).unwrap_err();
        assert_eq!(
            err,
            IndexError::MissingIdentity {
                path: NodePath::artboard(0).child(0)
            }
        );
    }

    #[test]
    fn duplicate_identity_is_rejected() {
        let doc = Document::new(vec![Node::frame("A", "a", Rect::default(), vec![leaf("X"), leaf("X")])]);
        assert!(matches!(index(&doc), Err(IndexError::DuplicateIdentity { .. })));
    }

    // -- property tests --

    use proptest::prelude::*;

    /// Arbitrary document with unique identities `N0`, `N1`, ...
    pub(crate) fn arb_document() -> impl Strategy<Value = Document> {
        // artboards → frames per artboard → leaves per frame
        prop::collection::vec(prop::collection::vec(0_usize..4, 0..4), 1..3).prop_map(|artboards| {
            let mut next = 0_usize;
            let mut fresh = || {
                next += 1;
                format!("N{next}")
            };
            let roots = artboards
                .into_iter()
                .map(|sizes| {
                    let children = sizes
                        .into_iter()
                        .map(|n| {
                            let grandchildren = (0..n).map(|_| leaf(&fresh())).collect();
                            Node::frame(fresh(), "frame", Rect::default(), grandchildren)
                        })
                        .collect();
                    Node::frame(fresh(), "artboard", Rect::default(), children)
                })
                .collect();
            Document::new(roots)
        })
    }

    proptest! {
        #[test]
        fn prop_every_path_resolves_to_its_node(doc in arb_document()) {
            let idx = index(&doc).unwrap();
            for snap in idx.snapshots() {
                let found = node_at(&doc, &snap.path);
                prop_assert_eq!(found.map(|n| &n.id), Some(snap.id));
                match snap.parent {
                    Some(parent) => {
                        let kids = idx.children_of(parent).unwrap();
                        prop_assert_eq!(kids.iter().filter(|k| **k == snap.id).count(), 1);
                    }
                    None => prop_assert_eq!(snap.path.len(), 1),
                }
            }
        }
    }
}
