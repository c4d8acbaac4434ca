//! Structural pass: `S-DEL-MOD`, `S-ADD-ADD`, `S-MOVE-MOVE` and `S-ORDER`.

use std::collections::BTreeSet;

use super::{DetectionReport, ThreeWay, describe, diverged};
use crate::index::NodeSnapshot;
use crate::model::conflict::{Conflict, ConflictCode, ConflictValue};
use crate::model::document::{NodeId, NodeType};

pub(super) fn detect(docs: &ThreeWay<'_>, report: &mut DetectionReport) {
    let ids: BTreeSet<&NodeId> = docs
        .base
        .ids()
        .chain(docs.local.ids())
        .chain(docs.remote.ids())
        .collect();

    for id in ids {
        match (docs.base.get(id), docs.local.get(id), docs.remote.get(id)) {
            // Deleted on one side, still present (and not a root) on the other.
            (Some(base), None, Some(remote)) if !remote.is_root() => {
                report.conflicts.push(delete_modify(base, remote, true));
            }
            (Some(base), Some(local), None) if !local.is_root() => {
                report.conflicts.push(delete_modify(base, local, false));
            }
            (None, Some(local), Some(remote)) if !local.is_root() && !remote.is_root() => {
                report.conflicts.push(add_add(local, remote));
            }
            (Some(base), Some(local), Some(remote)) => {
                if diverged(&base.parent, &local.parent, &remote.parent) {
                    concurrent_move(base, local, remote, report);
                }
            }
            _ => {}
        }
    }

    detect_order(docs, &mut report.conflicts);
}

fn node_value(snapshot: &NodeSnapshot<'_>) -> Option<ConflictValue> {
    Some(ConflictValue::Node(Box::new(snapshot.node.clone())))
}

fn parent_value(snapshot: &NodeSnapshot<'_>) -> Option<ConflictValue> {
    snapshot.parent.map(|p| ConflictValue::Parent(p.clone()))
}

fn delete_modify(base: &NodeSnapshot<'_>, survivor: &NodeSnapshot<'_>, deleted_locally: bool) -> Conflict {
    let (deleted, kept) = if deleted_locally {
        ("locally", "remotely")
    } else {
        ("remotely", "locally")
    };
    let (local, remote) = if deleted_locally {
        (None, node_value(survivor))
    } else {
        (node_value(survivor), None)
    };
    Conflict::new(
        ConflictCode::DeleteModify,
        base.id.clone(),
        survivor.path.clone(),
        format!("{} was deleted {deleted} but still exists {kept}", describe(base.node)),
    )
    .with_values(node_value(base), local, remote)
}

fn add_add(local: &NodeSnapshot<'_>, remote: &NodeSnapshot<'_>) -> Conflict {
    Conflict::new(
        ConflictCode::AddAdd,
        local.id.clone(),
        local.path.clone(),
        format!("{} was added on both sides", describe(local.node)),
    )
    .with_values(None, node_value(local), node_value(remote))
}

fn concurrent_move(
    base: &NodeSnapshot<'_>,
    local: &NodeSnapshot<'_>,
    remote: &NodeSnapshot<'_>,
    report: &mut DetectionReport,
) {
    // Only frame nodes are reported; other concurrent moves surface as warnings.
    if local.node.kind != NodeType::Frame {
        report.warnings.push(format!(
            "{} was moved to different parents on both sides; only frame moves are reported as conflicts",
            describe(local.node)
        ));
        return;
    }
    report.conflicts.push(
        Conflict::new(
            ConflictCode::MoveMove,
            local.id.clone(),
            local.path.clone(),
            format!("{} was moved to different parents on both sides", describe(local.node)),
        )
        .with_values(parent_value(base), parent_value(local), parent_value(remote)),
    );
}

/// Parents whose children kept the same membership on all three sides but were
/// reordered differently on both.
fn detect_order(docs: &ThreeWay<'_>, out: &mut Vec<Conflict>) {
    for parent in docs.local.parents() {
        let (Some(base), Some(local), Some(remote)) = (
            docs.base.children_of(parent),
            docs.local.children_of(parent),
            docs.remote.children_of(parent),
        ) else {
            continue;
        };
        if base.len() != local.len() || base.len() != remote.len() {
            continue;
        }
        let members: BTreeSet<&NodeId> = base.iter().copied().collect();
        let same_members = |ids: &[&NodeId]| ids.iter().all(|id| members.contains(id));
        if !same_members(local) || !same_members(remote) {
            continue;
        }
        if local == base || remote == base || local == remote {
            continue;
        }
        let Some(owner) = docs.local.get(parent) else {
            continue;
        };
        out.push(
            Conflict::new(
                ConflictCode::Order,
                parent.clone(),
                owner.path.children(),
                format!("children of {} were reordered differently on both sides", describe(owner.node)),
            )
            .with_values(order(base), order(local), order(remote)),
        );
    }
}

fn order(ids: &[&NodeId]) -> Option<ConflictValue> {
    Some(ConflictValue::Order(ids.iter().map(|id| (*id).clone()).collect()))
}
