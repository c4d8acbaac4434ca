//! Field-level passes: property (`P-*`), content (`C-*`) and metadata (`M-NAME`).
//!
//! Every check here compares one field of a node that exists on both sides.
//! The base version is optional: a node added on both sides is compared
//! against "no base value". Conflict paths point into the local document when
//! the local side holds a value, otherwise into the remote one.

use super::{ThreeWay, describe, diverged};
use crate::index::NodeSnapshot;
use crate::model::conflict::{Conflict, ConflictCode, ConflictValue};
use crate::model::document::{Node, NodeType, Style};

/// Base, local and remote payloads of one field conflict.
type Sides = (Option<ConflictValue>, Option<ConflictValue>, Option<ConflictValue>);

pub(super) fn detect_properties(docs: &ThreeWay<'_>, out: &mut Vec<Conflict>) {
    for (base, local, remote) in shared(docs) {
        let (l, r) = (local.node, remote.node);

        if let Some(sides) = compare(base.map(|n| &n.frame), Some(&l.frame), Some(&r.frame), ConflictValue::Frame) {
            out.push(field_conflict(ConflictCode::Geometry, local, remote, &["frame"], sides, "geometry"));
        }

        let visible = (base.map(Node::is_visible), l.is_visible(), r.is_visible());
        if let Some(sides) = compare(
            visible.0.as_ref(),
            Some(&visible.1),
            Some(&visible.2),
            ConflictValue::Visible,
        ) {
            out.push(field_conflict(ConflictCode::Visibility, local, remote, &["visible"], sides, "visibility"));
        }

        if let Some(sides) = layout(base, l, r) {
            out.push(field_conflict(ConflictCode::Layout, local, remote, &["layout"], sides, "layout"));
        }

        if let Some((prop, sides)) = style(base, l, r) {
            out.push(field_conflict(ConflictCode::Style, local, remote, &["style", prop], sides, "style"));
        }
    }
}

pub(super) fn detect_content(docs: &ThreeWay<'_>, out: &mut Vec<Conflict>) {
    for (base, local, remote) in shared(docs) {
        let (l, r) = (local.node, remote.node);

        if l.kind == NodeType::Text
            && r.kind == NodeType::Text
            && let Some(sides) = compare(
                base.and_then(|n| n.text.as_ref()),
                l.text.as_ref(),
                r.text.as_ref(),
                ConflictValue::Text,
            )
        {
            out.push(field_conflict(ConflictCode::Text, local, remote, &["text"], sides, "text"));
        }

        let same_component = l.kind == NodeType::Component
            && r.kind == NodeType::Component
            && l.component_key.is_some()
            && l.component_key == r.component_key;
        if same_component
            && let Some(sides) = compare(
                base.and_then(|n| n.props.as_ref()),
                l.props.as_ref(),
                r.props.as_ref(),
                ConflictValue::Props,
            )
        {
            out.push(field_conflict(
                ConflictCode::ComponentProps,
                local,
                remote,
                &["props"],
                sides,
                "component properties",
            ));
        }
    }
}

pub(super) fn detect_metadata(docs: &ThreeWay<'_>, out: &mut Vec<Conflict>) {
    for (base, local, remote) in shared(docs) {
        if let Some(sides) = compare(
            base.map(|n| &n.name),
            Some(&local.node.name),
            Some(&remote.node.name),
            ConflictValue::Name,
        ) {
            out.push(field_conflict(ConflictCode::Name, local, remote, &["name"], sides, "name"));
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Nodes present in both local and remote, paired with the base node if any.
fn shared<'d, 'a>(
    docs: &'d ThreeWay<'a>,
) -> impl Iterator<Item = (Option<&'a Node>, &'d NodeSnapshot<'a>, &'d NodeSnapshot<'a>)> + 'd {
    docs.local.snapshots().filter_map(move |local| {
        let remote = docs.remote.get(local.id)?;
        Some((docs.base.get(local.id).map(|b| b.node), local, remote))
    })
}

fn compare<T: PartialEq + Clone>(
    base: Option<&T>,
    local: Option<&T>,
    remote: Option<&T>,
    wrap: fn(T) -> ConflictValue,
) -> Option<Sides> {
    diverged(&base, &local, &remote).then(|| lift(base, local, remote, wrap))
}

fn lift<T: Clone>(base: Option<&T>, local: Option<&T>, remote: Option<&T>, wrap: fn(T) -> ConflictValue) -> Sides {
    (
        base.cloned().map(wrap),
        local.cloned().map(wrap),
        remote.cloned().map(wrap),
    )
}

fn field_conflict(
    code: ConflictCode,
    local: &NodeSnapshot<'_>,
    remote: &NodeSnapshot<'_>,
    fields: &[&str],
    sides: Sides,
    what: &str,
) -> Conflict {
    let anchor = if sides.1.is_some() { local } else { remote };
    let path = fields.iter().fold(anchor.path.clone(), |path, name| path.field(name));
    let (base, local_value, remote_value) = sides;
    Conflict::new(
        code,
        local.id.clone(),
        path,
        format!("{what} of {} changed differently on both sides", describe(local.node)),
    )
    .with_values(base, local_value, remote_value)
}

/// Layout conflicts: all three present and pairwise different, or absent in
/// base with both sides adding different layouts. Removal on one side racing a
/// change on the other is not reported.
fn layout(base: Option<&Node>, local: &Node, remote: &Node) -> Option<Sides> {
    let b = base.and_then(|n| n.layout.as_ref());
    let (l, r) = (local.layout.as_ref(), remote.layout.as_ref());
    let fires = match (b, l, r) {
        (Some(b), Some(l), Some(r)) => b != l && b != r && l != r,
        (None, Some(l), Some(r)) => l != r,
        _ => false,
    };
    fires.then(|| lift(b, l, r, ConflictValue::Layout))
}

/// First divergent style property, checked in the order fills, strokes,
/// opacity, shadow.
fn style(base: Option<&Node>, local: &Node, remote: &Node) -> Option<(&'static str, Sides)> {
    let styles = [
        base.and_then(|n| n.style.as_ref()),
        local.style.as_ref(),
        remote.style.as_ref(),
    ];
    style_prop(styles, |s| s.fills.as_ref(), ConflictValue::Fills)
        .map(|sides| ("fills", sides))
        .or_else(|| style_prop(styles, |s| s.strokes.as_ref(), ConflictValue::Strokes).map(|sides| ("strokes", sides)))
        .or_else(|| style_prop(styles, |s| s.opacity.as_ref(), ConflictValue::Opacity).map(|sides| ("opacity", sides)))
        .or_else(|| style_prop(styles, |s| s.shadow.as_ref(), ConflictValue::Shadow).map(|sides| ("shadow", sides)))
}

fn style_prop<T: PartialEq + Clone>(
    styles: [Option<&Style>; 3],
    get: fn(&Style) -> Option<&T>,
    wrap: fn(T) -> ConflictValue,
) -> Option<Sides> {
    let [b, l, r] = styles.map(|s| s.and_then(get));
    compare(b, l, r, wrap)
}
