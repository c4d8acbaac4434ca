//! Three-way conflict detection.
//!
//! [`detect`] indexes base, local and remote, then runs four independent
//! passes over the indices:
//!
//! - **structural**: deletions racing modifications, identity collisions from
//!   concurrent additions, concurrent moves, and divergent sibling reorders;
//! - **property**: geometry, visibility, layout and style;
//! - **content**: text and component-instance properties;
//! - **metadata**: node names.
//!
//! Field-level passes share one rule ([`diverged`]): a conflict exists only
//! when both sides changed the value *and* disagree with each other. A change
//! on one side only is a clean update and is not reported.
//!
//! The output is sorted with [`Conflict::report_order`], so identical inputs
//! always yield identical, identically ordered conflict lists.

mod fields;
mod structural;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::IndexError;
use crate::index::{NodeIndex, index};
use crate::model::conflict::Conflict;
use crate::model::document::{Document, Node};

/// Which passes to run. All are enabled by default.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectOptions {
    pub structural: bool,
    pub property: bool,
    pub content: bool,
    pub metadata: bool,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            structural: true,
            property: true,
            content: true,
            metadata: true,
        }
    }
}

/// Output of [`detect`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    /// Conflicts in report order.
    pub conflicts: Vec<Conflict>,
    /// Divergences worth surfacing that are not conflicts in their own right.
    pub warnings: Vec<String>,
}

impl DetectionReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// The three indexed versions of one document.
pub(crate) struct ThreeWay<'a> {
    pub base: NodeIndex<'a>,
    pub local: NodeIndex<'a>,
    pub remote: NodeIndex<'a>,
}

/// Detect every conflict between `base`, `local` and `remote`.
///
/// # Errors
/// Returns an [`IndexError`] if any version has a node without identity or
/// repeats an identity.
#[instrument(skip_all)]
pub fn detect(
    base: &Document,
    local: &Document,
    remote: &Document,
    options: &DetectOptions,
) -> Result<DetectionReport, IndexError> {
    let docs = ThreeWay {
        base: index(base)?,
        local: index(local)?,
        remote: index(remote)?,
    };
    debug!(
        base = docs.base.len(),
        local = docs.local.len(),
        remote = docs.remote.len(),
        "indexed documents"
    );

    let mut report = DetectionReport::default();
    if options.structural {
        structural::detect(&docs, &mut report);
    }
    if options.property {
        fields::detect_properties(&docs, &mut report.conflicts);
    }
    if options.content {
        fields::detect_content(&docs, &mut report.conflicts);
    }
    if options.metadata {
        fields::detect_metadata(&docs, &mut report.conflicts);
    }

    report.conflicts.sort_by(Conflict::report_order);
    for conflict in &report.conflicts {
        debug!(code = %conflict.code, node = %conflict.node_id, path = %conflict.path, "conflict");
    }
    info!(
        conflicts = report.conflicts.len(),
        warnings = report.warnings.len(),
        "detection finished"
    );
    Ok(report)
}

/// The three-way divergence rule: both sides differ from base and from each other.
pub(crate) fn diverged<T: PartialEq>(base: &Option<T>, local: &Option<T>, remote: &Option<T>) -> bool {
    local != base && remote != base && local != remote
}

/// Human-readable node reference for conflict messages.
fn describe(node: &Node) -> String {
    if node.name.is_empty() {
        format!("node {}", node.id)
    } else {
        format!("{:?} ({})", node.name, node.id)
    }
}

#[cfg(test)]
#[allow(clippy::all, clippy::pedantic, clippy::nursery)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::model::conflict::{Category, ConflictCode, ConflictValue, Severity, StrategyKind};
    use crate::model::document::{Layout, LayoutMode, Node, NodeType, Paint, Rect, Shadow, Style};
    use crate::model::path::NodePath;

    fn leaf(id: &str, name: &str) -> Node {
        Node::new(id, NodeType::Vector, name, Rect::new(0.0, 0.0, 10.0, 10.0))
    }

    fn board(children: Vec<Node>) -> Document {
        Document::new(vec![Node::frame("AB", "Artboard", Rect::new(0.0, 0.0, 100.0, 100.0), children)])
    }

    fn run(base: &Document, local: &Document, remote: &Document) -> DetectionReport {
        detect(base, local, remote, &DetectOptions::default()).unwrap()
    }

    fn codes(report: &DetectionReport) -> Vec<ConflictCode> {
        report.conflicts.iter().map(|c| c.code).collect()
    }

    #[test]
    fn identical_documents_are_clean() {
        let doc = board(vec![leaf("X", "x")]);
        assert!(run(&doc, &doc, &doc).is_clean());
    }

    // -- structural --

    #[test]
    fn deletion_race_yields_one_del_mod_at_remote_location() {
        let base = board(vec![leaf("Y", "y"), leaf("X", "x")]);
        let local = board(vec![leaf("Y", "y")]);
        let remote = board(vec![leaf("Y", "y"), leaf("X", "renamed")]);

        let report = run(&base, &local, &remote);
        assert_eq!(codes(&report), vec![ConflictCode::DeleteModify]);
        let conflict = &report.conflicts[0];
        assert_eq!(conflict.severity, Severity::Error);
        assert_eq!(conflict.category, Category::Structural);
        assert_eq!(conflict.path, NodePath::artboard(0).child(1));
        assert!(conflict.local.is_none());
        assert!(matches!(&conflict.remote, Some(ConflictValue::Node(n)) if n.name == "renamed"));
    }

    #[test]
    fn remote_deletion_is_symmetric() {
        let base = board(vec![leaf("X", "x")]);
        let local = board(vec![leaf("X", "changed")]);
        let remote = board(vec![]);
        let report = run(&base, &local, &remote);
        assert_eq!(codes(&report), vec![ConflictCode::DeleteModify]);
        assert!(report.conflicts[0].remote.is_none());
        assert_eq!(report.conflicts[0].path, NodePath::artboard(0).child(0));
    }

    #[test]
    fn root_deletion_is_exempt() {
        let base = board(vec![]);
        let local = Document::new(vec![]);
        let mut remote = board(vec![]);
        remote.artboards[0].name = "Renamed board".into();
        let report = run(&base, &local, &remote);
        assert!(
            report.conflicts.iter().all(|c| c.code != ConflictCode::DeleteModify),
            "{:?}",
            codes(&report)
        );
    }

    #[test]
    fn concurrent_addition_of_same_identity() {
        let base = board(vec![]);
        let local = board(vec![leaf("Y", "left")]);
        let remote = board(vec![leaf("Y", "right")]);
        let report = run(&base, &local, &remote);
        let add = report.conflicts.iter().find(|c| c.code == ConflictCode::AddAdd).unwrap();
        assert_eq!(add.severity, Severity::Warning);
        assert!(add.base.is_none());
        assert!(!add.auto_resolvable);
    }

    #[test]
    fn concurrent_move_of_frame() {
        let card = || Node::frame("CARD", "Card", Rect::default(), vec![]);
        let base = board(vec![
            Node::frame("P1", "p1", Rect::default(), vec![card()]),
            Node::frame("P2", "p2", Rect::default(), vec![]),
            Node::frame("P3", "p3", Rect::default(), vec![]),
        ]);
        let local = board(vec![
            Node::frame("P1", "p1", Rect::default(), vec![]),
            Node::frame("P2", "p2", Rect::default(), vec![card()]),
            Node::frame("P3", "p3", Rect::default(), vec![]),
        ]);
        let remote = board(vec![
            Node::frame("P1", "p1", Rect::default(), vec![]),
            Node::frame("P2", "p2", Rect::default(), vec![]),
            Node::frame("P3", "p3", Rect::default(), vec![card()]),
        ]);
        let report = run(&base, &local, &remote);
        assert_eq!(codes(&report), vec![ConflictCode::MoveMove]);
        let conflict = &report.conflicts[0];
        assert_eq!(conflict.local, Some(ConflictValue::Parent("P2".into())));
        assert_eq!(conflict.remote, Some(ConflictValue::Parent("P3".into())));
    }

    #[test]
    fn concurrent_move_of_non_frame_is_only_a_warning() {
        let base = board(vec![
            Node::frame("P1", "p1", Rect::default(), vec![leaf("X", "x")]),
            Node::frame("P2", "p2", Rect::default(), vec![]),
            Node::frame("P3", "p3", Rect::default(), vec![]),
        ]);
        let local = board(vec![
            Node::frame("P1", "p1", Rect::default(), vec![]),
            Node::frame("P2", "p2", Rect::default(), vec![leaf("X", "x")]),
            Node::frame("P3", "p3", Rect::default(), vec![]),
        ]);
        let remote = board(vec![
            Node::frame("P1", "p1", Rect::default(), vec![]),
            Node::frame("P2", "p2", Rect::default(), vec![]),
            Node::frame("P3", "p3", Rect::default(), vec![leaf("X", "x")]),
        ]);
        let report = run(&base, &local, &remote);
        assert!(report.is_clean());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn divergent_reorder() {
        let base = board(vec![leaf("A", "a"), leaf("B", "b"), leaf("C", "c")]);
        let local = board(vec![leaf("B", "b"), leaf("A", "a"), leaf("C", "c")]);
        let remote = board(vec![leaf("C", "c"), leaf("B", "b"), leaf("A", "a")]);
        let report = run(&base, &local, &remote);
        assert_eq!(codes(&report), vec![ConflictCode::Order]);
        let conflict = &report.conflicts[0];
        assert_eq!(conflict.severity, Severity::Info);
        assert!(conflict.auto_resolvable);
        assert_eq!(conflict.suggested_strategy, Some(StrategyKind::PreferLocal));
        assert_eq!(conflict.node_id.as_str(), "AB");
        assert_eq!(conflict.path, NodePath::artboard(0).children());
        assert_eq!(
            conflict.local,
            Some(ConflictValue::Order(vec!["B".into(), "A".into(), "C".into()]))
        );
    }

    #[test]
    fn reorder_on_one_side_or_with_membership_change_is_not_a_conflict() {
        let base = board(vec![leaf("A", "a"), leaf("B", "b"), leaf("C", "c")]);
        let local = board(vec![leaf("B", "b"), leaf("A", "a"), leaf("C", "c")]);
        assert!(run(&base, &local, &base).is_clean());

        let remote = board(vec![leaf("C", "c"), leaf("B", "b")]);
        let report = run(&base, &local, &remote);
        assert!(!codes(&report).contains(&ConflictCode::Order));
    }

    // -- property --

    fn with_frame(x: f64) -> Document {
        let mut n = leaf("X", "x");
        n.frame = Rect::new(x, 0.0, 10.0, 10.0);
        board(vec![n])
    }

    #[test]
    fn geometry_conflict_carries_all_three_rects() {
        let report = run(&with_frame(0.0), &with_frame(5.0), &with_frame(9.0));
        assert_eq!(codes(&report), vec![ConflictCode::Geometry]);
        let c = &report.conflicts[0];
        assert_eq!(c.path, NodePath::artboard(0).child(0).field("frame"));
        assert_eq!(c.base, Some(ConflictValue::Frame(Rect::new(0.0, 0.0, 10.0, 10.0))));
        assert_eq!(c.local, Some(ConflictValue::Frame(Rect::new(5.0, 0.0, 10.0, 10.0))));
        assert_eq!(c.remote, Some(ConflictValue::Frame(Rect::new(9.0, 0.0, 10.0, 10.0))));
    }

    #[test]
    fn same_change_on_both_sides_is_clean() {
        assert!(run(&with_frame(0.0), &with_frame(5.0), &with_frame(5.0)).is_clean());
        assert!(run(&with_frame(0.0), &with_frame(0.0), &with_frame(5.0)).is_clean());
    }

    #[test]
    fn visibility_conflict_only_possible_without_base() {
        let base = board(vec![]);
        let mut hidden = leaf("X", "x");
        hidden.visible = Some(false);
        let local = board(vec![leaf("X", "x")]);
        let remote = board(vec![hidden]);
        let report = run(&base, &local, &remote);
        assert!(codes(&report).contains(&ConflictCode::Visibility));
    }

    fn with_layout(layout: Option<Layout>) -> Document {
        let mut n = Node::frame("X", "x", Rect::default(), vec![]);
        n.layout = layout;
        board(vec![n])
    }

    #[test]
    fn layout_conflict_branches() {
        let h = Layout::new(LayoutMode::Horizontal);
        let v = Layout::new(LayoutMode::Vertical);
        let g = Layout::new(LayoutMode::Grid);

        // all three present and pairwise different
        let report = run(&with_layout(Some(h.clone())), &with_layout(Some(v.clone())), &with_layout(Some(g.clone())));
        assert_eq!(codes(&report), vec![ConflictCode::Layout]);

        // base without layout, both sides add different layouts
        let report = run(&with_layout(None), &with_layout(Some(v.clone())), &with_layout(Some(g)));
        assert_eq!(codes(&report), vec![ConflictCode::Layout]);

        // one side removes, the other changes: not covered by either branch
        let report = run(&with_layout(Some(h)), &with_layout(None), &with_layout(Some(v)));
        assert!(report.is_clean());
    }

    fn with_style(style: Style) -> Document {
        let mut n = leaf("X", "x");
        n.style = Some(style);
        board(vec![n])
    }

    #[test]
    fn first_divergent_style_property_wins() {
        let style = |fill: &str, opacity: f64| Style {
            fills: Some(vec![Paint::solid(fill)]),
            opacity: Some(opacity),
            ..Style::default()
        };
        let report = run(
            &with_style(style("#000", 1.0)),
            &with_style(style("#111", 0.5)),
            &with_style(style("#222", 0.2)),
        );
        assert_eq!(codes(&report), vec![ConflictCode::Style]);
        let c = &report.conflicts[0];
        assert_eq!(c.path, NodePath::artboard(0).child(0).field("style").field("fills"));
        assert!(matches!(c.local, Some(ConflictValue::Fills(_))));
    }

    #[test]
    fn shadow_divergence_is_reported_when_others_agree() {
        let shadow = |blur: f64| Style {
            shadow: Some(Shadow {
                x: 0.0,
                y: 2.0,
                blur,
                spread: None,
                color: "#0003".into(),
            }),
            ..Style::default()
        };
        let report = run(&with_style(shadow(1.0)), &with_style(shadow(4.0)), &with_style(shadow(8.0)));
        let c = &report.conflicts[0];
        assert_eq!(c.code, ConflictCode::Style);
        assert_eq!(c.path, NodePath::artboard(0).child(0).field("style").field("shadow"));
    }

    // -- content / metadata --

    fn text(value: &str) -> Document {
        board(vec![Node::text("T", "Title", value)])
    }

    #[test]
    fn text_conflict() {
        let report = run(&text("Hello"), &text("Hi"), &text("Hey"));
        assert_eq!(codes(&report), vec![ConflictCode::Text]);
        assert_eq!(report.conflicts[0].local, Some(ConflictValue::Text("Hi".into())));
    }

    fn instance(key: &str, label: &str) -> Document {
        let mut props = serde_json::Map::new();
        props.insert("label".into(), serde_json::Value::from(label));
        board(vec![Node::component("C", "Button", key, props)])
    }

    #[test]
    fn component_props_conflict_requires_same_key() {
        let report = run(&instance("btn", "a"), &instance("btn", "b"), &instance("btn", "c"));
        assert_eq!(codes(&report), vec![ConflictCode::ComponentProps]);

        let report = run(&instance("btn", "a"), &instance("btn", "b"), &instance("link", "c"));
        assert!(!codes(&report).contains(&ConflictCode::ComponentProps));
    }

    #[test]
    fn name_conflict_is_auto_resolvable_info() {
        let report = run(&board(vec![leaf("X", "a")]), &board(vec![leaf("X", "b")]), &board(vec![leaf("X", "c")]));
        assert_eq!(codes(&report), vec![ConflictCode::Name]);
        let c = &report.conflicts[0];
        assert_eq!(c.severity, Severity::Info);
        assert!(c.auto_resolvable);
        assert_eq!(c.suggested_strategy, Some(StrategyKind::PreferRemote));
    }

    #[test]
    fn passes_can_be_disabled() {
        let base = board(vec![leaf("X", "a")]);
        let local = board(vec![leaf("X", "b")]);
        let remote = board(vec![leaf("X", "c")]);
        let options = DetectOptions {
            metadata: false,
            ..DetectOptions::default()
        };
        assert!(detect(&base, &local, &remote, &options).unwrap().is_clean());
    }

    #[test]
    fn output_is_sorted_by_severity() {
        let base = board(vec![leaf("X", "a"), leaf("D", "d")]);
        let mut local_x = leaf("X", "b");
        local_x.frame.x = 3.0;
        let mut remote_x = leaf("X", "c");
        remote_x.frame.x = 4.0;
        let local = board(vec![local_x]);
        let remote = board(vec![remote_x, leaf("D", "dd")]);
        let report = run(&base, &local, &remote);
        assert_eq!(
            codes(&report),
            vec![ConflictCode::DeleteModify, ConflictCode::Geometry, ConflictCode::Name]
        );
    }

    #[test]
    fn missing_identity_is_an_error() {
        let good = board(vec![]);
        let bad = board(vec![leaf("", "anonymous")]);
        assert!(matches!(
            detect(&good, &bad, &good, &DetectOptions::default()),
            Err(IndexError::MissingIdentity { .. })
        ));
    }

    // -- property tests --

    proptest! {
        #[test]
        fn prop_three_way_rule(b in 0_u8..3, l in 0_u8..3, r in 0_u8..3) {
            let name = |v: u8| board(vec![leaf("X", &format!("n{v}"))]);
            let report = run(&name(b), &name(l), &name(r));
            let expected = b != l && b != r && l != r;
            prop_assert_eq!(report.conflicts.iter().any(|c| c.code == ConflictCode::Name), expected);
        }

        #[test]
        fn prop_detection_is_idempotent(
            base in crate::index::tests::arb_document(),
            local in crate::index::tests::arb_document(),
            remote in crate::index::tests::arb_document(),
        ) {
            let first = run(&base, &local, &remote);
            let second = run(&base, &local, &remote);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_del_mod_never_fires_on_roots(
            base in crate::index::tests::arb_document(),
            local in crate::index::tests::arb_document(),
            remote in crate::index::tests::arb_document(),
        ) {
            let report = run(&base, &local, &remote);
            for c in report.conflicts.iter().filter(|c| c.code == ConflictCode::DeleteModify) {
                prop_assert!(c.path.len() > 1, "root node flagged: {:?}", c.path);
            }
        }
    }
}
